//! Thin file I/O wrappers with the size checks the fixed binary formats
//! demand. Grounded on `tools/gluon/src/artifact/hbtf.rs`'s read-then-
//! validate-length style.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

/// Reads a 16-byte key file, rejecting any other length.
pub fn read_key(path: &Path) -> Result<[u8; 16]> {
    let buf = read_file(path)?;
    if buf.len() != 16 {
        bail!("{}: expected exactly 16 bytes, got {}", path.display(), buf.len());
    }
    let mut key = [0u8; 16];
    key.copy_from_slice(&buf);
    Ok(key)
}

/// Reads a 512-byte MCPX dump.
pub fn read_mcpx(path: &Path) -> Result<[u8; 512]> {
    let buf = read_file(path)?;
    if buf.len() != 512 {
        bail!("{}: expected exactly 512 bytes, got {}", path.display(), buf.len());
    }
    let mut mcpx = [0u8; 512];
    mcpx.copy_from_slice(&buf);
    Ok(mcpx)
}
