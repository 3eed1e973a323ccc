//! `decomp-krnl` and `comp-krnl` subcommands: standalone LZX codec access.

use anyhow::Result;

use crate::cli::{CompKrnlArgs, DecompKrnlArgs};
use crate::io_util::{read_file, write_file};

pub fn run_decomp(args: &DecompKrnlArgs) -> Result<()> {
    let compressed = read_file(&args.file)?;
    let decompressed = xbios_lzx::decompress(&compressed)?;
    write_file(&args.out, &decompressed)?;
    println!("wrote {} bytes to {}", decompressed.len(), args.out.display());
    Ok(())
}

pub fn run_comp(args: &CompKrnlArgs) -> Result<()> {
    let raw = read_file(&args.file)?;
    let compressed = xbios_lzx::compress(&raw)?;
    write_file(&args.out, &compressed)?;
    println!("wrote {} bytes to {}", compressed.len(), args.out.display());
    Ok(())
}
