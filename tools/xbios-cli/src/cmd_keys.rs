//! `keys` subcommand: dump the keys a loaded bldr derived.

use anyhow::Result;
use xbios_format::bios::{derive_preldr_key, BLDR_BLOCK_LEN, MCPX_SHADOW_LEN};
use xbios_format::bldr::{BldrEntry, LoaderParams, KEY_LEN, LOADER_PARAMS_LEN};
use xbios_format::{mcpx, BiosParams};

use crate::cli::KeysArgs;
use crate::io_util::{read_file, read_key, read_mcpx};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn run(args: &KeysArgs) -> Result<()> {
    let buf = read_file(&args.load.file)?;

    let mut params = BiosParams::default();
    if let Some(p) = &args.load.mcpx0 {
        params.mcpx_rev0 = Some(read_mcpx(p)?);
    }
    if let Some(p) = &args.load.mcpx1 {
        params.mcpx_rev1 = Some(read_mcpx(p)?);
    }
    if let Some(p) = &args.load.bldr_key {
        params.key_bldr = Some(read_key(p)?);
    }
    if let Some(p) = &args.load.krnl_key {
        params.key_krnl = Some(read_key(p)?);
    }

    let image = match xbios_format::load(buf, &params) {
        Ok(image) => image,
        Err(xbios_format::BiosError::InvalidBldr(_)) => {
            println!("bldr validation failed; keys below may be garbage");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match &image.bldr_keys {
        Some(keys) => {
            println!("eeprom key:  {}", hex(&keys.eeprom_key));
            println!("cert key:    {}", hex(&keys.cert_key));
            println!("kernel key:  {}", hex(&keys.kernel_key));
        }
        None => println!("bldr keys: not derivable (keysPtr out of range)"),
    }

    print_bfm_key(&image);

    if image.has_preldr {
        if let Some(mcpx1) = params.mcpx_rev1 {
            if let Ok(info) = mcpx::identify(&mcpx1) {
                if let Ok(sb_key_slice) = mcpx::secret_boot_key(&mcpx1, info) {
                    let mut sb_key = [0u8; KEY_LEN];
                    sb_key.copy_from_slice(sb_key_slice);
                    let bldr_off = image.romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN;
                    let mut last16 = [0u8; KEY_LEN];
                    last16.copy_from_slice(
                        &image.buf[bldr_off + BLDR_BLOCK_LEN - KEY_LEN..bldr_off + BLDR_BLOCK_LEN],
                    );
                    let preldr_key = derive_preldr_key(&sb_key, &last16);
                    println!("preldr key:  {}", hex(&preldr_key));
                }
            }
        }
    }

    Ok(())
}

/// The 16-byte BFM key sits immediately before the `BLDR_KEYS` block; it
/// isn't part of `BiosImage::bldr_keys` so we re-derive its offset here.
fn print_bfm_key(image: &xbios_format::BiosImage) {
    let bldr_off = image.romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN;
    let block = &image.buf[bldr_off..bldr_off + BLDR_BLOCK_LEN];

    let Ok(_lp) = LoaderParams::parse(&block[..LOADER_PARAMS_LEN]) else {
        return;
    };
    let Ok(entry) = BldrEntry::parse(block, LOADER_PARAMS_LEN) else {
        return;
    };
    let Some(keys_off) = entry.keys_offset() else {
        return;
    };
    if keys_off < KEY_LEN {
        return;
    }
    println!("bfm key:     {}", hex(&block[keys_off - KEY_LEN..keys_off]));
}
