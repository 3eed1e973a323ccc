//! `extr` subcommand: pull one component back out of a loaded image.

use anyhow::{anyhow, Result};
use xbios_format::bios::{BLDR_BLOCK_LEN, MCPX_SHADOW_LEN};
use xbios_format::bldr::INIT_TABLE_HEADER_LEN;
use xbios_format::BiosParams;

use crate::cli::{ExtrArgs, ExtrWhat};
use crate::io_util::{read_file, read_key, read_mcpx, write_file};

pub fn run(args: &ExtrArgs) -> Result<()> {
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

    let image = xbios_format::load(buf, &params).or_else(|e| match e {
        xbios_format::BiosError::InvalidBldr(_) => {
            Err(anyhow!("bldr validation failed; nothing usable to extract"))
        }
        other => Err(other.into()),
    })?;

    let bldr_off = image.romsize - MCPX_SHADOW_LEN - BLDR_BLOCK_LEN;

    let bytes: Vec<u8> = match args.what {
        ExtrWhat::Inittbl => {
            let len = image
                .boot_params
                .as_ref()
                .map(|bp| bp.inittbl_size as usize)
                .unwrap_or(INIT_TABLE_HEADER_LEN + image.xcode_stream_len());
            image.buf[..len].to_vec()
        }
        ExtrWhat::Bldr => image.buf[bldr_off..bldr_off + BLDR_BLOCK_LEN].to_vec(),
        ExtrWhat::Krnl => {
            let bp = image
                .boot_params
                .as_ref()
                .ok_or_else(|| anyhow!("boot params unavailable; cannot locate kernel bounds"))?;
            let tail_start = bldr_off - bp.krnl_data_size as usize;
            let comp_start = tail_start - bp.compressed_kernel_size as usize;
            image.buf[comp_start..tail_start].to_vec()
        }
    };

    write_file(&args.out, &bytes)?;
    println!("wrote {} bytes to {}", bytes.len(), args.out.display());
    Ok(())
}
