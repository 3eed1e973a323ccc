//! `ls` subcommand: load an image and print its derived layout.

use anyhow::Result;
use log::debug;
use xbios_format::BiosParams;

use crate::cli::LsArgs;
use crate::io_util::{read_file, read_key, read_mcpx};

pub fn run(args: &LsArgs) -> Result<()> {
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

    debug!("loading {} ({} bytes)", args.load.file.display(), buf.len());

    match xbios_format::load(buf, &params) {
        Ok(image) => {
            print_image(&image);
            if args.xcodes {
                print_xcodes(&image)?;
            }
            Ok(())
        }
        Err(xbios_format::BiosError::InvalidBldr(msg)) => {
            // `load` only returns InvalidBldr for a bldr block it could not
            // parse at all (decrypt failure, truncated buffer); a bad
            // signature or implausible size still yields Ok with
            // `boot_params_valid`/`signature_valid` set to false.
            println!("warning: bldr could not be parsed: {msg}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_image(image: &xbios_format::BiosImage) {
    println!("image size:        {} bytes", image.romsize);
    println!("init table:");
    println!("  revision:         0x{:04x}", image.init_table.revision);
    println!("  identifier:       0x{:02x}", image.init_table.identifier);
    println!("  kernel version:   0x{:04x}", image.init_table.kernel_version);
    println!("has preldr:         {}", image.has_preldr);
    println!("bldr decrypted:     {}", image.bldr_decrypted);
    if let Some(src) = image.bldr_decrypt_source {
        println!("bldr decrypt src:   {src:?}");
    }
    println!("boot params sizes valid: {}", image.boot_params_valid);
    if let Some(bp) = &image.boot_params {
        println!("  krnl data size:   {}", bp.krnl_data_size);
        println!("  inittbl size:     {}", bp.inittbl_size);
        println!("  compressed size:  {}", bp.compressed_kernel_size);
        println!("  signature:        0x{:08x} (valid: {})", bp.signature, bp.signature_valid);
    }
    println!("kernel decrypted:   {}", image.kernel_decrypted);
    println!(
        "kernel decompressed: {}",
        image.kernel.as_ref().map(|k| k.len()).map_or("no".to_string(), |n| format!("yes ({n} bytes)"))
    );
}

fn print_xcodes(image: &xbios_format::BiosImage) -> Result<()> {
    let settings = xbios_xcode::DecodeSettings::default();
    let header_len = xbios_format::bldr::INIT_TABLE_HEADER_LEN;
    let stream = &image.buf[header_len..header_len + image.xcode_stream_len()];
    let lines = xbios_xcode::disassemble(stream, &settings)?;
    println!("\nxcodes:");
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
