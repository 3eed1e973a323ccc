//! `bld` subcommand: assemble a fresh image from its constituent parts.

use anyhow::{bail, Result};
use xbios_format::pubkey;
use xbios_format::{BiosParts, BuildParams};

use crate::cli::BldArgs;
use crate::io_util::{read_file, read_key, write_file};

pub fn run(args: &BldArgs) -> Result<()> {
    let mut krnl = read_file(&args.krnl)?;

    if let Some(pubkey_path) = &args.pubkey {
        krnl = patch_pubkey(&krnl, pubkey_path)?;
    }

    let parts = BiosParts {
        init_table_and_xcodes: read_file(&args.inittbl)?,
        bldr: read_file(&args.bldr)?,
        compressed_kernel: krnl,
        kernel_data_tail: read_file(&args.krnl_data)?,
    };

    let params = BuildParams {
        romsize: args.romsize * 1024,
        key_bldr: args.enc_bldr.as_deref().map(read_key).transpose()?,
        key_krnl: args.enc_krnl.as_deref().map(read_key).transpose()?,
        flip_bfm: args.flip_bfm,
        hackinittbl: args.hackinittbl,
        hacksignature: args.hacksignature,
        nobootparams: args.nobootparams,
    };

    let image = xbios_format::build(&parts, &params)?;
    write_file(&args.out, &image)?;
    println!("wrote {} bytes to {}", image.len(), args.out.display());
    Ok(())
}

/// Decompresses `krnl`, patches the first embedded RSA1 modulus from
/// `pubkey_path` (exactly 284 bytes: header + modulus), and recompresses.
fn patch_pubkey(krnl: &[u8], pubkey_path: &std::path::Path) -> Result<Vec<u8>> {
    let replacement = read_file(pubkey_path)?;
    if replacement.len() != pubkey::RECORD_LEN {
        bail!(
            "{}: expected exactly {} bytes, got {}",
            pubkey_path.display(),
            pubkey::RECORD_LEN,
            replacement.len()
        );
    }

    let mut decompressed = xbios_lzx::decompress(krnl)?;

    let records = pubkey::scan(&decompressed);
    let record = records
        .first()
        .ok_or_else(|| anyhow::anyhow!("no RSA1 public key found in decompressed kernel"))?;

    let new_modulus = &replacement[pubkey::HEADER_LEN..];
    let start = record.offset + pubkey::HEADER_LEN;
    decompressed[start..start + pubkey::MODULUS_LEN].copy_from_slice(new_modulus);

    Ok(xbios_lzx::compress(&decompressed)?)
}
