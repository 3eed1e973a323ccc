//! `split` and `combine` subcommands.

use anyhow::Result;

use crate::cli::{CombineArgs, SplitArgs};
use crate::io_util::{read_file, write_file};

pub fn run_split(args: &SplitArgs) -> Result<()> {
    let buf = read_file(&args.file)?;
    let romsize = args.romsize * 1024;

    let banks = xbios_format::split(&buf, romsize)?;

    std::fs::create_dir_all(&args.out_dir)?;
    for (i, bank) in banks.iter().enumerate() {
        let path = args.out_dir.join(format!("bank{i}.bin"));
        write_file(&path, bank)?;
        println!("wrote {} bytes to {}", bank.len(), path.display());
    }
    Ok(())
}

pub fn run_combine(args: &CombineArgs) -> Result<()> {
    let banks: Result<Vec<Vec<u8>>> = args.banks.iter().map(|p| read_file(p)).collect();
    let banks = banks?;

    let combined = xbios_format::combine(&banks)?;
    write_file(&args.out, &combined)?;
    println!("wrote {} bytes to {}", combined.len(), args.out.display());
    Ok(())
}
