//! `xcode-sim` and `xcode-decode` subcommands.

use anyhow::Result;
use xbios_xcode::{DecodeSettings, XcodeInterp};

use crate::cli::{XcodeDecodeArgs, XcodeSimArgs};
use crate::io_util::{read_file, write_file};

pub fn run_sim(args: &XcodeSimArgs) -> Result<()> {
    let data = read_file(&args.file)?;

    let mut interp = XcodeInterp::new();
    interp.load(&data)?;
    let mut xcodes = Vec::new();
    while let Some(xc) = interp.interpret_next()? {
        xcodes.push(xc);
    }

    let ram_size = args.ram_size * 1024;
    let ram = xbios_x86::build_visor_ram(&xcodes, ram_size)?;
    let result = xbios_x86::decode_x86(&ram);

    for instr in &result.instructions {
        println!("{:08x}: {}", instr.offset, instr.text);
    }
    if result.had_unknown {
        println!("(some bytes were not recognized as valid x86)");
    }
    Ok(())
}

pub fn run_decode(args: &XcodeDecodeArgs) -> Result<()> {
    let data = read_file(&args.file)?;

    let settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            DecodeSettings::load(&text)?
        }
        None => DecodeSettings::default(),
    };

    let lines = xbios_xcode::disassemble(&data, &settings)?;
    let output = lines.join("\n");

    match &args.out {
        Some(path) => write_file(path, output.as_bytes())?,
        None => println!("{output}"),
    }
    Ok(())
}
