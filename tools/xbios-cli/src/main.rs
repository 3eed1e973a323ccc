//! Command-line tool for inspecting, disassembling, and reconstructing
//! original Xbox BIOS images.
//!
//! Pipeline: load an image buffer, classify it (size, preldr presence),
//! decrypt the 2BL then kernel with whichever candidate key is available,
//! and run the requested operation against the now-normalized model.

mod cli;
mod cmd_bld;
mod cmd_extr;
mod cmd_keys;
mod cmd_krnl;
mod cmd_ls;
mod cmd_split_combine;
mod cmd_xcode;
mod io_util;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &cli.command {
        cli::Command::Ls(args) => cmd_ls::run(args),
        cli::Command::Extr(args) => cmd_extr::run(args),
        cli::Command::Split(args) => cmd_split_combine::run_split(args),
        cli::Command::Combine(args) => cmd_split_combine::run_combine(args),
        cli::Command::Bld(args) => cmd_bld::run(args),
        cli::Command::Keys(args) => cmd_keys::run(args),
        cli::Command::XcodeSim(args) => cmd_xcode::run_sim(args),
        cli::Command::XcodeDecode(args) => cmd_xcode::run_decode(args),
        cli::Command::DecompKrnl(args) => cmd_krnl::run_decomp(args),
        cli::Command::CompKrnl(args) => cmd_krnl::run_comp(args),
    }
}
