//! Command-line interface definitions for the Xbox BIOS tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect, disassemble, and reconstruct original Xbox BIOS images.
#[derive(Parser)]
#[command(name = "xbios", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug-level) logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Load an image and print its derived layout.
    Ls(LsArgs),
    /// Extract a component (bldr, kernel, init table) from an image.
    Extr(ExtrArgs),
    /// Split an over-sized image into equally-sized banks.
    Split(SplitArgs),
    /// Concatenate 2-4 equally-sized banks into one image.
    Combine(CombineArgs),
    /// Build a fresh image from its constituent parts.
    Bld(BldArgs),
    /// Dump the keys a loaded bldr derived.
    Keys(KeysArgs),
    /// Simulate memory-write xcodes into a fake RAM and disassemble x86.
    XcodeSim(XcodeSimArgs),
    /// Disassemble an xcode stream to text.
    XcodeDecode(XcodeDecodeArgs),
    /// Decompress a standalone LZX-compressed kernel image.
    DecompKrnl(DecompKrnlArgs),
    /// Compress a standalone kernel image with the LZX codec.
    CompKrnl(CompKrnlArgs),
}

/// Common flags for loading an image and its optional decryption material.
#[derive(Parser, Clone)]
pub struct LoadArgs {
    /// Path to the BIOS image file.
    #[arg(long)]
    pub file: PathBuf,

    /// Path to a 512-byte MCPX rev-0 (v1.0) dump.
    #[arg(long)]
    pub mcpx0: Option<PathBuf>,

    /// Path to a 512-byte MCPX rev-1 (v1.1) dump.
    #[arg(long)]
    pub mcpx1: Option<PathBuf>,

    /// Path to a 16-byte explicit 2BL decryption key.
    #[arg(long)]
    pub bldr_key: Option<PathBuf>,

    /// Path to a 16-byte explicit kernel decryption key.
    #[arg(long)]
    pub krnl_key: Option<PathBuf>,
}

/// Arguments for the `ls` subcommand.
#[derive(Parser)]
pub struct LsArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Also disassemble and print the init table's xcode stream.
    #[arg(long)]
    pub xcodes: bool,
}

/// Which component to extract.
#[derive(Clone, Copy, clap::ValueEnum)]
pub enum ExtrWhat {
    Bldr,
    Krnl,
    Inittbl,
}

/// Arguments for the `extr` subcommand.
#[derive(Parser)]
pub struct ExtrArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Which component to extract.
    #[arg(long, value_enum)]
    pub what: ExtrWhat,

    /// Output file path.
    #[arg(long)]
    pub out: PathBuf,
}

/// Arguments for the `split` subcommand.
#[derive(Parser)]
pub struct SplitArgs {
    /// Path to the over-sized image file.
    #[arg(long)]
    pub file: PathBuf,

    /// Size of each bank, in KiB.
    #[arg(long)]
    pub romsize: usize,

    /// Directory to write bank0.bin, bank1.bin, ... into.
    #[arg(long)]
    pub out_dir: PathBuf,
}

/// Arguments for the `combine` subcommand.
#[derive(Parser)]
pub struct CombineArgs {
    /// Bank files, in order, 2-4 of them.
    #[arg(long = "bank", required = true)]
    pub banks: Vec<PathBuf>,

    /// Output image file path.
    #[arg(long)]
    pub out: PathBuf,
}

/// Arguments for the `bld` subcommand.
#[derive(Parser)]
pub struct BldArgs {
    /// Init table + xcode stream part.
    #[arg(long)]
    pub inittbl: PathBuf,

    /// 2BL (bldr) part, must be exactly 24576 bytes.
    #[arg(long)]
    pub bldr: PathBuf,

    /// Compressed kernel part.
    #[arg(long)]
    pub krnl: PathBuf,

    /// Uncompressed kernel data tail part.
    #[arg(long)]
    pub krnl_data: PathBuf,

    /// Output image size, in KiB (256, 512, or 1024).
    #[arg(long)]
    pub romsize: usize,

    /// Output file path.
    #[arg(long)]
    pub out: PathBuf,

    /// Encrypt the 2BL with this 16-byte key before writing.
    #[arg(long)]
    pub enc_bldr: Option<PathBuf>,

    /// Encrypt the kernel with this 16-byte key before writing.
    #[arg(long)]
    pub enc_krnl: Option<PathBuf>,

    /// Flip the boot-from-media flag (forces a 1 MiB image).
    #[arg(long)]
    pub flip_bfm: bool,

    /// Zero the init-table identifier byte (test-BIOS generation).
    #[arg(long)]
    pub hackinittbl: bool,

    /// Corrupt the boot-params signature (test-BIOS generation).
    #[arg(long)]
    pub hacksignature: bool,

    /// Skip writing boot params entirely.
    #[arg(long)]
    pub nobootparams: bool,

    /// Patch the decompressed kernel's embedded RSA1 public key modulus
    /// from this 264-byte file before recompressing.
    #[arg(long)]
    pub pubkey: Option<PathBuf>,
}

/// Arguments for the `keys` subcommand.
#[derive(Parser)]
pub struct KeysArgs {
    #[command(flatten)]
    pub load: LoadArgs,
}

/// Arguments for the `xcode-sim` subcommand.
#[derive(Parser)]
pub struct XcodeSimArgs {
    /// Path to a raw xcode stream (9-byte records, exit-terminated).
    #[arg(long)]
    pub file: PathBuf,

    /// Size of the simulated RAM buffer, in KiB.
    #[arg(long, default_value_t = 16)]
    pub ram_size: usize,
}

/// Arguments for the `xcode-decode` subcommand.
#[derive(Parser)]
pub struct XcodeDecodeArgs {
    /// Path to a raw xcode stream (9-byte records, exit-terminated).
    #[arg(long)]
    pub file: PathBuf,

    /// Path to an INI-like settings file overriding the decoder's
    /// mnemonics/format. Defaults are used if omitted.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Output file path; prints to stdout if omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the `decomp-krnl` subcommand.
#[derive(Parser)]
pub struct DecompKrnlArgs {
    /// Path to the LZX-compressed kernel image.
    #[arg(long)]
    pub file: PathBuf,

    /// Output file path.
    #[arg(long)]
    pub out: PathBuf,
}

/// Arguments for the `comp-krnl` subcommand.
#[derive(Parser)]
pub struct CompKrnlArgs {
    /// Path to the raw (decompressed) kernel image.
    #[arg(long)]
    pub file: PathBuf,

    /// Output file path.
    #[arg(long)]
    pub out: PathBuf,
}
