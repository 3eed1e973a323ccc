//! BIOS container layout, MCPX identification, and public-key scanning.
//!
//! This crate owns the data model: the fixed-offset structs the boot chain
//! agrees on (init table, boot params, loader params, 2BL keys), the MCPX
//! classifier, the RSA1 public-key scanner, and the container engine that
//! ties them together into `load`/`build`/`replicate`/`split`/`combine`.

pub mod bios;
pub mod bldr;
mod error;
pub mod mcpx;
pub mod pubkey;

pub use bios::{build, combine, load, replicate, split, BiosImage, BiosParams, BiosParts, BuildParams};
pub use error::BiosError;
pub use mcpx::{McpxInfo, McpxRevision};
pub use pubkey::PublicKeyRecord;
