//! XCODE bytecode interpreter and settings-driven textual disassembler.

pub mod decoder;
mod error;
pub mod interp;
pub mod settings;
pub mod xcode;

pub use decoder::disassemble;
pub use error::XcodeError;
pub use interp::{InterpStatus, XcodeInterp};
pub use settings::DecodeSettings;
pub use xcode::{Opcode, Xcode};
