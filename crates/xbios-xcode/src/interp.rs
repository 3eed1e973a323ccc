//! Linear cursor over an XCODE byte range.
//!
//! Ported from `examples/original_source/src/XcodeInterp.cpp`'s
//! `XcodeInterp::load/reset/interpretNext`: owns a copy of the xcode
//! bytes, advances 9 bytes per call, and latches an exit status once the
//! `0xEE` opcode is observed.

use crate::error::XcodeError;
use crate::xcode::{Xcode, XCODE_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpStatus {
    Unknown,
    DataOk,
    ExitFound,
    DataError,
}

pub struct XcodeInterp {
    data: Vec<u8>,
    offset: usize,
    status: InterpStatus,
    current: Option<Xcode>,
}

impl XcodeInterp {
    pub fn new() -> Self {
        XcodeInterp {
            data: Vec::new(),
            offset: 0,
            status: InterpStatus::Unknown,
            current: None,
        }
    }

    pub fn load(&mut self, data: &[u8]) -> Result<(), XcodeError> {
        self.data = data.to_vec();
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.offset = 0;
        self.status = InterpStatus::Unknown;
        self.current = None;
    }

    /// Advances the cursor by 9 bytes and returns the XCODE just read, or
    /// `None` once an `EXIT` opcode has already been returned. Running off
    /// the end of the buffer without seeing `EXIT` is a [`XcodeError::DataError`].
    pub fn interpret_next(&mut self) -> Result<Option<Xcode>, XcodeError> {
        if self.status == InterpStatus::ExitFound {
            return Ok(None);
        }

        if self.offset + XCODE_LEN > self.data.len() {
            self.status = InterpStatus::DataError;
            return Err(XcodeError::DataError(format!(
                "exit opcode not found, end of data reached at offset {}",
                self.offset
            )));
        }

        let xcode = Xcode::parse(&self.data[self.offset..self.offset + XCODE_LEN]).ok_or_else(|| {
            XcodeError::DataError(format!("unknown opcode byte at offset {}", self.offset))
        })?;

        self.status = if xcode.opcode == crate::xcode::Opcode::Exit {
            InterpStatus::ExitFound
        } else {
            InterpStatus::DataOk
        };

        self.offset += XCODE_LEN;
        self.current = Some(xcode);

        Ok(Some(xcode))
    }

    pub fn get_offset(&self) -> usize {
        self.offset
    }

    pub fn get_current(&self) -> Option<Xcode> {
        self.current
    }

    pub fn status(&self) -> InterpStatus {
        self.status
    }
}

impl Default for XcodeInterp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xcode::Opcode;

    fn xc(opcode: Opcode, addr: u32, data: u32) -> [u8; XCODE_LEN] {
        Xcode { opcode, addr, data }.serialize()
    }

    #[test]
    fn walks_until_exit() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&xc(Opcode::MemWrite, 1, 2));
        bytes.extend_from_slice(&xc(Opcode::Exit, 0, 0));

        let mut interp = XcodeInterp::new();
        interp.load(&bytes).unwrap();

        let first = interp.interpret_next().unwrap().unwrap();
        assert_eq!(first.opcode, Opcode::MemWrite);

        let second = interp.interpret_next().unwrap().unwrap();
        assert_eq!(second.opcode, Opcode::Exit);

        assert!(interp.interpret_next().unwrap().is_none());
    }

    #[test]
    fn missing_exit_is_data_error() {
        let bytes = xc(Opcode::MemWrite, 1, 2);
        let mut interp = XcodeInterp::new();
        interp.load(&bytes).unwrap();
        interp.interpret_next().unwrap();
        assert!(interp.interpret_next().is_err());
    }

    #[test]
    fn reset_allows_a_second_pass() {
        let bytes = xc(Opcode::Exit, 0, 0);
        let mut interp = XcodeInterp::new();
        interp.load(&bytes).unwrap();
        interp.interpret_next().unwrap();
        assert_eq!(interp.status(), InterpStatus::ExitFound);
        interp.reset();
        assert_eq!(interp.status(), InterpStatus::Unknown);
        assert!(interp.interpret_next().unwrap().is_some());
    }
}
