//! Hand-rolled reader for the XCODE decoder's settings file.
//!
//! Grounded on `examples/original_source/inc/loadini.h`'s `LOADINI_SETTING`
//! table and `XcodeDecoder.cpp`'s `settings_map`/`loadSettings`: nine
//! generic keys plus one override key per opcode mnemonic. Deliberately not
//! a general-purpose INI crate -- spec.md §1 scopes that out explicitly, and
//! every key this format needs is known ahead of time.

use std::collections::HashMap;

use crate::error::XcodeError;
use crate::xcode::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumFormat {
    Hex,
    Hex8,
    HexUpper,
    HexUpper8,
}

impl NumFormat {
    pub fn format(self, value: u32) -> String {
        match self {
            NumFormat::Hex => format!("{value:x}"),
            NumFormat::Hex8 => format!("{value:08x}"),
            NumFormat::HexUpper => format!("{value:X}"),
            NumFormat::HexUpper8 => format!("{value:08X}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeSettings {
    pub format_str: String,
    pub jmp_str: String,
    pub no_operand_str: String,
    pub num_format: NumFormat,
    pub comment_prefix: String,
    pub label_on_new_line: bool,
    pub pad: bool,
    pub opcode_use_result: bool,
    pub opcode_names: HashMap<Opcode, String>,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        DecodeSettings {
            format_str: "{offset}: {op} {addr} {data} {comment}".to_string(),
            jmp_str: "{label}:".to_string(),
            no_operand_str: String::new(),
            num_format: NumFormat::Hex,
            comment_prefix: "; ".to_string(),
            label_on_new_line: false,
            pad: true,
            opcode_use_result: false,
            opcode_names: HashMap::new(),
        }
    }
}

impl DecodeSettings {
    pub fn mnemonic(&self, op: Opcode) -> &str {
        self.opcode_names
            .get(&op)
            .map(String::as_str)
            .unwrap_or_else(|| op.default_mnemonic())
    }

    /// Parses a flat `key = value` settings file (blank lines and `#`/`;`
    /// comments ignored). Recognized generic keys: `format_str`, `jmp_str`,
    /// `no_operand_str`, `num_str` (one of `{hex}`, `{hex8}`, `{HEX}`,
    /// `{HEX8}`), `comment_prefix`, `label_on_new_line`, `pad`,
    /// `opcode_use_result`. Any `xc_<mnemonic>` key overrides that opcode's
    /// printed name.
    pub fn load(text: &str) -> Result<Self, XcodeError> {
        let mut settings = DecodeSettings::default();

        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(XcodeError::InvalidSettings(format!(
                    "line {}: expected 'key = value'",
                    lineno + 1
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "format_str" => settings.format_str = value.to_string(),
                "jmp_str" => settings.jmp_str = value.to_string(),
                "no_operand_str" => settings.no_operand_str = value.to_string(),
                "comment_prefix" => settings.comment_prefix = value.to_string(),
                "num_str" => {
                    settings.num_format = match value {
                        "{hex}" => NumFormat::Hex,
                        "{hex8}" => NumFormat::Hex8,
                        "{HEX}" => NumFormat::HexUpper,
                        "{HEX8}" => NumFormat::HexUpper8,
                        other => {
                            return Err(XcodeError::InvalidSettings(format!(
                                "line {}: unrecognized num_str token '{other}'",
                                lineno + 1
                            )))
                        }
                    }
                }
                "label_on_new_line" => settings.label_on_new_line = parse_bool(value, lineno)?,
                "pad" => settings.pad = parse_bool(value, lineno)?,
                "opcode_use_result" => settings.opcode_use_result = parse_bool(value, lineno)?,
                _ => {
                    if let Some(op) = Opcode::ALL.iter().find(|o| o.settings_key() == key) {
                        settings.opcode_names.insert(*op, value.to_string());
                    } else {
                        return Err(XcodeError::InvalidSettings(format!(
                            "line {}: unrecognized key '{key}'",
                            lineno + 1
                        )));
                    }
                }
            }
        }

        Ok(settings)
    }
}

fn parse_bool(value: &str, lineno: usize) -> Result<bool, XcodeError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(XcodeError::InvalidSettings(format!(
            "line {}: expected a bool, got '{other}'",
            lineno + 1
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_format_str() {
        let s = DecodeSettings::default();
        assert_eq!(s.format_str, "{offset}: {op} {addr} {data} {comment}");
        assert_eq!(s.mnemonic(Opcode::MemWrite), "mem_write");
    }

    #[test]
    fn overrides_opcode_mnemonic() {
        let s = DecodeSettings::load("xc_mem_write = poke\n").unwrap();
        assert_eq!(s.mnemonic(Opcode::MemWrite), "poke");
        assert_eq!(s.mnemonic(Opcode::MemRead), "mem_read");
    }

    #[test]
    fn parses_all_generic_keys() {
        let text = "\
format_str = {offset} {op}
jmp_str = goto {label}
no_operand_str = -
num_str = {HEX8}
comment_prefix = //
label_on_new_line = true
pad = false
opcode_use_result = 1
";
        let s = DecodeSettings::load(text).unwrap();
        assert_eq!(s.format_str, "{offset} {op}");
        assert_eq!(s.jmp_str, "goto {label}");
        assert_eq!(s.no_operand_str, "-");
        assert_eq!(s.num_format, NumFormat::HexUpper8);
        assert!(s.label_on_new_line);
        assert!(!s.pad);
        assert!(s.opcode_use_result);
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(DecodeSettings::load("not_a_real_key = 1\n").is_err());
    }

    #[test]
    fn ignores_blank_lines_and_comments() {
        let text = "# a comment\n\n; also a comment\nformat_str = x\n";
        let s = DecodeSettings::load(text).unwrap();
        assert_eq!(s.format_str, "x");
    }
}
