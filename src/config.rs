use std::collections::BTreeMap;

use crate::errors::CompileError;
use crate::memory::Word;

/// how many registers a chip has when the header doesn't say
pub const DEFAULT_NUM_REGISTERS: usize = 1;
/// word width when the header doesn't say; M = 2^4 = 16
pub const DEFAULT_BITS_PER_BYTE: u32 = 4;
/// advisory memory size
pub const DEFAULT_CELLS: usize = 16;

// keeps M representable as a positive Word
const MAX_BITS_PER_BYTE: u32 = 62;
/// largest register file a chip may declare
pub const MAX_NUM_REGISTERS: usize = 1024;

/// The header of an instruction-set file: a handful of `KEY = INTEGER`
/// options describing the chip. Only the compiler mutates it; once an
/// instruction set has been compiled its configuration is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    num_registers: usize,
    bits_per_byte: u32,
    cells: usize,
    extra: BTreeMap<String, Word>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            num_registers: DEFAULT_NUM_REGISTERS,
            bits_per_byte: DEFAULT_BITS_PER_BYTE,
            cells: DEFAULT_CELLS,
            extra: BTreeMap::new(),
        }
    }

    pub fn num_registers(&self) -> usize {
        self.num_registers
    }

    pub fn bits_per_byte(&self) -> u32 {
        self.bits_per_byte
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    /// wraparound modulus M = 2^BITS_PER_BYTE
    pub fn modulus(&self) -> Word {
        1 << self.bits_per_byte
    }

    /// reduce a value into [0, M)
    pub fn wrap(&self, value: Word) -> Word {
        value.rem_euclid(self.modulus())
    }

    /// look up any option by name, including ones the machine doesn't use
    pub fn get(&self, key: &str) -> Option<Word> {
        match key.to_ascii_uppercase().as_str() {
            "NUM_REGISTERS" | "REGISTERS" => Some(self.num_registers as Word),
            "BITS_PER_BYTE" => Some(self.bits_per_byte as Word),
            "CELLS" => Some(self.cells as Word),
            other => self.extra.get(other).copied(),
        }
    }

    /// apply one header option; `line` is only used for error reporting
    pub(crate) fn set(&mut self, key: &str, value: Word, line: usize) -> Result<(), CompileError> {
        let key = key.to_ascii_uppercase();
        let invalid = || CompileError::InvalidConfigValue {
            line,
            key: key.clone(),
            value,
        };
        match key.as_str() {
            // older chip files spell this one REGISTERS
            "NUM_REGISTERS" | "REGISTERS" => {
                self.num_registers = usize::try_from(value)
                    .ok()
                    .filter(|count| *count <= MAX_NUM_REGISTERS)
                    .ok_or_else(invalid)?;
            }
            "BITS_PER_BYTE" => {
                self.bits_per_byte = u32::try_from(value)
                    .ok()
                    .filter(|bits| (1..=MAX_BITS_PER_BYTE).contains(bits))
                    .ok_or_else(invalid)?;
            }
            "CELLS" => {
                self.cells = usize::try_from(value).map_err(|_| invalid())?;
            }
            _ => {
                log::debug!("keeping unrecognised option {} = {}", key, value);
                self.extra.insert(key, value);
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// split a `KEY = INTEGER` header line
pub(crate) fn parse_entry(text: &str, line: usize) -> Result<(String, Word), CompileError> {
    let malformed = || CompileError::MalformedConfig {
        line,
        text: text.to_string(),
    };
    let (key, value) = text.split_once('=').ok_or_else(malformed)?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(malformed());
    }
    let value = value.trim();
    let value = value
        .parse::<Word>()
        .map_err(|_| CompileError::MalformedNumber {
            line,
            token: value.to_string(),
        })?;
    Ok((key.to_string(), value))
}
