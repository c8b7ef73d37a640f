use std::io;
use thiserror::Error;

use crate::memory::Word;

/// Failures while compiling an instruction-set definition. Any of these
/// aborts the whole compile step; no partial instruction set is returned.
#[derive(Debug, Error)]
pub enum CompileError {
    /// header line that isn't `KEY = INTEGER`
    #[error("line {line}: malformed configuration entry '{text}'")]
    MalformedConfig { line: usize, text: String },

    /// header value outside the range the machine can model
    #[error("line {line}: invalid value {value} for {key}")]
    InvalidConfigValue { line: usize, key: String, value: Word },

    /// instruction-table line that isn't `OPCODE : ACTION`
    #[error("line {line}: '{text}' is not an opcode definition")]
    MalformedDefinition { line: usize, text: String },

    #[error("line {line}: malformed number '{token}'")]
    MalformedNumber { line: usize, token: String },

    #[error("line {line}: {register} is an illegal register for this chip ({available} available)")]
    RegisterOutOfRange {
        line: usize,
        register: String,
        available: usize,
    },

    #[error("line {line}: malformed condition '{text}'")]
    MalformedCondition { line: usize, text: String },
}

/// Faults that end a run early. Halting is not one of them.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no instruction defined for opcode {opcode} at address {address}")]
    UndefinedOpcode { opcode: Word, address: usize },

    #[error("address {address} is outside program memory (0..{len})")]
    AddressOutOfBounds { address: Word, len: usize },

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    /// console output or step-mode input failed
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("bell failed: {0}")]
    Bell(String),
}

/// Failures turning program text into a memory image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("word {index}: '{token}' is not an integer")]
    MalformedWord { index: usize, token: String },
}
