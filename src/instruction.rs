//! Compiled instructions.
//!
//! Each line of the instruction table compiles to one [`Instruction`] value
//! with its operands already resolved. Nothing here executes anything; the
//! interpreter has a single dispatch function that does.

use std::fmt;

use crate::memory::Word;
use crate::registers::{Register, RegisterFile};

/// marker used in the grammar for "the word after the opcode"
pub const DATA: &str = "<DATA>";

/// the amount an ADD adds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addend {
    Literal(Word),
    /// read every time the ADD runs
    Register { register: Register, negate: bool },
}

impl Addend {
    pub fn resolve(&self, registers: &RegisterFile) -> Word {
        match *self {
            Addend::Literal(v) => v,
            Addend::Register { register, negate } => {
                let v = registers.get(register);
                if negate {
                    v.wrapping_neg()
                } else {
                    v
                }
            }
        }
    }
}

impl fmt::Display for Addend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addend::Literal(v) => write!(f, "{}", v),
            Addend::Register {
                register,
                negate: true,
            } => write!(f, "-{}", register),
            Addend::Register { register, .. } => write!(f, "{}", register),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintFormat {
    Uint,
    Char,
}

impl PrintFormat {
    /// text for one PRINT line
    pub fn render(self, value: Word) -> String {
        match self {
            PrintFormat::Uint => value.to_string(),
            PrintFormat::Char => u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string(),
        }
    }
}

impl fmt::Display for PrintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintFormat::Uint => write!(f, "UINT"),
            PrintFormat::Char => write!(f, "CHAR"),
        }
    }
}

/// comparison of a register against zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Equal => write!(f, "=="),
            Comparison::NotEqual => write!(f, "!="),
        }
    }
}

/// trailing `IF Rn == 0` / `IF Rn != 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub register: Register,
    pub comparison: Comparison,
}

impl Guard {
    /// evaluated against the registers as they are when the instruction runs
    pub fn holds(&self, registers: &RegisterFile) -> bool {
        let is_zero = registers.get(self.register) == 0;
        match self.comparison {
            Comparison::Equal => is_zero,
            Comparison::NotEqual => !is_zero,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF {} {} 0", self.register, self.comparison)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `ADD <amount> TO <to>`
    Add { amount: Addend, to: Register },
    Halt,
    /// `PRINT <register> AS UINT|CHAR`
    Print {
        register: Register,
        format: PrintFormat,
    },
    /// `JUMP <DATA>`
    Jump,
    /// `LOAD <DATA> TO <to>`
    Load { to: Register },
    /// `WRITE <from> TO <DATA>`
    Write { from: Register },
    /// `SWAP <register> WITH <DATA>`
    Swap { register: Register },
    Bell,
    /// placeholder for an action that matched no form; only complains when run
    Unknown { action: String },
    Guarded { guard: Guard, inner: Box<Instruction> },
}

impl Instruction {
    pub fn guarded(self, guard: Guard) -> Self {
        Instruction::Guarded {
            guard,
            inner: Box::new(self),
        }
    }

    /// how many inline operand words follow the opcode
    pub fn operand_words(&self) -> usize {
        match self {
            Instruction::Jump
            | Instruction::Load { .. }
            | Instruction::Write { .. }
            | Instruction::Swap { .. } => 1,
            Instruction::Guarded { inner, .. } => inner.operand_words(),
            _ => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Add { amount, to } => write!(f, "ADD {} TO {}", amount, to),
            Instruction::Halt => write!(f, "HALT"),
            Instruction::Print { register, format } => {
                write!(f, "PRINT {} AS {}", register, format)
            }
            Instruction::Jump => write!(f, "JUMP {}", DATA),
            Instruction::Load { to } => write!(f, "LOAD {} TO {}", DATA, to),
            Instruction::Write { from } => write!(f, "WRITE {} TO {}", from, DATA),
            Instruction::Swap { register } => write!(f, "SWAP {} WITH {}", register, DATA),
            Instruction::Bell => write!(f, "BELL"),
            Instruction::Unknown { action } => write!(f, "{}", action),
            Instruction::Guarded { guard, inner } => write!(f, "{} {}", inner, guard),
        }
    }
}
