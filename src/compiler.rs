//! Instruction-set compiler.
//!
//! Source format:
//!
//! ```text
//! KEY = INTEGER                               (zero or more)
//! INSTRUCTIONS:
//! OPCODE : ACTION [IF Rn (==|!=) 0]           (zero or more)
//! ```
//!
//! Actions:
//!
//! ```text
//! ADD [-](Rn|digits) TO Rn
//! HALT
//! PRINT Rn AS (UINT|CHAR)
//! JUMP <DATA>
//! LOAD <DATA> TO Rn
//! WRITE Rn TO <DATA>
//! SWAP Rn WITH <DATA>
//! BELL
//! ```
//!
//! Keywords are case-insensitive and blank lines are skipped. A form only has
//! to match the start of the action; anything after it (up to `IF`) is
//! ignored. An action that fits none of the forms still compiles, to a
//! placeholder that complains when it's executed. A form that fits but names
//! a register the chip doesn't have, or a number that doesn't fit in a word,
//! fails the whole compile.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{self, Config};
use crate::errors::CompileError;
use crate::instruction::{Addend, Comparison, Guard, Instruction, PrintFormat, DATA};
use crate::memory::Word;
use crate::registers::Register;

/// separates the header from the instruction table
pub const MARKER: &str = "INSTRUCTIONS:";

const IF: &str = "IF";

/// Non-fatal problems found while compiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// opcode defined again; the later definition replaced the earlier one
    DuplicateOpcode { line: usize, opcode: Word },
    /// action matched no form and was compiled to a placeholder
    UnknownAction {
        line: usize,
        opcode: Word,
        action: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateOpcode { line, opcode } => write!(
                f,
                "line {}: duplicate instruction {}, last declared will take priority",
                line, opcode
            ),
            Warning::UnknownAction {
                line,
                opcode,
                action,
            } => write!(f, "line {}: unknown action for {} - {}", line, opcode, action),
        }
    }
}

/// The compiled chip: its configuration and the opcode table. Immutable, and
/// reusable across any number of runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSet {
    config: Config,
    instructions: BTreeMap<Word, Instruction>,
    warnings: Vec<Warning>,
}

impl InstructionSet {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get(&self, opcode: Word) -> Option<&Instruction> {
        self.instructions.get(&opcode)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// opcodes in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (Word, &Instruction)> {
        self.instructions.iter().map(|(op, instr)| (*op, instr))
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

impl fmt::Display for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NUM_REGISTERS = {}", self.config.num_registers())?;
        writeln!(f, "BITS_PER_BYTE = {}", self.config.bits_per_byte())?;
        writeln!(f, "CELLS = {}", self.config.cells())?;
        writeln!(f, "{}", MARKER)?;
        for (opcode, instr) in self.iter() {
            writeln!(f, "{} : {}", opcode, instr)?;
        }
        Ok(())
    }
}

impl FromStr for InstructionSet {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

/// compile a whole instruction-set definition
pub fn compile(source: &str) -> Result<InstructionSet, CompileError> {
    let mut config = Config::new();
    let mut instructions = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut in_table = false;

    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        if !in_table {
            if text.to_ascii_uppercase().starts_with(MARKER) {
                in_table = true;
                continue;
            }
            let (key, value) = config::parse_entry(text, line)?;
            log::debug!("config {} = {}", key, value);
            config.set(&key, value, line)?;
            continue;
        }

        let (opcode, action) = split_definition(text, line)?;
        let instr = Parser { line, config: &config }.compile(action)?;
        log::debug!("{} : {}", opcode, instr);

        if is_placeholder(&instr) {
            let w = Warning::UnknownAction {
                line,
                opcode,
                action: action.to_string(),
            };
            log::warn!("{}", w);
            warnings.push(w);
        }
        if instructions.insert(opcode, instr).is_some() {
            let w = Warning::DuplicateOpcode { line, opcode };
            log::warn!("{}", w);
            warnings.push(w);
        }
    }

    if !in_table {
        log::warn!("no {} marker found; the instruction set is empty", MARKER);
    }
    log::info!(
        "compiled {} instruction(s) for a {}-register, {}-bit chip",
        instructions.len(),
        config.num_registers(),
        config.bits_per_byte()
    );

    Ok(InstructionSet {
        config,
        instructions,
        warnings,
    })
}

/// `OPCODE : ACTION` -> (opcode, action text)
fn split_definition(text: &str, line: usize) -> Result<(Word, &str), CompileError> {
    let (opcode, action) = text
        .split_once(':')
        .ok_or_else(|| CompileError::MalformedDefinition {
            line,
            text: text.to_string(),
        })?;
    let opcode = opcode.trim();
    let opcode = opcode
        .parse::<Word>()
        .map_err(|_| CompileError::MalformedNumber {
            line,
            token: opcode.to_string(),
        })?;
    Ok((opcode, action.trim()))
}

fn is_placeholder(instr: &Instruction) -> bool {
    match instr {
        Instruction::Unknown { .. } => true,
        Instruction::Guarded { inner, .. } => is_placeholder(inner),
        _ => false,
    }
}

/// `R` followed by digits
fn is_register(token: &str) -> bool {
    token.strip_prefix('R').map_or(false, is_digits)
}

/// `[-][R]digits`
fn is_number(token: &str) -> bool {
    let t = token.strip_prefix('-').unwrap_or(token);
    let t = t.strip_prefix('R').unwrap_or(t);
    is_digits(t)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Compiles one action against the configuration read so far.
struct Parser<'a> {
    line: usize,
    config: &'a Config,
}

impl<'a> Parser<'a> {
    fn compile(&self, action: &str) -> Result<Instruction, CompileError> {
        let upper = action.to_ascii_uppercase();
        let tokens: Vec<&str> = upper.split_whitespace().collect();
        match tokens.iter().position(|t| *t == IF) {
            Some(at) => {
                let guard = self.guard(&tokens[at + 1..], action)?;
                log::debug!("make condition => {}", guard);
                Ok(self.action(&tokens[..at])?.guarded(guard))
            }
            None => self.action(&tokens),
        }
    }

    fn action(&self, tokens: &[&str]) -> Result<Instruction, CompileError> {
        let instr = match *tokens {
            ["ADD", amount, "TO", to, ..] if is_number(amount) && is_register(to) => {
                Instruction::Add {
                    amount: self.addend(amount)?,
                    to: self.register(to)?,
                }
            }
            ["HALT", ..] => Instruction::Halt,
            ["PRINT", register, "AS", "UINT", ..] if is_register(register) => Instruction::Print {
                register: self.register(register)?,
                format: PrintFormat::Uint,
            },
            ["PRINT", register, "AS", "CHAR", ..] if is_register(register) => Instruction::Print {
                register: self.register(register)?,
                format: PrintFormat::Char,
            },
            ["JUMP", DATA, ..] => Instruction::Jump,
            ["LOAD", DATA, "TO", to, ..] if is_register(to) => Instruction::Load {
                to: self.register(to)?,
            },
            ["WRITE", from, "TO", DATA, ..] if is_register(from) => Instruction::Write {
                from: self.register(from)?,
            },
            ["SWAP", register, "WITH", DATA, ..] if is_register(register) => Instruction::Swap {
                register: self.register(register)?,
            },
            ["BELL", ..] => Instruction::Bell,
            _ => {
                return Ok(Instruction::Unknown {
                    action: tokens.join(" "),
                })
            }
        };
        let used = instr.to_string().split_whitespace().count();
        if tokens.len() > used {
            log::debug!("ignoring trailing text {:?}", tokens[used..].join(" "));
        }
        Ok(instr)
    }

    /// `Rn (==|!=) 0`
    fn guard(&self, tokens: &[&str], action: &str) -> Result<Guard, CompileError> {
        let malformed = || CompileError::MalformedCondition {
            line: self.line,
            text: action.to_string(),
        };
        match *tokens {
            [register, op, zero] if is_register(register) && zero.parse::<Word>() == Ok(0) => {
                let comparison = match op {
                    "==" => Comparison::Equal,
                    "!=" => Comparison::NotEqual,
                    _ => return Err(malformed()),
                };
                Ok(Guard {
                    register: self.register(register)?,
                    comparison,
                })
            }
            _ => Err(malformed()),
        }
    }

    /// a token already known to look like `Rdigits`
    fn register(&self, token: &str) -> Result<Register, CompileError> {
        let available = self.config.num_registers();
        token[1..]
            .parse::<usize>()
            .ok()
            .filter(|index| *index < available)
            .map(Register::new)
            .ok_or_else(|| CompileError::RegisterOutOfRange {
                line: self.line,
                register: token.to_string(),
                available,
            })
    }

    /// a token already known to look like `[-][R]digits`
    fn addend(&self, token: &str) -> Result<Addend, CompileError> {
        let (negate, rest) = match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        if rest.starts_with('R') {
            return Ok(Addend::Register {
                register: self.register(rest)?,
                negate,
            });
        }
        token
            .parse::<Word>()
            .map(Addend::Literal)
            .map_err(|_| CompileError::MalformedNumber {
                line: self.line,
                token: token.to_string(),
            })
    }
}
