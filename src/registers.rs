use std::fmt;

use crate::memory::Word;

/// A register index that has already been checked against the chip's
/// register count, so the engine never needs to bounds-check it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(usize);

impl Register {
    /// only the compiler (and tests) should mint these
    pub(crate) fn new(index: usize) -> Self {
        Register(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// fixed-size, zeroed register file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    values: Vec<Word>,
}

impl RegisterFile {
    pub fn new(count: usize) -> Self {
        RegisterFile {
            values: vec![0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, reg: Register) -> Word {
        self.values[reg.index()]
    }

    pub fn set(&mut self, reg: Register, value: Word) {
        self.values[reg.index()] = value;
    }

    /// `reg = (reg + amount) mod modulus`; the sum is done wide so a large
    /// literal can't overflow before it's reduced
    pub fn add(&mut self, reg: Register, amount: Word, modulus: Word) -> Word {
        let sum = self.get(reg) as i128 + amount as i128;
        let value = sum.rem_euclid(modulus as i128) as Word;
        self.set(reg, value);
        value
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.values
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "R{}={}", i, v)?;
        }
        Ok(())
    }
}
