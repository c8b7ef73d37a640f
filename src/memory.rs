use std::fmt;
use std::str::FromStr;

use crate::errors::{ExecError, LoadError};

/// one memory cell / register value
pub type Word = i64;

// NB. addresses arrive as words read out of memory, so they are signed here;
//     anything outside 0..len is a fault, there's no wrapping on lookup

/// Represents the flat program memory: code and data share the same cells
pub trait MemoryMap {
    /// number of cells
    fn len(&self) -> usize;

    /// read a single word
    fn get_word(&self, addr: Word) -> Result<Word, ExecError>;

    /// overwrite a single word; visible to the very next fetch
    fn set_word(&mut self, addr: Word, value: Word) -> Result<(), ExecError>;

    /// store `value` at `addr`, handing back what was there before
    fn swap_word(&mut self, addr: Word, value: Word) -> Result<Word, ExecError> {
        let old = self.get_word(addr)?;
        self.set_word(addr, value)?;
        Ok(old)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Program image for a single run. Created fresh from the loaded word list
/// every time a program is executed and thrown away afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramMemory {
    words: Vec<Word>,
}

impl ProgramMemory {
    pub fn new(words: Vec<Word>) -> Self {
        ProgramMemory { words }
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }

    pub fn into_words(self) -> Vec<Word> {
        self.words
    }

    fn index(&self, addr: Word) -> Result<usize, ExecError> {
        usize::try_from(addr)
            .ok()
            .filter(|a| *a < self.words.len())
            .ok_or(ExecError::AddressOutOfBounds {
                address: addr,
                len: self.words.len(),
            })
    }
}

impl MemoryMap for ProgramMemory {
    fn len(&self) -> usize {
        self.words.len()
    }

    fn get_word(&self, addr: Word) -> Result<Word, ExecError> {
        let a = self.index(addr)?;
        Ok(self.words[a])
    }

    fn set_word(&mut self, addr: Word, value: Word) -> Result<(), ExecError> {
        let a = self.index(addr)?;
        self.words[a] = value;
        Ok(())
    }
}

impl FromStr for ProgramMemory {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_words(s).map(ProgramMemory::new)
    }
}

impl fmt::Display for ProgramMemory {
    /// sixteen words to a row, each row prefixed with its first address
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.words.chunks(16).enumerate() {
            write!(f, "{:04}:", row * 16)?;
            for w in chunk {
                write!(f, " {}", w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// read a whitespace-separated list of base-10 integers (lines don't matter)
pub fn parse_words(text: &str) -> Result<Vec<Word>, LoadError> {
    text.split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            token.parse::<Word>().map_err(|_| LoadError::MalformedWord {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}
