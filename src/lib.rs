//!
//! ## Design
//!
//! * the chip is described in text: a header of `KEY = INTEGER` options and a
//!   table of `OPCODE : ACTION` lines, compiled once up front
//! * compiled instructions are plain data (an enum), run by one dispatch
//!   function; no closures, nothing global
//! * word width is configurable; registers and the instruction pointer wrap
//!   at M = 2^BITS_PER_BYTE
//! * code and data share memory, so programs can rewrite themselves and the
//!   next fetch sees it
//! * output, sound and step input are traits so the interpreter doesn't need
//!   to know about terminals
//!
//! Model
//!
//! Environment
//!  |-- instruction-set text --> compiler --> InstructionSet(config, opcode table)
//!  |-- program text --> words
//!  |-- console, sound, (input when single-stepping)
//!  `-- interpreter(InstructionSet, console, sound)
//!       |-- ExecutionContext(registers, memory, pointer) per run
//!       `-- loop: fetch opcode, dispatch, advance pointer mod M
//!            |-- HALT         -> Outcome::Halted
//!            |-- pointer >= n -> Outcome::FellOffEnd
//!            `-- no opcode    -> ExecError::UndefinedOpcode
pub mod compiler;
pub mod config;
pub mod console;
pub mod errors;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod registers;
pub mod sound;

pub use compiler::{compile, InstructionSet, Warning};
pub use errors::{CompileError, ExecError, LoadError};
pub use interpreter::{ExecutionContext, Interpreter, Outcome, RunSummary};
pub use memory::{parse_words, Word};
