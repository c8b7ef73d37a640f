//! # interpreter
//!
//! The execution engine. All mutable machine state (registers, program
//! memory, instruction pointer) lives in an [`ExecutionContext`] that one run
//! owns outright; the compiled [`InstructionSet`] is only ever borrowed, so the
//! same chip can run any number of programs.
//!
//! Each fetch cycle:
//!  1. fetch the opcode at the instruction pointer
//!  2. look it up and dispatch it; an opcode with no definition is a fault
//!  3. advance the pointer by one, mod M (or go where a JUMP said)
//!
//! JUMP / LOAD / WRITE / SWAP take their operand from the word after the
//! opcode, stepping the pointer onto it first, so step 3 lands on the next
//! real opcode. A run ends on HALT, or when the pointer falls off the end of
//! memory.

use std::time::Duration;

use crate::compiler::InstructionSet;
use crate::console::Console;
use crate::errors::ExecError;
use crate::input::{Input, StepCommand};
use crate::instruction::Instruction;
use crate::memory::{MemoryMap, ProgramMemory, Word};
use crate::registers::RegisterFile;
use crate::sound::Sound;

/// what an unknown action prints when it's reached
pub const UNDEFINED_ACTION: &str = "[undefined action]";

/// where control goes after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    /// pointer goes straight to this address, no increment
    Jump(usize),
    Halt,
}

/// how a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// HALT was executed
    Halted,
    /// the instruction pointer went past the last cell
    FellOffEnd,
    /// the operator quit while single-stepping
    Aborted,
}

/// machine state for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    registers: RegisterFile,
    memory: ProgramMemory,
    pointer: usize,
    modulus: Word,
    steps: u64,
}

impl ExecutionContext {
    pub fn new(instructions: &InstructionSet, program: Vec<Word>) -> Self {
        let config = instructions.config();
        if program.len() > config.cells() {
            log::warn!(
                "program is {} words but the chip declares {} cells",
                program.len(),
                config.cells()
            );
        }
        ExecutionContext {
            registers: RegisterFile::new(config.num_registers()),
            memory: ProgramMemory::new(program),
            pointer: 0,
            modulus: config.modulus(),
            steps: 0,
        }
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn memory(&self) -> &ProgramMemory {
        &self.memory
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// completed fetch cycles
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn at_end(&self) -> bool {
        self.pointer >= self.memory.len()
    }

    // the one place the pointer is incremented
    fn advance(&mut self) {
        self.pointer = (self.pointer as Word + 1).rem_euclid(self.modulus) as usize;
    }

    /// step onto the inline operand word and read it
    fn operand(&mut self) -> Result<Word, ExecError> {
        self.advance();
        self.memory.get_word(self.pointer as Word)
    }
}

/// final state of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub context: ExecutionContext,
}

pub struct Interpreter<'a> {
    instructions: &'a InstructionSet,
    console: &'a mut dyn Console,
    sound: &'a mut dyn Sound,
    step_limit: Option<u64>,
    clock_period: Option<Duration>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        instructions: &'a InstructionSet,
        console: &'a mut dyn Console,
        sound: &'a mut dyn Sound,
    ) -> Self {
        Interpreter {
            instructions,
            console,
            sound,
            step_limit: None,
            clock_period: None,
        }
    }

    /// fault with `StepLimitExceeded` instead of running more than `limit`
    /// fetch cycles
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// pace the fetch loop to roughly `hz` cycles a second; anything that
    /// isn't a positive, finite rate leaves it unpaced
    pub fn with_clock(mut self, hz: f64) -> Self {
        self.clock_period = Some(hz)
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .map(|hz| Duration::from_secs_f64(1.0 / hz));
        self
    }

    pub fn instructions(&self) -> &InstructionSet {
        self.instructions
    }

    /// run a program from address 0 until it halts or falls off the end
    pub fn execute(&mut self, program: Vec<Word>) -> Result<RunSummary, ExecError> {
        let mut ctx = ExecutionContext::new(self.instructions, program);
        loop {
            if let Some(outcome) = self.step(&mut ctx)? {
                return Ok(self.finish(outcome, ctx));
            }
            self.pace();
        }
    }

    /// like `execute`, but asks `input` before each fetch cycle until told to
    /// continue or quit
    pub fn execute_stepping(
        &mut self,
        program: Vec<Word>,
        input: &mut dyn Input,
    ) -> Result<RunSummary, ExecError> {
        let mut ctx = ExecutionContext::new(self.instructions, program);
        let mut stepping = true;
        loop {
            if stepping && !ctx.at_end() {
                match input.next_command(&self.describe(&ctx))? {
                    StepCommand::Step => {}
                    StepCommand::Continue => stepping = false,
                    StepCommand::Quit => return Ok(self.finish(Outcome::Aborted, ctx)),
                }
            }
            if let Some(outcome) = self.step(&mut ctx)? {
                return Ok(self.finish(outcome, ctx));
            }
            if !stepping {
                self.pace();
            }
        }
    }

    /// one fetch/execute/advance cycle; `Some` once the run is over
    pub fn step(&mut self, ctx: &mut ExecutionContext) -> Result<Option<Outcome>, ExecError> {
        if ctx.at_end() {
            return Ok(Some(Outcome::FellOffEnd));
        }
        if let Some(limit) = self.step_limit {
            if ctx.steps >= limit {
                return Err(ExecError::StepLimitExceeded { limit });
            }
        }

        let address = ctx.pointer;
        let opcode = ctx.memory.get_word(address as Word)?;
        let instr = self
            .instructions
            .get(opcode)
            .ok_or(ExecError::UndefinedOpcode { opcode, address })?;
        log::trace!("{}", self.describe(ctx));

        let flow = self.dispatch(instr, ctx)?;
        ctx.steps += 1;
        match flow {
            Flow::Halt => return Ok(Some(Outcome::Halted)),
            Flow::Next => ctx.advance(),
            Flow::Jump(target) => ctx.pointer = target,
        }
        Ok(if ctx.at_end() {
            Some(Outcome::FellOffEnd)
        } else {
            None
        })
    }

    /// carry out a single instruction against the context
    pub fn dispatch(
        &mut self,
        instr: &Instruction,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, ExecError> {
        let flow = match instr {
            Instruction::Add { amount, to } => {
                let amount = amount.resolve(&ctx.registers);
                ctx.registers.add(*to, amount, ctx.modulus);
                Flow::Next
            }
            Instruction::Halt => Flow::Halt,
            Instruction::Print { register, format } => {
                let line = format.render(ctx.registers.get(*register));
                self.console.write_line(&line)?;
                Flow::Next
            }
            Instruction::Jump => {
                let target = ctx.operand()?;
                Flow::Jump(target.rem_euclid(ctx.modulus) as usize)
            }
            Instruction::Load { to } => {
                let word = ctx.operand()?;
                ctx.registers.set(*to, word);
                Flow::Next
            }
            Instruction::Write { from } => {
                let dest = ctx.operand()?;
                ctx.memory.set_word(dest, ctx.registers.get(*from))?;
                Flow::Next
            }
            Instruction::Swap { register } => {
                let addr = ctx.operand()?;
                let old = ctx.memory.swap_word(addr, ctx.registers.get(*register))?;
                ctx.registers.set(*register, old);
                Flow::Next
            }
            Instruction::Bell => {
                self.sound
                    .bell()
                    .map_err(|e| ExecError::Bell(e.to_string()))?;
                Flow::Next
            }
            Instruction::Unknown { action } => {
                log::warn!("{} {}", UNDEFINED_ACTION, action);
                self.console.write_line(UNDEFINED_ACTION)?;
                Flow::Next
            }
            Instruction::Guarded { guard, inner } => {
                if guard.holds(&ctx.registers) {
                    self.dispatch(inner, ctx)?
                } else {
                    Flow::Next
                }
            }
        };
        Ok(flow)
    }

    /// one-line summary of what's about to execute
    pub fn describe(&self, ctx: &ExecutionContext) -> String {
        let address = ctx.pointer;
        let opcode = match ctx.memory.get_word(address as Word) {
            Ok(op) => op,
            Err(_) => return format!("[{:>4}] <end> | {}", address, ctx.registers),
        };
        let text = match self.instructions.get(opcode) {
            Some(instr) if instr.operand_words() > 0 => {
                let operand = ctx
                    .memory
                    .get_word(address as Word + 1)
                    .map_or_else(|_| "?".to_string(), |w| w.to_string());
                format!("{} ({})", instr, operand)
            }
            Some(instr) => instr.to_string(),
            None => "(undefined)".to_string(),
        };
        format!(
            "[{:>4}] {:>4} : {} | {}",
            address, opcode, text, ctx.registers
        )
    }

    fn pace(&self) {
        if let Some(period) = self.clock_period {
            spin_sleep::sleep(period);
        }
    }

    fn finish(&self, outcome: Outcome, context: ExecutionContext) -> RunSummary {
        log::info!(
            "run ended ({:?}) after {} step(s) at address {}",
            outcome,
            context.steps,
            context.pointer
        );
        RunSummary { outcome, context }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::console::BufferConsole;
    use crate::errors::CompileError;
    use crate::input::ScriptedInput;
    use crate::sound::Mute;
    use std::error::Error;

    type TestResult = Result<(), Box<dyn Error>>;

    /// opcodes used throughout: 0 HALT, 1 ADD 1 TO R0, 2 PRINT R0 AS UINT
    const BASIC: &str = "NUM_REGISTERS = 2
BITS_PER_BYTE = 4
CELLS = 16
INSTRUCTIONS:
0 : HALT
1 : ADD 1 TO R0
2 : PRINT R0 AS UINT
3 : JUMP <DATA>
4 : LOAD <DATA> TO R0
5 : WRITE R0 TO <DATA>
6 : SWAP R0 WITH <DATA>
7 : BELL
8 : ADD 1 TO R0 IF R0 == 0
9 : PRINT R0 AS CHAR
10 : ADD -1 TO R0
11 : ADD R0 TO R1
12 : PRINT R1 AS UINT
13 : FROBNICATE
14 : JUMP <DATA> IF R0 != 0
15 : LOAD <DATA> TO R1
";

    fn chip() -> Result<InstructionSet, CompileError> {
        compile(BASIC)
    }

    fn run(set: &InstructionSet, program: &[Word]) -> Result<(RunSummary, Vec<String>), ExecError> {
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let summary = Interpreter::new(set, &mut console, &mut sound).execute(program.to_vec())?;
        Ok((summary, console.lines().to_vec()))
    }

    #[test]
    fn test_add_add_print_halt() -> TestResult {
        let set = chip()?;
        let (summary, out) = run(&set, &[1, 1, 2, 0])?;
        assert_eq!(out, vec!["2"]);
        assert_eq!(summary.outcome, Outcome::Halted);
        assert_eq!(summary.context.registers().as_slice(), &[2, 0]);
        assert_eq!(summary.context.steps(), 4);
        Ok(())
    }

    #[test]
    fn test_falls_off_end() -> TestResult {
        let set = chip()?;
        let (summary, out) = run(&set, &[1, 2])?;
        assert_eq!(out, vec!["1"]);
        assert_eq!(summary.outcome, Outcome::FellOffEnd);
        assert_eq!(summary.context.pointer(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_program() -> TestResult {
        let set = chip()?;
        let (summary, out) = run(&set, &[])?;
        assert!(out.is_empty());
        assert_eq!(summary.outcome, Outcome::FellOffEnd);
        assert_eq!(summary.context.steps(), 0);
        Ok(())
    }

    #[test]
    fn test_add_wraps_at_modulus() -> TestResult {
        let set = chip()?;
        let mut program = vec![10, 2];
        program.extend([1; 2]);
        program.extend([2, 0]);
        let (summary, out) = run(&set, &program)?;
        // 0 - 1 = 15, then +2 wraps to 1
        assert_eq!(out, vec!["15", "1"]);
        assert_eq!(summary.context.registers().get(crate::registers::Register::new(0)), 1);
        Ok(())
    }

    #[test]
    fn test_guard_true_and_false() -> TestResult {
        let set = chip()?;
        // R0 == 0 so the guarded add runs
        let (_, out) = run(&set, &[8, 2, 0])?;
        assert_eq!(out, vec!["1"]);
        // R0 == 1 so it doesn't
        let (_, out) = run(&set, &[1, 8, 2, 0])?;
        assert_eq!(out, vec!["1"]);
        Ok(())
    }

    #[test]
    fn test_skipped_guard_skips_operand_consumption() -> TestResult {
        let set = chip()?;
        // R0 == 0: the guarded JUMP is skipped, so its would-be operand
        // word (2) is fetched as an opcode and prints
        let (summary, out) = run(&set, &[14, 2, 0])?;
        assert_eq!(out, vec!["0"]);
        assert_eq!(summary.outcome, Outcome::Halted);
        Ok(())
    }

    #[test]
    fn test_jump_lands_on_target() -> TestResult {
        let set = chip()?;
        // address:   0  1  2  3  4  5
        let program = [3, 5, 1, 1, 1, 2, 0];
        let (summary, out) = run(&set, &program)?;
        assert_eq!(out, vec!["0"]);
        assert_eq!(summary.context.steps(), 3);
        Ok(())
    }

    #[test]
    fn test_jump_target_wraps() -> TestResult {
        let set = chip()?;
        // 21 mod 16 = 5
        let (_, out) = run(&set, &[3, 21, 1, 1, 1, 2, 0])?;
        assert_eq!(out, vec!["0"]);
        // -11 mod 16 = 5 as well
        let (_, out) = run(&set, &[3, -11, 1, 1, 1, 2, 0])?;
        assert_eq!(out, vec!["0"]);
        Ok(())
    }

    #[test]
    fn test_jump_to_zero_loops() -> TestResult {
        let set = chip()?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let result = Interpreter::new(&set, &mut console, &mut sound)
            .with_step_limit(9)
            .execute(vec![1, 2, 3, 0]);
        assert!(matches!(result, Err(ExecError::StepLimitExceeded { limit: 9 })));
        assert_eq!(console.lines(), &["1", "2", "3"]);
        Ok(())
    }

    #[test]
    fn test_load_then_write_round_trip() -> TestResult {
        let set = chip()?;
        // LOAD takes the word in cell 1 (7); WRITE puts it back into cell 1
        let program = vec![4, 7, 5, 1, 0];
        let (summary, _) = run(&set, &program)?;
        assert_eq!(summary.context.memory().as_slice(), program.as_slice());
        assert_eq!(summary.context.registers().as_slice(), &[7, 0]);
        Ok(())
    }

    #[test]
    fn test_load_keeps_raw_word() -> TestResult {
        let set = chip()?;
        let (_, out) = run(&set, &[4, 300, 2, 0])?;
        assert_eq!(out, vec!["300"]);
        Ok(())
    }

    #[test]
    fn test_write_self_modifies() -> TestResult {
        let set = chip()?;
        // R0 = 2, then overwrite cell 4 (a HALT) with 2 so it prints instead
        let (summary, out) = run(&set, &[1, 1, 5, 4, 0])?;
        assert_eq!(out, vec!["2"]);
        assert_eq!(summary.outcome, Outcome::FellOffEnd);
        assert_eq!(summary.context.memory().as_slice(), &[1, 1, 5, 4, 2]);
        Ok(())
    }

    #[test]
    fn test_swap_visible_on_next_fetch() -> TestResult {
        let set = chip()?;
        // R0 = 2; swap it into cell 4, which is the next opcode to fetch.
        // cell 4 held a HALT; it now prints, and R0 holds the old 0.
        let (summary, out) = run(&set, &[1, 1, 6, 4, 0])?;
        assert_eq!(summary.context.memory().as_slice(), &[1, 1, 6, 4, 2]);
        assert_eq!(out, vec!["0"]);
        assert_eq!(summary.outcome, Outcome::FellOffEnd);
        Ok(())
    }

    #[test]
    fn test_swap_own_opcode_cell() -> TestResult {
        let set = chip()?;
        // R0 = 1; SWAP at address 1 swaps R0 with its own opcode cell
        let (summary, out) = run(&set, &[1, 6, 1, 2, 0])?;
        assert_eq!(summary.context.memory().as_slice(), &[1, 1, 1, 2, 0]);
        // R0 took the old opcode 6
        assert_eq!(out, vec!["6"]);
        Ok(())
    }

    #[test]
    fn test_print_is_idempotent() -> TestResult {
        let set = chip()?;
        let (summary, out) = run(&set, &[1, 1, 1, 2, 2, 0])?;
        assert_eq!(out, vec!["3", "3"]);
        assert_eq!(summary.context.registers().as_slice(), &[3, 0]);
        assert_eq!(summary.context.memory().as_slice(), &[1, 1, 1, 2, 2, 0]);
        Ok(())
    }

    #[test]
    fn test_print_char() -> TestResult {
        let set = chip()?;
        let (_, out) = run(&set, &[4, 72, 9, 4, 105, 9, 0])?;
        assert_eq!(out, vec!["H", "i"]);
        Ok(())
    }

    #[test]
    fn test_add_register_reads_current_value() -> TestResult {
        let set = chip()?;
        // R1 += R0 twice with R0 changing in between
        let (summary, out) = run(&set, &[1, 11, 1, 1, 11, 12, 0])?;
        assert_eq!(out, vec!["4"]);
        assert_eq!(summary.context.registers().as_slice(), &[3, 4]);
        Ok(())
    }

    #[test]
    fn test_bell_rings() -> TestResult {
        let set = chip()?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        Interpreter::new(&set, &mut console, &mut sound).execute(vec![7, 7, 0])?;
        assert_eq!(sound.rung(), 2);
        assert!(console.lines().is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_action_reports_and_continues() -> TestResult {
        let set = chip()?;
        let (summary, out) = run(&set, &[13, 1, 2, 0])?;
        assert_eq!(out, vec![UNDEFINED_ACTION, "1"]);
        assert_eq!(summary.outcome, Outcome::Halted);
        Ok(())
    }

    #[test]
    fn test_undefined_opcode_faults() -> TestResult {
        let set = chip()?;
        match run(&set, &[1, 42, 2]) {
            Err(ExecError::UndefinedOpcode { opcode, address }) => {
                assert_eq!(opcode, 42);
                assert_eq!(address, 1);
            }
            other => panic!("expected an undefined opcode fault, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_missing_operand_faults() -> TestResult {
        let set = chip()?;
        assert!(matches!(
            run(&set, &[1, 4]),
            Err(ExecError::AddressOutOfBounds { address: 2, len: 2 })
        ));
        assert!(matches!(
            run(&set, &[5, 99]),
            Err(ExecError::AddressOutOfBounds { address: 99, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_pointer_wraps_within_modulus() -> TestResult {
        // 2-bit chip: the pointer can only address 0..4, so a 6 word
        // program wraps back to 0 instead of reaching cells 4 and 5
        let set = compile("BITS_PER_BYTE = 2\nINSTRUCTIONS:\n0 : HALT\n1 : ADD 1 TO R0\n2 : PRINT R0 AS UINT\n")?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let result = Interpreter::new(&set, &mut console, &mut sound)
            .with_step_limit(8)
            .execute(vec![1, 2, 1, 2, 0, 0]);
        assert!(matches!(result, Err(ExecError::StepLimitExceeded { .. })));
        // values seen are always in [0, 4)
        assert_eq!(console.lines(), &["1", "2", "3", "0"]);
        Ok(())
    }

    #[test]
    fn test_instruction_set_reused() -> TestResult {
        let set = chip()?;
        let (first, _) = run(&set, &[1, 1, 0])?;
        let (second, out) = run(&set, &[1, 2, 0])?;
        assert_eq!(first.context.registers().as_slice(), &[2, 0]);
        assert_eq!(second.context.registers().as_slice(), &[1, 0]);
        assert_eq!(out, vec!["1"]);
        Ok(())
    }

    #[test]
    fn test_stepping_quit_aborts() -> TestResult {
        let set = chip()?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let mut input = ScriptedInput::new(&[StepCommand::Step, StepCommand::Step]);
        let summary = Interpreter::new(&set, &mut console, &mut sound)
            .execute_stepping(vec![1, 1, 2, 0], &mut input)?;
        assert_eq!(summary.outcome, Outcome::Aborted);
        assert_eq!(summary.context.steps(), 2);
        assert_eq!(summary.context.pointer(), 2);
        assert!(console.lines().is_empty());
        assert_eq!(input.prompts().len(), 3);
        assert!(input.prompts()[0].starts_with("[   0]    1 : ADD 1 TO R0"));
        Ok(())
    }

    #[test]
    fn test_stepping_continue_runs_out() -> TestResult {
        let set = chip()?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let mut input = ScriptedInput::new(&[StepCommand::Continue]);
        let summary = Interpreter::new(&set, &mut console, &mut sound)
            .execute_stepping(vec![1, 1, 2, 0], &mut input)?;
        assert_eq!(summary.outcome, Outcome::Halted);
        assert_eq!(console.lines(), &["2"]);
        assert_eq!(input.prompts().len(), 1);
        Ok(())
    }

    #[test]
    fn test_describe_shows_operand() -> TestResult {
        let set = chip()?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let interp = Interpreter::new(&set, &mut console, &mut sound);
        let ctx = ExecutionContext::new(interp.instructions(), vec![4, 9, 0]);
        assert_eq!(
            interp.describe(&ctx),
            "[   0]    4 : LOAD <DATA> TO R0 (9) | R0=0 R1=0"
        );
        Ok(())
    }

    #[test]
    fn test_with_clock_ignores_nonsense() -> TestResult {
        let set = chip()?;
        let mut console = BufferConsole::new();
        let mut sound = Mute::new();
        let interp = Interpreter::new(&set, &mut console, &mut sound).with_clock(0.0);
        assert!(interp.clock_period.is_none());
        let interp = interp.with_clock(1000.0);
        assert_eq!(interp.clock_period, Some(Duration::from_millis(1)));
        Ok(())
    }
}
