use crossterm::event::{read, Event, KeyCode};
use crossterm::terminal;
use std::collections::VecDeque;
use std::io::{self, Write};

/// what the operator asked for while single-stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    /// execute one fetch cycle
    Step,
    /// stop asking and run to the end
    Continue,
    /// abandon the run
    Quit,
}

/// map of keys to step commands
const STEP_KEYMAP: [(char, StepCommand); 4] = [
    (' ', StepCommand::Step),
    ('s', StepCommand::Step),
    ('c', StepCommand::Continue),
    ('q', StepCommand::Quit),
];

fn command_for(key: KeyCode) -> Option<StepCommand> {
    match key {
        KeyCode::Char(c) => {
            let c = c.to_ascii_lowercase();
            STEP_KEYMAP
                .iter()
                .find(|(k, _)| *k == c)
                .map(|(_, cmd)| *cmd)
        }
        KeyCode::Enter => Some(StepCommand::Step),
        KeyCode::Esc => Some(StepCommand::Quit),
        _ => None,
    }
}

/// reads step commands
pub trait Input {
    /// show `prompt` (the state about to execute) and block until the next
    /// command is available
    fn next_command(&mut self, prompt: &str) -> Result<StepCommand, io::Error>;
}

/// reads single keypresses from the terminal, in raw mode only while waiting
pub struct KeyboardInput;

impl KeyboardInput {
    pub fn new() -> Self {
        KeyboardInput
    }

    fn read_key(&mut self) -> Result<StepCommand, io::Error> {
        loop {
            match read()? {
                Event::Key(evt) => match command_for(evt.code) {
                    Some(cmd) => return Ok(cmd),
                    None => log::debug!("no step command bound to {:?}", evt.code),
                },
                _ => log::debug!("ignoring non-key event"),
            }
        }
    }
}

impl Default for KeyboardInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for KeyboardInput {
    fn next_command(&mut self, prompt: &str) -> Result<StepCommand, io::Error> {
        let mut err = io::stderr();
        writeln!(err, "{}  [space] step  [c] continue  [q] quit", prompt)?;
        err.flush()?;
        terminal::enable_raw_mode()?;
        let cmd = self.read_key();
        // always leave raw mode, even if reading failed
        terminal::disable_raw_mode()?;
        cmd
    }
}

/// canned Input implementation for testing; quits once it runs dry
pub struct ScriptedInput {
    commands: VecDeque<StepCommand>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new(commands: &[StepCommand]) -> Self {
        ScriptedInput {
            commands: commands.iter().copied().collect(),
            prompts: Vec::new(),
        }
    }

    /// every prompt shown so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Input for ScriptedInput {
    fn next_command(&mut self, prompt: &str) -> Result<StepCommand, io::Error> {
        self.prompts.push(prompt.to_string());
        Ok(self.commands.pop_front().unwrap_or(StepCommand::Quit))
    }
}
