use beep::beep;
use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;

/// side channel for the BELL instruction
pub trait Sound {
    fn bell(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C
const SIMPLEBEEP_LENGTH: Duration = Duration::from_millis(120);

/// rings the PC speaker; needs access to the console device
pub struct SimpleBeep {
    pitch: u16,
    length: Duration,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep {
            pitch: SIMPLEBEEP_PITCH,
            length: SIMPLEBEEP_LENGTH,
        }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn bell(&mut self) -> Result<(), Box<dyn Error>> {
        beep(self.pitch)?;
        spin_sleep::sleep(self.length);
        beep(0)?;
        Ok(())
    }
}

/// writes an ASCII BEL and lets the terminal decide what to do
pub struct TerminalBell<W: Write> {
    out: W,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        TerminalBell { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalBell<io::Stderr> {
    pub fn stderr() -> Self {
        TerminalBell::new(io::stderr())
    }
}

impl<W: Write> Sound for TerminalBell<W> {
    fn bell(&mut self) -> Result<(), Box<dyn Error>> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Mute {
    rung: usize,
}

impl Mute {
    pub fn new() -> Self {
        Mute { rung: 0 }
    }

    /// how many times BELL was executed
    pub fn rung(&self) -> usize {
        self.rung
    }
}

impl Sound for Mute {
    fn bell(&mut self) -> Result<(), Box<dyn Error>> {
        self.rung += 1;
        Ok(())
    }
}
