use std::io::{self, Write};

/// Console is where the interpreter sends PRINT output. It should abstract
/// the implementation details, so output can go to a terminal, a file or a
/// test buffer.
pub trait Console {
    /// emit one line of output
    fn write_line(&mut self, line: &str) -> Result<(), io::Error>;
}

/// writes each line to any `io::Write`, flushing as it goes so output
/// interleaves properly with diagnostics
pub struct StreamConsole<W: Write> {
    out: W,
}

impl<W: Write> StreamConsole<W> {
    pub fn new(out: W) -> Self {
        StreamConsole { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl StreamConsole<io::Stdout> {
    pub fn stdout() -> Self {
        StreamConsole::new(io::stdout())
    }
}

impl<W: Write> Console for StreamConsole<W> {
    fn write_line(&mut self, line: &str) -> Result<(), io::Error> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }
}

/// keeps every line in memory; useful for testing
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Vec<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        BufferConsole { lines: Vec::new() }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, line: &str) -> Result<(), io::Error> {
        self.lines.push(line.to_string());
        Ok(())
    }
}
