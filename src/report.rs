use std::io::{self, Write};

use crate::run::ExecutionResult;

pub const BUILD_DONE: &str = "Finished compiling.";
pub const RUN_START: &str = "Running tests...";

pub trait Reporter {
    fn report(&mut self, result: &ExecutionResult) -> io::Result<()>;
    fn banner(&mut self, line: &str) -> io::Result<()>;
}

/// Writes `<label> : <captured text>` per result. Success and failure look
/// the same; the captured text is all there is.
pub struct LineReporter<W: Write> {
    out: W,
}

impl<W: Write> LineReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Reporter for LineReporter<W> {
    fn report(&mut self, result: &ExecutionResult) -> io::Result<()> {
        writeln!(self.out, "{} : {}", result.target_label, result.captured_text)?;
        self.out.flush()
    }

    fn banner(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }
}
