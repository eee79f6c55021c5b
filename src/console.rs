//! Output and input sinks for the print/scan opcodes.
//!
//! The machine only needs two things from its host: somewhere to write bytes,
//! and a way to read one line of input. Both block the driving thread.

use std::io::{self, BufRead, Cursor, Read, StdinLock, Stdout, Write};

pub trait Console {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one line without its line terminator.
    ///
    /// `limit` is the longest line the caller can store. Implementations may
    /// stop reading shortly after `limit` bytes; anything longer than `limit`
    /// is rejected by the caller. End of input yields an empty line.
    fn read_line(&mut self, limit: usize) -> io::Result<Vec<u8>>;
}

/// A console over any buffered reader and writer.
pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

pub type StdConsole = StreamConsole<StdinLock<'static>, Stdout>;

/// In-memory console: scripted input, captured output.
pub type BufferConsole = StreamConsole<Cursor<Vec<u8>>, Vec<u8>>;

impl<R, W> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl StdConsole {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl BufferConsole {
    pub fn buffered(input: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(input.into()), Vec::new())
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.write_all(bytes)?;
        self.output.flush()
    }

    fn read_line(&mut self, limit: usize) -> io::Result<Vec<u8>> {
        // Room for the line, a CR/LF pair, and one byte to detect overrun.
        let cap = limit.saturating_add(3) as u64;
        let mut line = Vec::new();
        self.input
            .by_ref()
            .take(cap)
            .read_until(b'\n', &mut line)?;
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}
