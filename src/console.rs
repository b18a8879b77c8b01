use std::fmt;
use std::io::{Read, Write};

use tracing::error;

/// The two primitives a host has to provide.
pub trait Console {
    /// Blocks until a character is available.  `None` means the input is
    /// exhausted and will stay that way.
    fn read_char(&mut self) -> Option<u8>;

    fn write_char(&mut self, ch: u8);

    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_char(b);
        }
    }
}

/// `fmt::Write` adapter so numbers can be formatted straight to a console.
pub struct ConsoleWriter<'a, C: Console + ?Sized>(pub &'a mut C);

impl<'a, C: Console + ?Sized> fmt::Write for ConsoleWriter<'a, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

/// Console over any byte reader and writer, e.g. stdin and stdout.
pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

impl<R: Read, W: Write> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> StreamConsole<R, W> {
        StreamConsole{ input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: Read, W: Write> Console for StreamConsole<R, W> {
    fn read_char(&mut self) -> Option<u8> {
        // about to block: make sure everything written so far is visible
        if let Err(err) = self.output.flush() {
            error!(%err, "failed to flush output");
        }

        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return None,
                Ok(_) => return Some(byte[0]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!(%err, "failed to read input");
                    return None;
                }
            }
        }
    }

    fn write_char(&mut self, ch: u8) {
        if let Err(err) = self.output.write_all(&[ch]) {
            error!(%err, "failed to write output");
        }
    }
}

/// In-memory console: reads a script, captures everything written.
#[derive(Debug,Default,Clone)]
pub struct ScriptConsole {
    input: Vec<u8>,
    pos: usize,
    output: Vec<u8>,
}

impl ScriptConsole {
    pub fn new(script: &str) -> ScriptConsole {
        ScriptConsole{
            input:  script.as_bytes().to_vec(),
            pos:    0,
            output: Vec::new(),
        }
    }

    /// Append more input, e.g. after a run stopped at end of input.
    pub fn push_input(&mut self, script: &str) {
        self.input.extend_from_slice(script.as_bytes());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn take_output(&mut self) -> String {
        let s = self.output_str();
        self.output.clear();
        s
    }

    pub fn remaining(&self) -> &[u8] {
        &self.input[self.pos..]
    }
}

impl Console for ScriptConsole {
    fn read_char(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    fn write_char(&mut self, ch: u8) {
        self.output.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn script_console_reads_then_stays_exhausted() {
        let mut console = ScriptConsole::new("ab");
        assert_eq!(console.read_char(), Some(b'a'));
        assert_eq!(console.read_char(), Some(b'b'));
        assert_eq!(console.read_char(), None);
        assert_eq!(console.read_char(), None);

        console.push_input("c");
        assert_eq!(console.read_char(), Some(b'c'));
    }

    #[test]
    fn script_console_captures_output() {
        let mut console = ScriptConsole::new("");
        console.write_str("ok");
        write!(ConsoleWriter(&mut console), " {}", 42).unwrap();

        assert_eq!(console.take_output(), "ok 42");
        assert_eq!(console.output_str(), "");
    }

    #[test]
    fn stream_console() {
        let mut console = StreamConsole::new(&b"x"[..], Vec::<u8>::new());
        assert_eq!(console.read_char(), Some(b'x'));
        assert_eq!(console.read_char(), None);

        console.write_str("hi\n");
        let (_, out) = console.into_inner();
        assert_eq!(out, b"hi\n");
    }
}
