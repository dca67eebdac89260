use std::io::{self, BufRead, BufReader, Read, Write};

use crate::timestamp;

/// Line-delimited transport over any byte stream.
///
/// Writers emit exactly one timestamp per call; readers yield one line at a time with
/// the trailing `\n` (and `\r`, if any) stripped.
pub struct LineTransport<T> {
    stream: T,
}

impl<T> LineTransport<T> {
    pub fn new(stream: T) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl<T: Write> LineTransport<T> {
    /// Write the current time as a single line.
    pub fn write_timestamp(&mut self) -> io::Result<()> {
        self.write_line(&timestamp::now())
    }

    /// Write `line` followed by `\n` in a single call so a line is never split
    /// across two writes.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let framed = format!("{line}\n");
        self.stream.write_all(framed.as_bytes())?;
        self.stream.flush()
    }
}

impl<T: Read> LineTransport<T> {
    /// Consume the transport, yielding every received line until end of stream.
    pub fn lines(self) -> Lines<T> {
        Lines {
            reader: BufReader::new(self.stream),
        }
    }
}

/// Iterator over received lines.
///
/// Returns `None` on a clean end of stream and `Some(Err(_))` on a read failure.
pub struct Lines<T> {
    reader: BufReader<T>,
}

impl<T: Read> Iterator for Lines<T> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
