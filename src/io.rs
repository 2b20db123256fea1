/// Program input and output
///
/// Input is consumed lazily, only as many bytes as the current `pushnum` or
/// `pushchar` needs, so a program can interleave reading with writing on an
/// interactive terminal.
use crate::number::Number;
use crate::warning::Warnings;
use std::collections::VecDeque;
use std::io::{self, Read, Write};

const REPLACEMENT: char = '\u{FFFD}';

pub struct InputBuffer<R> {
    reader: R,
    buffer: VecDeque<u8>,
}

impl<R: Read> InputBuffer<R> {
    pub fn new(reader: R) -> Self {
        InputBuffer {
            reader,
            buffer: VecDeque::new(),
        }
    }

    /// Make sure `length` bytes are buffered, unless the input ends first
    fn load(&mut self, length: usize) -> io::Result<()> {
        while self.buffer.len() < length {
            let mut byte = [0u8; 1];
            match self.reader.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => self.buffer.push_back(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn look(&mut self) -> io::Result<Option<u8>> {
        self.load(1)?;
        Ok(self.buffer.front().copied())
    }

    fn take(&mut self, length: usize) -> Vec<u8> {
        let length = length.min(self.buffer.len());
        self.buffer.drain(..length).collect()
    }

    /// Read a signed decimal integer. Leading whitespace is skipped and one
    /// trailing space, tab or newline is consumed. Returns `None` when no
    /// digit is found or the value does not fit the numeric back end.
    pub fn read_number<N: Number>(&mut self) -> io::Result<Option<N>> {
        while let Some(byte) = self.look()? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.take(1);
        }

        let mut text = String::new();
        if self.look()? == Some(b'-') {
            self.take(1);
            text.push('-');
        }
        let mut digits = 0;
        while let Some(byte) = self.look()? {
            if byte.is_ascii_digit() {
                self.take(1);
                text.push(byte as char);
                digits += 1;
            } else {
                if matches!(byte, b' ' | b'\t' | b'\n') {
                    self.take(1);
                }
                break;
            }
        }
        if digits == 0 {
            return Ok(None);
        }
        Ok(N::parse_decimal(&text))
    }

    /// Read one UTF-8 encoded character as its code point, or -1 when the
    /// input is exhausted or malformed
    pub fn read_char(&mut self) -> io::Result<i64> {
        let lead = match self.look()? {
            Some(lead) => lead,
            None => return Ok(-1),
        };
        let length = match lead {
            0x00..=0x7F => 1,
            _ if lead & 0xF0 == 0xF0 => 4,
            _ if lead & 0xE0 == 0xE0 => 3,
            _ if lead & 0xC0 == 0xC0 => 2,
            _ => {
                // Continuation byte where a character should start
                self.take(1);
                return Ok(-1);
            }
        };
        self.load(length)?;
        let bytes = self.take(length);
        if bytes.len() < length {
            return Ok(-1);
        }
        Ok(std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.chars().next())
            .map_or(-1, |c| c as i64))
    }
}

/// Everything a running program talks to
pub struct Console<R, W> {
    pub input: InputBuffer<R>,
    pub output: W,
    pub warnings: Warnings,
}

impl<R: Read, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, warnings: Warnings) -> Self {
        Console {
            input: InputBuffer::new(input),
            output,
            warnings,
        }
    }

    pub fn read_number<N: Number>(&mut self) -> io::Result<Option<N>> {
        self.output.flush()?;
        self.input.read_number()
    }

    pub fn read_char<N: Number>(&mut self) -> io::Result<N> {
        self.output.flush()?;
        Ok(N::from_i64(self.input.read_char()?))
    }

    pub fn write_number<N: Number>(&mut self, value: &N) -> io::Result<()> {
        write!(self.output, "{}", value)
    }

    /// Write a code point as UTF-8. Values outside the Unicode scalar range
    /// write U+FFFD and raise a throttled warning.
    pub fn write_char<N: Number>(&mut self, value: &N) -> io::Result<()> {
        let ch = match value.to_codepoint() {
            Some(ch) => ch,
            None => {
                self.output.flush()?;
                self.warnings.warn_utf8_range(&value.to_hex())?;
                REPLACEMENT
            }
        };
        let mut encoded = [0u8; 4];
        self.output.write_all(ch.encode_utf8(&mut encoded).as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
