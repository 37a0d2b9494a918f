//! Feed a raw byte stream to the lexer through a bounded buffer.
//!
//! Mython source is byte-oriented; the lexer never needs more than one byte
//! of lookahead, so a small fixed refill buffer is enough.

use std::io::{self, Read};

const BUF_SIZE: usize = 1024;

/// An iterator over a reader that produces bytes through a bounded buffer.
///
/// After the underlying stream is exhausted the iterator keeps returning
/// `None`; errors from the reader are passed through once.
#[derive(Debug)]
pub struct ByteReader<R: Read> {
    input: R,
    buf: [u8; BUF_SIZE],
    pos: usize,
    len: usize,
    eof: bool,
}

impl<R: Read> ByteReader<R> {
    pub fn new(input: R) -> ByteReader<R> {
        ByteReader {
            input,
            buf: [0; BUF_SIZE],
            pos: 0,
            len: 0,
            eof: false,
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        self.pos = 0;
        self.len = self.input.read(&mut self.buf)?;
        if self.len == 0 {
            self.eof = true;
        }
        Ok(())
    }
}

impl<R: Read> Iterator for ByteReader<R> {
    type Item = io::Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos == self.len {
            if self.eof {
                return None;
            }
            if let Err(e) = self.refill() {
                // Interrupted reads are retried, everything else is fatal.
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                self.eof = true;
                return Some(Err(e));
            }
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Some(Ok(b))
    }
}
