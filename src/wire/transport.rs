//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mapwire.
//
// Mapwire is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mapwire is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mapwire. If not, see <http://www.gnu.org/licenses/>.

//! Buffered framing over a raw duplex stream.
//!
//! `BufferedTransport` never blocks on its own. Extraction methods
//! (`read_line()`, `read_exact()`) only look at what is already buffered and
//! return `None` if that is not enough; it is up to the caller to decide
//! whether and when to `fill()` the buffer from the stream, which is the only
//! operation that may block (subject to the stream's own timeout).

use std::io::{self, Read, Write};

use bytes::{Buf, Bytes, BytesMut};

use crate::support::byte_string::ByteString;
use crate::support::error::Error;

/// A bidirectional byte stream, such as a TCP socket or a TLS session over
/// one.
pub trait Duplex: Read + Write + Send {}
impl<T: Read + Write + Send> Duplex for T {}

pub struct BufferedTransport {
    stream: Option<Box<dyn Duplex>>,
    buffer: BytesMut,
    chunk_size: usize,
    upgraded: bool,
}

impl BufferedTransport {
    pub fn new(stream: Box<dyn Duplex>, chunk_size: usize) -> Self {
        BufferedTransport {
            stream: Some(stream),
            buffer: BytesMut::with_capacity(chunk_size),
            chunk_size: chunk_size.max(1),
            upgraded: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_upgraded(&self) -> bool {
        self.upgraded
    }

    /// The number of received bytes not yet extracted.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a complete line is currently buffered.
    pub fn has_line(&self) -> bool {
        memchr::memchr(b'\n', &self.buffer).is_some()
    }

    /// Perform one read from the underlying stream into the buffer.
    ///
    /// Returns the number of bytes read. 0 indicates EOF.
    pub fn fill(&mut self) -> io::Result<usize> {
        let stream = self.stream.as_mut().ok_or_else(closed)?;

        let start = self.buffer.len();
        self.buffer.resize(start + self.chunk_size, 0);
        let result = stream.read(&mut self.buffer[start..]);
        let nread = *result.as_ref().unwrap_or(&0);
        self.buffer.truncate(start + nread);
        result
    }

    /// Extract the next line, including its line ending, if a complete one
    /// is buffered.
    ///
    /// Lines are split on LF; whether a bare LF is acceptable is up to the
    /// grammar.
    pub fn read_line(&mut self) -> Option<ByteString> {
        let eol = memchr::memchr(b'\n', &self.buffer)?;
        Some(ByteString::from(self.buffer.split_to(eol + 1).freeze()))
    }

    /// Extract exactly `n` raw bytes if that many are buffered.
    pub fn read_exact(&mut self, n: usize) -> Option<Bytes> {
        if self.buffer.len() >= n {
            Some(self.buffer.split_to(n).freeze())
        } else {
            None
        }
    }

    /// Drop up to `n` buffered bytes, returning how many were dropped.
    pub fn skip(&mut self, n: usize) -> usize {
        let n = n.min(self.buffer.len());
        self.buffer.advance(n);
        n
    }

    /// Drop everything currently buffered, returning how much was dropped.
    pub fn discard_buffered(&mut self) -> usize {
        let n = self.buffer.len();
        self.buffer.clear();
        n
    }

    pub fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.as_mut().ok_or_else(closed)?.write_all(data)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stream.as_mut().ok_or_else(closed)?.flush()
    }

    /// Replace the underlying stream with the result of `upgrade`, typically
    /// to start TLS.
    ///
    /// Bytes which have already been buffered are kept and will be returned
    /// by subsequent reads before anything read from the new stream.
    ///
    /// A transport can only be upgraded once, and not after it is closed. If
    /// `upgrade` itself fails, the old stream has been consumed, so the
    /// transport is left closed.
    pub fn upgrade<F>(&mut self, upgrade: F) -> Result<(), Error>
    where
        F: FnOnce(Box<dyn Duplex>) -> Result<Box<dyn Duplex>, Error>,
    {
        if self.upgraded {
            return Err(Error::AlreadyUpgraded);
        }

        let stream = self.stream.take().ok_or(Error::Closed)?;
        let stream = upgrade(stream)?;
        self.stream = Some(stream);
        self.upgraded = true;
        Ok(())
    }

    /// Close the transport, dropping the stream and any buffered data.
    pub fn close(&mut self) {
        self.stream = None;
        self.buffer.clear();
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport closed")
}

#[cfg(test)]
mod test {
    use super::super::test_stream::ScriptedStream;
    use super::*;

    fn transport(script: &ScriptedStream, chunk_size: usize) -> BufferedTransport {
        BufferedTransport::new(Box::new(script.clone()), chunk_size)
    }

    #[test]
    fn lines_are_only_returned_when_complete() {
        let script = ScriptedStream::new();
        script.push(b"+OK ready\r\n+O");
        script.push(b"K second\r\n");
        let mut t = transport(&script, 4096);

        assert_eq!(None, t.read_line());
        assert_eq!(13, t.fill().unwrap());
        assert_eq!("+OK ready\r\n", t.read_line().unwrap());
        assert_eq!(None, t.read_line());
        assert_eq!(2, t.buffered_len());
        assert!(!t.has_line());

        t.fill().unwrap();
        assert!(t.has_line());
        assert_eq!("+OK second\r\n", t.read_line().unwrap());
        assert_eq!(0, t.fill().unwrap());
    }

    #[test]
    fn read_exact_waits_for_all_bytes() {
        let script = ScriptedStream::new();
        script.push(b"0123");
        script.push(b"456789\r\n");
        let mut t = transport(&script, 3);

        t.fill().unwrap();
        assert_eq!(None, t.read_exact(5));
        t.fill().unwrap();
        assert_eq!(None, t.read_exact(5));
        t.fill().unwrap();
        assert_eq!(&b"01234"[..], &t.read_exact(5).unwrap()[..]);
        assert_eq!(2, t.buffered_len());
        assert_eq!(2, t.skip(4));
        assert_eq!(0, t.buffered_len());
    }

    #[test]
    fn skip_drops_leading_bytes() {
        let script = ScriptedStream::new();
        script.push(b"abcde\r\n");
        let mut t = transport(&script, 4096);

        t.fill().unwrap();
        assert_eq!(3, t.skip(3));
        assert_eq!("de\r\n", t.read_line().unwrap());
    }

    #[test]
    fn upgrade_preserves_buffered_bytes() {
        let plain = ScriptedStream::new();
        plain.push(b"first\r\nsec");
        let mut t = transport(&plain, 4096);
        t.fill().unwrap();
        assert_eq!("first\r\n", t.read_line().unwrap());

        let secure = ScriptedStream::new();
        secure.push(b"ond\r\n");
        let secure2 = secure.clone();
        t.upgrade(move |_old| Ok(Box::new(secure2) as Box<dyn Duplex>))
            .unwrap();
        assert!(t.is_upgraded());

        t.fill().unwrap();
        assert_eq!("second\r\n", t.read_line().unwrap());

        t.write_all(b"hello").unwrap();
        assert_eq!(b"hello".to_vec(), secure.written());
        assert!(plain.written().is_empty());
    }

    #[test]
    fn upgrade_only_once_and_not_after_close() {
        let script = ScriptedStream::new();
        let mut t = transport(&script, 16);
        t.upgrade(Ok).unwrap();
        assert_matches!(Err(Error::AlreadyUpgraded), t.upgrade(Ok));

        let mut t = transport(&script, 16);
        t.close();
        assert!(!t.is_open());
        assert_matches!(Err(Error::Closed), t.upgrade(Ok));
        assert_eq!(
            io::ErrorKind::NotConnected,
            t.fill().unwrap_err().kind()
        );
    }
}
