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

//! Immutable, cheaply sliceable byte strings.
//!
//! Everything the wire layer parses is expressed as a `ByteString` pointing
//! into the buffer the bytes were received in. Slicing never copies; the
//! underlying `Bytes` is reference counted. Text decoding only happens when a
//! value leaves the protocol layer (`to_str_lossy()`).
//!
//! There are two comparison modes:
//!
//! - `ByteString` itself compares and hashes by exact byte content. This is
//!   the mode for payloads (literals, quoted strings, body lines).
//!
//! - `NoCase` compares and hashes ignoring ASCII case. This is the mode for
//!   protocol tokens (verbs, conditions, capability names).
//!
//! The two are distinct types so they cannot be conflated by accident.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, RangeBounds};
use std::str;

use bytes::Bytes;

#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteString(Bytes);

impl ByteString {
    pub const fn from_static(s: &'static [u8]) -> Self {
        ByteString(Bytes::from_static(s))
    }

    pub fn copy_from_slice(s: &[u8]) -> Self {
        ByteString(Bytes::copy_from_slice(s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the underlying reference-counted buffer slice.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Return a sub-range of this string. This shares the underlying buffer.
    ///
    /// Panics if the range is out of bounds, as with slice indexing.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        ByteString(self.0.slice(range))
    }

    pub fn slice_from(&self, start: usize) -> Self {
        self.slice(start..)
    }

    pub fn index_of(&self, needle: u8) -> Option<usize> {
        memchr::memchr(needle, &self.0)
    }

    pub fn index_of_from(&self, needle: u8, from: usize) -> Option<usize> {
        memchr::memchr(needle, self.0.get(from..)?).map(|ix| ix + from)
    }

    /// Find the first index at or after `from` whose byte is not `skip`.
    pub fn index_of_not(&self, skip: u8, from: usize) -> Option<usize> {
        self.0
            .get(from..)?
            .iter()
            .position(|&b| b != skip)
            .map(|ix| ix + from)
    }

    pub fn index_of_slice(&self, needle: &[u8]) -> Option<usize> {
        memchr::memmem::find(&self.0, needle)
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn starts_with_ignore_case(&self, prefix: &[u8]) -> bool {
        self.0.len() >= prefix.len()
            && self.0[..prefix.len()].eq_ignore_ascii_case(prefix)
    }

    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.0.ends_with(suffix)
    }

    pub fn eq_ignore_case(&self, other: impl AsRef<[u8]>) -> bool {
        self.0.eq_ignore_ascii_case(other.as_ref())
    }

    /// Strip one trailing CRLF (or bare LF), if present.
    pub fn trim_line_ending(&self) -> Self {
        if self.ends_with(b"\r\n") {
            self.slice(..self.len() - 2)
        } else if self.ends_with(b"\n") {
            self.slice(..self.len() - 1)
        } else {
            self.clone()
        }
    }

    /// Strip leading and trailing spaces (but not other whitespace, which
    /// is significant on the wire).
    pub fn trim_spaces(&self) -> Self {
        let start = match self.index_of_not(b' ', 0) {
            Some(start) => start,
            None => return ByteString::default(),
        };
        let end = self
            .0
            .iter()
            .rposition(|&b| b != b' ')
            .map_or(start, |ix| ix + 1);
        self.slice(start..end)
    }

    /// Split on every occurrence of `delim`, skipping empty pieces.
    pub fn split_nonempty(&self, delim: u8) -> impl Iterator<Item = Self> + '_ {
        let mut start = 0;
        std::iter::from_fn(move || {
            while start < self.len() {
                let end = self.index_of_from(delim, start).unwrap_or(self.len());
                let piece = self.slice(start..end);
                start = end + 1;
                if !piece.is_empty() {
                    return Some(piece);
                }
            }
            None
        })
    }

    /// Parse the whole string as an unsigned decimal number.
    ///
    /// Returns `None` on an empty string, any non-digit, or overflow.
    pub fn to_u64(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }

        self.0.iter().try_fold(0u64, |accum, &b| {
            if b.is_ascii_digit() {
                accum.checked_mul(10)?.checked_add(u64::from(b - b'0'))
            } else {
                None
            }
        })
    }

    pub fn to_str(&self) -> Option<&str> {
        str::from_utf8(&self.0).ok()
    }

    /// Decode to text for handing to application code.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn to_ascii_uppercase(&self) -> String {
        self.to_str_lossy().to_ascii_uppercase()
    }

    pub fn no_case(&self) -> NoCase<&[u8]> {
        NoCase(&self.0)
    }
}

impl Deref for ByteString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for ByteString {
    fn from(b: Bytes) -> Self {
        ByteString(b)
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(v: Vec<u8>) -> Self {
        ByteString(Bytes::from(v))
    }
}

impl From<&'static str> for ByteString {
    fn from(s: &'static str) -> Self {
        ByteString(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        ByteString(Bytes::from(s.into_bytes()))
    }
}

impl PartialEq<[u8]> for ByteString {
    fn eq(&self, other: &[u8]) -> bool {
        &self.0[..] == other
    }
}

impl PartialEq<&[u8]> for ByteString {
    fn eq(&self, other: &&[u8]) -> bool {
        &self.0[..] == *other
    }
}

impl PartialEq<&str> for ByteString {
    fn eq(&self, other: &&str) -> bool {
        &self.0[..] == other.as_bytes()
    }
}

impl PartialEq<ByteString> for &str {
    fn eq(&self, other: &ByteString) -> bool {
        self.as_bytes() == &other.0[..]
    }
}

impl PartialEq<ByteString> for &[u8] {
    fn eq(&self, other: &ByteString) -> bool {
        *self == &other.0[..]
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "b\"{}\"", escape(&self.0))
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

/// Wrapper which compares and hashes its content ignoring ASCII case.
#[derive(Clone, Copy, Debug)]
pub struct NoCase<T>(pub T);

impl<T: AsRef<[u8]>> PartialEq for NoCase<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().eq_ignore_ascii_case(other.0.as_ref())
    }
}

impl<T: AsRef<[u8]>> Eq for NoCase<T> {}

impl<T: AsRef<[u8]>> Hash for NoCase<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for &b in self.0.as_ref() {
            state.write_u8(b.to_ascii_uppercase());
        }
        // Terminator so that concatenations hash differently
        state.write_u8(0xFF);
    }
}

/// Render bytes with control and non-ASCII characters escaped, for use in
/// logs and diagnostics.
pub fn escape(data: &[u8]) -> String {
    let mut vis = String::with_capacity(data.len());
    for &byte in data {
        match byte {
            b' '..=b'~' => vis.push(byte as char),
            b'\n' => vis.push_str("\\n"),
            b'\r' => vis.push_str("\\r"),
            b'\t' => vis.push_str("\\t"),
            b => vis.push_str(&format!("\\x{:02X}", b)),
        }
    }
    vis
}
