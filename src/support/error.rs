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

use std::borrow::Cow;
use std::fmt;
use std::io;

use thiserror::Error;

use super::byte_string::{escape, ByteString};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Malformed(#[from] Malformed),
    #[error("Timed out waiting for the peer")]
    Timeout,
    #[error("Connection closed")]
    Closed,
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Stream already upgraded")]
    AlreadyUpgraded,
    #[error("No continuation is pending")]
    NoContinuation,
    #[error("A previous unit is still waiting for a continuation request")]
    ContinuationPending,
    #[error("Unexpected response from server: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    TlsHandshake(#[from] openssl::ssl::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error is an I/O condition that only means "nothing to
    /// read right now".
    pub fn is_would_block(&self) -> bool {
        match *self {
            Error::Io(ref e) => is_would_block(e),
            _ => false,
        }
    }
}

pub fn is_would_block(e: &io::Error) -> bool {
    io::ErrorKind::WouldBlock == e.kind() || io::ErrorKind::TimedOut == e.kind()
}

/// A unit of input which could not be matched against the protocol grammar.
///
/// This is recoverable: the offending bytes have already been discarded from
/// the receive state and the connection remains usable.
#[derive(Clone, PartialEq, Eq)]
pub struct Malformed {
    /// The raw bytes which failed to parse.
    pub raw: ByteString,
    /// The tag of the offending command, if one could be extracted.
    pub tag: Option<ByteString>,
    pub reason: Cow<'static, str>,
}

impl Malformed {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Malformed {
            raw: ByteString::default(),
            tag: None,
            reason: reason.into(),
        }
    }

    pub fn with_tag(mut self, tag: Option<ByteString>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_raw(mut self, raw: ByteString) -> Self {
        self.raw = raw;
        self
    }
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Malformed input: {}", self.reason)?;
        if !self.raw.is_empty() {
            let (head, truncated) = if self.raw.len() > 128 {
                (&self.raw[..128], "...")
            } else {
                (&self.raw[..], "")
            };
            write!(f, " ({}{})", escape(head), truncated)?;
        }
        Ok(())
    }
}

impl std::error::Error for Malformed {}

impl fmt::Debug for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Malformed")
            .field("raw", &self.raw)
            .field("tag", &self.tag)
            .field("reason", &self.reason)
            .finish()
    }
}
