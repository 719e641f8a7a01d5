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

//! Utilities for *writing* values under IMAP's "lexical rules".
//!
//! This is write-only since IMAP's lexical syntax is not separable from its
//! grammar; reading is done by `data`.
//!
//! # Encoding Decisions
//!
//! We're generally pretty conservative here.
//!
//! Given the choice between encoding a string as an atom-like value or some
//! other form, we only use atom if all characters are in the set
//! `a-zA-Z0-9?=+/_.-` (this set is specifically chosen to also include encoded
//! words) and the string is not "NIL".
//!
//! Given the choice between encoding a string as a quoted string or a literal,
//! we only choose the quoted string if it only contains characters other than
//! controls, backslash, double-quote and 8-bit bytes, and is less than 100
//! bytes long.
//!
//! # Literals
//!
//! What a literal looks like depends on the direction. Server-to-client
//! literals are always sent inline. Client-to-server literals are either
//! synchronising, in which case the rest of the command goes into a new
//! segment which is only sent once the server has sent a continuation
//! request, or non-synchronising (`{n+}`, RFC 7888) if the server supports
//! `LITERAL+`.

use std::io::Write;

use super::model::ImapData;
use crate::wire::sender::Segments;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralMode {
    /// Literals in server responses.
    Inline,
    /// Client literals which wait for a continuation request.
    Synchronising,
    /// Client literals sent without waiting (`LITERAL+`).
    NonSynchronising,
}

pub struct LexWriter<'a> {
    out: &'a mut Segments,
    literal_mode: LiteralMode,
}

impl<'a> LexWriter<'a> {
    pub fn new(out: &'a mut Segments, literal_mode: LiteralMode) -> Self {
        LexWriter { out, literal_mode }
    }

    pub fn verbatim(&mut self, s: &[u8]) {
        self.out.extend(s);
    }

    pub fn nil(&mut self) {
        self.verbatim(b"NIL")
    }

    pub fn quoted(&mut self, s: &[u8]) {
        self.out.extend(b"\"");
        for &b in s {
            if b'"' == b || b'\\' == b {
                self.out.extend(b"\\");
            }
            self.out.extend(&[b]);
        }
        self.out.extend(b"\"");
    }

    pub fn literal(&mut self, binary: bool, data: &[u8]) {
        // Writing to Segments cannot fail
        let _ = write!(
            self.out,
            "{}{{{}{}}}\r\n",
            if binary { "~" } else { "" },
            data.len(),
            if LiteralMode::NonSynchronising == self.literal_mode {
                "+"
            } else {
                ""
            }
        );

        if LiteralMode::Synchronising == self.literal_mode {
            self.out.await_continuation();
        }
        self.out.extend(data);
    }

    pub fn data(&mut self, item: &ImapData) {
        match *item {
            ImapData::Atom(ref s) => self.verbatim(s),
            ImapData::Quoted(ref s) => self.quoted(s),
            ImapData::Literal { ref data, binary } => self.literal(binary, data),
            ImapData::Nil => self.nil(),
            ImapData::List(ref items) => {
                self.verbatim(b"(");
                self.data_sequence(items);
                self.verbatim(b")");
            }
        }
    }

    /// Write `items` separated by spaces.
    pub fn data_sequence(&mut self, items: &[ImapData]) {
        for (ix, item) in items.iter().enumerate() {
            if ix > 0 {
                self.verbatim(b" ");
            }
            self.data(item);
        }
    }

    pub fn astring(&mut self, s: &[u8]) {
        if is_conservative_atom(s) {
            self.verbatim(s);
        } else {
            self.string(s);
        }
    }

    pub fn string(&mut self, s: &[u8]) {
        if is_quotable(s) {
            self.quoted(s);
        } else {
            self.literal(false, s);
        }
    }
}

pub fn is_conservative_atom(s: &[u8]) -> bool {
    !b"nil".eq_ignore_ascii_case(s)
        && !s.is_empty()
        && s.iter().copied().all(|b| {
            matches!(
                b,
                b'a'..=b'z'
                    | b'A'..=b'Z'
                    | b'0'..=b'9'
                    | b'='
                    | b'?'
                    | b'/'
                    | b'+'
                    | b'_'
                    | b'.'
                    | b'-'
            )
        })
}

pub fn is_quotable(s: &[u8]) -> bool {
    s.len() < 100
        && s.iter().copied().all(|b| match b {
            0..=31 | 127..=255 | b'\\' | b'"' => false,
            _ => true,
        })
}
