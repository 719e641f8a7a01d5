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

//! POP3 grammars for the generic receive loop.
//!
//! POP3 is strictly line-oriented, so every unit is exactly one line. The
//! only cross-line state is whether the client is inside a multi-line body,
//! which the response grammar tracks itself: the client announces that the
//! next positive status response starts a body via
//! `set_handle_as_multiline()`, and the `.` line ends it.

use super::model::*;
use super::response_code;
use crate::support::byte_string::ByteString;
use crate::support::error::Malformed;
use crate::support::system_config::WireConfig;
use crate::wire::receiver::{Grammar, Parsed};

/// Client side: parses status lines, continuations and multi-line bodies.
#[derive(Clone, Debug)]
pub struct ResponseGrammar {
    max_line_length: usize,
    handle_as_multiline: bool,
    in_body: bool,
}

impl ResponseGrammar {
    pub fn new(config: &WireConfig) -> Self {
        ResponseGrammar {
            max_line_length: config.limits.max_line_length,
            handle_as_multiline: false,
            in_body: false,
        }
    }

    /// Set whether a positive response to the command just sent is followed
    /// by a multi-line body.
    ///
    /// The flag applies to the next status line only and is cleared once it
    /// is received.
    pub fn set_handle_as_multiline(&mut self, multiline: bool) {
        self.handle_as_multiline = multiline;
    }

    pub fn handle_as_multiline(&self) -> bool {
        self.handle_as_multiline
    }

    /// Whether the grammar is between the status line and the terminator of
    /// a multi-line body.
    pub fn in_body(&self) -> bool {
        self.in_body
    }

    fn parse_line(&mut self, line: &ByteString) -> Result<PopResponse, Malformed> {
        if b"." == line.as_bytes() {
            self.in_body = false;
            return Ok(PopResponse::Termination);
        }

        if self.in_body {
            return Ok(PopResponse::Line(unstuff(line)));
        }

        let multiline = std::mem::take(&mut self.handle_as_multiline);

        let (word, rest) = split_word(line);
        if let Some(indicator) = Indicator::from_wire(&word) {
            let text = parse_response_text(&rest)?;
            self.in_body = multiline && Indicator::Positive == indicator;
            return Ok(PopResponse::Status { indicator, text });
        }

        if b"+" == word.as_bytes() {
            return Ok(PopResponse::Continuation(rest));
        }

        Err(Malformed::new("Invalid status indicator"))
    }
}

impl Grammar for ResponseGrammar {
    type Unit = PopResponse;

    fn parse(&mut self, fragment: &ByteString) -> Result<Parsed<PopResponse>, Malformed> {
        let (line, consumed) = content_line(fragment)?;
        Ok(Parsed::Complete {
            unit: self.parse_line(&line)?,
            consumed,
        })
    }

    fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn reset(&mut self) {
        self.handle_as_multiline = false;
        self.in_body = false;
    }
}

/// Server side: parses `VERB [SP arg]* CRLF`.
#[derive(Clone, Debug)]
pub struct CommandGrammar {
    max_line_length: usize,
}

impl CommandGrammar {
    pub fn new(config: &WireConfig) -> Self {
        CommandGrammar {
            max_line_length: config.limits.max_line_length,
        }
    }
}

impl Grammar for CommandGrammar {
    type Unit = PopCommand;

    fn parse(&mut self, fragment: &ByteString) -> Result<Parsed<PopCommand>, Malformed> {
        let (line, consumed) = content_line(fragment)?;
        let (verb, rest) = split_word(&line);
        if verb.is_empty() {
            return Err(Malformed::new("Empty command"));
        }

        let mut command = PopCommand::new(verb);
        if command.is_verb("PASS") {
            // RFC 1939 lets the password contain spaces
            if !rest.is_empty() {
                command.args.push(rest);
            }
        } else {
            command.args.extend(rest.split_nonempty(b' '));
        }

        Ok(Parsed::Complete {
            unit: command,
            consumed,
        })
    }

    fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

/// Return the first line of `fragment` without its CRLF, and the offset
/// just past it.
fn content_line(fragment: &ByteString) -> Result<(ByteString, usize), Malformed> {
    match fragment.index_of(b'\n') {
        Some(lf) if lf > 0 && b'\r' == fragment[lf - 1] => {
            Ok((fragment.slice(..lf - 1), lf + 1))
        }
        Some(_) => Err(Malformed::new("Bare LF")),
        None => Err(Malformed::new("Missing line ending")),
    }
}

/// Split `line` at the first space, dropping the space.
fn split_word(line: &ByteString) -> (ByteString, ByteString) {
    match line.index_of(b' ') {
        Some(sp) => (line.slice(..sp), line.slice_from(sp + 1)),
        None => (line.clone(), ByteString::default()),
    }
}

/// Parse `["[" code "]" [SP]] text`.
fn parse_response_text(rest: &ByteString) -> Result<ResponseText, Malformed> {
    if !rest.starts_with(b"[") {
        return Ok(ResponseText::new(rest.clone()));
    }

    let close = rest
        .index_of(b']')
        .ok_or_else(|| Malformed::new("Unclosed response code"))?;
    let code = rest.slice(1..close);
    if code.is_empty() {
        return Err(Malformed::new("Empty response code"));
    }

    let mut text = rest.slice_from(close + 1);
    if text.starts_with(b" ") {
        text = text.slice_from(1);
    }

    Ok(ResponseText::new(text)
        .with_code(response_code::lookup_or_create(&code.to_str_lossy())))
}

/// Undo dot-stuffing on one body line.
pub fn unstuff(line: &ByteString) -> ByteString {
    if line.starts_with(b".") {
        line.slice_from(1)
    } else {
        line.clone()
    }
}
