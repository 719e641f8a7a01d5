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

//! Structured POP3 protocol units.

use std::fmt;

use crate::support::byte_string::ByteString;
use crate::wire::token::ExtensionToken;

/// The status indicator at the start of a response line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// `+OK`
    Positive,
    /// `-ERR`
    Negative,
}

impl Indicator {
    pub fn from_wire(word: &[u8]) -> Option<Self> {
        if word.eq_ignore_ascii_case(b"+OK") {
            Some(Indicator::Positive)
        } else if word.eq_ignore_ascii_case(b"-ERR") {
            Some(Indicator::Negative)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Indicator::Positive => "+OK",
            Indicator::Negative => "-ERR",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `[code] text` portion of a status response (RFC 2449 section 8).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseText {
    pub code: Option<ExtensionToken>,
    pub text: ByteString,
}

impl ResponseText {
    pub fn new(text: impl Into<ByteString>) -> Self {
        ResponseText {
            code: None,
            text: text.into(),
        }
    }

    pub fn with_code(mut self, code: ExtensionToken) -> Self {
        self.code = Some(code);
        self
    }
}

/// A unit received by a POP3 client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopResponse {
    /// `+OK ...` or `-ERR ...`
    Status {
        indicator: Indicator,
        text: ResponseText,
    },
    /// `+ ...`, a server challenge during `AUTH`.
    Continuation(ByteString),
    /// One line of a multi-line body, with the line ending removed and
    /// dot-stuffing undone.
    Line(ByteString),
    /// The `.` line ending a multi-line body.
    Termination,
}

impl PopResponse {
    pub fn ok(text: impl Into<ByteString>) -> Self {
        PopResponse::Status {
            indicator: Indicator::Positive,
            text: ResponseText::new(text),
        }
    }

    pub fn err(text: ResponseText) -> Self {
        PopResponse::Status {
            indicator: Indicator::Negative,
            text,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(
            *self,
            PopResponse::Status {
                indicator: Indicator::Positive,
                ..
            }
        )
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            *self,
            PopResponse::Status {
                indicator: Indicator::Negative,
                ..
            }
        )
    }

    pub fn text(&self) -> Option<&ResponseText> {
        match *self {
            PopResponse::Status { ref text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A command sent from client to server.
///
/// POP3 commands have no tag; responses are correlated by order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopCommand {
    pub verb: ByteString,
    pub args: Vec<ByteString>,
}

impl PopCommand {
    pub fn new(verb: impl Into<ByteString>) -> Self {
        PopCommand {
            verb: verb.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<ByteString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn is_verb(&self, verb: &str) -> bool {
        self.verb.eq_ignore_case(verb)
    }

    /// Whether a positive response to this command is followed by a
    /// multi-line body.
    ///
    /// `LIST` and `UIDL` are only multi-line without an argument.
    pub fn expects_multiline(&self) -> bool {
        if self.is_verb("LIST") || self.is_verb("UIDL") {
            self.args.is_empty()
        } else {
            self.is_verb("RETR") || self.is_verb("TOP") || self.is_verb("CAPA")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indicators() {
        assert_eq!(Some(Indicator::Positive), Indicator::from_wire(b"+ok"));
        assert_eq!(Some(Indicator::Negative), Indicator::from_wire(b"-ERR"));
        assert_eq!(None, Indicator::from_wire(b"+"));
        assert_eq!("-ERR", Indicator::Negative.to_string());
    }

    #[test]
    fn multiline_commands() {
        assert!(PopCommand::new("LIST").expects_multiline());
        assert!(!PopCommand::new("list").arg("1").expects_multiline());
        assert!(PopCommand::new("uidl").expects_multiline());
        assert!(PopCommand::new("RETR").arg("1").expects_multiline());
        assert!(PopCommand::new("TOP").arg("1").arg("0").expects_multiline());
        assert!(PopCommand::new("CAPA").expects_multiline());
        assert!(!PopCommand::new("STAT").expects_multiline());
        assert!(!PopCommand::new("QUIT").expects_multiline());
    }

    #[test]
    fn status_accessors() {
        assert!(PopResponse::ok("fine").is_positive());
        assert!(PopResponse::err(ResponseText::new("no")).is_negative());
        assert!(!PopResponse::Termination.is_positive());
        assert_eq!("fine", PopResponse::ok("fine").text().unwrap().text);
    }
}
