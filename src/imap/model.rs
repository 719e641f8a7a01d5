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

//! Structured IMAP protocol units.

use std::fmt;

use crate::support::byte_string::ByteString;
use crate::wire::token::ExtensionToken;
use crate::wire::token_set::TokenList;

/// One IMAP data item, as found in command arguments, data responses and
/// response code arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImapData {
    /// A bare token, including numbers, flags and section specifiers
    /// (`BODY[HEADER.FIELDS (FROM)]`).
    Atom(ByteString),
    /// A quoted string, with escapes already removed.
    Quoted(ByteString),
    /// A literal. `binary` indicates the RFC 3516 `~{n}` form.
    Literal { data: ByteString, binary: bool },
    Nil,
    List(Vec<ImapData>),
}

impl ImapData {
    pub fn atom(s: impl Into<ByteString>) -> Self {
        ImapData::Atom(s.into())
    }

    pub fn quoted(s: impl Into<ByteString>) -> Self {
        ImapData::Quoted(s.into())
    }

    pub fn literal(s: impl Into<ByteString>) -> Self {
        ImapData::Literal {
            data: s.into(),
            binary: false,
        }
    }

    /// Build a string item, choosing the atom, quoted or literal form
    /// according to its content.
    pub fn astring(s: impl Into<ByteString>) -> Self {
        let s = s.into();
        if super::lex::is_conservative_atom(&s) {
            ImapData::Atom(s)
        } else {
            ImapData::string(s)
        }
    }

    /// Build a string item which may not be an atom.
    pub fn string(s: impl Into<ByteString>) -> Self {
        let s = s.into();
        if super::lex::is_quotable(&s) {
            ImapData::Quoted(s)
        } else {
            ImapData::Literal {
                data: s,
                binary: false,
            }
        }
    }

    /// The string content of an atom, quoted string or literal.
    pub fn as_bytes(&self) -> Option<&ByteString> {
        match *self {
            ImapData::Atom(ref s)
            | ImapData::Quoted(ref s)
            | ImapData::Literal { data: ref s, .. } => Some(s),
            ImapData::Nil | ImapData::List(..) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ImapData]> {
        match *self {
            ImapData::List(ref items) => Some(items),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(*self, ImapData::Nil)
    }

    /// Interpret this item as a number.
    pub fn to_u64(&self) -> Option<u64> {
        match *self {
            ImapData::Atom(ref s) => s.to_u64(),
            _ => None,
        }
    }

    /// Whether this item contains a literal which the sender must wait to
    /// be invited to send.
    pub(super) fn contains_literal(&self) -> bool {
        match *self {
            ImapData::Literal { .. } => true,
            ImapData::List(ref items) => items.iter().any(Self::contains_literal),
            _ => false,
        }
    }
}

/// A command sent from client to server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub tag: ByteString,
    /// Whether the verb was prefixed with `UID` (`tag UID FETCH ...`).
    pub uid: bool,
    pub verb: ByteString,
    pub args: Vec<ImapData>,
    /// Whether transmitting this command involves the peer waiting for one
    /// or more continuation requests, i.e., it has synchronising literals.
    pub continuation: bool,
}

impl Command {
    pub fn new(tag: impl Into<ByteString>, verb: impl Into<ByteString>) -> Self {
        Command {
            tag: tag.into(),
            uid: false,
            verb: verb.into(),
            args: Vec::new(),
            continuation: false,
        }
    }

    pub fn uid(mut self) -> Self {
        self.uid = true;
        self
    }

    pub fn arg(mut self, arg: ImapData) -> Self {
        self.continuation |= arg.contains_literal();
        self.args.push(arg);
        self
    }

    pub fn is_verb(&self, verb: &str) -> bool {
        self.verb.eq_ignore_case(verb)
    }
}

/// The condition of a status response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    Ok,
    No,
    Bad,
    Bye,
    Preauth,
}

impl Condition {
    pub fn from_wire(word: &[u8]) -> Option<Self> {
        [
            Condition::Ok,
            Condition::No,
            Condition::Bad,
            Condition::Bye,
            Condition::Preauth,
        ]
        .iter()
        .copied()
        .find(|c| c.name().as_bytes().eq_ignore_ascii_case(word))
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::Ok => "OK",
            Condition::No => "NO",
            Condition::Bad => "BAD",
            Condition::Bye => "BYE",
            Condition::Preauth => "PREAUTH",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `[code args] text` portion of a status response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseText {
    pub code: Option<ExtensionToken>,
    pub code_args: Vec<ImapData>,
    pub text: ByteString,
}

impl ResponseText {
    pub fn new(text: impl Into<ByteString>) -> Self {
        ResponseText {
            code: None,
            code_args: Vec::new(),
            text: text.into(),
        }
    }

    pub fn with_code(mut self, code: ExtensionToken, args: Vec<ImapData>) -> Self {
        self.code = Some(code);
        self.code_args = args;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub condition: Condition,
    pub text: ResponseText,
}

/// A response sent from server to client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// `tag OK/NO/BAD ...`
    Tagged { tag: ByteString, status: Status },
    /// `* OK/NO/BAD/BYE/PREAUTH ...`
    Untagged(Status),
    /// Any other untagged response, e.g. `* 23 EXISTS`.
    Data(Vec<ImapData>),
    /// `+ text`
    ContinuationRequest(ByteString),
}

impl Response {
    pub fn tagged(
        tag: impl Into<ByteString>,
        condition: Condition,
        text: ResponseText,
    ) -> Self {
        Response::Tagged {
            tag: tag.into(),
            status: Status { condition, text },
        }
    }

    pub fn untagged(condition: Condition, text: ResponseText) -> Self {
        Response::Untagged(Status { condition, text })
    }

    pub fn status(&self) -> Option<&Status> {
        match *self {
            Response::Tagged { ref status, .. } | Response::Untagged(ref status) => {
                Some(status)
            }
            _ => None,
        }
    }

    pub fn is_tagged_with(&self, expected: &[u8]) -> bool {
        match *self {
            Response::Tagged { ref tag, .. } => tag == expected,
            _ => false,
        }
    }

    /// Extract the capability list from a `* CAPABILITY` data response or a
    /// `[CAPABILITY ...]` response code.
    pub fn capabilities(&self) -> Option<TokenList> {
        match *self {
            Response::Data(ref items) => match items.split_first() {
                Some((&ImapData::Atom(ref name), rest))
                    if name.eq_ignore_case("CAPABILITY") =>
                {
                    Some(super::capability::from_data(rest))
                }
                _ => None,
            },
            _ => {
                let text = &self.status()?.text;
                if text.code.as_ref()? == &super::response_code::CAPABILITY {
                    Some(super::capability::from_data(&text.code_args))
                } else {
                    None
                }
            }
        }
    }
}

/// Generates command tags for a client session.
///
/// Tags are consecutive hexadecimal counters, which keeps them short,
/// unique within the session, and free of characters that need quoting.
#[derive(Clone, Debug, Default)]
pub struct TagGenerator {
    next: u32,
}

impl TagGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_tag(&mut self) -> ByteString {
        let tag = format!("{:04x}", self.next);
        self.next = self.next.wrapping_add(1);
        ByteString::from(tag)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn command_builder_tracks_continuation() {
        let plain = Command::new("a1", "LOGIN")
            .arg(ImapData::astring("smdn"))
            .arg(ImapData::astring("pass word"));
        assert!(!plain.continuation);
        assert_eq!(ImapData::quoted("pass word"), plain.args[1]);

        let with_literal = Command::new("a2", "LOGIN")
            .arg(ImapData::astring("smdn"))
            .arg(ImapData::List(vec![ImapData::astring("with\r\nnewline")]));
        assert!(with_literal.continuation);
        assert!(with_literal.is_verb("login"));
    }

    #[test]
    fn conditions() {
        assert_eq!(Some(Condition::Preauth), Condition::from_wire(b"preauth"));
        assert_eq!(Some(Condition::Ok), Condition::from_wire(b"OK"));
        assert_eq!(None, Condition::from_wire(b"OKAY"));
        assert_eq!("BYE", Condition::Bye.to_string());
    }

    #[test]
    fn tag_generation() {
        let mut tags = TagGenerator::new();
        assert_eq!("0000", tags.next_tag());
        assert_eq!("0001", tags.next_tag());
        for _ in 0..8 {
            tags.next_tag();
        }
        assert_eq!("000a", tags.next_tag());
    }

    #[test]
    fn data_accessors() {
        assert_eq!(Some(42), ImapData::atom("42").to_u64());
        assert_eq!(None, ImapData::quoted("42").to_u64());
        assert!(ImapData::Nil.is_nil());
        assert_eq!(
            Some(&ByteString::from("x")),
            ImapData::literal("x").as_bytes()
        );
        assert_eq!(None, ImapData::Nil.as_bytes());
        assert_eq!(
            Some(&[ImapData::Nil][..]),
            ImapData::List(vec![ImapData::Nil]).as_list()
        );
    }
}
