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

//! IMAP grammars for the generic receive loop.
//!
//! `CommandGrammar` is the server side, parsing `tag SP verb [SP args] CRLF`.
//! `ResponseGrammar` is the client side, parsing tagged and untagged status
//! responses, data responses and continuation requests.

use std::borrow::Cow;
use std::str;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::data::{parse_items, Limits, Scan};
use super::model::*;
use super::response_code;
use crate::support::byte_string::ByteString;
use crate::support::error::Malformed;
use crate::support::system_config::WireConfig;
use crate::wire::receiver::{Grammar, Parsed};

lazy_static! {
    static ref LITERAL_AT_EOL: Regex =
        Regex::new(r#"~?\{([0-9]+)(\+?)\}$"#).unwrap();
}

/// If `line` ends with a literal marker, return its length and whether it is
/// non-synchronising.
fn check_literal(line: &[u8]) -> Option<(usize, bool)> {
    let captures = LITERAL_AT_EOL.captures(line)?;
    let len = str::from_utf8(captures.get(1)?.as_bytes())
        .ok()?
        .parse::<usize>()
        .ok()?;
    let literal_plus = captures.get(2).map_or(false, |m| !m.as_bytes().is_empty());
    Some((len, literal_plus))
}

pub struct CommandGrammar {
    limits: Limits,
    max_line_length: usize,
    continuation_prompt: String,
}

impl CommandGrammar {
    pub fn new(config: &WireConfig) -> Self {
        CommandGrammar {
            limits: Limits {
                max_literal_length: config.limits.max_literal_length,
            },
            max_line_length: config.limits.max_line_length,
            continuation_prompt: config.imap.continuation_prompt.clone(),
        }
    }
}

impl Grammar for CommandGrammar {
    type Unit = Command;

    fn parse(&mut self, fragment: &ByteString) -> Result<Parsed<Command>, Malformed> {
        let bytes = fragment.as_bytes();

        let tag_end = scan_word(bytes, 0);
        if 0 == tag_end {
            return Err(Malformed::new("Missing tag"));
        }
        if !bytes[..tag_end].iter().copied().all(is_tag_char) {
            return Err(Malformed::new("Invalid tag"));
        }
        let tag = fragment.slice(..tag_end);
        let malformed = |reason: Cow<'static, str>| {
            Malformed::new(reason).with_tag(Some(tag.clone()))
        };

        if Some(&b' ') != bytes.get(tag_end) {
            return Err(malformed("Missing command".into()));
        }

        let mut verb_start = tag_end + 1;
        let mut verb_end = scan_word(bytes, verb_start);
        let mut uid = false;
        if bytes[verb_start..verb_end].eq_ignore_ascii_case(b"UID") {
            uid = true;
            if Some(&b' ') != bytes.get(verb_end) {
                return Err(malformed("UID without command".into()));
            }
            verb_start = verb_end + 1;
            verb_end = scan_word(bytes, verb_start);
        }

        if verb_start == verb_end {
            return Err(malformed("Missing command".into()));
        }
        let verb = fragment.slice(verb_start..verb_end);

        let (args, consumed, synchronising_literals) = match bytes.get(verb_end) {
            Some(b'\r') if Some(&b'\n') == bytes.get(verb_end + 1) => {
                (Vec::new(), verb_end + 2, 0)
            }
            Some(b' ') => match parse_items(fragment, verb_end + 1, self.limits)
                .map_err(malformed)?
            {
                Scan::Complete {
                    items,
                    end,
                    synchronising_literals,
                } => (items, end, synchronising_literals),
                Scan::Incomplete(needs) => return Ok(Parsed::Incomplete(needs)),
            },
            _ => return Err(malformed("Invalid command line".into())),
        };

        Ok(Parsed::Complete {
            unit: Command {
                tag,
                uid,
                verb,
                args,
                continuation: synchronising_literals > 0,
            },
            consumed,
        })
    }

    fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn literal_to_discard(&self, line: &[u8]) -> Option<usize> {
        // A synchronising literal is never sent once the client sees our
        // rejection of the command.
        check_literal(line)
            .filter(|&(_, literal_plus)| literal_plus)
            .map(|(len, _)| len)
    }

    fn continuation_request(&self) -> Option<Vec<u8>> {
        Some(format!("+ {}\r\n", self.continuation_prompt).into_bytes())
    }
}

pub struct ResponseGrammar {
    limits: Limits,
    max_line_length: usize,
    /// Whether the unit being parsed is an untagged data response, the only
    /// kind of response which can carry a literal.
    in_data_response: bool,
}

impl ResponseGrammar {
    pub fn new(config: &WireConfig) -> Self {
        ResponseGrammar {
            limits: Limits {
                max_literal_length: config.limits.max_literal_length,
            },
            max_line_length: config.limits.max_line_length,
            in_data_response: false,
        }
    }
}

impl Grammar for ResponseGrammar {
    type Unit = Response;

    fn parse(&mut self, fragment: &ByteString) -> Result<Parsed<Response>, Malformed> {
        let bytes = fragment.as_bytes();
        self.in_data_response = false;

        if bytes.starts_with(b"+") {
            let (cr, consumed) = line_end(bytes)?;
            let text_start = if Some(&b' ') == bytes.get(1) { 2 } else { 1 };
            return Ok(Parsed::Complete {
                unit: Response::ContinuationRequest(
                    fragment.slice(text_start.min(cr)..cr),
                ),
                consumed,
            });
        }

        let tag_end = scan_word(bytes, 0);
        if 0 == tag_end {
            return Err(Malformed::new("Missing tag"));
        }
        let tag = fragment.slice(..tag_end);
        let untagged = b"*" == &bytes[..tag_end];

        if Some(&b' ') != bytes.get(tag_end) {
            return Err(Malformed::new("Missing response").with_tag(Some(tag)));
        }

        let word_start = tag_end + 1;
        let word_end = scan_word(bytes, word_start);
        let condition = Condition::from_wire(&bytes[word_start..word_end]);

        match (untagged, condition) {
            (true, None) => {
                self.in_data_response = true;
                match parse_items(fragment, word_start, self.limits)
                    .map_err(Malformed::new)?
                {
                    Scan::Complete { items, end, .. } => {
                        self.in_data_response = false;
                        Ok(Parsed::Complete {
                            unit: Response::Data(items),
                            consumed: end,
                        })
                    }
                    Scan::Incomplete(needs) => Ok(Parsed::Incomplete(needs)),
                }
            }

            (false, None) => {
                Err(Malformed::new("Invalid response condition").with_tag(Some(tag)))
            }

            (_, Some(condition)) => {
                let (cr, consumed) = line_end(bytes)?;
                let text = parse_response_text(fragment, word_end, cr, self.limits)
                    .map_err(|reason| {
                        Malformed::new(reason).with_tag(Some(tag.clone()))
                    })?;
                let status = Status { condition, text };
                let unit = if untagged {
                    Response::Untagged(status)
                } else {
                    Response::Tagged { tag, status }
                };
                Ok(Parsed::Complete { unit, consumed })
            }
        }
    }

    fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn literal_to_discard(&self, line: &[u8]) -> Option<usize> {
        // Servers never wait before sending literals, but a status line
        // ending in something that looks like a marker has no literal.
        if self.in_data_response {
            check_literal(line).map(|(len, _)| len)
        } else {
            None
        }
    }
}

/// Parse `[SP] ["[" code [SP args] "]" [SP]] text` from `start` up to the CR
/// at `cr`.
pub(crate) fn parse_response_text(
    fragment: &ByteString,
    start: usize,
    cr: usize,
    limits: Limits,
) -> Result<ResponseText, Cow<'static, str>> {
    let bytes = fragment.as_bytes();
    let mut pos = start;
    if pos < cr && b' ' == bytes[pos] {
        pos += 1;
    }

    let mut text = ResponseText::default();
    if pos < cr && b'[' == bytes[pos] {
        let close = bytes[pos..cr]
            .iter()
            .position(|&b| b']' == b)
            .map(|off| pos + off)
            .ok_or("Unclosed response code")?;

        let inner = fragment.slice(pos + 1..close);
        let code_end = inner.index_of(b' ').unwrap_or_else(|| inner.len());
        if 0 == code_end {
            return Err("Empty response code".into());
        }
        text.code = Some(response_code::lookup_or_create(
            &inner.slice(..code_end).to_str_lossy(),
        ));

        if code_end < inner.len() {
            let mut args = inner.slice_from(code_end + 1).to_vec();
            args.extend_from_slice(b"\r\n");
            match parse_items(&ByteString::from(args), 0, limits)? {
                Scan::Complete { items, .. } => text.code_args = items,
                Scan::Incomplete(_) => {
                    return Err("Literal in response code".into())
                }
            }
        }

        pos = close + 1;
        if pos < cr && b' ' == bytes[pos] {
            pos += 1;
        }
    }

    text.text = fragment.slice(pos..cr);
    Ok(text)
}

/// Find the end of the first line of `bytes`, returning the index of the CR
/// and the index after the LF.
fn line_end(bytes: &[u8]) -> Result<(usize, usize), Malformed> {
    match memchr::memchr(b'\n', bytes) {
        Some(lf) if lf > 0 && b'\r' == bytes[lf - 1] => Ok((lf - 1, lf + 1)),
        Some(_) => Err(Malformed::new("Bare LF")),
        None => Err(Malformed::new("Missing line ending")),
    }
}

/// Find the end of the word starting at `start`.
fn scan_word(bytes: &[u8], start: usize) -> usize {
    bytes
        .get(start..)
        .and_then(|rest| rest.iter().position(|&b| b' ' == b || b'\r' == b || b'\n' == b))
        .map_or(bytes.len(), |off| start + off)
}

fn is_tag_char(b: u8) -> bool {
    match b {
        b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\' | b'+' => false,
        0x21..=0x7E => true,
        _ => false,
    }
}
