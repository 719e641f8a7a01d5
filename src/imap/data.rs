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

//! Parsing of IMAP data items (atoms, strings, literals, NIL and
//! parenthesised lists) out of a received fragment.
//!
//! The parser always restarts from the given offset, so it does not need to
//! carry any state between attempts; the receive loop guarantees it is only
//! re-run once the fragment has grown by a whole line or by a whole literal.

use std::borrow::Cow;

use super::model::ImapData;
use crate::support::byte_string::ByteString;
use crate::wire::receiver::Needs;

#[derive(Debug)]
pub enum Scan {
    /// The items have been parsed, and the line they were on ends at `end`
    /// (after the CRLF). `synchronising_literals` counts the literals whose
    /// sender waited for a continuation request.
    Complete {
        items: Vec<ImapData>,
        end: usize,
        synchronising_literals: usize,
    },
    Incomplete(Needs),
}

#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub max_literal_length: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LiteralMarker {
    len: usize,
    binary: bool,
    synchronising: bool,
}

/// Parse data items from `start` through the end of the logical line.
///
/// A logical line can span multiple physical lines when literals are
/// involved.
pub fn parse_items(
    fragment: &ByteString,
    start: usize,
    limits: Limits,
) -> Result<Scan, Cow<'static, str>> {
    let bytes = fragment.as_bytes();
    let mut stack: Vec<Vec<ImapData>> = vec![Vec::new()];
    let mut ix = start;
    let mut synchronising_literals = 0;

    loop {
        let b = match bytes.get(ix) {
            Some(&b) => b,
            None => return Ok(Scan::Incomplete(Needs::Line)),
        };

        match b {
            b' ' => ix += 1,

            b'\r' => {
                match bytes.get(ix + 1) {
                    Some(b'\n') => (),
                    Some(_) => return Err("Bare CR".into()),
                    None => return Ok(Scan::Incomplete(Needs::Line)),
                }

                if stack.len() > 1 {
                    return Err("Unclosed parenthesis".into());
                }

                return Ok(Scan::Complete {
                    items: stack.pop().unwrap_or_default(),
                    end: ix + 2,
                    synchronising_literals,
                });
            }

            b'\n' => return Err("Bare LF".into()),

            b'(' => {
                stack.push(Vec::new());
                ix += 1;
            }

            b')' => {
                if stack.len() < 2 {
                    return Err("Unopened parenthesis".into());
                }
                let list = stack.pop().unwrap_or_default();
                push(&mut stack, ImapData::List(list));
                ix += 1;
            }

            b'"' => {
                let (s, end) = parse_quoted(fragment, ix)?;
                push(&mut stack, ImapData::Quoted(s));
                ix = end;
            }

            b'{' | b'~' if is_literal_start(bytes, ix) => {
                let (marker, data_start) = parse_literal_marker(bytes, ix)?;
                if marker.len > limits.max_literal_length {
                    return Err(format!(
                        "Literal of {} bytes exceeds limit",
                        marker.len
                    )
                    .into());
                }

                // A fragment ending right at the marker has not had the
                // literal requested yet, even when it is empty.
                let data_end = data_start + marker.len;
                if data_end > bytes.len() || data_start == bytes.len() {
                    return Ok(Scan::Incomplete(Needs::Literal {
                        required_at_least: data_end,
                        synchronising: marker.synchronising,
                    }));
                }

                if marker.synchronising {
                    synchronising_literals += 1;
                }
                push(
                    &mut stack,
                    ImapData::Literal {
                        data: fragment.slice(data_start..data_end),
                        binary: marker.binary,
                    },
                );
                ix = data_end;
            }

            _ => {
                let end = scan_atom(bytes, ix)?;
                let atom = fragment.slice(ix..end);
                if atom.eq_ignore_case("NIL") {
                    push(&mut stack, ImapData::Nil);
                } else {
                    push(&mut stack, ImapData::Atom(atom));
                }
                ix = end;
            }
        }
    }
}

fn push(stack: &mut Vec<Vec<ImapData>>, item: ImapData) {
    if let Some(top) = stack.last_mut() {
        top.push(item);
    }
}

fn is_literal_start(bytes: &[u8], ix: usize) -> bool {
    match bytes[ix] {
        b'{' => true,
        b'~' => bytes.get(ix + 1) == Some(&b'{'),
        _ => false,
    }
}

/// Parse a literal marker starting at `ix`, which must be immediately
/// followed by CRLF.
///
/// Returns the marker and the offset at which the literal data begins.
fn parse_literal_marker(
    bytes: &[u8],
    mut ix: usize,
) -> Result<(LiteralMarker, usize), Cow<'static, str>> {
    let binary = b'~' == bytes[ix];
    if binary {
        ix += 1;
    }
    ix += 1; // '{'

    let mut len: usize = 0;
    let digits_start = ix;
    while let Some(&b) = bytes.get(ix) {
        if !b.is_ascii_digit() {
            break;
        }
        len = len
            .checked_mul(10)
            .and_then(|l| l.checked_add(usize::from(b - b'0')))
            .ok_or("Literal length overflow")?;
        ix += 1;
    }

    if digits_start == ix {
        return Err("Invalid literal length".into());
    }

    let synchronising = if Some(&b'+') == bytes.get(ix) {
        ix += 1;
        false
    } else {
        true
    };

    if Some(&b'}') != bytes.get(ix) {
        return Err("Invalid literal marker".into());
    }
    ix += 1;

    if bytes.get(ix..ix + 2) != Some(&b"\r\n"[..]) {
        return Err("Extra data after literal marker".into());
    }

    Ok((
        LiteralMarker {
            len,
            binary,
            synchronising,
        },
        ix + 2,
    ))
}

/// Parse the quoted string whose opening quote is at `ix`.
///
/// Returns the unescaped content and the offset just past the closing quote.
/// The content shares the fragment buffer unless it contained escapes.
fn parse_quoted(
    fragment: &ByteString,
    ix: usize,
) -> Result<(ByteString, usize), Cow<'static, str>> {
    let bytes = fragment.as_bytes();
    let start = ix + 1;
    let mut unescaped: Option<Vec<u8>> = None;
    let mut pos = start;

    loop {
        match bytes.get(pos) {
            None | Some(b'\r') | Some(b'\n') => {
                return Err("Unterminated quoted string".into());
            }

            Some(b'"') => {
                let s = match unescaped {
                    Some(v) => ByteString::from(v),
                    None => fragment.slice(start..pos),
                };
                return Ok((s, pos + 1));
            }

            Some(b'\\') => {
                let escaped = match bytes.get(pos + 1) {
                    Some(&e) if b'"' == e || b'\\' == e => e,
                    _ => return Err("Invalid escape in quoted string".into()),
                };
                unescaped
                    .get_or_insert_with(|| bytes[start..pos].to_vec())
                    .push(escaped);
                pos += 2;
            }

            Some(&b) => {
                if let Some(ref mut v) = unescaped {
                    v.push(b);
                }
                pos += 1;
            }
        }
    }
}

/// Find the end of the atom starting at `ix`.
///
/// Bracketed sections are part of the atom even if they contain spaces or
/// parentheses, as in `BODY[HEADER.FIELDS (FROM TO)]`.
fn scan_atom(bytes: &[u8], ix: usize) -> Result<usize, Cow<'static, str>> {
    let mut pos = ix;
    while let Some(&b) = bytes.get(pos) {
        match b {
            b' ' | b'\r' | b'\n' | b'(' | b')' | b'"' | b'{' => break,
            b'[' => {
                let close = bytes[pos..]
                    .iter()
                    .position(|&c| b']' == c || b'\r' == c || b'\n' == c)
                    .map(|off| pos + off);
                match close {
                    Some(close) if b']' == bytes[close] => pos = close + 1,
                    _ => return Err("Unclosed section bracket".into()),
                }
            }
            _ => pos += 1,
        }
    }

    if pos == ix {
        Err("Unexpected character".into())
    } else {
        Ok(pos)
    }
}
