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

//! Incremental, protocol-agnostic receive loop.
//!
//! A `Receiver` accumulates wire bytes into a *fragment* until its `Grammar`
//! can extract one complete unit (a command or a response) from it. The
//! fragment only ever grows by whole lines, or by exactly the number of raw
//! bytes an announced literal still needs, so a unit split across any number
//! of socket reads is parsed exactly as if it had arrived at once.
//!
//! The mutable state threaded between calls lives in `FragmentState`, which
//! `advance()` takes and returns by value; `Receiver` is a thin owner of that
//! value plus the grammar.
//!
//! Malformed input is reported as `Err(Malformed)`, which is distinct from
//! the "need more bytes" outcome. The fragment is always cleared on error so
//! the same bad bytes are never parsed twice. If the bad line announced a
//! non-synchronising literal, the peer is going to send that literal (and the
//! rest of the command) regardless, so the receiver silently skips them
//! before looking for the next unit.

use std::fmt;
use std::mem;

use bytes::Bytes;
use log::trace;

use super::transport::BufferedTransport;
use crate::support::byte_string::{escape, ByteString};
use crate::support::error::Malformed;

/// What a grammar needs before it can finish the unit at the start of the
/// fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Needs {
    /// The fragment ends at a point where another line must follow.
    Line,
    /// The fragment ends with a literal marker; the literal is complete once
    /// the fragment is `required_at_least` bytes long.
    Literal {
        required_at_least: usize,
        /// Whether the peer waits for a continuation request before sending
        /// the literal.
        synchronising: bool,
    },
}

#[derive(Debug)]
pub enum Parsed<U> {
    Complete { unit: U, consumed: usize },
    Incomplete(Needs),
}

/// A protocol grammar which extracts units from the start of a fragment.
pub trait Grammar {
    type Unit: fmt::Debug;

    /// Attempt to parse one unit from the start of `fragment`.
    ///
    /// `fragment` always ends either at the end of a line or at the end of
    /// the bytes for which a literal was requested.
    fn parse(&mut self, fragment: &ByteString) -> Result<Parsed<Self::Unit>, Malformed>;

    /// The longest line accepted before the input is rejected as malformed.
    fn max_line_length(&self) -> usize;

    /// If `line` (which was part of a malformed unit) announces a literal
    /// which the peer will send without waiting, return its length.
    fn literal_to_discard(&self, _line: &[u8]) -> Option<usize> {
        None
    }

    /// The bytes to send to the peer to permit a synchronising literal, if
    /// this grammar is the receiving side of such requests.
    fn continuation_request(&self) -> Option<Vec<u8>> {
        None
    }

    /// Forget any cross-unit state, such as being in the middle of a
    /// multi-line body.
    ///
    /// This is only called when the receiver as a whole is reset. Malformed
    /// input only clears the fragment; a grammar which tracks state across
    /// units is responsible for its own recovery.
    fn reset(&mut self) {}
}

#[derive(Debug)]
pub enum ReceiveOutcome<U> {
    /// A complete unit.
    Complete(U),
    /// Nothing can be done until at least this many more bytes have been
    /// read from the stream.
    NeedMoreBytes(usize),
    /// The unit being received has announced a literal. `min_additional`
    /// bytes are needed to complete it. If `go_ahead` is set, the peer will
    /// not send them until it receives a continuation request.
    Continuing { min_additional: usize, go_ahead: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Discard {
    /// Skip this many raw bytes, then the rest of the line after them.
    Literal(usize),
    /// Skip through the end of the current line.
    Line,
}

/// The state threaded between successive receive calls.
#[derive(Clone, Debug, Default)]
pub struct FragmentState {
    fragment: Vec<u8>,
    /// Do not attempt to parse until the fragment is at least this long.
    required_at_least: usize,
    /// Whether a literal has been announced for the unit in progress.
    continuing: bool,
    /// Whether the fragment holds bytes left over from the previous unit
    /// which have not been parsed yet.
    leftover: bool,
    discard: Option<Discard>,
}

impl FragmentState {
    pub fn len(&self) -> usize {
        self.fragment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty() && self.discard.is_none()
    }

    pub fn required_at_least(&self) -> usize {
        self.required_at_least
    }

    pub fn is_continuing(&self) -> bool {
        self.continuing
    }
}

/// Consume whatever `transport` has buffered until one outcome is available.
///
/// This never reads from the underlying stream.
pub fn advance<G: Grammar>(
    grammar: &mut G,
    mut state: FragmentState,
    transport: &mut BufferedTransport,
) -> (FragmentState, Result<ReceiveOutcome<G::Unit>, Malformed>) {
    loop {
        if let Some(discard) = state.discard {
            match skip_discarded(grammar, discard, transport) {
                Ok(next) => {
                    state.discard = next;
                    continue;
                }
                Err(need) => return (state, Ok(ReceiveOutcome::NeedMoreBytes(need))),
            }
        }

        let have = state.fragment.len();
        if have < state.required_at_least {
            let need = state.required_at_least - have;
            match transport.read_exact(need) {
                Some(bytes) => state.fragment.extend_from_slice(&bytes),
                None => {
                    let missing = need - transport.buffered_len();
                    return (state, Ok(ReceiveOutcome::NeedMoreBytes(missing)));
                }
            }
        } else if !mem::take(&mut state.leftover) {
            match transport.read_line() {
                Some(line) => {
                    if line.len() > grammar.max_line_length() {
                        let error = Malformed::new("Line too long");
                        return fail(grammar, error, line.into_bytes());
                    }
                    state.fragment.extend_from_slice(&line);
                }
                None if transport.buffered_len() > grammar.max_line_length() => {
                    // Drop what we have and skip the rest of the line when it
                    // eventually arrives.
                    let dropped = transport.discard_buffered();
                    let mut state = FragmentState::default();
                    state.discard = Some(Discard::Line);
                    let error = Malformed::new("Line too long")
                        .with_raw(ByteString::from(format!("<{} bytes>", dropped)));
                    return (state, Err(error));
                }
                None => return (state, Ok(ReceiveOutcome::NeedMoreBytes(1))),
            }
        }

        let fragment = Bytes::from(mem::take(&mut state.fragment));
        let parsed = grammar.parse(&ByteString::from(fragment.clone()));
        match parsed {
            Ok(Parsed::Complete { unit, consumed }) => {
                if consumed < fragment.len() {
                    state.fragment = fragment[consumed..].to_vec();
                    state.leftover = true;
                }
                state.required_at_least = 0;
                state.continuing = false;
                return (state, Ok(ReceiveOutcome::Complete(unit)));
            }

            Ok(Parsed::Incomplete(Needs::Line)) => {
                state.fragment = Vec::from(fragment);
            }

            Ok(Parsed::Incomplete(Needs::Literal {
                required_at_least,
                synchronising,
            })) => {
                state.fragment = Vec::from(fragment);
                if required_at_least > state.required_at_least {
                    state.required_at_least = required_at_least;
                    state.continuing = true;
                    let min_additional = required_at_least - state.fragment.len();
                    return (
                        state,
                        Ok(ReceiveOutcome::Continuing {
                            min_additional,
                            go_ahead: synchronising,
                        }),
                    );
                }
            }

            Err(error) => return fail(grammar, error, fragment),
        }
    }
}

fn fail<G: Grammar, U>(
    grammar: &G,
    error: Malformed,
    raw: Bytes,
) -> (FragmentState, Result<ReceiveOutcome<U>, Malformed>) {
    let state = FragmentState {
        discard: last_line(&raw)
            .and_then(|line| grammar.literal_to_discard(line))
            .map(Discard::Literal),
        ..FragmentState::default()
    };
    (state, Err(error.with_raw(ByteString::from(raw))))
}

/// Return the last line of `raw`, excluding its line ending.
fn last_line(raw: &[u8]) -> Option<&[u8]> {
    let content = raw
        .strip_suffix(b"\r\n")
        .or_else(|| raw.strip_suffix(b"\n"))?;
    let start = memchr::memrchr(b'\n', content).map_or(0, |ix| ix + 1);
    Some(&content[start..])
}

/// Make progress on skipping the remains of a malformed unit.
///
/// On success, returns the discard state after the step. On failure, returns
/// the number of bytes needed to make further progress.
fn skip_discarded<G: Grammar>(
    grammar: &G,
    discard: Discard,
    transport: &mut BufferedTransport,
) -> Result<Option<Discard>, usize> {
    match discard {
        Discard::Literal(remaining) => {
            let skipped = transport.skip(remaining);
            trace!("Discarded {} literal bytes", skipped);
            if skipped == remaining {
                Ok(Some(Discard::Line))
            } else if 0 == skipped {
                Err(remaining)
            } else {
                Ok(Some(Discard::Literal(remaining - skipped)))
            }
        }

        Discard::Line => match transport.read_line() {
            Some(line) => {
                trace!("Discarded line: {}", escape(&line));
                let content = line.trim_line_ending();
                Ok(grammar
                    .literal_to_discard(&content)
                    .map(Discard::Literal))
            }
            None => {
                transport.discard_buffered();
                Err(1)
            }
        },
    }
}

/// Owns a grammar and the fragment state for one direction of one
/// connection.
pub struct Receiver<G: Grammar> {
    grammar: G,
    state: FragmentState,
}

impl<G: Grammar> Receiver<G> {
    pub fn new(grammar: G) -> Self {
        Receiver {
            grammar,
            state: FragmentState::default(),
        }
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    pub fn grammar_mut(&mut self) -> &mut G {
        &mut self.grammar
    }

    pub fn state(&self) -> &FragmentState {
        &self.state
    }

    /// Try to receive one unit from what `transport` has buffered.
    pub fn receive(
        &mut self,
        transport: &mut BufferedTransport,
    ) -> Result<ReceiveOutcome<G::Unit>, Malformed> {
        let state = mem::take(&mut self.state);
        let (state, result) = advance(&mut self.grammar, state, transport);
        self.state = state;
        result
    }

    /// Discard any partially received unit.
    pub fn reset(&mut self) {
        self.state = FragmentState::default();
        self.grammar.reset();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::super::test_stream::ScriptedStream;
    use super::*;

    /// Feed `chunks` through a fresh receiver, reading one chunk at a time,
    /// and collect everything it produces.
    pub fn receive_all<G: Grammar>(
        grammar: G,
        chunks: &[&[u8]],
    ) -> Vec<Result<G::Unit, Malformed>> {
        let script = ScriptedStream::new();
        for chunk in chunks {
            script.push(chunk);
        }

        let mut transport = BufferedTransport::new(Box::new(script), 4096);
        let mut receiver = Receiver::new(grammar);
        let mut units = Vec::new();
        loop {
            match receiver.receive(&mut transport) {
                Ok(ReceiveOutcome::Complete(unit)) => units.push(Ok(unit)),
                Ok(ReceiveOutcome::Continuing { .. }) => (),
                Ok(ReceiveOutcome::NeedMoreBytes(_)) => {
                    match transport.fill() {
                        Ok(0) => break,
                        Ok(_) => (),
                        Err(e) => panic!("Unexpected error: {}", e),
                    }
                }
                Err(e) => units.push(Err(e)),
            }
        }

        units
    }

    /// Assert that feeding `input` split at every possible byte boundary
    /// produces the same result as feeding it all at once.
    pub fn assert_split_invariant<G: Grammar, F: Fn() -> G>(
        grammar: F,
        input: &[u8],
    ) -> Vec<Result<G::Unit, Malformed>>
    where
        G::Unit: PartialEq,
    {
        let whole = receive_all(grammar(), &[input]);
        for split in 1..input.len() {
            let (a, b) = input.split_at(split);
            let pieces = receive_all(grammar(), &[a, b]);
            assert_eq!(
                whole,
                pieces,
                "Split at {} of {} gave a different result",
                split,
                escape(input)
            );
        }

        let singles: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(whole, receive_all(grammar(), &singles));
        whole
    }
}
