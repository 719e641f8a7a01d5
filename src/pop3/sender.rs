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

//! Serialisation of POP3 commands and responses, including dot-stuffing of
//! multi-line bodies.

use super::model::*;
use crate::wire::sender::{Segments, Sender};

/// Client side: writes commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandSender;

impl Sender for CommandSender {
    type Unit = PopCommand;

    fn serialise(&self, command: &PopCommand, out: &mut Segments) {
        out.extend(&command.verb);
        for arg in &command.args {
            out.extend(b" ");
            out.extend(arg);
        }
        out.extend(b"\r\n");
    }
}

/// Server side: writes responses.
///
/// A multi-line body is sent as a status response, one `Line` per body line
/// and a final `Termination`; each `Line` is dot-stuffed on the way out.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseSender;

impl Sender for ResponseSender {
    type Unit = PopResponse;

    fn serialise(&self, response: &PopResponse, out: &mut Segments) {
        match *response {
            PopResponse::Status {
                indicator,
                ref text,
            } => {
                out.extend(indicator.name().as_bytes());
                if let Some(ref code) = text.code {
                    out.extend(b" [");
                    out.extend(code.value().as_bytes());
                    out.extend(b"]");
                }
                if !text.text.is_empty() {
                    out.extend(b" ");
                    out.extend(&text.text);
                }
            }

            PopResponse::Continuation(ref text) => {
                out.extend(b"+ ");
                out.extend(text);
            }

            PopResponse::Line(ref line) => {
                if line.starts_with(b".") {
                    out.extend(b".");
                }
                out.extend(line);
            }

            PopResponse::Termination => out.extend(b"."),
        }
        out.extend(b"\r\n");
    }
}

/// Dot-stuff a whole body and append the terminator line.
///
/// Lines are delimited by LF; a final line without one gets a CRLF added.
pub fn stuff_body(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + body.len() / 64 + 5);
    let mut at_line_start = true;
    for &b in body {
        if at_line_start && b'.' == b {
            out.push(b'.');
        }
        out.push(b);
        at_line_start = b'\n' == b;
    }

    if !at_line_start {
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}
