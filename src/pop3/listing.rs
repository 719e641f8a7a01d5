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

//! Typed views of the listings returned by `STAT`, `LIST` and `UIDL`.
//!
//! Each can come from the text of a status line (`+OK 2 320`) or from one
//! line of a multi-line body (`1 120`). Fields beyond those needed are
//! ignored, as RFC 1939 permits servers to append information.

use super::model::PopResponse;
use crate::support::byte_string::ByteString;
use crate::support::error::Malformed;

/// `STAT`: number of messages and total size of the maildrop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropListing {
    pub message_count: u64,
    pub size: u64,
}

/// `LIST`: size of one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanListing {
    pub message_number: u64,
    pub size: u64,
}

/// `UIDL`: the unique id of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueIdListing {
    pub message_number: u64,
    pub unique_id: ByteString,
}

impl DropListing {
    pub fn parse(text: &ByteString) -> Result<Self, Malformed> {
        let fields = fields(text, 2)?;
        Ok(DropListing {
            message_count: number(&fields[0], text)?,
            size: number(&fields[1], text)?,
        })
    }
}

impl ScanListing {
    pub fn parse(text: &ByteString) -> Result<Self, Malformed> {
        let fields = fields(text, 2)?;
        Ok(ScanListing {
            message_number: number(&fields[0], text)?,
            size: number(&fields[1], text)?,
        })
    }
}

impl UniqueIdListing {
    pub fn parse(text: &ByteString) -> Result<Self, Malformed> {
        let mut fields = fields(text, 2)?;
        Ok(UniqueIdListing {
            message_number: number(&fields[0], text)?,
            unique_id: fields.swap_remove(1),
        })
    }
}

/// Return the text a listing is parsed from: the text of a status
/// response, or a body line.
pub fn listing_text(response: &PopResponse) -> Option<&ByteString> {
    match *response {
        PopResponse::Status { ref text, .. } => Some(&text.text),
        PopResponse::Line(ref line) => Some(line),
        _ => None,
    }
}

fn fields(text: &ByteString, expected: usize) -> Result<Vec<ByteString>, Malformed> {
    let fields = text.split_nonempty(b' ').collect::<Vec<_>>();
    if fields.len() < expected {
        return Err(Malformed::new(format!(
            "Too few fields in listing: expected {}, got {}",
            expected,
            fields.len()
        ))
        .with_raw(text.clone()));
    }

    Ok(fields)
}

fn number(field: &ByteString, text: &ByteString) -> Result<u64, Malformed> {
    field.to_u64().ok_or_else(|| {
        Malformed::new("Invalid number in listing").with_raw(text.clone())
    })
}
