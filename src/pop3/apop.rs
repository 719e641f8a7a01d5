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

//! APOP authentication (RFC 1939 section 7).
//!
//! The server includes a timestamp like `<1896.697170952@dbc.mtview.ca.us>`
//! in its greeting; the client proves knowledge of the shared secret by
//! sending the MD5 digest of the timestamp followed by the secret.

use std::fmt::Write as _;

use openssl::hash::{hash, MessageDigest};

use super::model::PopCommand;
use crate::support::byte_string::ByteString;
use crate::support::error::{Error, Malformed};

/// Compute the APOP digest of `timestamp || secret` as lowercase hex.
pub fn digest(timestamp: &[u8], secret: &[u8]) -> Result<String, Error> {
    let mut input = Vec::with_capacity(timestamp.len() + secret.len());
    input.extend_from_slice(timestamp);
    input.extend_from_slice(secret);

    let md5 = hash(MessageDigest::md5(), &input)?;
    let mut hex = String::with_capacity(2 * md5.len());
    for b in md5.iter() {
        let _ = write!(hex, "{:02x}", b);
    }
    Ok(hex)
}

/// Extract the timestamp, angle brackets included, from the text of a
/// greeting.
///
/// Returns `None` if the server does not support APOP.
pub fn timestamp_from_greeting(
    text: &ByteString,
) -> Result<Option<ByteString>, Malformed> {
    let start = match text.index_of(b'<') {
        Some(start) => start,
        None => return Ok(None),
    };

    let end = text.index_of_from(b'>', start).ok_or_else(|| {
        Malformed::new("Unterminated APOP timestamp").with_raw(text.clone())
    })?;
    Ok(Some(text.slice(start..end + 1)))
}

/// Build the `APOP user digest` command.
pub fn command(
    user: impl Into<ByteString>,
    timestamp: &[u8],
    secret: &[u8],
) -> Result<PopCommand, Error> {
    Ok(PopCommand::new("APOP")
        .arg(user)
        .arg(digest(timestamp, secret)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc1939_vector() {
        assert_eq!(
            "c4c9334bac560ecc979e58001b3e22fb",
            digest(b"<1896.697170952@dbc.mtview.ca.us>", b"tanstaaf").unwrap()
        );
    }

    #[test]
    fn greeting_timestamps() {
        assert_eq!(
            Some(ByteString::from("<1896.697170952@dbc.mtview.ca.us>")),
            timestamp_from_greeting(&ByteString::from(
                "POP3 server ready <1896.697170952@dbc.mtview.ca.us>"
            ))
            .unwrap()
        );
        assert_eq!(
            None,
            timestamp_from_greeting(&ByteString::from("POP3 server ready"))
                .unwrap()
        );
        assert_eq!(
            "Unterminated APOP timestamp",
            timestamp_from_greeting(&ByteString::from("ready <1896@x"))
                .unwrap_err()
                .reason
        );
    }

    #[test]
    fn apop_command() {
        let apop =
            command("mrose", b"<1896.697170952@dbc.mtview.ca.us>", b"tanstaaf")
                .unwrap();
        assert_eq!(
            PopCommand::new("APOP")
                .arg("mrose")
                .arg("c4c9334bac560ecc979e58001b3e22fb"),
            apop
        );
    }
}
