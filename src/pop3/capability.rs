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

//! POP3 capabilities (RFC 2449 and later extensions).
//!
//! A `CAPA` body line is a name optionally followed by parameters. `SASL`
//! lines are expanded into one `SASL/<mechanism>` token per mechanism, so
//! that mechanism negotiation is plain token-set algebra; all other
//! parameters are kept as token arguments.

use lazy_static::lazy_static;

use crate::support::byte_string::ByteString;
use crate::wire::token::{ExtensionToken, Registry};
use crate::wire::token_set::TokenList;

pub static TOP: ExtensionToken = ExtensionToken::known("TOP");
pub static USER: ExtensionToken = ExtensionToken::known("USER");
pub static SASL: ExtensionToken = ExtensionToken::known("SASL");
pub static RESP_CODES: ExtensionToken = ExtensionToken::known("RESP-CODES");
pub static LOGIN_DELAY: ExtensionToken = ExtensionToken::known("LOGIN-DELAY");
pub static PIPELINING: ExtensionToken = ExtensionToken::known("PIPELINING");
pub static EXPIRE: ExtensionToken = ExtensionToken::known("EXPIRE");
pub static UIDL: ExtensionToken = ExtensionToken::known("UIDL");
pub static IMPLEMENTATION: ExtensionToken = ExtensionToken::known("IMPLEMENTATION");
pub static AUTH_RESP_CODE: ExtensionToken = ExtensionToken::known("AUTH-RESP-CODE");
pub static STLS: ExtensionToken = ExtensionToken::known("STLS");
pub static UTF8: ExtensionToken = ExtensionToken::known("UTF8");
pub static LANG: ExtensionToken = ExtensionToken::known("LANG");

pub static SASL_PLAIN: ExtensionToken = ExtensionToken::known("SASL/PLAIN");
pub static SASL_LOGIN: ExtensionToken = ExtensionToken::known("SASL/LOGIN");
pub static SASL_CRAM_MD5: ExtensionToken = ExtensionToken::known("SASL/CRAM-MD5");
pub static SASL_DIGEST_MD5: ExtensionToken = ExtensionToken::known("SASL/DIGEST-MD5");
pub static SASL_ANONYMOUS: ExtensionToken = ExtensionToken::known("SASL/ANONYMOUS");
pub static SASL_EXTERNAL: ExtensionToken = ExtensionToken::known("SASL/EXTERNAL");
pub static SASL_GSSAPI: ExtensionToken = ExtensionToken::known("SASL/GSSAPI");
pub static SASL_NTLM: ExtensionToken = ExtensionToken::known("SASL/NTLM");
pub static SASL_XOAUTH2: ExtensionToken = ExtensionToken::known("SASL/XOAUTH2");

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new(
        "POP3 capability",
        &[
            &TOP,
            &USER,
            &SASL,
            &RESP_CODES,
            &LOGIN_DELAY,
            &PIPELINING,
            &EXPIRE,
            &UIDL,
            &IMPLEMENTATION,
            &AUTH_RESP_CODE,
            &STLS,
            &UTF8,
            &LANG,
            &SASL_PLAIN,
            &SASL_LOGIN,
            &SASL_CRAM_MD5,
            &SASL_DIGEST_MD5,
            &SASL_ANONYMOUS,
            &SASL_EXTERNAL,
            &SASL_GSSAPI,
            &SASL_NTLM,
            &SASL_XOAUTH2,
        ],
    );
}

pub fn lookup_or_create(name: &str) -> ExtensionToken {
    REGISTRY.lookup_or_create(name)
}

/// Build a `SASL/<mechanism>` capability.
pub fn sasl(mechanism: &str) -> ExtensionToken {
    lookup_or_create(&format!("SASL/{}", mechanism))
}

/// Parse one line of a `CAPA` response body.
///
/// Returns no tokens for a blank line.
pub fn parse_capa_line(line: &ByteString) -> Vec<ExtensionToken> {
    let line = line.trim_line_ending();
    let mut words = line.split_nonempty(b' ');
    let name = match words.next() {
        Some(name) => name,
        None => return Vec::new(),
    };

    let args = words
        .map(|w| w.to_str_lossy().into_owned())
        .collect::<Vec<_>>();

    if name.eq_ignore_case("SASL") && !args.is_empty() {
        args.iter().map(|mechanism| sasl(mechanism)).collect()
    } else {
        vec![lookup_or_create(&name.to_str_lossy()).with_arguments(args)]
    }
}

/// Convert the body lines of a `CAPA` response into a capability list.
pub fn from_capa_body<'a>(
    lines: impl IntoIterator<Item = &'a ByteString>,
) -> TokenList {
    lines.into_iter().flat_map(parse_capa_line).collect()
}
