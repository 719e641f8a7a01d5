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

//! IMAP response codes (the bracketed part of `resp-text`).
//!
//! Unknown codes are not an error; they parse to dynamically created tokens
//! and their arguments are kept as data items.

use lazy_static::lazy_static;

use crate::wire::token::{ExtensionToken, Registry};

pub static ALERT: ExtensionToken = ExtensionToken::known("ALERT");
pub static BADCHARSET: ExtensionToken = ExtensionToken::known("BADCHARSET");
pub static CAPABILITY: ExtensionToken = ExtensionToken::known("CAPABILITY");
pub static PARSE: ExtensionToken = ExtensionToken::known("PARSE");
pub static PERMANENTFLAGS: ExtensionToken = ExtensionToken::known("PERMANENTFLAGS");
pub static READ_ONLY: ExtensionToken = ExtensionToken::known("READ-ONLY");
pub static READ_WRITE: ExtensionToken = ExtensionToken::known("READ-WRITE");
pub static TRYCREATE: ExtensionToken = ExtensionToken::known("TRYCREATE");
pub static UIDNEXT: ExtensionToken = ExtensionToken::known("UIDNEXT");
pub static UIDVALIDITY: ExtensionToken = ExtensionToken::known("UIDVALIDITY");
pub static UNSEEN: ExtensionToken = ExtensionToken::known("UNSEEN");
pub static REFERRAL: ExtensionToken = ExtensionToken::known("REFERRAL");
pub static UNKNOWN_CTE: ExtensionToken = ExtensionToken::known("UNKNOWN-CTE");
pub static APPENDUID: ExtensionToken = ExtensionToken::known("APPENDUID");
pub static COPYUID: ExtensionToken = ExtensionToken::known("COPYUID");
pub static UIDNOTSTICKY: ExtensionToken = ExtensionToken::known("UIDNOTSTICKY");
pub static HIGHESTMODSEQ: ExtensionToken = ExtensionToken::known("HIGHESTMODSEQ");
pub static NOMODSEQ: ExtensionToken = ExtensionToken::known("NOMODSEQ");
pub static MODIFIED: ExtensionToken = ExtensionToken::known("MODIFIED");
pub static COMPRESSIONACTIVE: ExtensionToken = ExtensionToken::known("COMPRESSIONACTIVE");
pub static NOTSAVED: ExtensionToken = ExtensionToken::known("NOTSAVED");
pub static BADCOMPARATOR: ExtensionToken = ExtensionToken::known("BADCOMPARATOR");
pub static METADATA: ExtensionToken = ExtensionToken::known("METADATA");
pub static UNDEFINED_FILTER: ExtensionToken = ExtensionToken::known("UNDEFINED-FILTER");
pub static UNAVAILABLE: ExtensionToken = ExtensionToken::known("UNAVAILABLE");
pub static AUTHENTICATIONFAILED: ExtensionToken = ExtensionToken::known("AUTHENTICATIONFAILED");
pub static AUTHORIZATIONFAILED: ExtensionToken = ExtensionToken::known("AUTHORIZATIONFAILED");
pub static EXPIRED: ExtensionToken = ExtensionToken::known("EXPIRED");
pub static PRIVACYREQUIRED: ExtensionToken = ExtensionToken::known("PRIVACYREQUIRED");
pub static CONTACTADMIN: ExtensionToken = ExtensionToken::known("CONTACTADMIN");
pub static NOPERM: ExtensionToken = ExtensionToken::known("NOPERM");
pub static INUSE: ExtensionToken = ExtensionToken::known("INUSE");
pub static EXPUNGEISSUED: ExtensionToken = ExtensionToken::known("EXPUNGEISSUED");
pub static CORRUPTION: ExtensionToken = ExtensionToken::known("CORRUPTION");
pub static SERVERBUG: ExtensionToken = ExtensionToken::known("SERVERBUG");
pub static CLIENTBUG: ExtensionToken = ExtensionToken::known("CLIENTBUG");
pub static CANNOT: ExtensionToken = ExtensionToken::known("CANNOT");
pub static LIMIT: ExtensionToken = ExtensionToken::known("LIMIT");
pub static OVERQUOTA: ExtensionToken = ExtensionToken::known("OVERQUOTA");
pub static ALREADYEXISTS: ExtensionToken = ExtensionToken::known("ALREADYEXISTS");
pub static NONEXISTENT: ExtensionToken = ExtensionToken::known("NONEXISTENT");
pub static USEATTR: ExtensionToken = ExtensionToken::known("USEATTR");
pub static CLOSED: ExtensionToken = ExtensionToken::known("CLOSED");

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new(
        "IMAP response code",
        &[
            &ALERT,
            &BADCHARSET,
            &CAPABILITY,
            &PARSE,
            &PERMANENTFLAGS,
            &READ_ONLY,
            &READ_WRITE,
            &TRYCREATE,
            &UIDNEXT,
            &UIDVALIDITY,
            &UNSEEN,
            &REFERRAL,
            &UNKNOWN_CTE,
            &APPENDUID,
            &COPYUID,
            &UIDNOTSTICKY,
            &HIGHESTMODSEQ,
            &NOMODSEQ,
            &MODIFIED,
            &COMPRESSIONACTIVE,
            &NOTSAVED,
            &BADCOMPARATOR,
            &METADATA,
            &UNDEFINED_FILTER,
            &UNAVAILABLE,
            &AUTHENTICATIONFAILED,
            &AUTHORIZATIONFAILED,
            &EXPIRED,
            &PRIVACYREQUIRED,
            &CONTACTADMIN,
            &NOPERM,
            &INUSE,
            &EXPUNGEISSUED,
            &CORRUPTION,
            &SERVERBUG,
            &CLIENTBUG,
            &CANNOT,
            &LIMIT,
            &OVERQUOTA,
            &ALREADYEXISTS,
            &NONEXISTENT,
            &USEATTR,
            &CLOSED,
        ],
    );
}

pub fn lookup_or_create(name: &str) -> ExtensionToken {
    REGISTRY.lookup_or_create(name)
}
