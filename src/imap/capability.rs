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

//! IMAP capabilities.
//!
//! The well-known names are those of the IANA IMAP capabilities registry
//! that clients commonly act on, plus a few widespread vendor extensions.
//! Anything else a server advertises still parses, as a dynamically created
//! token.

use lazy_static::lazy_static;

use super::model::ImapData;
use crate::wire::token::{ExtensionToken, Registry};
use crate::wire::token_set::TokenList;

pub static IMAP4REV1: ExtensionToken = ExtensionToken::known("IMAP4rev1");
pub static IMAP4: ExtensionToken = ExtensionToken::known("IMAP4");
pub static STARTTLS: ExtensionToken = ExtensionToken::known("STARTTLS");
pub static LOGINDISABLED: ExtensionToken = ExtensionToken::known("LOGINDISABLED");
pub static LITERAL_PLUS: ExtensionToken = ExtensionToken::known("LITERAL+");
pub static LITERAL_MINUS: ExtensionToken = ExtensionToken::known("LITERAL-");
pub static IDLE: ExtensionToken = ExtensionToken::known("IDLE");
pub static ID: ExtensionToken = ExtensionToken::known("ID");
pub static NAMESPACE: ExtensionToken = ExtensionToken::known("NAMESPACE");
pub static CHILDREN: ExtensionToken = ExtensionToken::known("CHILDREN");
pub static QUOTA: ExtensionToken = ExtensionToken::known("QUOTA");
pub static MAILBOX_REFERRALS: ExtensionToken = ExtensionToken::known("MAILBOX-REFERRALS");
pub static LOGIN_REFERRALS: ExtensionToken = ExtensionToken::known("LOGIN-REFERRALS");
pub static MULTIAPPEND: ExtensionToken = ExtensionToken::known("MULTIAPPEND");
pub static BINARY: ExtensionToken = ExtensionToken::known("BINARY");
pub static UNSELECT: ExtensionToken = ExtensionToken::known("UNSELECT");
pub static ACL: ExtensionToken = ExtensionToken::known("ACL");
pub static UIDPLUS: ExtensionToken = ExtensionToken::known("UIDPLUS");
pub static URLAUTH: ExtensionToken = ExtensionToken::known("URLAUTH");
pub static CATENATE: ExtensionToken = ExtensionToken::known("CATENATE");
pub static CONDSTORE: ExtensionToken = ExtensionToken::known("CONDSTORE");
pub static ESEARCH: ExtensionToken = ExtensionToken::known("ESEARCH");
pub static SASL_IR: ExtensionToken = ExtensionToken::known("SASL-IR");
pub static COMPRESS_DEFLATE: ExtensionToken = ExtensionToken::known("COMPRESS=DEFLATE");
pub static WITHIN: ExtensionToken = ExtensionToken::known("WITHIN");
pub static ENABLE: ExtensionToken = ExtensionToken::known("ENABLE");
pub static QRESYNC: ExtensionToken = ExtensionToken::known("QRESYNC");
pub static SEARCHRES: ExtensionToken = ExtensionToken::known("SEARCHRES");
pub static I18NLEVEL_1: ExtensionToken = ExtensionToken::known("I18NLEVEL=1");
pub static I18NLEVEL_2: ExtensionToken = ExtensionToken::known("I18NLEVEL=2");
pub static LANGUAGE: ExtensionToken = ExtensionToken::known("LANGUAGE");
pub static SORT: ExtensionToken = ExtensionToken::known("SORT");
pub static THREAD_ORDEREDSUBJECT: ExtensionToken = ExtensionToken::known("THREAD=ORDEREDSUBJECT");
pub static THREAD_REFERENCES: ExtensionToken = ExtensionToken::known("THREAD=REFERENCES");
pub static LIST_EXTENDED: ExtensionToken = ExtensionToken::known("LIST-EXTENDED");
pub static CONVERT: ExtensionToken = ExtensionToken::known("CONVERT");
pub static CONTEXT_SEARCH: ExtensionToken = ExtensionToken::known("CONTEXT=SEARCH");
pub static CONTEXT_SORT: ExtensionToken = ExtensionToken::known("CONTEXT=SORT");
pub static ESORT: ExtensionToken = ExtensionToken::known("ESORT");
pub static METADATA: ExtensionToken = ExtensionToken::known("METADATA");
pub static METADATA_SERVER: ExtensionToken = ExtensionToken::known("METADATA-SERVER");
pub static NOTIFY: ExtensionToken = ExtensionToken::known("NOTIFY");
pub static FILTERS: ExtensionToken = ExtensionToken::known("FILTERS");
pub static UTF8_ACCEPT: ExtensionToken = ExtensionToken::known("UTF8=ACCEPT");
pub static UTF8_ALL: ExtensionToken = ExtensionToken::known("UTF8=ALL");
pub static UTF8_APPEND: ExtensionToken = ExtensionToken::known("UTF8=APPEND");
pub static UTF8_ONLY: ExtensionToken = ExtensionToken::known("UTF8=ONLY");
pub static UTF8_USER: ExtensionToken = ExtensionToken::known("UTF8=USER");
pub static LIST_STATUS: ExtensionToken = ExtensionToken::known("LIST-STATUS");
pub static MOVE: ExtensionToken = ExtensionToken::known("MOVE");
pub static SPECIAL_USE: ExtensionToken = ExtensionToken::known("SPECIAL-USE");
pub static APPENDLIMIT: ExtensionToken = ExtensionToken::known("APPENDLIMIT");
pub static XLIST: ExtensionToken = ExtensionToken::known("XLIST");
pub static X_GM_EXT_1: ExtensionToken = ExtensionToken::known("X-GM-EXT-1");
pub static AUTH_PLAIN: ExtensionToken = ExtensionToken::known("AUTH=PLAIN");
pub static AUTH_LOGIN: ExtensionToken = ExtensionToken::known("AUTH=LOGIN");
pub static AUTH_CRAM_MD5: ExtensionToken = ExtensionToken::known("AUTH=CRAM-MD5");
pub static AUTH_DIGEST_MD5: ExtensionToken = ExtensionToken::known("AUTH=DIGEST-MD5");
pub static AUTH_ANONYMOUS: ExtensionToken = ExtensionToken::known("AUTH=ANONYMOUS");
pub static AUTH_EXTERNAL: ExtensionToken = ExtensionToken::known("AUTH=EXTERNAL");
pub static AUTH_GSSAPI: ExtensionToken = ExtensionToken::known("AUTH=GSSAPI");
pub static AUTH_XOAUTH2: ExtensionToken = ExtensionToken::known("AUTH=XOAUTH2");

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new(
        "IMAP capability",
        &[
            &IMAP4REV1,
            &IMAP4,
            &STARTTLS,
            &LOGINDISABLED,
            &LITERAL_PLUS,
            &LITERAL_MINUS,
            &IDLE,
            &ID,
            &NAMESPACE,
            &CHILDREN,
            &QUOTA,
            &MAILBOX_REFERRALS,
            &LOGIN_REFERRALS,
            &MULTIAPPEND,
            &BINARY,
            &UNSELECT,
            &ACL,
            &UIDPLUS,
            &URLAUTH,
            &CATENATE,
            &CONDSTORE,
            &ESEARCH,
            &SASL_IR,
            &COMPRESS_DEFLATE,
            &WITHIN,
            &ENABLE,
            &QRESYNC,
            &SEARCHRES,
            &I18NLEVEL_1,
            &I18NLEVEL_2,
            &LANGUAGE,
            &SORT,
            &THREAD_ORDEREDSUBJECT,
            &THREAD_REFERENCES,
            &LIST_EXTENDED,
            &CONVERT,
            &CONTEXT_SEARCH,
            &CONTEXT_SORT,
            &ESORT,
            &METADATA,
            &METADATA_SERVER,
            &NOTIFY,
            &FILTERS,
            &UTF8_ACCEPT,
            &UTF8_ALL,
            &UTF8_APPEND,
            &UTF8_ONLY,
            &UTF8_USER,
            &LIST_STATUS,
            &MOVE,
            &SPECIAL_USE,
            &APPENDLIMIT,
            &XLIST,
            &X_GM_EXT_1,
            &AUTH_PLAIN,
            &AUTH_LOGIN,
            &AUTH_CRAM_MD5,
            &AUTH_DIGEST_MD5,
            &AUTH_ANONYMOUS,
            &AUTH_EXTERNAL,
            &AUTH_GSSAPI,
            &AUTH_XOAUTH2,
        ],
    );
}

pub fn lookup_or_create(name: &str) -> ExtensionToken {
    REGISTRY.lookup_or_create(name)
}

/// Build an `AUTH=<mechanism>` capability.
pub fn auth(mechanism: &str) -> ExtensionToken {
    lookup_or_create(&format!("AUTH={}", mechanism))
}

/// Convert the items of a `CAPABILITY` response (or response code) into
/// tokens. Items which are not atoms are ignored.
pub fn from_data(items: &[ImapData]) -> TokenList {
    items
        .iter()
        .filter_map(|item| match *item {
            ImapData::Atom(ref name) => Some(lookup_or_create(&name.to_str_lossy())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::token_set::TokenCollection;

    #[test]
    fn lookup_is_case_insensitive() {
        for name in &["imap4rev1", "IMAP4REV1", "Imap4Rev1"] {
            let token = lookup_or_create(name);
            assert!(token.is_well_known());
            assert!(std::ptr::eq(IMAP4REV1.value(), token.value()));
        }

        assert_eq!(LITERAL_PLUS, lookup_or_create("literal+"));
        assert_eq!(AUTH_PLAIN, auth("plain"));
        assert!(!auth("SCRAM-SHA-256").is_well_known());
        assert_eq!("AUTH", auth("SCRAM-SHA-256").tag());
    }

    #[test]
    fn capability_data() {
        let caps = from_data(&[
            ImapData::atom("IMAP4rev1"),
            ImapData::atom("AUTH=PLAIN"),
            ImapData::atom("X-UNKNOWN"),
            ImapData::Nil,
        ]);
        assert_eq!(3, caps.len());
        assert!(caps.contains(&IMAP4REV1));
        assert!(caps.is_capable("auth"));
        assert_eq!("X-UNKNOWN", caps.find("x-unknown").unwrap().value());
    }
}
