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

//! POP3 extended response codes (RFC 2449, RFC 3206, RFC 6856).
//!
//! Codes are hierarchical (`SYS/TEMP`); `ExtensionToken::tag()` gives the
//! top level.

use lazy_static::lazy_static;

use crate::wire::token::{ExtensionToken, Registry};

pub static LOGIN_DELAY: ExtensionToken = ExtensionToken::known("LOGIN-DELAY");
pub static IN_USE: ExtensionToken = ExtensionToken::known("IN-USE");
pub static SYS_TEMP: ExtensionToken = ExtensionToken::known("SYS/TEMP");
pub static SYS_PERM: ExtensionToken = ExtensionToken::known("SYS/PERM");
pub static AUTH: ExtensionToken = ExtensionToken::known("AUTH");
pub static UTF8: ExtensionToken = ExtensionToken::known("UTF8");

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new(
        "POP3 response code",
        &[&LOGIN_DELAY, &IN_USE, &SYS_TEMP, &SYS_PERM, &AUTH, &UTF8],
    );
}

pub fn lookup_or_create(name: &str) -> ExtensionToken {
    REGISTRY.lookup_or_create(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(SYS_TEMP, lookup_or_create("sys/temp"));
        assert_eq!("SYS", lookup_or_create("sys/temp").tag());
        assert!(lookup_or_create("In-Use").is_well_known());
        assert!(!lookup_or_create("SYS/OTHER").is_well_known());
        assert_eq!(6, REGISTRY.len());
    }
}
