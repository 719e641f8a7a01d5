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

//! Open-vocabulary protocol tokens.
//!
//! Capabilities and response codes are open sets: servers routinely send
//! names we have never heard of. An `ExtensionToken` is a name with ASCII
//! case-insensitive identity, optionally carrying arguments (as in POP3
//! `LOGIN-DELAY 900`).
//!
//! Each vocabulary has a `Registry` of well-known tokens, which are `static`
//! items. `Registry::lookup_or_create()` hands back a copy of the registered
//! token when the name is known, or a fresh token with the caller's exact
//! casing otherwise. Both kinds compare and hash identically, so callers
//! never need to care which path produced a token.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::support::byte_string::NoCase;

#[derive(Clone, Debug)]
pub struct ExtensionToken {
    value: Cow<'static, str>,
    arguments: Vec<String>,
    well_known: bool,
}

impl ExtensionToken {
    /// Define a well-known token. Only for use in `static` items which are
    /// then added to a `Registry`.
    pub const fn known(value: &'static str) -> Self {
        ExtensionToken {
            value: Cow::Borrowed(value),
            arguments: Vec::new(),
            well_known: true,
        }
    }

    /// Construct a token that is not (necessarily) well-known.
    ///
    /// Callers parsing wire data should use the `lookup_or_create()` of the
    /// appropriate vocabulary instead, so known names resolve to their
    /// well-known instance.
    pub fn new(value: impl Into<String>) -> Self {
        ExtensionToken {
            value: Cow::Owned(value.into()),
            arguments: Vec::new(),
            well_known: false,
        }
    }

    /// The token name, in the casing it was defined or received with.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The part of the name before the first `/` or `=`.
    ///
    /// `SASL/PLAIN` and `AUTH=PLAIN` have tags `SASL` and `AUTH`; tokens
    /// without a separator are their own tag.
    pub fn tag(&self) -> &str {
        match self.value.find(|c| '/' == c || '=' == c) {
            Some(ix) => &self.value[..ix],
            None => &self.value,
        }
    }

    /// The part of the name after the tag separator, if any.
    pub fn subvalue(&self) -> Option<&str> {
        self.value
            .find(|c| '/' == c || '=' == c)
            .map(|ix| &self.value[ix + 1..])
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn is_well_known(&self) -> bool {
        self.well_known
    }

    /// Whether this token's name equals `name`, ignoring ASCII case.
    pub fn is(&self, name: &str) -> bool {
        self.value.eq_ignore_ascii_case(name)
    }

    /// Whether this token's tag equals `tag`, ignoring ASCII case.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag().eq_ignore_ascii_case(tag)
    }

    pub(super) fn normalised(&self) -> String {
        self.value.to_ascii_uppercase()
    }
}

impl PartialEq for ExtensionToken {
    fn eq(&self, other: &Self) -> bool {
        NoCase(self.value.as_bytes()) == NoCase(other.value.as_bytes())
    }
}

impl Eq for ExtensionToken {}

impl Hash for ExtensionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        NoCase(self.value.as_bytes()).hash(state)
    }
}

impl fmt::Display for ExtensionToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.value)?;
        for arg in &self.arguments {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// The set of well-known tokens of one vocabulary.
///
/// Built once from `static` token definitions and never modified afterwards,
/// so it can be shared freely between threads.
pub struct Registry {
    name: &'static str,
    by_name: HashMap<String, &'static ExtensionToken>,
}

impl Registry {
    pub fn new(name: &'static str, tokens: &[&'static ExtensionToken]) -> Self {
        Registry {
            name,
            by_name: tokens.iter().map(|&t| (t.normalised(), t)).collect(),
        }
    }

    /// The name of the vocabulary, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lookup(&self, name: &str) -> Option<&'static ExtensionToken> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }

    /// Return the well-known token named `name` (ignoring case) or, if there
    /// is none, a new token carrying `name` exactly as given.
    pub fn lookup_or_create(&self, name: &str) -> ExtensionToken {
        match self.lookup(name) {
            Some(known) => known.clone(),
            None => ExtensionToken::new(name),
        }
    }

    pub fn is_well_known(&self, token: &ExtensionToken) -> bool {
        self.by_name.contains_key(&token.normalised())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ExtensionToken> + '_ {
        self.by_name.values().copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Registry({}, {} tokens)", self.name, self.by_name.len())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    static ALPHA: ExtensionToken = ExtensionToken::known("ALPHA");
    static BETA: ExtensionToken = ExtensionToken::known("Beta/Two");

    fn registry() -> Registry {
        Registry::new("test", &[&ALPHA, &BETA])
    }

    #[test]
    fn known_tokens_resolve_to_registered_instance() {
        let registry = registry();
        for name in &["alpha", "ALPHA", "Alpha"] {
            let token = registry.lookup_or_create(name);
            assert!(token.is_well_known());
            assert!(std::ptr::eq(ALPHA.value(), token.value()));
            assert_eq!(ALPHA, token);
        }
    }

    #[test]
    fn unknown_tokens_keep_their_casing() {
        let registry = registry();
        let token = registry.lookup_or_create("X-Custom");
        assert!(!token.is_well_known());
        assert!(!registry.is_well_known(&token));
        assert_eq!("X-Custom", token.value());
        assert_eq!(ExtensionToken::new("x-custom"), token);

        // A dynamically constructed token naming a known value is still
        // considered well-known by the registry
        assert!(registry.is_well_known(&ExtensionToken::new("beta/two")));
    }

    #[test]
    fn equality_and_hash_ignore_case_and_arguments() {
        let mut set = HashSet::new();
        set.insert(ExtensionToken::new("login-delay"));
        assert!(set.contains(
            &ExtensionToken::new("LOGIN-DELAY")
                .with_arguments(vec!["900".to_owned()])
        ));
    }

    #[test]
    fn tags() {
        assert_eq!("Beta", BETA.tag());
        assert_eq!(Some("Two"), BETA.subvalue());
        assert!(BETA.has_tag("BETA"));
        assert_eq!("ALPHA", ALPHA.tag());
        assert_eq!(None, ALPHA.subvalue());
        assert_eq!("AUTH", ExtensionToken::new("AUTH=PLAIN").tag());
    }

    #[test]
    fn display_includes_arguments() {
        let token = ExtensionToken::new("LOGIN-DELAY")
            .with_arguments(vec!["900".to_owned(), "USER".to_owned()]);
        assert_eq!("LOGIN-DELAY 900 USER", token.to_string());
    }
}
