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

//! Collections of `ExtensionToken`s.
//!
//! `TokenSet` is the unordered, de-duplicated form used for negotiation.
//! `TokenList` keeps wire order and duplicates, which matters for things like
//! the order a server lists its SASL mechanisms in.
//!
//! All lookups route through case-insensitive comparison.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::FromIterator;

use super::token::ExtensionToken;

/// Operations shared by `TokenSet` and `TokenList`.
pub trait TokenCollection {
    fn tokens(&self) -> Box<dyn Iterator<Item = &ExtensionToken> + '_>;

    fn contains(&self, token: &ExtensionToken) -> bool {
        self.tokens().any(|t| t == token)
    }

    /// Find the token whose full name is `name`.
    fn find(&self, name: &str) -> Option<&ExtensionToken> {
        self.tokens().find(|t| t.is(name))
    }

    /// Find the first token whose tag is `tag`.
    fn find_by_tag(&self, tag: &str) -> Option<&ExtensionToken> {
        self.tokens().find(|t| t.has_tag(tag))
    }

    fn find_all_by_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> Box<dyn Iterator<Item = &'a ExtensionToken> + 'a> {
        Box::new(self.tokens().filter(move |t| t.has_tag(tag)))
    }

    /// Whether the peer is capable of `name`.
    ///
    /// This is true if some token is named `name` exactly (modulo case) or
    /// if `name` is the tag of some token, so `is_capable("SASL")` holds
    /// whenever any `SASL/<mechanism>` token is present.
    fn is_capable(&self, name: &str) -> bool {
        self.tokens().any(|t| t.is(name) || t.has_tag(name))
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    items: BTreeMap<String, ExtensionToken>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `token` to the set.
    ///
    /// Returns false if an equal token was already present, in which case
    /// the existing token is kept.
    pub fn insert(&mut self, token: ExtensionToken) -> bool {
        let key = token.normalised();
        if self.items.contains_key(&key) {
            false
        } else {
            self.items.insert(key, token);
            true
        }
    }

    pub fn remove(&mut self, token: &ExtensionToken) -> Option<ExtensionToken> {
        self.items.remove(&token.normalised())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionToken> {
        self.items.values()
    }

    pub fn union(&self, other: &TokenSet) -> TokenSet {
        let mut result = self.clone();
        for token in other.iter() {
            result.insert(token.clone());
        }
        result
    }

    pub fn intersection(&self, other: &TokenSet) -> TokenSet {
        self.filtered(|k| other.items.contains_key(k))
    }

    pub fn difference(&self, other: &TokenSet) -> TokenSet {
        self.filtered(|k| !other.items.contains_key(k))
    }

    pub fn is_subset(&self, other: &TokenSet) -> bool {
        self.items.keys().all(|k| other.items.contains_key(k))
    }

    pub fn is_superset(&self, other: &TokenSet) -> bool {
        other.is_subset(self)
    }

    pub fn is_disjoint(&self, other: &TokenSet) -> bool {
        !self.items.keys().any(|k| other.items.contains_key(k))
    }

    fn filtered(&self, mut keep: impl FnMut(&String) -> bool) -> TokenSet {
        TokenSet {
            items: self
                .items
                .iter()
                .filter(|&(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl TokenCollection for TokenSet {
    fn tokens(&self) -> Box<dyn Iterator<Item = &ExtensionToken> + '_> {
        Box::new(self.items.values())
    }

    fn contains(&self, token: &ExtensionToken) -> bool {
        self.items.contains_key(&token.normalised())
    }

    fn find(&self, name: &str) -> Option<&ExtensionToken> {
        self.items.get(&name.to_ascii_uppercase())
    }
}

impl FromIterator<ExtensionToken> for TokenSet {
    fn from_iter<I: IntoIterator<Item = ExtensionToken>>(iter: I) -> Self {
        let mut set = TokenSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<ExtensionToken> for TokenSet {
    fn extend<I: IntoIterator<Item = ExtensionToken>>(&mut self, iter: I) {
        for token in iter {
            self.insert(token);
        }
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.items.values()).finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenList {
    items: Vec<ExtensionToken>,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: ExtensionToken) {
        self.items.push(token);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionToken> {
        self.items.iter()
    }

    pub fn to_set(&self) -> TokenSet {
        self.items.iter().cloned().collect()
    }
}

impl TokenCollection for TokenList {
    fn tokens(&self) -> Box<dyn Iterator<Item = &ExtensionToken> + '_> {
        Box::new(self.items.iter())
    }
}

impl FromIterator<ExtensionToken> for TokenList {
    fn from_iter<I: IntoIterator<Item = ExtensionToken>>(iter: I) -> Self {
        TokenList {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<ExtensionToken> for TokenList {
    fn extend<I: IntoIterator<Item = ExtensionToken>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for TokenList {
    type Item = ExtensionToken;
    type IntoIter = std::vec::IntoIter<ExtensionToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
