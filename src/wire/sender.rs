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

//! Serialisation of protocol units.
//!
//! A unit serialises into one or more `Segments`. The first segment can be
//! written immediately; each subsequent one may only be written after the
//! peer has sent a continuation request (as with IMAP synchronising
//! literals). Most units have exactly one segment.

use std::collections::VecDeque;
use std::io;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segments {
    parts: Vec<Vec<u8>>,
}

impl Default for Segments {
    fn default() -> Self {
        Segments {
            parts: vec![Vec::new()],
        }
    }
}

impl Segments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.current().extend_from_slice(data);
    }

    /// End the current segment. Everything written after this point is only
    /// sent once the peer asks for it.
    pub fn await_continuation(&mut self) {
        self.parts.push(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Return the segments in transmission order.
    pub fn into_parts(self) -> VecDeque<Vec<u8>> {
        self.parts.into()
    }

    /// Join all segments, as they would appear on the wire in total.
    pub fn concat(&self) -> Vec<u8> {
        self.parts.concat()
    }

    fn current(&mut self) -> &mut Vec<u8> {
        if self.parts.is_empty() {
            self.parts.push(Vec::new());
        }
        let last = self.parts.len() - 1;
        &mut self.parts[last]
    }
}

impl io::Write for Segments {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.extend(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serialises one kind of unit to wire format.
pub trait Sender {
    type Unit;

    fn serialise(&self, unit: &Self::Unit, out: &mut Segments);

    /// Convenience for serialising a unit known to need one segment.
    fn to_bytes(&self, unit: &Self::Unit) -> Vec<u8> {
        let mut out = Segments::new();
        self.serialise(unit, &mut out);
        out.concat()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The unit has been written in full.
    Sent,
    /// Part of the unit has been written; the rest is pending a continuation
    /// request from the peer.
    AwaitingContinuation,
}
