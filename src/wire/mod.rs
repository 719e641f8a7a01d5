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

//! The protocol-independent wire engine.
//!
//! Bytes flow `Duplex -> BufferedTransport -> Receiver<Grammar> -> Connection`
//! on the way in and `Connection -> Sender -> BufferedTransport` on the way
//! out. The `imap` and `pop3` modules supply the grammars and senders.

pub mod connection;
pub mod receiver;
pub mod sender;
pub mod token;
pub mod token_set;
pub mod transport;

#[cfg(test)]
pub mod test_stream;
