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

//! IMAP4rev1 wire protocol: data items, commands and responses.

pub mod capability;
pub mod data;
pub mod lex;
pub mod model;
pub mod receiver;
pub mod response_code;
pub mod sender;

#[cfg(test)]
mod integration_tests;

use self::receiver::{CommandGrammar, ResponseGrammar};
use self::sender::{CommandSender, ResponseSender};
use crate::support::system_config::WireConfig;
use crate::wire::connection::Connection;

/// A server-side connection: receives commands, sends responses.
pub type ServerConnection = Connection<CommandGrammar, ResponseSender>;
/// A client-side connection: receives responses, sends commands.
pub type ClientConnection = Connection<ResponseGrammar, CommandSender>;

pub fn server_connection(config: WireConfig) -> ServerConnection {
    Connection::new("imap", CommandGrammar::new(&config), ResponseSender, config)
}

pub fn client_connection(config: WireConfig) -> ClientConnection {
    let sender = CommandSender::new(config.imap.literal_plus);
    Connection::new("imap", ResponseGrammar::new(&config), sender, config)
}
