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

//! POP3 wire protocol (RFC 1939, with the RFC 2449 extension mechanism).

pub mod apop;
pub mod capability;
pub mod listing;
pub mod model;
pub mod receiver;
pub mod response_code;
pub mod sender;


use self::model::PopCommand;
use self::receiver::{CommandGrammar, ResponseGrammar};
use self::sender::{CommandSender, ResponseSender};
use crate::support::error::Error;
use crate::support::system_config::WireConfig;
use crate::wire::connection::Connection;
use crate::wire::sender::SendOutcome;

/// A server-side connection: receives commands, sends responses.
pub type ServerConnection = Connection<CommandGrammar, ResponseSender>;
/// A client-side connection: receives responses, sends commands.
pub type ClientConnection = Connection<ResponseGrammar, CommandSender>;

pub fn server_connection(config: WireConfig) -> ServerConnection {
    Connection::new("pop3", CommandGrammar::new(&config), ResponseSender, config)
}

pub fn client_connection(config: WireConfig) -> ClientConnection {
    Connection::new("pop3", ResponseGrammar::new(&config), CommandSender, config)
}

/// Send `command`, first telling the response grammar whether a positive
/// answer carries a multi-line body.
///
/// Only one multi-line expectation is tracked, so the caller must read the
/// full response before sending the next command.
pub fn send_command(
    conn: &mut ClientConnection,
    command: &PopCommand,
) -> Result<SendOutcome, Error> {
    conn.grammar_mut()
        .set_handle_as_multiline(command.expects_multiline());
    conn.send(command)
}
