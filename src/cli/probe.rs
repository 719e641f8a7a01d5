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

use log::info;
use openssl::ssl::{HandshakeError, SslConnector, SslMethod, SslVerifyMode};

use super::main::*;
use crate::imap::{self, model::*};
use crate::pop3::{self, model::*};
use crate::support::error::Error;
use crate::support::sysexits::*;
use crate::support::system_config::WireConfig;
use crate::wire::connection::Connection;
use crate::wire::receiver::Grammar;
use crate::wire::sender::Sender;
use crate::wire::token::ExtensionToken;
use crate::wire::transport::Duplex;

pub(super) fn main(cmd: ProbeSubcommand, config: WireConfig) {
    let result = match cmd {
        ProbeSubcommand::Imap(options) => probe_imap(&options, config),
        ProbeSubcommand::Pop3(options) => probe_pop3(&options, config),
    };

    if let Err(e) = result {
        die!(exit_code(&e), "Error: {}", e);
    }
}

fn exit_code(e: &Error) -> Sysexit {
    match *e {
        Error::Io(..) | Error::Timeout | Error::Closed => EX_UNAVAILABLE,
        Error::Malformed(..) | Error::UnexpectedResponse(..) => EX_PROTOCOL,
        Error::Config(..) => EX_CONFIG,
        _ => EX_SOFTWARE,
    }
}

fn start_tls<G: Grammar, S: Sender>(
    conn: &mut Connection<G, S>,
    options: &ProbeOptions,
) -> Result<(), Error> {
    let mut connector = SslConnector::builder(SslMethod::tls())?;
    if options.allow_insecure_tls_connections {
        connector.set_verify(SslVerifyMode::NONE);
    }
    let connector = connector.build();

    info!("{} Starting TLS handshake", conn.log_prefix());
    conn.upgrade(|stream| {
        let ssl_stream =
            connector
                .connect(&options.host, stream)
                .map_err(|e| match e {
                    HandshakeError::SetupFailure(es) => Error::Ssl(es),
                    HandshakeError::Failure(f) => {
                        Error::TlsHandshake(f.into_error())
                    }
                    HandshakeError::WouldBlock(_) => Error::Timeout,
                })?;
        Ok(Box::new(ssl_stream) as Box<dyn Duplex>)
    })
}

fn print_capabilities<'a>(tokens: impl Iterator<Item = &'a ExtensionToken>) {
    for token in tokens {
        if token.arguments().is_empty() {
            println!("{}", token.value());
        } else {
            println!("{} {}", token.value(), token.arguments().join(" "));
        }
    }
}

fn unexpected(what: &str, response: impl std::fmt::Debug) -> Error {
    Error::UnexpectedResponse(format!("{}: {:?}", what, response))
}

fn probe_imap(options: &ProbeOptions, config: WireConfig) -> Result<(), Error> {
    let port = options.port.unwrap_or(if options.tls { 993 } else { 143 });
    let mut conn = imap::client_connection(config);
    conn.connect(&options.host, port)?;
    if options.tls {
        start_tls(&mut conn, options)?;
    }

    let greeting = next_imap(&mut conn)?;
    if !matches!(
        greeting.status().map(|s| s.condition),
        Some(Condition::Ok) | Some(Condition::Preauth)
    ) {
        return Err(unexpected("Greeting", greeting));
    }
    let mut capabilities = greeting.capabilities();

    let mut tags = TagGenerator::new();
    if options.starttls {
        imap_command(&mut conn, Command::new(tags.next_tag(), "STARTTLS"))?;
        start_tls(&mut conn, options)?;
        // Anything learnt before TLS can't be trusted
        capabilities = None;
    }

    if capabilities.is_none() {
        for response in
            imap_command(&mut conn, Command::new(tags.next_tag(), "CAPABILITY"))?
        {
            if let Some(caps) = response.capabilities() {
                capabilities = Some(caps);
            }
        }
    }

    match capabilities {
        Some(caps) => print_capabilities(caps.iter()),
        None => println!("Server did not report any capabilities"),
    }

    // Failing to log out cleanly doesn't change what we learnt
    let _ = imap_command(&mut conn, Command::new(tags.next_tag(), "LOGOUT"));
    conn.close();
    Ok(())
}

fn next_imap(conn: &mut imap::ClientConnection) -> Result<Response, Error> {
    loop {
        if let Some(response) = conn.try_receive_next()? {
            return Ok(response);
        }
    }
}

/// Send `command` and read responses up to its tagged completion, which must
/// be `OK`. Returns the untagged responses.
fn imap_command(
    conn: &mut imap::ClientConnection,
    command: Command,
) -> Result<Vec<Response>, Error> {
    let tag = command.tag.clone();
    conn.send(&command)?;

    let mut untagged = Vec::new();
    loop {
        let response = next_imap(conn)?;
        if response.is_tagged_with(&tag) {
            let ok = response.status().map(|s| s.condition) == Some(Condition::Ok);
            return if ok {
                Ok(untagged)
            } else {
                Err(unexpected(&command.verb.to_str_lossy(), response))
            };
        }

        match response {
            Response::ContinuationRequest(_) => {
                conn.send_continuation()?;
            }
            response => untagged.push(response),
        }
    }
}

fn probe_pop3(options: &ProbeOptions, config: WireConfig) -> Result<(), Error> {
    let port = options.port.unwrap_or(if options.tls { 995 } else { 110 });
    let mut conn = pop3::client_connection(config);
    conn.connect(&options.host, port)?;
    if options.tls {
        start_tls(&mut conn, options)?;
    }

    let greeting = next_pop3(&mut conn)?;
    if !greeting.is_positive() {
        return Err(unexpected("Greeting", greeting));
    }

    if options.starttls {
        pop3_status(&mut conn, PopCommand::new("STLS"))?;
        start_tls(&mut conn, options)?;
    }

    let capa = PopCommand::new("CAPA");
    pop3::send_command(&mut conn, &capa)?;
    let response = next_pop3(&mut conn)?;
    if response.is_positive() {
        let mut lines = Vec::new();
        loop {
            match next_pop3(&mut conn)? {
                PopResponse::Line(line) => lines.push(line),
                PopResponse::Termination => break,
                r => return Err(unexpected("CAPA", r)),
            }
        }
        print_capabilities(pop3::capability::from_capa_body(&lines).iter());
    } else {
        println!("Server does not support CAPA");
    }

    let _ = pop3_status(&mut conn, PopCommand::new("QUIT"));
    conn.close();
    Ok(())
}

fn next_pop3(conn: &mut pop3::ClientConnection) -> Result<PopResponse, Error> {
    loop {
        if let Some(response) = conn.try_receive_next()? {
            return Ok(response);
        }
    }
}

/// Send a single-line command which must succeed.
fn pop3_status(
    conn: &mut pop3::ClientConnection,
    command: PopCommand,
) -> Result<PopResponse, Error> {
    pop3::send_command(conn, &command)?;
    let response = next_pop3(conn)?;
    if response.is_positive() {
        Ok(response)
    } else {
        Err(unexpected(&command.verb.to_str_lossy(), response))
    }
}
