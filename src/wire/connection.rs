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

//! Session-level driver tying a transport, a receiver and a sender together.
//!
//! A `Connection` is owned by exactly one worker. It moves strictly forward
//! through `Unconnected -> Connected -> [Upgraded ->] Closed`.
//!
//! Units are delivered in wire order. A single socket read can complete more
//! than one unit; after each successful receive, everything already buffered
//! is parsed into an internal queue, so later calls are served without
//! touching the socket.
//!
//! In idle mode, a read that would block (including a socket timeout) yields
//! `Ok(None)` so the caller can do other work and retry. Outside of idle
//! mode the same condition is reported as `Error::Timeout`, which the caller
//! may treat as fatal or not; the connection itself stays open. Every other
//! transport failure closes the connection.

use std::collections::VecDeque;
use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::prelude::*;
use log::{info, trace, warn};

use super::receiver::{Grammar, ReceiveOutcome, Receiver};
use super::sender::{Segments, SendOutcome, Sender};
use super::transport::{BufferedTransport, Duplex};
use crate::support::byte_string::escape;
use crate::support::error::{is_would_block, Error, Malformed};
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::WireConfig;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Unconnected,
    Connected,
    Upgraded,
    Closed,
}

pub struct Connection<G: Grammar, S: Sender> {
    id: u64,
    log_prefix: LogPrefix,
    config: WireConfig,
    lifecycle: Lifecycle,

    transport: Option<BufferedTransport>,
    receiver: Receiver<G>,
    sender: S,

    /// Units already parsed but not yet handed to the caller.
    queue: VecDeque<Result<G::Unit, Malformed>>,
    /// Output segments waiting for a continuation request from the peer.
    pending_segments: VecDeque<Vec<u8>>,
    /// A synchronising literal was found while draining the buffer and the
    /// peer is still waiting to be told to send it.
    go_ahead_pending: bool,

    idle: bool,
    last_activity: DateTime<Utc>,
}

impl<G: Grammar, S: Sender> Connection<G, S> {
    pub fn new(protocol: &str, grammar: G, sender: S, config: WireConfig) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        Connection {
            id,
            log_prefix: LogPrefix::new(protocol.to_owned(), id),
            config,
            lifecycle: Lifecycle::Unconnected,
            transport: None,
            receiver: Receiver::new(grammar),
            sender,
            queue: VecDeque::new(),
            pending_segments: VecDeque::new(),
            go_ahead_pending: false,
            idle: false,
            last_activity: Utc::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_open(&self) -> bool {
        match self.lifecycle {
            Lifecycle::Connected | Lifecycle::Upgraded => true,
            Lifecycle::Unconnected | Lifecycle::Closed => false,
        }
    }

    pub fn grammar(&self) -> &G {
        self.receiver.grammar()
    }

    /// Access the receiving grammar, e.g. to tell a POP3 client grammar that
    /// the next response has a multi-line body.
    pub fn grammar_mut(&mut self) -> &mut G {
        self.receiver.grammar_mut()
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut S {
        &mut self.sender
    }

    /// The time of the last successful send or receive.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Enable or disable idle mode.
    pub fn set_idle(&mut self, idle: bool) {
        self.idle = idle;
    }

    /// Open a TCP connection to `host:port`, applying the configured
    /// timeouts.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.check_attachable()?;

        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(self.config.timeouts.receive())?;
        stream.set_write_timeout(self.config.timeouts.send())?;
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| format!("{}:{}", host, port));
        self.attach(Box::new(stream), Some(peer))
    }

    /// Attach an already-established stream, such as an accepted socket.
    pub fn attach(
        &mut self,
        stream: Box<dyn Duplex>,
        peer: Option<String>,
    ) -> Result<(), Error> {
        self.check_attachable()?;

        if let Some(peer) = peer {
            self.log_prefix.set_peer(peer);
        }
        self.transport = Some(BufferedTransport::new(
            stream,
            self.config.limits.read_chunk_size,
        ));
        self.lifecycle = Lifecycle::Connected;
        self.last_activity = Utc::now();
        info!("{} Connected", self.log_prefix);
        Ok(())
    }

    fn check_attachable(&self) -> Result<(), Error> {
        match self.lifecycle {
            Lifecycle::Unconnected => Ok(()),
            Lifecycle::Connected | Lifecycle::Upgraded => {
                Err(Error::AlreadyConnected)
            }
            Lifecycle::Closed => Err(Error::Closed),
        }
    }

    fn check_open(&self) -> Result<(), Error> {
        match self.lifecycle {
            Lifecycle::Connected | Lifecycle::Upgraded => Ok(()),
            Lifecycle::Unconnected => Err(Error::NotConnected),
            Lifecycle::Closed => Err(Error::Closed),
        }
    }

    /// Replace the underlying stream, typically to start TLS.
    ///
    /// Anything already received but not yet parsed is kept. Upgrading is
    /// only possible once. If `upgrade` fails, the connection is closed.
    pub fn upgrade<F>(&mut self, upgrade: F) -> Result<(), Error>
    where
        F: FnOnce(Box<dyn Duplex>) -> Result<Box<dyn Duplex>, Error>,
    {
        match self.lifecycle {
            Lifecycle::Connected => (),
            Lifecycle::Upgraded => return Err(Error::AlreadyUpgraded),
            Lifecycle::Unconnected => return Err(Error::NotConnected),
            Lifecycle::Closed => return Err(Error::Closed),
        }

        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        if let Err(e) = transport.upgrade(upgrade) {
            warn!("{} Stream upgrade failed: {}", self.log_prefix, e);
            self.close();
            return Err(e);
        }

        self.lifecycle = Lifecycle::Upgraded;
        self.log_prefix.set_tls(true);
        info!("{} Stream upgraded", self.log_prefix);
        Ok(())
    }

    /// Close the connection, discarding any partially received unit, queued
    /// units and unsent continuation segments.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!("{} Connection closed", self.log_prefix);
        }

        self.lifecycle = Lifecycle::Closed;
        self.receiver.reset();
        self.queue.clear();
        self.pending_segments.clear();
        self.go_ahead_pending = false;
    }

    /// Return the next unit received from the peer.
    ///
    /// Returns `Ok(None)` only in idle mode, when nothing is available yet.
    /// `Err(Error::Malformed)` means the peer sent something unparsable; it
    /// has been skipped and the connection remains usable.
    pub fn try_receive_next(&mut self) -> Result<Option<G::Unit>, Error> {
        if let Some(unit) = self.queue.pop_front() {
            return Ok(Some(unit?));
        }

        self.check_open()?;
        if self.go_ahead_pending {
            self.go_ahead_pending = false;
            self.send_go_ahead()?;
        }

        loop {
            let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
            match self.receiver.receive(transport) {
                Ok(ReceiveOutcome::Complete(unit)) => {
                    self.last_activity = Utc::now();
                    trace!("{} << {:?}", self.log_prefix, unit);
                    self.queue.push_back(Ok(unit));
                    break;
                }

                Ok(ReceiveOutcome::Continuing { go_ahead, .. }) => {
                    if go_ahead {
                        self.send_go_ahead()?;
                    }
                }

                Ok(ReceiveOutcome::NeedMoreBytes(_)) => {
                    if !self.fill()? {
                        return Ok(None);
                    }
                }

                Err(malformed) => {
                    warn!("{} {}", self.log_prefix, malformed);
                    self.queue.push_back(Err(malformed));
                    break;
                }
            }
        }

        self.drain_buffered();
        match self.queue.pop_front() {
            Some(unit) => Ok(Some(unit?)),
            None => Ok(None),
        }
    }

    /// Read once from the stream.
    ///
    /// Returns `Ok(false)` if nothing could be read but the caller should
    /// return "nothing yet".
    fn fill(&mut self) -> Result<bool, Error> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        match transport.fill() {
            Ok(0) => {
                info!("{} EOF from peer", self.log_prefix);
                self.close();
                Err(Error::Closed)
            }
            Ok(_) => {
                self.last_activity = Utc::now();
                Ok(true)
            }
            Err(e) if io::ErrorKind::Interrupted == e.kind() => Ok(true),
            Err(e) if is_would_block(&e) => {
                if self.idle {
                    Ok(false)
                } else {
                    Err(Error::Timeout)
                }
            }
            Err(e) => {
                warn!("{} Read failed: {}", self.log_prefix, e);
                self.close();
                Err(Error::Io(e))
            }
        }
    }

    /// Parse every unit that is already buffered into the queue.
    fn drain_buffered(&mut self) {
        while let Some(transport) = self.transport.as_mut() {
            match self.receiver.receive(transport) {
                Ok(ReceiveOutcome::Complete(unit)) => {
                    trace!("{} << {:?}", self.log_prefix, unit);
                    self.queue.push_back(Ok(unit));
                }
                Ok(ReceiveOutcome::Continuing { go_ahead, .. }) => {
                    self.go_ahead_pending = go_ahead;
                    break;
                }
                Ok(ReceiveOutcome::NeedMoreBytes(_)) => break,
                Err(malformed) => {
                    warn!("{} {}", self.log_prefix, malformed);
                    self.queue.push_back(Err(malformed));
                }
            }
        }
    }

    fn send_go_ahead(&mut self) -> Result<(), Error> {
        if let Some(request) = self.receiver.grammar().continuation_request() {
            self.write(&request)?;
        }
        Ok(())
    }

    /// Serialise and send `unit`.
    ///
    /// If the unit contains parts which may only be sent after the peer
    /// issues a continuation request, only the first part is written and
    /// `AwaitingContinuation` is returned; use `send_continuation()` to send
    /// the rest.
    pub fn send(&mut self, unit: &S::Unit) -> Result<SendOutcome, Error> {
        self.check_open()?;
        if !self.pending_segments.is_empty() {
            return Err(Error::ContinuationPending);
        }

        let mut segments = Segments::new();
        self.sender.serialise(unit, &mut segments);
        let mut parts = segments.into_parts();
        if let Some(first) = parts.pop_front() {
            self.write(&first)?;
        }
        self.pending_segments = parts;
        Ok(self.send_outcome())
    }

    /// Send the next segment of a unit that was waiting for a continuation
    /// request.
    pub fn send_continuation(&mut self) -> Result<SendOutcome, Error> {
        self.check_open()?;
        let segment = self
            .pending_segments
            .pop_front()
            .ok_or(Error::NoContinuation)?;
        self.write(&segment)?;
        Ok(self.send_outcome())
    }

    /// Whether a previously sent unit still has segments to send.
    pub fn is_awaiting_continuation(&self) -> bool {
        !self.pending_segments.is_empty()
    }

    fn send_outcome(&self) -> SendOutcome {
        if self.pending_segments.is_empty() {
            SendOutcome::Sent
        } else {
            SendOutcome::AwaitingContinuation
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        trace!("{} >> {}", self.log_prefix, escape(data));
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        let result = transport.write_all(data).and_then(|_| transport.flush());
        match result {
            Ok(()) => {
                self.last_activity = Utc::now();
                Ok(())
            }
            Err(e) => {
                warn!("{} Write failed: {}", self.log_prefix, e);
                self.close();
                if is_would_block(&e) {
                    Err(Error::Timeout)
                } else {
                    Err(Error::Io(e))
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::test_stream::ScriptedStream;
    use super::*;
    use crate::support::byte_string::ByteString;
    use crate::imap::model::{Command, ImapData};
    use crate::imap::receiver::{CommandGrammar, ResponseGrammar};
    use crate::imap::sender::{CommandSender, ResponseSender};

    type Server = Connection<CommandGrammar, ResponseSender>;
    type Client = Connection<ResponseGrammar, CommandSender>;

    fn server(script: &ScriptedStream) -> Server {
        crate::init_test_log();
        let config = WireConfig::default();
        let mut conn =
            Connection::new("imap", CommandGrammar::new(&config), ResponseSender, config);
        conn.attach(Box::new(script.clone()), Some("test".to_owned()))
            .unwrap();
        conn
    }

    fn client(script: &ScriptedStream) -> Client {
        crate::init_test_log();
        let config = WireConfig::default();
        let mut conn = Connection::new(
            "imap",
            ResponseGrammar::new(&config),
            CommandSender::default(),
            config,
        );
        conn.attach(Box::new(script.clone()), None).unwrap();
        conn
    }

    fn next_tag(conn: &mut Server) -> String {
        conn.try_receive_next()
            .unwrap()
            .unwrap()
            .tag
            .to_str_lossy()
            .into_owned()
    }

    #[test]
    fn queues_units_from_one_read() {
        let script = ScriptedStream::new();
        script.push(b"a1 NOOP\r\na2 NOOP\r\na3 NO");
        script.push(b"OP\r\n");
        let mut conn = server(&script);

        assert_eq!("a1", next_tag(&mut conn));
        assert_eq!("a2", next_tag(&mut conn));
        assert_eq!("a3", next_tag(&mut conn));
        assert_matches!(Err(Error::Closed), conn.try_receive_next());
        assert_eq!(Lifecycle::Closed, conn.lifecycle());
        assert_matches!(Err(Error::Closed), conn.try_receive_next());
    }

    #[test]
    fn malformed_units_do_not_close() {
        let script = ScriptedStream::new();
        script.push(b"a1 FOO )\r\na2 NOOP\r\n");
        let mut conn = server(&script);

        match conn.try_receive_next() {
            Err(Error::Malformed(m)) => {
                assert_eq!(Some(ByteString::from("a1")), m.tag);
            }
            r => panic!("Unexpected result: {:?}", r),
        }
        assert!(conn.is_open());
        assert_eq!("a2", next_tag(&mut conn));
    }

    #[test]
    fn idle_mode_polling() {
        let script = ScriptedStream::new();
        script.push(b"a1 IDLE\r\n");
        script.push_error(io::ErrorKind::WouldBlock);
        script.push(b"a2 NOOP\r\n");
        script.push_error(io::ErrorKind::TimedOut);
        script.push(b"a3 NOOP\r\n");
        script.push_error(io::ErrorKind::ConnectionReset);
        let mut conn = server(&script);

        assert_eq!("a1", next_tag(&mut conn));
        conn.set_idle(true);
        assert_matches!(Ok(None), conn.try_receive_next());
        assert_eq!("a2", next_tag(&mut conn));

        conn.set_idle(false);
        assert_matches!(Err(Error::Timeout), conn.try_receive_next());
        assert!(conn.is_open());
        assert_eq!("a3", next_tag(&mut conn));

        conn.set_idle(true);
        assert_matches!(Err(Error::Io(_)), conn.try_receive_next());
        assert!(!conn.is_open());
    }

    #[test]
    fn go_ahead_sent_once_per_synchronising_literal() {
        let script = ScriptedStream::new();
        script.push(b"a1 LOGIN {4}\r\n");
        script.push(b"smdn {4+}\r\npass\r\n");
        let mut conn = server(&script);

        let command = conn.try_receive_next().unwrap().unwrap();
        assert_eq!(
            vec![ImapData::literal("smdn"), ImapData::literal("pass")],
            command.args
        );
        assert_eq!(b"+ Ready for literal data\r\n".to_vec(), script.written());
    }

    #[test]
    fn go_ahead_for_empty_literal() {
        let script = ScriptedStream::new();
        script.push(b"a1 LOGIN smdn {0}\r\n");
        script.push_error(io::ErrorKind::WouldBlock);
        script.push(b"\r\n");
        let mut conn = server(&script);
        conn.set_idle(true);

        assert_matches!(Ok(None), conn.try_receive_next());
        assert_eq!(b"+ Ready for literal data\r\n".to_vec(), script.written());

        let command = conn.try_receive_next().unwrap().unwrap();
        assert_eq!(
            vec![ImapData::atom("smdn"), ImapData::literal("")],
            command.args
        );
        assert!(command.continuation);
        assert_eq!(b"+ Ready for literal data\r\n".to_vec(), script.written());
    }

    #[test]
    fn go_ahead_for_queued_command() {
        let script = ScriptedStream::new();
        script.push(b"a1 NOOP\r\na2 LOGIN {4}\r\n");
        script.push(b"smdn pass\r\n");
        let mut conn = server(&script);

        assert_eq!("a1", next_tag(&mut conn));
        assert!(script.written().is_empty());
        assert_eq!("a2", next_tag(&mut conn));
        assert_eq!(b"+ Ready for literal data\r\n".to_vec(), script.written());
    }

    #[test]
    fn segmented_send() {
        let script = ScriptedStream::new();
        let mut conn = client(&script);

        let login = Command::new("a1", "LOGIN")
            .arg(ImapData::literal("smdn"))
            .arg(ImapData::literal("pass"));
        assert_eq!(SendOutcome::AwaitingContinuation, conn.send(&login).unwrap());
        assert_eq!(b"a1 LOGIN {4}\r\n".to_vec(), script.take_written());
        assert!(conn.is_awaiting_continuation());
        assert_matches!(
            Err(Error::ContinuationPending),
            conn.send(&Command::new("a2", "NOOP"))
        );

        assert_eq!(
            SendOutcome::AwaitingContinuation,
            conn.send_continuation().unwrap()
        );
        assert_eq!(b"smdn {4}\r\n".to_vec(), script.take_written());
        assert_eq!(SendOutcome::Sent, conn.send_continuation().unwrap());
        assert_eq!(b"pass\r\n".to_vec(), script.take_written());
        assert_matches!(Err(Error::NoContinuation), conn.send_continuation());

        assert_eq!(
            SendOutcome::Sent,
            conn.send(&Command::new("a2", "NOOP")).unwrap()
        );
        assert_eq!(b"a2 NOOP\r\n".to_vec(), script.take_written());
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let config = WireConfig::default();
        let mut conn: Client = Connection::new(
            "imap",
            ResponseGrammar::new(&config),
            CommandSender::default(),
            config,
        );
        assert_eq!(Lifecycle::Unconnected, conn.lifecycle());
        assert_matches!(Err(Error::NotConnected), conn.send(&Command::new("a", "NOOP")));
        assert_matches!(Err(Error::NotConnected), conn.upgrade(Ok));

        let script = ScriptedStream::new();
        conn.attach(Box::new(script.clone()), None).unwrap();
        assert_eq!(Lifecycle::Connected, conn.lifecycle());
        assert_matches!(
            Err(Error::AlreadyConnected),
            conn.attach(Box::new(script.clone()), None)
        );

        conn.upgrade(Ok).unwrap();
        assert_eq!(Lifecycle::Upgraded, conn.lifecycle());
        assert!(conn.log_prefix().to_string().ends_with("[tls]"));
        assert_matches!(Err(Error::AlreadyUpgraded), conn.upgrade(Ok));

        conn.close();
        assert_eq!(Lifecycle::Closed, conn.lifecycle());
        assert_matches!(Err(Error::Closed), conn.upgrade(Ok));
        assert_matches!(
            Err(Error::Closed),
            conn.attach(Box::new(script), None)
        );
    }

    #[test]
    fn failed_upgrade_closes() {
        let script = ScriptedStream::new();
        let mut conn = client(&script);
        assert_matches!(
            Err(Error::NotConnected),
            conn.upgrade(|_| Err(Error::NotConnected))
        );
        assert_eq!(Lifecycle::Closed, conn.lifecycle());
    }

    #[test]
    fn connection_ids_are_unique() {
        let script = ScriptedStream::new();
        let a = client(&script);
        let b = client(&script);
        assert_ne!(a.id(), b.id());
        assert!(a.log_prefix().to_string().starts_with("imap:"));
    }
}
