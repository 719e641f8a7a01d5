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

//! End-to-end exchanges between a client `Connection` and a server
//! `Connection`.
//!
//! Each test spawns a server thread. The two sides talk over a UNIX socket
//! pair, which behaves like a real network connection without needing ports.

use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use super::model::*;
use super::*;
use crate::support::byte_string::ByteString;
use crate::support::error::Error;
use crate::wire::sender::SendOutcome;
use crate::wire::test_stream::ScriptedStream;
use crate::wire::token_set::TokenCollection;

fn socket_pair() -> (UnixStream, UnixStream) {
    let (a, b) = UnixStream::pair().unwrap();
    for s in &[&a, &b] {
        s.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        s.set_write_timeout(Some(Duration::from_secs(10))).unwrap();
    }
    (a, b)
}

fn ok(tag: &ByteString, text: &str) -> Response {
    Response::tagged(
        tag.clone(),
        Condition::Ok,
        ResponseText::new(text.to_owned()),
    )
}

/// A tiny server which understands just enough to exercise the wire layer.
fn run_server(stream: UnixStream) {
    let mut conn = server_connection(WireConfig::default());
    conn.attach(Box::new(stream), Some("client".to_owned()))
        .unwrap();
    conn.send(&Response::untagged(
        Condition::Ok,
        ResponseText::new("hello").with_code(
            response_code::CAPABILITY.clone(),
            vec![
                ImapData::atom("IMAP4rev1"),
                ImapData::atom("LITERAL+"),
                ImapData::atom("IDLE"),
                ImapData::atom("AUTH=PLAIN"),
            ],
        ),
    ))
    .unwrap();

    loop {
        let command = match conn.try_receive_next() {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(Error::Malformed(m)) => {
                let tag = m.tag.unwrap_or_else(|| ByteString::from("*"));
                conn.send(&Response::tagged(
                    tag,
                    Condition::Bad,
                    ResponseText::new(m.reason.into_owned()),
                ))
                .unwrap();
                continue;
            }
            Err(Error::Closed) => return,
            Err(e) => panic!("Server failed: {}", e),
        };

        let tag = command.tag.clone();
        if command.is_verb("LOGIN") {
            conn.log_prefix()
                .set_user(command.args[0].as_bytes().unwrap().to_string());
            let text = format!(
                "{} {}",
                command.args[0].as_bytes().unwrap(),
                command.args[1].as_bytes().unwrap()
            );
            conn.send(&ok(&tag, &text)).unwrap();
        } else if command.is_verb("APPEND") {
            let len = command.args.last().unwrap().as_bytes().unwrap().len();
            conn.send(&ok(&tag, &format!("{} bytes", len))).unwrap();
        } else if command.is_verb("FETCH") && command.uid {
            conn.send(&Response::Data(vec![
                ImapData::atom("1"),
                ImapData::atom("FETCH"),
                ImapData::List(vec![
                    ImapData::atom("UID"),
                    ImapData::atom(command.args[0].as_bytes().unwrap().clone()),
                    ImapData::atom("BODY[]"),
                    ImapData::literal("Subject: hi\r\n\r\nbody\r\n"),
                ]),
            ]))
            .unwrap();
            conn.send(&ok(&tag, "FETCH done")).unwrap();
        } else if command.is_verb("LOGOUT") {
            conn.send(&Response::untagged(
                Condition::Bye,
                ResponseText::new("bye"),
            ))
            .unwrap();
            conn.send(&ok(&tag, "LOGOUT done")).unwrap();
            conn.close();
            return;
        } else {
            conn.send(&Response::tagged(
                tag,
                Condition::Bad,
                ResponseText::new("Unknown command"),
            ))
            .unwrap();
        }
    }
}

fn receive(conn: &mut ClientConnection) -> Response {
    conn.try_receive_next().unwrap().unwrap()
}

fn expect_ok(conn: &mut ClientConnection, tag: &ByteString) -> ByteString {
    match receive(conn) {
        Response::Tagged {
            tag: ref actual,
            ref status,
        } if actual == tag && Condition::Ok == status.condition => {
            status.text.text.clone()
        }
        r => panic!("Unexpected response: {:?}", r),
    }
}

#[test]
fn full_session() {
    crate::init_test_log();

    let (client_stream, server_stream) = socket_pair();
    let server = thread::spawn(move || run_server(server_stream));

    let mut conn = client_connection(WireConfig::default());
    conn.attach(Box::new(client_stream), None).unwrap();
    let mut tags = TagGenerator::new();

    let greeting = receive(&mut conn);
    let caps = greeting.capabilities().unwrap();
    assert!(caps.contains(&capability::IMAP4REV1));
    assert!(caps.is_capable("auth"));
    assert!(!caps.is_capable("STARTTLS"));

    // Synchronising literals: the server must invite each one
    let tag = tags.next_tag();
    let login = Command::new(tag.clone(), "LOGIN")
        .arg(ImapData::literal("smdn"))
        .arg(ImapData::string("pa\"ss"));
    assert!(login.continuation);
    assert_eq!(SendOutcome::AwaitingContinuation, conn.send(&login).unwrap());
    assert_matches!(Response::ContinuationRequest(_), receive(&mut conn));
    assert_eq!(
        SendOutcome::AwaitingContinuation,
        conn.send_continuation().unwrap()
    );
    assert_matches!(Response::ContinuationRequest(_), receive(&mut conn));
    assert_eq!(SendOutcome::Sent, conn.send_continuation().unwrap());
    assert_eq!("smdn pa\"ss", expect_ok(&mut conn, &tag));

    // With LITERAL+, the whole command goes at once
    conn.sender_mut().literal_plus = caps.contains(&capability::LITERAL_PLUS);
    let tag = tags.next_tag();
    let append = Command::new(tag.clone(), "APPEND")
        .arg(ImapData::atom("INBOX"))
        .arg(ImapData::literal("From: a\r\n\r\n.\r\n"));
    assert_eq!(SendOutcome::Sent, conn.send(&append).unwrap());
    assert_eq!("14 bytes", expect_ok(&mut conn, &tag));

    let tag = tags.next_tag();
    let fetch = Command::new(tag.clone(), "FETCH")
        .uid()
        .arg(ImapData::atom("42"))
        .arg(ImapData::List(vec![ImapData::atom("BODY.PEEK[]")]));
    conn.send(&fetch).unwrap();
    match receive(&mut conn) {
        Response::Data(ref items) => {
            let fetched = items[2].as_list().unwrap();
            assert_eq!(Some(42), fetched[1].to_u64());
            assert_eq!(
                ImapData::literal("Subject: hi\r\n\r\nbody\r\n"),
                fetched[3]
            );
        }
        r => panic!("Unexpected response: {:?}", r),
    }
    assert_eq!("FETCH done", expect_ok(&mut conn, &tag));

    let tag = tags.next_tag();
    conn.send(&Command::new(tag, "XYZZY")).unwrap();
    assert_matches!(
        Response::Tagged {
            status: Status {
                condition: Condition::Bad,
                ..
            },
            ..
        },
        receive(&mut conn)
    );

    let tag = tags.next_tag();
    conn.send(&Command::new(tag.clone(), "LOGOUT")).unwrap();
    assert_matches!(
        Response::Untagged(Status {
            condition: Condition::Bye,
            ..
        }),
        receive(&mut conn)
    );
    assert_eq!("LOGOUT done", expect_ok(&mut conn, &tag));
    assert_matches!(Err(Error::Closed), conn.try_receive_next());

    server.join().unwrap();
}

#[test]
fn malformed_command_gets_tagged_bad() {
    crate::init_test_log();

    let (client_stream, server_stream) = socket_pair();
    let server = thread::spawn(move || run_server(server_stream));

    let mut conn = client_connection(WireConfig::default());
    conn.attach(Box::new(client_stream), None).unwrap();
    receive(&mut conn);

    // Atoms are written verbatim, so this produces an unbalanced list
    conn.send(&Command::new("a1", "LOGIN").arg(ImapData::atom("(x")))
        .unwrap();
    match receive(&mut conn) {
        Response::Tagged { ref tag, ref status } => {
            assert_eq!("a1", *tag);
            assert_eq!(Condition::Bad, status.condition);
            assert_eq!("Unclosed parenthesis", status.text.text);
        }
        r => panic!("Unexpected response: {:?}", r),
    }

    conn.send(&Command::new("a2", "LOGOUT")).unwrap();
    receive(&mut conn);
    assert_eq!("LOGOUT done", expect_ok(&mut conn, &ByteString::from("a2")));
    server.join().unwrap();
}

#[test]
fn byte_at_a_time_delivery() {
    crate::init_test_log();

    let transcript: &[u8] = b"a1 LOGIN {4}\r\nsmdn {4}\r\npass\r\n\
        a2 APPEND INBOX (\\Seen) {5+}\r\nhello\r\n\
        a3 UID FETCH 1:* (FLAGS)\r\n";
    let script = ScriptedStream::new();
    for chunk in transcript.chunks(1) {
        script.push(chunk);
    }

    let mut conn = server_connection(WireConfig::default());
    conn.attach(Box::new(script.clone()), None).unwrap();
    let mut commands = Vec::new();
    loop {
        match conn.try_receive_next() {
            Ok(Some(command)) => commands.push(command),
            Err(Error::Closed) => break,
            r => panic!("Unexpected result: {:?}", r),
        }
    }

    assert_eq!(
        vec!["LOGIN", "APPEND", "FETCH"],
        commands
            .iter()
            .map(|c| c.verb.to_str_lossy().into_owned())
            .collect::<Vec<_>>()
    );
    assert_eq!(
        vec![ImapData::literal("smdn"), ImapData::literal("pass")],
        commands[0].args
    );
    assert_eq!(ImapData::literal("hello"), commands[1].args[2]);
    assert!(commands[2].uid);

    // One go-ahead per synchronising literal and none for LITERAL+
    let written = script.written();
    let go_aheads = written
        .windows(2)
        .filter(|w| w == b"+ ")
        .count();
    assert_eq!(2, go_aheads);
}
