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

//! Serialisation of IMAP commands and responses.

use super::lex::{LexWriter, LiteralMode};
use super::model::*;
use crate::wire::sender::{Segments, Sender};

/// Client side: writes commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandSender {
    /// Whether the server advertised `LITERAL+`, so that literals can be sent
    /// without waiting for continuation requests.
    pub literal_plus: bool,
}

impl CommandSender {
    pub fn new(literal_plus: bool) -> Self {
        CommandSender { literal_plus }
    }
}

impl Sender for CommandSender {
    type Unit = Command;

    fn serialise(&self, command: &Command, out: &mut Segments) {
        let mode = if self.literal_plus {
            LiteralMode::NonSynchronising
        } else {
            LiteralMode::Synchronising
        };
        let mut w = LexWriter::new(out, mode);

        w.verbatim(&command.tag);
        w.verbatim(b" ");
        if command.uid {
            w.verbatim(b"UID ");
        }
        w.verbatim(&command.verb);
        if !command.args.is_empty() {
            w.verbatim(b" ");
            w.data_sequence(&command.args);
        }
        w.verbatim(b"\r\n");
    }
}

/// Server side: writes responses.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseSender;

impl Sender for ResponseSender {
    type Unit = Response;

    fn serialise(&self, response: &Response, out: &mut Segments) {
        let mut w = LexWriter::new(out, LiteralMode::Inline);
        match *response {
            Response::Tagged {
                ref tag,
                ref status,
            } => {
                w.verbatim(tag);
                w.verbatim(b" ");
                write_status(&mut w, status);
            }

            Response::Untagged(ref status) => {
                w.verbatim(b"* ");
                write_status(&mut w, status);
            }

            Response::Data(ref items) => {
                w.verbatim(b"* ");
                w.data_sequence(items);
            }

            Response::ContinuationRequest(ref text) => {
                w.verbatim(b"+ ");
                w.verbatim(text);
            }
        }
        w.verbatim(b"\r\n");
    }
}

fn write_status(w: &mut LexWriter<'_>, status: &Status) {
    w.verbatim(status.condition.name().as_bytes());

    if let Some(ref code) = status.text.code {
        w.verbatim(b" [");
        w.verbatim(code.value().as_bytes());
        if !status.text.code_args.is_empty() {
            w.verbatim(b" ");
            w.data_sequence(&status.text.code_args);
        }
        w.verbatim(b"]");
    }

    if !status.text.text.is_empty() {
        w.verbatim(b" ");
        w.verbatim(&status.text.text);
    }
}

#[cfg(test)]
mod test {
    use super::super::{capability, response_code};
    use super::*;

    #[test]
    fn write_commands() {
        let login = Command::new("a1", "LOGIN")
            .arg(ImapData::astring("smdn"))
            .arg(ImapData::astring("pass"));
        assert_eq!(
            b"a1 LOGIN smdn pass\r\n".to_vec(),
            CommandSender::new(false).to_bytes(&login)
        );

        let fetch = Command::new("a2", "FETCH")
            .uid()
            .arg(ImapData::atom("1:*"))
            .arg(ImapData::List(vec![
                ImapData::atom("FLAGS"),
                ImapData::atom("BODY.PEEK[]"),
            ]));
        assert_eq!(
            b"a2 UID FETCH 1:* (FLAGS BODY.PEEK[])\r\n".to_vec(),
            CommandSender::default().to_bytes(&fetch)
        );

        assert_eq!(
            b"a3 NOOP\r\n".to_vec(),
            CommandSender::default().to_bytes(&Command::new("a3", "NOOP"))
        );
    }

    #[test]
    fn synchronising_literals_split_segments() {
        let login = Command::new("a1", "LOGIN")
            .arg(ImapData::literal("smdn"))
            .arg(ImapData::string("p\"ss\r\n"));

        let mut out = Segments::new();
        CommandSender::new(false).serialise(&login, &mut out);
        let parts = out.into_parts();
        assert_eq!(3, parts.len());
        assert_eq!(b"a1 LOGIN {4}\r\n".to_vec(), parts[0]);
        assert_eq!(b"smdn {6}\r\n".to_vec(), parts[1]);
        assert_eq!(b"p\"ss\r\n\r\n".to_vec(), parts[2]);

        let mut out = Segments::new();
        CommandSender::new(true).serialise(&login, &mut out);
        assert_eq!(1, out.len());
        assert_eq!(
            b"a1 LOGIN {4+}\r\nsmdn {6+}\r\np\"ss\r\n\r\n".to_vec(),
            out.concat()
        );
    }

    #[test]
    fn write_responses() {
        let sender = ResponseSender;

        assert_eq!(
            b"a1 OK [READ-WRITE] SELECT completed\r\n".to_vec(),
            sender.to_bytes(&Response::tagged(
                "a1",
                Condition::Ok,
                ResponseText::new("SELECT completed")
                    .with_code(response_code::READ_WRITE.clone(), vec![]),
            ))
        );

        assert_eq!(
            b"* OK [CAPABILITY IMAP4rev1 IDLE] ready\r\n".to_vec(),
            sender.to_bytes(&Response::untagged(
                Condition::Ok,
                ResponseText::new("ready").with_code(
                    response_code::CAPABILITY.clone(),
                    vec![
                        ImapData::atom(capability::IMAP4REV1.value()),
                        ImapData::atom(capability::IDLE.value()),
                    ]
                ),
            ))
        );

        assert_eq!(
            b"* BYE\r\n".to_vec(),
            sender.to_bytes(&Response::untagged(
                Condition::Bye,
                ResponseText::default()
            ))
        );

        assert_eq!(
            b"* 1 FETCH (BODY[] {5}\r\nhello NIL)\r\n".to_vec(),
            sender.to_bytes(&Response::Data(vec![
                ImapData::atom("1"),
                ImapData::atom("FETCH"),
                ImapData::List(vec![
                    ImapData::atom("BODY[]"),
                    ImapData::literal("hello"),
                    ImapData::Nil,
                ]),
            ]))
        );

        assert_eq!(
            b"+ go ahead\r\n".to_vec(),
            sender.to_bytes(&Response::ContinuationRequest("go ahead".into()))
        );
    }
}
