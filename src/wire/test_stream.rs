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

//! In-memory duplex stream for driving the wire layer in tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

enum Event {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

/// A stream which delivers scripted chunks to the reader and records
/// everything written to it.
///
/// Each `read()` returns bytes from at most one scripted chunk, so chunk
/// boundaries survive into the transport. Once the script is exhausted,
/// reads return EOF. Clones share the same script and output.
#[derive(Clone, Default)]
pub struct ScriptedStream {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    incoming: VecDeque<Event>,
    written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, data: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .incoming
            .push_back(Event::Data(data.to_vec()));
    }

    /// Make the next read fail with an error of the given kind.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.inner
            .lock()
            .unwrap()
            .incoming
            .push_back(Event::Error(kind));
    }

    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().unwrap().written.clone()
    }

    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.inner.lock().unwrap().written)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        match inner.incoming.pop_front() {
            None => Ok(0),
            Some(Event::Error(kind)) => Err(io::Error::new(kind, "scripted")),
            Some(Event::Data(mut data)) => {
                let n = buf.len().min(data.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    inner.incoming.push_front(Event::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
