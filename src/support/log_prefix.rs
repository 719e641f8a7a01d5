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

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included in at the start of every log statement
/// about a connection.
///
/// Clones of a `LogPrefix` share the same underlying data.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    protocol: String,
    connection_id: u64,
    peer: Option<String>,
    user: Option<String>,
    tls: bool,
}

impl LogPrefix {
    pub fn new(protocol: String, connection_id: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                protocol,
                connection_id,
                peer: None,
                user: None,
                tls: false,
            })),
        }
    }

    pub fn deep_clone(&self) -> Self {
        let inner = self.lock();
        Self {
            inner: Arc::new(Mutex::new(Inner::clone(&inner))),
        }
    }

    pub fn set_peer(&self, peer: String) {
        self.lock().peer = Some(sanitise(peer));
    }

    pub fn set_user(&self, user: String) {
        self.lock().user = Some(sanitise(user));
    }

    pub fn set_tls(&self, tls: bool) {
        self.lock().tls = tls;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Nothing holding the lock can panic midway, so a poisoned lock still
        // has consistent data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.lock();
        write!(f, "{}:{}", inner.protocol, inner.connection_id)?;
        if inner.peer.is_some() || inner.user.is_some() || inner.tls {
            write!(f, "[")?;
            let mut first = true;
            if let Some(ref peer) = inner.peer {
                write!(f, "{}", peer)?;
                first = false;
            }

            if let Some(ref user) = inner.user {
                if !mem::take(&mut first) {
                    write!(f, " ")?;
                }
                write!(f, "user={}", user)?;
            }

            if inner.tls {
                if !mem::take(&mut first) {
                    write!(f, " ")?;
                }
                write!(f, "tls")?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
