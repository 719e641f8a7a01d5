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

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Tunables for the wire engine.
///
/// This is typically stored in a file named `mapwire.toml`. Every section is
/// optional; missing values take the documented defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WireConfig {
    /// Size limits applied while receiving.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Socket timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// IMAP-specific behaviour.
    #[serde(default)]
    pub imap: ImapConfig,
}

impl WireConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// The maximum length of a single protocol line, including the CRLF.
    ///
    /// Lines longer than this are rejected as malformed and skipped.
    pub max_line_length: usize,

    /// The maximum declared size of a single IMAP literal.
    pub max_literal_length: usize,

    /// How many bytes to request from the socket per read.
    pub read_chunk_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_line_length: 65536,
            max_literal_length: 64 * 1024 * 1024,
            read_chunk_size: 4096,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Socket receive timeout in milliseconds. 0 disables the timeout.
    pub receive_ms: u64,
    /// Socket send timeout in milliseconds. 0 disables the timeout.
    pub send_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            receive_ms: 16000,
            send_ms: 16000,
        }
    }
}

impl TimeoutsConfig {
    pub fn receive(&self) -> Option<Duration> {
        to_duration(self.receive_ms)
    }

    pub fn send(&self) -> Option<Duration> {
        to_duration(self.send_ms)
    }
}

fn to_duration(ms: u64) -> Option<Duration> {
    if 0 == ms {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ImapConfig {
    /// If true, literals in outgoing commands use the non-synchronising
    /// `{n+}` form (RFC 7888) and are sent without waiting for the server.
    ///
    /// Only enable this when the server advertises `LITERAL+`.
    pub literal_plus: bool,

    /// The text a server sends in the continuation request that permits the
    /// client to send a synchronising literal.
    pub continuation_prompt: String,
}

impl Default for ImapConfig {
    fn default() -> Self {
        ImapConfig {
            literal_plus: false,
            continuation_prompt: "Ready for literal data".to_owned(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_partial_config() {
        let config: WireConfig = toml::from_str(
            r#"
[limits]
max_line_length = 1024

[timeouts]
receive_ms = 0

[imap]
literal_plus = true
"#,
        )
        .unwrap();

        assert_eq!(1024, config.limits.max_line_length);
        assert_eq!(64 * 1024 * 1024, config.limits.max_literal_length);
        assert_eq!(None, config.timeouts.receive());
        assert_eq!(Some(Duration::from_secs(16)), config.timeouts.send());
        assert!(config.imap.literal_plus);
        assert_eq!("Ready for literal data", config.imap.continuation_prompt);
    }

    #[test]
    fn empty_config_is_default() {
        let config: WireConfig = toml::from_str("").unwrap();
        assert_eq!(65536, config.limits.max_line_length);
        assert_eq!(16000, config.timeouts.receive_ms);
        assert!(!config.imap.literal_plus);
    }
}
