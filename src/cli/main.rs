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

use std::path::PathBuf;

use structopt::StructOpt;

use crate::pop3::apop;
use crate::support::sysexits::*;
use crate::support::system_config::WireConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// Read wire tunables (limits, timeouts, IMAP options) from this TOML
    /// file.
    #[structopt(long, parse(from_os_str), global = true)]
    config: Option<PathBuf>,

    /// Configure logging with this log4rs TOML file instead of logging to
    /// standard error.
    #[structopt(long, parse(from_os_str), global = true)]
    log_config: Option<PathBuf>,

    /// Log protocol traffic to standard error.
    #[structopt(short, long, global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Compute the digest for POP3 APOP authentication.
    ///
    /// The timestamp is the `<...>` string from the server greeting,
    /// including the angle brackets.
    Apop(ApopSubcommand),
    /// Connect to a server, print its capabilities and log out.
    Probe(ProbeSubcommand),
}

#[derive(StructOpt)]
struct ApopSubcommand {
    timestamp: String,
    secret: String,
}

#[derive(StructOpt)]
pub(super) enum ProbeSubcommand {
    /// Probe an IMAP4rev1 server.
    Imap(ProbeOptions),
    /// Probe a POP3 server.
    Pop3(ProbeOptions),
}

#[derive(StructOpt)]
pub(super) struct ProbeOptions {
    /// The host to connect to.
    #[structopt(long)]
    pub(super) host: String,

    /// The port to connect to.
    /// [default: 143/993 for IMAP, 110/995 for POP3]
    #[structopt(long)]
    pub(super) port: Option<u16>,

    /// Start TLS immediately after connecting.
    #[structopt(long, conflicts_with = "starttls")]
    pub(super) tls: bool,

    /// Upgrade to TLS with STARTTLS or STLS after the greeting.
    #[structopt(long)]
    pub(super) starttls: bool,

    /// Don't validate the server's TLS certificate.
    #[structopt(long)]
    pub(super) allow_insecure_tls_connections: bool,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options =
        Options::from_clap(&match Options::clap().get_matches_safe() {
            Ok(matches) => matches,
            Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::HelpDisplayed,
                    ..
                },
            )
            | Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::VersionDisplayed,
                    ..
                },
            ) => {
                println!("{}", e.message);
                return;
            }
            Err(e) => die!(EX_USAGE, "{}", e.message),
        });

    init_logging(&options);

    let config = match options.config {
        None => WireConfig::default(),
        Some(ref path) => match WireConfig::load(path) {
            Ok(config) => config,
            Err(e) => die!(
                EX_CONFIG,
                "Error in config file at '{}': {}",
                path.display(),
                e
            ),
        },
    };

    match options.command {
        Command::Apop(cmd) => {
            match apop::digest(cmd.timestamp.as_bytes(), cmd.secret.as_bytes())
            {
                Ok(digest) => println!("{}", digest),
                Err(e) => die!(EX_SOFTWARE, "Error: {}", e),
            }
        }
        Command::Probe(cmd) => super::probe::main(cmd, config),
    }
}

fn init_logging(options: &Options) {
    if let Some(ref path) = options.log_config {
        if let Err(e) =
            log4rs::init_file(path, log4rs::file::Deserializers::new())
        {
            die!(
                EX_CONFIG,
                "Failed to load logging configuration from '{}': {}",
                path.display(),
                e
            );
        }
    } else if options.verbose {
        crate::init_simple_log(log::LevelFilter::Trace);
    } else {
        crate::init_simple_log(log::LevelFilter::Warn);
    }
}
