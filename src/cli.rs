//! Command-line surface for chronocast.
//!
//! Two shapes are accepted:
//!
//! - `chronocast [port]` runs a server on `port` (8080 when omitted).
//! - `chronocast -c <host> <port>` connects to a server and prints what it sends.
//!
//! Parsing is split in two: clap collects the flag and raw positionals into [`Cli`],
//! then [`Mode::try_from`] checks their count and ranges.
use clap::Parser;
use thiserror::Error;

use crate::protocol::DEFAULT_PORT;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("usage: chronocast [port] | chronocast -c <host> <port>")]
    Usage,

    #[error("invalid port '{0}', port must be an integer between 1 and 65535")]
    InvalidPort(String),
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Connect to a server instead of running one
    #[arg(short = 'c', long = "client")]
    pub client: bool,

    /// Server: [port]. Client: <host> <port>
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Validated role for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Server { port: u16 },
    Client { host: String, port: u16 },
}

impl TryFrom<Cli> for Mode {
    type Error = CliError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        match (cli.client, cli.args.as_slice()) {
            (false, []) => Ok(Mode::Server { port: DEFAULT_PORT }),
            (false, [port]) => Ok(Mode::Server {
                port: parse_port(port)?,
            }),
            (true, [host, port]) => Ok(Mode::Client {
                host: host.clone(),
                port: parse_port(port)?,
            }),
            _ => Err(CliError::Usage),
        }
    }
}

fn parse_port(s: &str) -> Result<u16, CliError> {
    match s.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(CliError::InvalidPort(s.to_string())),
    }
}
