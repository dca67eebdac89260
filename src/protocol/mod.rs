//! Client-server time streaming protocol.
//!
//! This module holds both ends of a chronocast connection: the [`TimeServer`] that
//! accepts clients and the [`TimeReceiver`] that reads from one.
//!
//! # Overview
//!
//! A server binds a TCP port and accepts connections indefinitely. Each accepted
//! connection is owned by its own handler thread, which writes the current time once
//! per interval until a write fails. Handlers share nothing; one client going away
//! never affects another.
//!
//! A receiver dials a server and runs two threads: a reader that turns the socket into
//! [`Event`]s, and the caller's thread, which waits on a single event queue and
//! prints each line. Anything else that should stop the receiver, such as a ctrl-c
//! handler, pushes into the same queue through [`TimeReceiver::events`].
//!
//! # Wire Format
//!
//! Plain text. One RFC 3339 timestamp per line, terminated by `\n`:
//!
//! ```text
//! 2006-01-02T15:04:05+07:00
//! 2006-01-02T15:04:06+07:00
//! ```
//!
//! There is no handshake, framing header or message from client to server.
//!
//! # See Also
//!
//! - [`timestamp`](crate::timestamp): formatting of a single line.
use std::{io, net::SocketAddr};

use thiserror::Error;

mod receiver;
mod server;
mod transport;

pub use receiver::{Event, INTERRUPTED, Outcome, SERVER_CLOSED, TimeReceiver};
pub use server::{DEFAULT_PORT, TICK_INTERVAL, TimeServer, broadcast};
pub use transport::{LineTransport, Lines};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: io::Error,
    },
    #[error("server IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("failed to connect to {address}: {source}")]
    Connect { address: String, source: io::Error },
    #[error("receiver IO error: {0}")]
    Io(#[from] io::Error),
}
