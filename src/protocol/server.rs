use std::{
    io::{self, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
    time::{Duration, Instant},
};

use log::{info, trace, warn};

use super::{ServerError, transport::LineTransport};

pub const DEFAULT_PORT: u16 = 8080;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Accepts clients and streams the current time to each of them.
pub struct TimeServer {
    listener: TcpListener,
    interval: Duration,
}

impl TimeServer {
    pub fn bind(address: SocketAddr) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(address).map_err(|source| ServerError::Bind { address, source })?;

        Ok(Self {
            listener,
            interval: TICK_INTERVAL,
        })
    }

    /// Override the delay between two timestamps on a connection.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one handler thread per client.
    ///
    /// Accept failures are logged and skipped; they never stop the loop.
    pub fn listen(self) -> Result<(), ServerError> {
        info!("listening on port {}", self.local_addr()?.port());
        info!("waiting for clients...");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_handler(stream),
                Err(e) => warn!("failed to accept connection: {e}"),
            }
        }
        Ok(())
    }

    fn spawn_handler(&self, stream: TcpStream) {
        let peer = peer_label(stream.peer_addr());
        info!("client connected: {peer}");

        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name(format!("handler-{peer}"))
            .spawn({
                let peer = peer.clone();
                move || {
                    handle_connection(stream, &peer, interval);
                }
            });

        if let Err(e) = spawned {
            warn!("failed to start handler for {peer}: {e}");
        }
    }
}

/// Display name for a client; the connection is served even when its address is unknown.
fn peer_label(peer: io::Result<SocketAddr>) -> String {
    match peer {
        Ok(peer) => peer.to_string(),
        Err(e) => {
            warn!("peer address unavailable: {e}");
            String::from("unknown peer")
        }
    }
}

/// Stream to one client until a send fails, returning the cause.
fn handle_connection(stream: TcpStream, peer: &str, interval: Duration) -> io::Error {
    let mut transport = LineTransport::new(stream);

    let cause = broadcast(&mut transport, interval);

    drop(transport);
    info!("client disconnected: {peer} ({cause})");
    cause
}

/// Write one timestamp per `interval` until a write fails, returning that failure.
///
/// Ticks are scheduled from the moment this is called, so the first line arrives
/// one interval after the connection was accepted.
pub fn broadcast<W: Write>(transport: &mut LineTransport<W>, interval: Duration) -> io::Error {
    let mut deadline = Instant::now() + interval;

    loop {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }

        if let Err(e) = transport.write_timestamp() {
            return e;
        }
        trace!("tick sent");

        deadline += interval;
        // A stalled peer must not cause a burst of catch-up ticks.
        let now = Instant::now();
        if deadline < now {
            deadline = now + interval;
        }
    }
}
