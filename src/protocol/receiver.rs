use std::{
    io::{self, Write},
    net::{Shutdown, TcpStream},
    sync::mpsc::{self, Receiver as Queue, Sender},
    thread::{self, JoinHandle},
};

use log::debug;

use super::{ReceiverError, transport::LineTransport};

/// Everything the receive loop can react to, merged into one queue.
#[derive(Debug)]
pub enum Event {
    /// A complete line from the server, terminator stripped.
    Line(String),
    /// The server closed the connection cleanly.
    Closed,
    /// Reading from the connection failed.
    Failed(io::Error),
    /// The user asked to stop.
    Interrupted,
}

/// Why [`TimeReceiver::run`] returned.
#[derive(Debug)]
pub enum Outcome {
    ServerClosed,
    Interrupted,
    ReadFailed(io::Error),
}

pub const SERVER_CLOSED: &str = "server closed";
pub const INTERRUPTED: &str = "interrupted, closing connection...";

/// Client side of a connection to a time server.
pub struct TimeReceiver {
    stream: TcpStream,
    sender: Sender<Event>,
    events: Queue<Event>,
}

impl TimeReceiver {
    pub fn connect(host: &str, port: u16) -> Result<Self, ReceiverError> {
        let address = format!("{host}:{port}");
        let stream = TcpStream::connect(&address)
            .map_err(|source| ReceiverError::Connect { address, source })?;

        let (sender, events) = mpsc::channel();
        Ok(Self {
            stream,
            sender,
            events,
        })
    }

    /// Handle for pushing events into the receive loop, e.g. from a signal handler.
    pub fn events(&self) -> Sender<Event> {
        self.sender.clone()
    }

    /// Print every received line to `out` until the server closes the connection,
    /// a read fails, or an [`Event::Interrupted`] arrives; whichever happens first.
    ///
    /// The connection is shut down and dropped on every return path.
    pub fn run<W: Write>(self, mut out: W) -> Result<Outcome, ReceiverError> {
        let Self {
            stream,
            sender,
            events,
        } = self;

        let reader = spawn_reader(stream.try_clone()?, sender)?;
        let outcome = dispatch(&events, &mut out);

        if let Err(e) = stream.shutdown(Shutdown::Both) {
            debug!("shutdown after {outcome:?}: {e}");
        }
        drop(stream);
        if reader.join().is_err() {
            debug!("reader thread panicked");
        }

        outcome
    }
}

fn dispatch<W: Write>(events: &Queue<Event>, out: &mut W) -> Result<Outcome, ReceiverError> {
    loop {
        // The reader always queues a terminal event before it hangs up.
        let Ok(event) = events.recv() else {
            return Ok(Outcome::ServerClosed);
        };

        match event {
            Event::Line(line) => {
                writeln!(out, "{line}")?;
                out.flush()?;
            }
            Event::Closed => {
                writeln!(out, "{SERVER_CLOSED}")?;
                return Ok(Outcome::ServerClosed);
            }
            Event::Failed(e) => return Ok(Outcome::ReadFailed(e)),
            Event::Interrupted => {
                writeln!(out, "\n{INTERRUPTED}")?;
                return Ok(Outcome::Interrupted);
            }
        }
    }
}

/// Forward every line as an [`Event`], ending with exactly one terminal event.
fn spawn_reader(stream: TcpStream, sender: Sender<Event>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("reader".into())
        .spawn(move || {
            let mut lines = LineTransport::new(stream).lines();
            loop {
                let (event, terminal) = match lines.next() {
                    Some(Ok(line)) => (Event::Line(line), false),
                    Some(Err(e)) => (Event::Failed(e), true),
                    None => (Event::Closed, true),
                };

                // `run` holds the queue until this thread is joined, so a failed send
                // only happens once the receive loop has already returned.
                if let Err(e) = sender.send(event) {
                    debug!("receive loop stopped, dropping {:?}", e.0);
                    return;
                }
                if terminal {
                    return;
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use std::{
        net::{Ipv4Addr, SocketAddr, TcpListener},
        sync::mpsc::channel,
        time::Duration,
    };

    use super::*;

    /// Server that writes `lines` to its first client, then waits for `close` before
    /// hanging up.
    fn scripted_server(lines: &'static [&'static str]) -> (SocketAddr, Sender<()>) {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let address = listener.local_addr().unwrap();
        let (close, closed) = channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut transport = LineTransport::new(stream);
            for line in lines {
                transport.write_line(line).unwrap();
            }
            let _ = closed.recv();
        });

        (address, close)
    }

    #[test]
    fn prints_lines_until_server_closes() {
        let (address, close) = scripted_server(&["2006-01-02T15:04:05Z", "2006-01-02T15:04:06Z"]);
        let receiver = TimeReceiver::connect("127.0.0.1", address.port()).unwrap();
        close.send(()).unwrap();

        let mut out = Vec::new();
        let outcome = receiver.run(&mut out).unwrap();

        assert!(matches!(outcome, Outcome::ServerClosed));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2006-01-02T15:04:05Z\n2006-01-02T15:04:06Z\nserver closed\n"
        );
    }

    #[test]
    fn interrupt_stops_an_open_stream() {
        let (address, _close) = scripted_server(&["2006-01-02T15:04:05Z"]);
        let receiver = TimeReceiver::connect("127.0.0.1", address.port()).unwrap();
        let events = receiver.events();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            events.send(Event::Interrupted).unwrap();
        });

        let mut out = Vec::new();
        let outcome = receiver.run(&mut out).unwrap();

        assert!(matches!(outcome, Outcome::Interrupted));
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("2006-01-02T15:04:05Z\n"));
        assert!(out.ends_with(&format!("{INTERRUPTED}\n")));
        assert!(!out.contains(SERVER_CLOSED));
    }

    #[test]
    fn read_failure_is_reported() {
        let (sender, events) = channel();
        sender.send(Event::Line("a".into())).unwrap();
        sender
            .send(Event::Failed(io::Error::from(io::ErrorKind::ConnectionReset)))
            .unwrap();
        sender.send(Event::Line("never printed".into())).unwrap();

        let mut out = Vec::new();
        let outcome = dispatch(&events, &mut out).unwrap();

        match outcome {
            Outcome::ReadFailed(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(out, b"a\n");
    }

    #[test]
    fn connect_fails_without_server() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        match TimeReceiver::connect("127.0.0.1", port) {
            Err(ReceiverError::Connect { address, .. }) => {
                assert_eq!(address, format!("127.0.0.1:{port}"))
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("connect should fail with nothing listening"),
        }
    }

    #[test]
    fn receives_from_a_time_server() {
        use crate::{protocol::TimeServer, timestamp};

        let server = TimeServer::bind((Ipv4Addr::LOCALHOST, 0).into())
            .unwrap()
            .with_interval(Duration::from_millis(50));
        let port = server.local_addr().unwrap().port();
        thread::spawn(move || server.listen().unwrap());

        let receiver = TimeReceiver::connect("127.0.0.1", port).unwrap();
        let events = receiver.events();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            events.send(Event::Interrupted).unwrap();
        });

        let mut out = Vec::new();
        let outcome = receiver.run(&mut out).unwrap();

        assert!(matches!(outcome, Outcome::Interrupted));
        let out = String::from_utf8(out).unwrap();
        let stamps = out
            .lines()
            .take_while(|line| !line.is_empty())
            .map(|line| timestamp::parse(line).unwrap())
            .collect::<Vec<_>>();
        assert!(!stamps.is_empty());
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn reader_ends_with_one_terminal_event() {
        let (address, close) = scripted_server(&["2006-01-02T15:04:05Z"]);
        let stream = TcpStream::connect(address).unwrap();
        close.send(()).unwrap();

        let (sender, events) = channel();
        let reader = spawn_reader(stream, sender).unwrap();
        reader.join().unwrap();

        let received = events.iter().collect::<Vec<Event>>();
        assert_eq!(received.len(), 2);
        assert!(matches!(&received[0], Event::Line(line) if line == "2006-01-02T15:04:05Z"));
        assert!(matches!(received[1], Event::Closed));
    }

    #[test]
    fn reader_exits_once_the_loop_is_gone() {
        let (address, close) = scripted_server(&["2006-01-02T15:04:05Z", "2006-01-02T15:04:06Z"]);
        let stream = TcpStream::connect(address).unwrap();

        let (sender, events) = channel();
        drop(events);
        let reader = spawn_reader(stream, sender).unwrap();

        reader.join().unwrap();
        drop(close);
    }
}
