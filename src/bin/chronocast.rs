use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    process::ExitCode,
};

use clap::{Parser, error::ErrorKind};
use env_logger::Env;
use log::warn;

use chronocast::{
    Cli, Mode, TimeReceiver, TimeServer,
    protocol::{Event, Outcome},
};

fn main() -> ExitCode {
    // Initialize env_logger; defaults to `info` unless RUST_LOG says otherwise
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mode = match Mode::try_from(cli) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match mode {
        Mode::Server { port } => serve(port),
        Mode::Client { host, port } => receive(&host, port),
    }
}

fn serve(port: u16) -> ExitCode {
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let server = match TimeServer::bind(address) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.listen() {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn receive(host: &str, port: u16) -> ExitCode {
    let receiver = match TimeReceiver::connect(host, port) {
        Ok(receiver) => receiver,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("connected to {host}:{port}");
    println!("receiving timestamps... (press Ctrl+C to stop)");

    let events = receiver.events();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = events.send(Event::Interrupted);
    }) {
        warn!("interrupt handler unavailable: {e}");
    }

    match receiver.run(io::stdout().lock()) {
        Ok(Outcome::ReadFailed(e)) => eprintln!("failed to receive data: {e}"),
        Ok(_) => {}
        Err(e) => eprintln!("error: {e}"),
    }
    ExitCode::SUCCESS
}
