pub mod cli;
pub mod protocol;
pub mod timestamp;

pub use cli::{Cli, CliError, Mode};
pub use protocol::{TimeReceiver, TimeServer};
