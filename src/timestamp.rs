//! Wire timestamp format.
//!
//! Every line a server writes is a single RFC 3339 date-time in the server's local
//! time zone, truncated to whole seconds and carrying its UTC offset (`Z` when the
//! offset is zero).
//!
//! # Example
//! ```rust
//! use chronocast::timestamp;
//!
//! let now = timestamp::now();
//! assert!(timestamp::parse(&now).is_ok());
//! ```
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, TimeZone};

/// Current local time, formatted for the wire.
pub fn now() -> String {
    format(&Local::now())
}

/// Format any zoned date-time for the wire.
pub fn format<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a received line back into a date-time, keeping the sender's offset.
pub fn parse(line: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(line.trim_end())
}
