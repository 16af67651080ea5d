//! A collection of utility functions
use std::fmt::Write;
use std::time::SystemTime;

use chrono::DateTime;
use chrono::Local;
use chrono::SubsecRound;
use chrono::Utc;

use crate::config::TimeZoneChoice;
use crate::errors::Error;

/// Formats a `SystemTime` truncated to millisecond precision.
///
/// `format` is a chrono `strftime` pattern, for example
/// `"%D %T%.3f %Z"` renders "01/26/18 18:30:09.453 UTC".
pub fn format_system_time(
    time: SystemTime,
    format: &str,
    zone: TimeZoneChoice,
) -> Result<String, Error> {
    let datetime: DateTime<Utc> = DateTime::<Utc>::from(time).trunc_subsecs(3);
    let mut out = String::new();
    let written = match zone {
        TimeZoneChoice::Utc => write!(out, "{}", datetime.format(format)),
        TimeZoneChoice::Local => write!(out, "{}", datetime.with_timezone(&Local).format(format)),
    };
    // An invalid pattern surfaces as fmt::Error here; `to_string` would panic.
    written.map_err(|_| Error::InvalidArgument(format!("Invalid time format: {format}")))?;
    Ok(out)
}
