//! crates/tasktime_core/src/duration.rs
//!
//! Pure formatting of second counts for live timer displays.
//! Negative inputs are clamped to zero before formatting.

use crate::ports::PortError;

/// Formats seconds as `H:MM:SS`, or `M:SS` when the hour count is zero.
pub fn format_clock(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Formats seconds as `Xh Ym Zs`, dropping zero-valued leading units.
///
/// Always emits at least the seconds unit, so zero formats as `"0s"`.
pub fn format_human(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Parses the output of [`format_clock`] back into seconds.
pub fn parse_clock(text: &str) -> Result<i64, PortError> {
    let invalid = || PortError::Invalid(format!("'{}' is not a clock value", text));

    let parts = text
        .split(':')
        .map(|p| p.parse::<i64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let (hours, minutes, secs) = match parts.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };
    if hours < 0 || minutes < 0 || !(0..60).contains(&secs) || (parts.len() == 3 && minutes >= 60) {
        return Err(invalid());
    }
    Ok(hours * 3600 + minutes * 60 + secs)
}
