//! Track time helpers.
//!
//! Two normalisations coexist: the daemon backend forwards colon times with
//! `:` replaced by `.` (the form the UI has always sent), while the engine
//! backend needs real decimal seconds to compute milliseconds.

use crate::errors::PlayerError;

/// Replaces every `:` by `.`; other inputs are returned unchanged.
///
/// # Examples
/// ```
/// # use tapplayer::time_utils::normalize_seek_time;
/// assert_eq!(normalize_seek_time("1:02:03"), "1.02.03");
/// assert_eq!(normalize_seek_time("45"), "45");
/// ```
pub fn normalize_seek_time(input: &str) -> String {
    input.trim().replace(':', ".")
}

/// Start offset of a request, `"0"` when absent.
pub fn request_track_time(track_time: Option<&str>) -> String {
    match track_time {
        Some(t) if !t.trim().is_empty() => normalize_seek_time(t),
        _ => "0".to_string(),
    }
}

/// True for `"0"`, `"0.0"` and other spellings of zero.
pub fn is_zero_time(value: &str) -> bool {
    match value.trim().parse::<f64>() {
        Ok(v) => v == 0.0,
        Err(_) => value.trim().is_empty(),
    }
}

/// Converts `H:M:S`, `M:S` or decimal seconds into decimal seconds.
///
/// # Examples
/// ```
/// # use tapplayer::time_utils::to_decimal_seconds;
/// assert_eq!(to_decimal_seconds("1:02:03").unwrap(), 3723.0);
/// assert_eq!(to_decimal_seconds("2:03.5").unwrap(), 123.5);
/// assert_eq!(to_decimal_seconds("42.25").unwrap(), 42.25);
/// ```
pub fn to_decimal_seconds(input: &str) -> Result<f64, PlayerError> {
    let input = input.trim();
    let parts: Vec<&str> = input.split(':').collect();

    if parts.is_empty() || parts.len() > 3 {
        return Err(PlayerError::InvalidTimeFormat(format!(
            "Invalid time format '{}': expected H:M:S, M:S or seconds",
            input
        )));
    }

    let mut total = 0.0f64;
    for part in parts {
        let value = part.parse::<f64>().map_err(|_| {
            PlayerError::InvalidTimeFormat(format!(
                "Invalid numeric value '{}' in time string '{}'",
                part, input
            ))
        })?;
        if value < 0.0 {
            return Err(PlayerError::InvalidTimeFormat(format!(
                "Negative component in time string '{}'",
                input
            )));
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Renders seconds without a trailing `.0` for whole values.
pub fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{}", seconds as i64)
    } else {
        format!("{}", seconds)
    }
}

#[inline]
pub fn seconds_to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

#[inline]
pub fn ms_to_seconds(milliseconds: i64) -> f64 {
    milliseconds as f64 / 1000.0
}
