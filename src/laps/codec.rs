use log::debug;
use snafu::Snafu;

/// Why a lap time string could not be read.
#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum LapTimeError {
    #[snafu(display("empty lap time"))]
    Empty,
    #[snafu(display("'{text}' has more than one ':' separator"))]
    TooManySeparators { text: String },
    #[snafu(display("'{text}' has unreadable minutes"))]
    BadMinutes { text: String },
    #[snafu(display("'{text}' has unreadable seconds"))]
    BadSeconds { text: String },
    #[snafu(display("'{text}' is not a finite time"))]
    NotFinite { text: String },
}

/// Parse `"M:SS.mmm"` or a bare number of seconds.
pub fn try_parse_lap_time(text: &str) -> Result<f64, LapTimeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LapTimeError::Empty);
    }

    let seconds = match trimmed.split_once(':') {
        Some((_, rest)) if rest.contains(':') => {
            return Err(LapTimeError::TooManySeparators {
                text: trimmed.to_string(),
            });
        }
        Some((minutes, seconds)) => {
            let minutes = minutes
                .trim()
                .parse::<i64>()
                .map_err(|_| LapTimeError::BadMinutes {
                    text: trimmed.to_string(),
                })?;
            let seconds = seconds
                .trim()
                .parse::<f64>()
                .map_err(|_| LapTimeError::BadSeconds {
                    text: trimmed.to_string(),
                })?;
            minutes as f64 * 60. + seconds
        }
        None => trimmed
            .parse::<f64>()
            .map_err(|_| LapTimeError::BadSeconds {
                text: trimmed.to_string(),
            })?,
    };

    if !seconds.is_finite() {
        return Err(LapTimeError::NotFinite {
            text: trimmed.to_string(),
        });
    }
    Ok(seconds)
}

/// Parse a lap time, collapsing any failure to the `0.0` sentinel.
///
/// Callers must treat anything `<= 0` as "no lap", see [`is_valid_lap_time`].
pub fn parse_lap_time(text: &str) -> f64 {
    match try_parse_lap_time(text) {
        Ok(seconds) => seconds,
        Err(e) => {
            debug!("Unparsable lap time, using sentinel 0: {}", e);
            0.
        }
    }
}

/// Whether a parsed lap time is a real lap rather than the sentinel.
pub fn is_valid_lap_time(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.
}

/// Format seconds as `"M:SS.mmm"`.
pub fn format_lap_time(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() {
        (seconds.max(0.) * 1000.).round() as u64
    } else {
        0
    };
    let minutes = total_ms / 60_000;
    let rem_ms = total_ms % 60_000;
    format!("{}:{:02}.{:03}", minutes, rem_ms / 1000, rem_ms % 1000)
}
