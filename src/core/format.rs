//! Solve Time Formatting

use std::time::Duration;

/// Format a time in milliseconds for display.
///
/// Non-finite and negative inputs render as zero. The value is rounded to the
/// nearest centisecond before being split into minutes, seconds and
/// centiseconds, so `999` shows as `1.00`.
///
/// ```
/// use speedcube::core::format::format_time;
///
/// assert_eq!(format_time(0.0), "0.00");
/// assert_eq!(format_time(999.0), "1.00");
/// assert_eq!(format_time(65_432.0), "1:05.43");
/// ```
pub fn format_time(ms: f64) -> String {
    let ms = if ms.is_finite() && ms > 0.0 { ms } else { 0.0 };
    let total_centis = (ms / 10.0).round() as u64;

    let centis = total_centis % 100;
    let total_seconds = total_centis / 100;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{minutes}:{seconds:02}.{centis:02}")
    } else {
        format!("{seconds}.{centis:02}")
    }
}

/// Format an integer millisecond count.
pub fn format_millis(ms: u64) -> String {
    format_time(ms as f64)
}

/// Format a [`Duration`].
pub fn format_duration(duration: Duration) -> String {
    format_time(duration.as_secs_f64() * 1_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_values() {
        assert_eq!(format_time(0.0), "0.00");
        assert_eq!(format_time(999.0), "1.00");
        assert_eq!(format_time(65_432.0), "1:05.43");
    }

    #[test]
    fn test_centiseconds_round_not_truncate() {
        assert_eq!(format_time(1_234.0), "1.23");
        assert_eq!(format_time(1_235.0), "1.24");
        assert_eq!(format_time(4.0), "0.00");
        assert_eq!(format_time(5.0), "0.01");
    }

    #[test]
    fn test_minute_boundary() {
        assert_eq!(format_time(59_994.0), "59.99");
        assert_eq!(format_time(59_995.0), "1:00.00");
        assert_eq!(format_time(600_000.0), "10:00.00");
    }

    #[test]
    fn test_invalid_input_clamps_to_zero() {
        assert_eq!(format_time(-1.0), "0.00");
        assert_eq!(format_time(f64::NAN), "0.00");
        assert_eq!(format_time(f64::INFINITY), "0.00");
        assert_eq!(format_time(f64::NEG_INFINITY), "0.00");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(format_millis(12_340), "12.34");
        assert_eq!(format_duration(Duration::from_millis(83_070)), "1:23.07");
    }
}
