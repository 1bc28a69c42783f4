use chrono::{DateTime, SecondsFormat, Utc};

pub fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `YYYYMMDD-HHMM` in UTC, used in report filenames.
pub fn filename_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d-%H%M").to_string()
}

pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().max(0) as u64
}

/// `12m5s`, as printed in the report header.
pub fn format_duration_compact(seconds: u64) -> String {
    format!("{}m{}s", seconds / 60, seconds % 60)
}

/// `12m 5s`, as sent with the submission.
pub fn format_duration_spaced(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// `MM:SS` countdown, hours folded into minutes.
pub fn format_countdown(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamps_are_zero_padded() {
        let dt = Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 0).unwrap();
        assert_eq!(filename_stamp(dt), "20250506-0708");
        assert_eq!(to_iso(dt), "2025-05-06T07:08:00Z");
    }

    #[test]
    fn durations_format_minutes_and_seconds() {
        assert_eq!(format_duration_compact(725), "12m5s");
        assert_eq!(format_duration_spaced(725), "12m 5s");
        assert_eq!(format_duration_compact(0), "0m0s");
        assert_eq!(format_countdown(3600), "60:00");
        assert_eq!(format_countdown(61), "01:01");
    }

    #[test]
    fn elapsed_never_negative() {
        let later = Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 5, 6, 7, 0, 0).unwrap();
        assert_eq!(elapsed_seconds(earlier, later), 480);
        assert_eq!(elapsed_seconds(later, earlier), 0);
    }
}
