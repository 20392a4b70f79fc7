//! Date-time normalization for tool parameters

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Wire format expected by the booking API
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Human formats accepted in tool arguments, tried in order
const HUMAN_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Normalize a user-supplied date-time to `YYYY-MM-DDTHH:MM:SS.000Z`.
///
/// Input that already looks like an ISO timestamp is passed through
/// unchanged, as is anything no known format matches; the server gets the
/// final say on it.
pub fn normalize_datetime(input: &str) -> String {
    if input.contains('T') && input.len() >= 16 {
        return input.to_string();
    }

    let trimmed = input.trim();
    for format in HUMAN_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return dt.format(WIRE_FORMAT).to_string();
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return midnight.format(WIRE_FORMAT).to_string();
    }

    input.to_string()
}

/// Render an ISO timestamp as `YYYY-MM-DD HH:MM` for display.
/// Falls back to the raw string.
pub fn display_datetime(iso: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    iso.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_formats() {
        assert_eq!(normalize_datetime("2025-06-01 09:00"), "2025-06-01T09:00:00.000Z");
        assert_eq!(normalize_datetime("2025-06-01 09:00:30"), "2025-06-01T09:00:30.000Z");
        assert_eq!(normalize_datetime("2025/06/01 09:00"), "2025-06-01T09:00:00.000Z");
        assert_eq!(normalize_datetime("01-06-2025 09:00"), "2025-06-01T09:00:00.000Z");
        assert_eq!(normalize_datetime("01/06/2025 17:45"), "2025-06-01T17:45:00.000Z");
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(normalize_datetime("2025-06-01"), "2025-06-01T00:00:00.000Z");
    }

    #[test]
    fn test_iso_passes_through() {
        assert_eq!(normalize_datetime("2025-06-01T09:00:00.000Z"), "2025-06-01T09:00:00.000Z");
        assert_eq!(normalize_datetime("2025-06-01T09:00+02:00"), "2025-06-01T09:00+02:00");
    }

    #[test]
    fn test_unmatched_passes_through() {
        assert_eq!(normalize_datetime("tomorrow morning"), "tomorrow morning");
        assert_eq!(normalize_datetime(""), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(display_datetime("2025-06-01T09:00:00.000Z"), "2025-06-01 09:00");
        assert_eq!(display_datetime("2025-06-01T09:00:00+02:00"), "2025-06-01 09:00");
        assert_eq!(display_datetime("2025-06-01T09:00:00"), "2025-06-01 09:00");
        assert_eq!(display_datetime("not a date"), "not a date");
    }
}
