use chrono::{Local, TimeZone, Utc};

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a millisecond timestamp as local `HH:MM:SS.mmm`
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%H:%M:%S%.3f").to_string(),
        None => format!("Invalid timestamp: {}", timestamp_ms),
    }
}

/// Human readable session name, e.g. `Session 2024-05-01 14:03:22`
pub fn session_name(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => format!("Session {}", time.format("%Y-%m-%d %H:%M:%S")),
        None => format!("Session {}", timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_timestamp_keeps_milliseconds() {
        let formatted = format_timestamp(1_700_000_000_123);
        assert!(formatted.ends_with(".123"), "{}", formatted);
        assert_eq!(formatted.len(), "HH:MM:SS.mmm".len());
    }

    #[test]
    fn session_name_has_prefix() {
        assert!(session_name(1_700_000_000_000).starts_with("Session "));
    }
}
