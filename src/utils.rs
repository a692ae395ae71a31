use chrono::{DateTime, Utc};
use serenity::all::ChannelId;
use serenity::prelude::Mentionable;

/// Discord epoch (2015-01-01T00:00:00Z) in unix milliseconds.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/* SQLite stores snowflakes as signed 64-bit integers */
pub fn to_db_id(id: u64) -> i64 { id as i64 }

pub fn from_db_id(id: i64) -> u64 { id as u64 }

/// Smallest snowflake that could have been minted at `at`.
/// Anything before the Discord epoch maps to 0.
pub fn snowflake_at(at: DateTime<Utc>) -> u64 {
    let ms = at.timestamp_millis() - DISCORD_EPOCH_MS;
    if ms <= 0 {
        return 0;
    }
    (ms as u64) << 22
}

/// Creation time encoded in a snowflake.
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    let ms = (id >> 22) as i64 + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub fn mention_channel(id: u64) -> String {
    ChannelId::new(id).mention().to_string()
}

/* custom_id formats used: "qs:ch:<page>" */
pub fn parse_component_id(s: &str) -> Option<(&str, usize)> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        ["qs", "ch", page] => page.parse().ok().map(|p| ("qs:ch", p)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snowflake_round_trips_to_the_millisecond() {
        let at = Utc.with_ymd_and_hms(2021, 6, 1, 12, 30, 0).unwrap();
        let id = snowflake_at(at);
        assert_eq!(snowflake_time(id), at);
        // the low 22 bits (worker/process/increment) are zero
        assert_eq!(id & ((1 << 22) - 1), 0);
    }

    #[test]
    fn pre_epoch_dates_clamp_to_zero() {
        let at = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(snowflake_at(at), 0);
    }

    #[test]
    fn db_ids_survive_the_sign_cast() {
        let big = u64::MAX - 5;
        assert_eq!(from_db_id(to_db_id(big)), big);
    }

    #[test]
    fn component_ids() {
        assert_eq!(parse_component_id("qs:ch:3"), Some(("qs:ch", 3)));
        assert_eq!(parse_component_id("qs:ch:x"), None);
        assert_eq!(parse_component_id("r:j:m:abc"), None);
    }

    #[test]
    fn channel_mention() {
        assert_eq!(mention_channel(381880193700069377), "<#381880193700069377>");
    }
}
