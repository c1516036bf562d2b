//! Parsing and formatting of human-written durations and times.

use std::sync::LazyLock;

use chrono::DateTime;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::TimeZone;
use chrono::Utc;
use regex::Regex;

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("valid regex")
});
static DURATION_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([dhms])").expect("valid regex"));
static AT_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"at (\d{1,2})(?::(\d{2}))?\s*(am|pm)?").expect("valid regex")
});

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" })
}

fn split_secs(total: i64) -> (i64, i64, i64, i64) {
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    (days, hours, minutes, seconds)
}

/// Renders seconds as `"1 day, 2 hours, 1 minute, 5 seconds"`. Zero parts are omitted.
pub fn format_duration(total_secs: i64) -> String {
    let (days, hours, minutes, seconds) = split_secs(total_secs.max(0));
    let parts: Vec<String> = [
        (days, "day"),
        (hours, "hour"),
        (minutes, "minute"),
        (seconds, "second"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, unit)| plural(n, unit))
    .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

/// Renders the distance to a future instant, e.g. `"in 2 days, 3 hours"`.
///
/// Seconds are only shown when nothing larger is.
pub fn format_time_until(delta: Duration) -> String {
    let total = delta.num_seconds();
    if total < 0 {
        return "in the past".to_string();
    }

    let (days, hours, minutes, seconds) = split_secs(total);
    let mut parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| plural(n, unit))
        .collect();

    if seconds > 0 && parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }

    if parts.is_empty() {
        "now".to_string()
    } else {
        format!("in {}", parts.join(", "))
    }
}

/// Parses `1d12h30m`-style durations into seconds.
///
/// Returns `None` when no `<number><unit>` pair is present or the total does
/// not fit in a [`Duration`].
pub fn parse_duration_spec(input: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut matched = false;
    for cap in DURATION_PART_RE.captures_iter(&input.to_lowercase()) {
        matched = true;
        let value: i64 = cap[1].parse().ok()?;
        let unit = match &cap[2] {
            "d" => 86_400,
            "h" => 3_600,
            "m" => 60,
            _ => 1,
        };
        total = total.checked_add(value.checked_mul(unit)?)?;
    }
    Duration::try_seconds(total)?;
    matched.then_some(total)
}

/// Parses a reminder time relative to `now`.
///
/// Accepts `YYYY-MM-DD HH:MM`, `YYYY-MM-DD`, `HH:MM` (today, or tomorrow if it
/// already passed), relative `1d2h3m4s`, `tomorrow [at H[:MM] [am|pm]]` and
/// `next week`. All wall-clock times are UTC.
pub fn parse_reminder_time(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    let lower = input.to_lowercase();

    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    if let Ok(time) = NaiveTime::parse_from_str(input, "%H:%M") {
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));
        return Some(if today <= now {
            today + Duration::days(1)
        } else {
            today
        });
    }

    if !lower.is_empty()
        && let Some(cap) = RELATIVE_RE.captures(&lower)
    {
        let get = |i: usize| -> Option<i64> {
            cap.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        let delta = Duration::try_days(get(1)?)?
            .checked_add(&Duration::try_hours(get(2)?)?)?
            .checked_add(&Duration::try_minutes(get(3)?)?)?
            .checked_add(&Duration::try_seconds(get(4)?)?)?;
        return now.checked_add_signed(delta);
    }

    if lower.contains("tomorrow") {
        if let Some(cap) = AT_TIME_RE.captures(&lower) {
            let mut hour: u32 = cap[1].parse().ok()?;
            let minute: u32 = cap.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
            match cap.get(3).map(|m| m.as_str()) {
                Some("pm") if hour < 12 => hour += 12,
                Some("am") if hour == 12 => hour = 0,
                _ => {}
            }
            let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
            let date = now.date_naive() + Duration::days(1);
            return Some(Utc.from_utc_datetime(&date.and_time(time)));
        }
        return Some(now + Duration::days(1));
    }

    if lower.contains("next week") {
        return Some(now + Duration::weeks(1));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap())
    }

    #[test]
    fn test_format_duration_pluralizes_and_joins() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(1), "1 second");
        assert_eq!(format_duration(3600), "1 hour");
        assert_eq!(format_duration(90061), "1 day, 1 hour, 1 minute, 1 second");
        assert_eq!(format_duration(7322), "2 hours, 2 minutes, 2 seconds");
    }

    #[test]
    fn test_format_time_until() {
        assert_eq!(format_time_until(Duration::seconds(-5)), "in the past");
        assert_eq!(format_time_until(Duration::seconds(0)), "now");
        assert_eq!(format_time_until(Duration::seconds(45)), "in 45 seconds");
        assert_eq!(format_time_until(Duration::seconds(3661)), "in 1 hour, 1 minute");
        assert_eq!(
            format_time_until(Duration::days(2) + Duration::hours(3)),
            "in 2 days, 3 hours"
        );
    }

    #[test]
    fn test_parse_duration_spec() {
        assert_eq!(parse_duration_spec("1d12h30m"), Some(131_400));
        assert_eq!(parse_duration_spec("45s"), Some(45));
        assert_eq!(parse_duration_spec("2H"), Some(7200));
        assert_eq!(parse_duration_spec("soon"), None);
    }

    #[test]
    fn test_parse_duration_spec_rejects_out_of_range() {
        assert_eq!(parse_duration_spec("99999999999999999s"), None);
        assert_eq!(parse_duration_spec("999999999999999999999d"), None);
        assert_eq!(parse_duration_spec("9223372036854775807s"), None);
    }

    #[test]
    fn test_parse_reminder_time_huge_relative_is_rejected() {
        let now = at("2025-01-01 10:00");
        assert_eq!(parse_reminder_time("100000000d", now), None);
        assert_eq!(parse_reminder_time("999999999999999d", now), None);
        assert_eq!(parse_reminder_time("99999999999999999999h", now), None);
        assert_eq!(parse_reminder_time("9999999999999s", now), None);
    }

    #[test]
    fn test_parse_reminder_time_relative() {
        let now = at("2025-01-01 10:00");
        assert_eq!(parse_reminder_time("1h30m", now), Some(at("2025-01-01 11:30")));
        assert_eq!(parse_reminder_time("2d", now), Some(at("2025-01-03 10:00")));
        assert_eq!(parse_reminder_time("", now), None);
    }

    #[test]
    fn test_parse_reminder_time_absolute() {
        let now = at("2025-01-01 10:00");
        assert_eq!(
            parse_reminder_time("2025-02-03 04:05", now),
            Some(at("2025-02-03 04:05"))
        );
        assert_eq!(parse_reminder_time("2025-02-03", now), Some(at("2025-02-03 00:00")));
        assert_eq!(parse_reminder_time("12:00", now), Some(at("2025-01-01 12:00")));
        // Already passed today
        assert_eq!(parse_reminder_time("09:00", now), Some(at("2025-01-02 09:00")));
    }

    #[test]
    fn test_parse_reminder_time_phrases() {
        let now = at("2025-01-01 10:00");
        assert_eq!(parse_reminder_time("tomorrow", now), Some(at("2025-01-02 10:00")));
        assert_eq!(
            parse_reminder_time("tomorrow at 3pm", now),
            Some(at("2025-01-02 15:00"))
        );
        assert_eq!(
            parse_reminder_time("tomorrow at 12:30 am", now),
            Some(at("2025-01-02 00:30"))
        );
        assert_eq!(parse_reminder_time("next week", now), Some(at("2025-01-08 10:00")));
        assert_eq!(parse_reminder_time("whenever", now), None);
    }
}
