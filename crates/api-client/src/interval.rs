use chrono::Duration;

/// Parses a kline interval such as `"15m"`, `"4h"`, `"1d"` or `"1w"`.
pub fn interval_duration(interval: &str) -> Option<Duration> {
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().ok().filter(|n| *n > 0)?;
    match unit {
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "w" => Some(Duration::weeks(count)),
        _ => None,
    }
}
