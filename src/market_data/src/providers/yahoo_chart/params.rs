use chrono::{DateTime, Duration, Utc};

/// Bar interval requested from the chart endpoint.
pub const DAILY_INTERVAL: &str = "1d";

/// Builds the query string for a daily chart request covering
/// `[now - lookback_days, now]`.
pub fn construct_params(lookback_days: u32, now: DateTime<Utc>) -> Vec<(String, String)> {
    let start = now - Duration::days(i64::from(lookback_days));
    vec![
        ("period1".to_string(), start.timestamp().to_string()),
        ("period2".to_string(), now.timestamp().to_string()),
        ("interval".to_string(), DAILY_INTERVAL.to_string()),
        ("includePrePost".to_string(), "false".to_string()),
        ("events".to_string(), "div,splits".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn period_spans_lookback() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 9, 0, 0).unwrap();
        let params = construct_params(365, now);
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        let p1: i64 = get("period1").parse().unwrap();
        let p2: i64 = get("period2").parse().unwrap();
        assert_eq!(p2 - p1, 365 * 86_400);
        assert_eq!(get("interval"), "1d");
    }
}
