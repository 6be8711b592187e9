//! Trigger expressions: 6/7-field cron (with seconds) or `@every <n><unit>`
//! intervals.

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum Trigger {
    Cron(Box<Schedule>),
    Every(Duration),
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(interval) = s.strip_prefix("@every") {
            return parse_interval(interval.trim()).map(Trigger::Every);
        }
        Schedule::from_str(s)
            .map(|schedule| Trigger::Cron(Box::new(schedule)))
            .map_err(|e| format!("invalid cron expression '{}': {}", s, e))
    }
}

impl Trigger {
    /// Next occurrence strictly after `after`. Interval triggers are
    /// anchored to `after` itself, which is what lets the daemon schedule
    /// relative to fire time rather than completion time.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron(schedule) => schedule.after(&after).next(),
            Trigger::Every(interval) => after.checked_add_signed(*interval),
        }
    }
}

fn parse_interval(input: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid interval '{}' (expected e.g. 30s, 5m, 2h, 1d)", input);
    if input.len() < 2 {
        return Err(invalid());
    }
    let (digits, unit) = input.split_at(input.len() - 1);
    let n: i64 = digits.trim().parse().map_err(|_| invalid())?;
    if n <= 0 {
        return Err(invalid());
    }
    match unit {
        "s" => Ok(Duration::seconds(n)),
        "m" => Ok(Duration::minutes(n)),
        "h" => Ok(Duration::hours(n)),
        "d" => Ok(Duration::days(n)),
        _ => Err(invalid()),
    }
}
