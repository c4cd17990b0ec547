use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::BTreeMap;

/// Mean gap between consecutive timestamps, in seconds. `None` with fewer than two.
pub fn mean_interval_secs(times: &[DateTime<FixedOffset>]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let mut s = times.to_vec();
    s.sort_unstable();
    let total: i64 = s.windows(2).map(|w| (w[1] - w[0]).num_milliseconds()).sum();
    Some(total as f64 / 1000.0 / (s.len() - 1) as f64)
}

/// Render a duration in the largest unit that keeps it readable:
/// `42s`, `2.5m`, `1.0h`, `3.2d`.
pub fn format_interval(secs: f64) -> String {
    if secs < 60.0 {
        format!("{secs:.0}s")
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else if secs < 86400.0 {
        format!("{:.1}h", secs / 3600.0)
    } else {
        format!("{:.1}d", secs / 86400.0)
    }
}

pub fn average_interval(times: &[DateTime<FixedOffset>]) -> Option<String> {
    mean_interval_secs(times).map(format_interval)
}

/// Hits per calendar day in each record's own offset, ascending by date.
pub fn hits_per_day<'a, I>(times: I) -> Vec<(NaiveDate, u64)>
where
    I: IntoIterator<Item = &'a DateTime<FixedOffset>>,
{
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for t in times {
        *days.entry(t.date_naive()).or_insert(0) += 1;
    }
    days.into_iter().collect()
}

/// Hits per local clock hour, keyed `YYYY-MM-DD HH:00`, ascending.
pub fn hits_per_hour<'a, I>(times: I) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = &'a DateTime<FixedOffset>>,
{
    let mut hours: BTreeMap<String, u64> = BTreeMap::new();
    for t in times {
        *hours.entry(t.format("%Y-%m-%d %H:00").to_string()).or_insert(0) += 1;
    }
    hours.into_iter().collect()
}

/// Keeps the earliest and latest of a stream of optional timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeenRange {
    pub first: Option<DateTime<FixedOffset>>,
    pub last: Option<DateTime<FixedOffset>>,
}

impl SeenRange {
    pub fn observe(&mut self, t: Option<DateTime<FixedOffset>>) {
        let Some(t) = t else { return };
        if self.first.map_or(true, |f| t < f) {
            self.first = Some(t);
        }
        if self.last.map_or(true, |l| t > l) {
            self.last = Some(t);
        }
    }
}
