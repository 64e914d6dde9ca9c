//! Axis labels for the simplified input form, which sends values only.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc};

/// Named time partition that labels are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketMode {
    Hours24,
    Days7,
    Weeks9,
    /// One blank label per value.
    #[default]
    Blank,
}

impl BucketMode {
    /// Whether the labels depend on the reference time at all.
    pub fn needs_reference(self) -> bool {
        matches!(self, BucketMode::Days7 | BucketMode::Weeks9)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BucketMode::Hours24 => "24hours",
            BucketMode::Days7 => "7days",
            BucketMode::Weeks9 => "9weeks",
            BucketMode::Blank => "default",
        }
    }
}

impl FromStr for BucketMode {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to [`BucketMode::Blank`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "24hours" => BucketMode::Hours24,
            "7days" => BucketMode::Days7,
            "9weeks" => BucketMode::Weeks9,
            _ => BucketMode::Blank,
        })
    }
}

/// Turn epoch seconds into a reference time, refusing anything outside
/// years 1..=9999 so the day arithmetic below cannot leave chrono's range.
pub fn reference_time(epoch_seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_seconds, 0).filter(|t| (1..=9999).contains(&t.year()))
}

/// Labels for `mode`, anchored at `reference`.
///
/// `7days` and `9weeks` print the day of month one higher than the calendar
/// day and do not roll over (`2024-01-32` is a valid output). Existing
/// consumers match on these strings, so the offset is kept.
pub fn generate(reference: DateTime<Utc>, mode: BucketMode, value_count: usize) -> Vec<String> {
    match mode {
        BucketMode::Hours24 => (0..24).map(hour_label).collect(),
        BucketMode::Days7 => (-8..=-2)
            .map(|offset| {
                let day = reference + Duration::days(offset);
                format!("{}-{:02}-{:02}", day.year(), day.month(), day.day() + 1)
            })
            .collect(),
        BucketMode::Weeks9 => (-9..=-1)
            .map(|week: i64| {
                let end = reference - Duration::days(2) + Duration::days(7 * (week + 1));
                let start = end - Duration::days(6);
                format!(
                    "{:02}/{:02} - {:02}/{:02}        ",
                    start.month(),
                    start.day() + 1,
                    end.month(),
                    end.day() + 1
                )
            })
            .collect(),
        BucketMode::Blank => vec![String::new(); value_count],
    }
}

fn hour_label(hour: u32) -> String {
    let suffix = if hour >= 12 { "pm" } else { "am" };
    let clock = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}{}", clock, suffix)
}
