//! Query time ranges and their downsampling bucket widths.

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl TimeRange {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(TimeRange::OneHour),
            "6h" => Some(TimeRange::SixHours),
            "24h" => Some(TimeRange::TwentyFourHours),
            "7d" => Some(TimeRange::SevenDays),
            "30d" => Some(TimeRange::ThirtyDays),
            _ => None,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            TimeRange::OneHour => Duration::hours(1),
            TimeRange::SixHours => Duration::hours(6),
            TimeRange::TwentyFourHours => Duration::hours(24),
            TimeRange::SevenDays => Duration::days(7),
            TimeRange::ThirtyDays => Duration::days(30),
        }
    }

    /// `None` means return raw points (1h/6h); otherwise bucket and average.
    pub fn bucket_width(&self) -> Option<Duration> {
        match self {
            TimeRange::OneHour | TimeRange::SixHours => None,
            TimeRange::TwentyFourHours => Some(Duration::minutes(10)),
            TimeRange::SevenDays | TimeRange::ThirtyDays => Some(Duration::hours(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ranges_have_no_bucket_width() {
        assert_eq!(TimeRange::OneHour.bucket_width(), None);
        assert_eq!(TimeRange::SixHours.bucket_width(), None);
    }

    #[test]
    fn downsampled_ranges_use_expected_bucket_widths() {
        assert_eq!(TimeRange::TwentyFourHours.bucket_width(), Some(Duration::minutes(10)));
        assert_eq!(TimeRange::SevenDays.bucket_width(), Some(Duration::hours(1)));
        assert_eq!(TimeRange::ThirtyDays.bucket_width(), Some(Duration::hours(1)));
    }

    #[test]
    fn parse_round_trips_all_variants() {
        for s in ["1h", "6h", "24h", "7d", "30d"] {
            assert!(TimeRange::parse(s).is_some());
        }
        assert!(TimeRange::parse("bogus").is_none());
    }
}
