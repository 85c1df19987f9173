//! Period granularity used to bucket daily metric rows.
//!
//! Every bucketed period has a string key. The key format is part of the
//! public contract (dashboards merge on it), so monthly keys stay `YYYY-MM`
//! rather than a structured value.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ShopMetricsError;

/// Key used for the single bucket produced by [`PeriodType::All`].
pub const ALL_PERIOD_KEY: &str = "all";

/// Grouping granularity for per-period aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    All,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::All => "all",
        }
    }

    /// Period key of the bucket containing `date`.
    ///
    /// - daily: `2024-01-05`
    /// - weekly: `2024-W01` (ISO year and ISO week)
    /// - monthly: `2024-01`
    /// - all: `all`
    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            PeriodType::Daily => date.format("%Y-%m-%d").to_string(),
            PeriodType::Weekly => {
                let week = date.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            PeriodType::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
            PeriodType::All => ALL_PERIOD_KEY.to_string(),
        }
    }

    /// First calendar date of the period identified by `key`.
    ///
    /// Returns `None` for [`PeriodType::All`] and for keys this period type
    /// could not have produced.
    pub fn first_date(&self, key: &str) -> Option<NaiveDate> {
        let date = match self {
            PeriodType::Daily => NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()?,
            PeriodType::Weekly => {
                let (year, week) = key.split_once("-W")?;
                NaiveDate::from_isoywd_opt(year.parse().ok()?, week.parse().ok()?, Weekday::Mon)?
            }
            PeriodType::Monthly => {
                let (year, month) = key.split_once('-')?;
                NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?
            }
            PeriodType::All => return None,
        };
        // Reject non-canonical spellings such as "2024-1".
        (self.format(date) == key).then_some(date)
    }

    /// SQL expression producing the same key as [`format`](Self::format) for
    /// the date column `column`.
    pub fn sql_expr(&self, column: &str) -> String {
        let date = format!("CAST({} AS DATE)", column);
        match self {
            PeriodType::Daily => format!("strftime({}, '%Y-%m-%d')", date),
            PeriodType::Weekly => format!(
                "lpad(CAST(isoyear({d}) AS VARCHAR), 4, '0') || '-W' || lpad(CAST(week({d}) AS VARCHAR), 2, '0')",
                d = date
            ),
            PeriodType::Monthly => format!("strftime({}, '%Y-%m')", date),
            PeriodType::All => format!("'{}'", ALL_PERIOD_KEY),
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = ShopMetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(PeriodType::Daily),
            "weekly" | "week" => Ok(PeriodType::Weekly),
            "monthly" | "month" => Ok(PeriodType::Monthly),
            "all" => Ok(PeriodType::All),
            other => Err(ShopMetricsError::InvalidArgument(format!(
                "Unknown period type: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_key_is_zero_padded() {
        assert_eq!(PeriodType::Monthly.format(d(2024, 1, 20)), "2024-01");
        assert_eq!(PeriodType::Monthly.first_date("2024-02"), Some(d(2024, 2, 1)));
    }

    #[test]
    fn weekly_key_uses_iso_year() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        assert_eq!(PeriodType::Weekly.format(d(2024, 12, 31)), "2025-W01");
        assert_eq!(PeriodType::Weekly.first_date("2025-W01"), Some(d(2024, 12, 30)));
    }

    #[test]
    fn first_date_is_start_of_bucket() {
        let mut day = d(2023, 12, 1);
        while day <= d(2024, 3, 31) {
            for period in [PeriodType::Daily, PeriodType::Weekly, PeriodType::Monthly] {
                let key = period.format(day);
                let first = period.first_date(&key).unwrap();
                assert!(first <= day);
                assert_eq!(period.format(first), key);
                if let Some(prev) = first.pred_opt() {
                    assert_ne!(period.format(prev), key);
                }
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn all_has_no_first_date() {
        assert_eq!(PeriodType::All.format(d(2024, 5, 5)), ALL_PERIOD_KEY);
        assert_eq!(PeriodType::All.first_date(ALL_PERIOD_KEY), None);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(PeriodType::Monthly.first_date("2024-1"), None);
        assert_eq!(PeriodType::Monthly.first_date("2024-13"), None);
        assert_eq!(PeriodType::Weekly.first_date("2024-01"), None);
        assert_eq!(PeriodType::Daily.first_date("yesterday"), None);
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("Monthly".parse::<PeriodType>().unwrap(), PeriodType::Monthly);
        assert_eq!("week".parse::<PeriodType>().unwrap(), PeriodType::Weekly);
        assert!("quarterly".parse::<PeriodType>().is_err());
    }
}
