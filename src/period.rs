use crate::error::{Result, WaterfallError};
use chrono::{Datelike, Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One accounting month. Ordering is chronological (year, then month).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(WaterfallError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    /// Canonical `YYYY-MM` key.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Parses a `YYYY-MM` key back into a period.
    pub fn parse_key(key: &str) -> Result<Self> {
        let parts: Vec<&str> = key.trim().split('-').collect();
        if parts.len() != 2 {
            return Err(WaterfallError::InvalidPeriodKey(key.to_string()));
        }

        let year: i32 = parts[0]
            .parse()
            .map_err(|_| WaterfallError::InvalidPeriodKey(key.to_string()))?;
        let month: u32 = parts[1]
            .parse()
            .map_err(|_| WaterfallError::InvalidPeriodKey(key.to_string()))?;

        Self::new(year, month).map_err(|_| WaterfallError::InvalidPeriodKey(key.to_string()))
    }

    /// April-start fiscal year label, e.g. 2024-07 -> "FY2024-25",
    /// 2024-02 -> "FY2023-24".
    pub fn fiscal_year_label(&self) -> String {
        let fy_start_year = if self.month >= 4 {
            self.year
        } else {
            self.year - 1
        };
        format!("FY{}-{:02}", fy_start_year, (fy_start_year + 1) % 100)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    pub fn end_date(&self) -> NaiveDate {
        last_day_of_month(self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

/// All periods from `start` to `end` inclusive, ascending.
pub fn periods_between(start: Period, end: Period) -> Result<Vec<Period>> {
    if end < start {
        return Err(WaterfallError::InvertedRange {
            start: start.key(),
            end: end.key(),
        });
    }

    let mut periods = Vec::new();
    let mut current = start;
    while current <= end {
        periods.push(current);
        current = current.next();
    }
    Ok(periods)
}
