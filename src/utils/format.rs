//! Number and month formatting shared by all derived series.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StatsError};

/// Render a count with `K`/`M` suffixes.
///
/// The thresholds apply to the raw magnitude, so `999_999` renders as
/// `"1000.0K"` rather than rolling over to `"1.00M"`.
pub fn format_compact(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    if n.abs() >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n.abs() >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        let rounded = n.round();
        if rounded == 0.0 {
            "0".to_string()
        } else {
            format!("{:.0}", rounded)
        }
    }
}

/// Thousands-separated integer, e.g. `1,234,567`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Percentage with a fixed number of decimals, e.g. `12.3%`.
pub fn format_pct(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{:.*}%", decimals, value)
}

/// Short label for a `YYYY-MM` key: `"2024-01"` becomes `"Jan '24"`.
pub fn format_month(key: &str) -> Result<String> {
    let month: YearMonth = key.parse()?;
    Ok(month.first_day()?.format("%b '%y").to_string())
}

/// Long label for a `YYYY-MM` key: `"2024-01"` becomes `"Jan 2024"`.
pub fn format_month_long(key: &str) -> Result<String> {
    let month: YearMonth = key.parse()?;
    Ok(month.first_day()?.format("%b %Y").to_string())
}

/// A calendar month parsed from a `YYYY-MM` key.
///
/// Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month `n` months after this one.
    pub fn add_months(&self, n: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + n as i64;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| StatsError::invalid_month(&self.to_string()))
    }
}

impl FromStr for YearMonth {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s.split_once('-').ok_or_else(|| StatsError::invalid_month(s))?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StatsError::invalid_month(s));
        }
        if month.is_empty() || month.len() > 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StatsError::invalid_month(s));
        }
        let year: i32 = year.parse().map_err(|_| StatsError::invalid_month(s))?;
        let month: u32 = month.parse().map_err(|_| StatsError::invalid_month(s))?;
        YearMonth::new(year, month).ok_or_else(|| StatsError::invalid_month(s))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
