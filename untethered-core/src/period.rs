//! Calendar-month periods ("MM/YYYY") and week-of-month indices.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::WEEKS_PER_MONTH;
use crate::error::ValidationError;

/// A calendar month. Ordering follows the calendar (year, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

/// Navigation direction between neighbouring periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(ValidationError::InvalidPeriod(format!("{month:02}/{year}")));
        }
        Ok(Period { year, month })
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Period {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The period containing the caller's current local date.
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The neighbouring month. Fails past the representable range
    /// (01/0001 to 12/9999).
    pub fn adjacent(&self, direction: Direction) -> Result<Self, ValidationError> {
        let (year, month) = match direction {
            Direction::Next if self.month == 12 => (self.year + 1, 1),
            Direction::Next => (self.year, self.month + 1),
            Direction::Previous if self.month == 1 => (self.year - 1, 12),
            Direction::Previous => (self.year, self.month - 1),
        };
        Period::new(year, month)
    }

    /// Human label, e.g. "March 2025".
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPeriod(s.to_string());

        let (month, year) = s.trim().split_once('/').ok_or_else(invalid)?;
        if month.len() != 2 || year.len() != 4 {
            return Err(invalid());
        }
        if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let month: u32 = month.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        Period::new(year, month).map_err(|_| invalid())
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Period {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// "MM/YYYY" for the caller's current date. No I/O.
pub fn current_period_key() -> String {
    Period::current().to_string()
}

/// The neighbouring month's key, rolling over year boundaries.
pub fn adjacent_period_key(key: &str, direction: Direction) -> Result<String, ValidationError> {
    let period: Period = key.parse()?;
    Ok(period.adjacent(direction)?.to_string())
}

/// 0-based week of the month: days 1-7, 8-14, 15-21, 22-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekIndex(usize);

impl WeekIndex {
    pub fn new(index: usize) -> Result<Self, ValidationError> {
        if index < WEEKS_PER_MONTH {
            Ok(WeekIndex(index))
        } else {
            Err(ValidationError::WeekOutOfRange(index))
        }
    }

    /// Days 29-31 fold into the last week.
    pub fn for_day(day_of_month: u32) -> Self {
        let index = (day_of_month.saturating_sub(1) / 7) as usize;
        WeekIndex(index.min(WEEKS_PER_MONTH - 1))
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_day(date.day())
    }

    pub fn get(&self) -> usize {
        self.0
    }

    pub fn all() -> impl Iterator<Item = WeekIndex> {
        (0..WEEKS_PER_MONTH).map(WeekIndex)
    }
}

impl fmt::Display for WeekIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Week {}", self.0 + 1)
    }
}
