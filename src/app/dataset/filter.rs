//! Date filtering of posts

use chrono::{NaiveDate, NaiveDateTime};

use crate::app::models::Post;
use crate::constants::dataset::DATE_FORMAT;
use crate::errors::{AppError, Result};

/// Inclusive calendar-date window; unbounded unless both ends are given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    bounds: Option<(NaiveDate, NaiveDate)>,
}

impl DateRange {
    /// Build a range from optional `YYYY-MM-DD` bounds
    ///
    /// Only parses when both bounds are present; a single bound leaves the
    /// range unbounded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateFormat` if either of two given bounds fails to
    /// parse.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self::between(parse_date(start)?, parse_date(end)?)),
            (None, None) => Ok(Self::unbounded()),
            _ => {
                tracing::warn!("Only one date bound given, date filtering disabled");
                Ok(Self::unbounded())
            }
        }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            bounds: Some((start, end)),
        }
    }

    pub fn unbounded() -> Self {
        Self { bounds: None }
    }

    pub fn is_bounded(&self) -> bool {
        self.bounds.is_some()
    }

    /// Whether a timestamp's calendar date lies in the window
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        match self.bounds {
            Some((start, end)) => {
                let date = timestamp.date();
                start <= date && date <= end
            }
            None => true,
        }
    }

    /// Whether a post belongs in the dataset
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateFormat` if the post timestamp does not parse.
    pub fn includes(&self, post: &Post) -> Result<bool> {
        Ok(self.contains(post.timestamp()?))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        tracing::error!("Cannot parse date bound {:?}", value);
        AppError::invalid_date(value, "YYYY-MM-DD")
    })
}
