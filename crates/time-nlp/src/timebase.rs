//! The reference instant that relative expressions are resolved against.
//!
//! A time base is a naive local-clock instant with second precision. Its
//! canonical text form is `YYYY-MM-DD-HH-MM-SS`, e.g. `2016-05-04-10-00-00`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::NlpError;
use crate::resolver::TimePoint;

/// `chrono` format string for the canonical text form.
pub const TIME_BASE_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Digit-group widths of the canonical text form.
const FIELD_WIDTHS: [usize; 6] = [4, 2, 2, 2, 2, 2];

/// A second-precision reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeBase(NaiveDateTime);

impl TimeBase {
    /// Wrap an instant, dropping any sub-second component.
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// The current local wall-clock instant.
    pub fn now() -> Self {
        Self::new(Local::now().naive_local())
    }

    /// Parse the canonical `YYYY-MM-DD-HH-MM-SS` form.
    ///
    /// # Errors
    ///
    /// Returns [`NlpError::InvalidTimeBase`] if the string does not have
    /// exactly that shape (zero-padded digit groups joined by `-`) or names
    /// a nonexistent calendar instant.
    ///
    /// # Examples
    ///
    /// ```
    /// use time_nlp::TimeBase;
    ///
    /// let base = TimeBase::parse("2016-05-04-10-00-00").unwrap();
    /// assert_eq!(base.to_string(), "2016-05-04-10-00-00");
    /// assert!(TimeBase::parse("2016-5-4-10-00-00").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, NlpError> {
        let groups: Vec<&str> = s.split('-').collect();
        let well_formed = groups.len() == FIELD_WIDTHS.len()
            && groups
                .iter()
                .zip(FIELD_WIDTHS)
                .all(|(g, width)| g.len() == width && g.bytes().all(|b| b.is_ascii_digit()));
        if !well_formed {
            return Err(NlpError::InvalidTimeBase(format!(
                "'{s}': expected YYYY-MM-DD-HH-MM-SS"
            )));
        }

        NaiveDateTime::parse_from_str(s, TIME_BASE_FORMAT)
            .map(Self)
            .map_err(|e| NlpError::InvalidTimeBase(format!("'{s}': {e}")))
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Overwrite every field that `point` specifies, keeping the rest.
    ///
    /// The day is clamped to the last day of the resulting month so that,
    /// e.g., a base on the 31st overlaid with month 2 stays a real date.
    pub fn overlay(&self, point: &TimePoint) -> Self {
        let dt = self.0;
        let year = point.year().unwrap_or(dt.year());
        let month = point.month().unwrap_or(dt.month());
        let day = point.day().unwrap_or(dt.day());
        let hour = point.hour().unwrap_or(dt.hour());
        let minute = point.minute().unwrap_or(dt.minute());
        let second = point.second().unwrap_or(dt.second());

        let Some(last_day) = last_day_of_month(year, month) else {
            return *self;
        };
        NaiveDate::from_ymd_opt(year, month, day.min(last_day))
            .and_then(|d| d.and_hms_opt(hour.min(23), minute, second))
            .map(Self)
            .unwrap_or(*self)
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_BASE_FORMAT))
    }
}

impl FromStr for TimeBase {
    type Err = NlpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDateTime> for TimeBase {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::new(datetime)
    }
}

/// The last day (28–31) of a month, or `None` for an invalid year/month.
pub(crate) fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (ny, nm) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(ny, nm, 1)?;
    Some(first_next.pred_opt()?.day())
}
