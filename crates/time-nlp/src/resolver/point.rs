//! Partially specified calendar fields.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

/// A calendar field, ordered from most to least significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::Year,
        Granularity::Month,
        Granularity::Day,
        Granularity::Hour,
        Granularity::Minute,
        Granularity::Second,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Read this field out of a concrete instant.
    pub fn of(self, dt: &NaiveDateTime) -> i32 {
        match self {
            Granularity::Year => dt.year(),
            Granularity::Month => dt.month() as i32,
            Granularity::Day => dt.day() as i32,
            Granularity::Hour => dt.hour() as i32,
            Granularity::Minute => dt.minute() as i32,
            Granularity::Second => dt.second() as i32,
        }
    }

    /// Truncate an instant to this granularity (finer fields reset to their minimum).
    pub fn truncate(self, dt: &NaiveDateTime) -> NaiveDateTime {
        let point = TimePoint::from_datetime(dt).truncated(self);
        point.to_datetime().unwrap_or(*dt)
    }
}

/// Year/month/day/hour/minute/second, each either fixed or unset.
///
/// This is both the output of the calendar grammar for a single span and
/// the carrier of resolution context from one span to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TimePoint {
    units: [Option<i32>; 6],
}

impl TimePoint {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        let mut point = Self::default();
        for g in Granularity::ALL {
            point.set(g, g.of(dt));
        }
        point
    }

    pub fn get(&self, g: Granularity) -> Option<i32> {
        self.units[g.index()]
    }

    pub fn set(&mut self, g: Granularity, value: i32) {
        self.units[g.index()] = Some(value);
    }

    pub fn clear(&mut self, g: Granularity) {
        self.units[g.index()] = None;
    }

    pub fn is_set(&self, g: Granularity) -> bool {
        self.get(g).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.units.iter().all(Option::is_none)
    }

    /// The most significant field that is set.
    pub fn coarsest(&self) -> Option<Granularity> {
        Granularity::ALL.into_iter().find(|g| self.is_set(*g))
    }

    /// The least significant field that is set.
    pub fn finest(&self) -> Option<Granularity> {
        Granularity::ALL.into_iter().rev().find(|g| self.is_set(*g))
    }

    /// Whether any field strictly more significant than `g` is set.
    pub fn any_above(&self, g: Granularity) -> bool {
        Granularity::ALL[..g.index()].iter().any(|u| self.is_set(*u))
    }

    /// Copy of `self` with every field finer than `g` unset.
    pub fn truncated(&self, g: Granularity) -> Self {
        let mut point = *self;
        for u in &Granularity::ALL[g.index() + 1..] {
            point.clear(*u);
        }
        point
    }

    /// Set every unset field from `other` that is strictly above `g`.
    pub fn fill_above(&mut self, g: Granularity, other: &TimePoint) {
        for u in &Granularity::ALL[..g.index()] {
            if !self.is_set(*u) {
                if let Some(v) = other.get(*u) {
                    self.set(*u, v);
                }
            }
        }
    }

    /// No hour, minute or second specified.
    pub fn is_all_day(&self) -> bool {
        !self.is_set(Granularity::Hour)
            && !self.is_set(Granularity::Minute)
            && !self.is_set(Granularity::Second)
    }

    /// Build a concrete instant. The year must be set; other unset fields
    /// take their minimum. `None` if the fields do not name a real instant.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let year = self.year()?;
        let date = NaiveDate::from_ymd_opt(year, self.month().unwrap_or(1), self.day().unwrap_or(1))?;
        date.and_hms_opt(
            self.hour().unwrap_or(0),
            self.minute().unwrap_or(0),
            self.second().unwrap_or(0),
        )
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.set(Granularity::Year, date.year());
        self.set_month(date.month());
        self.set_day(date.day());
    }

    pub fn year(&self) -> Option<i32> {
        self.get(Granularity::Year)
    }

    pub fn month(&self) -> Option<u32> {
        self.unsigned(Granularity::Month)
    }

    pub fn day(&self) -> Option<u32> {
        self.unsigned(Granularity::Day)
    }

    pub fn hour(&self) -> Option<u32> {
        self.unsigned(Granularity::Hour)
    }

    pub fn minute(&self) -> Option<u32> {
        self.unsigned(Granularity::Minute)
    }

    pub fn second(&self) -> Option<u32> {
        self.unsigned(Granularity::Second)
    }

    pub fn set_year(&mut self, year: i32) {
        self.set(Granularity::Year, year);
    }

    pub fn set_month(&mut self, month: u32) {
        self.set(Granularity::Month, month as i32);
    }

    pub fn set_day(&mut self, day: u32) {
        self.set(Granularity::Day, day as i32);
    }

    pub fn set_hour(&mut self, hour: u32) {
        self.set(Granularity::Hour, hour as i32);
    }

    pub fn set_minute(&mut self, minute: u32) {
        self.set(Granularity::Minute, minute as i32);
    }

    pub fn set_second(&mut self, second: u32) {
        self.set(Granularity::Second, second as i32);
    }

    fn unsigned(&self, g: Granularity) -> Option<u32> {
        self.get(g).and_then(|v| u32::try_from(v).ok())
    }
}
