//! Calendar days, day arithmetic and the clock seam.
//!
//! Everything above this module compares dates as [`CalendarDay`] values,
//! never as timestamps, so time-of-day can never leak into streak or
//! schedule decisions.

use crate::error::DateFormatError;
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, ParseWeekdayError, TimeZone, Weekday};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Canonical day key format.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// A timezone-normalized calendar date, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Build a day from year, month and day-of-month.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The local calendar date of `moment` in its own timezone.
    pub fn from_moment<Tz: TimeZone>(moment: &DateTime<Tz>) -> Self {
        Self(moment.date_naive())
    }

    /// Today's date on the local wall clock.
    pub fn today() -> Self {
        Self::from_moment(&Local::now())
    }

    /// Parse a canonical `YYYY-MM-DD` string.
    pub fn parse(input: &str) -> Result<Self, DateFormatError> {
        input.parse()
    }

    /// Shift by a signed number of days, saturating at the representable range.
    pub fn add_days(self, n: i64) -> Self {
        let days = Days::new(n.unsigned_abs());
        let shifted = if n >= 0 {
            self.0.checked_add_days(days).unwrap_or(NaiveDate::MAX)
        } else {
            self.0.checked_sub_days(days).unwrap_or(NaiveDate::MIN)
        };
        Self(shifted)
    }

    /// The previous day.
    pub fn pred(self) -> Self {
        self.add_days(-1)
    }

    /// The next day.
    pub fn succ(self) -> Self {
        self.add_days(1)
    }

    pub fn is_same_day(self, other: Self) -> bool {
        self == other
    }

    /// Whether this is the local wall-clock date.
    pub fn is_today(self) -> bool {
        self == Self::today()
    }

    /// Absolute number of days between two dates.
    pub fn days_between(self, other: Self) -> u32 {
        let diff = self.0.signed_duration_since(other.0).num_days();
        u32::try_from(diff.unsigned_abs()).unwrap_or(u32::MAX)
    }

    /// [`days_between`](Self::days_between) floored at 1, for use as a rate divisor.
    pub fn rate_divisor_days(self, other: Self) -> u32 {
        self.days_between(other).max(1)
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for CalendarDay {
    type Err = DateFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        // chrono accepts unpadded fields and surrounding blanks; the
        // canonical form does not.
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(DateFormatError::new(s));
        }
        NaiveDate::parse_from_str(s, DAY_FORMAT)
            .map(Self)
            .map_err(|_| DateFormatError::new(s))
    }
}

impl Serialize for CalendarDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of "today".
pub trait Clock: Send + Sync {
    /// The current calendar day.
    fn today(&self) -> CalendarDay;

    /// Whether `day` is the current calendar day.
    fn is_today(&self, day: CalendarDay) -> bool {
        day == self.today()
    }
}

/// Clock backed by the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CalendarDay {
        CalendarDay::today()
    }
}

/// Clock pinned to a settable day.
#[derive(Debug)]
pub struct FixedClock {
    day: RwLock<CalendarDay>,
}

impl FixedClock {
    pub fn new(day: CalendarDay) -> Self {
        Self {
            day: RwLock::new(day),
        }
    }

    pub fn set(&self, day: CalendarDay) {
        *self.day.write() = day;
    }

    /// Move the clock by `n` days.
    pub fn advance(&self, n: i64) {
        let mut day = self.day.write();
        *day = day.add_days(n);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> CalendarDay {
        *self.day.read()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A set of weekdays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: Self = Self(0);

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", names.join(","))
    }
}

impl FromStr for WeekdaySet {
    type Err = ParseWeekdayError;

    /// Parse a comma-separated list such as `Mon,Wed,Fri`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<Weekday>)
            .collect()
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawWeekdays {
    List(Vec<Weekday>),
    Text(String),
}

/// Reads either a list (`["Mon", "Fri"]`) or a comma-separated string
/// (`"Mon,Fri"`).
impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawWeekdays::deserialize(deserializer)? {
            RawWeekdays::List(days) => Ok(days.into_iter().collect()),
            RawWeekdays::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
