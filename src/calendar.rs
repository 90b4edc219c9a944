//! Calendar arithmetic for date values.
//!
//! Dates are carried as a real number of days elapsed since 1899-12-31T00:00:00
//! (so 1900-01-01 is day 1), with the fractional part holding the time of day.
//! The proleptic Gregorian calendar comes from `chrono`; this module adds the
//! textual literal form used by catalogs, the rounding rules used when a date is
//! printed through a narrow format, and the ISO-8601-like separation intervals
//! that step from one data file to the next.

use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CatalogError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;
// anything this close to the next second is treated as the next second
const SECOND_TOLERANCE: f64 = 1e-6;
const FIRST_GREGORIAN_YEAR: i32 = 1583;

lazy_static! {
    static ref EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
    static ref DATE_LITERAL: Regex = Regex::new(
        r"^([12]\d{3})-([01]\d)-([0-3]\d)(?:T([0-2]\d)(?::([0-5]\d)(?::([0-5]\d(?:\.\d*)?))?)?)?$"
    ).unwrap();
}

pub fn is_leap(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn month_length(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// True when `text` has the shape `yyyy-mm-dd[Thh[:mm[:ss[.frac]]]]`.
pub fn is_date_literal(text: &str) -> bool {
    DATE_LITERAL.is_match(text)
}

/// Parses a date literal into days since 1899-12-31.
pub fn parse_date(text: &str) -> Result<f64> {
    let invalid = || CatalogError::InvalidDateString(text.to_owned());
    let caps = DATE_LITERAL.captures(text).ok_or_else(invalid)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str());
    let year: i32 = field(1).and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
    let month: u32 = field(2).and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
    let day: u32 = field(3).and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
    if year < FIRST_GREGORIAN_YEAR {
        return Err(invalid());
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let hours: f64 = field(4).map_or(Ok(0.0), |s| s.parse()).map_err(|_| invalid())?;
    let minutes: f64 = field(5).map_or(Ok(0.0), |s| s.parse()).map_err(|_| invalid())?;
    let seconds: f64 = field(6)
        .map(|s| s.trim_end_matches('.'))
        .map_or(Ok(0.0), |s| s.parse())
        .map_err(|_| invalid())?;
    if hours >= 24.0 {
        return Err(invalid());
    }
    let days = date.signed_duration_since(*EPOCH).num_days() as f64;
    Ok(days + (hours * 3600.0 + minutes * 60.0 + seconds) / SECONDS_PER_DAY)
}

/// A day number broken into its calendar fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateParts {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

impl DateParts {
    pub fn from_days(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(CatalogError::InvalidDateString(value.to_string()));
        }
        let mut day = value.floor();
        let mut seconds = (value - day) * SECONDS_PER_DAY;
        if seconds >= SECONDS_PER_DAY - SECOND_TOLERANCE {
            day += 1.0;
            seconds = 0.0;
        }
        let date = day_to_date(day)?;
        let hour = (seconds / 3600.0).floor();
        let minute = ((seconds - hour * 3600.0) / 60.0).floor();
        let mut second = seconds - hour * 3600.0 - minute * 60.0;
        let (mut hour, mut minute) = (hour as u32, minute as u32);
        if second >= 60.0 - SECOND_TOLERANCE {
            second = 0.0;
            minute += 1;
        }
        if minute >= 60 {
            minute -= 60;
            hour += 1;
        }
        let mut parts = Self { date, hour, minute, second };
        if hour >= 24 {
            parts.hour = hour - 24;
            parts.date = next_day(parts.date)?;
        }
        Ok(parts)
    }
    pub fn year(&self) -> i32 {
        self.date.year()
    }
    pub fn month(&self) -> u32 {
        self.date.month()
    }
    pub fn day(&self) -> u32 {
        self.date.day()
    }
    pub fn day_of_year(&self) -> u32 {
        self.date.ordinal()
    }
}

fn day_to_date(day: f64) -> Result<NaiveDate> {
    Duration::try_days(day as i64)
        .and_then(|d| EPOCH.checked_add_signed(d))
        .ok_or_else(|| CatalogError::InvalidDateString(format!("day number {day} is out of range")))
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| CatalogError::InvalidDateString(format!("no day after {date}")))
}

/// Renders a day number as `yyyy-mm-ddThh:mm:ss`, then takes `width` characters
/// starting at `start`.
///
/// Time fields that fall outside the requested window are rounded into the
/// visible ones: seconds when the window ends before the fractional part,
/// minutes when it ends before the seconds, hours when it ends before the
/// minutes. A window reaching past the seconds shows fractional seconds.
pub fn render_date(value: f64, width: Option<usize>, start: Option<usize>) -> Result<String> {
    let start = start.unwrap_or(0);
    let width = width.filter(|w| *w > 0).unwrap_or(19);
    let end = start + width - 1;
    let parts = DateParts::from_days(value)?;
    let mut date = parts.date;
    let (mut hour, mut minute, mut second) = (parts.hour, parts.minute, parts.second);

    if end <= 18 {
        second = second.round();
    }
    while second >= 60.0 {
        minute += 1;
        second -= 60.0;
    }
    if end <= 15 && second >= 30.0 {
        second = 0.0;
        minute += 1;
    }
    while minute >= 60 {
        hour += 1;
        minute -= 60;
    }
    if end <= 12 && minute > 30 {
        minute = 0;
        hour += 1;
    }
    while hour >= 24 {
        hour -= 24;
        date = next_day(date)?;
    }

    let mut text = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:",
        date.year(),
        date.month(),
        date.day(),
        hour,
        minute
    );
    if end <= 18 {
        text.push_str(&format!("{:02}", second as u32));
    } else {
        let digits = end - 19;
        if digits == 0 {
            text.push_str(&format!("{:02}.", second.floor() as u32));
        } else {
            text.push_str(&format!("{:0w$.p$}", second, w = 3 + digits, p = digits));
        }
    }
    Ok(text.chars().skip(start).take(width).collect())
}

// ------------- Time Interval -------------

/// Separation between successive data files of a target, written
/// `P[nY][nM][nD][T[nH][nM][nS]]`. An empty interval means every
/// snapshot lives in a single file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeInterval {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub seconds: f64,
    pub all_here: bool,
}

impl TimeInterval {
    pub fn all_in_one() -> Self {
        Self { all_here: true, ..Self::default() }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::all_in_one());
        }
        let bad = |why: &str| CatalogError::syntax(format!("bad time interval '{text}': {why}"));
        let rest = text.strip_prefix('P').ok_or_else(|| bad("must start with P"))?;
        let mut interval = Self::default();
        let mut in_time = false;
        // index of the next designator allowed in the current part
        let mut next = 0usize;
        let mut seen = false;
        let mut chars = rest.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c == 'T' && !in_time {
                in_time = true;
                next = 0;
                chars.next();
                continue;
            }
            let mut number: u32 = 0;
            let mut digits = 0;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                number = number
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(d))
                    .ok_or_else(|| bad("number too large"))?;
                digits += 1;
                chars.next();
            }
            if digits == 0 {
                return Err(bad("expected a number"));
            }
            let designator = chars.next().ok_or_else(|| bad("missing designator"))?;
            let order: &[char] = if in_time { &['H', 'M', 'S'] } else { &['Y', 'M', 'D'] };
            let position = order[next..]
                .iter()
                .position(|d| *d == designator)
                .map(|p| p + next)
                .ok_or_else(|| bad("unexpected designator"))?;
            next = position + 1;
            seen = true;
            match (in_time, designator) {
                (false, 'Y') => interval.years = number,
                (false, 'M') => interval.months = number,
                (false, 'D') => interval.days = number,
                (true, 'H') => interval.seconds += 3600.0 * f64::from(number),
                (true, 'M') => interval.seconds += 60.0 * f64::from(number),
                _ => interval.seconds += f64::from(number),
            }
        }
        if !seen {
            return Err(bad("no components"));
        }
        if interval.is_zero() {
            return Err(bad("zero length"));
        }
        Ok(interval)
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0 && self.seconds <= 0.0
    }

    /// Sub-day step in days, widened to `desired_hours` when that is an integer
    /// multiple of it.
    fn sub_day_step(&self, desired_hours: f64) -> f64 {
        let mut hours = self.seconds / 3600.0;
        if hours > 0.0 && desired_hours > hours {
            let n = (desired_hours / hours).round();
            if (n * hours - desired_hours).abs() < 1e-12 * desired_hours.max(1.0) {
                hours = desired_hours;
            }
        }
        hours / 24.0
    }

    /// Moves `base` one interval forward, leap-day and month-length aware.
    pub fn advance(&self, base: f64, desired_hours: f64) -> Result<f64> {
        if self.all_here {
            return Ok(base);
        }
        let parts = DateParts::from_days(base)?;
        let (mut year, mut month) = (parts.year(), parts.month());
        let mut year_days = 0.0;
        for _ in 0..self.years {
            year_days += 365.0;
            if is_leap(year) && month <= 2 {
                year_days += 1.0;
            }
            if is_leap(year + 1) && month > 2 {
                year_days += 1.0;
            }
            year += 1;
        }
        let mut month_days = 0.0;
        for _ in 0..self.months {
            month_days += f64::from(month_length(year, month));
            month += 1;
            if month > 12 {
                year += 1;
                month = 1;
            }
        }
        Ok(base + year_days + month_days + f64::from(self.days) + self.sub_day_step(desired_hours))
    }

    /// Moves `base` one interval backward; the inverse of [`TimeInterval::advance`].
    pub fn retreat(&self, base: f64, desired_hours: f64) -> Result<f64> {
        if self.all_here {
            return Ok(base);
        }
        let parts = DateParts::from_days(base)?;
        let (mut year, mut month) = (parts.year(), parts.month());
        let mut year_days = 0.0;
        for _ in 0..self.years {
            year_days += 365.0;
            if is_leap(year) && month > 2 {
                year_days += 1.0;
            }
            if is_leap(year - 1) && month <= 2 {
                year_days += 1.0;
            }
            year -= 1;
        }
        let mut month_days = 0.0;
        for _ in 0..self.months {
            month -= 1;
            if month < 1 {
                year -= 1;
                month = 12;
            }
            month_days += f64::from(month_length(year, month));
        }
        Ok(base - year_days - month_days - f64::from(self.days) - self.sub_day_step(desired_hours))
    }
}
