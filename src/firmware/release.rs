//! Release calendar: releases are published on the Monday of every other ISO
//! week.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, Weekday};

/// Which ISO weeks carry a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekParity {
    Even,
    Odd,
}
impl WeekParity {
    fn of(week: u32) -> Self {
        if week % 2 == 0 {
            WeekParity::Even
        } else {
            WeekParity::Odd
        }
    }
}
impl FromStr for WeekParity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "even" => Ok(WeekParity::Even),
            "odd" => Ok(WeekParity::Odd),
            other => Err(format!("`{}` is not a week parity, use even|odd", other)),
        }
    }
}
impl fmt::Display for WeekParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekParity::Even => f.write_str("even"),
            WeekParity::Odd => f.write_str("odd"),
        }
    }
}

pub const RELEASE_DAY: Weekday = Weekday::Mon;

pub fn is_release_day(date: NaiveDate, parity: WeekParity) -> bool {
    date.weekday() == RELEASE_DAY && WeekParity::of(date.iso_week().week()) == parity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monday_of_odd_week() {
        // 2015-06-08 is the Monday of ISO week 24, 2015-06-15 of week 25.
        assert!(is_release_day(day(2015, 6, 15), WeekParity::Odd));
        assert!(!is_release_day(day(2015, 6, 8), WeekParity::Odd));
        assert!(is_release_day(day(2015, 6, 8), WeekParity::Even));
    }

    #[test]
    fn other_days_never_release() {
        assert!(!is_release_day(day(2015, 6, 16), WeekParity::Odd));
        assert!(!is_release_day(day(2015, 6, 16), WeekParity::Even));
    }

    #[test]
    fn parity_from_str() {
        assert_eq!("odd".parse::<WeekParity>(), Ok(WeekParity::Odd));
        assert!("weekly".parse::<WeekParity>().is_err());
    }
}
