//! Fuzzy date filters for `til find --date`.
//!
//! Accepted form: `[since|before|after] N [days|weeks|months|years]`,
//! singular units allowed, case-insensitive.

use crate::{Error, Result};
use chrono::{Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Which side of the cutoff an entry must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateDirection {
    /// On or after the cutoff.
    Since,
    /// Strictly before the cutoff.
    Before,
    /// On or after the cutoff (synonym of `since`).
    After,
}

/// Unit of a date filter's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    /// Calendar days.
    Days,
    /// Seven-day weeks.
    Weeks,
    /// Calendar months.
    Months,
    /// Calendar years.
    Years,
}

/// A relative date filter such as `since 2 weeks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    /// Which side of the cutoff matches.
    pub direction: DateDirection,
    /// How many units back from today the cutoff lies.
    pub amount: u32,
    /// Unit of `amount`.
    pub unit: DateUnit,
}

impl DateFilter {
    /// Computes the cutoff date relative to `today`.
    ///
    /// Saturates at the earliest representable date.
    #[must_use]
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        let back = match self.unit {
            DateUnit::Days => today.checked_sub_days(Days::new(u64::from(self.amount))),
            DateUnit::Weeks => today.checked_sub_days(Days::new(u64::from(self.amount) * 7)),
            DateUnit::Months => today.checked_sub_months(Months::new(self.amount)),
            DateUnit::Years => self
                .amount
                .checked_mul(12)
                .and_then(|months| today.checked_sub_months(Months::new(months))),
        };
        back.unwrap_or(NaiveDate::MIN)
    }

    /// Returns true if `date` passes the filter as of `today`.
    #[must_use]
    pub fn accepts(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let cutoff = self.cutoff(today);
        match self.direction {
            DateDirection::Since | DateDirection::After => date >= cutoff,
            DateDirection::Before => date < cutoff,
        }
    }
}

impl FromStr for DateFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::InvalidQuery(format!(
                "`{s}` is not a date filter; use `[since|before|after] N [days|weeks|months|years]`"
            ))
        };

        let lowered = s.to_lowercase();
        let parts: Vec<&str> = lowered.split_whitespace().collect();
        let [direction, amount, unit] = parts.as_slice() else {
            return Err(invalid());
        };

        let direction = match *direction {
            "since" => DateDirection::Since,
            "before" => DateDirection::Before,
            "after" => DateDirection::After,
            _ => return Err(invalid()),
        };
        let amount = amount.parse::<u32>().map_err(|_| invalid())?;
        let unit = match *unit {
            "day" | "days" => DateUnit::Days,
            "week" | "weeks" => DateUnit::Weeks,
            "month" | "months" => DateUnit::Months,
            "year" | "years" => DateUnit::Years,
            _ => return Err(invalid()),
        };

        Ok(Self {
            direction,
            amount,
            unit,
        })
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            DateDirection::Since => "since",
            DateDirection::Before => "before",
            DateDirection::After => "after",
        };
        let unit = match self.unit {
            DateUnit::Days => "days",
            DateUnit::Weeks => "weeks",
            DateUnit::Months => "months",
            DateUnit::Years => "years",
        };
        write!(f, "{direction} {} {unit}", self.amount)
    }
}
