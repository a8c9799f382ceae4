use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// The covered span of one bank statement. Statements print the year once
/// in the header and then date rows as day + month only, so the period is
/// what decides which calendar year each month belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod(pub DateRange);

impl StatementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        StatementPeriod(DateRange::new(start, end))
    }

    pub fn range(self) -> DateRange {
        self.0
    }

    /// The calendar year a row with this month number falls in.
    ///
    /// A period inside one calendar year maps every month to that year. A
    /// period spanning a year boundary (December start, January end) maps
    /// months at or after the start month to the start year and months at
    /// or before the end month to the end year. Months outside both spans
    /// cannot legitimately occur on such a statement; they get the start
    /// year so the row still parses and downstream validation can flag it.
    pub fn year_for_month(self, month: u32) -> i32 {
        let start = self.0.start;
        let end = self.0.end;
        if start.year() == end.year() {
            return start.year();
        }
        if month >= start.month() {
            start.year()
        } else if month <= end.month() {
            end.year()
        } else {
            start.year()
        }
    }
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
