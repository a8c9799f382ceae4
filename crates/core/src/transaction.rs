use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// One row as a bank-specific parser pulled it off a page: still raw
/// tokens, not yet normalized. The page/line back-reference is carried for
/// diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub date_token: String,
    pub description: String,
    pub amount_token: String,
    pub balance_token: Option<String>,
    pub page: usize,
    pub line: usize,
}

impl RawRow {
    pub fn new(
        date_token: impl Into<String>,
        description: impl Into<String>,
        amount_token: impl Into<String>,
        page: usize,
        line: usize,
    ) -> Self {
        RawRow {
            date_token: date_token.into(),
            description: description.into(),
            amount_token: amount_token.into(),
            balance_token: None,
            page,
            line,
        }
    }

    pub fn with_balance(mut self, balance_token: impl Into<String>) -> Self {
        self.balance_token = Some(balance_token.into());
        self
    }
}

/// A row the parser or assembler gave up on, with enough context for a
/// human to find it in the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRow {
    pub page: usize,
    pub line: usize,
    pub content: String,
    pub reason: String,
}

impl SkippedRow {
    pub fn new(page: usize, line: usize, content: impl Into<String>, reason: impl Into<String>) -> Self {
        SkippedRow {
            page,
            line,
            content: content.into(),
            reason: reason.into(),
        }
    }
}

/// A fully normalized statement line: signed amount (outflow negative),
/// canonical date, trimmed description. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub balance: Option<Money>,
}

impl CanonicalTransaction {
    /// Identity for duplicate collapsing. Balance is excluded: a re-emitted
    /// page-boundary row can carry a recomputed running balance while still
    /// being the same transaction.
    pub fn dedup_key(&self) -> (NaiveDate, String, i64) {
        (self.date, self.description.clone(), self.amount.to_cents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(d: NaiveDate, desc: &str, cents: i64) -> CanonicalTransaction {
        CanonicalTransaction {
            date: d,
            description: desc.to_string(),
            amount: Money::from_cents(cents),
            balance: None,
        }
    }

    #[test]
    fn dedup_key_ignores_balance() {
        let mut a = tx(date(2026, 1, 5), "HEROTEL", -84900);
        let mut b = a.clone();
        a.balance = Some(Money::from_cents(100_000));
        b.balance = Some(Money::from_cents(15_100));
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_distinguishes_description() {
        let a = tx(date(2026, 1, 5), "CARD FEE", -500);
        let b = tx(date(2026, 1, 5), "SMS FEE", -500);
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn raw_row_builder() {
        let row = RawRow::new("15 Dec", "HEROTEL", "849.00", 0, 12).with_balance("10 233.45");
        assert_eq!(row.balance_token.as_deref(), Some("10 233.45"));
        assert_eq!(row.page, 0);
        assert_eq!(row.line, 12);
    }
}
