use std::collections::HashSet;

use chrono::NaiveDate;

use concorda_core::{CanonicalTransaction, RawRow, SkippedRow};

use crate::normalize::{normalize_amount, normalize_date, YearResolution};

/// The assembler's verdict on a batch of raw rows: canonical transactions,
/// the rows it had to give up on, and document-level warnings.
#[derive(Debug, Default)]
pub struct AssembleOutput {
    pub transactions: Vec<CanonicalTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<String>,
}

/// Convert raw rows to canonical transactions: normalize tokens, validate
/// structure, and collapse exact duplicates.
///
/// Deduplication is deliberately conservative: only rows identical in
/// (date, description, amount) collapse, keeping the first occurrence.
/// Statement renderers re-emit a boundary row on both the page it started
/// and the page it continues onto; two merely similar rows (say, two
/// identical fees with different descriptions) are distinct charges and
/// both survive.
pub fn assemble(rows: Vec<RawRow>, years: &YearResolution) -> AssembleOutput {
    let mut out = AssembleOutput::default();
    let mut seen: HashSet<(NaiveDate, String, i64)> = HashSet::new();

    for row in rows {
        let date = match normalize_date(&row.date_token, years) {
            Ok(d) => d,
            Err(e) => {
                out.skipped
                    .push(SkippedRow::new(row.page, row.line, describe(&row), e.to_string()));
                continue;
            }
        };

        let amount = match normalize_amount(&row.amount_token) {
            Ok(a) => a,
            Err(e) => {
                out.skipped
                    .push(SkippedRow::new(row.page, row.line, describe(&row), e.to_string()));
                continue;
            }
        };

        let description = row.description.trim().to_string();
        if description.is_empty() {
            out.skipped.push(SkippedRow::new(
                row.page,
                row.line,
                describe(&row),
                "empty description",
            ));
            continue;
        }

        // A balance that fails to normalize degrades to None; the
        // transaction itself is still sound.
        let balance = match &row.balance_token {
            Some(token) => match normalize_amount(token) {
                Ok(b) => Some(b),
                Err(_) => {
                    out.warnings.push(format!(
                        "page {} line {}: unparseable balance token '{}'",
                        row.page, row.line, token
                    ));
                    None
                }
            },
            None => None,
        };

        let tx = CanonicalTransaction {
            date,
            description,
            amount,
            balance,
        };

        if seen.insert(tx.dedup_key()) {
            out.transactions.push(tx);
        }
    }

    out
}

fn describe(row: &RawRow) -> String {
    format!("{} {} {}", row.date_token, row.description, row.amount_token)
}
