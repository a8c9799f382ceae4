use concorda_core::{BankFormat, RawRow, SkippedRow};
use concorda_extract::{RawPage, Table};

use super::{
    amount_clusters, clean_description, is_noise, leading_date, re_amount, LayoutMismatch,
    ParsedPage, RowParser,
};

/// Absa cheque-account statements render a four-column table: date,
/// description, amount, balance. The renderer merges a day's transactions
/// into multi-line description/amount cells against a single date line, so
/// one table row can hold several transactions.
pub struct AbsaParser;

impl RowParser for AbsaParser {
    fn format(&self) -> BankFormat {
        BankFormat::Absa
    }

    fn parse_page(&self, page: &RawPage) -> Result<ParsedPage, LayoutMismatch> {
        let mut out = ParsedPage::default();
        let mut candidates = 0usize;

        if page.tables.is_empty() {
            parse_lines(page, &mut out, &mut candidates);
        } else {
            for table in &page.tables {
                parse_table(page, table, &mut out, &mut candidates);
            }
        }

        out.check_mismatch(page, BankFormat::Absa, candidates)
    }
}

fn parse_table(page: &RawPage, table: &Table, out: &mut ParsedPage, candidates: &mut usize) {
    let mut current_date: Option<String> = None;

    for (ri, cells) in table.iter().enumerate() {
        let cells: Vec<&str> = cells.iter().map(|c| c.trim()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let joined = cells.join("  ");
        if is_noise(&joined) || is_header_row(&cells) {
            continue;
        }
        if re_amount().is_match(&joined) {
            *candidates += 1;
        }

        // A merged cell carries one physical line per transaction; fan the
        // row out and re-pair description and amount lines positionally.
        let depth = cells.iter().map(|c| c.lines().count()).max().unwrap_or(1);
        for sub in 0..depth {
            let sub_cells: Vec<&str> = cells
                .iter()
                .map(|c| c.lines().nth(sub).unwrap_or("").trim())
                .collect();
            emit_row(page, ri, &sub_cells, &mut current_date, out);
        }
    }
}

fn is_header_row(cells: &[&str]) -> bool {
    let first = cells.first().map(|c| c.to_lowercase()).unwrap_or_default();
    first == "date" || first == "datum"
}

fn emit_row(
    page: &RawPage,
    line: usize,
    cells: &[&str],
    current_date: &mut Option<String>,
    out: &mut ParsedPage,
) {
    if cells.iter().all(|c| c.is_empty()) {
        return;
    }

    let date = match cells.first().filter(|c| !c.is_empty()) {
        Some(d) => {
            *current_date = Some(d.to_string());
            d.to_string()
        }
        // Continuation rows inherit the group's date.
        None => match current_date {
            Some(d) => d.clone(),
            None => {
                out.skipped.push(SkippedRow::new(
                    page.index,
                    line,
                    cells.join(" | "),
                    "row without a date and no preceding dated row",
                ));
                return;
            }
        },
    };

    let (description, amount, balance) = match cells.len() {
        0 | 1 | 2 => {
            out.skipped.push(SkippedRow::new(
                page.index,
                line,
                cells.join(" | "),
                "too few columns for a transaction row",
            ));
            return;
        }
        3 => (cells[1].to_string(), cells[2], None),
        n => (
            cells[1..n - 2].join(" "),
            cells[n - 2],
            Some(cells[n - 1]).filter(|c| !c.is_empty()),
        ),
    };

    if amount.is_empty() {
        // Date-only sub-line of a merged group; nothing to emit, nothing
        // to report.
        if description.trim().is_empty() {
            return;
        }
        out.skipped.push(SkippedRow::new(
            page.index,
            line,
            cells.join(" | "),
            "missing amount column",
        ));
        return;
    }

    let mut row = RawRow::new(date, clean_description(&description), amount, page.index, line);
    if let Some(b) = balance {
        row = row.with_balance(b);
    }
    out.rows.push(row);
}

/// OCR fallback: the table structure is gone, so rows are recovered from
/// raw lines. Absa lines hold exactly one transaction; a line with more
/// than one amount group is reported rather than guessed at.
fn parse_lines(page: &RawPage, out: &mut ParsedPage, candidates: &mut usize) {
    let mut current_date: Option<String> = None;

    for (li, line) in page.lines.iter().enumerate() {
        if line.trim().is_empty() || is_noise(line) {
            continue;
        }
        let clusters = amount_clusters(line);
        if clusters.is_empty() {
            if let Some((date, rest)) = leading_date(line) {
                if rest.trim().is_empty() {
                    current_date = Some(date);
                }
            }
            continue;
        }
        *candidates += 1;

        if clusters.len() > 1 {
            out.skipped.push(SkippedRow::new(
                page.index,
                li,
                line.clone(),
                "multiple amount groups on one line",
            ));
            continue;
        }

        let cluster = &clusters[0];
        let head = &line[..cluster[0].start];
        let (date, description) = match leading_date(head) {
            Some((d, rest)) => {
                current_date = Some(d.clone());
                (d, rest)
            }
            None => match &current_date {
                Some(d) => (d.clone(), head),
                None => {
                    out.skipped.push(SkippedRow::new(
                        page.index,
                        li,
                        line.clone(),
                        "no date token before amount",
                    ));
                    continue;
                }
            },
        };

        let mut row = RawRow::new(
            date,
            clean_description(description),
            cluster[0].text.clone(),
            page.index,
            li,
        );
        if let Some(balance) = cluster.get(1) {
            row = row.with_balance(balance.text.clone());
        }
        out.rows.push(row);
    }
}
