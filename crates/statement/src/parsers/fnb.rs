use std::sync::OnceLock;

use regex::Regex;

use concorda_core::{BankFormat, RawRow, SkippedRow};
use concorda_extract::RawPage;

use super::{
    amount_clusters, clean_description, is_noise, leading_date, LayoutMismatch, ParsedPage,
    RowParser,
};

fn re_sequence_prefix() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^\s*(\d{1,6})\s+(.*)$").expect("invalid regex"))
}

/// FNB statements prefix every row with an incrementing entry number.
/// The prefix looks like a day-of-month, so rows are read date-first and
/// only reinterpreted as numbered when the line itself does not start with
/// a date. The entry number must never be parsed as a date or an amount.
pub struct FnbParser;

impl RowParser for FnbParser {
    fn format(&self) -> BankFormat {
        BankFormat::Fnb
    }

    fn parse_page(&self, page: &RawPage) -> Result<ParsedPage, LayoutMismatch> {
        let mut out = ParsedPage::default();
        let mut candidates = 0usize;

        for (li, line) in page.lines.iter().enumerate() {
            if line.trim().is_empty() || is_noise(line) {
                continue;
            }
            let clusters = amount_clusters(line);
            if clusters.is_empty() {
                continue;
            }
            candidates += 1;

            let cluster = &clusters[0];
            let head = &line[..cluster[0].start];

            let dated = match leading_date(head) {
                Some(hit) => Some(hit),
                None => strip_sequence_number(head),
            };
            let Some((date, description)) = dated else {
                out.skipped.push(SkippedRow::new(
                    page.index,
                    li,
                    line.clone(),
                    "no date token after entry number",
                ));
                continue;
            };

            let mut row = RawRow::new(
                date,
                clean_description(description),
                cluster[0].text.clone(),
                page.index,
                li,
            );
            if cluster.len() > 1 {
                row = row.with_balance(cluster[cluster.len() - 1].text.clone());
            }
            out.rows.push(row);
        }

        out.check_mismatch(page, BankFormat::Fnb, candidates)
    }
}

/// Drop a leading entry number, but only when a real date follows it.
/// `"112 15 Dec …"` is entry 112 on 15 Dec; `"112 456.00"` is not a dated
/// row at all and must not become the 112th of anything.
fn strip_sequence_number(head: &str) -> Option<(String, &str)> {
    let cap = re_sequence_prefix().captures(head)?;
    let rest = cap.get(2)?;
    leading_date(rest.as_str()).map(|(date, desc)| {
        // Re-anchor the description slice into `head`.
        let consumed = rest.as_str().len() - desc.len();
        (date, &head[rest.start() + consumed..])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use concorda_extract::ExtractionMethod;

    fn page(lines: &[&str]) -> RawPage {
        RawPage::text(
            0,
            ExtractionMethod::NativeText,
            lines.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn numbered_rows_drop_the_entry_number() {
        let p = page(&["112 15 Dec Magtape Debit Herotel 849.00- 10 233.45"]);
        let parsed = FnbParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        let row = &parsed.rows[0];
        assert_eq!(row.date_token, "15 Dec");
        assert_eq!(row.description, "Magtape Debit Herotel");
        assert_eq!(row.amount_token, "849.00-");
        assert_eq!(row.balance_token.as_deref(), Some("10 233.45"));
    }

    #[test]
    fn unnumbered_date_first_rows_parse() {
        let p = page(&["15 Dec Monthly Account Fee 119.00- 10 114.45"]);
        let parsed = FnbParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows[0].date_token, "15 Dec");
        assert_eq!(parsed.rows[0].description, "Monthly Account Fee");
    }

    #[test]
    fn sequence_number_is_not_a_date() {
        // "112 456.00" must not parse as a day-112 row.
        let p = page(&["112 456.00"]);
        let parsed = FnbParser.parse_page(&p).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn sequence_number_is_not_an_amount() {
        let p = page(&["7 16 Dec FNB App Prepaid Airtime 99.00- 10 015.45"]);
        let parsed = FnbParser.parse_page(&p).unwrap();
        let row = &parsed.rows[0];
        assert_eq!(row.date_token, "16 Dec");
        assert_eq!(row.amount_token, "99.00-");
        assert!(!row.description.contains('7'));
    }

    #[test]
    fn credit_rows_without_trailing_minus() {
        let p = page(&["113 20 Dec FNB OB Pmt Salary 12 500.00 22 515.45"]);
        let parsed = FnbParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows[0].amount_token, "12 500.00");
        assert_eq!(parsed.rows[0].balance_token.as_deref(), Some("22 515.45"));
    }

    #[test]
    fn noise_lines_skipped_silently() {
        let p = page(&[
            "First National Bank",
            "Page 1 of 3",
            "112 15 Dec Herotel 849.00- 10 233.45",
        ]);
        let parsed = FnbParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.skipped.is_empty());
    }
}
