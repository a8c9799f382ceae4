use concorda_core::{BankFormat, RawRow, SkippedRow};
use concorda_extract::RawPage;

use super::{
    amount_clusters, clean_description, is_noise, leading_date, LayoutMismatch, ParsedPage,
    RowParser,
};

/// Standard Bank statements lead each row with a day-month date and print
/// the date once per day group. Under OCR the source table rows wrap, so a
/// single recovered line can hold several logical transactions; each
/// amount group is paired with the nearest preceding description fragment.
pub struct StandardBankParser;

impl RowParser for StandardBankParser {
    fn format(&self) -> BankFormat {
        BankFormat::StandardBank
    }

    fn parse_page(&self, page: &RawPage) -> Result<ParsedPage, LayoutMismatch> {
        let mut out = ParsedPage::default();
        let mut candidates = 0usize;
        let mut current_date: Option<String> = None;

        for (li, line) in page.lines.iter().enumerate() {
            if line.trim().is_empty() || is_noise(line) {
                continue;
            }
            let clusters = amount_clusters(line);
            if clusters.is_empty() {
                // A bare date opens a day group for the lines below it.
                if let Some((date, rest)) = leading_date(line) {
                    if rest.trim().is_empty() {
                        current_date = Some(date);
                    }
                }
                continue;
            }
            candidates += 1;

            let mut segment_start = 0usize;
            for cluster in &clusters {
                let segment = &line[segment_start..cluster[0].start];
                segment_start = cluster.last().map(|t| t.end).unwrap_or(segment_start);

                let (date, description) = match leading_date(segment) {
                    Some((d, rest)) => {
                        current_date = Some(d.clone());
                        (d, clean_description(rest))
                    }
                    None => match &current_date {
                        Some(d) => (d.clone(), clean_description(segment)),
                        None => {
                            out.skipped.push(SkippedRow::new(
                                page.index,
                                li,
                                line.clone(),
                                "amount group without a date in reach",
                            ));
                            continue;
                        }
                    },
                };

                let mut row =
                    RawRow::new(date, description, cluster[0].text.clone(), page.index, li);
                if cluster.len() > 1 {
                    row = row.with_balance(cluster[cluster.len() - 1].text.clone());
                }
                out.rows.push(row);
            }
        }

        out.check_mismatch(page, BankFormat::StandardBank, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concorda_extract::ExtractionMethod;

    fn page(lines: &[&str]) -> RawPage {
        RawPage::text(
            0,
            ExtractionMethod::Ocr,
            lines.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn single_transaction_lines() {
        let p = page(&[
            "15 Dec ELECTRONIC TRANSFER HEROTEL 849.00 18 227.95",
            "16 Dec FEE CHEQUE CARD 5.50 18 222.45",
        ]);
        let parsed = StandardBankParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].date_token, "15 Dec");
        assert_eq!(parsed.rows[0].description, "ELECTRONIC TRANSFER HEROTEL");
        assert_eq!(parsed.rows[0].amount_token, "849.00");
        assert_eq!(parsed.rows[0].balance_token.as_deref(), Some("18 227.95"));
    }

    #[test]
    fn wrapped_ocr_line_splits_into_two_rows() {
        let p = page(&[
            "15 Dec FEE CASH WITHDRAWAL 42.00 18 185.95 16 Dec CARD PURCHASE ENGEN 520.00 17 665.95",
        ]);
        let parsed = StandardBankParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].date_token, "15 Dec");
        assert_eq!(parsed.rows[0].description, "FEE CASH WITHDRAWAL");
        assert_eq!(parsed.rows[0].amount_token, "42.00");
        assert_eq!(parsed.rows[1].date_token, "16 Dec");
        assert_eq!(parsed.rows[1].description, "CARD PURCHASE ENGEN");
        assert_eq!(parsed.rows[1].amount_token, "520.00");
    }

    #[test]
    fn wrapped_fragment_without_date_inherits_nearest_preceding() {
        let p = page(&["17 Dec DEBIT ORDER INSURANCE 250.00 17 415.95 DEBIT ORDER MEDICAL 1 200.00 16 215.95"]);
        let parsed = StandardBankParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].date_token, "17 Dec");
        assert_eq!(parsed.rows[1].description, "DEBIT ORDER MEDICAL");
        assert_eq!(parsed.rows[1].amount_token, "1 200.00");
    }

    #[test]
    fn day_group_date_carries_across_lines() {
        let p = page(&[
            "18 Dec",
            "ATM WITHDRAWAL BRANCH 400.00 15 815.95",
            "PREPAID ELECTRICITY 300.00 15 515.95",
        ]);
        let parsed = StandardBankParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert!(parsed.rows.iter().all(|r| r.date_token == "18 Dec"));
    }

    #[test]
    fn amounts_before_any_date_are_skipped() {
        let p = page(&["MYSTERY CHARGE 99.00 10 000.00"]);
        let parsed = StandardBankParser.parse_page(&p).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn banner_with_amount_is_kept() {
        // Contains a skip keyword but also a currency amount: must not be
        // silently dropped.
        let p = page(&["19 Dec PAGE SUBSCRIPTION RENEWAL 89.00 15 426.95"]);
        let parsed = StandardBankParser.parse_page(&p).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].description, "PAGE SUBSCRIPTION RENEWAL");
    }
}
