use concorda_core::{BankFormat, RawRow, SkippedRow};
use concorda_extract::RawPage;

use super::{
    amount_clusters, clean_description, is_noise, leading_date, LayoutMismatch, ParsedPage,
    RowParser,
};

/// Capitec statements are line-oriented: a transaction date and a posting
/// date lead each row, the money columns trail with `Cr`/`Dr` markers.
/// The transaction date (first of the pair) is the canonical one.
pub struct CapitecParser;

impl RowParser for CapitecParser {
    fn format(&self) -> BankFormat {
        BankFormat::Capitec
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

            let Some((date, rest)) = leading_date(head) else {
                out.skipped.push(SkippedRow::new(
                    page.index,
                    li,
                    line.clone(),
                    "no transaction date at line start",
                ));
                continue;
            };

            // The posting date follows immediately; it reflects when the
            // bank settled the entry and is dropped.
            let description = match leading_date(rest.trim_start()) {
                Some((_posting, after)) => after,
                None => rest,
            };

            let description = clean_description(description);
            let mut row = RawRow::new(date, description, cluster[0].text.clone(), page.index, li);
            if let Some(balance) = cluster.last().filter(|_| cluster.len() > 1) {
                row = row.with_balance(balance.text.clone());
            }
            out.rows.push(row);

            // Anything after the first money column pair is not part of
            // this layout; surface it instead of inventing a row.
            if clusters.len() > 1 {
                out.skipped.push(SkippedRow::new(
                    page.index,
                    li,
                    line.clone(),
                    "unexpected trailing amount group",
                ));
            }
        }

        out.check_mismatch(page, BankFormat::Capitec, candidates)
    }
}
