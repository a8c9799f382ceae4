use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::pdf::{PdfError, PdfFile};
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{ExtractionMethod, RawPage, Table};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),
    #[error("image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("document yielded no extractable content")]
    Empty,
}

fn re_amount_token() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    // 1 234,56 / 1.234,56 / 1,234.56 / 849.00: any locale, two decimals.
    R.get_or_init(|| {
        Regex::new(r"\d{1,3}(?:[ ,.\u{A0}]\d{3})*[.,]\d{2}").expect("invalid regex")
    })
}

/// Pulls RawPages out of a statement PDF: native content first, OCR of the
/// embedded page scan when a page has nothing usable. One OCR attempt per
/// page with fixed preprocessing, so identical input gives identical
/// output.
pub struct DocumentExtractor<R: OcrBackend> {
    recognizer: R,
}

impl<R: OcrBackend> DocumentExtractor<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    pub fn extract(&self, data: &[u8]) -> Result<Vec<RawPage>, ExtractError> {
        let pdf = PdfFile::load(data)?;
        let mut pages = Vec::with_capacity(pdf.page_count());

        for index in 0..pdf.page_count() {
            let native = pdf.page_text(index)?;
            let lines: Vec<String> = native.lines().map(|l| l.to_string()).collect();

            if has_usable_native_content(&lines) {
                pages.push(native_page(index, lines));
                continue;
            }

            // Fail over to the page scan. A page with neither usable text
            // nor a scan image stays empty rather than aborting the
            // document; the Empty check below is document-level.
            match pdf.page_scan(index) {
                Some(scan) => {
                    debug!("page {index}: no usable native content, running OCR");
                    let png = preprocess::prepare_for_ocr(scan)?;
                    let text = self.recognizer.recognize(&png)?;
                    let ocr_lines: Vec<String> = text
                        .lines()
                        .map(|l| l.trim_end().to_string())
                        .filter(|l| !l.is_empty())
                        .collect();
                    pages.push(RawPage::text(index, ExtractionMethod::Ocr, ocr_lines));
                }
                None => {
                    debug!("page {index}: no native content and no page scan");
                    pages.push(native_page(index, lines));
                }
            }
        }

        if pages.iter().all(RawPage::is_empty) {
            return Err(ExtractError::Empty);
        }
        Ok(pages)
    }
}

/// Native text qualifies when it shows transaction shape (an amount-like
/// token) or enough prose to be a header/summary page worth keeping for
/// format and period detection. Scanned pages typically yield nothing.
fn has_usable_native_content(lines: &[String]) -> bool {
    let non_blank = lines.iter().filter(|l| !l.trim().is_empty()).count();
    if non_blank == 0 {
        return false;
    }
    if lines.iter().any(|l| re_amount_token().is_match(l)) {
        return true;
    }
    non_blank >= 3
}

fn native_page(index: usize, lines: Vec<String>) -> RawPage {
    let tables = recover_tables(&lines);
    let method = if tables.is_empty() {
        ExtractionMethod::NativeText
    } else {
        ExtractionMethod::NativeTable
    };
    RawPage {
        index,
        method,
        lines,
        tables,
    }
}

/// Recover a cell grid from column-aligned line runs. Only lines with
/// multi-space gaps are column candidates; masthead and footer prose is
/// single-spaced and must not disturb the alignment. Character columns
/// blank across every candidate line, in runs of 2+, become boundaries.
/// Emits one table per page at most; pages without 3+ aligned columns
/// over 3+ rows stay line-oriented.
fn recover_tables(lines: &[String]) -> Vec<Table> {
    let rows: Vec<&String> = lines
        .iter()
        .filter(|l| !l.trim().is_empty() && l.contains("  "))
        .collect();
    if rows.len() < 3 {
        return Vec::new();
    }

    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    if width == 0 {
        return Vec::new();
    }

    let mut blank = vec![true; width];
    for row in &rows {
        for (i, ch) in row.chars().enumerate() {
            if ch != ' ' && ch != '\u{A0}' {
                blank[i] = false;
            }
        }
    }

    // Runs of blank columns (2+ wide, not touching the left edge) split
    // the line into cells.
    let mut boundaries: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &b) in blank.iter().enumerate() {
        match (b, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(s)) => {
                if i - s >= 2 && s > 0 {
                    boundaries.push((s, i));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if boundaries.len() < 2 {
        return Vec::new();
    }

    let table: Table = rows
        .iter()
        .map(|row| split_at_boundaries(row, &boundaries))
        .collect();
    vec![table]
}

fn split_at_boundaries(line: &str, boundaries: &[(usize, usize)]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut cells = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0usize;
    for &(s, e) in boundaries {
        let end = s.min(chars.len());
        cells.push(chars[start.min(chars.len())..end].iter().collect::<String>().trim().to_string());
        start = e;
    }
    cells.push(chars[start.min(chars.len())..].iter().collect::<String>().trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn amount_token_matches_locales() {
        let re = re_amount_token();
        assert!(re.is_match("R 1,234.56"));
        assert!(re.is_match("1.234,56"));
        assert!(re.is_match("1 234,56"));
        assert!(re.is_match("849.00"));
        assert!(!re.is_match("no amounts here"));
        assert!(!re.is_match("ref 123456"));
    }

    #[test]
    fn blank_page_is_not_usable() {
        assert!(!has_usable_native_content(&lines(&["", "  "])));
    }

    #[test]
    fn single_amount_line_is_usable() {
        assert!(has_usable_native_content(&lines(&["01/12  FEE  849.00"])));
    }

    #[test]
    fn prose_header_page_is_usable() {
        assert!(has_usable_native_content(&lines(&[
            "Absa Bank Limited",
            "Cheque Account Statement",
            "Statement period 01 December 2025 to 31 January 2026",
        ])));
    }

    #[test]
    fn two_junk_lines_are_not_usable() {
        assert!(!has_usable_native_content(&lines(&["x", "y"])));
    }

    #[test]
    fn recover_tables_splits_aligned_columns() {
        let table_lines = lines(&[
            "01/12   HEROTEL PAYMENT      849.00     10 233.45",
            "03/12   CARD FEE               5.50     10 227.95",
            "15/12   EFT SALARY          8 000.00    18 227.95",
        ]);
        let tables = recover_tables(&table_lines);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.len(), 3);
        assert_eq!(table[0][0], "01/12");
        assert!(table[0][1].contains("HEROTEL"));
        assert_eq!(table[1][2], "5.50");
    }

    #[test]
    fn recover_tables_requires_three_rows() {
        let two = lines(&[
            "01/12   FEE    5.50",
            "02/12   FEE    6.50",
        ]);
        assert!(recover_tables(&two).is_empty());
    }

    #[test]
    fn masthead_prose_does_not_break_table_recovery() {
        let mixed = lines(&[
            "Absa Bank Limited, authorised financial services provider",
            "01/12   HEROTEL PAYMENT      849.00     10 233.45",
            "03/12   CARD FEE               5.50     10 227.95",
            "15/12   EFT SALARY          8 000.00    18 227.95",
        ]);
        let tables = recover_tables(&mixed);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
    }

    #[test]
    fn unaligned_prose_yields_no_table() {
        let prose = lines(&[
            "This statement covers the period above.",
            "Please verify every entry and report discrepancies",
            "to the branch within thirty days of receipt.",
        ]);
        assert!(recover_tables(&prose).is_empty());
    }

    #[test]
    fn extract_propagates_parse_error_for_garbage() {
        use crate::recognizer::MockRecognizer;
        let ex = DocumentExtractor::new(MockRecognizer::new(""));
        assert!(matches!(ex.extract(b"garbage"), Err(ExtractError::Pdf(_))));
    }
}
