use thiserror::Error;
use tracing::debug;

use concorda_core::{BankFormat, CanonicalTransaction, DateRange, SkippedRow};
use concorda_extract::{DocumentExtractor, ExtractError, OcrBackend, RawPage};

use crate::assemble::assemble;
use crate::detect::detect_from_pages;
use crate::normalize::resolve_year;
use crate::parsers::{parser_for, LayoutMismatch};

/// Caller-supplied knowledge about the document. Both hints are optional;
/// a format hint bypasses detection entirely (the shell may know the bank
/// from account metadata), a year hint only applies when the document
/// itself reveals no statement period.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub format_hint: Option<BankFormat>,
    pub year_hint: Option<i32>,
}

/// Everything one parse invocation produces. Plain data, no side effects:
/// the caller decides what to persist and what to surface.
#[derive(Debug)]
pub struct StatementParse {
    pub transactions: Vec<CanonicalTransaction>,
    pub format: BankFormat,
    pub statement_year: Option<i32>,
    pub period: Option<DateRange>,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("no bank signature matched; refusing to guess a layout")]
    UnknownFormat,
    #[error(transparent)]
    Layout(#[from] LayoutMismatch),
    #[error("document yielded no transactions ({skipped} rows skipped)")]
    NoTransactions { skipped: usize },
}

/// The single blocking entry point: document bytes in, canonical
/// transactions out. Extraction, detection, row parsing, normalization and
/// assembly run strictly in sequence; each stage needs the previous
/// stage's full output.
pub fn parse_statement<R: OcrBackend>(
    data: &[u8],
    options: &ParseOptions,
    recognizer: R,
) -> Result<StatementParse, ParseError> {
    let extractor = DocumentExtractor::new(recognizer);
    let pages = extractor.extract(data)?;
    parse_pages(&pages, options)
}

/// Same pipeline from pre-extracted pages. This is the seam tests use and
/// the entry the shell calls when extraction already happened elsewhere.
pub fn parse_pages(pages: &[RawPage], options: &ParseOptions) -> Result<StatementParse, ParseError> {
    let format = match options.format_hint {
        Some(hint) => hint,
        None => detect_from_pages(pages),
    };
    debug!(format = format.code(), pages = pages.len(), "parsing statement");

    let parser = parser_for(format).ok_or(ParseError::UnknownFormat)?;
    let years = resolve_year(pages, options.year_hint);

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for page in pages {
        let parsed = parser.parse_page(page)?;
        rows.extend(parsed.rows);
        skipped.extend(parsed.skipped);
    }

    let assembled = assemble(rows, &years);
    skipped.extend(assembled.skipped);

    let mut warnings = assembled.warnings;
    if let Some(w) = &years.warning {
        warnings.push(w.clone());
    }

    if assembled.transactions.is_empty() {
        return Err(ParseError::NoTransactions { skipped: skipped.len() });
    }

    Ok(StatementParse {
        transactions: assembled.transactions,
        format,
        statement_year: years.statement_year(),
        period: years.period.map(|p| p.range()),
        skipped,
        warnings,
    })
}
