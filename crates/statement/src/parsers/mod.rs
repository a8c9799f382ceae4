mod absa;
mod capitec;
mod fnb;
mod standard;

pub use absa::AbsaParser;
pub use capitec::CapitecParser;
pub use fnb::FnbParser;
pub use standard::StandardBankParser;

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use concorda_core::{BankFormat, RawRow, SkippedRow};
use concorda_extract::RawPage;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        pub(crate) fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(
    re_amount,
    r"(?i)\(?(?:R\s?)?\d{1,3}(?:[ ,.\u{A0}]\d{3})*[.,]\d{2}\)?(?:\s?(?:Cr|Dr|C|D)\b)?-?"
);
re!(
    re_leading_date,
    r"^\s*(\d{4}-\d{2}-\d{2}|\d{1,2}[/\-.]\d{1,2}(?:[/\-.]\d{2,4})?|\d{1,2}\s+[A-Za-z]{3,9}\.?(?:\s+\d{4})?)\b"
);

/// Lines carrying one of these and no currency amount are boilerplate and
/// dropped before row assembly. A genuine transaction whose description
/// happens to contain a banner word survives because it carries an amount.
pub(crate) static SKIP_KEYWORDS: &[&str] = &[
    "balance brought forward",
    "balance carried forward",
    "opening balance",
    "closing balance",
    "statement period",
    "statement number",
    "page ",
    "date description",
    "description amount",
    "debit credit",
    "vat registration",
    "registered credit provider",
    "authorised financial services",
    "customer care",
    "terms and conditions",
    "continued on next page",
];

pub(crate) fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    SKIP_KEYWORDS.iter().any(|k| lower.contains(k)) && !re_amount().is_match(line)
}

/// One amount-like token with its span in the source line.
#[derive(Debug, Clone)]
pub(crate) struct AmountToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub(crate) fn amount_tokens(line: &str) -> Vec<AmountToken> {
    re_amount()
        .find_iter(line)
        .map(|m| AmountToken {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Group amount tokens into clusters separated only by whitespace. One
/// cluster is one logical row's money columns (amount, then balance when
/// present); a second cluster on the same line means the source table row
/// wrapped and the line holds another transaction.
pub(crate) fn amount_clusters(line: &str) -> Vec<Vec<AmountToken>> {
    let tokens = amount_tokens(line);
    let mut clusters: Vec<Vec<AmountToken>> = Vec::new();
    for tok in tokens {
        let adjacent = clusters.last().is_some_and(|cluster| {
            let prev_end = cluster.last().map(|t| t.end).unwrap_or(0);
            line[prev_end..tok.start].chars().all(char::is_whitespace)
        });
        if adjacent {
            clusters.last_mut().unwrap().push(tok);
        } else {
            clusters.push(vec![tok]);
        }
    }
    clusters
}

/// Split a leading date token off a text fragment.
pub(crate) fn leading_date(fragment: &str) -> Option<(String, &str)> {
    let cap = re_leading_date().captures(fragment)?;
    let m = cap.get(1)?;
    Some((m.as_str().to_string(), &fragment[m.end()..]))
}

pub(crate) fn clean_description(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Parser contract ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ParsedPage {
    pub rows: Vec<RawRow>,
    pub skipped: Vec<SkippedRow>,
}

impl ParsedPage {
    /// A page that plainly held transaction-shaped lines but produced
    /// neither rows nor skip records contradicts the assumed layout.
    pub(crate) fn check_mismatch(
        self,
        page: &RawPage,
        format: BankFormat,
        candidates: usize,
    ) -> Result<ParsedPage, LayoutMismatch> {
        if candidates > 0 && self.rows.is_empty() && self.skipped.is_empty() {
            return Err(LayoutMismatch { page: page.index, format });
        }
        Ok(self)
    }
}

#[derive(Debug, Error)]
#[error("page {page} does not match the {format} layout")]
pub struct LayoutMismatch {
    pub page: usize,
    pub format: BankFormat,
}

/// Turns one extracted page into raw rows. Implementations never fail on
/// an individual malformed row; they record a `SkippedRow` and continue.
pub trait RowParser: Send + Sync {
    fn format(&self) -> BankFormat;
    fn parse_page(&self, page: &RawPage) -> Result<ParsedPage, LayoutMismatch>;
}

static ABSA: AbsaParser = AbsaParser;
static CAPITEC: CapitecParser = CapitecParser;
static FNB: FnbParser = FnbParser;
static STANDARD: StandardBankParser = StandardBankParser;

/// The closed parser set: one strategy per known format, selected once per
/// document. `Unknown` has no parser; callers surface a typed error
/// instead of guessing a layout.
pub fn parser_for(format: BankFormat) -> Option<&'static dyn RowParser> {
    match format {
        BankFormat::Absa => Some(&ABSA),
        BankFormat::Capitec => Some(&CAPITEC),
        BankFormat::Fnb => Some(&FNB),
        BankFormat::StandardBank => Some(&STANDARD),
        BankFormat::Unknown => None,
    }
}
