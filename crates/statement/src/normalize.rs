use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use concorda_core::{Money, StatementPeriod};
use concorda_extract::RawPage;

use crate::detect::DETECTION_PAGES;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("invalid date: '{0}'")]
    InvalidDate(String),
    #[error("cannot resolve year for '{0}': no statement period, year token or hint")]
    UnresolvedYear(String),
}

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date_iso, r"\b(\d{4})-(\d{2})-(\d{2})\b");
re!(re_date_slash_full, r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})\b");
re!(
    re_date_textual_full,
    r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{4})\b"
);
re!(re_day_month_numeric, r"^(\d{1,2})[/\-. ](\d{1,2})$");
re!(
    re_day_month_name,
    r"(?i)^(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?$"
);
re!(re_year_token, r"\b((?:19|20)\d{2})\b");
re!(re_period_line, r"(?i)\b(?:statement\s+period|period|from)\b");

// ── Amount normalization ─────────────────────────────────────────────────────

/// Normalize a locale-variant amount token into a signed two-decimal
/// `Money`. Handles `1,234.56`, `1.234,56`, `1 234,56`, currency prefixes,
/// parenthesis negatives, trailing `C`/`Cr`/`D`/`Dr` markers and trailing
/// minus. Idempotent: feeding the rendered output back in returns the same
/// value.
pub fn normalize_amount(token: &str) -> Result<Money, NormalizeError> {
    let original = token;
    let mut s = token.trim();
    if s.is_empty() {
        return Err(NormalizeError::InvalidAmount(original.to_string()));
    }

    let mut negative = false;

    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = s[1..s.len() - 1].trim();
    }

    // Trailing debit/credit markers. Credit is explicit positive; debit
    // forces negative even after parentheses were seen.
    let lower = s.to_lowercase();
    if let Some(stripped) = strip_suffix_marker(&lower, &["cr", "c"]) {
        s = &s[..stripped];
        negative = false;
    } else if let Some(stripped) = strip_suffix_marker(&lower, &["dr", "d"]) {
        s = &s[..stripped];
        negative = true;
    }
    s = s.trim_end();

    if let Some(rest) = s.strip_suffix('-') {
        negative = true;
        s = rest.trim_end();
    }

    // Currency prefixes.
    for prefix in ["ZAR", "zar", "R", "r", "£", "$", "€"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start();
            break;
        }
    }

    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }

    let cleaned = resolve_separators(s)
        .ok_or_else(|| NormalizeError::InvalidAmount(original.to_string()))?;
    let mut dec = Decimal::from_str(&cleaned)
        .map_err(|_| NormalizeError::InvalidAmount(original.to_string()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}

fn strip_suffix_marker(lower: &str, markers: &[&str]) -> Option<usize> {
    for m in markers {
        if let Some(head) = lower.strip_suffix(m) {
            // The marker must follow a digit (possibly with a space),
            // never bite into a word.
            let head = head.trim_end();
            if head.ends_with(|c: char| c.is_ascii_digit()) {
                return Some(head.len());
            }
        }
    }
    None
}

/// Collapse grouping separators and pin the decimal separator to `.`.
/// Spaces and non-breaking spaces always group. A separator that occurs
/// more than once groups; a single separator is decimal only when exactly
/// two digits follow it.
fn resolve_separators(s: &str) -> Option<String> {
    let compact: String = s.chars().filter(|c| *c != ' ' && *c != '\u{A0}').collect();
    if compact.is_empty() {
        return None;
    }

    let decimal_sep = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(d), None) => single_separator_role(&compact, '.', d),
        (None, Some(c)) => single_separator_role(&compact, ',', c),
        (None, None) => None,
    };

    let mut out = String::with_capacity(compact.len());
    for ch in compact.chars() {
        match ch {
            '.' | ',' => {
                if Some(ch) == decimal_sep {
                    out.push('.');
                }
            }
            c if c.is_ascii_digit() => out.push(c),
            _ => return None,
        }
    }

    // Reject strings that were all separators, and double decimals that
    // survived (e.g. "1.2.3" with both dots claimed decimal cannot occur,
    // but "." alone can).
    if out.is_empty() || !out.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(out)
}

fn single_separator_role(compact: &str, sep: char, last_idx: usize) -> Option<char> {
    let occurrences = compact.matches(sep).count();
    if occurrences > 1 {
        return None; // repeated → grouping
    }
    let digits_after = compact.len() - last_idx - 1;
    if digits_after == 2 {
        Some(sep)
    } else {
        None // 1.234 style grouping, or trailing junk
    }
}

// ── Year resolution ──────────────────────────────────────────────────────────

/// Document-level year evidence, computed once per document so every row
/// resolves months consistently.
#[derive(Debug, Clone)]
pub struct YearResolution {
    pub period: Option<StatementPeriod>,
    pub year: Option<i32>,
    pub warning: Option<String>,
}

impl YearResolution {
    pub fn from_period(period: StatementPeriod) -> Self {
        YearResolution { period: Some(period), year: None, warning: None }
    }

    pub fn from_year(year: i32) -> Self {
        YearResolution { period: None, year: Some(year), warning: None }
    }

    pub fn year_for_month(&self, month: u32) -> Option<i32> {
        self.period.map(|p| p.year_for_month(month)).or(self.year)
    }

    pub fn statement_year(&self) -> Option<i32> {
        self.period.map(|p| p.range().start.year()).or(self.year)
    }
}

/// Derive the document's year evidence from its leading pages. Priority:
/// an explicit statement period (two full dates on a period-marked line,
/// or two full dates anywhere in the header span), then the caller's
/// hint, then the most frequent year token with a document warning.
pub fn resolve_year(pages: &[RawPage], hint: Option<i32>) -> YearResolution {
    let header: Vec<&str> = pages
        .iter()
        .take(DETECTION_PAGES)
        .flat_map(|p| p.lines.iter())
        .map(|l| l.as_str())
        .collect();

    // A line announcing the period with two parseable dates is
    // authoritative; rollover handling needs both endpoint years.
    for line in &header {
        if re_period_line().is_match(line) {
            let dates = full_dates_in(line);
            if dates.len() >= 2 && dates[0] <= dates[1] {
                return YearResolution::from_period(StatementPeriod::new(dates[0], dates[1]));
            }
        }
    }

    let all_dates: Vec<NaiveDate> = header.iter().flat_map(|l| full_dates_in(l)).collect();
    if all_dates.len() >= 2 {
        let min = *all_dates.iter().min().unwrap();
        let max = *all_dates.iter().max().unwrap();
        // Sanity: statements cover at most around a year.
        if min < max && (max - min).num_days() <= 370 {
            return YearResolution::from_period(StatementPeriod::new(min, max));
        }
    }

    if let Some(year) = hint {
        return YearResolution::from_year(year);
    }

    let mut counts: std::collections::HashMap<i32, usize> = std::collections::HashMap::new();
    for line in &header {
        for cap in re_year_token().captures_iter(line) {
            if let Ok(y) = cap[1].parse::<i32>() {
                *counts.entry(y).or_insert(0) += 1;
            }
        }
    }
    if let Some((&year, _)) = counts.iter().max_by_key(|(y, c)| (**c, -**y)) {
        return YearResolution {
            period: None,
            year: Some(year),
            warning: Some(format!(
                "statement period not found; applying most frequent year {year} to all rows"
            )),
        };
    }

    YearResolution {
        period: None,
        year: None,
        warning: Some("no statement period or year evidence found in document".to_string()),
    }
}

/// Every full date found in a piece of text, in order of appearance.
fn full_dates_in(text: &str) -> Vec<NaiveDate> {
    let mut found: Vec<(usize, NaiveDate)> = Vec::new();

    for cap in re_date_iso().captures_iter(text) {
        let (y, m, d) = (cap[1].parse(), cap[2].parse(), cap[3].parse());
        if let (Ok(y), Ok(m), Ok(d)) = (y, m, d) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                found.push((cap.get(0).unwrap().start(), date));
            }
        }
    }
    for cap in re_date_textual_full().captures_iter(text) {
        let day: Option<u32> = cap[1].parse().ok();
        let month = month_from_name(&cap[2]);
        let year: Option<i32> = cap[3].parse().ok();
        if let (Some(d), Some(m), Some(y)) = (day, month, year) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                found.push((cap.get(0).unwrap().start(), date));
            }
        }
    }
    for cap in re_date_slash_full().captures_iter(text) {
        let d: Option<u32> = cap[1].parse().ok();
        let m: Option<u32> = cap[2].parse().ok();
        let y: Option<i32> = cap[3].parse().ok().map(expand_year);
        if let (Some(d), Some(m), Some(y)) = (d, m, y) {
            // Skip fragments already matched as ISO dates.
            let start = cap.get(0).unwrap().start();
            if found.iter().any(|(s, _)| *s == start || start > *s && start < *s + 10) {
                continue;
            }
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                found.push((start, date));
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, d)| d).collect()
}

// ── Date normalization ───────────────────────────────────────────────────────

/// Resolve one row's date token against the document's year evidence.
/// Tokens carrying their own year never consult the resolution.
pub fn normalize_date(token: &str, years: &YearResolution) -> Result<NaiveDate, NormalizeError> {
    let s = token.trim();
    if s.is_empty() {
        return Err(NormalizeError::InvalidDate(token.to_string()));
    }

    if let Some(cap) = re_date_iso().captures(s) {
        let (y, m, d) = (cap[1].parse(), cap[2].parse(), cap[3].parse());
        if let (Ok(y), Ok(m), Ok(d)) = (y, m, d) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return Ok(date);
            }
        }
    }

    if let Some(cap) = re_date_textual_full().captures(s) {
        let day: u32 = cap[1].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
        let month = month_from_name(&cap[2]).ok_or_else(|| NormalizeError::InvalidDate(s.into()))?;
        let year: i32 = cap[3].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
        return NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| NormalizeError::InvalidDate(s.into()));
    }

    // Day-first full numeric date ("15/12/2025", "15-12-25").
    if let Some(cap) = re_date_slash_full().captures(s) {
        if cap.get(0).unwrap().as_str().len() == s.len() {
            let d: u32 = cap[1].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
            let m: u32 = cap[2].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
            let y = expand_year(cap[3].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?);
            return NaiveDate::from_ymd_opt(y, m, d)
                .ok_or_else(|| NormalizeError::InvalidDate(s.into()));
        }
    }

    if let Some(cap) = re_day_month_numeric().captures(s) {
        let d: u32 = cap[1].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
        let m: u32 = cap[2].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
        let year = years
            .year_for_month(m)
            .ok_or_else(|| NormalizeError::UnresolvedYear(s.to_string()))?;
        return NaiveDate::from_ymd_opt(year, m, d)
            .ok_or_else(|| NormalizeError::InvalidDate(s.into()));
    }

    if let Some(cap) = re_day_month_name().captures(s) {
        let d: u32 = cap[1].parse().map_err(|_| NormalizeError::InvalidDate(s.into()))?;
        let m = month_from_name(&cap[2]).ok_or_else(|| NormalizeError::InvalidDate(s.into()))?;
        let year = years
            .year_for_month(m)
            .ok_or_else(|| NormalizeError::UnresolvedYear(s.to_string()))?;
        return NaiveDate::from_ymd_opt(year, m, d)
            .ok_or_else(|| NormalizeError::InvalidDate(s.into()));
    }

    Err(NormalizeError::InvalidDate(token.to_string()))
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let key: String = name.to_lowercase().chars().take(3).collect();
    match key.as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}
