use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use concorda_core::{CanonicalTransaction, Invoice};

use crate::supplier::normalize_supplier;
use crate::util::similarity_ratio;

fn default_name_threshold() -> f32 {
    0.70
}
fn default_date_window_days() -> i64 {
    3
}
fn default_amount_tolerance_cents() -> i64 {
    1
}
fn default_name_weight() -> u8 {
    40
}
fn default_amount_weight() -> u8 {
    35
}
fn default_date_weight() -> u8 {
    25
}

/// Tuning knobs for the reconciliation engine. The defaults are the
/// calibrated production values; weights sum to 100 so a full match scores
/// exactly 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_name_threshold")]
    pub name_threshold: f32,
    #[serde(default = "default_date_window_days")]
    pub date_window_days: i64,
    #[serde(default = "default_amount_tolerance_cents")]
    pub amount_tolerance_cents: i64,
    #[serde(default = "default_name_weight")]
    pub name_weight: u8,
    #[serde(default = "default_amount_weight")]
    pub amount_weight: u8,
    #[serde(default = "default_date_weight")]
    pub date_weight: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name_threshold: default_name_threshold(),
            date_window_days: default_date_window_days(),
            amount_tolerance_cents: default_amount_tolerance_cents(),
            name_weight: default_name_weight(),
            amount_weight: default_amount_weight(),
            date_weight: default_date_weight(),
        }
    }
}

impl MatchConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))
    }
}

/// Discrete confidence bucket derived from how many criteria matched:
/// all three, two, one, none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
    None,
}

impl MatchConfidence {
    fn from_criteria(matched: u8) -> Self {
        match matched {
            3 => MatchConfidence::High,
            2 => MatchConfidence::Medium,
            1 => MatchConfidence::Low,
            _ => MatchConfidence::None,
        }
    }
}

/// One invoice's best candidate with the score breakdown. At most one
/// transaction is attached; `None` confidence carries no transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub invoice_number: String,
    pub transaction: Option<CanonicalTransaction>,
    pub score: u8,
    pub confidence: MatchConfidence,
    /// One line per criterion, in scoring order, phrased for a human
    /// reviewing the reconciliation.
    pub explanation: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchInputError {
    #[error("invoice has no supplier name")]
    MissingSupplierName,
    #[error("invoice total must be positive")]
    NonPositiveAmount,
}

/// An invoice excluded from a batch run, with the reason. The rest of the
/// batch still processes.
#[derive(Debug, Clone)]
pub struct RejectedInvoice {
    pub invoice_number: String,
    pub reason: MatchInputError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Ranked best-score-first; at most one result per invoice.
    pub results: Vec<MatchResult>,
    pub rejected: Vec<RejectedInvoice>,
}

struct ScoredCandidate<'a> {
    transaction: &'a CanonicalTransaction,
    score: u8,
    criteria: u8,
    date_gap: i64,
    explanation: Vec<String>,
}

/// Scores invoices against candidate transactions on normalized-name
/// similarity, amount equality and date proximity. Read-only over its
/// inputs; never mutates a transaction or an invoice.
pub struct ReconcileEngine {
    config: MatchConfig,
}

impl Default for ReconcileEngine {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl ReconcileEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Best candidate for one invoice. Ties on score break toward the
    /// closest date.
    pub fn match_invoice(
        &self,
        invoice: &Invoice,
        candidates: &[CanonicalTransaction],
    ) -> Result<MatchResult, MatchInputError> {
        validate_invoice(invoice)?;

        let best = candidates
            .iter()
            .map(|tx| self.score_pair(invoice, tx))
            .max_by_key(|c| (c.score, Reverse(c.date_gap)));

        Ok(match best {
            Some(c) if c.criteria > 0 => MatchResult {
                invoice_number: invoice.invoice_number.clone(),
                transaction: Some(c.transaction.clone()),
                score: c.score,
                confidence: MatchConfidence::from_criteria(c.criteria),
                explanation: c.explanation,
            },
            _ => MatchResult {
                invoice_number: invoice.invoice_number.clone(),
                transaction: None,
                score: 0,
                confidence: MatchConfidence::None,
                explanation: vec![
                    "no candidate transaction matched any criterion".to_string(),
                ],
            },
        })
    }

    /// Match a full invoice set against a full transaction set. Invalid
    /// invoices are excluded with an explanatory entry; the remainder are
    /// returned ranked best score first.
    pub fn match_batch(
        &self,
        invoices: &[Invoice],
        transactions: &[CanonicalTransaction],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for invoice in invoices {
            match self.match_invoice(invoice, transactions) {
                Ok(result) => outcome.results.push(result),
                Err(reason) => outcome.rejected.push(RejectedInvoice {
                    invoice_number: invoice.invoice_number.clone(),
                    reason,
                }),
            }
        }
        outcome.results.sort_by_key(|r| Reverse(r.score));
        outcome
    }

    fn score_pair<'a>(
        &self,
        invoice: &Invoice,
        tx: &'a CanonicalTransaction,
    ) -> ScoredCandidate<'a> {
        let mut score = 0u8;
        let mut criteria = 0u8;
        let mut explanation = Vec::with_capacity(3);

        // Name: edit-distance ratio over normalized keys, with exact
        // containment counting regardless of ratio.
        let invoice_key = normalize_supplier(&invoice.supplier_name);
        let tx_key = normalize_supplier(&tx.description);
        let ratio = similarity_ratio(&invoice_key, &tx_key);
        let contained = !invoice_key.is_empty()
            && !tx_key.is_empty()
            && (invoice_key.contains(&tx_key) || tx_key.contains(&invoice_key));
        if contained || ratio >= self.config.name_threshold {
            score += self.config.name_weight;
            criteria += 1;
            explanation.push(format!(
                "supplier name matched: '{invoice_key}' ~ '{tx_key}' (ratio {ratio:.2})"
            ));
        } else {
            explanation.push(format!(
                "supplier name differs: '{invoice_key}' vs '{tx_key}' (ratio {ratio:.2}, threshold {:.2})",
                self.config.name_threshold
            ));
        }

        // Amount: invoice total against the transaction's absolute value,
        // within currency rounding tolerance.
        let diff_cents =
            (invoice.total_amount.to_cents() - tx.amount.abs().to_cents()).abs();
        if diff_cents <= self.config.amount_tolerance_cents {
            score += self.config.amount_weight;
            criteria += 1;
            explanation.push(format!("amount matched: {}", invoice.total_amount));
        } else {
            explanation.push(format!(
                "amount differs: invoice {} vs transaction {}",
                invoice.total_amount,
                tx.amount.abs()
            ));
        }

        // Date: one fixed window; same day counts fully.
        let date_gap = (invoice.invoice_date - tx.date).num_days().abs();
        if date_gap <= self.config.date_window_days {
            score += self.config.date_weight;
            criteria += 1;
            if date_gap == 0 {
                explanation.push("date matched exactly".to_string());
            } else {
                explanation.push(format!("date within window: {date_gap} day(s) apart"));
            }
        } else {
            explanation.push(format!(
                "date differs by {date_gap} days (window {})",
                self.config.date_window_days
            ));
        }

        ScoredCandidate {
            transaction: tx,
            score,
            criteria,
            date_gap,
            explanation,
        }
    }
}

fn validate_invoice(invoice: &Invoice) -> Result<(), MatchInputError> {
    if invoice.supplier_name.trim().is_empty() {
        return Err(MatchInputError::MissingSupplierName);
    }
    if invoice.total_amount.to_cents() <= 0 {
        return Err(MatchInputError::NonPositiveAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use concorda_core::Money;
    use pretty_assertions::assert_eq;

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

    fn invoice(supplier: &str, d: NaiveDate, number: &str, cents: i64) -> Invoice {
        Invoice {
            supplier_name: supplier.to_string(),
            invoice_date: d,
            invoice_number: number.to_string(),
            total_amount: Money::from_cents(cents),
            vat_amount: None,
        }
    }

    #[test]
    fn full_match_scores_one_hundred_high() {
        let engine = ReconcileEngine::default();
        let inv = invoice(
            "Herotel (Pty) Ltd CHRISTOPHER WILLIAM MCPHERSON",
            date(2026, 1, 1),
            "INV-1",
            84900,
        );
        // Outflow on the statement: negative amount, matched on |amount|.
        let candidates = vec![tx(date(2026, 1, 1), "Herotel", -84900)];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.confidence, MatchConfidence::High);
        assert!(result.transaction.is_some());
        assert_eq!(result.explanation.len(), 3);
    }

    #[test]
    fn no_candidate_in_tolerance_yields_none_without_transaction() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel (Pty) Ltd", date(2026, 1, 1), "INV-1", 84900);
        let candidates = vec![tx(date(2025, 6, 15), "Vodacom", -21000)];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.confidence, MatchConfidence::None);
        assert_eq!(result.score, 0);
        assert!(result.transaction.is_none());
    }

    #[test]
    fn empty_candidate_set_yields_none() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel", date(2026, 1, 1), "INV-1", 84900);
        let result = engine.match_invoice(&inv, &[]).unwrap();
        assert_eq!(result.confidence, MatchConfidence::None);
        assert!(result.transaction.is_none());
    }

    #[test]
    fn two_of_three_is_medium() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel (Pty) Ltd", date(2026, 1, 1), "INV-1", 84900);
        // Name and amount match, date far outside the window.
        let candidates = vec![tx(date(2026, 2, 20), "Herotel", -84900)];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.confidence, MatchConfidence::Medium);
        assert_eq!(result.score, 75);
    }

    #[test]
    fn one_of_three_is_low() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel (Pty) Ltd", date(2026, 1, 1), "INV-1", 84900);
        // Only the name matches.
        let candidates = vec![tx(date(2026, 2, 20), "Herotel", -12345)];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.confidence, MatchConfidence::Low);
        assert_eq!(result.score, 40);
    }

    #[test]
    fn name_similarity_tolerates_ocr_noise() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel (Pty) Ltd", date(2026, 1, 1), "INV-1", 84900);
        // One character mangled by OCR: ratio 6/7 ≈ 0.86, above threshold.
        let candidates = vec![tx(date(2026, 1, 1), "Herotei", -84900)];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.confidence, MatchConfidence::High);
    }

    #[test]
    fn containment_counts_regardless_of_ratio() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel (Pty) Ltd", date(2026, 1, 1), "INV-1", 84900);
        // Long description, poor ratio, but contains the normalized name.
        let candidates = vec![tx(
            date(2026, 1, 1),
            "MAGTAPE DEBIT HEROTEL INTERNET FIBRE DEC",
            -84900,
        )];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.confidence, MatchConfidence::High);
    }

    #[test]
    fn ties_break_toward_closest_date() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel", date(2026, 1, 10), "INV-1", 84900);
        let near = tx(date(2026, 1, 11), "Herotel", -84900);
        let far = tx(date(2026, 1, 8), "Herotel", -84900);
        let candidates = vec![far.clone(), near.clone()];

        let result = engine.match_invoice(&inv, &candidates).unwrap();
        assert_eq!(result.transaction.unwrap().date, near.date);
    }

    #[test]
    fn invalid_invoices_are_rejected_from_batch_not_fatal() {
        let engine = ReconcileEngine::default();
        let good = invoice("Herotel", date(2026, 1, 1), "INV-1", 84900);
        let no_name = invoice("  ", date(2026, 1, 1), "INV-2", 1000);
        let no_amount = invoice("Vodacom", date(2026, 1, 1), "INV-3", 0);
        let transactions = vec![tx(date(2026, 1, 1), "Herotel", -84900)];

        let outcome = engine.match_batch(&[good, no_name, no_amount], &transactions);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(outcome.rejected[0].reason, MatchInputError::MissingSupplierName);
        assert_eq!(outcome.rejected[1].reason, MatchInputError::NonPositiveAmount);
    }

    #[test]
    fn batch_results_ranked_by_score() {
        let engine = ReconcileEngine::default();
        let strong = invoice("Herotel", date(2026, 1, 1), "INV-A", 84900);
        let weak = invoice("Unrelated Supplier", date(2025, 3, 3), "INV-B", 84900);
        let transactions = vec![tx(date(2026, 1, 1), "Herotel", -84900)];

        let outcome = engine.match_batch(&[weak, strong], &transactions);
        assert_eq!(outcome.results[0].invoice_number, "INV-A");
        assert!(outcome.results[0].score > outcome.results[1].score);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let engine = ReconcileEngine::default();
        let inv = invoice("Herotel", date(2026, 1, 1), "INV-1", 84900);
        let transactions = vec![tx(date(2026, 1, 1), "Herotel", -84900)];
        let before = transactions.clone();
        let _ = engine.match_batch(std::slice::from_ref(&inv), &transactions);
        assert_eq!(transactions, before);
    }

    #[test]
    fn config_loads_from_toml_with_defaults() {
        let config = MatchConfig::from_toml("name_threshold = 0.8\ndate_window_days = 7\n").unwrap();
        assert_eq!(config.name_threshold, 0.8);
        assert_eq!(config.date_window_days, 7);
        // Unspecified fields keep their defaults.
        assert_eq!(config.amount_tolerance_cents, 1);
        assert_eq!(config.name_weight, 40);
    }

    #[test]
    fn config_rejects_malformed_toml() {
        assert!(MatchConfig::from_toml("name_threshold = ").is_err());
    }
}
