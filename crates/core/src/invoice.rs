use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// A supplier invoice as handed in by the caller. The core does not parse
/// invoices; it only cleans the supplier name for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub supplier_name: String,
    pub invoice_date: NaiveDate,
    pub invoice_number: String,
    pub total_amount: Money,
    pub vat_amount: Option<Money>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip() {
        let inv = Invoice {
            supplier_name: "Herotel (Pty) Ltd".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            invoice_number: "INV-0042".to_string(),
            total_amount: Money::from_cents(84900),
            vat_amount: Some(Money::from_cents(11074)),
        };
        let json = serde_json::to_string(&inv).unwrap();
        let back: Invoice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inv);
    }
}
