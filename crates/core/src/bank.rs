use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of statement layouts the row parsers understand.
/// Detected once per document; every page of a document shares one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankFormat {
    Absa,
    Capitec,
    Fnb,
    StandardBank,
    Unknown,
}

impl BankFormat {
    pub fn name(self) -> &'static str {
        match self {
            BankFormat::Absa => "Absa",
            BankFormat::Capitec => "Capitec",
            BankFormat::Fnb => "First National Bank",
            BankFormat::StandardBank => "Standard Bank",
            BankFormat::Unknown => "Unknown",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            BankFormat::Absa => "absa",
            BankFormat::Capitec => "capitec",
            BankFormat::Fnb => "fnb",
            BankFormat::StandardBank => "standard_bank",
            BankFormat::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, BankFormat::Unknown)
    }
}

impl fmt::Display for BankFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
