pub mod engine;
pub mod rules;
pub mod supplier;
pub(crate) mod util;

pub use engine::{
    BatchOutcome, MatchConfidence, MatchConfig, MatchInputError, MatchResult, ReconcileEngine,
    RejectedInvoice,
};
pub use rules::{CategoryRule, CategoryRuleEngine, RuleMatch};
pub use supplier::normalize_supplier;
