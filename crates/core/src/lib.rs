pub mod bank;
pub mod invoice;
pub mod money;
pub mod period;
pub mod transaction;

pub use bank::BankFormat;
pub use invoice::Invoice;
pub use money::Money;
pub use period::{DateRange, StatementPeriod};
pub use transaction::{CanonicalTransaction, RawRow, SkippedRow};
