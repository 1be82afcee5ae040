//! Domain models for the ledger: years, per-year ledgers, the collection of all
//! years and the id counter.

pub mod ledger;
pub mod year;

pub use ledger::{IdentifierCounter, LedgerCollection, YearLedger};
pub use year::{Year, MAX_YEAR, MIN_YEAR};
