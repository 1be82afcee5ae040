//! # Domain Module
//!
//! Business logic of the personal finance ledger. Nothing in here knows how the UI
//! looks or which document store is in use.
//!
//! ## Key Components
//!
//! - **amount_parser**: reads amounts typed in Brazilian or US notation
//! - **legacy_migration**: converts old nested year records to the flat entry list
//! - **ledger_store**: the in-memory ledger of the signed-in user
//! - **mutation_policy**: append-only or upsert-by-key recording of new entries
//! - **summary_service**: monthly totals, category breakdowns and chart data
//! - **persistence_service**: loading and debounced saving of the ledger document
//! - **session**: validated operations for one signed-in user
//! - **auth_service**: identity provider access and error translation

pub mod amount_parser;
pub mod auth_service;
pub mod errors;
pub mod ledger_store;
pub mod legacy_migration;
pub mod models;
pub mod mutation_policy;
pub mod persistence_service;
pub mod session;
pub mod summary_service;

pub use amount_parser::{format_brl, parse_amount, AmountParseError};
pub use auth_service::{translate_auth_error, AuthFailure, AuthService, IdentityProvider, ProviderError};
pub use errors::{LedgerError, ValidationError};
pub use ledger_store::LedgerStore;
pub use legacy_migration::{migrate_year, migrate_year_record, YearMigration};
pub use models::{IdentifierCounter, LedgerCollection, Year, YearLedger};
pub use mutation_policy::{policy_for, AppendOnly, MutationPolicy, NewEntry, UpsertByKey};
pub use persistence_service::{hydrate_document, HydratedLedger, LoadOutcome, PersistenceGateway};
pub use session::{LedgerSession, SessionState};
pub use summary_service::SummaryService;
