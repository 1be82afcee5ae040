//! # Storage Module
//!
//! Persistence for the ledger document. The domain layer only sees the
//! `DocumentStore` trait; which store backs it is decided by whoever builds the
//! backend.
//!
//! ## Implementations
//!
//! - **InMemoryDocumentStore**: map-backed, for tests and store-less runs
//! - **JsonFileStore**: one JSON file per document under a data directory
//!
//! A hosted document database plugs in by implementing `DocumentStore`.

pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFileStore;
pub use memory::InMemoryDocumentStore;
pub use traits::{merge_documents, DocumentStore, SetOptions};
