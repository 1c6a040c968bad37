//! # Bankfeed Core
//!
//! The bank-transaction classification pipeline: ingests raw bank feed
//! records, detects duplicates against previously-seen transactions, applies
//! an ordered conditional rule set to infer a property/type/category
//! classification, and decides whether each record can be auto-posted as a
//! ledger transaction or must be held for human review.
//!
//! ## Features
//!
//! - **Normalization**: raw provider records into an internal, immutable
//!   `BankTransaction` shape with per-record failure semantics
//! - **Duplicate detection**: exact matching on provider ids plus fuzzy
//!   matching on amount, date window, and description similarity
//! - **Rule engine**: priority-ordered, account-scoped matching rules stored
//!   as data, with first-match-wins field accumulation
//! - **Decision layer**: taxonomy and reference validation deciding between
//!   auto-post and pending review
//! - **Review workflow**: manual edits, approval, rejection, and automatic
//!   reprocessing of pending drafts when rules change
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bankfeed_core::{IngestPipeline, MemoryStorage, RawBankRecord};
//!
//! // let storage = MemoryStorage::new();
//! // let mut pipeline = IngestPipeline::new(storage);
//! // let report = pipeline.ingest(&records, "acct-1").await?;
//! ```

pub mod pipeline;
pub mod review;
pub mod taxonomy;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use pipeline::*;
pub use review::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;
