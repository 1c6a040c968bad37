//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::taxonomy;
use crate::types::*;

/// Storage abstraction for the classification pipeline
///
/// This trait allows the pipeline core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
/// Lookup failures must be reported as `PipelineError::Storage`; the pipeline
/// never treats a failed lookup as "not found".
#[async_trait]
pub trait PipelineStorage: Send + Sync {
    /// Find a bank transaction by its provider-assigned id within one account
    async fn find_bank_transaction(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> PipelineResult<Option<BankTransaction>>;

    /// List all bank transactions for an account, in ingestion order
    async fn list_bank_transactions(&self, account_id: &str)
        -> PipelineResult<Vec<BankTransaction>>;

    /// Find the bank transaction currently linked to a pending draft
    async fn find_bank_transaction_for_pending(
        &self,
        pending_id: &str,
    ) -> PipelineResult<Option<BankTransaction>>;

    /// Atomically persist a processed record: the bank transaction (with its
    /// outcome link already set) plus exactly one of Transaction /
    /// PendingTransaction. A failure must leave no partial write behind.
    async fn save_processed(
        &mut self,
        bank_transaction: &BankTransaction,
        outcome: &ProcessedOutcome,
    ) -> PipelineResult<()>;

    /// Atomically promote a pending draft: create the posted transaction,
    /// delete the draft, and switch the bank transaction link from pending
    /// to posted. `pending` carries the draft's final field values,
    /// reviewer stamps included, so backends that keep history record them
    /// in the same write; no separate pre-promotion update may be assumed.
    async fn promote_pending(
        &mut self,
        pending: &PendingTransaction,
        transaction: &Transaction,
    ) -> PipelineResult<()>;

    /// Delete a pending draft together with its source bank transaction
    /// (used by reject; nothing is posted)
    async fn discard_pending(&mut self, pending_id: &str) -> PipelineResult<()>;

    /// Get a pending draft by id
    async fn get_pending(&self, pending_id: &str) -> PipelineResult<Option<PendingTransaction>>;

    /// Update an existing pending draft
    async fn update_pending(&mut self, pending: &PendingTransaction) -> PipelineResult<()>;

    /// List pending drafts, optionally filtered by account and review status
    async fn list_pending(
        &self,
        account_id: Option<&str>,
        reviewed: Option<bool>,
    ) -> PipelineResult<Vec<PendingTransaction>>;

    /// Get a posted transaction by id
    async fn get_transaction(&self, transaction_id: &str) -> PipelineResult<Option<Transaction>>;

    /// Save a matching rule (insert or replace)
    async fn save_rule(&mut self, rule: &MatchingRule) -> PipelineResult<()>;

    /// Get a matching rule by id
    async fn get_rule(&self, rule_id: &str) -> PipelineResult<Option<MatchingRule>>;

    /// Delete a matching rule
    async fn delete_rule(&mut self, rule_id: &str) -> PipelineResult<()>;

    /// List enabled rules applying to an account: rules scoped to the
    /// account plus global rules. Ordering is up to the backend; the rule
    /// engine sorts.
    async fn list_rules_for_account(&self, account_id: &str)
        -> PipelineResult<Vec<MatchingRule>>;

    /// Get a property by id
    async fn get_property(&self, property_id: &str) -> PipelineResult<Option<Property>>;

    /// Save a property reference entity
    async fn save_property(&mut self, property: &Property) -> PipelineResult<()>;
}

/// Trait for validating an accumulated classification before posting
///
/// The default implementation checks the fixed type/category taxonomy;
/// property existence is checked against storage by the decider itself.
pub trait ClassificationValidator: Send + Sync {
    /// Validate a complete classification. Must only be called once all
    /// three fields are populated.
    fn validate(&self, classification: &Classification) -> PipelineResult<()>;
}

/// Default validator enforcing the fixed type/category taxonomy
pub struct TaxonomyValidator;

impl ClassificationValidator for TaxonomyValidator {
    fn validate(&self, classification: &Classification) -> PipelineResult<()> {
        let txn_type = classification
            .txn_type
            .ok_or_else(|| PipelineError::Validation("transaction type is not set".to_string()))?;
        let category = classification
            .category
            .as_deref()
            .ok_or_else(|| PipelineError::Validation("category is not set".to_string()))?;

        if !taxonomy::is_valid_category(txn_type, category) {
            return Err(PipelineError::Validation(format!(
                "category '{}' is not valid for type {}",
                category, txn_type
            )));
        }

        Ok(())
    }
}
