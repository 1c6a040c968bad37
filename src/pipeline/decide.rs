//! The post-or-pending decision over an accumulated classification

use crate::traits::{ClassificationValidator, PipelineStorage, TaxonomyValidator};
use crate::types::*;

/// What the decider concluded for one bank transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Fully classified and valid: post a ledger transaction
    Post(Transaction),
    /// Incomplete or invalid: hold a draft for human review
    Hold(PendingTransaction),
}

/// Validates an accumulated classification and decides between auto-posting
/// and holding for review.
///
/// A validation failure is not an error: the inferred fields are preserved
/// as-is on the pending draft so a human can correct them.
pub struct ClassificationDecider<S: PipelineStorage> {
    storage: S,
    validator: Box<dyn ClassificationValidator>,
}

impl<S: PipelineStorage> ClassificationDecider<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(TaxonomyValidator),
        }
    }

    pub fn with_validator(storage: S, validator: Box<dyn ClassificationValidator>) -> Self {
        Self { storage, validator }
    }

    /// Decide the outcome for one bank transaction. Only storage errors
    /// propagate; anything short of a complete, valid classification simply
    /// yields `Decision::Hold`.
    pub async fn decide(
        &self,
        bank_transaction: &BankTransaction,
        accumulated: Classification,
    ) -> PipelineResult<Decision> {
        if accumulated.is_complete() && self.validate(&accumulated).await? {
            Ok(Decision::Post(self.build_transaction(
                bank_transaction,
                &accumulated,
            )))
        } else {
            Ok(Decision::Hold(self.build_pending(
                bank_transaction,
                accumulated,
            )))
        }
    }

    /// Validate a complete classification: the property must exist and the
    /// (type, category) pair must belong to the taxonomy. Returns false on
    /// validation failure, propagates storage errors.
    pub async fn validate(&self, classification: &Classification) -> PipelineResult<bool> {
        let property_id = match classification.property_id.as_deref() {
            Some(id) => id,
            None => return Ok(false),
        };
        if self.storage.get_property(property_id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.validator.validate(classification).is_ok())
    }

    /// Build the posted transaction. The amount sign is copied unchanged
    /// from the bank record, never re-derived from the transaction type.
    fn build_transaction(
        &self,
        bank_transaction: &BankTransaction,
        classification: &Classification,
    ) -> Transaction {
        let now = chrono::Utc::now().naive_utc();
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            property_id: classification.property_id.clone().unwrap_or_default(),
            txn_type: classification.txn_type.unwrap_or(TransactionType::Expense),
            category: classification.category.clone().unwrap_or_default(),
            amount_minor: bank_transaction.amount_minor,
            date: bank_transaction.posted_at.date_naive(),
            description: bank_transaction.description.clone(),
            bank_transaction_id: Some(bank_transaction.id.clone()),
            is_imported: true,
            imported_at: Some(now),
            created_at: now,
        }
    }

    /// Build the pending draft, copying only the fields present in the
    /// accumulator; absent fields stay unset for later manual entry.
    fn build_pending(
        &self,
        bank_transaction: &BankTransaction,
        classification: Classification,
    ) -> PendingTransaction {
        PendingTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            bank_account_id: bank_transaction.account_id.clone(),
            property_id: classification.property_id,
            txn_type: classification.txn_type,
            category: classification.category,
            amount_minor: bank_transaction.amount_minor,
            date: bank_transaction.posted_at.date_naive(),
            description: bank_transaction.description.clone(),
            reviewed_at: None,
            reviewed_by: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PipelineStorage;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    fn bank_transaction(amount_minor: i64) -> BankTransaction {
        BankTransaction {
            id: "bt-1".to_string(),
            account_id: "acct-1".to_string(),
            external_id: "ext-1".to_string(),
            amount_minor,
            currency: "GBP".to_string(),
            description: "Handyman visit".to_string(),
            merchant: None,
            posted_at: Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap(),
            settled_at: None,
            transaction_id: None,
            pending_transaction_id: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    async fn storage_with_property() -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage
            .save_property(&Property {
                id: "prop-1".to_string(),
                name: "12 Elm Road".to_string(),
            })
            .await
            .unwrap();
        storage
    }

    fn complete(property_id: &str, txn_type: TransactionType, category: &str) -> Classification {
        Classification {
            property_id: Some(property_id.to_string()),
            txn_type: Some(txn_type),
            category: Some(category.to_string()),
        }
    }

    #[tokio::test]
    async fn complete_valid_classification_posts() {
        let decider = ClassificationDecider::new(storage_with_property().await);
        let decision = decider
            .decide(
                &bank_transaction(-8_000),
                complete("prop-1", TransactionType::Expense, "Maintenance"),
            )
            .await
            .unwrap();

        match decision {
            Decision::Post(transaction) => {
                assert_eq!(transaction.property_id, "prop-1");
                assert_eq!(transaction.category, "Maintenance");
                assert!(transaction.is_imported);
                assert!(transaction.imported_at.is_some());
                assert_eq!(transaction.bank_transaction_id.as_deref(), Some("bt-1"));
            }
            Decision::Hold(_) => panic!("expected a posted transaction"),
        }
    }

    #[tokio::test]
    async fn sign_is_copied_not_rederived() {
        let decider = ClassificationDecider::new(storage_with_property().await);
        // A positive amount classified as an expense keeps its sign
        let decision = decider
            .decide(
                &bank_transaction(150),
                complete("prop-1", TransactionType::Expense, "Repair"),
            )
            .await
            .unwrap();

        match decision {
            Decision::Post(transaction) => assert_eq!(transaction.amount_minor, 150),
            Decision::Hold(_) => panic!("expected a posted transaction"),
        }
    }

    #[tokio::test]
    async fn cross_type_category_is_held_with_fields_preserved() {
        let decider = ClassificationDecider::new(storage_with_property().await);
        let decision = decider
            .decide(
                &bank_transaction(-8_000),
                complete("prop-1", TransactionType::Income, "Maintenance"),
            )
            .await
            .unwrap();

        match decision {
            Decision::Hold(pending) => {
                assert_eq!(pending.property_id.as_deref(), Some("prop-1"));
                assert_eq!(pending.txn_type, Some(TransactionType::Income));
                assert_eq!(pending.category.as_deref(), Some("Maintenance"));
            }
            Decision::Post(_) => panic!("expected a pending draft"),
        }
    }

    #[tokio::test]
    async fn unknown_property_is_held() {
        let decider = ClassificationDecider::new(MemoryStorage::new());
        let decision = decider
            .decide(
                &bank_transaction(-8_000),
                complete("prop-missing", TransactionType::Expense, "Repair"),
            )
            .await
            .unwrap();
        assert!(matches!(decision, Decision::Hold(_)));
    }

    struct RejectEverything;

    impl ClassificationValidator for RejectEverything {
        fn validate(&self, _classification: &Classification) -> PipelineResult<()> {
            Err(PipelineError::Validation("vetoed".to_string()))
        }
    }

    #[tokio::test]
    async fn injected_validator_can_veto_auto_posting() {
        let decider = ClassificationDecider::with_validator(
            storage_with_property().await,
            Box::new(RejectEverything),
        );
        let decision = decider
            .decide(
                &bank_transaction(-8_000),
                complete("prop-1", TransactionType::Expense, "Repair"),
            )
            .await
            .unwrap();
        assert!(matches!(decision, Decision::Hold(_)));
    }

    #[tokio::test]
    async fn partial_classification_is_held_with_absent_fields_null() {
        let decider = ClassificationDecider::new(storage_with_property().await);
        let decision = decider
            .decide(
                &bank_transaction(-8_000),
                Classification {
                    property_id: Some("prop-1".to_string()),
                    txn_type: None,
                    category: None,
                },
            )
            .await
            .unwrap();

        match decision {
            Decision::Hold(pending) => {
                assert_eq!(pending.property_id.as_deref(), Some("prop-1"));
                assert!(pending.txn_type.is_none());
                assert!(pending.category.is_none());
                assert!(pending.reviewed_at.is_none());
            }
            Decision::Post(_) => panic!("expected a pending draft"),
        }
    }
}
