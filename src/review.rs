//! Pending-transaction review workflow: listing, manual edits, approval,
//! and rejection

use serde::{Deserialize, Serialize};

use crate::traits::{ClassificationValidator, PipelineStorage, TaxonomyValidator};
use crate::types::*;

/// A manual edit to one classification field on a pending draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldUpdate {
    Property(Option<String>),
    Type(Option<TransactionType>),
    Category(Option<String>),
}

/// Per-draft failure captured during a bulk review operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewError {
    pub pending_id: String,
    pub message: String,
}

/// Summary of a bulk approve or reject. Failures never abort the rest of
/// the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkReviewReport {
    pub succeeded: usize,
    pub errors: Vec<ReviewError>,
}

/// Manager for the human review side of the pipeline.
///
/// Any manual edit stamps the draft's reviewed metadata, which takes the
/// draft out of automatic reprocessing: human judgment is never silently
/// overwritten by a later rule change.
pub struct ReviewManager<S: PipelineStorage> {
    storage: S,
    validator: Box<dyn ClassificationValidator>,
}

impl<S: PipelineStorage> ReviewManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(TaxonomyValidator),
        }
    }

    pub fn with_validator(storage: S, validator: Box<dyn ClassificationValidator>) -> Self {
        Self { storage, validator }
    }

    /// List pending drafts, optionally filtered by account and review status
    pub async fn list(
        &self,
        account_id: Option<&str>,
        reviewed: Option<bool>,
    ) -> PipelineResult<Vec<PendingTransaction>> {
        self.storage.list_pending(account_id, reviewed).await
    }

    async fn get_required(&self, pending_id: &str) -> PipelineResult<PendingTransaction> {
        self.storage
            .get_pending(pending_id)
            .await?
            .ok_or_else(|| PipelineError::PendingNotFound(pending_id.to_string()))
    }

    /// Set one classification field on a draft and stamp it reviewed
    pub async fn update_field(
        &mut self,
        pending_id: &str,
        update: FieldUpdate,
        reviewed_by: &str,
    ) -> PipelineResult<PendingTransaction> {
        let mut pending = self.get_required(pending_id).await?;

        match update {
            FieldUpdate::Property(value) => pending.property_id = value,
            FieldUpdate::Type(value) => pending.txn_type = value,
            FieldUpdate::Category(value) => pending.category = value,
        }
        pending.reviewed_at = Some(chrono::Utc::now().naive_utc());
        pending.reviewed_by = Some(reviewed_by.to_string());

        self.storage.update_pending(&pending).await?;
        Ok(pending)
    }

    /// Approve a draft, converting it into a posted transaction.
    ///
    /// All three classification fields must be set and valid at approval
    /// time; the draft is revalidated against the same taxonomy rule used
    /// during ingestion. On success the bank record's link is switched from
    /// pending to transaction.
    pub async fn approve(
        &mut self,
        pending_id: &str,
        reviewed_by: &str,
    ) -> PipelineResult<Transaction> {
        let mut pending = self.get_required(pending_id).await?;

        let classification = pending.classification();
        if !classification.is_complete() {
            return Err(PipelineError::Validation(format!(
                "pending transaction {} is not fully classified",
                pending_id
            )));
        }

        let property_id = classification.property_id.clone().unwrap_or_default();
        if self.storage.get_property(&property_id).await?.is_none() {
            return Err(PipelineError::PropertyNotFound(property_id));
        }
        self.validator.validate(&classification)?;

        let bank_transaction_id = self
            .storage
            .find_bank_transaction_for_pending(pending_id)
            .await?
            .map(|tx| tx.id);

        let now = chrono::Utc::now().naive_utc();
        let transaction = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            property_id,
            txn_type: classification.txn_type.unwrap_or(TransactionType::Expense),
            category: classification.category.clone().unwrap_or_default(),
            amount_minor: pending.amount_minor,
            date: pending.date,
            description: pending.description.clone(),
            bank_transaction_id,
            is_imported: true,
            imported_at: Some(now),
            created_at: now,
        };

        // Who signed off rides along on the promote itself; a failed
        // promotion must leave the draft untouched and unreviewed so
        // reprocessing can still pick it up
        pending.reviewed_at = Some(now);
        pending.reviewed_by = Some(reviewed_by.to_string());
        self.storage.promote_pending(&pending, &transaction).await?;
        Ok(transaction)
    }

    /// Approve several drafts; failures are collected per draft
    pub async fn approve_many(
        &mut self,
        pending_ids: &[String],
        reviewed_by: &str,
    ) -> PipelineResult<BulkReviewReport> {
        let mut report = BulkReviewReport::default();
        for pending_id in pending_ids {
            match self.approve(pending_id, reviewed_by).await {
                Ok(_) => report.succeeded += 1,
                Err(err) => report.errors.push(ReviewError {
                    pending_id: pending_id.clone(),
                    message: err.to_string(),
                }),
            }
        }
        Ok(report)
    }

    /// Reject a draft: delete it together with its source bank record,
    /// posting nothing
    pub async fn reject(&mut self, pending_id: &str) -> PipelineResult<()> {
        self.storage.discard_pending(pending_id).await
    }

    /// Reject several drafts; failures are collected per draft
    pub async fn reject_many(&mut self, pending_ids: &[String]) -> PipelineResult<BulkReviewReport> {
        let mut report = BulkReviewReport::default();
        for pending_id in pending_ids {
            match self.reject(pending_id).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => report.errors.push(ReviewError {
                    pending_id: pending_id.clone(),
                    message: err.to_string(),
                }),
            }
        }
        Ok(report)
    }
}
