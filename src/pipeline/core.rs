//! Main pipeline orchestrator coordinating ingest, reprocessing, and rule
//! management

use std::collections::HashMap;

use crate::pipeline::decide::{ClassificationDecider, Decision};
use crate::pipeline::duplicate::DuplicateDetector;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::rules::RuleEngine;
use crate::review::{BulkReviewReport, FieldUpdate, ReviewManager};
use crate::traits::PipelineStorage;
use crate::types::*;

/// The bank-feed processing pipeline.
///
/// Per record the flow is normalize → duplicate check (skip if duplicate) →
/// classify → decide → atomic persist. Batches run sequentially so duplicate
/// checks see records written earlier in the same batch.
pub struct IngestPipeline<S: PipelineStorage> {
    storage: S,
    normalizer: Normalizer,
    detector: DuplicateDetector<S>,
    engine: RuleEngine<S>,
    decider: ClassificationDecider<S>,
    review: ReviewManager<S>,
}

impl<S: PipelineStorage + Clone> IngestPipeline<S> {
    /// Create a pipeline over the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            normalizer: Normalizer::new(),
            detector: DuplicateDetector::new(storage.clone()),
            engine: RuleEngine::new(storage.clone()),
            decider: ClassificationDecider::new(storage.clone()),
            review: ReviewManager::new(storage.clone()),
            storage,
        }
    }

    /// Process a batch of raw records for one account.
    ///
    /// The rule set is fetched and sorted once and held immutable for the
    /// whole batch. One record's failure is captured in the report's error
    /// list; the batch never aborts wholesale.
    pub async fn ingest(
        &mut self,
        raw_records: &[RawBankRecord],
        account_id: &str,
    ) -> PipelineResult<IngestReport> {
        let rules = self.engine.load_rules(account_id).await?;
        let mut report = IngestReport::default();

        for raw in raw_records {
            match self.process_record(raw, account_id, &rules).await {
                Ok(was_duplicate) => {
                    report.processed += 1;
                    if was_duplicate {
                        report.duplicates += 1;
                    }
                }
                Err(err) => report.errors.push(IngestError {
                    external_id: raw.external_id.clone(),
                    message: err.to_string(),
                }),
            }
        }

        Ok(report)
    }

    /// Run one record through the pipeline. Returns true when the record was
    /// skipped as a duplicate (nothing persisted).
    async fn process_record(
        &mut self,
        raw: &RawBankRecord,
        account_id: &str,
        rules: &[MatchingRule],
    ) -> PipelineResult<bool> {
        if raw.account_id != account_id {
            return Err(PipelineError::MalformedRecord(format!(
                "record belongs to account '{}', batch is for '{}'",
                raw.account_id, account_id
            )));
        }

        let mut bank_transaction = self.normalizer.normalize(raw)?;

        let check = self.detector.check(&bank_transaction, account_id).await?;
        if check.is_duplicate {
            return Ok(true);
        }

        let accumulated = self.engine.classify(rules, &bank_transaction);
        let decision = self.decider.decide(&bank_transaction, accumulated).await?;

        let outcome = match decision {
            Decision::Post(transaction) => {
                bank_transaction.transaction_id = Some(transaction.id.clone());
                ProcessedOutcome::Posted(transaction)
            }
            Decision::Hold(pending) => {
                bank_transaction.pending_transaction_id = Some(pending.id.clone());
                ProcessedOutcome::Held(pending)
            }
        };

        self.storage
            .save_processed(&bank_transaction, &outcome)
            .await?;
        Ok(false)
    }

    /// Re-run classification over all unreviewed pending drafts, promoting
    /// any that now satisfy the posting criteria. Drafts a human has already
    /// edited are left alone. A draft that classifies completely but fails
    /// validation counts as `failed` and stays pending.
    pub async fn reprocess(&mut self) -> PipelineResult<ReprocessReport> {
        let drafts = self.storage.list_pending(None, Some(false)).await?;
        let mut rules_by_account: HashMap<String, Vec<MatchingRule>> = HashMap::new();
        let mut report = ReprocessReport::default();

        for draft in drafts {
            let bank_transaction = match self
                .storage
                .find_bank_transaction_for_pending(&draft.id)
                .await?
            {
                Some(tx) => tx,
                // Drafts without a feed source (created by hand elsewhere)
                // are not this pipeline's to reclassify
                None => continue,
            };

            if !rules_by_account.contains_key(&draft.bank_account_id) {
                let rules = self.engine.load_rules(&draft.bank_account_id).await?;
                rules_by_account.insert(draft.bank_account_id.clone(), rules);
            }
            let rules = &rules_by_account[&draft.bank_account_id];

            report.processed += 1;
            let accumulated = self.engine.classify(rules, &bank_transaction);
            let complete = accumulated.is_complete();

            match self
                .decider
                .decide(&bank_transaction, accumulated.clone())
                .await?
            {
                Decision::Post(transaction) => {
                    self.storage.promote_pending(&draft, &transaction).await?;
                    report.approved += 1;
                }
                Decision::Hold(_) => {
                    if complete {
                        report.failed += 1;
                    }
                    let mut updated = draft;
                    updated.property_id = accumulated.property_id;
                    updated.txn_type = accumulated.txn_type;
                    updated.category = accumulated.category;
                    self.storage.update_pending(&updated).await?;
                }
            }
        }

        Ok(report)
    }

    // Rule management. Each mutation persists first, then runs reprocessing
    // as an explicit post-commit step and reports the counts.

    /// Create a matching rule and reprocess pending drafts against the new
    /// rule set
    pub async fn create_rule(
        &mut self,
        mut rule: MatchingRule,
    ) -> PipelineResult<(MatchingRule, ReprocessReport)> {
        rule.updated_at = chrono::Utc::now().naive_utc();
        self.storage.save_rule(&rule).await?;
        let report = self.reprocess().await?;
        Ok((rule, report))
    }

    /// Update an existing matching rule and reprocess
    pub async fn update_rule(
        &mut self,
        mut rule: MatchingRule,
    ) -> PipelineResult<(MatchingRule, ReprocessReport)> {
        if self.storage.get_rule(&rule.id).await?.is_none() {
            return Err(PipelineError::RuleNotFound(rule.id.clone()));
        }
        rule.updated_at = chrono::Utc::now().naive_utc();
        self.storage.save_rule(&rule).await?;
        let report = self.reprocess().await?;
        Ok((rule, report))
    }

    /// Delete a matching rule and reprocess
    pub async fn delete_rule(&mut self, rule_id: &str) -> PipelineResult<ReprocessReport> {
        self.storage.delete_rule(rule_id).await?;
        self.reprocess().await
    }

    /// Get a rule by id
    pub async fn get_rule(&self, rule_id: &str) -> PipelineResult<Option<MatchingRule>> {
        self.storage.get_rule(rule_id).await
    }

    // Review operations, delegated to the review manager

    /// List pending drafts, optionally filtered by account and review status
    pub async fn list_pending(
        &self,
        account_id: Option<&str>,
        reviewed: Option<bool>,
    ) -> PipelineResult<Vec<PendingTransaction>> {
        self.review.list(account_id, reviewed).await
    }

    /// Manually set one classification field on a pending draft
    pub async fn update_pending_field(
        &mut self,
        pending_id: &str,
        update: FieldUpdate,
        reviewed_by: &str,
    ) -> PipelineResult<PendingTransaction> {
        self.review.update_field(pending_id, update, reviewed_by).await
    }

    /// Approve a pending draft, converting it into a posted transaction
    pub async fn approve_pending(
        &mut self,
        pending_id: &str,
        reviewed_by: &str,
    ) -> PipelineResult<Transaction> {
        self.review.approve(pending_id, reviewed_by).await
    }

    /// Approve a set of pending drafts; per-draft failures are reported,
    /// the rest proceed
    pub async fn approve_pending_bulk(
        &mut self,
        pending_ids: &[String],
        reviewed_by: &str,
    ) -> PipelineResult<BulkReviewReport> {
        self.review.approve_many(pending_ids, reviewed_by).await
    }

    /// Reject a pending draft, deleting it and its source bank record
    pub async fn reject_pending(&mut self, pending_id: &str) -> PipelineResult<()> {
        self.review.reject(pending_id).await
    }

    /// Reject a set of pending drafts
    pub async fn reject_pending_bulk(
        &mut self,
        pending_ids: &[String],
    ) -> PipelineResult<BulkReviewReport> {
        self.review.reject_many(pending_ids).await
    }

    /// Get a posted transaction by id
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> PipelineResult<Option<Transaction>> {
        self.storage.get_transaction(transaction_id).await
    }

    /// Find a bank transaction by provider id within an account
    pub async fn find_bank_transaction(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> PipelineResult<Option<BankTransaction>> {
        self.storage.find_bank_transaction(account_id, external_id).await
    }
}
