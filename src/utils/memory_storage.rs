//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::PipelineStorage;
use crate::types::*;

#[derive(Debug, Default)]
struct Store {
    /// Ingestion-ordered log of bank transactions
    bank_transactions: Vec<BankTransaction>,
    transactions: HashMap<String, Transaction>,
    pending: HashMap<String, PendingTransaction>,
    rules: HashMap<String, MatchingRule>,
    properties: HashMap<String, Property>,
}

/// In-memory storage backend.
///
/// All collections live behind a single lock so that the multi-record write
/// operations of `PipelineStorage` are genuinely atomic: either every piece
/// of a processed record lands, or none does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Store>>,
}

impl MemoryStorage {
    /// Create a new empty storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        let mut store = self.inner.write().unwrap();
        *store = Store::default();
    }

    /// Number of bank transactions currently recorded
    pub fn bank_transaction_count(&self) -> usize {
        self.inner.read().unwrap().bank_transactions.len()
    }
}

#[async_trait]
impl PipelineStorage for MemoryStorage {
    async fn find_bank_transaction(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> PipelineResult<Option<BankTransaction>> {
        let store = self.inner.read().unwrap();
        Ok(store
            .bank_transactions
            .iter()
            .find(|tx| tx.account_id == account_id && tx.external_id == external_id)
            .cloned())
    }

    async fn list_bank_transactions(
        &self,
        account_id: &str,
    ) -> PipelineResult<Vec<BankTransaction>> {
        let store = self.inner.read().unwrap();
        Ok(store
            .bank_transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn find_bank_transaction_for_pending(
        &self,
        pending_id: &str,
    ) -> PipelineResult<Option<BankTransaction>> {
        let store = self.inner.read().unwrap();
        Ok(store
            .bank_transactions
            .iter()
            .find(|tx| tx.pending_transaction_id.as_deref() == Some(pending_id))
            .cloned())
    }

    async fn save_processed(
        &mut self,
        bank_transaction: &BankTransaction,
        outcome: &ProcessedOutcome,
    ) -> PipelineResult<()> {
        let mut store = self.inner.write().unwrap();
        match outcome {
            ProcessedOutcome::Posted(transaction) => {
                store
                    .transactions
                    .insert(transaction.id.clone(), transaction.clone());
            }
            ProcessedOutcome::Held(pending) => {
                store.pending.insert(pending.id.clone(), pending.clone());
            }
        }
        store.bank_transactions.push(bank_transaction.clone());
        Ok(())
    }

    async fn promote_pending(
        &mut self,
        pending: &PendingTransaction,
        transaction: &Transaction,
    ) -> PipelineResult<()> {
        let mut store = self.inner.write().unwrap();
        if store.pending.remove(&pending.id).is_none() {
            return Err(PipelineError::PendingNotFound(pending.id.clone()));
        }
        store
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        if let Some(bank_tx) = store
            .bank_transactions
            .iter_mut()
            .find(|tx| tx.pending_transaction_id.as_deref() == Some(pending.id.as_str()))
        {
            bank_tx.pending_transaction_id = None;
            bank_tx.transaction_id = Some(transaction.id.clone());
        }
        Ok(())
    }

    async fn discard_pending(&mut self, pending_id: &str) -> PipelineResult<()> {
        let mut store = self.inner.write().unwrap();
        if store.pending.remove(pending_id).is_none() {
            return Err(PipelineError::PendingNotFound(pending_id.to_string()));
        }
        store
            .bank_transactions
            .retain(|tx| tx.pending_transaction_id.as_deref() != Some(pending_id));
        Ok(())
    }

    async fn get_pending(&self, pending_id: &str) -> PipelineResult<Option<PendingTransaction>> {
        Ok(self.inner.read().unwrap().pending.get(pending_id).cloned())
    }

    async fn update_pending(&mut self, pending: &PendingTransaction) -> PipelineResult<()> {
        let mut store = self.inner.write().unwrap();
        if !store.pending.contains_key(&pending.id) {
            return Err(PipelineError::PendingNotFound(pending.id.clone()));
        }
        store.pending.insert(pending.id.clone(), pending.clone());
        Ok(())
    }

    async fn list_pending(
        &self,
        account_id: Option<&str>,
        reviewed: Option<bool>,
    ) -> PipelineResult<Vec<PendingTransaction>> {
        let store = self.inner.read().unwrap();
        let mut drafts: Vec<PendingTransaction> = store
            .pending
            .values()
            .filter(|p| account_id.is_none_or(|id| p.bank_account_id == id))
            .filter(|p| reviewed.is_none_or(|r| p.is_reviewed() == r))
            .cloned()
            .collect();
        drafts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(drafts)
    }

    async fn get_transaction(&self, transaction_id: &str) -> PipelineResult<Option<Transaction>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .transactions
            .get(transaction_id)
            .cloned())
    }

    async fn save_rule(&mut self, rule: &MatchingRule) -> PipelineResult<()> {
        self.inner
            .write()
            .unwrap()
            .rules
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn get_rule(&self, rule_id: &str) -> PipelineResult<Option<MatchingRule>> {
        Ok(self.inner.read().unwrap().rules.get(rule_id).cloned())
    }

    async fn delete_rule(&mut self, rule_id: &str) -> PipelineResult<()> {
        if self
            .inner
            .write()
            .unwrap()
            .rules
            .remove(rule_id)
            .is_none()
        {
            return Err(PipelineError::RuleNotFound(rule_id.to_string()));
        }
        Ok(())
    }

    async fn list_rules_for_account(
        &self,
        account_id: &str,
    ) -> PipelineResult<Vec<MatchingRule>> {
        let store = self.inner.read().unwrap();
        Ok(store
            .rules
            .values()
            .filter(|rule| rule.enabled)
            .filter(|rule| {
                rule.is_global() || rule.bank_account_id.as_deref() == Some(account_id)
            })
            .cloned()
            .collect())
    }

    async fn get_property(&self, property_id: &str) -> PipelineResult<Option<Property>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .properties
            .get(property_id)
            .cloned())
    }

    async fn save_property(&mut self, property: &Property) -> PipelineResult<()> {
        self.inner
            .write()
            .unwrap()
            .properties
            .insert(property.id.clone(), property.clone());
        Ok(())
    }
}
