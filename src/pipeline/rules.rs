//! Condition evaluation and the classification rule engine
//!
//! Rules are an interpreted DSL stored as data: each rule carries an AND
//! tree of field-match clauses plus up to three suggestion fields. The
//! engine orders the active rule set deterministically and accumulates
//! suggestions first-match-wins per field.

use std::cmp::Ordering;

use crate::traits::PipelineStorage;
use crate::types::*;

impl ConditionClause {
    /// Read the clause's field off the transaction. A missing merchant
    /// evaluates as the empty string.
    fn field_value<'a>(&self, transaction: &'a BankTransaction) -> &'a str {
        match self.field {
            ConditionField::Description => &transaction.description,
            ConditionField::Merchant => transaction.merchant.as_deref().unwrap_or(""),
            ConditionField::Currency => &transaction.currency,
            ConditionField::ExternalId => &transaction.external_id,
        }
    }

    /// Evaluate this clause against a transaction
    pub fn matches(&self, transaction: &BankTransaction) -> bool {
        let field_value = self.field_value(transaction);
        let (haystack, needle) = if self.case_sensitive {
            (field_value.to_string(), self.value.clone())
        } else {
            (field_value.to_lowercase(), self.value.to_lowercase())
        };

        match self.match_type {
            MatchType::Contains => haystack.contains(&needle),
            MatchType::Equals => haystack == needle,
        }
    }
}

impl ConditionTree {
    /// Evaluate the tree: all clauses must pass. An empty clause list
    /// matches unconditionally.
    pub fn matches(&self, transaction: &BankTransaction) -> bool {
        match self.operator {
            LogicalOperator::And => self.rules.iter().all(|clause| clause.matches(transaction)),
        }
    }
}

/// Deterministic rule ordering: ascending priority first; at equal priority
/// an account-scoped rule comes before a global one; rule id breaks any
/// remaining tie so the order is total.
pub fn rule_order(a: &MatchingRule, b: &MatchingRule) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.is_global().cmp(&b.is_global()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Loads, orders, and applies the active rule set for an account
pub struct RuleEngine<S: PipelineStorage> {
    storage: S,
}

impl<S: PipelineStorage> RuleEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Fetch the enabled rules applying to an account (account-scoped plus
    /// global) and sort them. Called once per batch or reprocess invocation;
    /// the returned set is held immutable for that call.
    pub async fn load_rules(&self, account_id: &str) -> PipelineResult<Vec<MatchingRule>> {
        let mut rules = self.storage.list_rules_for_account(account_id).await?;
        rules.sort_by(rule_order);
        Ok(rules)
    }

    /// Run an ordered rule set over one transaction, accumulating suggestion
    /// fields. A later rule never overwrites a field an earlier rule set,
    /// but can still fill fields that are empty.
    pub fn classify(&self, rules: &[MatchingRule], transaction: &BankTransaction) -> Classification {
        let mut accumulated = Classification::default();
        for rule in rules {
            if accumulated.is_complete() {
                break;
            }
            if rule.conditions.matches(transaction) {
                accumulated.absorb(rule);
            }
        }
        accumulated
    }
}
