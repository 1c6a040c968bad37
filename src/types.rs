//! Core types and data structures for the bank-feed classification pipeline

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a posted ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money received (rent, deposits, fees collected)
    Income,
    /// Money spent (maintenance, taxes, services)
    Expense,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "Income"),
            TransactionType::Expense => write!(f, "Expense"),
        }
    }
}

/// One raw record as delivered by the upstream bank-sync collaborator.
///
/// Timestamps arrive as ISO-8601 strings and are only parsed during
/// normalization so that a malformed record fails cleanly per-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBankRecord {
    /// Provider-assigned transaction id, unique per account
    pub external_id: String,
    /// Owning bank account id
    pub account_id: String,
    /// ISO-8601 transaction timestamp
    pub posted_at: String,
    /// Signed amount in minor currency units (negative = debit)
    pub amount_minor: i64,
    /// ISO currency code
    pub currency: String,
    /// Free-text description from the provider
    pub description: String,
    /// Counterparty / merchant name, when the provider supplies one
    pub merchant: Option<String>,
    /// ISO-8601 settlement timestamp, if already settled
    pub settled_at: Option<String>,
}

/// Immutable record of one externally-observed bank movement.
///
/// Created once per ingested record and never mutated afterwards, except to
/// set exactly one of `transaction_id` / `pending_transaction_id` once the
/// record has been processed (never both).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Internal identifier
    pub id: String,
    /// Owning bank account id
    pub account_id: String,
    /// Provider-assigned transaction id, unique per account
    pub external_id: String,
    /// Signed amount in minor currency units
    pub amount_minor: i64,
    /// ISO currency code
    pub currency: String,
    /// Free-text description
    pub description: String,
    /// Counterparty / merchant, when known
    pub merchant: Option<String>,
    /// When the movement happened at the bank
    pub posted_at: DateTime<Utc>,
    /// When the movement settled, if known
    pub settled_at: Option<DateTime<Utc>>,
    /// Link to the posted ledger transaction, once auto-posted or approved
    pub transaction_id: Option<String>,
    /// Link to the pending draft, while held for review
    pub pending_transaction_id: Option<String>,
    /// When this record was ingested
    pub created_at: NaiveDateTime,
}

impl BankTransaction {
    /// Whether the record has reached a terminal processed state
    pub fn is_processed(&self) -> bool {
        self.transaction_id.is_some() || self.pending_transaction_id.is_some()
    }
}

/// Boolean combinator for a condition tree. Only AND composition is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
}

/// The transaction field a condition clause reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Description,
    Merchant,
    Currency,
    ExternalId,
}

/// How a clause compares the field value against its literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Contains,
    Equals,
}

fn default_false() -> bool {
    false
}

/// One field-comparison clause inside a condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionClause {
    /// Field the clause reads
    pub field: ConditionField,
    /// Comparison kind
    pub match_type: MatchType,
    /// Case-sensitive comparison; defaults to false when omitted
    #[serde(default = "default_false")]
    pub case_sensitive: bool,
    /// Literal value to compare against
    pub value: String,
}

/// A rule's condition tree: AND of field-match clauses, stored as data.
///
/// An empty clause list matches unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTree {
    pub operator: LogicalOperator,
    pub rules: Vec<ConditionClause>,
}

impl ConditionTree {
    /// A tree that matches every transaction
    pub fn unconditional() -> Self {
        Self {
            operator: LogicalOperator::And,
            rules: Vec::new(),
        }
    }

    /// Build an AND tree over the given clauses
    pub fn all_of(rules: Vec<ConditionClause>) -> Self {
        Self {
            operator: LogicalOperator::And,
            rules,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// A named, priority-ordered, conditionally-applied classification suggestion.
///
/// A rule scoped to a bank account (`bank_account_id` set) applies only to
/// that account; a global rule (`bank_account_id` unset) applies to all.
/// Any subset of the three suggestion fields may be set; unset fields
/// contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: String,
    pub name: String,
    /// Owning account, or `None` for a global rule
    pub bank_account_id: Option<String>,
    /// Ascending priority: lower values are evaluated first
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub conditions: ConditionTree,
    pub suggested_property_id: Option<String>,
    pub suggested_type: Option<TransactionType>,
    pub suggested_category: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl MatchingRule {
    /// Create an enabled rule with no suggestions set
    pub fn new(
        id: String,
        name: String,
        bank_account_id: Option<String>,
        priority: i32,
        conditions: ConditionTree,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            name,
            bank_account_id,
            priority,
            enabled: true,
            conditions,
            suggested_property_id: None,
            suggested_type: None,
            suggested_category: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the rule is global (applies to every account)
    pub fn is_global(&self) -> bool {
        self.bank_account_id.is_none()
    }
}

/// Accumulated classification fields, each independently unset until some
/// rule (or a human) supplies it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub property_id: Option<String>,
    pub txn_type: Option<TransactionType>,
    pub category: Option<String>,
}

impl Classification {
    /// All three fields populated
    pub fn is_complete(&self) -> bool {
        self.property_id.is_some() && self.txn_type.is_some() && self.category.is_some()
    }

    /// Merge a rule's suggestions into still-empty fields only. Fields that
    /// are already set keep their value; the earliest matching rule wins
    /// per field.
    pub fn absorb(&mut self, rule: &MatchingRule) {
        if self.property_id.is_none() {
            self.property_id = rule.suggested_property_id.clone();
        }
        if self.txn_type.is_none() {
            self.txn_type = rule.suggested_type;
        }
        if self.category.is_none() {
            self.category = rule.suggested_category.clone();
        }
    }
}

/// A posted ledger transaction. Always fully classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub property_id: String,
    pub txn_type: TransactionType,
    pub category: String,
    /// Signed amount in minor units, copied unchanged from the bank record
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Source bank record, when created by the pipeline
    pub bank_transaction_id: Option<String>,
    /// True for transactions created by the ingest pipeline
    pub is_imported: bool,
    pub imported_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// A draft transaction held for human review, with whatever classification
/// fields were inferred. `reviewed_at` / `reviewed_by` stay unset until a
/// human edits or approves the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: String,
    pub bank_account_id: String,
    pub property_id: Option<String>,
    pub txn_type: Option<TransactionType>,
    pub category: Option<String>,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub description: String,
    pub reviewed_at: Option<NaiveDateTime>,
    pub reviewed_by: Option<String>,
    pub created_at: NaiveDateTime,
}

impl PendingTransaction {
    /// Whether a human has touched this draft
    pub fn is_reviewed(&self) -> bool {
        self.reviewed_at.is_some()
    }

    /// Current classification state of the draft
    pub fn classification(&self) -> Classification {
        Classification {
            property_id: self.property_id.clone(),
            txn_type: self.txn_type,
            category: self.category.clone(),
        }
    }
}

/// Reference entity for property-existence validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
}

/// Outcome of processing one bank record: posted or held for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessedOutcome {
    Posted(Transaction),
    Held(PendingTransaction),
}

/// How a duplicate was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Same (account, external id) pair as a prior record
    Exact,
    /// Equal amount, ±1-day window, and similar description
    Fuzzy,
}

/// Result of a duplicate check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub match_kind: Option<MatchKind>,
    pub matched: Option<BankTransaction>,
}

impl DuplicateCheck {
    /// The no-duplicate result
    pub fn none() -> Self {
        Self {
            is_duplicate: false,
            match_kind: None,
            matched: None,
        }
    }
}

/// Per-record failure captured during a batch ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestError {
    /// External id of the record that failed
    pub external_id: String,
    pub message: String,
}

/// Summary returned by a batch ingest. A single record's failure never
/// aborts the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records that reached a terminal state (posted, pending, or
    /// duplicate-skip)
    pub processed: usize,
    /// Records skipped as duplicates (included in `processed`)
    pub duplicates: usize,
    pub errors: Vec<IngestError>,
}

/// Summary returned by reprocessing after a rule change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReprocessReport {
    /// Unreviewed pending drafts examined
    pub processed: usize,
    /// Drafts promoted to posted transactions
    pub approved: usize,
    /// Drafts whose classification is complete but fails validation
    pub failed: usize,
}

/// Errors that can occur in the classification pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Property not found: {0}")]
    PropertyNotFound(String),
    #[error("Matching rule not found: {0}")]
    RuleNotFound(String),
    #[error("Pending transaction not found: {0}")]
    PendingNotFound(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
