//! Duplicate detection against previously ingested bank transactions
//!
//! Two strategies, tried in order: exact match on (account, external id),
//! then fuzzy match on equal amount, a ±1-day window, and description
//! similarity. An exact match always wins and short-circuits fuzzy
//! evaluation.

use crate::traits::PipelineStorage;
use crate::types::*;
use crate::utils::text::{normalize_description, similarity_ratio};

/// Inclusive date-window for fuzzy matching, in seconds. One calendar day
/// across a midnight boundary qualifies; exactly two days does not.
const FUZZY_WINDOW_SECONDS: i64 = 86_400;

/// Minimum normalized description similarity for a fuzzy match
const FUZZY_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Detects whether a candidate record already exists among an account's
/// previously ingested transactions.
pub struct DuplicateDetector<S: PipelineStorage> {
    storage: S,
}

impl<S: PipelineStorage> DuplicateDetector<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Check a normalized candidate against prior records in its account.
    ///
    /// Lookup failures propagate; they are never treated as "no duplicate".
    pub async fn check(
        &self,
        candidate: &BankTransaction,
        account_id: &str,
    ) -> PipelineResult<DuplicateCheck> {
        // Exact match: same provider id within the account
        if let Some(existing) = self
            .storage
            .find_bank_transaction(account_id, &candidate.external_id)
            .await?
        {
            return Ok(DuplicateCheck {
                is_duplicate: true,
                match_kind: Some(MatchKind::Exact),
                matched: Some(existing),
            });
        }

        let prior = self.storage.list_bank_transactions(account_id).await?;
        let candidate_desc = normalize_description(&candidate.description);

        // Among qualifying fuzzy candidates, the most recently created
        // record wins. `max_by_key` returns the last maximum, so records
        // listed later (ingested later) win creation-time ties.
        let best = prior
            .into_iter()
            .filter(|existing| is_fuzzy_match(existing, candidate, &candidate_desc))
            .max_by_key(|existing| existing.created_at);

        match best {
            Some(matched) => Ok(DuplicateCheck {
                is_duplicate: true,
                match_kind: Some(MatchKind::Fuzzy),
                matched: Some(matched),
            }),
            None => Ok(DuplicateCheck::none()),
        }
    }
}

fn is_fuzzy_match(
    existing: &BankTransaction,
    candidate: &BankTransaction,
    candidate_desc: &str,
) -> bool {
    // Amount must be equal exactly, including sign; a debit never matches
    // a credit of the same magnitude
    if existing.amount_minor != candidate.amount_minor {
        return false;
    }

    let seconds_apart = (existing.posted_at - candidate.posted_at).num_seconds().abs();
    if seconds_apart > FUZZY_WINDOW_SECONDS {
        return false;
    }

    let existing_desc = normalize_description(&existing.description);
    similarity_ratio(&existing_desc, candidate_desc) >= FUZZY_SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PipelineStorage;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    fn stored_tx(
        account_id: &str,
        external_id: &str,
        amount_minor: i64,
        description: &str,
        posted_at: chrono::DateTime<Utc>,
    ) -> BankTransaction {
        BankTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            external_id: external_id.to_string(),
            amount_minor,
            currency: "GBP".to_string(),
            description: description.to_string(),
            merchant: None,
            posted_at,
            settled_at: None,
            transaction_id: None,
            pending_transaction_id: Some(format!("pend-{external_id}")),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn pending_for(tx: &BankTransaction) -> PendingTransaction {
        PendingTransaction {
            id: tx.pending_transaction_id.clone().unwrap(),
            bank_account_id: tx.account_id.clone(),
            property_id: None,
            txn_type: None,
            category: None,
            amount_minor: tx.amount_minor,
            date: tx.posted_at.date_naive(),
            description: tx.description.clone(),
            reviewed_at: None,
            reviewed_by: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    async fn seed(storage: &mut MemoryStorage, tx: &BankTransaction) {
        let pending = pending_for(tx);
        storage
            .save_processed(tx, &ProcessedOutcome::Held(pending))
            .await
            .unwrap();
    }

    fn candidate(
        account_id: &str,
        external_id: &str,
        amount_minor: i64,
        description: &str,
        posted_at: chrono::DateTime<Utc>,
    ) -> BankTransaction {
        let mut tx = stored_tx(account_id, external_id, amount_minor, description, posted_at);
        tx.pending_transaction_id = None;
        tx
    }

    fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn exact_match_on_external_id_regardless_of_other_fields() {
        let mut storage = MemoryStorage::new();
        seed(
            &mut storage,
            &stored_tx("acct-1", "ext-1", -10_000, "Original text", at(2024, 1, 20)),
        )
        .await;
        let detector = DuplicateDetector::new(storage);

        let check = detector
            .check(
                &candidate("acct-1", "ext-1", 99_999, "Completely different", at(2024, 3, 5)),
                "acct-1",
            )
            .await
            .unwrap();

        assert!(check.is_duplicate);
        assert_eq!(check.match_kind, Some(MatchKind::Exact));
        assert_eq!(check.matched.unwrap().external_id, "ext-1");
    }

    #[tokio::test]
    async fn exact_match_wins_when_a_fuzzy_match_also_qualifies() {
        let mut storage = MemoryStorage::new();
        // The candidate matches ext-1 exactly and ext-2 fuzzily (same
        // amount, same day, identical description)
        seed(
            &mut storage,
            &stored_tx("acct-1", "ext-1", -10_000, "Gym membership", at(2024, 1, 20)),
        )
        .await;
        seed(
            &mut storage,
            &stored_tx("acct-1", "ext-2", -10_000, "Gym membership", at(2024, 1, 20)),
        )
        .await;
        let detector = DuplicateDetector::new(storage);

        let check = detector
            .check(
                &candidate("acct-1", "ext-1", -10_000, "Gym membership", at(2024, 1, 20)),
                "acct-1",
            )
            .await
            .unwrap();

        assert!(check.is_duplicate);
        assert_eq!(check.match_kind, Some(MatchKind::Exact));
        assert_eq!(check.matched.unwrap().external_id, "ext-1");
    }

    #[tokio::test]
    async fn same_external_id_in_another_account_is_not_a_duplicate() {
        let mut storage = MemoryStorage::new();
        seed(
            &mut storage,
            &stored_tx("acct-1", "ext-1", -10_000, "Tesco Supermarket", at(2024, 1, 20)),
        )
        .await;
        let detector = DuplicateDetector::new(storage);

        let check = detector
            .check(
                &candidate("acct-2", "ext-1", -20_000, "Something else", at(2024, 3, 5)),
                "acct-2",
            )
            .await
            .unwrap();

        assert!(!check.is_duplicate);
        assert!(check.match_kind.is_none());
        assert!(check.matched.is_none());
    }

    #[tokio::test]
    async fn fuzzy_window_spans_one_day_but_not_two() {
        let mut storage = MemoryStorage::new();
        seed(
            &mut storage,
            &stored_tx("acct-1", "ext-1", -10_000, "X", at(2024, 1, 20)),
        )
        .await;
        let detector = DuplicateDetector::new(storage);

        let next_day = detector
            .check(
                &candidate("acct-1", "ext-2", -10_000, "X", at(2024, 1, 21)),
                "acct-1",
            )
            .await
            .unwrap();
        assert!(next_day.is_duplicate);
        assert_eq!(next_day.match_kind, Some(MatchKind::Fuzzy));

        let two_days = detector
            .check(
                &candidate("acct-1", "ext-3", -10_000, "X", at(2024, 1, 22)),
                "acct-1",
            )
            .await
            .unwrap();
        assert!(!two_days.is_duplicate);
    }

    #[tokio::test]
    async fn fuzzy_requires_exact_signed_amount() {
        let mut storage = MemoryStorage::new();
        seed(
            &mut storage,
            &stored_tx("acct-1", "ext-1", -10_000, "Rent payment", at(2024, 1, 20)),
        )
        .await;
        let detector = DuplicateDetector::new(storage);

        // Credit of the same magnitude is not a duplicate of a debit
        let flipped = detector
            .check(
                &candidate("acct-1", "ext-2", 10_000, "Rent payment", at(2024, 1, 20)),
                "acct-1",
            )
            .await
            .unwrap();
        assert!(!flipped.is_duplicate);

        let off_by_one = detector
            .check(
                &candidate("acct-1", "ext-3", -10_001, "Rent payment", at(2024, 1, 20)),
                "acct-1",
            )
            .await
            .unwrap();
        assert!(!off_by_one.is_duplicate);
    }

    #[tokio::test]
    async fn similarity_threshold_separates_variants_from_strangers() {
        let mut storage = MemoryStorage::new();
        seed(
            &mut storage,
            &stored_tx(
                "acct-1",
                "ext-1",
                -10_000,
                "Tesco Supermarket Oxford Street",
                at(2024, 1, 20),
            ),
        )
        .await;
        seed(
            &mut storage,
            &stored_tx(
                "acct-1",
                "ext-2",
                -4_500,
                "Amazon Marketplace Purchase",
                at(2024, 1, 20),
            ),
        )
        .await;
        let detector = DuplicateDetector::new(storage);

        let variant = detector
            .check(
                &candidate(
                    "acct-1",
                    "ext-10",
                    -10_000,
                    "Tesco Supermarket Oxford St",
                    at(2024, 1, 20),
                ),
                "acct-1",
            )
            .await
            .unwrap();
        assert!(variant.is_duplicate);
        assert_eq!(variant.match_kind, Some(MatchKind::Fuzzy));

        let stranger = detector
            .check(
                &candidate("acct-1", "ext-11", -4_500, "Starbucks Coffee", at(2024, 1, 20)),
                "acct-1",
            )
            .await
            .unwrap();
        assert!(!stranger.is_duplicate);
    }

    #[tokio::test]
    async fn most_recently_created_fuzzy_candidate_wins() {
        let mut storage = MemoryStorage::new();
        let mut older = stored_tx("acct-1", "ext-1", -10_000, "Gym membership", at(2024, 1, 20));
        older.created_at = Utc.with_ymd_and_hms(2024, 1, 20, 8, 0, 0).unwrap().naive_utc();
        let mut newer = stored_tx("acct-1", "ext-2", -10_000, "Gym membership", at(2024, 1, 20));
        newer.created_at = Utc.with_ymd_and_hms(2024, 1, 21, 8, 0, 0).unwrap().naive_utc();
        seed(&mut storage, &older).await;
        seed(&mut storage, &newer).await;
        let detector = DuplicateDetector::new(storage);

        let check = detector
            .check(
                &candidate("acct-1", "ext-3", -10_000, "Gym membership", at(2024, 1, 20)),
                "acct-1",
            )
            .await
            .unwrap();

        assert_eq!(check.matched.unwrap().external_id, "ext-2");
    }
}
