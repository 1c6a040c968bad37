//! Walkthrough of the full pipeline: ingest a feed batch, review what was
//! held, change the rule set, and watch reprocessing promote a draft.
//!
//! Run with: cargo run --example ingest_pipeline

use bankfeed_core::{
    ConditionClause, ConditionField, ConditionTree, IngestPipeline, MatchType, MatchingRule,
    MemoryStorage, PipelineStorage, Property, RawBankRecord, TransactionType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = MemoryStorage::new();
    storage
        .save_property(&Property {
            id: "prop-elm".to_string(),
            name: "12 Elm Road".to_string(),
        })
        .await?;

    // One rule to start: rent payments on this account
    let mut rent_rule = MatchingRule::new(
        "rule-rent".to_string(),
        "Rent from Smith".to_string(),
        Some("acct-1".to_string()),
        0,
        ConditionTree::all_of(vec![ConditionClause {
            field: ConditionField::Description,
            match_type: MatchType::Contains,
            case_sensitive: false,
            value: "rent".to_string(),
        }]),
    );
    rent_rule.suggested_property_id = Some("prop-elm".to_string());
    rent_rule.suggested_type = Some(TransactionType::Income);
    rent_rule.suggested_category = Some("Rent".to_string());
    storage.save_rule(&rent_rule).await?;

    let mut pipeline = IngestPipeline::new(storage);

    let batch = vec![
        RawBankRecord {
            external_id: "ext-1001".to_string(),
            account_id: "acct-1".to_string(),
            posted_at: "2024-01-05T08:00:00Z".to_string(),
            amount_minor: 95_000,
            currency: "GBP".to_string(),
            description: "STANDING ORDER January rent Smith".to_string(),
            merchant: None,
            settled_at: None,
        },
        RawBankRecord {
            external_id: "ext-1002".to_string(),
            account_id: "acct-1".to_string(),
            posted_at: "2024-01-08T10:30:00Z".to_string(),
            amount_minor: -6_000,
            currency: "GBP".to_string(),
            description: "PIMLICO PLUMBERS LTD".to_string(),
            merchant: Some("Pimlico Plumbers".to_string()),
            settled_at: None,
        },
        // A duplicate of the rent record from an overlapping sync window
        RawBankRecord {
            external_id: "ext-1001".to_string(),
            account_id: "acct-1".to_string(),
            posted_at: "2024-01-05T08:00:00Z".to_string(),
            amount_minor: 95_000,
            currency: "GBP".to_string(),
            description: "STANDING ORDER January rent Smith".to_string(),
            merchant: None,
            settled_at: None,
        },
    ];

    let report = pipeline.ingest(&batch, "acct-1").await?;
    println!(
        "ingested: {} processed, {} duplicate-skips, {} errors",
        report.processed,
        report.duplicates,
        report.errors.len()
    );

    let pending = pipeline.list_pending(Some("acct-1"), Some(false)).await?;
    println!("held for review: {} draft(s)", pending.len());
    for draft in &pending {
        println!(
            "  {} | {} | {} minor units",
            draft.id, draft.description, draft.amount_minor
        );
    }

    // A new rule arrives that covers the plumber; reprocessing promotes
    // the draft automatically
    let mut plumber_rule = MatchingRule::new(
        "rule-plumber".to_string(),
        "Plumber callouts".to_string(),
        Some("acct-1".to_string()),
        5,
        ConditionTree::all_of(vec![ConditionClause {
            field: ConditionField::Description,
            match_type: MatchType::Contains,
            case_sensitive: false,
            value: "plumbers".to_string(),
        }]),
    );
    plumber_rule.suggested_property_id = Some("prop-elm".to_string());
    plumber_rule.suggested_type = Some(TransactionType::Expense);
    plumber_rule.suggested_category = Some("Repair".to_string());

    let (_, reprocess) = pipeline.create_rule(plumber_rule).await?;
    println!(
        "rule created; reprocessing: {} processed, {} approved, {} failed",
        reprocess.processed, reprocess.approved, reprocess.failed
    );

    let remaining = pipeline.list_pending(Some("acct-1"), None).await?;
    println!("drafts still pending: {}", remaining.len());

    Ok(())
}
