//! Normalization of raw bank-sync records into the pipeline's internal shape

use chrono::{DateTime, Utc};

use crate::types::*;

/// Converts raw provider records into `BankTransaction` values.
///
/// A malformed record (unparseable timestamp, missing identifiers) fails
/// with `PipelineError::MalformedRecord`; the batch runner captures that
/// per-record and keeps going.
#[derive(Debug, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one raw record. The returned transaction carries no outcome
    /// link yet; the pipeline sets exactly one link before persisting.
    pub fn normalize(&self, raw: &RawBankRecord) -> PipelineResult<BankTransaction> {
        if raw.external_id.trim().is_empty() {
            return Err(PipelineError::MalformedRecord(
                "external id is empty".to_string(),
            ));
        }
        if raw.account_id.trim().is_empty() {
            return Err(PipelineError::MalformedRecord(
                "account id is empty".to_string(),
            ));
        }
        if raw.currency.trim().is_empty() {
            return Err(PipelineError::MalformedRecord(
                "currency is empty".to_string(),
            ));
        }

        let posted_at = parse_timestamp(&raw.posted_at).ok_or_else(|| {
            PipelineError::MalformedRecord(format!(
                "unparseable transaction timestamp '{}'",
                raw.posted_at
            ))
        })?;

        let settled_at = match raw.settled_at.as_deref() {
            Some(value) => Some(parse_timestamp(value).ok_or_else(|| {
                PipelineError::MalformedRecord(format!(
                    "unparseable settlement timestamp '{}'",
                    value
                ))
            })?),
            None => None,
        };

        let merchant = raw
            .merchant
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(BankTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: raw.account_id.clone(),
            external_id: raw.external_id.clone(),
            amount_minor: raw.amount_minor,
            currency: raw.currency.clone(),
            description: raw.description.trim().to_string(),
            merchant,
            posted_at,
            settled_at,
            transaction_id: None,
            pending_transaction_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        })
    }
}

/// Parse an ISO-8601 timestamp. Accepts full RFC-3339 values and bare
/// `YYYY-MM-DD` dates (taken as midnight UTC).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(
            date.and_hms_opt(0, 0, 0)?,
            Utc,
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_record() -> RawBankRecord {
        RawBankRecord {
            external_id: "ext-100".to_string(),
            account_id: "acct-1".to_string(),
            posted_at: "2024-01-20T09:30:00Z".to_string(),
            amount_minor: -12_500,
            currency: "GBP".to_string(),
            description: "  British Gas Energy  ".to_string(),
            merchant: Some("British Gas".to_string()),
            settled_at: Some("2024-01-21".to_string()),
        }
    }

    #[test]
    fn normalizes_a_well_formed_record() {
        let tx = Normalizer::new().normalize(&raw_record()).unwrap();
        assert_eq!(tx.account_id, "acct-1");
        assert_eq!(tx.external_id, "ext-100");
        assert_eq!(tx.amount_minor, -12_500);
        assert_eq!(tx.description, "British Gas Energy");
        assert_eq!(tx.merchant.as_deref(), Some("British Gas"));
        assert_eq!(tx.posted_at.to_rfc3339(), "2024-01-20T09:30:00+00:00");
        assert!(tx.settled_at.is_some());
        assert!(!tx.is_processed());
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let mut raw = raw_record();
        raw.posted_at = "20/01/2024 09:30".to_string();
        let err = Normalizer::new().normalize(&raw).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRecord(_)));
    }

    #[test]
    fn rejects_empty_external_id() {
        let mut raw = raw_record();
        raw.external_id = "   ".to_string();
        assert!(Normalizer::new().normalize(&raw).is_err());
    }

    #[test]
    fn blank_merchant_becomes_none() {
        let mut raw = raw_record();
        raw.merchant = Some("   ".to_string());
        let tx = Normalizer::new().normalize(&raw).unwrap();
        assert!(tx.merchant.is_none());
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let mut raw = raw_record();
        raw.posted_at = "2024-01-20".to_string();
        let tx = Normalizer::new().normalize(&raw).unwrap();
        assert_eq!(tx.posted_at.to_rfc3339(), "2024-01-20T00:00:00+00:00");
    }
}
