use super::{SalesBatch, SalesProvider};
use crate::era::Era;
use crate::errors::{ReportError, SourceError};
use crate::models::Transaction;
use crate::period::{parse_timestamp, ReportRange};
use crate::storage::read_source;
use crate::stores::{self, DirectorySource, StoreDirectory};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

const SOURCE: &str = "legacy-export";

/// Years up to 2025, served from the flat point-of-sale export.
pub struct LegacyProvider {
    export_path: PathBuf,
    spreadsheet_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyExport {
    Flat(Vec<LegacyRecord>),
    Wrapped { transactions: Vec<LegacyRecord> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    #[serde(alias = "store", alias = "outlet", alias = "store_id")]
    store_id: Value,
    date: String,
    amount: Value,
}

impl LegacyProvider {
    pub fn new(export_path: PathBuf, spreadsheet_path: PathBuf) -> Self {
        Self {
            export_path,
            spreadsheet_path,
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite amounts only; "NaN" and "inf" cells count as unparsable.
fn amount_of(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    amount.filter(|amount| amount.is_finite())
}

/// Parses the export and keeps records inside `range`.
pub fn parse_export(
    bytes: &[u8],
    range: &ReportRange,
) -> Result<(Vec<Transaction>, usize), serde_json::Error> {
    let records = match serde_json::from_slice::<LegacyExport>(bytes)? {
        LegacyExport::Flat(records) => records,
        LegacyExport::Wrapped { transactions } => transactions,
    };

    let mut skipped = 0usize;
    let mut transactions = Vec::new();
    for record in records {
        let (Some(store_id), Some(timestamp), Some(amount)) = (
            text_of(&record.store_id),
            parse_timestamp(&record.date),
            amount_of(&record.amount),
        ) else {
            skipped += 1;
            continue;
        };
        if !range.contains_timestamp(timestamp) {
            continue;
        }
        transactions.push(Transaction {
            transaction_id: None,
            store_id,
            amount,
            timestamp,
            employee_id: None,
            employee_name: None,
        });
    }
    transactions.sort_by_key(|tx| tx.timestamp);
    Ok((transactions, skipped))
}

#[async_trait]
impl SalesProvider for LegacyProvider {
    fn era(&self) -> Era {
        Era::Legacy
    }

    fn has_employees(&self) -> bool {
        false
    }

    async fn fetch(&self, range: &ReportRange) -> Result<SalesBatch, ReportError> {
        let bytes = match read_source(&self.export_path).await {
            Ok(bytes) => bytes,
            Err(SourceError::NotFound(path)) => {
                warn!(%path, "legacy export missing");
                return Ok(SalesBatch::empty(SOURCE, format!("legacy export not found at {path}")));
            }
            Err(err) => {
                warn!("legacy export unavailable: {err}");
                return Ok(SalesBatch::empty(SOURCE, format!("legacy export unavailable: {err}")));
            }
        };

        let (transactions, skipped) =
            parse_export(&bytes, range).map_err(|source| ReportError::MalformedExport {
                path: self.export_path.display().to_string(),
                source,
            })?;
        debug!(count = transactions.len(), skipped, "legacy transactions loaded");

        let mut notes = vec!["legacy export has no employee breakdown".to_string()];
        if skipped > 0 {
            notes.push(format!(
                "{skipped} export records skipped (unparsable store, date or amount)"
            ));
        }

        Ok(SalesBatch {
            transactions,
            source: SOURCE.to_string(),
            notes,
        })
    }

    async fn store_directory(&self) -> (StoreDirectory, Vec<String>) {
        let (directory, note) = stores::load_or_empty(
            DirectorySource::Spreadsheet,
            &self.spreadsheet_path,
            &self.spreadsheet_path,
            None,
        )
        .await;
        (directory, note.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_export_and_filters_range() {
        let export = br#"[
            {"storeId": "1001", "date": "2025-01-05", "amount": 120.5},
            {"store": 1002, "date": "2025-01-06T14:00:00", "amount": "1,000.00"},
            {"outlet": "1001", "date": "2025-02-01", "amount": 99},
            {"storeId": "1003", "date": "05/01/2025", "amount": 10}
        ]"#;
        let range = ReportRange::month(2025, 0).unwrap();
        let (transactions, skipped) = parse_export(export, &range).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(transactions[1].store_id, "1002");
        assert_eq!(transactions[1].amount, 1000.0);
        assert!(transactions.iter().all(|tx| tx.employee_id.is_none()));
    }

    #[test]
    fn non_finite_amounts_are_skipped() {
        let export = br#"[
            {"storeId": "1001", "date": "2025-01-05", "amount": 100},
            {"storeId": "1001", "date": "2025-01-06", "amount": "NaN"},
            {"storeId": "1002", "date": "2025-01-07", "amount": "inf"},
            {"storeId": "1002", "date": "2025-01-08", "amount": "-Infinity"}
        ]"#;
        let range = ReportRange::month(2025, 0).unwrap();
        let (transactions, skipped) = parse_export(export, &range).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(skipped, 3);
        assert!(transactions.iter().all(|tx| tx.amount.is_finite()));
    }

    #[test]
    fn accepts_wrapped_export() {
        let export =
            br#"{"transactions": [{"storeId": "1001", "date": "2025-03-01", "amount": 5}]}"#;
        let range = ReportRange::year(2025).unwrap();
        let (transactions, _) = parse_export(export, &range).unwrap();
        assert_eq!(transactions.len(), 1);
    }

    #[tokio::test]
    async fn malformed_export_is_a_report_error() {
        let path =
            std::env::temp_dir().join(format!("legacy_malformed_{}.json", std::process::id()));
        tokio::fs::write(&path, b"[{\"storeId\": \"1001\"").await.unwrap();
        let provider = LegacyProvider::new(path.clone(), PathBuf::from("/nonexistent/stores.csv"));
        let result = provider.fetch(&ReportRange::year(2025).unwrap()).await;
        let _ = tokio::fs::remove_file(&path).await;
        assert!(matches!(result, Err(ReportError::MalformedExport { .. })));
    }

    #[tokio::test]
    async fn missing_export_degrades_to_empty_batch() {
        let provider = LegacyProvider::new(
            PathBuf::from("/nonexistent/legacy.json"),
            PathBuf::from("/nonexistent/stores.csv"),
        );
        let batch = provider.fetch(&ReportRange::year(2024).unwrap()).await.unwrap();
        assert!(batch.transactions.is_empty());
        assert_eq!(batch.source, "legacy-export");
        let (directory, notes) = provider.store_directory().await;
        assert!(directory.is_empty());
        assert_eq!(notes.len(), 1);
    }
}
