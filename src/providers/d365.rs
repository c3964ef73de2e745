use super::{SalesBatch, SalesProvider};
use crate::config::D365Config;
use crate::employee::parse_employee;
use crate::era::Era;
use crate::errors::{ReportError, SourceError};
use crate::models::Transaction;
use crate::period::{parse_timestamp, ReportRange};
use crate::stores::{self, DirectorySource, StoreDirectory};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::PgPool;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const API_SOURCE: &str = "d365-api";
const CACHE_SOURCE: &str = "d365-sql-cache";

/// Thin client for the retail transactions OData feed.
#[derive(Clone)]
pub struct D365Client {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ODataPage {
    #[serde(default)]
    value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RetailTransactionRecord {
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default, alias = "StoreId")]
    store: Option<String>,
    #[serde(default)]
    transaction_date: Option<String>,
    #[serde(default)]
    gross_amount: Option<f64>,
    #[serde(default)]
    employee: Option<String>,
}

impl RetailTransactionRecord {
    fn into_transaction(self) -> Option<Transaction> {
        let transaction_id = self.transaction_id.filter(|id| !id.trim().is_empty())?;
        let store_id = self
            .store
            .map(|store| store.trim().to_string())
            .filter(|store| !store.is_empty())?;
        let amount = self.gross_amount.filter(|amount| amount.is_finite())?;
        let timestamp = parse_timestamp(self.transaction_date.as_deref()?)?;
        let identity = self
            .employee
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(parse_employee);
        Some(Transaction {
            transaction_id: Some(transaction_id),
            store_id,
            amount,
            timestamp,
            employee_id: identity.as_ref().map(|e| e.id.clone()),
            employee_name: identity.map(|e| e.name),
        })
    }
}

/// Converts one page of raw records; unusable records are counted, not fatal.
fn page_transactions(values: Vec<serde_json::Value>) -> (Vec<Transaction>, usize) {
    let mut skipped = 0usize;
    let mut transactions = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<RetailTransactionRecord>(value)
            .ok()
            .and_then(RetailTransactionRecord::into_transaction)
        {
            Some(tx) => transactions.push(tx),
            None => skipped += 1,
        }
    }
    (transactions, skipped)
}

/// Result of walking the paged feed; `error` is set when a page failed.
#[derive(Debug, Default)]
pub struct FeedResult {
    pub transactions: Vec<Transaction>,
    pub pages: usize,
    pub skipped: usize,
    pub error: Option<SourceError>,
}

impl D365Client {
    pub fn new(http: reqwest::Client, settings: &D365Config) -> Self {
        Self {
            http,
            base_url: settings.base_url.clone(),
            access_token: settings.access_token.clone(),
        }
    }

    fn range_filter(range: &ReportRange) -> String {
        format!(
            "TransactionDate ge {} and TransactionDate le {}",
            range.start_of_range().format("%Y-%m-%dT%H:%M:%SZ"),
            range.end_of_range().format("%Y-%m-%dT%H:%M:%SZ"),
        )
    }

    async fn get_page(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<ODataPage, SourceError> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<ODataPage>().await?)
    }

    /// Follows `@odata.nextLink` one page at a time. Pages fetched before a
    /// failure are kept.
    pub async fn fetch_range(&self, range: &ReportRange) -> FeedResult {
        let mut result = FeedResult::default();
        let mut url = format!("{}/RetailTransactions", self.base_url);
        let mut request = self.http.get(&url).query(&[
            ("$filter", Self::range_filter(range)),
            ("$orderby", "TransactionDate".to_string()),
        ]);

        loop {
            let page = match self.get_page(request, &url).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(pages = result.pages, "d365 page fetch failed: {err}");
                    result.error = Some(err);
                    break;
                }
            };
            result.pages += 1;
            let fetched = page.value.len();
            let (transactions, skipped) = page_transactions(page.value);
            result.skipped += skipped;
            result.transactions.extend(
                transactions
                    .into_iter()
                    .filter(|tx| range.contains_timestamp(tx.timestamp)),
            );
            debug!(page = result.pages, fetched, skipped, "d365 page received");

            match page.next_link {
                Some(next) if !next.is_empty() => {
                    request = self.http.get(&next);
                    url = next;
                }
                _ => break,
            }
        }

        result
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CachedTransaction {
    transaction_id: String,
    store_id: String,
    amount: f64,
    transaction_date: NaiveDateTime,
    employee_id: Option<String>,
    employee_name: Option<String>,
}

impl From<CachedTransaction> for Transaction {
    fn from(row: CachedTransaction) -> Self {
        Transaction {
            transaction_id: Some(row.transaction_id),
            store_id: row.store_id,
            amount: row.amount,
            timestamp: row.transaction_date,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
        }
    }
}

pub async fn read_cache(
    pool: &PgPool,
    range: &ReportRange,
) -> Result<Vec<Transaction>, SourceError> {
    let rows = sqlx::query_as::<_, CachedTransaction>(
        r#"
        SELECT transaction_id, store_id, amount, transaction_date, employee_id, employee_name
        FROM d365_transactions
        WHERE transaction_date >= $1 AND transaction_date <= $2
        ORDER BY transaction_date
        "#,
    )
    .bind(range.start_of_range())
    .bind(range.end_of_range())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Transaction::from).collect())
}

pub async fn write_cache(
    pool: &PgPool,
    transactions: &[Transaction],
) -> Result<u64, SourceError> {
    let mut tx = pool.begin().await?;
    let mut written = 0u64;
    for record in transactions {
        let Some(transaction_id) = record.transaction_id.as_deref() else {
            continue;
        };
        let result = sqlx::query(
            r#"
            INSERT INTO d365_transactions
                (transaction_id, store_id, amount, transaction_date, employee_id, employee_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (transaction_id) DO UPDATE SET
                store_id = EXCLUDED.store_id,
                amount = EXCLUDED.amount,
                transaction_date = EXCLUDED.transaction_date,
                employee_id = EXCLUDED.employee_id,
                employee_name = EXCLUDED.employee_name
            "#,
        )
        .bind(transaction_id)
        .bind(&record.store_id)
        .bind(record.amount)
        .bind(record.timestamp)
        .bind(record.employee_id.as_deref())
        .bind(record.employee_name.as_deref())
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }
    tx.commit().await?;
    Ok(written)
}

/// Years from 2026 on: live API first, SQL cache as write-through store and fallback.
pub struct D365Provider {
    client: Option<D365Client>,
    pool: Option<PgPool>,
    management_path: PathBuf,
}

impl D365Provider {
    pub fn new(
        client: Option<D365Client>,
        pool: Option<PgPool>,
        management_path: PathBuf,
    ) -> Self {
        Self {
            client,
            pool,
            management_path,
        }
    }

    async fn from_cache(
        &self,
        range: &ReportRange,
        notes: &mut Vec<String>,
    ) -> Option<Vec<Transaction>> {
        let pool = self.pool.as_ref()?;
        match read_cache(pool, range).await {
            Ok(transactions) => Some(transactions),
            Err(err) => {
                warn!("d365 cache read failed: {err}");
                notes.push(format!("sql cache unavailable: {err}"));
                None
            }
        }
    }
}

#[async_trait]
impl SalesProvider for D365Provider {
    fn era(&self) -> Era {
        Era::D365
    }

    fn has_employees(&self) -> bool {
        true
    }

    async fn fetch(&self, range: &ReportRange) -> Result<SalesBatch, ReportError> {
        let mut notes = Vec::new();

        let Some(client) = &self.client else {
            notes.push("d365 api not configured".to_string());
            return Ok(match self.from_cache(range, &mut notes).await {
                Some(transactions) => SalesBatch {
                    transactions,
                    source: CACHE_SOURCE.to_string(),
                    notes,
                },
                None => {
                    notes.push("no d365 data source available".to_string());
                    SalesBatch {
                        transactions: Vec::new(),
                        source: API_SOURCE.to_string(),
                        notes,
                    }
                }
            });
        };

        let feed = client.fetch_range(range).await;
        info!(
            pages = feed.pages,
            count = feed.transactions.len(),
            skipped = feed.skipped,
            "d365 feed fetched"
        );
        if feed.skipped > 0 {
            notes.push(format!(
                "{} d365 records skipped (missing id, store, date or amount)",
                feed.skipped
            ));
        }

        if let Some(err) = &feed.error {
            notes.push(format!("d365 api failed after {} page(s): {err}", feed.pages));
            if let Some(cached) = self.from_cache(range, &mut notes).await {
                if cached.len() >= feed.transactions.len() {
                    notes.push("served from sql cache".to_string());
                    return Ok(SalesBatch {
                        transactions: cached,
                        source: CACHE_SOURCE.to_string(),
                        notes,
                    });
                }
            }
            notes.push("partial data from d365 api".to_string());
            return Ok(SalesBatch {
                transactions: feed.transactions,
                source: API_SOURCE.to_string(),
                notes,
            });
        }

        if let Some(pool) = &self.pool {
            match write_cache(pool, &feed.transactions).await {
                Ok(written) => debug!(written, "d365 cache updated"),
                Err(err) => {
                    warn!("d365 cache write failed: {err}");
                    notes.push(format!("sql cache not updated: {err}"));
                }
            }
        }

        Ok(SalesBatch {
            transactions: feed.transactions,
            source: API_SOURCE.to_string(),
            notes,
        })
    }

    async fn store_directory(&self) -> (StoreDirectory, Vec<String>) {
        let mut notes = Vec::new();
        if self.pool.is_some() {
            let (directory, note) = stores::load_or_empty(
                DirectorySource::Database,
                &self.management_path,
                &self.management_path,
                self.pool.as_ref(),
            )
            .await;
            notes.extend(note);
            if !directory.is_empty() {
                return (directory, notes);
            }
        }

        let (directory, note) = stores::load_or_empty(
            DirectorySource::Management,
            &self.management_path,
            &self.management_path,
            None,
        )
        .await;
        notes.extend(note);
        (directory, notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_maps_employee_identity() {
        let record: RetailTransactionRecord = serde_json::from_value(serde_json::json!({
            "TransactionId": "T-1",
            "Store": " 1001 ",
            "TransactionDate": "2026-01-03T10:00:00Z",
            "GrossAmount": 250.0,
            "Employee": "4661-Fatima Albeshi"
        }))
        .unwrap();
        let tx = record.into_transaction().unwrap();
        assert_eq!(tx.store_id, "1001");
        assert_eq!(tx.employee_id.as_deref(), Some("4661"));
        assert_eq!(tx.employee_name.as_deref(), Some("Fatima Albeshi"));
        assert_eq!(tx.transaction_id.as_deref(), Some("T-1"));
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let page: ODataPage = serde_json::from_value(serde_json::json!({
            "value": [
                {"TransactionId": "T-1", "Store": "1001",
                 "TransactionDate": "2026-01-03T10:00:00Z", "GrossAmount": 80.0},
                {"Store": "1001", "TransactionDate": "2026-01-03T11:00:00Z", "GrossAmount": 5.0},
                {"TransactionId": "T-3", "Store": "1002",
                 "TransactionDate": "2026-01-04T09:00:00Z", "GrossAmount": "12.50"},
                {"TransactionId": "T-4", "Store": "1002",
                 "TransactionDate": "not a date", "GrossAmount": 3.0},
                {"TransactionId": "T-5", "Store": "1002",
                 "TransactionDate": "2026-01-05T09:00:00Z", "GrossAmount": 40.0}
            ]
        }))
        .unwrap();
        let (transactions, skipped) = page_transactions(page.value);
        assert_eq!(skipped, 3);
        let ids: Vec<_> = transactions
            .iter()
            .filter_map(|tx| tx.transaction_id.as_deref())
            .collect();
        assert_eq!(ids, ["T-1", "T-5"]);
    }

    #[test]
    fn page_reads_next_link() {
        let page: ODataPage = serde_json::from_value(serde_json::json!({
            "value": [],
            "@odata.nextLink": "https://d365/next?page=2"
        }))
        .unwrap();
        assert_eq!(page.next_link.as_deref(), Some("https://d365/next?page=2"));
    }

    #[test]
    fn range_filter_covers_whole_days() {
        let range = ReportRange::month(2026, 0).unwrap();
        assert_eq!(
            D365Client::range_filter(&range),
            "TransactionDate ge 2026-01-01T00:00:00Z and TransactionDate le 2026-01-31T23:59:59Z"
        );
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_empty_batch() {
        let provider = D365Provider::new(None, None, PathBuf::from("/nonexistent/stores.json"));
        let batch = provider.fetch(&ReportRange::year(2026).unwrap()).await.unwrap();
        assert!(batch.transactions.is_empty());
        assert!(batch.notes.iter().any(|note| note.contains("not configured")));
        assert!(provider.has_employees());
    }
}
