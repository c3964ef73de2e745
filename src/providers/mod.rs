//! Sales data providers, one per data era.
//!
//! `select` is the only place that branches on the era; everything after it
//! works on a `SalesBatch` regardless of where the transactions came from.

pub mod d365;
pub mod legacy;

use crate::era::{resolve_provider, Era};
use crate::errors::ReportError;
use crate::models::Transaction;
use crate::period::ReportRange;
use crate::state::AppState;
use crate::stores::StoreDirectory;
use async_trait::async_trait;

pub use d365::{D365Client, D365Provider};
pub use legacy::LegacyProvider;

/// Transactions for one range plus provenance for the `debug` block.
#[derive(Debug, Clone, Default)]
pub struct SalesBatch {
    pub transactions: Vec<Transaction>,
    pub source: String,
    pub notes: Vec<String>,
}

impl SalesBatch {
    pub fn empty(source: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            transactions: Vec::new(),
            source: source.into(),
            notes: vec![note.into()],
        }
    }
}

#[async_trait]
pub trait SalesProvider: Send + Sync {
    fn era(&self) -> Era;

    /// Whether transactions carry employee attribution.
    fn has_employees(&self) -> bool;

    /// Upstream outages are reported through `SalesBatch::notes`; `Err` is
    /// reserved for failures the caller cannot degrade around.
    async fn fetch(&self, range: &ReportRange) -> Result<SalesBatch, ReportError>;

    /// Store names for this era. Never fails; the note explains a fallback.
    async fn store_directory(&self) -> (StoreDirectory, Vec<String>);
}

pub fn select(year: i32, state: &AppState) -> Box<dyn SalesProvider> {
    match resolve_provider(year) {
        Era::Legacy => Box::new(LegacyProvider::new(
            state.config.legacy_export_path.clone(),
            state.config.store_spreadsheet_path.clone(),
        )),
        Era::D365 => Box::new(D365Provider::new(
            state
                .config
                .d365
                .as_ref()
                .map(|settings| D365Client::new(state.http.clone(), settings)),
            state.pool.clone(),
            state.config.store_management_path.clone(),
        )),
    }
}

/// Applies the optional `storeId` / `employeeId` filters of a request.
pub fn filter_transactions(
    transactions: Vec<Transaction>,
    store_id: Option<&str>,
    employee_id: Option<&str>,
) -> Vec<Transaction> {
    let store_id = store_id.map(str::trim).filter(|id| !id.is_empty());
    let employee_id = employee_id.map(str::trim).filter(|id| !id.is_empty());

    transactions
        .into_iter()
        .filter(|tx| store_id.is_none_or(|id| tx.store_id == id))
        .filter(|tx| employee_id.is_none_or(|id| tx.employee_id.as_deref() == Some(id)))
        .collect()
}
