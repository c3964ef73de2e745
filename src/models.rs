use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: Option<String>,
    pub store_id: String,
    pub amount: f64,
    pub timestamp: NaiveDateTime,
    pub employee_id: Option<String>,
    pub employee_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    pub store_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub store_id: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoresQuery {
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub atv: f64,
    pub customer_value: f64,
    pub conversion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeInfo {
    pub from: String,
    pub to: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub store_id: String,
    pub store_name: String,
    pub sales_amount: f64,
    pub invoices: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    pub kpis: Kpis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: String,
    pub by_store: Vec<StoreSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub employee_id: String,
    pub employee_name: String,
    pub store_id: String,
    pub store_name: String,
    pub sales_amount: f64,
    pub invoices: u64,
    pub kpis: Kpis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub sales_amount: f64,
    pub invoices: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    pub kpis: Kpis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub source: String,
    pub notes: Vec<String>,
}

/// Envelope shared by both data eras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub success: bool,
    pub range: RangeInfo,
    pub by_store: Vec<StoreSummary>,
    pub by_day: Vec<DaySummary>,
    pub by_employee: Vec<EmployeeSummary>,
    pub totals: Totals,
    pub debug: DebugInfo,
}

impl SalesReport {
    /// Empty but well-formed envelope for failed requests.
    pub fn failed(range: RangeInfo, source: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            success: false,
            range,
            by_store: Vec::new(),
            by_day: Vec::new(),
            by_employee: Vec::new(),
            totals: Totals::default(),
            debug: DebugInfo {
                source: source.into(),
                notes: vec![note.into()],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresResponse {
    pub success: bool,
    pub source: String,
    pub stores: Vec<StoreRecord>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub employee_name: String,
    pub store_id: String,
    pub store_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeesResponse {
    pub success: bool,
    pub employees: Vec<EmployeeRecord>,
    pub debug: DebugInfo,
}
