use crate::aggregate::{self, AggregateBucket, StoreDayKey, StoreEmployeeKey};
use crate::footfall::Footfall;
use crate::models::{
    DaySummary, DebugInfo, EmployeeSummary, SalesReport, StoreSummary, Totals, Transaction,
};
use crate::period::{date_key, ReportRange};
use crate::stores::StoreDirectory;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub struct ReportInput<'a> {
    pub range: &'a ReportRange,
    pub transactions: &'a [Transaction],
    pub stores: &'a StoreDirectory,
    pub footfall: &'a Footfall,
    pub store_filter: Option<&'a str>,
    /// Footfall is per store, so an employee-filtered report carries no
    /// visitors or target in its totals.
    pub employee_filter: Option<&'a str>,
    pub include_employees: bool,
    pub source: String,
    pub notes: Vec<String>,
}

pub fn build_report(input: ReportInput<'_>) -> SalesReport {
    let ReportInput {
        range,
        transactions,
        stores,
        footfall,
        store_filter,
        employee_filter,
        include_employees,
        source,
        mut notes,
    } = input;

    let store_buckets = aggregate::aggregate(transactions, aggregate::by_store);
    let mut by_store: Vec<StoreSummary> = store_buckets
        .iter()
        .map(|(store_id, bucket)| {
            store_summary(
                store_id,
                stores,
                bucket,
                footfall.visitors(store_id),
                footfall.target(store_id),
            )
        })
        .collect();
    by_store.sort_by(by_sales_then_id);

    let by_day = build_days(transactions, stores, footfall);

    let by_employee = if include_employees {
        build_employees(transactions, stores)
    } else {
        Vec::new()
    };

    let sum = aggregate::total(store_buckets.values());
    let store_filter = store_filter.map(str::trim).filter(|id| !id.is_empty());
    let employee_filter = employee_filter.map(str::trim).filter(|id| !id.is_empty());
    let (visitors, target) = match (employee_filter, store_filter) {
        (Some(_), _) => {
            notes.push("visitors and target omitted from totals under employee filter".into());
            (None, None)
        }
        (None, Some(store_id)) => (footfall.visitors(store_id), footfall.target(store_id)),
        (None, None) => (footfall.total_visitors(), footfall.total_target()),
    };

    SalesReport {
        success: true,
        range: range.info(),
        by_store,
        by_day,
        by_employee,
        totals: Totals {
            sales_amount: sum.sales_amount,
            invoices: sum.invoice_count,
            visitors,
            target,
            kpis: sum.kpis(visitors),
        },
        debug: DebugInfo { source, notes },
    }
}

fn store_summary(
    store_id: &str,
    stores: &StoreDirectory,
    bucket: &AggregateBucket,
    visitors: Option<u64>,
    target: Option<f64>,
) -> StoreSummary {
    StoreSummary {
        store_id: store_id.to_string(),
        store_name: stores.resolve(store_id),
        sales_amount: bucket.sales_amount,
        invoices: bucket.invoice_count,
        visitors,
        target,
        kpis: bucket.kpis(visitors),
    }
}

fn by_sales_then_id(a: &StoreSummary, b: &StoreSummary) -> Ordering {
    b.sales_amount
        .partial_cmp(&a.sales_amount)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.store_id.cmp(&b.store_id))
}

fn build_days(
    transactions: &[Transaction],
    stores: &StoreDirectory,
    footfall: &Footfall,
) -> Vec<DaySummary> {
    let buckets: HashMap<StoreDayKey, AggregateBucket> =
        aggregate::aggregate(transactions, aggregate::by_store_day);

    let mut days: BTreeMap<NaiveDate, Vec<StoreSummary>> = BTreeMap::new();
    for (key, bucket) in &buckets {
        let visitors = footfall.visitors_on(&key.store_id, key.date);
        days.entry(key.date)
            .or_default()
            .push(store_summary(&key.store_id, stores, bucket, visitors, None));
    }

    days.into_iter()
        .map(|(date, mut by_store)| {
            by_store.sort_by(by_sales_then_id);
            DaySummary {
                date: date_key(date),
                by_store,
            }
        })
        .collect()
}

fn build_employees(transactions: &[Transaction], stores: &StoreDirectory) -> Vec<EmployeeSummary> {
    let buckets: HashMap<StoreEmployeeKey, AggregateBucket> = aggregate::aggregate(
        transactions.iter().filter(|tx| tx.employee_id.is_some()),
        aggregate::by_store_employee,
    );

    let mut names: HashMap<&str, &str> = HashMap::new();
    for tx in transactions {
        if let (Some(id), Some(name)) = (tx.employee_id.as_deref(), tx.employee_name.as_deref()) {
            names.insert(id, name);
        }
    }

    let mut employees: Vec<EmployeeSummary> = buckets
        .into_iter()
        .map(|(key, bucket)| EmployeeSummary {
            employee_name: names
                .get(key.employee_id.as_str())
                .map(|name| name.to_string())
                .unwrap_or_else(|| key.employee_id.clone()),
            store_name: stores.resolve(&key.store_id),
            sales_amount: bucket.sales_amount,
            invoices: bucket.invoice_count,
            kpis: bucket.kpis(None),
            employee_id: key.employee_id,
            store_id: key.store_id,
        })
        .collect();

    employees.sort_by(|a, b| {
        b.sales_amount
            .partial_cmp(&a.sales_amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
            .then_with(|| a.store_id.cmp(&b.store_id))
    });
    employees
}
