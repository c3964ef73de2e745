use crate::models::{Kpis, Transaction};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateBucket {
    pub sales_amount: f64,
    pub invoice_count: u64,
}

impl AggregateBucket {
    pub fn add(&mut self, amount: f64) {
        self.sales_amount += amount;
        self.invoice_count = self.invoice_count.saturating_add(1);
    }

    pub fn merge(&mut self, other: &AggregateBucket) {
        self.sales_amount += other.sales_amount;
        self.invoice_count = self.invoice_count.saturating_add(other.invoice_count);
    }

    pub fn kpis(&self, visitors: Option<u64>) -> Kpis {
        let visitors = visitors.unwrap_or(0);
        Kpis {
            atv: atv(self.sales_amount, self.invoice_count),
            customer_value: customer_value(self.sales_amount, visitors),
            conversion: conversion(self.invoice_count, visitors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreDayKey {
    pub store_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreEmployeeKey {
    pub store_id: String,
    pub employee_id: String,
}

/// Groups transactions into buckets in a single pass. Zero amounts are skipped.
pub fn aggregate<'a, K, I, F>(transactions: I, mut key_fn: F) -> HashMap<K, AggregateBucket>
where
    K: Eq + Hash,
    I: IntoIterator<Item = &'a Transaction>,
    F: FnMut(&Transaction) -> K,
{
    let mut buckets: HashMap<K, AggregateBucket> = HashMap::new();
    for tx in transactions {
        if tx.amount == 0.0 {
            continue;
        }
        buckets.entry(key_fn(tx)).or_default().add(tx.amount);
    }
    buckets
}

pub fn by_store(tx: &Transaction) -> String {
    tx.store_id.clone()
}

pub fn by_store_day(tx: &Transaction) -> StoreDayKey {
    StoreDayKey {
        store_id: tx.store_id.clone(),
        date: tx.timestamp.date(),
    }
}

pub fn by_store_employee(tx: &Transaction) -> StoreEmployeeKey {
    StoreEmployeeKey {
        store_id: tx.store_id.clone(),
        employee_id: tx.employee_id.clone().unwrap_or_default(),
    }
}

pub fn total<'a>(buckets: impl IntoIterator<Item = &'a AggregateBucket>) -> AggregateBucket {
    let mut sum = AggregateBucket::default();
    for bucket in buckets {
        sum.merge(bucket);
    }
    sum
}

pub fn atv(sales_amount: f64, invoice_count: u64) -> f64 {
    if invoice_count > 0 {
        sales_amount / invoice_count as f64
    } else {
        0.0
    }
}

pub fn conversion(invoice_count: u64, visitors: u64) -> f64 {
    if visitors > 0 {
        (invoice_count as f64 / visitors as f64) * 100.0
    } else {
        0.0
    }
}

pub fn customer_value(sales_amount: f64, visitors: u64) -> f64 {
    if visitors > 0 {
        sales_amount / visitors as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn tx(store: &str, amount: f64, stamp: &str, employee: Option<&str>) -> Transaction {
        Transaction {
            transaction_id: None,
            store_id: store.to_string(),
            amount,
            timestamp: NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M").unwrap(),
            employee_id: employee.map(str::to_string),
            employee_name: None,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("1001", 100.0, "2025-01-01 09:00", Some("7")),
            tx("1001", 0.0, "2025-01-01 10:00", Some("7")),
            tx("1002", 50.0, "2025-01-01 11:00", Some("8")),
            tx("1001", -20.0, "2025-01-02 12:00", Some("9")),
            tx("1002", 12.5, "2025-01-02 13:00", None),
        ]
    }

    #[test]
    fn zero_amounts_contribute_nothing() {
        let transactions = vec![
            tx("1001", 100.0, "2025-01-01 09:00", None),
            tx("1001", 0.0, "2025-01-01 10:00", None),
            tx("1002", 50.0, "2025-01-01 11:00", None),
        ];
        let buckets = aggregate(&transactions, by_store);
        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets["1001"],
            AggregateBucket {
                sales_amount: 100.0,
                invoice_count: 1
            }
        );
        assert_eq!(
            buckets["1002"],
            AggregateBucket {
                sales_amount: 50.0,
                invoice_count: 1
            }
        );
    }

    #[test]
    fn bucket_sums_match_non_zero_transactions() {
        let transactions = sample();
        let expected_sum: f64 = transactions
            .iter()
            .filter(|t| t.amount != 0.0)
            .map(|t| t.amount)
            .sum();
        let expected_count = transactions.iter().filter(|t| t.amount != 0.0).count() as u64;

        let by_day = aggregate(&transactions, by_store_day);
        let sum = total(by_day.values());
        assert!((sum.sales_amount - expected_sum).abs() < 1e-9);
        assert_eq!(sum.invoice_count, expected_count);

        let by_employee = aggregate(&transactions, by_store_employee);
        let key = StoreEmployeeKey {
            store_id: "1001".into(),
            employee_id: "7".into(),
        };
        assert_eq!(by_employee[&key].invoice_count, 1);
        let unassigned = StoreEmployeeKey {
            store_id: "1002".into(),
            employee_id: String::new(),
        };
        assert_eq!(by_employee[&unassigned].sales_amount, 12.5);
    }

    #[test]
    fn kpis_guard_division_by_zero() {
        let empty = AggregateBucket::default();
        assert_eq!(empty.kpis(None), Kpis::default());

        let negative = AggregateBucket {
            sales_amount: -30.0,
            invoice_count: 2,
        };
        let kpis = negative.kpis(Some(0));
        assert_eq!(kpis.atv, -15.0);
        assert_eq!(kpis.conversion, 0.0);
        assert_eq!(kpis.customer_value, 0.0);

        let bucket = AggregateBucket {
            sales_amount: 400.0,
            invoice_count: 4,
        };
        let kpis = bucket.kpis(Some(20));
        assert_eq!(kpis.atv, 100.0);
        assert_eq!(kpis.conversion, 20.0);
        assert_eq!(kpis.customer_value, 20.0);
    }
}
