use crate::models::{EmployeeRecord, Transaction};
use crate::stores::StoreDirectory;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeIdentity {
    pub id: String,
    pub name: String,
}

/// Splits `"4661-Fatima Albeshi"` / `"4661_Fatima"` into id and name.
pub fn parse_employee(raw: &str) -> EmployeeIdentity {
    let text = raw.trim();
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();

    if digits > 0 {
        let rest = &text[digits..];
        if let Some(name) = rest.strip_prefix('-').or_else(|| rest.strip_prefix('_')) {
            let name = name.trim();
            let id = text[..digits].to_string();
            return EmployeeIdentity {
                name: if name.is_empty() { id.clone() } else { name.to_string() },
                id,
            };
        }
    }

    EmployeeIdentity {
        id: text.to_string(),
        name: text.to_string(),
    }
}

/// One entry per employee id; the last transaction seen decides the current store.
pub fn build_roster(transactions: &[Transaction], stores: &StoreDirectory) -> Vec<EmployeeRecord> {
    let mut roster: BTreeMap<String, EmployeeRecord> = BTreeMap::new();

    for tx in transactions {
        let Some(employee_id) = tx.employee_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        let employee_name = tx
            .employee_name
            .clone()
            .unwrap_or_else(|| employee_id.to_string());

        roster.insert(
            employee_id.to_string(),
            EmployeeRecord {
                employee_id: employee_id.to_string(),
                employee_name,
                store_id: tx.store_id.clone(),
                store_name: stores.resolve(&tx.store_id),
            },
        );
    }

    roster.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn splits_dash_and_underscore_forms() {
        assert_eq!(
            parse_employee("4661-Fatima Albeshi"),
            EmployeeIdentity {
                id: "4661".into(),
                name: "Fatima Albeshi".into()
            }
        );
        assert_eq!(
            parse_employee(" 12_Omar "),
            EmployeeIdentity {
                id: "12".into(),
                name: "Omar".into()
            }
        );
    }

    #[test]
    fn falls_back_to_full_text() {
        let identity = parse_employee("NoDigitsHere");
        assert_eq!(identity.id, "NoDigitsHere");
        assert_eq!(identity.name, "NoDigitsHere");

        let identity = parse_employee("123 Main");
        assert_eq!(identity.id, "123 Main");
    }

    #[test]
    fn roster_keeps_last_seen_store() {
        let stamp = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let tx = |store: &str| Transaction {
            transaction_id: None,
            store_id: store.to_string(),
            amount: 10.0,
            timestamp: stamp,
            employee_id: Some("4661".into()),
            employee_name: Some("Fatima Albeshi".into()),
        };
        let roster = build_roster(&[tx("1001"), tx("1002")], &StoreDirectory::default());
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].store_id, "1002");
        assert_eq!(roster[0].store_name, "1002");
    }
}
