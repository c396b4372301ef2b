//! Report aggregation over a loaded set of transactions and assets.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::finance::{Asset, AssetKind, Transaction, TransactionKind};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthTotal {
    /// "YYYY-MM"
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FinanceReport {
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
    pub by_category: Vec<CategoryTotal>,
    pub by_month: Vec<MonthTotal>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssetTotal {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetWorth {
    pub total: f64,
    pub by_type: Vec<AssetTotal>,
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Totals by category (largest first) and by month (oldest first).
pub fn summarize(transactions: &[Transaction]) -> FinanceReport {
    let mut income = 0.0;
    let mut expense = 0.0;
    let mut categories: BTreeMap<(TransactionKind, String), (f64, usize)> = BTreeMap::new();
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for tx in transactions {
        let Ok(kind) = tx.kind.parse::<TransactionKind>() else {
            tracing::warn!("skipping transaction {} with unknown type {:?}", tx.id, tx.kind);
            continue;
        };

        let entry = categories
            .entry((kind, tx.category.clone()))
            .or_insert((0.0, 0));
        entry.0 += tx.amount;
        entry.1 += 1;

        let month = months.entry(tx.date.format("%Y-%m").to_string()).or_insert((0.0, 0.0));
        match kind {
            TransactionKind::Income => {
                income += tx.amount;
                month.0 += tx.amount;
            }
            TransactionKind::Expense => {
                expense += tx.amount;
                month.1 += tx.amount;
            }
        }
    }

    let mut by_category: Vec<CategoryTotal> = categories
        .into_iter()
        .map(|((kind, category), (total, count))| CategoryTotal {
            kind,
            category,
            total: cents(total),
            count,
        })
        .collect();
    by_category.sort_by(|a, b| b.total.total_cmp(&a.total));

    let by_month = months
        .into_iter()
        .map(|(month, (income, expense))| MonthTotal {
            month,
            income: cents(income),
            expense: cents(expense),
            net: cents(income - expense),
        })
        .collect();

    FinanceReport {
        total_income: cents(income),
        total_expense: cents(expense),
        net: cents(income - expense),
        by_category,
        by_month,
    }
}

pub fn net_worth(assets: &[Asset]) -> NetWorth {
    let mut by_type: BTreeMap<AssetKind, (f64, usize)> = BTreeMap::new();
    for asset in assets {
        let Ok(kind) = asset.kind.parse::<AssetKind>() else {
            tracing::warn!("skipping asset {} with unknown type {:?}", asset.id, asset.kind);
            continue;
        };
        let entry = by_type.entry(kind).or_insert((0.0, 0));
        entry.0 += asset.balance;
        entry.1 += 1;
    }

    let by_type: Vec<AssetTotal> = by_type
        .into_iter()
        .map(|(kind, (total, count))| AssetTotal { kind, total: cents(total), count })
        .collect();
    let total = cents(by_type.iter().map(|t| t.total).sum());

    NetWorth { total, by_type }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    fn tx(kind: &str, amount: f64, category: &str, date: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            amount,
            category: category.to_string(),
            subcategory: None,
            description: String::new(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            merchant: String::new(),
            payment_method: String::new(),
            created_by: "admin@example.com".into(),
            created_at: Utc::now(),
        }
    }

    fn asset(kind: &str, balance: f64) -> Asset {
        let now = Utc::now();
        Asset {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            name: "Account".into(),
            balance,
            institution: None,
            account_number: None,
            notes: None,
            as_of_date: now.date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_summarize_totals_and_groups() {
        let txs = vec![
            tx("income", 3000.0, "Salary", "2024-01-31"),
            tx("expense", 120.10, "Groceries", "2024-01-05"),
            tx("expense", 80.20, "Groceries", "2024-02-03"),
            tx("expense", 900.0, "Rent", "2024-02-01"),
        ];
        let report = summarize(&txs);

        assert_eq!(report.total_income, 3000.0);
        assert_eq!(report.total_expense, 1100.3);
        assert_eq!(report.net, 1899.7);

        assert_eq!(report.by_category[0].category, "Salary");
        assert_eq!(report.by_category[1].category, "Rent");
        let groceries = &report.by_category[2];
        assert_eq!(groceries.total, 200.3);
        assert_eq!(groceries.count, 2);

        let months: Vec<&str> = report.by_month.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(report.by_month[0].net, 2879.9);
        assert_eq!(report.by_month[1].expense, 980.2);
    }

    #[test]
    fn test_same_category_split_by_type() {
        let txs = vec![
            tx("income", 50.0, "Gifts", "2024-03-01"),
            tx("expense", 20.0, "Gifts", "2024-03-02"),
        ];
        let report = summarize(&txs);
        assert_eq!(report.by_category.len(), 2);
    }

    #[test]
    fn test_summarize_skips_unknown_types() {
        let txs = vec![tx("refund", 10.0, "x", "2024-03-01")];
        let report = summarize(&txs);
        assert_eq!(report.net, 0.0);
        assert!(report.by_category.is_empty());
        assert!(report.by_month.is_empty());
    }

    #[test]
    fn test_net_worth_by_type() {
        let assets = vec![
            asset("savings", 1000.5),
            asset("property", 250000.0),
            asset("savings", 499.5),
        ];
        let worth = net_worth(&assets);

        assert_eq!(worth.total, 251500.0);
        assert_eq!(worth.by_type.len(), 2);
        assert_eq!(worth.by_type[0].kind, AssetKind::Savings);
        assert_eq!(worth.by_type[0].total, 1500.0);
        assert_eq!(worth.by_type[0].count, 2);
    }
}
