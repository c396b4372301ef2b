use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::double_option;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self { TransactionKind::Expense => "expense", TransactionKind::Income => "income" })
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(TransactionKind::Expense),
            "income" => Ok(TransactionKind::Income),
            _ => Err(anyhow::anyhow!("Unknown transaction type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Investment,
    Retirement,
    Savings,
    Property,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssetKind::Investment => "investment",
            AssetKind::Retirement => "retirement",
            AssetKind::Savings => "savings",
            AssetKind::Property => "property",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AssetKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "investment" => Ok(AssetKind::Investment),
            "retirement" => Ok(AssetKind::Retirement),
            "savings" => Ok(AssetKind::Savings),
            "property" => Ok(AssetKind::Property),
            _ => Err(anyhow::anyhow!("Unknown asset type: {s}")),
        }
    }
}

/// DB row; `kind` is stored as TEXT and exposed as `type` in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    pub merchant: String,
    pub payment_method: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn apply(&mut self, req: &UpdateTransactionRequest) {
        if let Some(v) = req.amount {
            self.amount = v;
        }
        if let Some(v) = req.date {
            self.date = v;
        }
        if let Some(v) = &req.description {
            self.description = v.clone();
        }
        if let Some(v) = &req.merchant {
            self.merchant = v.trim().to_string();
        }
        if let Some(v) = &req.payment_method {
            self.payment_method = v.trim().to_string();
        }
        if let Some(v) = &req.category {
            self.category = v.trim().to_string();
        }
        if let Some(v) = &req.subcategory {
            self.subcategory = v.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount)?;
        if self.category.trim().is_empty() {
            return Err(AppError::validation("Category is required"));
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<(), AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::validation("Amount must be a positive number"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub payment_method: String,
}

impl CreateTransactionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount)?;
        if self.category.trim().is_empty() {
            return Err(AppError::validation("Category is required"));
        }
        Ok(())
    }
}

/// Type and provenance are fixed at creation.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub merchant: Option<String>,
    pub payment_method: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub subcategory: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    /// Inclusive lower bound "YYYY-MM-DD".
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound "YYYY-MM-DD".
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub balance: f64,
    pub institution: Option<String>,
    pub account_number: Option<String>,
    pub notes: Option<String>,
    pub as_of_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub name: String,
    pub balance: f64,
    pub institution: Option<String>,
    pub account_number: Option<String>,
    pub notes: Option<String>,
    pub as_of_date: NaiveDate,
}

impl CreateAssetRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_asset(&self.name, self.balance)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAssetRequest {
    #[serde(rename = "type")]
    pub kind: Option<AssetKind>,
    pub name: Option<String>,
    pub balance: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub institution: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub account_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub as_of_date: Option<NaiveDate>,
}

impl Asset {
    pub fn apply(&mut self, req: &UpdateAssetRequest) {
        if let Some(v) = req.kind {
            self.kind = v.to_string();
        }
        if let Some(v) = &req.name {
            self.name = v.trim().to_string();
        }
        if let Some(v) = req.balance {
            self.balance = v;
        }
        if let Some(v) = &req.institution {
            self.institution = v.clone();
        }
        if let Some(v) = &req.account_number {
            self.account_number = v.clone();
        }
        if let Some(v) = &req.notes {
            self.notes = v.clone();
        }
        if let Some(v) = req.as_of_date {
            self.as_of_date = v;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_asset(&self.name, self.balance)
    }
}

fn validate_asset(name: &str, balance: f64) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Asset name is required"));
    }
    if !balance.is_finite() {
        return Err(AppError::validation("Balance must be a number"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_transaction_rejects_non_positive_amount() {
        let body = r#"{ "type": "expense", "amount": 0, "category": "Food", "date": "2024-03-01" }"#;
        let req: CreateTransactionRequest = serde_json::from_str(body).unwrap();
        assert!(req.validate().is_err());

        let body = r#"{ "type": "income", "amount": 12.5, "category": "Salary", "date": "2024-03-01" }"#;
        let req: CreateTransactionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.kind, TransactionKind::Income);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let body = r#"{ "type": "refund", "amount": 1, "category": "x", "date": "2024-03-01" }"#;
        assert!(serde_json::from_str::<CreateTransactionRequest>(body).is_err());
        assert!("gold".parse::<AssetKind>().is_err());
        assert_eq!("savings".parse::<AssetKind>().unwrap(), AssetKind::Savings);
    }
}
