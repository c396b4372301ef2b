use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    ledger::{self, FinanceReport, NetWorth},
    models::finance::{
        Asset, CreateAssetRequest, CreateTransactionRequest, ReportQuery, Transaction,
        TransactionQuery, UpdateAssetRequest, UpdateTransactionRequest,
    },
    models::non_blank,
};

const TX_COLS: &str = "id, kind, amount, category, subcategory, description, date, merchant,
     payment_method, created_by, created_at";

const ASSET_COLS: &str = "id, kind, name, balance, institution, account_number, notes, as_of_date,
     created_at, updated_at";

pub struct FinanceService;

impl FinanceService {
    /// Newest first. Every filter is optional; date bounds are inclusive.
    pub async fn list_transactions(pool: &PgPool, q: &TransactionQuery) -> anyhow::Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLS} FROM transactions
             WHERE ($1::TEXT IS NULL OR kind = $1)
               AND ($2::TEXT IS NULL OR category = $2)
               AND ($3::DATE IS NULL OR date >= $3)
               AND ($4::DATE IS NULL OR date <= $4)
             ORDER BY date DESC, created_at DESC"
        ))
        .bind(q.kind.map(|k| k.to_string()))
        .bind(q.category.as_deref().map(str::trim).filter(|c| !c.is_empty()))
        .bind(q.from)
        .bind(q.to)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_transaction(
        pool: &PgPool,
        created_by: &str,
        req: &CreateTransactionRequest,
    ) -> anyhow::Result<Transaction> {
        req.validate()?;
        let tx = sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions
                (kind, amount, category, subcategory, description, date, merchant, payment_method, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {TX_COLS}"
        ))
        .bind(req.kind.to_string())
        .bind(req.amount)
        .bind(req.category.trim())
        .bind(non_blank(req.subcategory.clone()))
        .bind(req.description.trim())
        .bind(req.date)
        .bind(req.merchant.trim())
        .bind(req.payment_method.trim())
        .bind(created_by)
        .fetch_one(pool)
        .await?;
        tracing::info!("{} transaction {} recorded by {}", tx.kind, tx.id, created_by);
        Ok(tx)
    }

    pub async fn update_transaction(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateTransactionRequest,
    ) -> anyhow::Result<Option<Transaction>> {
        let Some(mut tx) = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };
        tx.apply(req);
        tx.validate()?;

        let updated = sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions SET
                amount = $1, category = $2, subcategory = $3, description = $4, date = $5,
                merchant = $6, payment_method = $7
             WHERE id = $8
             RETURNING {TX_COLS}"
        ))
        .bind(tx.amount)
        .bind(&tx.category)
        .bind(&tx.subcategory)
        .bind(&tx.description)
        .bind(tx.date)
        .bind(&tx.merchant)
        .bind(&tx.payment_method)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(updated)
    }

    pub async fn delete_transaction(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ordered by type, then name.
    pub async fn list_assets(pool: &PgPool) -> anyhow::Result<Vec<Asset>> {
        let rows = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLS} FROM assets ORDER BY kind, name"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_asset(pool: &PgPool, req: &CreateAssetRequest) -> anyhow::Result<Asset> {
        req.validate()?;
        let asset = sqlx::query_as::<_, Asset>(&format!(
            "INSERT INTO assets (kind, name, balance, institution, account_number, notes, as_of_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {ASSET_COLS}"
        ))
        .bind(req.kind.to_string())
        .bind(req.name.trim())
        .bind(req.balance)
        .bind(non_blank(req.institution.clone()))
        .bind(non_blank(req.account_number.clone()))
        .bind(non_blank(req.notes.clone()))
        .bind(req.as_of_date)
        .fetch_one(pool)
        .await?;
        Ok(asset)
    }

    pub async fn update_asset(pool: &PgPool, id: Uuid, req: &UpdateAssetRequest) -> anyhow::Result<Option<Asset>> {
        let Some(mut asset) = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLS} FROM assets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };
        asset.apply(req);
        asset.validate()?;

        let updated = sqlx::query_as::<_, Asset>(&format!(
            "UPDATE assets SET
                kind = $1, name = $2, balance = $3, institution = $4, account_number = $5,
                notes = $6, as_of_date = $7, updated_at = NOW()
             WHERE id = $8
             RETURNING {ASSET_COLS}"
        ))
        .bind(&asset.kind)
        .bind(&asset.name)
        .bind(asset.balance)
        .bind(&asset.institution)
        .bind(&asset.account_number)
        .bind(&asset.notes)
        .bind(asset.as_of_date)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(updated)
    }

    pub async fn delete_asset(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn report(pool: &PgPool, q: &ReportQuery) -> anyhow::Result<FinanceReport> {
        if let (Some(from), Some(to)) = (q.from, q.to) {
            if to < from {
                return Err(AppError::validation("Report range ends before it starts").into());
            }
        }
        let filter = TransactionQuery {
            from: q.from,
            to: q.to,
            ..Default::default()
        };
        let transactions = Self::list_transactions(pool, &filter).await?;
        Ok(ledger::summarize(&transactions))
    }

    pub async fn net_worth(pool: &PgPool) -> anyhow::Result<NetWorth> {
        let assets = Self::list_assets(pool).await?;
        Ok(ledger::net_worth(&assets))
    }
}
