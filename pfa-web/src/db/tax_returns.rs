//! Tax return database operations

use chrono::{NaiveDate, Utc};
use pfa_common::db::TaxReturn;
use pfa_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::validation::{finite_amount, financial_year_label, optional_date, optional_text};

/// Filing progress of a tax return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxReturnStatus {
    NotStarted,
    InProgress,
    Filed,
    Paid,
}

impl TaxReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxReturnStatus::NotStarted => "not_started",
            TaxReturnStatus::InProgress => "in_progress",
            TaxReturnStatus::Filed => "filed",
            TaxReturnStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_started" => Ok(TaxReturnStatus::NotStarted),
            "in_progress" => Ok(TaxReturnStatus::InProgress),
            "filed" => Ok(TaxReturnStatus::Filed),
            "paid" => Ok(TaxReturnStatus::Paid),
            other => Err(Error::InvalidInput(format!("Unknown tax return status: {other:?}"))),
        }
    }
}

/// Create/update payload
#[derive(Debug, Clone, Deserialize)]
pub struct TaxReturnInput {
    /// `"2024/25"` or `"2024-25"`
    pub financial_year: String,
    pub tax_charge: f64,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct TaxReturnFields {
    financial_year: String,
    tax_charge: f64,
    deadline: Option<NaiveDate>,
    status: TaxReturnStatus,
    notes: Option<String>,
}

impl TaxReturnInput {
    fn validate(&self) -> Result<TaxReturnFields> {
        let status = match optional_text(self.status.as_deref()) {
            Some(raw) => TaxReturnStatus::parse(&raw)?,
            None => TaxReturnStatus::NotStarted,
        };

        Ok(TaxReturnFields {
            financial_year: financial_year_label(&self.financial_year)?,
            tax_charge: finite_amount("tax_charge", self.tax_charge)?,
            deadline: optional_date("deadline", self.deadline.as_deref())?,
            status,
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

fn duplicate_year(err: sqlx::Error, year: &str) -> Error {
    Error::from_unique(err, format!("a tax return for {year} already exists"))
}

pub async fn list_tax_returns(pool: &SqlitePool) -> Result<Vec<TaxReturn>> {
    let rows = sqlx::query_as::<_, TaxReturn>("SELECT * FROM tax_returns ORDER BY financial_year DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_tax_return(pool: &SqlitePool, id: i64) -> Result<Option<TaxReturn>> {
    let row = sqlx::query_as::<_, TaxReturn>("SELECT * FROM tax_returns WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_tax_return(pool: &SqlitePool, input: &TaxReturnInput) -> Result<TaxReturn> {
    let fields = input.validate()?;
    let now = Utc::now();

    let row = sqlx::query_as::<_, TaxReturn>(
        r#"
        INSERT INTO tax_returns (financial_year, tax_charge, deadline, status, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&fields.financial_year)
    .bind(fields.tax_charge)
    .bind(fields.deadline)
    .bind(fields.status.as_str())
    .bind(&fields.notes)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| duplicate_year(e, &fields.financial_year))?;

    Ok(row)
}

pub async fn update_tax_return(pool: &SqlitePool, id: i64, input: &TaxReturnInput) -> Result<Option<TaxReturn>> {
    let fields = input.validate()?;

    let row = sqlx::query_as::<_, TaxReturn>(
        r#"
        UPDATE tax_returns
        SET financial_year = ?, tax_charge = ?, deadline = ?, status = ?, notes = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&fields.financial_year)
    .bind(fields.tax_charge)
    .bind(fields.deadline)
    .bind(fields.status.as_str())
    .bind(&fields.notes)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| duplicate_year(e, &fields.financial_year))?;

    Ok(row)
}

pub async fn delete_tax_return(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tax_returns WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfa_common::db::init_memory_database;

    fn input(year: &str, status: Option<&str>) -> TaxReturnInput {
        TaxReturnInput {
            financial_year: year.to_string(),
            tax_charge: 1234.56,
            deadline: Some("31/01/2026".to_string()),
            status: status.map(str::to_string),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalises_label_and_defaults_status() {
        let pool = init_memory_database().await.unwrap();
        let created = create_tax_return(&pool, &input("2024-25", None)).await.unwrap();

        assert_eq!(created.financial_year, "2024/25");
        assert_eq!(created.status, "not_started");
        assert_eq!(created.deadline, NaiveDate::from_ymd_opt(2026, 1, 31));
    }

    #[tokio::test]
    async fn test_duplicate_year_conflicts() {
        let pool = init_memory_database().await.unwrap();
        create_tax_return(&pool, &input("2024/25", None)).await.unwrap();

        let err = create_tax_return(&pool, &input("2024-25", None)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_into_existing_year_conflicts() {
        let pool = init_memory_database().await.unwrap();
        create_tax_return(&pool, &input("2023/24", None)).await.unwrap();
        let other = create_tax_return(&pool, &input("2024/25", None)).await.unwrap();

        let err = update_tax_return(&pool, other.id, &input("2023/24", Some("filed")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let updated = update_tax_return(&pool, other.id, &input("2024/25", Some("Paid")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "paid");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(input("2024/26", None).validate().is_err());
        assert!(input("2024/25", Some("lost")).validate().is_err());
    }
}
