//! Pension database operations

use chrono::Utc;
use pfa_common::db::Pension;
use pfa_common::Result;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::validation::{finite_amount, optional_text, required_text};

/// Create/update payload
#[derive(Debug, Clone, Deserialize)]
pub struct PensionInput {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated pension fields
struct PensionFields {
    name: String,
    amount: f64,
    url: Option<String>,
    notes: Option<String>,
}

impl PensionInput {
    fn validate(&self) -> Result<PensionFields> {
        Ok(PensionFields {
            name: required_text("name", &self.name)?,
            amount: finite_amount("amount", self.amount)?,
            url: optional_text(self.url.as_deref()),
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

pub async fn list_pensions(pool: &SqlitePool) -> Result<Vec<Pension>> {
    let rows = sqlx::query_as::<_, Pension>("SELECT * FROM pensions ORDER BY name COLLATE NOCASE, id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_pension(pool: &SqlitePool, id: i64) -> Result<Option<Pension>> {
    let row = sqlx::query_as::<_, Pension>("SELECT * FROM pensions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_pension(pool: &SqlitePool, input: &PensionInput) -> Result<Pension> {
    let fields = input.validate()?;
    let now = Utc::now();

    let row = sqlx::query_as::<_, Pension>(
        r#"
        INSERT INTO pensions (name, amount, url, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(fields.amount)
    .bind(&fields.url)
    .bind(&fields.notes)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Update a pension; `None` when the id does not exist
pub async fn update_pension(pool: &SqlitePool, id: i64, input: &PensionInput) -> Result<Option<Pension>> {
    let fields = input.validate()?;

    let row = sqlx::query_as::<_, Pension>(
        r#"
        UPDATE pensions
        SET name = ?, amount = ?, url = ?, notes = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(fields.amount)
    .bind(&fields.url)
    .bind(&fields.notes)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Delete a pension; `false` when the id does not exist
pub async fn delete_pension(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM pensions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfa_common::db::init_memory_database;

    fn input(name: &str, amount: f64) -> PensionInput {
        PensionInput {
            name: name.to_string(),
            amount,
            url: Some("  ".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = init_memory_database().await.unwrap();

        let created = create_pension(&pool, &input(" Workplace ", 15000.0)).await.unwrap();
        assert_eq!(created.name, "Workplace");
        assert_eq!(created.url, None, "blank url should be stored as NULL");

        let fetched = get_pension(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.amount, 15000.0);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let pool = init_memory_database().await.unwrap();
        let result = create_pension(&pool, &input("", 1.0)).await;
        assert!(matches!(result, Err(pfa_common::Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let pool = init_memory_database().await.unwrap();
        let updated = update_pension(&pool, 42, &input("SIPP", 1.0)).await.unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = init_memory_database().await.unwrap();
        let created = create_pension(&pool, &input("SIPP", 100.0)).await.unwrap();

        let updated = update_pension(&pool, created.id, &input("SIPP", 250.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.amount, 250.0);
        assert!(updated.updated_at >= created.updated_at);

        assert!(delete_pension(&pool, created.id).await.unwrap());
        assert!(!delete_pension(&pool, created.id).await.unwrap());
        assert!(list_pensions(&pool).await.unwrap().is_empty());
    }
}
