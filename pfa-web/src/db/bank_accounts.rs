//! Bank account database operations

use chrono::Utc;
use pfa_common::db::BankAccount;
use pfa_common::Result;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::validation::{finite_amount, optional_amount, optional_text, required_text};

/// Create/update payload
#[derive(Debug, Clone, Deserialize)]
pub struct BankAccountInput {
    pub name: String,
    pub bank: String,
    pub amount: f64,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct BankAccountFields {
    name: String,
    bank: String,
    amount: f64,
    interest_rate: Option<f64>,
    notes: Option<String>,
}

impl BankAccountInput {
    fn validate(&self) -> Result<BankAccountFields> {
        Ok(BankAccountFields {
            name: required_text("name", &self.name)?,
            bank: required_text("bank", &self.bank)?,
            amount: finite_amount("amount", self.amount)?,
            interest_rate: optional_amount("interest_rate", self.interest_rate)?,
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

pub async fn list_bank_accounts(pool: &SqlitePool) -> Result<Vec<BankAccount>> {
    let rows = sqlx::query_as::<_, BankAccount>(
        "SELECT * FROM bank_accounts ORDER BY bank COLLATE NOCASE, name COLLATE NOCASE, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_bank_account(pool: &SqlitePool, id: i64) -> Result<Option<BankAccount>> {
    let row = sqlx::query_as::<_, BankAccount>("SELECT * FROM bank_accounts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_bank_account(pool: &SqlitePool, input: &BankAccountInput) -> Result<BankAccount> {
    let fields = input.validate()?;
    let now = Utc::now();

    let row = sqlx::query_as::<_, BankAccount>(
        r#"
        INSERT INTO bank_accounts (name, bank, amount, interest_rate, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.bank)
    .bind(fields.amount)
    .bind(fields.interest_rate)
    .bind(&fields.notes)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn update_bank_account(
    pool: &SqlitePool,
    id: i64,
    input: &BankAccountInput,
) -> Result<Option<BankAccount>> {
    let fields = input.validate()?;

    let row = sqlx::query_as::<_, BankAccount>(
        r#"
        UPDATE bank_accounts
        SET name = ?, bank = ?, amount = ?, interest_rate = ?, notes = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.bank)
    .bind(fields.amount)
    .bind(fields.interest_rate)
    .bind(&fields.notes)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_bank_account(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bank_accounts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfa_common::db::init_memory_database;

    fn input(name: &str, bank: &str, amount: f64) -> BankAccountInput {
        BankAccountInput {
            name: name.to_string(),
            bank: bank.to_string(),
            amount,
            interest_rate: Some(4.1),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let pool = init_memory_database().await.unwrap();

        let created = create_bank_account(&pool, &input("Easy Saver", "Nationwide", 5000.0))
            .await
            .unwrap();
        let fetched = get_bank_account(&pool, created.id).await.unwrap().unwrap();

        assert_eq!(fetched.bank, "Nationwide");
        assert_eq!(fetched.interest_rate, Some(4.1));
    }

    #[tokio::test]
    async fn test_bank_required() {
        let pool = init_memory_database().await.unwrap();
        assert!(create_bank_account(&pool, &input("Current", " ", 1.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_list_ordered_by_bank() {
        let pool = init_memory_database().await.unwrap();
        create_bank_account(&pool, &input("ISA", "Nationwide", 1.0)).await.unwrap();
        create_bank_account(&pool, &input("Current", "barclays", 1.0)).await.unwrap();

        let banks: Vec<String> = list_bank_accounts(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.bank)
            .collect();
        assert_eq!(banks, vec!["barclays", "Nationwide"]);
    }
}
