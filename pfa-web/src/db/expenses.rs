//! Expense database operations

use chrono::{NaiveDate, Utc};
use pfa_common::categories::categorize;
use pfa_common::db::Expense;
use pfa_common::{ExpenseCategory, Result};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::services::ReceiptData;
use crate::validation::{finite_amount, optional_text, required_date, required_text};

const DEFAULT_CURRENCY: &str = "GBP";

/// A validated expense ready to insert
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub vendor: String,
    pub expense_date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub stored_path: Option<String>,
}

impl NewExpense {
    /// From AI-extracted receipt fields; category is inferred from the text
    pub fn from_receipt(data: ReceiptData, file_name: &str, stored_path: Option<String>) -> Result<Self> {
        let vendor = required_text("vendor", &data.vendor)?;
        let description = optional_text(data.description.as_deref());
        let category = categorize(&vendor, description.as_deref());

        Ok(Self {
            vendor,
            expense_date: data.date,
            amount: finite_amount("amount", data.amount)?,
            currency: normalize_currency(Some(&data.currency)),
            category,
            description,
            file_name: Some(file_name.to_string()),
            stored_path,
        })
    }
}

/// Create/update payload
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub vendor: String,
    pub expense_date: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    /// Inferred from vendor and description when omitted
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExpenseInput {
    pub fn validate(&self) -> Result<NewExpense> {
        let vendor = required_text("vendor", &self.vendor)?;
        let description = optional_text(self.description.as_deref());
        let category = match optional_text(self.category.as_deref()) {
            Some(raw) => raw.parse::<ExpenseCategory>()?,
            None => categorize(&vendor, description.as_deref()),
        };

        Ok(NewExpense {
            vendor,
            expense_date: required_date("expense_date", &self.expense_date)?,
            amount: finite_amount("amount", self.amount)?,
            currency: normalize_currency(self.currency.as_deref()),
            category,
            description,
            file_name: None,
            stored_path: None,
        })
    }
}

fn normalize_currency(raw: Option<&str>) -> String {
    optional_text(raw)
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// Listing filters
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
    /// Only expenses that belong to no report
    pub unreported: bool,
}

pub async fn list_expenses(pool: &SqlitePool, filter: ExpenseFilter) -> Result<Vec<Expense>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM expenses WHERE 1 = 1");

    if let Some(category) = filter.category {
        query.push(" AND category = ").push_bind(category.as_str());
    }
    if filter.unreported {
        query.push(" AND id NOT IN (SELECT expense_id FROM expense_report_items)");
    }
    query.push(" ORDER BY expense_date DESC, id DESC");

    let rows = query.build_query_as::<Expense>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn get_expense(pool: &SqlitePool, id: i64) -> Result<Option<Expense>> {
    let row = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert on an open connection, so uploads can share a report transaction
pub async fn insert_expense(conn: &mut SqliteConnection, new: &NewExpense) -> Result<Expense> {
    let row = sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses
            (vendor, expense_date, amount, currency, category, description, file_name, stored_path, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&new.vendor)
    .bind(new.expense_date)
    .bind(new.amount)
    .bind(&new.currency)
    .bind(new.category.as_str())
    .bind(&new.description)
    .bind(&new.file_name)
    .bind(&new.stored_path)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn create_expense(pool: &SqlitePool, new: &NewExpense) -> Result<Expense> {
    let mut conn = pool.acquire().await?;
    insert_expense(&mut conn, new).await
}

/// Update the editable fields; the receipt file is kept
pub async fn update_expense(pool: &SqlitePool, id: i64, new: &NewExpense) -> Result<Option<Expense>> {
    let row = sqlx::query_as::<_, Expense>(
        r#"
        UPDATE expenses
        SET vendor = ?, expense_date = ?, amount = ?, currency = ?, category = ?, description = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&new.vendor)
    .bind(new.expense_date)
    .bind(new.amount)
    .bind(&new.currency)
    .bind(new.category.as_str())
    .bind(&new.description)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Delete an expense, returning the removed row (report links cascade)
pub async fn delete_expense(pool: &SqlitePool, id: i64) -> Result<Option<Expense>> {
    let row = sqlx::query_as::<_, Expense>("DELETE FROM expenses WHERE id = ? RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
