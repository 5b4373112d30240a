//! Expense report database operations
//!
//! Reports reference expenses through `expense_report_items`. An expense may
//! sit in several reports; deleting a report deletes only the expenses no
//! other report still references.

use chrono::Utc;
use pfa_common::db::{Expense, ExpenseReport, ExpenseReportSummary};
use pfa_common::{Error, Result};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::validation::{optional_text, required_text};

/// Create payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReportInput {
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expense_ids: Vec<i64>,
}

pub async fn list_reports(pool: &SqlitePool) -> Result<Vec<ExpenseReportSummary>> {
    let rows = sqlx::query_as::<_, ExpenseReportSummary>(
        r#"
        SELECT r.id, r.name, r.notes, r.created_at,
               COUNT(e.id) AS expense_count,
               TOTAL(e.amount) AS total_amount
        FROM expense_reports r
        LEFT JOIN expense_report_items i ON i.report_id = r.id
        LEFT JOIN expenses e ON e.id = i.expense_id
        GROUP BY r.id
        ORDER BY r.created_at DESC, r.id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_report(pool: &SqlitePool, id: i64) -> Result<Option<ExpenseReport>> {
    let row = sqlx::query_as::<_, ExpenseReport>("SELECT * FROM expense_reports WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Expenses in a report, oldest first
pub async fn report_expenses(pool: &SqlitePool, report_id: i64) -> Result<Vec<Expense>> {
    let rows = sqlx::query_as::<_, Expense>(
        r#"
        SELECT e.* FROM expenses e
        JOIN expense_report_items i ON i.expense_id = e.id
        WHERE i.report_id = ?
        ORDER BY e.expense_date ASC, e.id ASC
        "#,
    )
    .bind(report_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert a report and link `expense_ids` on an open connection
pub async fn insert_report(
    conn: &mut SqliteConnection,
    name: &str,
    notes: Option<&str>,
    expense_ids: &[i64],
) -> Result<ExpenseReport> {
    let name = required_text("name", name)?;

    let report = sqlx::query_as::<_, ExpenseReport>(
        "INSERT INTO expense_reports (name, notes, created_at) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(&name)
    .bind(optional_text(notes))
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    link_expenses(conn, report.id, expense_ids).await?;
    Ok(report)
}

/// Link expenses to a report; ids already linked are ignored
///
/// Fails with [`Error::NotFound`] on the first id that is not an expense.
async fn link_expenses(conn: &mut SqliteConnection, report_id: i64, expense_ids: &[i64]) -> Result<usize> {
    let mut linked = 0;

    for &expense_id in expense_ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM expenses WHERE id = ?)")
            .bind(expense_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Err(Error::NotFound(format!("expense {expense_id}")));
        }

        let result =
            sqlx::query("INSERT OR IGNORE INTO expense_report_items (report_id, expense_id) VALUES (?, ?)")
                .bind(report_id)
                .bind(expense_id)
                .execute(&mut *conn)
                .await?;
        linked += result.rows_affected() as usize;
    }

    Ok(linked)
}

pub async fn create_report(pool: &SqlitePool, input: &ReportInput) -> Result<ExpenseReport> {
    let mut tx = pool.begin().await?;
    let report = insert_report(&mut tx, &input.name, input.notes.as_deref(), &input.expense_ids).await?;
    tx.commit().await?;

    info!(id = report.id, name = %report.name, expenses = input.expense_ids.len(), "Expense report created");
    Ok(report)
}

/// Attach expenses to an existing report, returning how many were newly linked
pub async fn attach_expenses(pool: &SqlitePool, report_id: i64, expense_ids: &[i64]) -> Result<usize> {
    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM expense_reports WHERE id = ?)")
        .bind(report_id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Err(Error::NotFound(format!("expense report {report_id}")));
    }

    let linked = link_expenses(&mut tx, report_id, expense_ids).await?;
    tx.commit().await?;
    Ok(linked)
}

/// Remove one expense from a report; the expense itself is kept
pub async fn detach_expense(pool: &SqlitePool, report_id: i64, expense_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM expense_report_items WHERE report_id = ? AND expense_id = ?")
        .bind(report_id)
        .bind(expense_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a report together with the expenses only it referenced
///
/// Returns the deleted expenses so their receipt files can be removed, or
/// `None` when the report does not exist.
pub async fn delete_report(pool: &SqlitePool, id: i64) -> Result<Option<Vec<Expense>>> {
    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM expense_reports WHERE id = ?)")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Ok(None);
    }

    let orphaned = sqlx::query_as::<_, Expense>(
        r#"
        SELECT e.* FROM expenses e
        JOIN expense_report_items i ON i.expense_id = e.id
        WHERE i.report_id = ?
          AND NOT EXISTS (
              SELECT 1 FROM expense_report_items other
              WHERE other.expense_id = e.id AND other.report_id <> ?
          )
        "#,
    )
    .bind(id)
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM expense_reports WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    for expense in &orphaned {
        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(expense.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(id, deleted_expenses = orphaned.len(), "Expense report deleted");
    Ok(Some(orphaned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::expenses::{create_expense, get_expense, ExpenseInput};
    use pfa_common::db::init_memory_database;

    async fn expense(pool: &SqlitePool, vendor: &str, amount: f64) -> i64 {
        let input = ExpenseInput {
            vendor: vendor.to_string(),
            expense_date: "2024-05-01".to_string(),
            amount,
            currency: None,
            category: None,
            description: None,
        };
        create_expense(pool, &input.validate().unwrap()).await.unwrap().id
    }

    fn report(name: &str, ids: Vec<i64>) -> ReportInput {
        ReportInput {
            name: name.to_string(),
            notes: None,
            expense_ids: ids,
        }
    }

    #[tokio::test]
    async fn test_summary_counts_and_totals() {
        let pool = init_memory_database().await.unwrap();
        let a = expense(&pool, "Pret", 5.5).await;
        let b = expense(&pool, "Uber", 14.0).await;

        create_report(&pool, &report("May", vec![a, b])).await.unwrap();
        create_report(&pool, &report("Empty", vec![])).await.unwrap();

        let summaries = list_reports(&pool).await.unwrap();
        let may = summaries.iter().find(|r| r.name == "May").unwrap();
        assert_eq!(may.expense_count, 2);
        assert_eq!(may.total_amount, 19.5);

        let empty = summaries.iter().find(|r| r.name == "Empty").unwrap();
        assert_eq!(empty.expense_count, 0);
        assert_eq!(empty.total_amount, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_expense_rolls_back() {
        let pool = init_memory_database().await.unwrap();
        let a = expense(&pool, "Pret", 5.5).await;

        let err = create_report(&pool, &report("Bad", vec![a, 999])).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(list_reports(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attach_and_detach() {
        let pool = init_memory_database().await.unwrap();
        let a = expense(&pool, "Pret", 5.5).await;
        let r = create_report(&pool, &report("R", vec![])).await.unwrap();

        assert_eq!(attach_expenses(&pool, r.id, &[a, a]).await.unwrap(), 1);
        assert_eq!(report_expenses(&pool, r.id).await.unwrap().len(), 1);

        assert!(detach_expense(&pool, r.id, a).await.unwrap());
        assert!(!detach_expense(&pool, r.id, a).await.unwrap());
        assert!(get_expense(&pool, a).await.unwrap().is_some());

        assert!(matches!(
            attach_expenses(&pool, 404, &[a]).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_keeps_shared_expenses() {
        let pool = init_memory_database().await.unwrap();
        let only_first = expense(&pool, "Pret", 5.5).await;
        let shared = expense(&pool, "Uber", 14.0).await;

        let first = create_report(&pool, &report("First", vec![only_first, shared])).await.unwrap();
        let second = create_report(&pool, &report("Second", vec![shared])).await.unwrap();

        let deleted = delete_report(&pool, first.id).await.unwrap().unwrap();
        let deleted_ids: Vec<i64> = deleted.iter().map(|e| e.id).collect();
        assert_eq!(deleted_ids, vec![only_first]);

        assert!(get_expense(&pool, only_first).await.unwrap().is_none());
        assert!(get_expense(&pool, shared).await.unwrap().is_some());
        assert_eq!(report_expenses(&pool, second.id).await.unwrap().len(), 1);

        assert!(delete_report(&pool, first.id).await.unwrap().is_none());
    }
}
