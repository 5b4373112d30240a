//! Financial-year summary operations
//!
//! A summary row holds the year-to-date figures of the newest payslip (by pay
//! date) recorded for its UK financial year. Writes follow "upsert if newer":
//! an older or same-dated payslip never overwrites the stored figures.

use chrono::{NaiveDate, Utc};
use pfa_common::db::{FinancialYearSummary, Payslip};
use pfa_common::{FinancialYear, Result};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

/// YTD figures carried by one payslip
#[derive(Debug, Clone)]
pub struct YtdSnapshot {
    pub financial_year: String,
    pub pay_date: NaiveDate,
    pub gross_ytd: Option<f64>,
    pub tax_ytd: Option<f64>,
    pub ni_ytd: Option<f64>,
    pub pension_ytd: Option<f64>,
    pub net_ytd: Option<f64>,
    pub source_file_name: Option<String>,
}

impl YtdSnapshot {
    pub fn from_payslip(payslip: &Payslip) -> Self {
        Self {
            financial_year: payslip.financial_year.clone(),
            pay_date: payslip.pay_date,
            gross_ytd: payslip.gross_ytd,
            tax_ytd: payslip.tax_ytd,
            ni_ytd: payslip.ni_ytd,
            pension_ytd: payslip.pension_ytd,
            net_ytd: payslip.net_ytd,
            source_file_name: Some(payslip.file_name.clone()),
        }
    }
}

/// What `upsert_if_newer` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpsertOutcome {
    /// No row existed for the year
    Inserted,
    /// Stored row was older and has been overwritten
    Updated,
    /// Stored row was same date or newer; left untouched
    Skipped,
}

/// Write the snapshot if its pay date is strictly newer than the stored one
pub async fn upsert_if_newer(conn: &mut SqliteConnection, snapshot: &YtdSnapshot) -> Result<UpsertOutcome> {
    let stored: Option<NaiveDate> = sqlx::query_scalar(
        "SELECT last_pay_date FROM financial_year_summaries WHERE financial_year = ?",
    )
    .bind(&snapshot.financial_year)
    .fetch_optional(&mut *conn)
    .await?;

    let outcome = match stored {
        None => {
            sqlx::query(
                r#"
                INSERT INTO financial_year_summaries
                    (financial_year, last_pay_date, gross_ytd, tax_ytd, ni_ytd, pension_ytd, net_ytd,
                     source_file_name, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&snapshot.financial_year)
            .bind(snapshot.pay_date)
            .bind(snapshot.gross_ytd)
            .bind(snapshot.tax_ytd)
            .bind(snapshot.ni_ytd)
            .bind(snapshot.pension_ytd)
            .bind(snapshot.net_ytd)
            .bind(&snapshot.source_file_name)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
            UpsertOutcome::Inserted
        }
        Some(last_pay_date) if snapshot.pay_date > last_pay_date => {
            sqlx::query(
                r#"
                UPDATE financial_year_summaries
                SET last_pay_date = ?, gross_ytd = ?, tax_ytd = ?, ni_ytd = ?, pension_ytd = ?,
                    net_ytd = ?, source_file_name = ?, updated_at = ?
                WHERE financial_year = ?
                "#,
            )
            .bind(snapshot.pay_date)
            .bind(snapshot.gross_ytd)
            .bind(snapshot.tax_ytd)
            .bind(snapshot.ni_ytd)
            .bind(snapshot.pension_ytd)
            .bind(snapshot.net_ytd)
            .bind(&snapshot.source_file_name)
            .bind(Utc::now())
            .bind(&snapshot.financial_year)
            .execute(&mut *conn)
            .await?;
            UpsertOutcome::Updated
        }
        Some(_) => UpsertOutcome::Skipped,
    };

    debug!(
        financial_year = %snapshot.financial_year,
        pay_date = %snapshot.pay_date,
        outcome = ?outcome,
        "Financial year summary upsert"
    );

    Ok(outcome)
}

pub async fn list_summaries(pool: &SqlitePool) -> Result<Vec<FinancialYearSummary>> {
    let rows = sqlx::query_as::<_, FinancialYearSummary>(
        "SELECT * FROM financial_year_summaries ORDER BY financial_year DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_summary(pool: &SqlitePool, label: &str) -> Result<Option<FinancialYearSummary>> {
    let row = sqlx::query_as::<_, FinancialYearSummary>(
        "SELECT * FROM financial_year_summaries WHERE financial_year = ?",
    )
    .bind(label)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Totals computed from the payslips stored for one year
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PayslipTotals {
    pub financial_year: String,
    pub payslip_count: i64,
    pub total_net: f64,
    pub total_gross: f64,
    pub total_tax: f64,
    pub total_national_insurance: f64,
    pub total_pension: f64,
    pub total_other_deductions: f64,
    pub first_pay_date: NaiveDate,
    pub last_pay_date: NaiveDate,
}

const TOTALS_SQL: &str = r#"
    SELECT financial_year,
           COUNT(*) AS payslip_count,
           TOTAL(net_pay) AS total_net,
           TOTAL(gross_pay) AS total_gross,
           TOTAL(tax) AS total_tax,
           TOTAL(national_insurance) AS total_national_insurance,
           TOTAL(pension) AS total_pension,
           TOTAL(other_deductions) AS total_other_deductions,
           MIN(pay_date) AS first_pay_date,
           MAX(pay_date) AS last_pay_date
    FROM payslips
"#;

pub async fn payslip_totals(pool: &SqlitePool) -> Result<Vec<PayslipTotals>> {
    let sql = format!("{TOTALS_SQL} GROUP BY financial_year ORDER BY financial_year DESC");
    let rows = sqlx::query_as::<_, PayslipTotals>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn payslip_totals_for(pool: &SqlitePool, label: &str) -> Result<Option<PayslipTotals>> {
    let sql = format!("{TOTALS_SQL} WHERE financial_year = ? GROUP BY financial_year");
    let row = sqlx::query_as::<_, PayslipTotals>(&sql)
        .bind(label)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Stored summary and live totals for one financial year
#[derive(Debug, Clone, Serialize)]
pub struct FinancialYearOverview {
    pub financial_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summary: Option<FinancialYearSummary>,
    pub totals: Option<PayslipTotals>,
}

impl FinancialYearOverview {
    fn new(year: FinancialYear) -> Self {
        Self {
            financial_year: year.label(),
            start_date: year.start_date(),
            end_date: year.end_date(),
            summary: None,
            totals: None,
        }
    }
}

/// Every year that has a summary or payslips, newest first
pub async fn list_overviews(pool: &SqlitePool) -> Result<Vec<FinancialYearOverview>> {
    let mut by_year: BTreeMap<FinancialYear, FinancialYearOverview> = BTreeMap::new();

    for summary in list_summaries(pool).await? {
        let year: FinancialYear = summary.financial_year.parse()?;
        by_year
            .entry(year)
            .or_insert_with(|| FinancialYearOverview::new(year))
            .summary = Some(summary);
    }

    for totals in payslip_totals(pool).await? {
        let year: FinancialYear = totals.financial_year.parse()?;
        by_year
            .entry(year)
            .or_insert_with(|| FinancialYearOverview::new(year))
            .totals = Some(totals);
    }

    Ok(by_year.into_values().rev().collect())
}

/// Overview of a single year; always returned, possibly empty
pub async fn get_overview(pool: &SqlitePool, year: FinancialYear) -> Result<FinancialYearOverview> {
    let label = year.label();
    let mut overview = FinancialYearOverview::new(year);
    overview.summary = get_summary(pool, &label).await?;
    overview.totals = payslip_totals_for(pool, &label).await?;
    Ok(overview)
}

/// Recompute every summary from the payslips currently stored
///
/// Payslips are replayed oldest first (ties by id), so the result equals the
/// state reached had they been uploaded in date order. Returns the number of
/// summaries written.
pub async fn rebuild_summaries(pool: &SqlitePool) -> Result<usize> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM financial_year_summaries")
        .execute(&mut *tx)
        .await?;

    let payslips = sqlx::query_as::<_, Payslip>("SELECT * FROM payslips ORDER BY pay_date ASC, id ASC")
        .fetch_all(&mut *tx)
        .await?;

    let mut written = 0usize;
    for payslip in &payslips {
        let outcome = upsert_if_newer(&mut tx, &YtdSnapshot::from_payslip(payslip)).await?;
        if outcome == UpsertOutcome::Inserted {
            written += 1;
        }
    }

    tx.commit().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfa_common::db::init_memory_database;

    fn snapshot(date: (i32, u32, u32), net_ytd: f64) -> YtdSnapshot {
        let pay_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        YtdSnapshot {
            financial_year: FinancialYear::containing(pay_date).label(),
            pay_date,
            gross_ytd: Some(net_ytd * 1.4),
            tax_ytd: None,
            ni_ytd: None,
            pension_ytd: None,
            net_ytd: Some(net_ytd),
            source_file_name: Some(format!("{pay_date}.pdf")),
        }
    }

    #[tokio::test]
    async fn test_first_write_inserts() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let outcome = upsert_if_newer(&mut conn, &snapshot((2024, 4, 30), 2000.0)).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn test_newer_overwrites() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        upsert_if_newer(&mut conn, &snapshot((2024, 4, 30), 2000.0)).await.unwrap();
        let outcome = upsert_if_newer(&mut conn, &snapshot((2024, 5, 31), 4000.0)).await.unwrap();
        drop(conn);

        assert_eq!(outcome, UpsertOutcome::Updated);
        let stored = get_summary(&pool, "2024/25").await.unwrap().unwrap();
        assert_eq!(stored.net_ytd, Some(4000.0));
        assert_eq!(stored.last_pay_date, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
    }

    #[tokio::test]
    async fn test_older_and_equal_dates_skipped() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        upsert_if_newer(&mut conn, &snapshot((2024, 5, 31), 4000.0)).await.unwrap();
        let older = upsert_if_newer(&mut conn, &snapshot((2024, 4, 30), 2000.0)).await.unwrap();
        let same = upsert_if_newer(&mut conn, &snapshot((2024, 5, 31), 9999.0)).await.unwrap();
        drop(conn);

        assert_eq!(older, UpsertOutcome::Skipped);
        assert_eq!(same, UpsertOutcome::Skipped);
        let stored = get_summary(&pool, "2024/25").await.unwrap().unwrap();
        assert_eq!(stored.net_ytd, Some(4000.0));
    }

    #[tokio::test]
    async fn test_years_are_independent() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        upsert_if_newer(&mut conn, &snapshot((2024, 4, 5), 30000.0)).await.unwrap();
        let outcome = upsert_if_newer(&mut conn, &snapshot((2024, 4, 6), 100.0)).await.unwrap();
        drop(conn);

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(list_summaries(&pool).await.unwrap().len(), 2);
    }
}
