//! Payslip database operations
//!
//! Recording a payslip and folding its YTD figures into the financial-year
//! summary happen in one transaction.

use chrono::{NaiveDate, Utc};
use pfa_common::db::Payslip;
use pfa_common::{Error, FinancialYear, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::financial_years::{upsert_if_newer, UpsertOutcome, YtdSnapshot};
use crate::services::PayslipData;
use crate::validation::{finite_amount, optional_amount, optional_text, required_date};

/// A validated payslip ready to insert
#[derive(Debug, Clone)]
pub struct NewPayslip {
    pub file_name: String,
    pub pay_date: NaiveDate,
    pub employer: Option<String>,
    pub net_pay: f64,
    pub gross_pay: Option<f64>,
    pub tax: Option<f64>,
    pub national_insurance: Option<f64>,
    pub pension: Option<f64>,
    pub other_deductions: Option<f64>,
    pub gross_ytd: Option<f64>,
    pub tax_ytd: Option<f64>,
    pub ni_ytd: Option<f64>,
    pub pension_ytd: Option<f64>,
    pub net_ytd: Option<f64>,
    pub stored_path: Option<String>,
}

impl NewPayslip {
    /// From AI-extracted figures for an uploaded file
    pub fn from_extracted(file_name: &str, data: PayslipData, stored_path: Option<String>) -> Result<Self> {
        Ok(Self {
            file_name: file_name.to_string(),
            pay_date: data.pay_date,
            employer: optional_text(data.employer.as_deref()),
            net_pay: finite_amount("net_pay", data.net_pay)?,
            gross_pay: optional_amount("gross_pay", data.gross_pay)?,
            tax: optional_amount("tax", data.tax)?,
            national_insurance: optional_amount("national_insurance", data.national_insurance)?,
            pension: optional_amount("pension", data.pension)?,
            other_deductions: optional_amount("other_deductions", data.other_deductions)?,
            gross_ytd: optional_amount("gross_ytd", data.gross_ytd)?,
            tax_ytd: optional_amount("tax_ytd", data.tax_ytd)?,
            ni_ytd: optional_amount("ni_ytd", data.ni_ytd)?,
            pension_ytd: optional_amount("pension_ytd", data.pension_ytd)?,
            net_ytd: optional_amount("net_ytd", data.net_ytd)?,
            stored_path,
        })
    }

    fn financial_year(&self) -> String {
        FinancialYear::containing(self.pay_date).label()
    }
}

/// Manual payslip entry payload
#[derive(Debug, Clone, Deserialize)]
pub struct PayslipInput {
    /// Defaults to a generated `manual-<date>-<id>` name
    #[serde(default)]
    pub file_name: Option<String>,
    pub pay_date: String,
    #[serde(default)]
    pub employer: Option<String>,
    pub net_pay: f64,
    #[serde(default)]
    pub gross_pay: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub national_insurance: Option<f64>,
    #[serde(default)]
    pub pension: Option<f64>,
    #[serde(default)]
    pub other_deductions: Option<f64>,
    #[serde(default)]
    pub gross_ytd: Option<f64>,
    #[serde(default)]
    pub tax_ytd: Option<f64>,
    #[serde(default)]
    pub ni_ytd: Option<f64>,
    #[serde(default)]
    pub pension_ytd: Option<f64>,
    #[serde(default)]
    pub net_ytd: Option<f64>,
}

impl PayslipInput {
    pub fn validate(&self) -> Result<NewPayslip> {
        let pay_date = required_date("pay_date", &self.pay_date)?;
        let file_name = optional_text(self.file_name.as_deref()).unwrap_or_else(|| {
            format!("manual-{}-{}", pay_date, &Uuid::new_v4().simple().to_string()[..8])
        });

        Ok(NewPayslip {
            file_name,
            pay_date,
            employer: optional_text(self.employer.as_deref()),
            net_pay: finite_amount("net_pay", self.net_pay)?,
            gross_pay: optional_amount("gross_pay", self.gross_pay)?,
            tax: optional_amount("tax", self.tax)?,
            national_insurance: optional_amount("national_insurance", self.national_insurance)?,
            pension: optional_amount("pension", self.pension)?,
            other_deductions: optional_amount("other_deductions", self.other_deductions)?,
            gross_ytd: optional_amount("gross_ytd", self.gross_ytd)?,
            tax_ytd: optional_amount("tax_ytd", self.tax_ytd)?,
            ni_ytd: optional_amount("ni_ytd", self.ni_ytd)?,
            pension_ytd: optional_amount("pension_ytd", self.pension_ytd)?,
            net_ytd: optional_amount("net_ytd", self.net_ytd)?,
            stored_path: None,
        })
    }
}

/// Insert a payslip and update its financial-year summary
///
/// A file name that is already stored yields [`Error::Conflict`] and leaves
/// both tables untouched.
pub async fn record_payslip(pool: &SqlitePool, new: &NewPayslip) -> Result<(Payslip, UpsertOutcome)> {
    let mut tx = pool.begin().await?;

    let payslip = sqlx::query_as::<_, Payslip>(
        r#"
        INSERT INTO payslips
            (file_name, pay_date, financial_year, employer, net_pay, gross_pay, tax,
             national_insurance, pension, other_deductions, gross_ytd, tax_ytd, ni_ytd,
             pension_ytd, net_ytd, stored_path, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&new.file_name)
    .bind(new.pay_date)
    .bind(new.financial_year())
    .bind(&new.employer)
    .bind(new.net_pay)
    .bind(new.gross_pay)
    .bind(new.tax)
    .bind(new.national_insurance)
    .bind(new.pension)
    .bind(new.other_deductions)
    .bind(new.gross_ytd)
    .bind(new.tax_ytd)
    .bind(new.ni_ytd)
    .bind(new.pension_ytd)
    .bind(new.net_ytd)
    .bind(&new.stored_path)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| Error::from_unique(e, format!("payslip {:?} already exists", new.file_name)))?;

    let outcome = upsert_if_newer(&mut tx, &YtdSnapshot::from_payslip(&payslip)).await?;

    tx.commit().await?;

    info!(
        id = payslip.id,
        file_name = %payslip.file_name,
        financial_year = %payslip.financial_year,
        outcome = ?outcome,
        "Payslip recorded"
    );

    Ok((payslip, outcome))
}

pub async fn payslip_exists(pool: &SqlitePool, file_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payslips WHERE file_name = ?)")
        .bind(file_name)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Payslips newest first, optionally limited to one financial year label
pub async fn list_payslips(pool: &SqlitePool, financial_year: Option<&str>) -> Result<Vec<Payslip>> {
    let rows = match financial_year {
        Some(label) => {
            sqlx::query_as::<_, Payslip>(
                "SELECT * FROM payslips WHERE financial_year = ? ORDER BY pay_date DESC, id DESC",
            )
            .bind(label)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Payslip>("SELECT * FROM payslips ORDER BY pay_date DESC, id DESC")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

pub async fn get_payslip(pool: &SqlitePool, id: i64) -> Result<Option<Payslip>> {
    let row = sqlx::query_as::<_, Payslip>("SELECT * FROM payslips WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Delete a payslip, returning the removed row
///
/// The financial-year summary is left as is; `rebuild_summaries` recomputes
/// it from the payslips that remain.
pub async fn delete_payslip(pool: &SqlitePool, id: i64) -> Result<Option<Payslip>> {
    let row = sqlx::query_as::<_, Payslip>("DELETE FROM payslips WHERE id = ? RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::financial_years::get_summary;
    use pfa_common::db::init_memory_database;

    fn input(file_name: Option<&str>, pay_date: &str, net_ytd: f64) -> PayslipInput {
        PayslipInput {
            file_name: file_name.map(str::to_string),
            pay_date: pay_date.to_string(),
            employer: Some("Acme".to_string()),
            net_pay: 2000.0,
            gross_pay: Some(2800.0),
            tax: None,
            national_insurance: None,
            pension: None,
            other_deductions: None,
            gross_ytd: None,
            tax_ytd: None,
            ni_ytd: None,
            pension_ytd: None,
            net_ytd: Some(net_ytd),
        }
    }

    #[tokio::test]
    async fn test_record_assigns_financial_year() {
        let pool = init_memory_database().await.unwrap();
        let new = input(Some("apr.pdf"), "05/04/2024", 24000.0).validate().unwrap();

        let (payslip, outcome) = record_payslip(&pool, &new).await.unwrap();

        assert_eq!(payslip.financial_year, "2023/24");
        assert_eq!(outcome, UpsertOutcome::Inserted);
        let summary = get_summary(&pool, "2023/24").await.unwrap().unwrap();
        assert_eq!(summary.net_ytd, Some(24000.0));
        assert_eq!(summary.source_file_name.as_deref(), Some("apr.pdf"));
    }

    #[tokio::test]
    async fn test_duplicate_file_name_conflicts_without_side_effects() {
        let pool = init_memory_database().await.unwrap();
        let first = input(Some("slip.pdf"), "2024-04-30", 2000.0).validate().unwrap();
        record_payslip(&pool, &first).await.unwrap();

        let later = input(Some("slip.pdf"), "2024-05-31", 4000.0).validate().unwrap();
        let err = record_payslip(&pool, &later).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let summary = get_summary(&pool, "2024/25").await.unwrap().unwrap();
        assert_eq!(summary.net_ytd, Some(2000.0), "rolled back transaction must not touch summary");
        assert!(payslip_exists(&pool, "slip.pdf").await.unwrap());
    }

    #[test]
    fn test_manual_entry_gets_generated_name() {
        let new = input(None, "2024-06-28", 1.0).validate().unwrap();
        assert!(new.file_name.starts_with("manual-2024-06-28-"));
    }

    #[tokio::test]
    async fn test_list_filter_and_delete() {
        let pool = init_memory_database().await.unwrap();
        record_payslip(&pool, &input(Some("a"), "2024-03-28", 1.0).validate().unwrap())
            .await
            .unwrap();
        let (b, _) = record_payslip(&pool, &input(Some("b"), "2024-04-26", 1.0).validate().unwrap())
            .await
            .unwrap();

        assert_eq!(list_payslips(&pool, None).await.unwrap().len(), 2);
        let filtered = list_payslips(&pool, Some("2024/25")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].file_name, "b");

        let deleted = delete_payslip(&pool, b.id).await.unwrap().unwrap();
        assert_eq!(deleted.file_name, "b");
        assert!(delete_payslip(&pool, b.id).await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(input(None, "not a date", 1.0).validate().is_err());
    }
}
