//! Tests for on-disk database initialization

use pfa_common::db::init::{init_database, SCHEMA_VERSION};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("pfa.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pfa.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO pensions (name, amount, created_at, updated_at)
         VALUES ('Workplace', 1000.0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pensions")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count, 1, "Existing rows should survive re-initialization");
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("pfa.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_schema_version_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("pfa.db")).await.unwrap();

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_payslip_file_name_unique() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("pfa.db")).await.unwrap();

    let insert = "INSERT INTO payslips (file_name, pay_date, financial_year, net_pay, created_at)
                  VALUES ('march.pdf', '2024-03-28', '2023/24', 2000.0, '2024-03-28T00:00:00Z')";

    sqlx::query(insert).execute(&pool).await.unwrap();
    let second = sqlx::query(insert).execute(&pool).await;

    assert!(second.is_err(), "Duplicate payslip file name should be rejected");
}
