//! Tests for the coupon store.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqlitePoolOptions;

use coupons::config::DatabaseConfig;
use coupons::errors::CouponError;
use coupons::server::database::{Coupon, Database};
use coupons::status::CouponStatus;

async fn setup_test_db() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    let db = Database::SQLite(pool);
    db.ensure_schema().await.expect("failed to create schema");
    db
}

fn long_ago() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn test_coupon(code: &str, status: CouponStatus) -> Coupon {
    Coupon {
        code: code.to_string(),
        description: Some("Winter sale".to_string()),
        discount: 25.5,
        customer_eligibility: "new_customers".to_string(),
        usage_limit: Some(100),
        one_time_use: true,
        start_date: "2024-01-01".to_string(),
        end_date: "2024-01-31".to_string(),
        status_text: status.as_str().to_string(),
        created_at: long_ago(),
        updated_at: long_ago(),
    }
}

#[tokio::test]
async fn test_insert_and_get_coupon() {
    let db = setup_test_db().await;
    db.insert_coupon(&test_coupon("WINTER25", CouponStatus::Future))
        .await
        .unwrap();

    let coupon = db.get_coupon("WINTER25").await.unwrap().expect("missing");
    assert_eq!(coupon.description.as_deref(), Some("Winter sale"));
    assert_eq!(coupon.discount, 25.5);
    assert_eq!(coupon.customer_eligibility, "new_customers");
    assert_eq!(coupon.usage_limit, Some(100));
    assert!(coupon.one_time_use);
    assert_eq!(coupon.status().unwrap(), CouponStatus::Future);
    assert_eq!(coupon.created_at, long_ago());

    let window = coupon.window().unwrap();
    assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
}

#[tokio::test]
async fn test_get_missing_coupon() {
    let db = setup_test_db().await;
    assert!(db.get_coupon("NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_duplicate_code() {
    let db = setup_test_db().await;
    db.insert_coupon(&test_coupon("WINTER25", CouponStatus::Future))
        .await
        .unwrap();

    let err = db
        .insert_coupon(&test_coupon("WINTER25", CouponStatus::Active))
        .await
        .unwrap_err();
    assert!(matches!(err, CouponError::Conflict(code) if code == "WINTER25"));
}

#[tokio::test]
async fn test_racing_inserts_of_one_code() {
    let db = setup_test_db().await;
    let first = test_coupon("RACE10", CouponStatus::Active);
    let second = test_coupon("RACE10", CouponStatus::Future);

    let (a, b) = tokio::join!(db.insert_coupon(&first), db.insert_coupon(&second));

    let conflicts = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(CouponError::Conflict(code)) if code == "RACE10"))
        .count();
    assert_eq!(conflicts, 1);
    assert!(a.is_ok() || b.is_ok());
}

#[tokio::test]
async fn test_ensure_schema_is_repeatable() {
    let db = setup_test_db().await;
    db.insert_coupon(&test_coupon("KEEP", CouponStatus::Active))
        .await
        .unwrap();

    db.ensure_schema().await.unwrap();
    assert!(db.get_coupon("KEEP").await.unwrap().is_some());
}

#[tokio::test]
async fn test_conditional_status_update() {
    let db = setup_test_db().await;
    db.insert_coupon(&test_coupon("WINTER25", CouponStatus::Future))
        .await
        .unwrap();

    // Stored status is Future, so an update expecting Active must not apply.
    let applied = db
        .update_coupon_status("WINTER25", CouponStatus::Active, CouponStatus::Expired)
        .await
        .unwrap();
    assert!(!applied);
    let coupon = db.get_coupon("WINTER25").await.unwrap().unwrap();
    assert_eq!(coupon.status_text, "Future");
    assert_eq!(coupon.updated_at, long_ago());

    let applied = db
        .update_coupon_status("WINTER25", CouponStatus::Future, CouponStatus::Active)
        .await
        .unwrap();
    assert!(applied);
    let coupon = db.get_coupon("WINTER25").await.unwrap().unwrap();
    assert_eq!(coupon.status_text, "Active");
    assert!(coupon.updated_at > long_ago());
}

#[tokio::test]
async fn test_conditional_update_missing_coupon() {
    let db = setup_test_db().await;
    let applied = db
        .update_coupon_status("GHOST", CouponStatus::Future, CouponStatus::Active)
        .await
        .unwrap();
    assert!(!applied);
}

#[tokio::test]
async fn test_set_coupon_status() {
    let db = setup_test_db().await;
    db.insert_coupon(&test_coupon("WINTER25", CouponStatus::Active))
        .await
        .unwrap();

    assert!(db
        .set_coupon_status("WINTER25", CouponStatus::Inactive)
        .await
        .unwrap());
    assert_eq!(
        db.get_coupon("WINTER25").await.unwrap().unwrap().status_text,
        "Inactive"
    );

    assert!(!db
        .set_coupon_status("GHOST", CouponStatus::Inactive)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_list_coupons() {
    let db = setup_test_db().await;
    for (code, status) in [
        ("CHARLIE", CouponStatus::Active),
        ("ALPHA", CouponStatus::Expired),
        ("BRAVO", CouponStatus::Active),
        ("DELTA", CouponStatus::Inactive),
    ] {
        db.insert_coupon(&test_coupon(code, status)).await.unwrap();
    }

    let all: Vec<String> = db
        .list_coupons()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.code)
        .collect();
    assert_eq!(all, vec!["ALPHA", "BRAVO", "CHARLIE", "DELTA"]);

    let active: Vec<String> = db
        .list_coupons_by_status(CouponStatus::Active)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.code)
        .collect();
    assert_eq!(active, vec!["BRAVO", "CHARLIE"]);

    assert!(db
        .list_coupons_by_status(CouponStatus::Future)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unknown_stored_status_is_an_error() {
    let db = setup_test_db().await;
    let mut coupon = test_coupon("ODD", CouponStatus::Active);
    coupon.status_text = "Paused".to_string();
    db.insert_coupon(&coupon).await.unwrap();

    let stored = db.get_coupon("ODD").await.unwrap().unwrap();
    assert!(stored.status().is_err());
}

#[tokio::test]
async fn test_connect_rejects_unknown_backend() {
    let config = DatabaseConfig {
        db_type: "mysql".to_string(),
        ..DatabaseConfig::default()
    };

    let err = Database::connect(&config).await.unwrap_err();
    assert!(matches!(err, CouponError::ConfigError(_)));
}

#[tokio::test]
async fn test_connect_sqlite_from_config() {
    let config = DatabaseConfig {
        db_type: "sqlite".to_string(),
        sqlite_url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };

    let db = Database::connect(&config).await.unwrap();
    assert_eq!(db.db_type(), "sqlite");
}
