use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{query, query_as, FromRow};
use std::sync::Arc;
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::SqlitePool;

#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{CouponError, CouponResult};
use crate::status::{CouponStatus, ValidityWindow};

#[cfg(feature = "sqlite")]
const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS coupons (
        code                 TEXT PRIMARY KEY,
        description          TEXT,
        discount             REAL NOT NULL,
        customer_eligibility TEXT NOT NULL DEFAULT 'all',
        usage_limit          INTEGER,
        one_time_use         BOOLEAN NOT NULL DEFAULT 0,
        start_date           TEXT NOT NULL,
        end_date             TEXT NOT NULL,
        status               TEXT NOT NULL,
        created_at           TEXT NOT NULL,
        updated_at           TEXT NOT NULL
    )
"#;

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS coupons (
        code                 TEXT PRIMARY KEY,
        description          TEXT,
        discount             DOUBLE PRECISION NOT NULL,
        customer_eligibility TEXT NOT NULL DEFAULT 'all',
        usage_limit          BIGINT,
        one_time_use         BOOLEAN NOT NULL DEFAULT FALSE,
        start_date           TEXT NOT NULL,
        end_date             TEXT NOT NULL,
        status               TEXT NOT NULL,
        created_at           TIMESTAMP NOT NULL,
        updated_at           TIMESTAMP NOT NULL
    )
"#;

/// A coupon record as stored in the `coupons` table.
///
/// `start_date`, `end_date` and `status` are kept as stored text; use
/// [`Coupon::window`] and [`Coupon::status`] to read them as typed values.
/// Everything except `status` and `updated_at` is opaque to the status engine.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub description: Option<String>,
    pub discount: f64,
    pub customer_eligibility: String,
    pub usage_limit: Option<i64>,
    pub one_time_use: bool,
    pub start_date: String,
    pub end_date: String,
    #[sqlx(rename = "status")]
    #[serde(rename = "status")]
    pub status_text: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Coupon {
    pub fn status(&self) -> CouponResult<CouponStatus> {
        self.status_text.parse()
    }

    pub fn window(&self) -> CouponResult<ValidityWindow> {
        ValidityWindow::parse(&self.start_date, &self.end_date)
    }
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

fn db_error(op: &str, e: sqlx::Error) -> CouponError {
    error!("{op} failed: {e}");
    CouponError::DatabaseError(format!("{op}: {e}"))
}

/// A primary-key clash on insert means the code is taken.
fn insert_error(op: &str, code: &str, e: sqlx::Error) -> CouponError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            CouponError::Conflict(code.to_string())
        }
        _ => db_error(op, e),
    }
}

impl Database {
    /// Initialize the database connection from the global configuration.
    pub async fn new() -> CouponResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await.map(Arc::new)
    }

    /// Connect using an explicit database configuration.
    pub async fn connect(db_config: &DatabaseConfig) -> CouponResult<Self> {
        let url = db_config.url()?;

        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(url).await.map_err(|e| {
                    error!("Failed to connect to SQLite: {e}");
                    CouponError::DatabaseError(format!("failed to connect to SQLite: {e}"))
                })?;
                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(CouponError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(url).await.map_err(|e| {
                    error!("Failed to connect to PostgreSQL: {e}");
                    CouponError::DatabaseError(format!("failed to connect to PostgreSQL: {e}"))
                })?;
                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(CouponError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(CouponError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Short backend name, for logs.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Create the `coupons` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> CouponResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(SQLITE_SCHEMA)
                    .execute(pool)
                    .await
                    .map_err(|e| db_error("SQLite ensure_schema", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(POSTGRES_SCHEMA)
                    .execute(pool)
                    .await
                    .map_err(|e| db_error("Postgres ensure_schema", e))?;
            }
        }

        Ok(())
    }

    /// Insert a new coupon.
    ///
    /// Returns `CouponError::Conflict` when the code is already taken.
    pub async fn insert_coupon(&self, coupon: &Coupon) -> CouponResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    INSERT INTO coupons (
                        code, description, discount, customer_eligibility,
                        usage_limit, one_time_use, start_date, end_date,
                        status, created_at, updated_at
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&coupon.code)
                .bind(&coupon.description)
                .bind(coupon.discount)
                .bind(&coupon.customer_eligibility)
                .bind(coupon.usage_limit)
                .bind(coupon.one_time_use)
                .bind(&coupon.start_date)
                .bind(&coupon.end_date)
                .bind(&coupon.status_text)
                .bind(coupon.created_at)
                .bind(coupon.updated_at)
                .execute(pool)
                .await
                .map_err(|e| insert_error("SQLite insert_coupon", &coupon.code, e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    INSERT INTO coupons (
                        code, description, discount, customer_eligibility,
                        usage_limit, one_time_use, start_date, end_date,
                        status, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(&coupon.code)
                .bind(&coupon.description)
                .bind(coupon.discount)
                .bind(&coupon.customer_eligibility)
                .bind(coupon.usage_limit)
                .bind(coupon.one_time_use)
                .bind(&coupon.start_date)
                .bind(&coupon.end_date)
                .bind(&coupon.status_text)
                .bind(coupon.created_at)
                .bind(coupon.updated_at)
                .execute(pool)
                .await
                .map_err(|e| insert_error("Postgres insert_coupon", &coupon.code, e))?;
            }
        }

        Ok(())
    }

    /// Fetch a coupon by its (case-sensitive) code.
    pub async fn get_coupon(&self, code: &str) -> CouponResult<Option<Coupon>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?")
                .bind(code)
                .fetch_optional(pool)
                .await
                .map_err(|e| db_error("SQLite get_coupon", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
                    .bind(code)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| db_error("Postgres get_coupon", e))
            }
        }
    }

    /// Fetch every stored coupon, ordered by code.
    pub async fn list_coupons(&self) -> CouponResult<Vec<Coupon>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY code")
                .fetch_all(pool)
                .await
                .map_err(|e| db_error("SQLite list_coupons", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY code")
                    .fetch_all(pool)
                    .await
                    .map_err(|e| db_error("Postgres list_coupons", e))
            }
        }
    }

    /// Fetch coupons whose stored status equals `status`.
    pub async fn list_coupons_by_status(&self, status: CouponStatus) -> CouponResult<Vec<Coupon>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_as::<_, Coupon>("SELECT * FROM coupons WHERE status = ? ORDER BY code")
                    .bind(status.as_str())
                    .fetch_all(pool)
                    .await
                    .map_err(|e| db_error("SQLite list_coupons_by_status", e))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, Coupon>("SELECT * FROM coupons WHERE status = $1 ORDER BY code")
                    .bind(status.as_str())
                    .fetch_all(pool)
                    .await
                    .map_err(|e| db_error("Postgres list_coupons_by_status", e))
            }
        }
    }

    /// Move a coupon from `expected` to `new`, touching only `status` and `updated_at`.
    ///
    /// The write only applies while the stored status still equals `expected`,
    /// so an operator change made after the coupon was read is never clobbered.
    ///
    /// Returns:
    /// - `Ok(true)` if the row was updated
    /// - `Ok(false)` if the coupon is gone or its status changed meanwhile
    pub async fn update_coupon_status(
        &self,
        code: &str,
        expected: CouponStatus,
        new: CouponStatus,
    ) -> CouponResult<bool> {
        let now = Utc::now().naive_utc();

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE coupons \
                     SET status = ?, updated_at = ? \
                     WHERE code = ? AND status = ?",
            )
            .bind(new.as_str())
            .bind(now)
            .bind(code)
            .bind(expected.as_str())
            .execute(pool)
            .await
            .map_err(|e| db_error("SQLite update_coupon_status", e))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE coupons \
                     SET status = $1, updated_at = $2 \
                     WHERE code = $3 AND status = $4",
            )
            .bind(new.as_str())
            .bind(now)
            .bind(code)
            .bind(expected.as_str())
            .execute(pool)
            .await
            .map_err(|e| db_error("Postgres update_coupon_status", e))?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    /// Operator status change, regardless of the current status.
    ///
    /// Returns `Ok(false)` if no coupon has this code.
    pub async fn set_coupon_status(&self, code: &str, status: CouponStatus) -> CouponResult<bool> {
        let now = Utc::now().naive_utc();

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query("UPDATE coupons SET status = ?, updated_at = ? WHERE code = ?")
                    .bind(status.as_str())
                    .bind(now)
                    .bind(code)
                    .execute(pool)
                    .await
                    .map_err(|e| db_error("SQLite set_coupon_status", e))?
                    .rows_affected()
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query("UPDATE coupons SET status = $1, updated_at = $2 WHERE code = $3")
                    .bind(status.as_str())
                    .bind(now)
                    .bind(code)
                    .execute(pool)
                    .await
                    .map_err(|e| db_error("Postgres set_coupon_status", e))?
                    .rows_affected()
            }
        };

        Ok(rows_affected > 0)
    }
}
