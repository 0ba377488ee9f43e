//! SQLite database operations
//!
//! All database access goes through this module.

use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::auth::{CredentialStore, normalize_email};
use crate::error::AppError;
use crate::metrics::DB_QUERY_DURATION_SECONDS;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Credential operations
    // =========================================================================

    /// Get a credential record by email
    ///
    /// The email is normalized before lookup.
    pub async fn get_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["SELECT", "credentials"])
            .start_timer();

        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, email, password_hash, created_at FROM credentials WHERE email = ?",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(record)
    }

    /// Insert a credential record
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the email is already registered
    pub async fn insert_credential(&self, record: &CredentialRecord) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION_SECONDS
            .with_label_values(&["INSERT", "credentials"])
            .start_timer();

        let result = sqlx::query(
            r#"
            INSERT INTO credentials (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(normalize_email(&record.email))
        .bind(&record.password_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        timer.observe_duration();

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Validation("email is already registered".to_string()),
            ),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Count stored credential records
    pub async fn count_credentials(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM credentials")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the pool. Later lookups fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, AppError> {
        self.get_credential_by_email(email).await
    }
}
