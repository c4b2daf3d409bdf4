//! PostgreSQL-backed state store. Tables:
//! - `credentials`: encrypted OAuth tokens per (user_id, service)
//! - `refresh_markers`: the live refresh-card marker per user

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::{Credential, Service, StateStore};
use crate::crypto::CryptoEngine;
use crate::error::AppError;

pub struct PgStore {
    pool: PgPool,
    crypto: Arc<CryptoEngine>,
}

impl PgStore {
    pub async fn new(db_url: &str, crypto: Arc<CryptoEngine>) -> Result<Self, AppError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(db_url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool, crypto })
    }
}

#[async_trait]
impl StateStore for PgStore {
    async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                user_id         TEXT NOT NULL,
                service         TEXT NOT NULL,
                access_token    TEXT NOT NULL,
                refresh_token   TEXT,
                expires_at      TIMESTAMPTZ,
                created_at      TIMESTAMPTZ DEFAULT NOW(),
                updated_at      TIMESTAMPTZ DEFAULT NOW(),
                PRIMARY KEY (user_id, service)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS refresh_markers (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                created_at  TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_refresh_markers_user ON refresh_markers(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credential(
        &self,
        service: Service,
        user_id: &str,
    ) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT access_token, refresh_token, expires_at
            FROM credentials
            WHERE user_id = $1 AND service = $2
            "#,
        )
        .bind(user_id)
        .bind(service.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let enc_access: String = row.get(0);
        let enc_refresh: Option<String> = row.try_get(1).ok().flatten();
        let expires_at: Option<DateTime<Utc>> = row.try_get(2).ok().flatten();

        let refresh_token = match enc_refresh {
            Some(ref rt) if !rt.is_empty() => Some(self.crypto.open_token(rt)?),
            _ => None,
        };

        Ok(Some(Credential {
            user_id: user_id.to_string(),
            access_token: self.crypto.open_token(&enc_access)?,
            refresh_token,
            expires_at,
        }))
    }

    async fn put_credential(&self, service: Service, cred: &Credential) -> Result<(), AppError> {
        let enc_access = self.crypto.seal_token(&cred.access_token)?;
        let enc_refresh = cred
            .refresh_token
            .as_deref()
            .map(|rt| self.crypto.seal_token(rt))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO credentials (user_id, service, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, service)
            DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, credentials.refresh_token),
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(&cred.user_id)
        .bind(service.as_str())
        .bind(&enc_access)
        .bind(&enc_refresh)
        .bind(cred.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_users(&self, service: Service) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT user_id FROM credentials WHERE service = $1 ORDER BY user_id")
            .bind(service.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn put_refresh_marker(&self, user_id: &str, marker_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_markers WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("INSERT INTO refresh_markers (id, user_id) VALUES ($1, $2)")
            .bind(marker_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn take_refresh_marker(&self, marker_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("DELETE FROM refresh_markers WHERE id = $1 RETURNING id")
            .bind(marker_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}
