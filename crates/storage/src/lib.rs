use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{AccountName, SessionBackend};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Everything needed to rebuild a session after a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub backend: SessionBackend,
    pub chain_id: String,
    pub actor: AccountName,
    pub permission: String,
    pub provider: String,
    pub payload: Value,
    pub saved_at: DateTime<Utc>,
}

/// Phase-one record of an SSO redirect, consumed when the browser returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSsoLogin {
    pub state: String,
    pub return_url: String,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool_options = if database_url.contains(":memory:") {
            // every in-memory connection is its own database, so the single
            // connection must never be reaped
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Saves the session for its backend, replacing any previous one.
    pub async fn save_session(&self, session: &StoredSession) -> Result<()> {
        let payload_json = serde_json::to_string(&session.payload)
            .context("failed to encode session payload")?;
        sqlx::query(
            r#"
            INSERT INTO stored_sessions (backend, chain_id, actor, permission, provider, payload_json, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(backend) DO UPDATE SET
                chain_id = excluded.chain_id,
                actor = excluded.actor,
                permission = excluded.permission,
                provider = excluded.provider,
                payload_json = excluded.payload_json,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(session.backend.as_str())
        .bind(&session.chain_id)
        .bind(session.actor.as_str())
        .bind(&session.permission)
        .bind(&session.provider)
        .bind(payload_json)
        .bind(session.saved_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save {} session", session.backend))?;
        Ok(())
    }

    pub async fn load_session(&self, backend: SessionBackend) -> Result<Option<StoredSession>> {
        let row = sqlx::query(
            r#"
            SELECT backend, chain_id, actor, permission, provider, payload_json, saved_at
            FROM stored_sessions
            WHERE backend = ?
            "#,
        )
        .bind(backend.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load {backend} session"))?;

        row.map(|row| stored_session_from_row(&row)).transpose()
    }

    /// Returns whether a session was stored for `backend`.
    pub async fn delete_session(&self, backend: SessionBackend) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stored_sessions WHERE backend = ?")
            .bind(backend.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete {backend} session"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_pending_sso_login(&self, pending: &PendingSsoLogin) -> Result<()> {
        sqlx::query(
            "INSERT INTO pending_sso_logins (state, return_url, created_at) VALUES (?, ?, ?)",
        )
        .bind(&pending.state)
        .bind(&pending.return_url)
        .bind(pending.created_at)
        .execute(&self.pool)
        .await
        .context("failed to save pending sso login")?;
        Ok(())
    }

    /// Removes and returns the pending login for `state`; a state can be taken once.
    pub async fn take_pending_sso_login(&self, state: &str) -> Result<Option<PendingSsoLogin>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT state, return_url, created_at FROM pending_sso_logins WHERE state = ?",
        )
        .bind(state)
        .fetch_optional(&mut *tx)
        .await
        .context("failed to load pending sso login")?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM pending_sso_logins WHERE state = ?")
            .bind(state)
            .execute(&mut *tx)
            .await
            .context("failed to consume pending sso login")?;
        tx.commit().await?;

        Ok(Some(PendingSsoLogin {
            state: row.try_get("state")?,
            return_url: row.try_get("return_url")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    /// Drops pending logins created before `cutoff`, returning how many were removed.
    pub async fn purge_pending_sso_logins(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_sso_logins WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("failed to purge pending sso logins")?;
        Ok(result.rows_affected())
    }
}

fn stored_session_from_row(row: &SqliteRow) -> Result<StoredSession> {
    let backend: String = row.try_get("backend")?;
    let actor: String = row.try_get("actor")?;
    let payload_json: String = row.try_get("payload_json")?;

    Ok(StoredSession {
        backend: SessionBackend::from_str(&backend).map_err(|err| anyhow!(err))?,
        chain_id: row.try_get("chain_id")?,
        actor: AccountName::parse(&actor)
            .with_context(|| format!("stored session has invalid actor '{actor}'"))?,
        permission: row.try_get("permission")?,
        provider: row.try_get("provider")?,
        payload: serde_json::from_str(&payload_json)
            .context("stored session payload is not valid json")?,
        saved_at: row.try_get("saved_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
