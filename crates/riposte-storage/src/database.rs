// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use riposte_config::StorageConfig;
use riposte_core::RiposteError;
use tracing::debug;

use crate::migrations;

/// Async handle to the SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at the configured path, run
    /// pending migrations, and apply connection pragmas.
    pub async fn open(config: &StorageConfig) -> Result<Self, RiposteError> {
        // Migrations run on a short-lived blocking connection so refinery
        // gets the `&mut rusqlite::Connection` it wants.
        let path = config.database_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), RiposteError> {
            let mut conn = rusqlite::Connection::open(&path).map_err(|e| {
                RiposteError::Storage {
                    source: Box::new(e),
                }
            })?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| RiposteError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&config.database_path)
            .await
            .map_err(|e| RiposteError::Storage {
                source: Box::new(e),
            })?;

        let journal_mode = if config.wal_mode { "WAL" } else { "DELETE" };
        let pragmas = format!(
            "PRAGMA journal_mode = {journal_mode};
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;"
        );
        conn.call(move |conn| {
            conn.execute_batch(&pragmas)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), RiposteError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> RiposteError {
    RiposteError::Storage {
        source: Box::new(e),
    }
}
