//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Parse a stored JSON string. Unparseable rows read back as `null`.
fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or(serde_json::Value::Null)
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_state(
        &self,
        scope: &str,
        owner_id: &str,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT value FROM bot_state WHERE scope = ?1 AND owner_id = ?2 AND property = ?3",
                params![scope, owner_id, property],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_state: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row.get(0).unwrap_or_else(|_| "null".to_string());
                Ok(Some(parse_value(&raw)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_state: {e}"))),
        }
    }

    async fn load_state(
        &self,
        scope: &str,
        owner_id: &str,
    ) -> Result<Vec<(String, serde_json::Value)>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT property, value FROM bot_state WHERE scope = ?1 AND owner_id = ?2
                 ORDER BY property",
                params![scope, owner_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_state: {e}")))?;

        let mut values = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => {
                    let property: String = row
                        .get(0)
                        .map_err(|e| DatabaseError::Query(format!("load_state: {e}")))?;
                    let raw: String = row.get(1).unwrap_or_else(|_| "null".to_string());
                    values.push((property, parse_value(&raw)));
                }
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("load_state: {e}"))),
            }
        }
        Ok(values)
    }

    async fn set_state(
        &self,
        scope: &str,
        owner_id: &str,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO bot_state (scope, owner_id, property, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (scope, owner_id, property) DO UPDATE SET value = ?4, updated_at = ?5",
                params![scope, owner_id, property, raw, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_state: {e}")))?;

        Ok(())
    }

    async fn delete_state(
        &self,
        scope: &str,
        owner_id: &str,
        property: &str,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM bot_state WHERE scope = ?1 AND owner_id = ?2 AND property = ?3",
                params![scope, owner_id, property],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_state: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn state_crud() {
        let db = test_db().await;
        let value = serde_json::json!({"name": "Ana", "languagePreference": "es"});

        db.set_state("user", "cli/ana", "user", &value).await.unwrap();

        let fetched = db
            .get_state("user", "cli/ana", "user")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, value);

        // Upsert
        db.set_state("user", "cli/ana", "user", &serde_json::json!({"name": "Bo"}))
            .await
            .unwrap();
        let fetched2 = db
            .get_state("user", "cli/ana", "user")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched2["name"], "Bo");

        let deleted = db.delete_state("user", "cli/ana", "user").await.unwrap();
        assert!(deleted);
        assert!(db.get_state("user", "cli/ana", "user").await.unwrap().is_none());

        let again = db.delete_state("user", "cli/ana", "user").await.unwrap();
        assert!(!again);
    }

    #[tokio::test]
    async fn scalar_round_trip() {
        let db = test_db().await;
        db.set_state("user", "cli/ana", "languagePreference", &serde_json::json!("ko"))
            .await
            .unwrap();
        let v = db
            .get_state("user", "cli/ana", "languagePreference")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v, "ko");
    }

    #[tokio::test]
    async fn scope_and_owner_isolation() {
        let db = test_db().await;
        db.set_state("user", "cli/a", "k", &serde_json::json!("user-a"))
            .await
            .unwrap();
        db.set_state("user", "cli/b", "k", &serde_json::json!("user-b"))
            .await
            .unwrap();
        db.set_state("conversation", "cli/a", "k", &serde_json::json!("conv-a"))
            .await
            .unwrap();

        assert_eq!(db.get_state("user", "cli/a", "k").await.unwrap().unwrap(), "user-a");
        assert_eq!(db.get_state("user", "cli/b", "k").await.unwrap().unwrap(), "user-b");
        assert_eq!(
            db.get_state("conversation", "cli/a", "k").await.unwrap().unwrap(),
            "conv-a"
        );
    }

    #[tokio::test]
    async fn load_state_returns_all_properties() {
        let db = test_db().await;
        db.set_state("user", "cli/a", "user", &serde_json::json!({"name": "A"}))
            .await
            .unwrap();
        db.set_state("user", "cli/a", "languagePreference", &serde_json::json!("es"))
            .await
            .unwrap();

        let loaded = db.load_state("user", "cli/a").await.unwrap();
        assert_eq!(loaded.len(), 2);
        // Ordered by property name
        assert_eq!(loaded[0].0, "languagePreference");
        assert_eq!(loaded[1].0, "user");
        assert_eq!(loaded[1].1["name"], "A");

        assert!(db.load_state("user", "cli/nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let db = test_db().await;
        assert!(db.get_state("user", "nobody", "nothing").await.unwrap().is_none());
    }
}
