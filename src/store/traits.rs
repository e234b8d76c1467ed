//! Unified `Database` trait — single async interface for bot state persistence.
//!
//! State is stored as JSON values keyed by `(scope, owner_id, property)`.
//! `scope` is `"user"` or `"conversation"`, `owner_id` identifies the user or
//! conversation within a channel, and `property` names one state slot
//! (e.g. `languagePreference`).

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic database trait for scoped bot state.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Read one property. `None` if it was never written (or was deleted).
    async fn get_state(
        &self,
        scope: &str,
        owner_id: &str,
        property: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Read every property stored for an owner.
    async fn load_state(
        &self,
        scope: &str,
        owner_id: &str,
    ) -> Result<Vec<(String, serde_json::Value)>, DatabaseError>;

    /// Insert or overwrite one property.
    async fn set_state(
        &self,
        scope: &str,
        owner_id: &str,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete one property. Returns whether a row was removed.
    async fn delete_state(
        &self,
        scope: &str,
        owner_id: &str,
        property: &str,
    ) -> Result<bool, DatabaseError>;
}
