use crate::backend::{rows_into, tables, Backend, Filter, SelectQuery};
use crate::domains::settings::types::ChurchInfo;
use crate::errors::{DomainError, DomainResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Catalog and church profile access.
///
/// Catalog rows are addressed by table name and handed over as JSON; the
/// service turns them into typed `CatalogEntry` values.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// All rows of a catalog table for the church, by `sort_order`
    async fn list_rows(&self, table: &str, church_id: Uuid) -> DomainResult<Vec<Value>>;

    async fn insert_rows(&self, table: &str, rows: Vec<Value>) -> DomainResult<Vec<Value>>;

    /// Delete one row; returns how many rows the backend removed
    async fn delete_row(&self, table: &str, id_column: &str, church_id: Uuid, id: Uuid) -> DomainResult<usize>;

    async fn find_church(&self, church_id: Uuid) -> DomainResult<ChurchInfo>;

    async fn update_church(&self, church_id: Uuid, changes: Value) -> DomainResult<ChurchInfo>;
}

pub struct BackendSettingsRepository {
    backend: Arc<Backend>,
}

impl BackendSettingsRepository {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl SettingsRepository for BackendSettingsRepository {
    async fn list_rows(&self, table: &str, church_id: Uuid) -> DomainResult<Vec<Value>> {
        let query = SelectQuery::new(table)
            .eq("church_id", church_id)
            .order("sort_order", true);
        Ok(self.backend.client().select(&query).await?)
    }

    async fn insert_rows(&self, table: &str, rows: Vec<Value>) -> DomainResult<Vec<Value>> {
        Ok(self.backend.client().insert(table, Value::Array(rows)).await?)
    }

    async fn delete_row(&self, table: &str, id_column: &str, church_id: Uuid, id: Uuid) -> DomainResult<usize> {
        let filters = [Filter::eq(id_column, id), Filter::eq("church_id", church_id)];
        let removed = self.backend.client().delete(table, &filters).await?;
        Ok(removed.len())
    }

    async fn find_church(&self, church_id: Uuid) -> DomainResult<ChurchInfo> {
        let query = SelectQuery::new(tables::CHURCHES).eq("church_id", church_id).limit(1);
        let rows = self.backend.client().select(&query).await?;
        rows_into::<ChurchInfo>(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::EntityNotFound("church".to_string(), church_id))
    }

    async fn update_church(&self, church_id: Uuid, changes: Value) -> DomainResult<ChurchInfo> {
        let filters = [Filter::eq("church_id", church_id)];
        let rows = self.backend.client().update(tables::CHURCHES, &filters, changes).await?;
        rows_into::<ChurchInfo>(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::EntityNotFound("church".to_string(), church_id))
    }
}
