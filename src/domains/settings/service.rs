use crate::auth::ChurchSession;
use crate::domains::settings::confirm::ConfirmationPrompt;
use crate::backend::{rows_into, to_row};
use crate::domains::settings::repository::SettingsRepository;
use crate::domains::settings::types::{
    generate_code, CatalogEntry, ChurchInfo, ChurchInfoUpdate, DeleteOutcome, NewCatalogEntry,
};
use crate::errors::{DomainError, ServiceResult};
use crate::validation::Validate;
use chrono::Utc;
use log::{debug, error, info};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Church settings: the three lookup catalogs and the church profile.
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    async fn load<T: CatalogEntry>(&self, church_id: Uuid) -> ServiceResult<Vec<T>> {
        let rows = self.repo.list_rows(T::TABLE, church_id).await?;
        Ok(rows_into(rows)?)
    }

    async fn store<T: CatalogEntry>(&self, entries: &[T]) -> ServiceResult<Vec<T>> {
        let rows = entries.iter().map(to_row).collect::<Result<Vec<_>, _>>()?;
        let stored = self.repo.insert_rows(T::TABLE, rows).await?;
        Ok(rows_into(stored)?)
    }

    /// Active rows of a catalog in display order.
    pub async fn list<T: CatalogEntry>(&self, session: &ChurchSession) -> ServiceResult<Vec<T>> {
        let rows = self.load::<T>(session.church_id).await?;
        debug!("Loaded {} {} rows for church {}", rows.len(), T::LABEL, session.church_id);
        Ok(rows.into_iter().filter(|row| row.is_active()).collect())
    }

    /// Like `list`, but a church with no rows at all gets the standard list.
    pub async fn list_or_seed<T: CatalogEntry>(&self, session: &ChurchSession) -> ServiceResult<Vec<T>> {
        let rows = self.load::<T>(session.church_id).await?;
        if rows.is_empty() {
            info!("No {} rows for church {}, creating defaults", T::LABEL, session.church_id);
            return self.seed_defaults::<T>(session).await;
        }
        Ok(rows.into_iter().filter(|row| row.is_active()).collect())
    }

    pub async fn seed_defaults<T: CatalogEntry>(&self, session: &ChurchSession) -> ServiceResult<Vec<T>> {
        let defaults = T::defaults(session.church_id);
        let stored = self.store(&defaults).await.map_err(|e| {
            error!("Failed to create default {} rows: {}", T::LABEL, e);
            e
        })?;
        info!("Created {} default {} rows", stored.len(), T::LABEL);
        Ok(stored)
    }

    /// Append a row at the end of the catalog, generating a code if none
    /// was given.
    pub async fn add<T: CatalogEntry>(
        &self,
        session: &ChurchSession,
        entry: NewCatalogEntry,
    ) -> ServiceResult<T> {
        entry.validate()?;

        let existing = self.list::<T>(session).await?;
        let code = generate_code(
            &entry.name,
            entry.code.as_deref(),
            T::CODE_PREFIX,
            Utc::now().timestamp_millis(),
        );
        let row = T::create(session.church_id, entry.name.trim(), &code, existing.len() as i32 + 1);
        debug!("Inserting {} '{}' ({})", T::LABEL, row.name(), row.code());

        let stored = self.store(std::slice::from_ref(&row)).await?;
        let created = stored.into_iter().next().unwrap_or(row);
        info!("Added {} '{}'", T::LABEL, created.name());
        Ok(created)
    }

    /// Delete a row once the operator confirms. Backend refusals (e.g. the
    /// row is still referenced) come back with the backend's own message.
    pub async fn remove<T: CatalogEntry>(
        &self,
        session: &ChurchSession,
        id: Uuid,
        prompt: &dyn ConfirmationPrompt,
    ) -> ServiceResult<DeleteOutcome> {
        if !prompt.confirm(T::DELETE_PROMPT).await {
            debug!("Deletion of {} {} cancelled", T::LABEL, id);
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = self.repo.delete_row(T::TABLE, T::ID_COLUMN, session.church_id, id).await.map_err(|e| {
            error!("Failed to remove {} {}: {}", T::LABEL, id, e);
            e
        })?;
        if removed == 0 {
            return Err(DomainError::EntityNotFound(T::LABEL.to_string(), id).into());
        }
        info!("Removed {} {}", T::LABEL, id);
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn church_info(&self, session: &ChurchSession) -> ServiceResult<ChurchInfo> {
        let info = self.repo.find_church(session.church_id).await?;
        session.authorize_church(&info.church_id)?;
        Ok(info)
    }

    /// Save the church profile. Blank name and e-mail fall back to the
    /// session's values; other blank fields are cleared.
    pub async fn update_church_info(
        &self,
        session: &ChurchSession,
        update: ChurchInfoUpdate,
    ) -> ServiceResult<ChurchInfo> {
        update.validate()?;

        let changes = json!({
            "church_name": update.church_name().unwrap_or_else(|| session.church_name.clone()),
            "email": update.email().unwrap_or_else(|| session.email.clone()),
            "church_phone": opt(update.church_phone()),
            "church_address": opt(update.church_address()),
            "kakao_id": opt(update.kakao_id()),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let saved = self
            .repo
            .update_church(session.church_id, changes)
            .await
            .map_err(|e| {
                if e.to_string().contains("column") {
                    error!("churches table is missing a profile column: {}", e);
                } else {
                    error!("Failed to save church info: {}", e);
                }
                e
            })?;
        info!("Church info saved for {}", session.church_id);
        Ok(saved)
    }
}

fn opt(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tables;
    use crate::backend::testing::{mock_backend, MockBackendClient};
    use crate::domains::settings::confirm::FixedAnswer;
    use crate::domains::settings::repository::BackendSettingsRepository;
    use crate::domains::settings::types::{DonationType, Position, PositionStatus};
    use crate::errors::{BackendError, DomainResult, ServiceError};

    fn service(client: Arc<MockBackendClient>) -> SettingsService {
        let (backend, _) = mock_backend(client);
        SettingsService::new(Arc::new(BackendSettingsRepository::new(backend)))
    }

    fn session() -> ChurchSession {
        ChurchSession::new(Uuid::new_v4(), "은혜교회", "office@grace.kr")
    }

    /// Records which table each catalog call touched
    #[derive(Default)]
    struct TableLog {
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl TableLog {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl SettingsRepository for TableLog {
        async fn list_rows(&self, table: &str, _church_id: Uuid) -> DomainResult<Vec<Value>> {
            self.record(format!("list {}", table));
            Ok(Vec::new())
        }

        async fn insert_rows(&self, table: &str, rows: Vec<Value>) -> DomainResult<Vec<Value>> {
            self.record(format!("insert {} x{}", table, rows.len()));
            Ok(rows)
        }

        async fn delete_row(&self, table: &str, id_column: &str, _church_id: Uuid, _id: Uuid) -> DomainResult<usize> {
            self.record(format!("delete {}.{}", table, id_column));
            Ok(1)
        }

        async fn find_church(&self, church_id: Uuid) -> DomainResult<ChurchInfo> {
            Err(DomainError::EntityNotFound("church".to_string(), church_id))
        }

        async fn update_church(&self, church_id: Uuid, _changes: Value) -> DomainResult<ChurchInfo> {
            Err(DomainError::EntityNotFound("church".to_string(), church_id))
        }
    }

    #[tokio::test]
    async fn test_catalogs_are_routed_by_table() {
        let repo = Arc::new(TableLog::default());
        let service = SettingsService::new(repo.clone());
        let session = session();

        let statuses = service.list_or_seed::<PositionStatus>(&session).await.unwrap();
        assert_eq!(statuses[0].status_code, "ACTIVE");
        let outcome = service
            .remove::<Position>(&session, Uuid::new_v4(), &FixedAnswer(true))
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);

        let calls = repo.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], "list position_statuses");
        assert!(calls[1].starts_with("insert position_statuses x"));
        assert_eq!(calls[2], "delete positions.position_id");
    }

    #[tokio::test]
    async fn test_empty_catalog_is_seeded() {
        let client = Arc::new(MockBackendClient::new());
        let service = service(client.clone());
        let session = session();

        let types = service.list_or_seed::<DonationType>(&session).await.unwrap();
        assert_eq!(types.len(), 10);
        assert_eq!(client.rows(tables::DONATION_TYPES).len(), 10);

        // Second load reads the stored rows instead of seeding again
        let again = service.list_or_seed::<DonationType>(&session).await.unwrap();
        assert_eq!(again.len(), 10);
        assert_eq!(again[0].type_name, "주정헌금");
        assert_eq!(client.rows(tables::DONATION_TYPES).len(), 10);

        let positions = service.list_or_seed::<Position>(&session).await.unwrap();
        assert_eq!(positions.len(), 8);
        let statuses = service.list_or_seed::<PositionStatus>(&session).await.unwrap();
        assert_eq!(statuses[0].status_code, "ACTIVE");
    }

    #[tokio::test]
    async fn test_add_appends_with_generated_code() {
        let client = Arc::new(MockBackendClient::new());
        let service = service(client.clone());
        let session = session();
        service.seed_defaults::<Position>(&session).await.unwrap();

        let added: Position = service
            .add(&session, NewCatalogEntry { name: " 교육 Director ".to_string(), code: None })
            .await
            .unwrap();
        assert_eq!(added.position_code, "DIRECTOR");
        assert_eq!(added.position_name, "교육 Director");
        assert_eq!(added.sort_order, 9);

        let hangul_only: Position = service
            .add(&session, NewCatalogEntry { name: "서리집사".to_string(), code: None })
            .await
            .unwrap();
        assert!(hangul_only.position_code.starts_with("POS_"));
        assert_eq!(hangul_only.position_code.len(), "POS_".len() + 6);
        assert_eq!(hangul_only.sort_order, 10);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_name() {
        let client = Arc::new(MockBackendClient::new());
        let service = service(client.clone());
        let result = service
            .add::<DonationType>(&session(), NewCatalogEntry { name: "  ".to_string(), code: None })
            .await;
        assert!(matches!(result, Err(ServiceError::Domain(DomainError::Validation(_)))));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_respects_confirmation() {
        let client = Arc::new(MockBackendClient::new());
        let service = service(client.clone());
        let session = session();
        let types = service.seed_defaults::<DonationType>(&session).await.unwrap();
        let target = types[1].type_id;

        let outcome = service.remove::<DonationType>(&session, target, &FixedAnswer(false)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(client.rows(tables::DONATION_TYPES).len(), 10);

        let outcome = service.remove::<DonationType>(&session, target, &FixedAnswer(true)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(client.rows(tables::DONATION_TYPES).len(), 9);
    }

    #[tokio::test]
    async fn test_remove_surfaces_backend_message() {
        let client = Arc::new(MockBackendClient::new());
        let service = service(client.clone());
        let session = session();
        let types = service.seed_defaults::<DonationType>(&session).await.unwrap();

        let message = "update or delete on table \"donation_types\" violates foreign key constraint";
        client.fail_next(BackendError::Conflict(message.to_string()));
        let err = service
            .remove::<DonationType>(&session, types[0].type_id, &FixedAnswer(true))
            .await
            .unwrap_err();
        assert!(err.to_string().contains(message));
    }

    #[tokio::test]
    async fn test_update_church_info_falls_back_to_session() {
        let session = session();
        let client = Arc::new(MockBackendClient::new().with_rows(
            tables::CHURCHES,
            vec![json!({
                "church_id": session.church_id,
                "church_name": "옛이름교회",
                "email": "old@grace.kr",
                "kakao_id": "grace_old",
            })],
        ));
        let service = service(client.clone());

        let saved = service
            .update_church_info(
                &session,
                ChurchInfoUpdate {
                    church_name: Some(String::new()),
                    church_phone: Some("02-123-4567".to_string()),
                    kakao_id: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.church_name, "은혜교회");
        assert_eq!(saved.email.as_deref(), Some("office@grace.kr"));
        assert_eq!(saved.church_phone.as_deref(), Some("02-123-4567"));
        assert_eq!(saved.kakao_id, None);
        assert!(saved.updated_at.is_some());

        let loaded = service.church_info(&session).await.unwrap();
        assert_eq!(loaded, saved);
    }
}
