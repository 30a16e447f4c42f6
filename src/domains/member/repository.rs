use crate::backend::{rows_into, tables, Backend, Filter, SelectQuery};
use crate::domains::donation::types::STATUS_ACTIVE;
use crate::domains::member::types::{Member, MEMBER_COLUMNS};
use crate::errors::DomainResult;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Active members of a church ordered by name
    async fn list_active(&self, church_id: Uuid) -> DomainResult<Vec<Member>>;

    async fn count_active(&self, church_id: Uuid) -> DomainResult<u64>;
}

pub struct BackendMemberRepository {
    backend: Arc<Backend>,
}

impl BackendMemberRepository {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl MemberRepository for BackendMemberRepository {
    async fn list_active(&self, church_id: Uuid) -> DomainResult<Vec<Member>> {
        let query = SelectQuery::new(tables::MEMBERS)
            .columns(MEMBER_COLUMNS)
            .eq("church_id", church_id)
            .eq("status", STATUS_ACTIVE)
            .order("member_name", true);
        let rows = self.backend.client().select(&query).await?;
        Ok(rows_into(rows)?)
    }

    async fn count_active(&self, church_id: Uuid) -> DomainResult<u64> {
        let filters = [Filter::eq("church_id", church_id), Filter::eq("status", STATUS_ACTIVE)];
        Ok(self.backend.client().count(tables::MEMBERS, &filters).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{mock_backend, MockBackendClient};
    use serde_json::json;

    #[tokio::test]
    async fn test_roster_is_active_and_sorted() {
        let church_id = Uuid::new_v4();
        let other_church = Uuid::new_v4();
        let client = Arc::new(MockBackendClient::new().with_rows(
            tables::MEMBERS,
            vec![
                json!({ "member_id": Uuid::new_v4(), "church_id": church_id, "member_name": "최은혜", "status": "active" }),
                json!({ "member_id": Uuid::new_v4(), "church_id": church_id, "member_name": "김철수", "status": "active", "phone": "010-1111-2222" }),
                json!({ "member_id": Uuid::new_v4(), "church_id": church_id, "member_name": "박영수", "status": "inactive" }),
                json!({ "member_id": Uuid::new_v4(), "church_id": other_church, "member_name": "강민지", "status": "active" }),
            ],
        ));
        let (backend, _) = mock_backend(client);
        let repo = BackendMemberRepository::new(backend);

        let names: Vec<_> = repo
            .list_active(church_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.member_name)
            .collect();
        assert_eq!(names, vec!["김철수", "최은혜"]);
        assert_eq!(repo.count_active(church_id).await.unwrap(), 2);
    }
}
