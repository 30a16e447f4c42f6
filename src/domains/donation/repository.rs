use crate::backend::{rows_into, tables, to_row, Backend, Filter};
use crate::domains::donation::types::{
    DonationFilter, DonationRecord, NewDonation, STATUS_ACTIVE,
};
use crate::errors::{DomainError, DomainResult};
use crate::validation::Validate;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Trait defining donation repository operations
#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// Active donations matching the filter, newest first
    async fn find_by_filter(&self, filter: &DonationFilter) -> DomainResult<Vec<DonationRecord>>;

    /// The `limit` most recent donations of a church
    async fn find_recent(&self, church_id: Uuid, limit: usize) -> DomainResult<Vec<DonationRecord>>;

    async fn create(&self, new_donation: &NewDonation) -> DomainResult<DonationRecord>;

    async fn delete(&self, church_id: Uuid, id: Uuid) -> DomainResult<()>;
}

/// Donation repository backed by the hosted database
pub struct BackendDonationRepository {
    backend: Arc<Backend>,
}

impl BackendDonationRepository {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    fn entity_name(&self) -> &'static str {
        "donation"
    }
}

#[async_trait]
impl DonationRepository for BackendDonationRepository {
    async fn find_by_filter(&self, filter: &DonationFilter) -> DomainResult<Vec<DonationRecord>> {
        let rows = self.backend.client().select(&filter.to_query()).await?;
        debug!("Loaded {} donations for church {}", rows.len(), filter.church_id);
        Ok(rows_into(rows)?)
    }

    async fn find_recent(&self, church_id: Uuid, limit: usize) -> DomainResult<Vec<DonationRecord>> {
        let query = DonationFilter::for_church(church_id).to_query().limit(limit);
        let rows = self.backend.client().select(&query).await?;
        Ok(rows_into(rows)?)
    }

    async fn create(&self, new_donation: &NewDonation) -> DomainResult<DonationRecord> {
        new_donation.validate()?;

        let mut row = to_row(new_donation)?;
        if let Value::Object(fields) = &mut row {
            fields.insert("donation_id".into(), Value::String(Uuid::new_v4().to_string()));
            fields.insert("status".into(), Value::String(STATUS_ACTIVE.to_string()));
            fields.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
        }

        let stored = self.backend.client().insert(tables::DONATIONS, row).await?;
        let record = rows_into::<DonationRecord>(stored)?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Internal("Insert returned no donation row".to_string()))?;
        debug!("Recorded donation {} ({})", record.id, record.amount);
        Ok(record)
    }

    async fn delete(&self, church_id: Uuid, id: Uuid) -> DomainResult<()> {
        let filters = [Filter::eq("church_id", church_id), Filter::eq("donation_id", id)];
        let removed = self.backend.client().delete(tables::DONATIONS, &filters).await?;
        if removed.is_empty() {
            return Err(DomainError::EntityNotFound(self.entity_name().to_string(), id));
        }
        Ok(())
    }
}
