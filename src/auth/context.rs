use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::errors::ServiceError;

/// The logged-in church for the current operation.
///
/// Every backend query is scoped by `church_id`; the session is handed to
/// services explicitly rather than read from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurchSession {
    /// Tenant key used on every table
    pub church_id: Uuid,

    /// Display name printed on receipts
    pub church_name: String,

    /// Contact e-mail of the church office
    pub email: String,
}

impl ChurchSession {
    pub fn new(church_id: Uuid, church_name: &str, email: &str) -> Self {
        Self {
            church_id,
            church_name: church_name.to_string(),
            email: email.to_string(),
        }
    }

    /// Verify a row belongs to this session's church before touching it
    pub fn authorize_church(&self, row_church_id: &Uuid) -> Result<(), ServiceError> {
        if &self.church_id == row_church_id {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(
                "Record belongs to a different church".to_string()
            ))
        }
    }
}
