use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roster entry used by donation entry screens and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: Uuid,
    pub member_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Columns loaded for the roster.
pub const MEMBER_COLUMNS: &str = "member_id,member_name,phone,address";
