use crate::errors::DomainResult;
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Generated codes are cut to this many characters.
pub const MAX_CODE_LENGTH: usize = 30;

/// A church-scoped lookup list row (donation types, positions, statuses).
///
/// The three catalogs share one shape but differ in table and column
/// names, so each row type carries its own table metadata.
pub trait CatalogEntry: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    /// Prefix of a generated code when the name yields none
    const CODE_PREFIX: &'static str;
    /// Human-readable catalog name used in logs and messages
    const LABEL: &'static str;
    /// Question put to the operator before a row is deleted
    const DELETE_PROMPT: &'static str;

    fn create(church_id: Uuid, name: &str, code: &str, sort_order: i32) -> Self;
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn code(&self) -> &str;
    fn is_active(&self) -> bool;

    /// `(name, code)` pairs of the standard list, in display order.
    fn default_entries() -> &'static [(&'static str, &'static str)];

    fn defaults(church_id: Uuid) -> Vec<Self> {
        Self::default_entries()
            .iter()
            .enumerate()
            .map(|(i, (name, code))| Self::create(church_id, name, code, i as i32 + 1))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationType {
    pub type_id: Uuid,
    pub church_id: Uuid,
    pub type_name: String,
    pub type_code: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub church_id: Uuid,
    pub position_name: String,
    pub position_code: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionStatus {
    pub status_id: Uuid,
    pub church_id: Uuid,
    pub status_name: String,
    pub status_code: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

const DEFAULT_DONATION_TYPES: &[(&str, &str)] = &[
    ("주정헌금", "WEEKLY_OFFERING"),
    ("감사헌금", "THANKSGIVING"),
    ("십일조", "TITHE"),
    ("선교헌금", "MISSION"),
    ("절기헌금", "SEASONAL"),
    ("건축헌금", "BUILDING"),
    ("임직헌금", "ORDINATION"),
    ("장학헌금", "SCHOLARSHIP"),
    ("주일헌금", "SUNDAY_OFFERING"),
    ("목적헌금", "PURPOSE_OFFERING"),
];

const DEFAULT_POSITIONS: &[(&str, &str)] = &[
    ("목사", "PASTOR"),
    ("부목사", "ASSOC_PASTOR"),
    ("전도사", "EVANGELIST"),
    ("장로", "ELDER"),
    ("권사", "DEACONESS"),
    ("안수집사", "ORDAINED_DEACON"),
    ("집사", "DEACON"),
    ("성도", "MEMBER"),
];

const DEFAULT_POSITION_STATUSES: &[(&str, &str)] = &[
    ("시무", "ACTIVE"),
    ("청년", "YOUNG"),
    ("은퇴", "RETIRED"),
    ("협동", "ASSOCIATE"),
    ("원로", "EMERITUS"),
    ("직원", "STAFF"),
];

impl CatalogEntry for DonationType {
    const TABLE: &'static str = crate::backend::tables::DONATION_TYPES;
    const ID_COLUMN: &'static str = "type_id";
    const CODE_PREFIX: &'static str = "TYPE_";
    const LABEL: &'static str = "donation type";
    const DELETE_PROMPT: &'static str =
        "이 헌금 종류를 삭제하시겠습니까? 관련된 헌금 기록이 있다면 삭제할 수 없습니다.";

    fn create(church_id: Uuid, name: &str, code: &str, sort_order: i32) -> Self {
        Self {
            type_id: Uuid::new_v4(),
            church_id,
            type_name: name.to_string(),
            type_code: code.to_string(),
            is_active: true,
            sort_order,
        }
    }

    fn id(&self) -> Uuid {
        self.type_id
    }

    fn name(&self) -> &str {
        &self.type_name
    }

    fn code(&self) -> &str {
        &self.type_code
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn default_entries() -> &'static [(&'static str, &'static str)] {
        DEFAULT_DONATION_TYPES
    }
}

impl CatalogEntry for Position {
    const TABLE: &'static str = crate::backend::tables::POSITIONS;
    const ID_COLUMN: &'static str = "position_id";
    const CODE_PREFIX: &'static str = "POS_";
    const LABEL: &'static str = "position";
    const DELETE_PROMPT: &'static str =
        "이 직분을 삭제하시겠습니까? 관련된 교인 정보가 있다면 삭제할 수 없습니다.";

    fn create(church_id: Uuid, name: &str, code: &str, sort_order: i32) -> Self {
        Self {
            position_id: Uuid::new_v4(),
            church_id,
            position_name: name.to_string(),
            position_code: code.to_string(),
            is_active: true,
            sort_order,
        }
    }

    fn id(&self) -> Uuid {
        self.position_id
    }

    fn name(&self) -> &str {
        &self.position_name
    }

    fn code(&self) -> &str {
        &self.position_code
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn default_entries() -> &'static [(&'static str, &'static str)] {
        DEFAULT_POSITIONS
    }
}

impl CatalogEntry for PositionStatus {
    const TABLE: &'static str = crate::backend::tables::POSITION_STATUSES;
    const ID_COLUMN: &'static str = "status_id";
    const CODE_PREFIX: &'static str = "STATUS_";
    const LABEL: &'static str = "position status";
    const DELETE_PROMPT: &'static str =
        "이 직분 상태를 삭제하시겠습니까? 관련된 교인 정보가 있다면 삭제할 수 없습니다.";

    fn create(church_id: Uuid, name: &str, code: &str, sort_order: i32) -> Self {
        Self {
            status_id: Uuid::new_v4(),
            church_id,
            status_name: name.to_string(),
            status_code: code.to_string(),
            is_active: true,
            sort_order,
        }
    }

    fn id(&self) -> Uuid {
        self.status_id
    }

    fn name(&self) -> &str {
        &self.status_name
    }

    fn code(&self) -> &str {
        &self.status_code
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn default_entries() -> &'static [(&'static str, &'static str)] {
        DEFAULT_POSITION_STATUSES
    }
}

fn hangul_regex() -> &'static Regex {
    static HANGUL_REGEX: OnceLock<Regex> = OnceLock::new();
    HANGUL_REGEX.get_or_init(|| Regex::new(r"[가-힣]").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Derive a catalog code.
///
/// An explicit code wins. Otherwise Hangul is stripped from the name,
/// whitespace runs become `_` and the rest is upper-cased; when nothing
/// usable is left the code is `prefix` plus the last six digits of
/// `now_millis`. The result is at most 30 characters.
pub fn generate_code(name: &str, explicit: Option<&str>, prefix: &str, now_millis: i64) -> String {
    let code = match explicit.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => code.to_string(),
        None => {
            let stripped = hangul_regex().replace_all(name.trim(), "");
            let joined = whitespace_regex().replace_all(stripped.trim(), "_");
            let candidate = joined.trim_matches('_').to_uppercase();
            if candidate.is_empty() {
                let digits = now_millis.abs().to_string();
                let tail = &digits[digits.len().saturating_sub(6)..];
                format!("{}{}", prefix, tail)
            } else {
                candidate
            }
        }
    };
    code.chars().take(MAX_CODE_LENGTH).collect()
}

/// Input for adding a catalog row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCatalogEntry {
    pub name: String,
    pub code: Option<String>,
}

impl Validate for NewCatalogEntry {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.clone()))
            .not_blank()
            .max_length(50)
            .validate()?;

        if let Some(code) = &self.code {
            ValidationBuilder::new("code", Some(code.clone()))
                .max_length(50)
                .validate()?;
        }
        Ok(())
    }
}

/// What happened to a delete request that needs the user's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Church profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurchInfo {
    pub church_id: Uuid,
    pub church_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub church_phone: Option<String>,
    #[serde(default)]
    pub church_address: Option<String>,
    #[serde(default)]
    pub kakao_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editable church profile fields. Blank values clear the column; a blank
/// name or email falls back to the signed-in session's values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChurchInfoUpdate {
    pub church_name: Option<String>,
    pub email: Option<String>,
    pub church_phone: Option<String>,
    pub church_address: Option<String>,
    pub kakao_id: Option<String>,
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ChurchInfoUpdate {
    pub fn church_name(&self) -> Option<String> {
        filled(&self.church_name)
    }

    pub fn email(&self) -> Option<String> {
        filled(&self.email)
    }

    pub fn church_phone(&self) -> Option<String> {
        filled(&self.church_phone)
    }

    pub fn church_address(&self) -> Option<String> {
        filled(&self.church_address)
    }

    pub fn kakao_id(&self) -> Option<String> {
        filled(&self.kakao_id)
    }
}

impl Validate for ChurchInfoUpdate {
    fn validate(&self) -> DomainResult<()> {
        if let Some(name) = self.church_name() {
            ValidationBuilder::new("church_name", Some(name))
                .max_length(100)
                .validate()?;
        }
        if let Some(email) = self.email() {
            ValidationBuilder::new("email", Some(email)).email().validate()?;
        }
        if let Some(phone) = self.church_phone() {
            ValidationBuilder::new("church_phone", Some(phone)).phone().validate()?;
        }
        if let Some(address) = self.church_address() {
            ValidationBuilder::new("church_address", Some(address))
                .max_length(200)
                .validate()?;
        }
        Ok(())
    }
}
