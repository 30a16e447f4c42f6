use crate::backend::{tables, SelectQuery};
use crate::errors::{DomainResult, ValidationError};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used when a donation has neither a member nor a donor name.
pub const ANONYMOUS_DONOR: &str = "익명";

/// Label used when a donation's type cannot be resolved.
pub const UNKNOWN_DONATION_TYPE: &str = "기타";

pub const STATUS_ACTIVE: &str = "active";

/// Projection used for every donation read: the row plus the joined member
/// contact fields and donation type name.
pub const DONATION_COLUMNS: &str =
    "*,members(member_name,phone,address),donation_types(type_name)";

/// Member fields embedded in a donation row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberRef {
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Donation type fields embedded in a donation row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonationTypeRef {
    #[serde(default)]
    pub type_name: Option<String>,
}

/// One donation as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRecord {
    #[serde(rename = "donation_id")]
    pub id: Uuid,
    pub church_id: Uuid,
    #[serde(default)]
    pub member_id: Option<Uuid>,
    #[serde(default)]
    pub donor_name: Option<String>,
    pub amount: Decimal,
    pub donation_date: NaiveDate,
    #[serde(default)]
    pub donation_type_id: Option<Uuid>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "members", skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberRef>,
    #[serde(default, rename = "donation_types", skip_serializing_if = "Option::is_none")]
    pub donation_type: Option<DonationTypeRef>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.as_str()).filter(|s| !s.trim().is_empty())
}

impl DonationRecord {
    /// Grouping key for per-donor views: the member id, else the free-text
    /// donor name, else the anonymous label.
    pub fn donor_key(&self) -> String {
        if let Some(member_id) = self.member_id {
            return member_id.to_string();
        }
        non_empty(self.donor_name.as_ref())
            .unwrap_or(ANONYMOUS_DONOR)
            .to_string()
    }

    /// Name shown for the donor: the joined member name, else the donor
    /// name, else the anonymous label.
    pub fn display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(|m| non_empty(m.member_name.as_ref()))
            .or_else(|| non_empty(self.donor_name.as_ref()))
            .unwrap_or(ANONYMOUS_DONOR)
    }

    pub fn type_name(&self) -> &str {
        self.donation_type
            .as_ref()
            .and_then(|t| non_empty(t.type_name.as_ref()))
            .unwrap_or(UNKNOWN_DONATION_TYPE)
    }

    pub fn phone(&self) -> Option<&str> {
        self.member.as_ref().and_then(|m| non_empty(m.phone.as_ref()))
    }

    pub fn address(&self) -> Option<&str> {
        self.member.as_ref().and_then(|m| non_empty(m.address.as_ref()))
    }
}

/// Payload for recording a donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDonation {
    pub church_id: Uuid,
    pub member_id: Option<Uuid>,
    pub donor_name: Option<String>,
    pub amount: Decimal,
    pub donation_date: NaiveDate,
    pub donation_type_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl Validate for NewDonation {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("church_id", Some(self.church_id))
            .not_nil()
            .validate()?;

        ValidationBuilder::new("amount", Some(self.amount))
            .positive()
            .validate()?;

        if let Some(name) = &self.donor_name {
            ValidationBuilder::new("donor_name", Some(name.clone()))
                .max_length(100)
                .validate()?;
        }

        if let Some(method) = &self.payment_method {
            ValidationBuilder::new("payment_method", Some(method.clone()))
                .not_blank()
                .max_length(30)
                .validate()?;
        }

        if let Some(notes) = &self.notes {
            ValidationBuilder::new("notes", Some(notes.clone()))
                .max_length(500)
                .validate()?;
        }

        if self.member_id == Some(Uuid::nil()) {
            return Err(ValidationError::invalid_value("member_id", "cannot be a nil UUID").into());
        }

        Ok(())
    }
}

/// Which donations to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationFilter {
    pub church_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub member_id: Option<Uuid>,
    pub donation_type_id: Option<Uuid>,
}

impl DonationFilter {
    pub fn for_church(church_id: Uuid) -> Self {
        Self {
            church_id,
            start_date: None,
            end_date: None,
            member_id: None,
            donation_type_id: None,
        }
    }

    /// Inclusive date window.
    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn on(self, date: NaiveDate) -> Self {
        self.between(date, date)
    }

    pub fn member(mut self, member_id: Uuid) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn donation_type(mut self, donation_type_id: Uuid) -> Self {
        self.donation_type_id = Some(donation_type_id);
        self
    }

    /// Active donations of the church, newest first.
    pub fn to_query(&self) -> SelectQuery {
        let mut query = SelectQuery::new(tables::DONATIONS)
            .columns(DONATION_COLUMNS)
            .eq("church_id", self.church_id)
            .eq("status", STATUS_ACTIVE);

        if let Some(start) = self.start_date {
            query = query.gte("donation_date", start);
        }
        if let Some(end) = self.end_date {
            query = query.lte("donation_date", end);
        }
        if let Some(member_id) = self.member_id {
            query = query.eq("member_id", member_id);
        }
        if let Some(type_id) = self.donation_type_id {
            query = query.eq("donation_type_id", type_id);
        }

        query
            .order("donation_date", false)
            .order("created_at", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decode_joined_row() {
        let record: DonationRecord = serde_json::from_value(json!({
            "donation_id": "4f0b7c8e-3c1f-4d5a-9a0e-1b2c3d4e5f60",
            "church_id": "0b8f6a5e-2d1c-4b3a-8f7e-6d5c4b3a2f10",
            "member_id": null,
            "donor_name": "홍길동",
            "amount": 50000,
            "donation_date": "2025-03-02",
            "donation_type_id": null,
            "payment_method": "현금",
            "notes": null,
            "created_at": "2025-03-02T02:10:00Z",
            "status": "active",
            "members": null,
            "donation_types": { "type_name": "감사헌금" }
        }))
        .unwrap();

        assert_eq!(record.amount, dec!(50000));
        assert_eq!(record.donor_key(), "홍길동");
        assert_eq!(record.display_name(), "홍길동");
        assert_eq!(record.type_name(), "감사헌금");
        assert_eq!(record.phone(), None);
    }

    #[test]
    fn test_fallback_labels() {
        let record: DonationRecord = serde_json::from_value(json!({
            "donation_id": "4f0b7c8e-3c1f-4d5a-9a0e-1b2c3d4e5f60",
            "church_id": "0b8f6a5e-2d1c-4b3a-8f7e-6d5c4b3a2f10",
            "donor_name": "",
            "amount": "1000",
            "donation_date": "2025-03-02"
        }))
        .unwrap();

        assert_eq!(record.donor_key(), ANONYMOUS_DONOR);
        assert_eq!(record.display_name(), ANONYMOUS_DONOR);
        assert_eq!(record.type_name(), UNKNOWN_DONATION_TYPE);
    }

    #[test]
    fn test_new_donation_validation() {
        let mut donation = NewDonation {
            church_id: Uuid::new_v4(),
            member_id: None,
            donor_name: None,
            amount: dec!(10000),
            donation_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            donation_type_id: None,
            payment_method: Some("계좌이체".to_string()),
            notes: None,
        };
        assert!(donation.validate().is_ok());

        donation.amount = Decimal::ZERO;
        assert!(donation.validate().is_err());

        donation.amount = dec!(10000);
        donation.church_id = Uuid::nil();
        assert!(donation.validate().is_err());
    }

    #[test]
    fn test_filter_renders_window() {
        let church_id = Uuid::new_v4();
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let query = DonationFilter::for_church(church_id).between(start, end).to_query();

        let rendered = query.to_query_string();
        assert!(rendered.contains(&format!("church_id=eq.{}", church_id)));
        assert!(rendered.contains("status=eq.active"));
        assert!(rendered.contains("donation_date=gte.2025-01-01"));
        assert!(rendered.contains("donation_date=lte.2025-01-31"));
        assert!(rendered.contains("order=donation_date.desc,created_at.desc"));
    }
}
