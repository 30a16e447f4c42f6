use crate::errors::{DomainError, DomainResult, ValidationError};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use uuid::Uuid;

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Common regex patterns
fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

// Korean numbers are usually written with dashes (010-1234-5678)
fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| Regex::new(r"^\+?[0-9][0-9-]{7,15}$").unwrap())
}

fn year_month_regex() -> &'static Regex {
    static YEAR_MONTH_REGEX: OnceLock<Regex> = OnceLock::new();
    YEAR_MONTH_REGEX.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap())
}

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(DomainError::Validation(first)),
        }
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    /// Rejects values that are empty once trimmed.
    pub fn not_blank(mut self) -> Self {
        match &self.value {
            Some(value) if !value.trim().is_empty() => {}
            _ => self.errors.push(ValidationError::required(&self.field_name)),
        }
        self
    }

    // Lengths are counted in characters so Hangul names are not penalised.
    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.chars().count() > max {
                self.errors.push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn email(self) -> Self {
        self.matches_pattern(email_regex(), "must be a valid email address")
    }

    pub fn phone(self) -> Self {
        self.matches_pattern(phone_regex(), "must be a valid phone number")
    }

    pub fn year_month(self) -> Self {
        self.matches_pattern(year_month_regex(), "must be in YYYY-MM format")
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where T: PartialOrd + Clone + std::fmt::Display
{
    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min || value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    max.to_string()
                ));
            }
        }
        self
    }
}

impl ValidationBuilder<Decimal> {
    pub fn positive(mut self) -> Self {
        if let Some(value) = &self.value {
            if *value <= Decimal::ZERO {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    "must be greater than zero"
                ));
            }
        }
        self
    }
}

impl ValidationBuilder<Uuid> {
    pub fn not_nil(mut self) -> Self {
        if let Some(value) = &self.value {
            if *value == Uuid::nil() {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    "cannot be a nil UUID"
                ));
            }
        }
        self
    }
}

impl ValidationBuilder<NaiveDate> {
    pub fn not_after(mut self, limit: NaiveDate) -> Self {
        if let Some(value) = &self.value {
            if *value > limit {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    &format!("must not be after {}", limit)
                ));
            }
        }
        self
    }
}

/// Parse a `YYYY-MM` selector into `(year, month)`.
pub fn parse_year_month(value: &str, field_name: &str) -> DomainResult<(i32, u32)> {
    ValidationBuilder::new(field_name, Some(value.to_string()))
        .year_month()
        .validate()?;
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| ValidationError::format(field_name, "must be in YYYY-MM format"))?;
    let year = year
        .parse::<i32>()
        .map_err(|_| ValidationError::format(field_name, "year is not a number"))?;
    let month = month
        .parse::<u32>()
        .map_err(|_| ValidationError::format(field_name, "month is not a number"))?;
    Ok((year, month))
}
