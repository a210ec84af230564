//! # Employee Directory - Domain Model
//!
//! Core entities, validation rules, and per-request context shared by the
//! persistence and HTTP layers. These types are the single source of truth
//! for what an employee record looks like on the wire and in the store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned employee identifier
pub type EmployeeId = i64;

/// Upper bound on any text column (`VARCHAR(255)` in the store)
pub const MAX_FIELD_LEN: usize = 255;

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Employee entity as held by the record store.
///
/// The extended fields are optional and omitted from the JSON form when
/// absent, so a minimal record serializes as `{"id":..,"name":..,"title":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay: Option<String>,
}

impl Employee {
    /// Combine a store-assigned id with the mutable attributes
    #[must_use]
    pub fn from_attributes(id: EmployeeId, attrs: EmployeeAttributes) -> Self {
        Self {
            id,
            name: attrs.name,
            title: attrs.title,
            email: attrs.email,
            address: attrs.address,
            phone: attrs.phone,
            organization: attrs.organization,
            department: attrs.department,
            office: attrs.office,
            status: attrs.status,
            pay: attrs.pay,
        }
    }
}

/// Employee minus identifier - the body of create and update requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay: Option<String>,
}

impl EmployeeAttributes {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Trim every field and drop optional fields that are blank
    #[must_use]
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: self.name.trim().to_string(),
            title: self.title.trim().to_string(),
            email: opt(self.email),
            address: opt(self.address),
            phone: opt(self.phone),
            organization: opt(self.organization),
            department: opt(self.department),
            office: opt(self.office),
            status: opt(self.status),
            pay: opt(self.pay),
        }
    }

    /// Check the attributes against a validation profile.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::MissingField`] for a blank required field and
    /// [`DomainError::FieldTooLong`] for any value over [`MAX_FIELD_LEN`].
    pub fn validate(&self, profile: ValidationProfile) -> Result<(), DomainError> {
        for (field, value) in [("name", &self.name), ("title", &self.title)] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(field));
            }
        }

        for (field, value) in self.extended_fields() {
            match value {
                Some(v) if v.trim().is_empty() && profile == ValidationProfile::Extended => {
                    return Err(DomainError::MissingField(field));
                }
                None if profile == ValidationProfile::Extended => {
                    return Err(DomainError::MissingField(field));
                }
                _ => {}
            }
        }

        let all = [("name", Some(&self.name)), ("title", Some(&self.title))]
            .into_iter()
            .chain(self.extended_fields());
        for (field, value) in all {
            if let Some(v) = value {
                if v.chars().count() > MAX_FIELD_LEN {
                    return Err(DomainError::FieldTooLong {
                        field,
                        max: MAX_FIELD_LEN,
                    });
                }
            }
        }

        Ok(())
    }

    fn extended_fields(&self) -> [(&'static str, Option<&String>); 8] {
        [
            ("email", self.email.as_ref()),
            ("address", self.address.as_ref()),
            ("phone", self.phone.as_ref()),
            ("organization", self.organization.as_ref()),
            ("department", self.department.as_ref()),
            ("office", self.office.as_ref()),
            ("status", self.status.as_ref()),
            ("pay", self.pay.as_ref()),
        ]
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Which form of the employee record is accepted on writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationProfile {
    /// Only name and title are required
    #[default]
    Minimal,
    /// Every extended field is required as well
    Extended,
}

impl ValidationProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Extended => "extended",
        }
    }
}

impl std::str::FromStr for ValidationProfile {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "extended" => Ok(Self::Extended),
            other => Err(DomainError::UnknownProfile(other.to_string())),
        }
    }
}

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// Per-request values threaded explicitly through every service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Context with a freshly generated request id
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().simple().to_string())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Unknown validation profile: {0}")]
    UnknownProfile(String),
}
