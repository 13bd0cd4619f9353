//! Candidate record model
//!
//! A candidate is one job applicant as entered through the intake form.
//! Field values are kept exactly as typed; validation never rewrites them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Form-shaped candidate fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Chilean RUT in `DIGITS-CHECKDIGIT` form
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    /// Free-form; only required to be non-empty
    #[serde(default)]
    pub phone: String,
    /// Role applied for
    #[serde(default)]
    pub position: String,
}

impl Candidate {
    /// Value of a single field
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::NationalId => &self.national_id,
            Field::FullName => &self.full_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::Position => &self.position,
        }
    }
}

/// Names of the candidate fields, in form order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    NationalId,
    FullName,
    Email,
    Phone,
    Position,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::NationalId,
        Field::FullName,
        Field::Email,
        Field::Phone,
        Field::Position,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::NationalId => "national_id",
            Field::FullName => "full_name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Position => "position",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every field that failed validation, reported together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvalidFields(BTreeSet<Field>);

impl InvalidFields {
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Field> for InvalidFields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for InvalidFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Field::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Store-assigned identifier of a persisted candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Fresh random (v4) identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::InvalidInput(format!("invalid record id '{}': {}", s, e)))
    }
}

/// One entry of a collection snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub candidate: Candidate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
