//! Records flowing through the pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Numeric identifier of a person on the remote API
pub type PersonId = i64;

/// Fields every stored person must carry, in storage order
pub const REQUIRED_FIELDS: [&str; 13] = [
    "birth_year",
    "eye_color",
    "films",
    "gender",
    "hair_color",
    "height",
    "homeworld",
    "mass",
    "name",
    "skin_color",
    "species",
    "starships",
    "vehicles",
];

/// Marker the API sends in place of a missing record
pub const NOT_FOUND_DETAIL: &str = "Not found";

/// Outcome of fetching one identifier
#[derive(Debug, Clone, PartialEq)]
pub enum RawFetchResult {
    /// The API returned an object for this identifier
    Record(Map<String, Value>),
    /// The API reported the identifier as absent
    NotFound,
}

impl RawFetchResult {
    /// Classify a decoded response body
    ///
    /// `{"detail": "Not found"}` is the API's absence marker; any other
    /// object is passed on for validation.
    pub fn from_body(body: Map<String, Value>) -> Self {
        match body.get("detail").and_then(Value::as_str) {
            Some(NOT_FOUND_DETAIL) => Self::NotFound,
            _ => Self::Record(body),
        }
    }
}

/// A validated person ready for the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,

    /// `id` plus every required field, nothing else
    pub payload: Value,
}

/// Why a fetched record was dropped instead of stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotFound { id: PersonId },
    MissingFields { id: PersonId, fields: Vec<&'static str> },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotFound { id } => write!(f, "no record exists for id {}", id),
            Rejection::MissingFields { id, fields } => {
                write!(f, "record {} is missing field(s): {}", id, fields.join(", "))
            },
        }
    }
}

/// Result of one background persistence unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveReport {
    pub wave: usize,
    pub inserted: u64,
    pub rejected: usize,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub waves: usize,
    pub fetched: usize,
    pub inserted: u64,
    pub rejected: usize,
}
