//! Record identifiers and their generator.
//!
//! Ids come from a monotonic ULID generator, so every id handed out by one
//! generator sorts strictly after the previous one and never repeats.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use ulid::Generator;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Opaque identifier of a generated record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Hands out strictly increasing record ids.
pub struct RecordIdGenerator {
    inner: Generator,
    issued: u64,
}

impl RecordIdGenerator {
    pub fn new() -> Self {
        Self {
            inner: Generator::new(),
            issued: 0,
        }
    }

    /// Next id. Fails only if more ids are requested within one millisecond
    /// than the 80-bit random component can hold.
    pub fn next_id(&mut self) -> Result<RecordId> {
        let ulid = self
            .inner
            .generate()
            .map_err(|_| CoreError::IdSpaceExhausted)?;
        self.issued += 1;
        Ok(RecordId(ulid.to_string()))
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl Default for RecordIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordIdGenerator")
            .field("issued", &self.issued)
            .finish()
    }
}
