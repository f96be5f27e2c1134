//! Single-use transaction id ledger.
//!
//! A transaction id is admitted at most once for the lifetime of the ledger.
//! Checks run on the trimmed value in a fixed order:
//!
//! 1. empty
//! 2. embedded whitespace
//! 3. shorter than [`MIN_TRANSACTION_ID_LEN`]
//! 4. longer than [`MAX_TRANSACTION_ID_LEN`]
//! 5. characters outside `[A-Za-z0-9_-]`
//! 6. already admitted
//!
//! Whitespace runs ahead of the length checks so that any id containing a
//! space is reported as such, whatever its length.
//!
//! Steps 1-5 are pure; step 6 and the insert happen under one lock, so two
//! concurrent callers presenting the same id can never both be admitted.
//!
//! Entries are never evicted. Memory grows with the number of distinct ids
//! admitted since process start.

use crate::domain::error::AdmissionError;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub const MIN_TRANSACTION_ID_LEN: usize = 8;
pub const MAX_TRANSACTION_ID_LEN: usize = 100;

/// A normalized transaction id that has been admitted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AdmittedId(String);

impl AdmittedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AdmittedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AdmittedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Run the stateless checks and return the trimmed id.
pub fn normalize(raw: &str) -> Result<&str, AdmissionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AdmissionError::Empty);
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(AdmissionError::ContainsWhitespace);
    }

    let len = trimmed.chars().count();
    if len < MIN_TRANSACTION_ID_LEN {
        return Err(AdmissionError::TooShort);
    }
    if len > MAX_TRANSACTION_ID_LEN {
        return Err(AdmissionError::TooLong);
    }
    if !trimmed.chars().all(is_id_char) {
        return Err(AdmissionError::InvalidCharset);
    }

    Ok(trimmed)
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Process-lifetime set of consumed transaction ids.
#[derive(Debug, Default)]
pub struct TransactionLedger {
    used: Mutex<HashSet<String>>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `raw` and mark it consumed.
    ///
    /// Nothing is recorded when an error is returned.
    pub fn validate_and_admit(&self, raw: &str) -> Result<AdmittedId, AdmissionError> {
        let id = normalize(raw)?;

        // insert() reports presence and records the id in one step
        if !self.used.lock().insert(id.to_owned()) {
            return Err(AdmissionError::AlreadyUsed);
        }

        Ok(AdmittedId(id.to_owned()))
    }

    /// Whether the trimmed form of `raw` has already been admitted.
    pub fn contains(&self, raw: &str) -> bool {
        self.used.lock().contains(raw.trim())
    }

    /// Number of admitted ids.
    pub fn len(&self) -> usize {
        self.used.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.lock().is_empty()
    }
}
