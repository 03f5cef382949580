//! Master-data codes referenced by value from ledger entries.
//!
//! Rooms and items are owned by the master-data collaborator. Ledger records
//! only carry their codes, so deactivating or renaming master data never
//! rewrites history.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_CODE_LEN: usize = 64;

/// Code of a room (laboratory or storage location). Partition key for stock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

/// Code of an item of equipment or material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemCode(String);

fn validate_code(kind: &str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_id(format!("{kind} cannot be empty")));
    }
    if trimmed.len() > MAX_CODE_LEN {
        return Err(DomainError::invalid_id(format!(
            "{kind} longer than {MAX_CODE_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(DomainError::invalid_id(format!(
            "{kind} cannot contain whitespace: '{trimmed}'"
        )));
    }
    Ok(trimmed.to_string())
}

macro_rules! impl_code_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
                validate_code($name, raw.as_ref()).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_code_newtype!(RoomCode, "room code");
impl_code_newtype!(ItemCode, "item code");

/// Reject a line list naming the same item twice.
pub fn ensure_distinct_items<'a>(items: impl IntoIterator<Item = &'a ItemCode>) -> Result<(), DomainError> {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(DomainError::validation(format!("item {item} listed more than once")));
        }
    }
    Ok(())
}

/// Largest quantity a single ledger line may carry.
///
/// Keeps every stock sum well inside `i64` for any realistic history.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000_000;

/// Reject a line quantity above [`MAX_LINE_QUANTITY`].
pub fn ensure_quantity_ceiling(item: &ItemCode, qty: i64) -> Result<(), DomainError> {
    if qty > MAX_LINE_QUANTITY {
        return Err(DomainError::validation(format!(
            "quantity for {item} exceeds the maximum of {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}
