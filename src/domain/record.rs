//! Record model for the confidential donation registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque record identifier, generated client-side at creation time.
///
/// Ids use a random suffix rather than a timestamp so that uniqueness does
/// not depend on creation rate or clock resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generate a fresh id with the given prefix, e.g. `grant-1f8a9c2b04de`.
    pub fn generate(prefix: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", prefix, &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 32-byte on-ledger reference to an encrypted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// The confidential part of a record.
///
/// A record is either still sealed on the ledger or fully revealed; there
/// is no partial state in between, so the two arms carry everything each
/// state is allowed to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SealedValue {
    /// Ciphertext handle unresolved; the clear value is unknown locally.
    Sealed,
    /// Ledger-attested clear value after a verified decryption proof.
    Revealed { clear_value: u64 },
}

impl SealedValue {
    pub fn is_verified(&self) -> bool {
        matches!(self, SealedValue::Revealed { .. })
    }

    pub fn clear_value(&self) -> Option<u64> {
        match self {
            SealedValue::Sealed => None,
            SealedValue::Revealed { clear_value } => Some(*clear_value),
        }
    }
}

/// A registry record as reconciled from ledger truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub public_value1: u32,
    pub public_value2: u32,
    pub value: SealedValue,
    /// 0x-hex account that created the record; immutable.
    pub creator: String,
    /// Ledger-assigned creation time; immutable.
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn is_verified(&self) -> bool {
        self.value.is_verified()
    }

    pub fn clear_value(&self) -> Option<u64> {
        self.value.clear_value()
    }
}

/// Client-side input for a new record, before encryption.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordDraft {
    pub name: String,
    pub description: String,
    /// The confidential amount; encrypted before it ever leaves the client.
    pub amount: u64,
    pub public_value1: u32,
    pub public_value2: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RecordId::generate("grant");
        let b = RecordId::generate("grant");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("grant-"));
        assert_eq!(a.as_str().len(), "grant-".len() + 12);
    }

    #[test]
    fn test_sealed_value_states_are_exclusive() {
        let sealed = SealedValue::Sealed;
        assert!(!sealed.is_verified());
        assert_eq!(sealed.clear_value(), None);

        let revealed = SealedValue::Revealed { clear_value: 5000 };
        assert!(revealed.is_verified());
        assert_eq!(revealed.clear_value(), Some(5000));
    }

    #[test]
    fn test_handle_display_is_hex() {
        let handle = CiphertextHandle([0xab; 32]);
        let s = handle.to_string();
        assert!(s.starts_with("0xabab"));
        assert_eq!(s.len(), 2 + 64);
    }
}
