//! Request/response DTOs for the REST boundary.

use serde::{Deserialize, Serialize};

use crate::domain::{Record, RecordFilter, RegistryStats, StatusNotice};

/// Read model of a record as exposed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public_value1: u32,
    pub public_value2: u32,
    pub is_verified: bool,
    /// Present only once the ledger attests the clear value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_value: Option<u64>,
    pub creator: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        Self {
            id: record.id.to_string(),
            is_verified: record.is_verified(),
            clear_value: record.clear_value(),
            name: record.name,
            description: record.description,
            public_value1: record.public_value1,
            public_value2: record.public_value2,
            creator: record.creator,
            created_at: record.created_at,
        }
    }
}

/// Query parameters for the record list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsQuery {
    #[serde(default)]
    pub filter: RecordFilter,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRecordsResponse {
    pub records: Vec<RecordResponse>,
    pub stats: RegistryStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub id: String,
    pub clear_value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Currently displayed notice, if any.
    pub notice: Option<StatusNotice>,
    pub creating: bool,
    pub decrypting: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecordId, SealedValue};

    #[test]
    fn test_sealed_record_hides_clear_value() {
        let record = Record {
            id: RecordId::from("grant-1"),
            name: "Jane Doe".to_string(),
            description: "CS grad".to_string(),
            public_value1: 2020,
            public_value2: 0,
            value: SealedValue::Sealed,
            creator: "0xabc".to_string(),
            created_at: chrono::Utc::now(),
        };
        let response = RecordResponse::from(record);
        assert!(!response.is_verified);
        assert_eq!(response.clear_value, None);

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("clear_value"));
    }

    #[test]
    fn test_revealed_record_exposes_clear_value() {
        let record = Record {
            id: RecordId::from("grant-1"),
            name: "Jane Doe".to_string(),
            description: "CS grad".to_string(),
            public_value1: 2020,
            public_value2: 0,
            value: SealedValue::Revealed { clear_value: 5000 },
            creator: "0xabc".to_string(),
            created_at: chrono::Utc::now(),
        };
        let response = RecordResponse::from(record);
        assert!(response.is_verified);
        assert_eq!(response.clear_value, Some(5000));
    }
}
