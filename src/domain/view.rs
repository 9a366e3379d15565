//! Read-model projections for the presentation boundary.
//!
//! Pure functions over the reconciled record list; nothing here talks to
//! the ledger.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::record::Record;

/// How far back a record counts as "recent".
const RECENT_WINDOW_DAYS: i64 = 7;

/// Filter applied to the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFilter {
    #[default]
    All,
    Verified,
    Recent,
}

impl RecordFilter {
    fn matches(&self, record: &Record, now: DateTime<Utc>) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Verified => record.is_verified(),
            RecordFilter::Recent => {
                now.signed_duration_since(record.created_at) < Duration::days(RECENT_WINDOW_DAYS)
            }
        }
    }
}

/// Apply filter and case-insensitive search over name and description.
pub fn filter_records<'a>(
    records: &'a [Record],
    filter: RecordFilter,
    search: Option<&str>,
) -> Vec<&'a Record> {
    let now = Utc::now();
    let needle = search.map(|s| s.to_lowercase());
    records
        .iter()
        .filter(|r| match &needle {
            Some(n) => {
                r.name.to_lowercase().contains(n) || r.description.to_lowercase().contains(n)
            }
            None => true,
        })
        .filter(|r| filter.matches(r, now))
        .collect()
}

/// Aggregate stats over the reconciled record list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_records: usize,
    pub verified_records: usize,
    /// Sum of revealed amounts; sealed records contribute nothing.
    pub total_revealed: u64,
    pub recent_records: usize,
}

impl RegistryStats {
    pub fn compute(records: &[Record]) -> Self {
        let now = Utc::now();
        Self {
            total_records: records.len(),
            verified_records: records.iter().filter(|r| r.is_verified()).count(),
            total_revealed: records.iter().filter_map(|r| r.clear_value()).sum(),
            recent_records: records
                .iter()
                .filter(|r| RecordFilter::Recent.matches(r, now))
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{RecordId, SealedValue};

    fn record(name: &str, value: SealedValue, age_days: i64) -> Record {
        Record {
            id: RecordId::generate("grant"),
            name: name.to_string(),
            description: format!("{} description", name),
            public_value1: 2020,
            public_value2: 0,
            value,
            creator: "0xabc".to_string(),
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_filter_verified() {
        let records = vec![
            record("sealed", SealedValue::Sealed, 0),
            record("revealed", SealedValue::Revealed { clear_value: 100 }, 0),
        ];
        let filtered = filter_records(&records, RecordFilter::Verified, None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "revealed");
    }

    #[test]
    fn test_filter_recent_excludes_old_records() {
        let records = vec![
            record("new", SealedValue::Sealed, 1),
            record("old", SealedValue::Sealed, 30),
        ];
        let filtered = filter_records(&records, RecordFilter::Recent, None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "new");
    }

    #[test]
    fn test_search_matches_name_and_description() {
        let records = vec![
            record("Jane Doe", SealedValue::Sealed, 0),
            record("Other", SealedValue::Sealed, 0),
        ];
        let by_name = filter_records(&records, RecordFilter::All, Some("jane"));
        assert_eq!(by_name.len(), 1);
        let by_description = filter_records(&records, RecordFilter::All, Some("other description"));
        assert_eq!(by_description.len(), 1);
    }

    #[test]
    fn test_stats_sum_only_revealed() {
        let records = vec![
            record("a", SealedValue::Revealed { clear_value: 5000 }, 0),
            record("b", SealedValue::Revealed { clear_value: 250 }, 0),
            record("c", SealedValue::Sealed, 0),
        ];
        let stats = RegistryStats::compute(&records);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.verified_records, 2);
        assert_eq!(stats.total_revealed, 5250);
    }
}
