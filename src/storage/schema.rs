//! On-disk shape of the record list artifact.
//!
//! ```text
//! providers.json
//! [
//!   { "Provider": "Helping Hands", "Services": "Food pantry, rent help" },
//!   ...
//! ]
//! ```
//!
//! Keys are written capitalized; lowercase `provider` / `services` are
//! accepted when reading. Entries are validated into [`ProviderRecord`]
//! before they enter the index.

use serde::{Deserialize, Serialize};

use crate::types::ProviderRecord;

/// One entry of the persisted record list.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredProvider {
    #[serde(rename = "Provider", alias = "provider")]
    pub(crate) provider: String,

    #[serde(rename = "Services", alias = "services")]
    pub(crate) services: String,
}

impl From<&ProviderRecord> for StoredProvider {
    fn from(record: &ProviderRecord) -> Self {
        Self {
            provider: record.name().to_string(),
            services: record.services().to_string(),
        }
    }
}

/// Parses and validates a record list. `Err` carries a human-readable reason.
pub(crate) fn decode_records(bytes: &[u8]) -> Result<Vec<ProviderRecord>, String> {
    let stored: Vec<StoredProvider> = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    stored
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            ProviderRecord::new(entry.provider, entry.services)
                .map_err(|e| format!("entry {i}: {e}"))
        })
        .collect()
}

/// Serializes a record list as pretty-printed JSON.
pub(crate) fn encode_records(records: &[ProviderRecord]) -> serde_json::Result<Vec<u8>> {
    let stored: Vec<StoredProvider> = records.iter().map(StoredProvider::from).collect();
    serde_json::to_vec_pretty(&stored)
}
