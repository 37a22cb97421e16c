//! Per-entry metadata hooks for archive imports.
//!
//! After an archive entry is extracted, the import builds a [`NewFile`] with default
//! metadata and, when manifest support is on, passes it through a [`MetadataEnricher`]
//! before the record is stored. Enrichers must not fail the import; they log and leave
//! the record untouched when they have nothing useful to add.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::features::files::models::NewFile;

/// Adjusts a new record built from an archive entry before it is stored
pub trait MetadataEnricher: Send + Sync {
    fn enrich(&self, entry_name: &str, record: &mut NewFile);
}

/// `recorded_at` in a manifest: RFC 3339 text or unix seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestTimestamp {
    Text(String),
    Unix(f64),
}

impl ManifestTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Unix(secs) => Utc.timestamp_opt(*secs as i64, 0).single(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestEntry {
    pub uuid: Option<String>,
    pub recorded_at: Option<ManifestTimestamp>,
    pub duration: Option<f64>,
}

/// Contents of `manifest.json`, keyed by archive entry name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub entries: HashMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Applies `uuid`, `recorded_at` and `duration` from an archive's manifest
pub struct ManifestEnricher {
    manifest: Manifest,
}

impl ManifestEnricher {
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }
}

impl MetadataEnricher for ManifestEnricher {
    fn enrich(&self, entry_name: &str, record: &mut NewFile) {
        let Some(data) = self.manifest.entries.get(entry_name) else {
            return;
        };

        if let Some(uuid) = data.uuid.as_ref().filter(|u| !u.is_empty()) {
            record.uuid = uuid.clone();
        }

        if let Some(ts) = &data.recorded_at {
            match ts.to_datetime() {
                Some(recorded_at) => record.recorded_at = recorded_at,
                None => warn!(
                    "Ignoring invalid recorded_at in manifest for {}: {:?}",
                    entry_name, ts
                ),
            }
        }

        if let Some(duration) = data.duration.filter(|d| d.is_finite() && *d >= 0.0) {
            record.duration = duration as i64;
        }
    }
}
