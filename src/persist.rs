//! Root persisted document and the debounced writer that puts it in storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::autosave::Debouncer;
use crate::bucket::Bucket;
use crate::migrate::CURRENT_VERSION;
use crate::sections::analyze::ObservationFlags;
use crate::sections::apply_design::DesignSummaries;
use crate::storage::Storage;

/// Identity-adjacent and summary fields kept at the top level so that
/// documents written before buckets existed still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyFields {
    pub student_name: String,
    pub class_section: String,
    pub identity_locked: bool,
    pub solutions: Vec<String>,
    #[serde(flatten)]
    pub summaries: DesignSummaries,
    #[serde(flatten)]
    pub observations: ObservationFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDocument {
    pub version: u32,
    pub buckets: BTreeMap<String, Bucket>,
    #[serde(flatten)]
    pub legacy: LegacyFields,
    pub session_salt: String,
}

impl Default for RootDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            buckets: BTreeMap::new(),
            legacy: LegacyFields::default(),
            session_salt: String::new(),
        }
    }
}

impl RootDocument {
    /// Build from an already migrated map. Fields that do not fit their type
    /// fall back to defaults one at a time instead of discarding the document.
    pub fn from_migrated(mut doc: Map<String, Value>) -> Self {
        let buckets = match doc.remove("buckets") {
            Some(Value::Object(b)) => b
                .into_iter()
                .filter_map(|(name, v)| match v {
                    Value::Object(bucket) => Some((name, bucket)),
                    _ => {
                        tracing::warn!(bucket = %name, "dropping non-object bucket");
                        None
                    }
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        let session_salt = doc
            .remove("sessionSalt")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let version = doc
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(CURRENT_VERSION);
        let legacy = match serde_json::from_value::<LegacyFields>(Value::Object(doc)) {
            Ok(legacy) => legacy,
            Err(e) => {
                tracing::warn!(error = %e, "top-level fields malformed; using defaults");
                LegacyFields::default()
            }
        };
        Self {
            version,
            buckets,
            legacy,
            session_salt,
        }
    }
}

/// Single writer of the durable key. Every mutation schedules a write; the
/// write happens once the deadline passes or on an explicit flush.
#[derive(Debug)]
pub struct Persister {
    key: String,
    legacy_keys: Vec<String>,
    debounce: Debouncer,
}

impl Persister {
    pub fn new(key: String, legacy_keys: Vec<String>, delay_ms: i64) -> Self {
        Self {
            key,
            legacy_keys,
            debounce: Debouncer::new(delay_ms),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schedule(&mut self, now_ms: i64) {
        self.debounce.touch(now_ms);
    }

    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    pub fn deadline(&self) -> Option<i64> {
        self.debounce.deadline()
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn take_due(&mut self, now_ms: i64) -> bool {
        self.debounce.take_due(now_ms)
    }

    pub fn write(&mut self, storage: &mut dyn Storage, doc: &RootDocument) -> anyhow::Result<()> {
        self.debounce.cancel();
        let raw = serde_json::to_string(doc)?;
        storage.set_item(&self.key, &raw)?;
        tracing::debug!(key = %self.key, bytes = raw.len(), "document persisted");
        Ok(())
    }

    /// Remove the current key and every legacy key.
    pub fn clear_all(&mut self, storage: &mut dyn Storage) -> anyhow::Result<()> {
        self.debounce.cancel();
        storage.remove_item(&self.key)?;
        for key in &self.legacy_keys {
            storage.remove_item(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn legacy_fields_use_stored_names() {
        let mut doc = RootDocument::default();
        doc.legacy.student_name = "Jane Doe".into();
        doc.legacy.summaries.attendee_pk = "AttendeeID".into();
        doc.legacy.observations.obs_no_ids = true;
        doc.session_salt = "k3x9".into();
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["studentName"], "Jane Doe");
        assert_eq!(v["attendeePK"], "AttendeeID");
        assert_eq!(v["obsNoIDs"], true);
        assert_eq!(v["sessionSalt"], "k3x9");
        assert_eq!(v["version"], CURRENT_VERSION);
    }

    #[test]
    fn from_migrated_tolerates_bad_fields() {
        let raw = json!({
            "version": 3,
            "buckets": { "welcome": { "studentName": "Jane Doe" }, "junk": 4 },
            "identityLocked": "yes",
            "sessionSalt": "abc"
        });
        let doc = RootDocument::from_migrated(raw.as_object().cloned().unwrap());
        assert!(doc.buckets.contains_key("welcome"));
        assert!(!doc.buckets.contains_key("junk"));
        assert_eq!(doc.session_salt, "abc");
        assert_eq!(doc.legacy, LegacyFields::default());
    }

    #[test]
    fn persister_writes_only_when_due() {
        let mut storage = MemoryStorage::new();
        let mut p = Persister::new("k_v3".into(), vec!["k_v2".into()], 400);
        p.schedule(1_000);
        assert!(!p.take_due(1_399));
        assert!(p.take_due(1_400));
        p.write(&mut storage, &RootDocument::default()).unwrap();
        assert!(storage.get_item("k_v3").unwrap().is_some());

        storage.set_item("k_v2", "{}").unwrap();
        p.schedule(2_000);
        p.clear_all(&mut storage).unwrap();
        assert!(!p.is_pending());
        assert!(storage.is_empty());
    }
}
