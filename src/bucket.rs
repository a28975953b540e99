//! In-memory bucket store. One bucket per section, each a JSON object stamped
//! with `lastUpdated`. The store performs no I/O.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const LAST_UPDATED: &str = "lastUpdated";

pub type Bucket = Map<String, Value>;

#[derive(Debug, Default, Clone)]
pub struct BucketStore {
    buckets: BTreeMap<String, Bucket>,
    dirty: bool,
    revision: u64,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_buckets(buckets: BTreeMap<String, Bucket>) -> Self {
        Self {
            buckets,
            dirty: false,
            revision: 0,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    /// Shallow-merge `fields` into the bucket and stamp `lastUpdated`.
    pub fn set(&mut self, name: &str, fields: Bucket, now_ms: i64) {
        let bucket = self.buckets.entry(name.to_string()).or_default();
        let mut changed = false;
        for (k, v) in fields {
            if k == LAST_UPDATED {
                continue;
            }
            if bucket.get(&k) != Some(&v) {
                changed = true;
                bucket.insert(k, v);
            }
        }
        bucket.insert(LAST_UPDATED.to_string(), Value::from(now_ms));
        self.dirty = true;
        // Revision tracks content only; a re-stamp of identical fields keeps it.
        if changed {
            self.revision += 1;
        }
    }

    /// Serialize `value` (which must serialize to an object) and merge it in.
    pub fn set_value<T: Serialize>(
        &mut self,
        name: &str,
        value: &T,
        now_ms: i64,
    ) -> Result<(), serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => {
                self.set(name, fields, now_ms);
                Ok(())
            }
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                self.set(name, fields, now_ms);
                Ok(())
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn buckets(&self) -> &BTreeMap<String, Bucket> {
        &self.buckets
    }

    /// Bucket contents without `lastUpdated`, for equality-relevant views.
    pub fn content(&self) -> BTreeMap<String, Bucket> {
        self.buckets
            .iter()
            .map(|(name, bucket)| {
                let mut b = bucket.clone();
                b.remove(LAST_UPDATED);
                (name.clone(), b)
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.dirty = true;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Bucket {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn set_merges_shallowly_and_stamps() {
        let mut store = BucketStore::new();
        store.set("welcome", obj(json!({ "a": 1, "b": { "x": 1 } })), 10);
        store.set("welcome", obj(json!({ "b": { "y": 2 } })), 20);

        let b = store.get("welcome").unwrap();
        assert_eq!(b.get("a"), Some(&json!(1)));
        assert_eq!(b.get("b"), Some(&json!({ "y": 2 })));
        assert_eq!(b.get(LAST_UPDATED), Some(&json!(20)));
        assert!(store.is_dirty());
    }

    #[test]
    fn restamp_without_change_keeps_revision() {
        let mut store = BucketStore::new();
        store.set("analyze", obj(json!({ "a": true })), 1);
        let rev = store.revision();
        store.set("analyze", obj(json!({ "a": true })), 2);
        assert_eq!(store.revision(), rev);
        store.set("analyze", obj(json!({ "a": false })), 3);
        assert_eq!(store.revision(), rev + 1);
    }

    #[test]
    fn content_strips_timestamps() {
        let mut store = BucketStore::new();
        store.set("propose", obj(json!({ "solutions": [] })), 99);
        let content = store.content();
        assert_eq!(content["propose"], obj(json!({ "solutions": [] })));
    }
}
