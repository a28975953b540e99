//! Debounced autosave binding between a section's local editable state and
//! the bucket store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::bucket::{BucketStore, LAST_UPDATED};
use crate::error::KitResult;

/// Deadline-based idle timer. Every `touch` pushes the deadline out again.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: i64,
    deadline: Option<i64>,
}

impl Debouncer {
    pub fn new(delay_ms: i64) -> Self {
        Self {
            delay_ms: delay_ms.max(0),
            deadline: None,
        }
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clears and returns true when the deadline has passed.
    pub fn take_due(&mut self, now_ms: i64) -> bool {
        match self.deadline {
            Some(d) if now_ms >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A section's editable state. Edits stay local; the bucket only sees them
/// when the idle timer fires or the section is flushed/unmounted.
#[derive(Debug)]
pub struct SyncedBucket<S> {
    key: &'static str,
    state: S,
    debounce: Debouncer,
}

impl<S> SyncedBucket<S>
where
    S: Serialize + DeserializeOwned + Clone,
{
    /// Start from `defaults` with the stored bucket laid over it (bucket wins).
    pub fn mount(key: &'static str, defaults: S, store: &BucketStore, delay_ms: i64) -> Self {
        let state = merge_defaults(key, defaults, store);
        Self {
            key,
            state,
            debounce: Debouncer::new(delay_ms),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Apply an edit. The idle timer restarts only when the serialized state
    /// actually changed.
    pub fn update<R>(&mut self, now_ms: i64, f: impl FnOnce(&mut S) -> R) -> R {
        let before = serde_json::to_value(&self.state).ok();
        let out = f(&mut self.state);
        let after = serde_json::to_value(&self.state).ok();
        if before != after {
            self.debounce.touch(now_ms);
        }
        out
    }

    pub fn deadline(&self) -> Option<i64> {
        self.debounce.deadline()
    }

    pub fn tick(&mut self, now_ms: i64, store: &mut BucketStore) -> KitResult<bool> {
        if !self.debounce.take_due(now_ms) {
            return Ok(false);
        }
        self.write(now_ms, store)?;
        Ok(true)
    }

    /// Write the latest state now, pending timer or not.
    pub fn flush(&mut self, now_ms: i64, store: &mut BucketStore) -> KitResult<()> {
        self.debounce.cancel();
        self.write(now_ms, store)
    }

    pub fn unmount(mut self, now_ms: i64, store: &mut BucketStore) -> KitResult<S> {
        self.flush(now_ms, store)?;
        Ok(self.state)
    }

    /// Drop pending edits without writing (reset path).
    pub fn discard(mut self) {
        self.debounce.cancel();
    }

    fn write(&self, now_ms: i64, store: &mut BucketStore) -> KitResult<()> {
        store.set_value(self.key, &self.state, now_ms)?;
        tracing::debug!(bucket = self.key, "bucket saved");
        Ok(())
    }
}

fn merge_defaults<S>(key: &str, defaults: S, store: &BucketStore) -> S
where
    S: Serialize + DeserializeOwned,
{
    let Some(existing) = store.get(key) else {
        return defaults;
    };
    let mut base = match serde_json::to_value(&defaults) {
        Ok(Value::Object(m)) => m,
        _ => return defaults,
    };
    for (k, v) in existing {
        if k == LAST_UPDATED {
            continue;
        }
        base.insert(k.clone(), v.clone());
    }
    match serde_json::from_value::<S>(Value::Object(base)) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(bucket = key, error = %e, "stored bucket does not fit; using defaults");
            defaults
        }
    }
}
