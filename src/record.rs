//! Record compiler: one denormalized, export-ready view over every bucket.
//!
//! Precedence per field: bucket value, then the legacy top-level field with
//! the same meaning, then the hardcoded default.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::bucket::{Bucket, BucketStore};
use crate::persist::LegacyFields;
use crate::sections::analyze::{self, AnalyzeState};
use crate::sections::apply_design::{self, DesignSummaries, DesignTable};
use crate::sections::{explore, m2m, propose, welcome};
use crate::table::{Row, Table};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub student_name: String,
    pub class_section: String,
    /// Local date of compilation; the only clock-derived field.
    pub today: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordExplore {
    pub csv_preview: Vec<Vec<String>>,
    pub exp_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPropose {
    pub workshops: Vec<String>,
    pub registrations: Vec<String>,
    pub solutions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordApply {
    pub p_name: String,
    pub i_name: String,
    pub w_name: String,
    pub r_name: String,
    pub p_rows: Vec<Row>,
    pub i_rows: Vec<Row>,
    pub w_rows: Vec<Row>,
    pub r_rows: Vec<Row>,
    pub summaries: DesignSummaries,
}

impl RecordApply {
    pub fn name(&self, which: DesignTable) -> &str {
        match which {
            DesignTable::Attendee => &self.p_name,
            DesignTable::Instructor => &self.i_name,
            DesignTable::Workshop => &self.w_name,
            DesignTable::Registration => &self.r_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordM2m {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub meta: RecordMeta,
    pub explore: RecordExplore,
    pub analyze: AnalyzeState,
    pub propose: RecordPropose,
    pub apply: RecordApply,
    pub m2m: RecordM2m,
    /// Every bucket's content, `lastUpdated` stripped.
    pub raw: BTreeMap<String, Bucket>,
}

pub fn compile(store: &BucketStore, legacy: &LegacyFields, today: &str) -> Record {
    let w = store.get(welcome::KEY);
    let e = store.get(explore::KEY);
    let a = store.get(analyze::KEY);
    let p = store.get(propose::KEY);
    let d = store.get(apply_design::KEY);
    let m = store.get(m2m::KEY);

    let meta = RecordMeta {
        student_name: text_field(w, "studentName").unwrap_or_else(|| legacy.student_name.clone()),
        class_section: text_field(w, "classSection")
            .unwrap_or_else(|| legacy.class_section.clone()),
        today: today.to_string(),
    };

    let explore = RecordExplore {
        csv_preview: field(e, "csvPreview").unwrap_or_default(),
        exp_notes: field(e, "expNotes").unwrap_or_default(),
    };

    let analyze = AnalyzeState {
        workshops: field(a, "workshops").unwrap_or_default(),
        registrations: field(a, "registrations").unwrap_or_default(),
    };

    let propose = RecordPropose {
        workshops: field(p, "workshops").unwrap_or_default(),
        registrations: field(p, "registrations").unwrap_or_default(),
        solutions: field(p, "solutions").unwrap_or_else(|| legacy.solutions.clone()),
    };

    let table_name = |key: &str, which: DesignTable| -> String {
        field::<String>(d, key)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| which.default_title().to_string())
    };
    let apply = RecordApply {
        p_name: table_name("pName", DesignTable::Attendee),
        i_name: table_name("iName", DesignTable::Instructor),
        w_name: table_name("wName", DesignTable::Workshop),
        r_name: table_name("rName", DesignTable::Registration),
        p_rows: field(d, "pRows").unwrap_or_default(),
        i_rows: field(d, "iRows").unwrap_or_default(),
        w_rows: field(d, "wRows").unwrap_or_default(),
        r_rows: field(d, "rRows").unwrap_or_default(),
        summaries: field(d, "summaries").unwrap_or_else(|| legacy.summaries.clone()),
    };

    let m2m = RecordM2m {
        tables: field(m, "tables").unwrap_or_default(),
    };

    Record {
        meta,
        explore,
        analyze,
        propose,
        apply,
        m2m,
        raw: store.content(),
    }
}

/// A present field that fails to deserialize counts as absent.
fn field<T: DeserializeOwned>(bucket: Option<&Bucket>, key: &str) -> Option<T> {
    let v = bucket?.get(key)?;
    if v.is_null() {
        return None;
    }
    match serde_json::from_value::<T>(v.clone()) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!(field = key, error = %e, "bucket field has unexpected shape");
            None
        }
    }
}

/// Like `field`, but an empty string is absent too.
fn text_field(bucket: Option<&Bucket>, key: &str) -> Option<String> {
    field::<String>(bucket, key).filter(|s| !s.is_empty())
}

/// Memoizes `compile` on its inputs so repeated calls with nothing changed
/// hand back the same `Rc`.
#[derive(Debug, Default)]
pub struct RecordCompiler {
    cached: Option<(CacheKey, Rc<Record>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    revision: u64,
    legacy: LegacyFields,
    today: String,
}

impl RecordCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&mut self, store: &BucketStore, legacy: &LegacyFields, today: &str) -> Rc<Record> {
        let key = CacheKey {
            revision: store.revision(),
            legacy: legacy.clone(),
            today: today.to_string(),
        };
        if let Some((cached_key, record)) = &self.cached {
            if *cached_key == key {
                return Rc::clone(record);
            }
        }
        let record = Rc::new(compile(store, legacy, today));
        self.cached = Some((key, Rc::clone(&record)));
        record
    }

    /// Needed whenever the store is replaced rather than mutated.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Render a record value as JSON for IPC results.
pub fn to_json(record: &Record) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bucket(v: Value) -> Bucket {
        v.as_object().cloned().unwrap()
    }

    fn store_with(stamp: i64) -> BucketStore {
        let mut store = BucketStore::new();
        store.set(
            welcome::KEY,
            bucket(json!({ "studentName": "Jane Doe", "classSection": "011 - 1:50" })),
            stamp,
        );
        store.set(
            analyze::KEY,
            bucket(json!({ "workshops": { "dup": true } })),
            stamp,
        );
        store
    }

    #[test]
    fn equal_buckets_compile_equal() {
        let legacy = LegacyFields::default();
        let a = compile(&store_with(1_000), &legacy, "10/16/2026");
        let b = compile(&store_with(9_999), &legacy, "10/16/2026");
        assert_eq!(a, b);
        assert!(a.analyze.workshops.dup);
        assert!(!a.raw["welcome"].contains_key("lastUpdated"));
    }

    #[test]
    fn legacy_fields_fill_missing_buckets() {
        let legacy = LegacyFields {
            student_name: "Old Name".into(),
            solutions: vec!["x".into()],
            summaries: DesignSummaries {
                reg_pk: "RegID".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let r = compile(&BucketStore::new(), &legacy, "d");
        assert_eq!(r.meta.student_name, "Old Name");
        assert_eq!(r.propose.solutions, vec!["x"]);
        assert_eq!(r.apply.summaries.reg_pk, "RegID");
        assert_eq!(r.apply.p_name, "Table 1");
        assert_eq!(r.apply.name(DesignTable::Registration), "Table 4");
        assert!(r.m2m.tables.is_empty());

        let r = compile(&store_with(1), &legacy, "d");
        assert_eq!(r.meta.student_name, "Jane Doe");
    }

    #[test]
    fn empty_welcome_fields_defer_to_legacy() {
        let legacy = LegacyFields {
            student_name: "Old Name".into(),
            class_section: "010 - 9:30".into(),
            ..Default::default()
        };
        let mut store = BucketStore::new();
        store.set(
            welcome::KEY,
            bucket(json!({ "studentName": "", "classSection": "" })),
            1,
        );
        let r = compile(&store, &legacy, "d");
        assert_eq!(r.meta.student_name, "Old Name");
        assert_eq!(r.meta.class_section, "010 - 9:30");
    }

    #[test]
    fn compiler_reuses_unchanged_record() {
        let mut store = store_with(1);
        let legacy = LegacyFields::default();
        let mut compiler = RecordCompiler::new();
        let first = compiler.compile(&store, &legacy, "d");
        let again = compiler.compile(&store, &legacy, "d");
        assert!(Rc::ptr_eq(&first, &again));

        // Re-stamping identical content keeps the record.
        store.set(welcome::KEY, bucket(json!({ "studentName": "Jane Doe" })), 50);
        assert!(Rc::ptr_eq(&first, &compiler.compile(&store, &legacy, "d")));

        store.set(welcome::KEY, bucket(json!({ "studentName": "Jane Q Doe" })), 60);
        let changed = compiler.compile(&store, &legacy, "d");
        assert!(!Rc::ptr_eq(&first, &changed));
        assert_eq!(changed.meta.student_name, "Jane Q Doe");
    }
}
