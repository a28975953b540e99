//! Migration loader: bring a stored document up to the current shape.
//!
//! Steps run in order on every load and must be idempotent. A new schema
//! version appends a step; existing steps are never edited in place.

use serde_json::{Map, Value};

use crate::bucket::LAST_UPDATED;
use crate::csv::parse_csv;
use crate::storage::Storage;
use crate::table::new_row_id;

pub const CURRENT_VERSION: u32 = 3;

pub const APPLY_DESIGN_ROW_LISTS: [&str; 4] = ["pRows", "iRows", "wRows", "rRows"];

/// Top-level fields that older documents kept outside any bucket.
const EXPLORE_LEGACY_FIELDS: [&str; 3] = ["csvText", "csvPreview", "expNotes"];

pub struct MigrationStep {
    pub name: &'static str,
    pub apply: fn(&mut Map<String, Value>) -> bool,
}

pub const STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "lift_tab_data",
        apply: lift_tab_data,
    },
    MigrationStep {
        name: "wrap_bare_buckets",
        apply: wrap_bare_buckets,
    },
    MigrationStep {
        name: "ensure_buckets",
        apply: ensure_buckets,
    },
    MigrationStep {
        name: "rename_updated_at",
        apply: rename_updated_at,
    },
    MigrationStep {
        name: "assign_row_ids",
        apply: assign_row_ids,
    },
    MigrationStep {
        name: "seed_m2m_rows",
        apply: seed_m2m_rows,
    },
    MigrationStep {
        name: "lift_explore_fields",
        apply: lift_explore_fields,
    },
    MigrationStep {
        name: "rebuild_csv_preview",
        apply: rebuild_csv_preview,
    },
    MigrationStep {
        name: "stamp_version",
        apply: stamp_version,
    },
];

#[derive(Debug, Default)]
pub struct Loaded {
    pub doc: Option<Map<String, Value>>,
    pub source_key: Option<String>,
    pub applied: Vec<&'static str>,
}

/// Run every step over `doc`; returns the names of the steps that changed it.
pub fn migrate(doc: &mut Map<String, Value>) -> Vec<&'static str> {
    STEPS
        .iter()
        .filter_map(|step| (step.apply)(doc).then_some(step.name))
        .collect()
}

/// Try `current_key`, then each legacy key in order. A missing, unreadable or
/// non-object value counts as absent. Nothing found leaves `doc` empty.
pub fn load(storage: &dyn Storage, current_key: &str, legacy_keys: &[String]) -> Loaded {
    let keys = std::iter::once(current_key).chain(legacy_keys.iter().map(String::as_str));
    for key in keys {
        let raw = match storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed; trying next key");
                continue;
            }
        };
        let mut doc = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(doc)) => doc,
            Ok(_) => {
                tracing::warn!(key, "stored document is not an object; trying next key");
                continue;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "stored document is not valid JSON; trying next key");
                continue;
            }
        };
        let applied = migrate(&mut doc);
        tracing::info!(key, steps = ?applied, "loaded stored document");
        return Loaded {
            doc: Some(doc),
            source_key: Some(key.to_string()),
            applied,
        };
    }
    tracing::info!("no stored document; starting from defaults");
    Loaded::default()
}

fn lift_tab_data(doc: &mut Map<String, Value>) -> bool {
    if doc.contains_key("buckets") {
        return false;
    }
    let Some(Value::Object(tab_data)) = doc.remove("tabData") else {
        return false;
    };
    doc.remove("__version");
    doc.insert("buckets".into(), Value::Object(tab_data));
    true
}

/// The first generic deck stored `{ slideKey: bucket, ... }` with nothing else.
fn wrap_bare_buckets(doc: &mut Map<String, Value>) -> bool {
    if doc.is_empty() || doc.contains_key("buckets") || doc.contains_key("version") {
        return false;
    }
    if !doc.values().all(Value::is_object) {
        return false;
    }
    let buckets = std::mem::take(doc);
    doc.insert("buckets".into(), Value::Object(buckets));
    true
}

fn ensure_buckets(doc: &mut Map<String, Value>) -> bool {
    match doc.get("buckets") {
        Some(Value::Object(_)) => false,
        _ => {
            doc.insert("buckets".into(), Value::Object(Map::new()));
            true
        }
    }
}

fn rename_updated_at(doc: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for bucket in buckets_mut(doc).values_mut() {
        let Value::Object(b) = bucket else { continue };
        if let Some(stamp) = b.remove("__updatedAt") {
            if !b.contains_key(LAST_UPDATED) {
                b.insert(LAST_UPDATED.into(), stamp);
            }
            changed = true;
        }
    }
    changed
}

fn assign_row_ids(doc: &mut Map<String, Value>) -> bool {
    let buckets = buckets_mut(doc);
    let mut changed = false;
    if let Some(Value::Object(apply)) = buckets.get_mut("apply_design") {
        for list in APPLY_DESIGN_ROW_LISTS {
            if let Some(rows) = apply.get_mut(list) {
                changed |= normalize_rows(rows);
            }
        }
    }
    if let Some(Value::Array(tables)) = buckets
        .get_mut("m2m_redesign")
        .and_then(|m| m.get_mut("tables"))
    {
        for table in tables.iter_mut() {
            if let Some(rows) = table.get_mut("rows") {
                changed |= normalize_rows(rows);
            }
        }
    }
    changed
}

fn seed_m2m_rows(doc: &mut Map<String, Value>) -> bool {
    let buckets = buckets_mut(doc);
    let Some(Value::Array(tables)) = buckets
        .get_mut("m2m_redesign")
        .and_then(|m| m.get_mut("tables"))
    else {
        return false;
    };
    let mut changed = false;
    for table in tables.iter_mut() {
        if !table.is_object() {
            *table = Value::Object(Map::new());
            changed = true;
        }
        let Value::Object(t) = table else { continue };
        if !matches!(t.get("name"), Some(Value::String(_))) {
            t.insert("name".into(), Value::String(String::new()));
            changed = true;
        }
        let empty = match t.get("rows") {
            Some(Value::Array(rows)) => rows.is_empty(),
            _ => true,
        };
        if empty {
            t.insert("rows".into(), Value::Array(vec![blank_row()]));
            changed = true;
        }
    }
    changed
}

fn lift_explore_fields(doc: &mut Map<String, Value>) -> bool {
    if !EXPLORE_LEGACY_FIELDS.iter().any(|f| doc.contains_key(*f)) {
        return false;
    }
    let lifted: Vec<(&str, Value)> = EXPLORE_LEGACY_FIELDS
        .iter()
        .filter_map(|f| doc.remove(*f).map(|v| (*f, v)))
        .collect();
    let buckets = buckets_mut(doc);
    let explore = buckets
        .entry("explore")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(explore) = explore {
        for (field, value) in lifted {
            explore.entry(field).or_insert(value);
        }
    }
    true
}

/// The preview is derived from `csvText`; rebuild it once when it is missing.
fn rebuild_csv_preview(doc: &mut Map<String, Value>) -> bool {
    let buckets = buckets_mut(doc);
    let Some(Value::Object(explore)) = buckets.get_mut("explore") else {
        return false;
    };
    let has_preview = matches!(explore.get("csvPreview"), Some(Value::Array(rows)) if !rows.is_empty());
    if has_preview {
        return false;
    }
    let Some(text) = explore.get("csvText").and_then(Value::as_str) else {
        return false;
    };
    if text.trim().is_empty() {
        return false;
    }
    let preview = parse_csv(text);
    explore.insert(
        "csvPreview".into(),
        serde_json::to_value(preview).unwrap_or(Value::Array(Vec::new())),
    );
    true
}

fn stamp_version(doc: &mut Map<String, Value>) -> bool {
    let current = Value::from(CURRENT_VERSION);
    if doc.get("version") == Some(&current) {
        return false;
    }
    doc.insert("version".into(), current);
    true
}

fn buckets_mut(doc: &mut Map<String, Value>) -> &mut Map<String, Value> {
    if !matches!(doc.get("buckets"), Some(Value::Object(_))) {
        doc.insert("buckets".into(), Value::Object(Map::new()));
    }
    match doc.get_mut("buckets") {
        Some(Value::Object(b)) => b,
        _ => unreachable!("buckets was just ensured to be an object"),
    }
}

fn blank_row() -> Value {
    serde_json::json!({ "id": new_row_id(), "col": "", "pk": false, "fk": false })
}

/// Coerce every row to `{id, col, pk, fk}`, keeping existing ids.
fn normalize_rows(rows: &mut Value) -> bool {
    let Value::Array(list) = rows else {
        *rows = Value::Array(Vec::new());
        return true;
    };
    let mut changed = false;
    for row in list.iter_mut() {
        let obj = row.as_object();
        let id = obj
            .and_then(|o| o.get("id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let col = obj
            .and_then(|o| o.get("col").or_else(|| o.get("columnName")))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let pk = obj
            .and_then(|o| o.get("pk").or_else(|| o.get("isPrimaryKey")))
            .map(truthy)
            .unwrap_or(false);
        let fk = obj
            .and_then(|o| o.get("fk").or_else(|| o.get("isForeignKey")))
            .map(truthy)
            .unwrap_or(false);
        let normalized = serde_json::json!({
            "id": id.unwrap_or_else(new_row_id),
            "col": col,
            "pk": pk,
            "fk": fk,
        });
        if *row != normalized {
            *row = normalized;
            changed = true;
        }
    }
    changed
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn v2_document() -> Map<String, Value> {
        obj(json!({
            "studentName": "Jane Doe",
            "classSection": "010 - 12:40",
            "identityLocked": true,
            "csvText": "A,B\n1,2",
            "csvPreview": [],
            "expNotes": "dupes everywhere",
            "sessionSalt": "abc123",
            "__version": "misy261_homework1_v3",
            "tabData": {
                "apply_design": {
                    "pRows": [{ "col": "AttendeeID", "pk": true }, { "id": "keep", "col": "Name" }],
                    "__updatedAt": 5
                },
                "m2m_redesign": { "tables": [{ "name": "Students" }, { "name": "", "rows": [] }] }
            }
        }))
    }

    #[test]
    fn v2_document_is_brought_forward() {
        let mut doc = v2_document();
        let applied = migrate(&mut doc);
        assert!(applied.contains(&"lift_tab_data"));
        assert!(applied.contains(&"assign_row_ids"));

        let apply = &doc["buckets"]["apply_design"];
        let rows = apply["pRows"].as_array().unwrap();
        assert!(!rows[0]["id"].as_str().unwrap().is_empty());
        assert_eq!(rows[1]["id"], "keep");
        assert_eq!(rows[1]["pk"], false);
        assert_eq!(apply[LAST_UPDATED], 5);
        assert!(apply.get("__updatedAt").is_none());

        for t in doc["buckets"]["m2m_redesign"]["tables"].as_array().unwrap() {
            assert_eq!(t["rows"].as_array().unwrap().len(), 1);
        }

        let explore = &doc["buckets"]["explore"];
        assert_eq!(explore["expNotes"], "dupes everywhere");
        assert_eq!(explore["csvPreview"], json!([["A", "B"], ["1", "2"]]));
        assert!(doc.get("csvText").is_none());
        assert_eq!(doc["studentName"], "Jane Doe");
        assert_eq!(doc["version"], CURRENT_VERSION);
    }

    #[test]
    fn migration_is_idempotent() {
        let mut doc = v2_document();
        migrate(&mut doc);
        let once = doc.clone();
        let applied = migrate(&mut doc);
        assert!(applied.is_empty(), "second pass changed: {applied:?}");
        assert_eq!(doc, once);
    }

    #[test]
    fn bare_bucket_map_is_wrapped_once() {
        let mut doc = obj(json!({ "welcome": { "firstName": "Jane" }, "notes": { "items": [] } }));
        migrate(&mut doc);
        assert_eq!(doc["buckets"]["welcome"]["firstName"], "Jane");
        let once = doc.clone();
        migrate(&mut doc);
        assert_eq!(doc, once);
    }

    #[test]
    fn load_falls_through_bad_keys() {
        let mut storage = MemoryStorage::new();
        storage.set_item("app_v3", "{broken").unwrap();
        storage.set_item("app_v2", "[1,2]").unwrap();
        storage
            .set_item("app_v1", r#"{"studentName":"Jane Doe"}"#)
            .unwrap();

        let loaded = load(&storage, "app_v3", &["app_v2".into(), "app_v1".into()]);
        assert_eq!(loaded.source_key.as_deref(), Some("app_v1"));
        assert_eq!(loaded.doc.unwrap()["studentName"], "Jane Doe");
    }

    #[test]
    fn load_with_nothing_stored_is_empty() {
        let storage = MemoryStorage::new();
        let loaded = load(&storage, "app_v3", &["app_v2".into()]);
        assert!(loaded.doc.is_none());
        assert!(loaded.source_key.is_none());
    }
}
