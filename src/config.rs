use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "slidekit.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Fallback,
}

/// Deck-wide settings. Every field has a default so a partial JSON object is a
/// valid override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckConfig {
    pub title: String,
    pub subtitle: String,
    pub course: String,
    pub assignment: String,
    pub storage_prefix: String,
    pub storage_version: u32,
    /// Predecessor keys, newest first. Tried in order when the current key is absent.
    pub legacy_keys: Vec<String>,
    pub identity_session_key: String,
    pub sections: Vec<String>,
    pub bucket_delay_ms: i64,
    pub design_delay_ms: i64,
    pub persist_delay_ms: i64,
    pub hash_algorithm: HashAlgorithm,
    pub open_windows: bool,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            title: "MISY261: Business Information Systems".into(),
            subtitle: "Homework 1: Data Management and Data Modeling".into(),
            course: "MISY261".into(),
            assignment: "Homework 1".into(),
            storage_prefix: "misy261_homework1".into(),
            storage_version: 3,
            legacy_keys: vec!["misy261_homework1_v2".into(), "misy261_homework1_v1".into()],
            identity_session_key: "misy261_homework1_identity_session".into(),
            sections: vec![
                "010 - 9:30".into(),
                "017 - 11:30".into(),
                "010 - 12:40".into(),
                "011 - 1:50".into(),
            ],
            bucket_delay_ms: 250,
            design_delay_ms: 200,
            persist_delay_ms: 400,
            hash_algorithm: HashAlgorithm::Sha256,
            open_windows: true,
        }
    }
}

impl DeckConfig {
    pub fn storage_key(&self) -> String {
        format!("{}_v{}", self.storage_prefix, self.storage_version)
    }

    /// Defaults, then `slidekit.json` in the workspace, then `overrides`.
    /// Malformed sources are skipped; loading never fails.
    pub fn load(workspace: &Path, overrides: Option<&Value>) -> Self {
        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        };

        let file_path = workspace.join(CONFIG_FILE_NAME);
        if file_path.is_file() {
            match std::fs::read_to_string(&file_path)
                .map_err(anyhow::Error::from)
                .and_then(|text| serde_json::from_str::<Value>(&text).map_err(Into::into))
            {
                Ok(Value::Object(obj)) => overlay(&mut merged, &obj),
                Ok(_) => tracing::warn!(path = %file_path.display(), "config file is not an object; ignored"),
                Err(e) => tracing::warn!(path = %file_path.display(), error = %e, "config file unreadable; ignored"),
            }
        }

        if let Some(Value::Object(obj)) = overrides {
            overlay(&mut merged, obj);
        }

        match serde_json::from_value::<DeckConfig>(Value::Object(merged)) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "config overrides rejected; using defaults");
                Self::default()
            }
        }
    }
}

fn overlay(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (k, v) in patch {
        base.insert(k.clone(), v.clone());
    }
}
