//! Export engine: gate on identity, fingerprint, render, deliver.

pub mod fingerprint;
pub mod html;
pub mod sink;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::bucket::Bucket;
use crate::config::DeckConfig;
use crate::error::{KitError, KitResult};
use crate::identity::check_export_ready;
use crate::record::Record;

use self::html::DocumentHead;
use self::sink::{ExportDocument, ExportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> KitResult<Self> {
        match s {
            "html" | "pdf" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            other => Err(KitError::UnknownOption(other.to_string())),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }

    fn mime(self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html;charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Window,
    Download,
}

/// Everything the engine needs besides the record itself.
#[derive(Debug)]
pub struct ExportInput<'a> {
    pub format: ExportFormat,
    pub config: &'a DeckConfig,
    pub locked: bool,
    pub salt: &'a str,
    pub device: &'a str,
    /// Display form of the export time.
    pub time: &'a str,
    pub timestamp_ms: i64,
    pub order: Vec<&'static str>,
    pub buckets: &'a BTreeMap<String, Bucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
    pub format: ExportFormat,
    pub doc_id: String,
    pub file_name: String,
    pub delivery: Delivery,
    pub location: String,
    pub header_line: String,
}

/// One file-name component: runs of anything outside `[A-Za-z0-9_-]` become
/// `_`, capped at 80 chars. Empty input uses `fallback`.
pub fn file_part(s: &str, fallback: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("static regex"));
    let s = if s.trim().is_empty() { fallback } else { s };
    re.replace_all(s, "_").chars().take(80).collect()
}

/// `MISY261_Homework_1_Jane_Doe_010_12_40_10_16_2026.html`
pub fn export_file_name(config: &DeckConfig, record: &Record, format: ExportFormat) -> String {
    format!(
        "{}_{}_{}_{}_{}.{}",
        file_part(&config.course, "course"),
        file_part(&config.assignment, "assignment"),
        file_part(&record.meta.student_name, "student"),
        file_part(&record.meta.class_section, "section"),
        file_part(&record.meta.today, "date"),
        format.extension()
    )
}

pub fn run_export(
    record: &Record,
    input: &ExportInput<'_>,
    sink: &mut dyn ExportSink,
) -> KitResult<ExportReceipt> {
    check_export_ready(
        &record.meta.student_name,
        &record.meta.class_section,
        input.locked,
    )?;

    let source = fingerprint::verify_source(record, input.salt, input.time);
    let doc_id = fingerprint::doc_id(&source, input.config.hash_algorithm);

    let head = DocumentHead {
        title: &input.config.title,
        subtitle: &input.config.subtitle,
        course: &input.config.course,
        assignment: &input.config.assignment,
        salt: input.salt,
        doc_id: &doc_id,
        device: input.device,
        time: input.time,
    };
    let body = match input.format {
        ExportFormat::Html => html::render(record, &head),
        ExportFormat::Json => serde_json::to_string_pretty(&json_document(record, input, &doc_id))?,
    };
    let doc = ExportDocument {
        file_name: export_file_name(input.config, record, input.format),
        mime: input.format.mime(),
        body,
    };

    let opened = sink.open_window(&doc).map_err(|e| KitError::Export(e.to_string()))?;
    let (delivery, location) = match opened {
        Some(location) => (Delivery::Window, location),
        None => {
            let location = sink
                .save_download(&doc)
                .map_err(|e| KitError::Export(e.to_string()))?;
            (Delivery::Download, location)
        }
    };
    tracing::info!(doc_id = %doc_id, format = ?input.format, delivery = ?delivery, "export delivered");

    Ok(ExportReceipt {
        format: input.format,
        doc_id: doc_id.clone(),
        file_name: doc.file_name,
        delivery,
        location,
        header_line: html::header_text(record, &head),
    })
}

fn json_document(record: &Record, input: &ExportInput<'_>, doc_id: &str) -> Value {
    json!({
        "meta": {
            "title": input.config.title,
            "course": input.config.course,
            "section": record.meta.class_section,
            "date": record.meta.today,
        },
        "identity": {
            "name": record.meta.student_name,
            "section": record.meta.class_section,
            "locked": input.locked,
        },
        "order": input.order,
        "data": input.buckets,
        "version": input.config.storage_version,
        "salt": input.salt,
        "device": input.device,
        "timestamp": input.timestamp_ms,
        "docId": doc_id,
    })
}

/// Coarse host description: locale, time zone, platform.
pub fn device_info() -> String {
    let locale = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok()
        .and_then(|l| l.split('.').next().map(|s| s.replace('_', "-")))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "unknown-locale".to_string());
    let tz = iana_time_zone::get_timezone().unwrap_or_else(|_| "unknown-tz".to_string());
    format!(
        "{locale}, {tz}, {}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
