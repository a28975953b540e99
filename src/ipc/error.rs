use serde_json::json;

use crate::error::KitError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Map an engine error onto a response code.
pub fn kit_err(id: &str, e: &KitError) -> serde_json::Value {
    match e {
        KitError::Storage(_) => err(id, "storage_failed", e.to_string(), None),
        KitError::Serde(_) => err(id, "storage_failed", e.to_string(), None),
        KitError::SectionNotActive { expected, active } => err(
            id,
            "section_not_active",
            e.to_string(),
            Some(json!({ "expected": expected, "active": active })),
        ),
        KitError::UnknownTable(_) | KitError::UnknownOption(_) => {
            err(id, "bad_params", e.to_string(), None)
        }
        KitError::RowNotFound(row) => err(
            id,
            "not_found",
            e.to_string(),
            Some(json!({ "rowId": row })),
        ),
        KitError::Refused(r) => err(
            id,
            "export_refused",
            r.to_string(),
            Some(json!({ "reason": r.code() })),
        ),
        KitError::Export(_) => err(id, "export_failed", e.to_string(), None),
    }
}
