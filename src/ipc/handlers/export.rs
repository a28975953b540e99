use crate::export::sink::WorkspaceSink;
use crate::export::ExportFormat;
use crate::ipc::error::{err, kit_err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn handle_export_run(state: &mut AppState, req: &Request) -> Value {
    let format = req
        .params
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("html");
    let format = match ExportFormat::parse(format) {
        Ok(f) => f,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let device = req
        .params
        .get("device")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let (Some(deck), Some(workspace)) = (state.deck.as_mut(), state.workspace.as_ref()) else {
        return err(&req.id, "no_deck", "open a deck first", None);
    };
    let mut sink = WorkspaceSink::new(workspace, deck.config().open_windows);
    match deck.export(format, device.as_deref(), &mut sink) {
        Ok(receipt) => ok(
            &req.id,
            json!({
                "format": receipt.format,
                "docId": receipt.doc_id,
                "fileName": receipt.file_name,
                "delivery": receipt.delivery,
                "location": receipt.location,
                "headerLine": receipt.header_line,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "export did not run");
            kit_err(&req.id, &e)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "export.run" => Some(handle_export_run(state, req)),
        _ => None,
    }
}
