use crate::homework::Homework;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::str_param;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "deckOpen": state.deck.is_some(),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_deck_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match str_param(req, "path") {
        Ok(p) => PathBuf::from(p),
        Err(resp) => return resp,
    };
    let overrides = req.params.get("config").filter(|v| v.is_object());

    // Anything the previous deck still holds goes to its own storage first.
    state.flush();

    match Homework::open_workspace(&path, overrides) {
        Ok(mut deck) => {
            let snapshot = deck.snapshot();
            let storage_key = deck.config().storage_key();
            state.workspace = Some(path.clone());
            state.deck = Some(deck);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "storageKey": storage_key,
                    "deck": snapshot,
                }),
            )
        }
        Err(e) => err(&req.id, "storage_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "deck.open" => Some(handle_deck_open(state, req)),
        _ => None,
    }
}
