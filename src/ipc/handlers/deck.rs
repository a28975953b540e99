use crate::ipc::error::err;
use crate::ipc::handlers::{str_param, with_deck};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn snapshot_json(deck: &mut crate::Homework) -> crate::KitResult<Value> {
    Ok(serde_json::to_value(deck.snapshot())?)
}

fn handle_state(state: &mut AppState, req: &Request) -> Value {
    with_deck(state, req, snapshot_json)
}

fn handle_navigate(state: &mut AppState, req: &Request) -> Value {
    enum Target {
        Index(i64),
        Next,
        Prev,
    }
    let target = match req.params.get("to") {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Target::Index(i),
            None => return err(&req.id, "bad_params", "params.to must be an integer", None),
        },
        Some(Value::String(s)) if s == "next" => Target::Next,
        Some(Value::String(s)) if s == "prev" => Target::Prev,
        _ => {
            return err(
                &req.id,
                "bad_params",
                "params.to must be an index, \"next\" or \"prev\"",
                None,
            )
        }
    };
    with_deck(state, req, |deck| {
        match target {
            Target::Index(i) => deck.navigate(i)?,
            Target::Next => deck.next()?,
            Target::Prev => deck.prev()?,
        };
        snapshot_json(deck)
    })
}

fn handle_key(state: &mut AppState, req: &Request) -> Value {
    let key = match str_param(req, "key") {
        Ok(k) => k.to_string(),
        Err(resp) => return resp,
    };
    let in_input = req
        .params
        .get("inInput")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    with_deck(state, req, |deck| {
        let action = deck.key(&key, in_input)?;
        Ok(json!({
            "action": action,
            "deck": snapshot_json(deck)?,
        }))
    })
}

fn handle_fullscreen(state: &mut AppState, req: &Request) -> Value {
    with_deck(state, req, |deck| {
        Ok(json!({ "fullscreen": deck.toggle_fullscreen() }))
    })
}

fn handle_reset(state: &mut AppState, req: &Request) -> Value {
    let to_initial = req
        .params
        .get("toInitial")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    with_deck(state, req, |deck| {
        let session_key = deck.config().identity_session_key.clone();
        deck.reset(to_initial, |session| session.remove_item(&session_key))?;
        snapshot_json(deck)
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "deck.state" => Some(handle_state(state, req)),
        "deck.navigate" => Some(handle_navigate(state, req)),
        "deck.key" => Some(handle_key(state, req)),
        "deck.fullscreen" => Some(handle_fullscreen(state, req)),
        "deck.reset" => Some(handle_reset(state, req)),
        _ => None,
    }
}
