pub mod core;
pub mod deck;
pub mod export;
pub mod sections;
pub mod tables;

use serde_json::Value;

use crate::error::KitResult;
use crate::homework::Homework;
use crate::ipc::error::{err, kit_err, ok};
use crate::ipc::types::{AppState, Request};

pub(crate) fn str_param<'a>(req: &'a Request, name: &str) -> Result<&'a str, Value> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{name}"), None))
}

pub(crate) fn bool_param(req: &Request, name: &str) -> Result<bool, Value> {
    req.params
        .get(name)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{name}"), None))
}

/// Run `f` against the open deck and turn its result into a response.
pub(crate) fn with_deck(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&mut Homework) -> KitResult<Value>,
) -> Value {
    let Some(deck) = state.deck.as_mut() else {
        return err(&req.id, "no_deck", "open a deck first", None);
    };
    match f(deck) {
        Ok(result) => ok(&req.id, result),
        Err(e) => {
            tracing::debug!(method = %req.method, error = %e, "request failed");
            kit_err(&req.id, &e)
        }
    }
}
