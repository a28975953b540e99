use crate::error::KitError;
use crate::ipc::error::{err, kit_err, ok};
use crate::ipc::handlers::{bool_param, str_param, with_deck};
use crate::ipc::types::{AppState, Request};
use crate::sections::analyze::{Flag, FlatTable};
use crate::sections::propose::ProposeGroup;
use serde_json::{json, Value};

fn handle_section_get(state: &mut AppState, req: &Request) -> Value {
    with_deck(state, req, |deck| Ok(deck.section_state()))
}

fn handle_set_name(state: &mut AppState, req: &Request) -> Value {
    let (first, last) = match (str_param(req, "first"), str_param(req, "last")) {
        (Ok(f), Ok(l)) => (f.to_string(), l.to_string()),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    with_deck(state, req, |deck| {
        let changed = deck.welcome_set_name(&first, &last)?;
        Ok(json!({ "changed": changed, "identity": deck.identity_summary() }))
    })
}

fn handle_set_section(state: &mut AppState, req: &Request) -> Value {
    let section = match str_param(req, "section") {
        Ok(s) => s.to_string(),
        Err(resp) => return resp,
    };
    with_deck(state, req, |deck| {
        let changed = deck.welcome_set_section(&section)?;
        Ok(json!({ "changed": changed, "identity": deck.identity_summary() }))
    })
}

fn handle_record(state: &mut AppState, req: &Request) -> Value {
    let Some(deck) = state.deck.as_mut() else {
        return err(&req.id, "no_deck", "open a deck first", None);
    };
    match deck.welcome_record() {
        Ok(()) => ok(&req.id, json!({ "identity": deck.identity_summary() })),
        // Recording refusals are input problems, not export refusals.
        Err(KitError::Refused(r)) => err(
            &req.id,
            "bad_params",
            r.to_string(),
            Some(json!({ "reason": r.code() })),
        ),
        Err(e) => kit_err(&req.id, &e),
    }
}

fn handle_set_csv(state: &mut AppState, req: &Request) -> Value {
    let text = match str_param(req, "text") {
        Ok(t) => t.to_string(),
        Err(resp) => return resp,
    };
    with_deck(state, req, |deck| {
        deck.explore_set_csv(&text)?;
        Ok(json!({}))
    })
}

fn handle_load_preview(state: &mut AppState, req: &Request) -> Value {
    with_deck(state, req, |deck| {
        let rows = deck.explore_load_preview()?;
        Ok(json!({ "rows": rows, "section": deck.section_state() }))
    })
}

fn handle_set_notes(state: &mut AppState, req: &Request) -> Value {
    let notes = match str_param(req, "notes") {
        Ok(n) => n.to_string(),
        Err(resp) => return resp,
    };
    with_deck(state, req, |deck| {
        deck.explore_set_notes(&notes)?;
        Ok(json!({}))
    })
}

fn handle_analyze_set(state: &mut AppState, req: &Request) -> Value {
    let parsed = (|| {
        Ok::<_, Value>((
            str_param(req, "table")?.to_string(),
            str_param(req, "flag")?.to_string(),
            bool_param(req, "value")?,
        ))
    })();
    let (table, flag, value) = match parsed {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    with_deck(state, req, |deck| {
        deck.analyze_set(FlatTable::parse(&table)?, Flag::parse(&flag)?, value)?;
        Ok(deck.section_state())
    })
}

fn handle_propose_toggle(state: &mut AppState, req: &Request) -> Value {
    let (group, option) = match (str_param(req, "group"), str_param(req, "option")) {
        (Ok(g), Ok(o)) => (g.to_string(), o.to_string()),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    with_deck(state, req, |deck| {
        let selected = deck.propose_toggle(ProposeGroup::parse(&group)?, &option)?;
        Ok(json!({ "selected": selected, "section": deck.section_state() }))
    })
}

fn handle_record_get(state: &mut AppState, req: &Request) -> Value {
    with_deck(state, req, |deck| Ok(crate::record::to_json(&deck.record())))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "section.get" => Some(handle_section_get(state, req)),
        "welcome.setName" => Some(handle_set_name(state, req)),
        "welcome.setSection" => Some(handle_set_section(state, req)),
        "welcome.record" => Some(handle_record(state, req)),
        "explore.setCsv" => Some(handle_set_csv(state, req)),
        "explore.loadPreview" => Some(handle_load_preview(state, req)),
        "explore.setNotes" => Some(handle_set_notes(state, req)),
        "analyze.set" => Some(handle_analyze_set(state, req)),
        "propose.toggle" => Some(handle_propose_toggle(state, req)),
        "record.get" => Some(handle_record_get(state, req)),
        _ => None,
    }
}
