mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("slidekit-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["deckOpen"], false);

    let no_deck = request_err(&mut stdin, &mut reader, "2", "deck.state", json!({}));
    assert_eq!(no_deck["code"], "no_deck");
    let missing = request_err(&mut stdin, &mut reader, "3", "deck.open", json!({}));
    assert_eq!(missing["code"], "bad_params");

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "deck.open",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(opened["storageKey"], "misy261_homework1_v3");
    assert_eq!(opened["deck"]["key"], "title");
    assert_eq!(opened["deck"]["slides"].as_array().map(Vec::len), Some(9));
    assert_eq!(opened["deck"]["progress"]["percent"], 11);

    // Section calls against the wrong slide.
    let wrong = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "explore.setNotes",
        json!({ "notes": "x" }),
    );
    assert_eq!(wrong["code"], "section_not_active");
    assert_eq!(wrong["details"]["expected"], "explore");

    let state = request_ok(&mut stdin, &mut reader, "6", "deck.key", json!({ "key": "ArrowRight", "inInput": false }));
    assert_eq!(state["action"], "next");
    assert_eq!(state["deck"]["key"], "welcome");
    let state = request_ok(&mut stdin, &mut reader, "7", "deck.key", json!({ "key": "ArrowRight", "inInput": true }));
    assert!(state["action"].is_null());
    assert_eq!(state["deck"]["key"], "welcome");

    request_ok(&mut stdin, &mut reader, "8", "deck.navigate", json!({ "to": "next" }));
    let section = request_ok(&mut stdin, &mut reader, "9", "section.get", json!({}));
    assert_eq!(section["key"], "explore");
    assert_eq!(section["views"]["registrations"].as_array().map(Vec::len), Some(21));
    request_ok(&mut stdin, &mut reader, "10", "explore.setCsv", json!({ "text": "WorkshopID\nW-1\nW-1" }));
    let preview = request_ok(&mut stdin, &mut reader, "11", "explore.loadPreview", json!({}));
    assert_eq!(preview["rows"], 3);
    assert_eq!(preview["section"]["views"]["workshops"].as_array().map(Vec::len), Some(2));
    request_ok(&mut stdin, &mut reader, "12", "explore.setNotes", json!({ "notes": "W-1 twice" }));

    request_ok(&mut stdin, &mut reader, "13", "deck.navigate", json!({ "to": 3 }));
    let analyze = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "analyze.set",
        json!({ "table": "workshops", "flag": "dup", "value": true }),
    );
    assert_eq!(analyze["observations"]["obsDupRows"], true);
    let bad_flag = request_err(
        &mut stdin,
        &mut reader,
        "15",
        "analyze.set",
        json!({ "table": "workshops", "flag": "zzz", "value": true }),
    );
    assert_eq!(bad_flag["code"], "bad_params");

    request_ok(&mut stdin, &mut reader, "16", "deck.navigate", json!({ "to": "next" }));
    let propose = request_ok(&mut stdin, &mut reader, "17", "section.get", json!({}));
    let option = propose["options"]["workshops"][0].as_str().expect("option").to_string();
    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "propose.toggle",
        json!({ "group": "workshops", "option": option }),
    );
    assert_eq!(toggled["selected"], true);

    request_ok(&mut stdin, &mut reader, "19", "deck.navigate", json!({ "to": "next" }));
    let added = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "design.addRow",
        json!({ "table": "registration" }),
    );
    let row_id = added["rowId"].as_str().expect("rowId").to_string();
    request_ok(
        &mut stdin,
        &mut reader,
        "21",
        "design.setColumn",
        json!({ "table": "registration", "rowId": row_id, "value": "RegistrationID" }),
    );
    let pk = request_ok(
        &mut stdin,
        &mut reader,
        "22",
        "design.setPk",
        json!({ "table": "registration", "rowId": row_id, "checked": true }),
    );
    assert_eq!(pk["section"]["state"]["summaries"]["regPK"], "RegistrationID");
    let missing_row = request_err(
        &mut stdin,
        &mut reader,
        "23",
        "design.setFk",
        json!({ "table": "registration", "rowId": "nope", "checked": true }),
    );
    assert_eq!(missing_row["code"], "not_found");
    request_ok(
        &mut stdin,
        &mut reader,
        "24",
        "design.rename",
        json!({ "table": "registration", "name": "Registrations" }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "25",
        "design.removeRow",
        json!({ "table": "registration", "rowId": row_id }),
    );

    request_ok(&mut stdin, &mut reader, "26", "deck.navigate", json!({ "to": "next" }));
    let added = request_ok(&mut stdin, &mut reader, "27", "m2m.addRow", json!({ "table": 4 }));
    assert!(added["rowId"].as_str().is_some());
    request_ok(&mut stdin, &mut reader, "28", "m2m.rename", json!({ "table": "0", "name": "Students" }));
    let out_of_range = request_err(&mut stdin, &mut reader, "29", "m2m.rename", json!({ "table": 9, "name": "x" }));
    assert_eq!(out_of_range["code"], "bad_params");

    let fullscreen = request_ok(&mut stdin, &mut reader, "30", "deck.fullscreen", json!({}));
    assert_eq!(fullscreen["fullscreen"], true);

    let state = request_ok(&mut stdin, &mut reader, "31", "deck.navigate", json!({ "to": 99 }));
    assert_eq!(state["key"], "finish");
    assert_eq!(state["progress"]["percent"], 100);
    let steps = state["homework"]["steps"].as_array().expect("steps");
    assert_eq!(steps.len(), 7);

    let record = request_ok(&mut stdin, &mut reader, "32", "record.get", json!({}));
    assert_eq!(record["explore"]["expNotes"], "W-1 twice");
    assert_eq!(record["apply"]["rName"], "Registrations");
    assert_eq!(record["m2m"]["tables"][0]["name"], "Students");

    let unknown = request_err(&mut stdin, &mut reader, "33", "slides.delete", json!({}));
    assert_eq!(unknown["code"], "not_implemented");

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json response");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(bad["error"]["code"], "bad_json");

    let _ = request(&mut stdin, &mut reader, "34", "health", json!({}));
    drop(stdin);
    child.wait().expect("sidecar exit");
}

#[test]
fn pending_edits_are_flushed_when_stdin_closes() {
    let workspace = temp_dir("slidekit-eof-flush");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "deck.open",
            json!({ "path": workspace.to_string_lossy() }),
        );
        request_ok(&mut stdin, &mut reader, "2", "deck.navigate", json!({ "to": 2 }));
        request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "explore.setNotes",
            json!({ "notes": "written on shutdown" }),
        );
        drop(stdin);
        child.wait().expect("sidecar exit");
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "deck.open",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let record = request_ok(&mut stdin, &mut reader, "2", "record.get", json!({}));
    assert_eq!(record["explore"]["expNotes"], "written on shutdown");
}
