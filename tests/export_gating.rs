mod test_support;

use serde_json::json;
use slidekit::config::{DeckConfig, HashAlgorithm};
use slidekit::export::sink::MemorySink;
use slidekit::export::{Delivery, ExportFormat};
use slidekit::storage::SharedMemoryStorage;
use slidekit::{KitError, Refusal};
use test_support::{
    goto, lock_identity, open_fixture, open_fixture_with, request_err, request_ok, spawn_sidecar,
    temp_dir,
};

fn refusal(result: Result<slidekit::export::ExportReceipt, KitError>) -> Refusal {
    match result {
        Err(KitError::Refused(r)) => r,
        other => panic!("expected a refusal, got {other:?}"),
    }
}

#[test]
fn export_names_the_first_missing_precondition() {
    let mut fx = open_fixture(SharedMemoryStorage::new());
    let mut sink = MemorySink::default();

    let r = refusal(fx.deck.export(ExportFormat::Html, Some("test"), &mut sink));
    assert_eq!(r, Refusal::NameMissing);

    goto(&mut fx, "welcome");
    fx.deck.welcome_set_name("Jane", "").expect("name");
    let r = refusal(fx.deck.export(ExportFormat::Html, Some("test"), &mut sink));
    assert_eq!(r, Refusal::NameNotFull);

    fx.deck.welcome_set_name("Jane", "Doe").expect("name");
    let r = refusal(fx.deck.export(ExportFormat::Html, Some("test"), &mut sink));
    assert_eq!(r, Refusal::SectionMissing);

    fx.deck.welcome_set_section("010 - 9:30").expect("section");
    let r = refusal(fx.deck.export(ExportFormat::Html, Some("test"), &mut sink));
    assert_eq!(r, Refusal::NotLocked);
    assert!(r.to_string().contains("Record Name & Section"));

    assert!(sink.windows.is_empty());
    assert!(sink.downloads.is_empty());
}

#[test]
fn locked_deck_exports_a_fingerprinted_html_document() {
    let mut fx = open_fixture(SharedMemoryStorage::new());
    lock_identity(&mut fx, "Jane", "Doe", "010 - 9:30");
    goto(&mut fx, "analyze");
    fx.deck
        .analyze_set(
            slidekit::sections::analyze::FlatTable::Registrations,
            slidekit::sections::analyze::Flag::Redundancy,
            true,
        )
        .expect("analyze");

    let mut sink = MemorySink::default();
    let receipt = fx
        .deck
        .export(ExportFormat::Html, Some("en-US, UTC, test"), &mut sink)
        .expect("export");

    assert_eq!(receipt.delivery, Delivery::Window);
    assert_eq!(receipt.doc_id.len(), 12);
    assert!(receipt.doc_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(receipt.file_name.starts_with("MISY261_Homework_1_Jane_Doe_010_9_30_"));
    assert!(receipt.file_name.ends_with(".html"));
    assert!(receipt.header_line.contains("Jane Doe • 010 - 9:30"));

    let doc = &sink.windows[0];
    assert!(doc.mime.starts_with("text/html"));
    assert!(doc.body.contains("Jane Doe"));
    assert!(doc.body.contains(&receipt.doc_id));
    assert!(doc.body.contains(fx.deck.salt()));
    assert!(doc.body.contains("en-US, UTC, test"));

    // Same inputs at the same instant fingerprint the same way.
    let again = fx
        .deck
        .export(ExportFormat::Html, Some("en-US, UTC, test"), &mut sink)
        .expect("export again");
    assert_eq!(again.doc_id, receipt.doc_id);

    // The mounted section's unsaved edit was flushed before compiling.
    assert_eq!(
        fx.deck.store().get("analyze").expect("bucket")["registrations"]["red"],
        true
    );
}

#[test]
fn blocked_window_falls_back_to_a_download() {
    let mut fx = open_fixture(SharedMemoryStorage::new());
    lock_identity(&mut fx, "Jane", "Doe", "010 - 9:30");
    let mut sink = MemorySink {
        blocked: true,
        ..MemorySink::default()
    };
    let receipt = fx
        .deck
        .export(ExportFormat::Html, Some("test"), &mut sink)
        .expect("export");
    assert_eq!(receipt.delivery, Delivery::Download);
    assert!(sink.windows.is_empty());
    assert_eq!(sink.downloads.len(), 1);
}

#[test]
fn json_export_carries_order_data_and_identity() {
    let mut fx = open_fixture(SharedMemoryStorage::new());
    lock_identity(&mut fx, "Jane", "Doe", "010 - 9:30");
    goto(&mut fx, "explore");
    fx.deck.explore_set_notes("instructor repeated").expect("notes");

    let mut sink = MemorySink::default();
    let receipt = fx
        .deck
        .export(ExportFormat::Json, Some("test"), &mut sink)
        .expect("export");
    let body: serde_json::Value =
        serde_json::from_str(&sink.windows[0].body).expect("json body");

    assert_eq!(body["order"][0], "title");
    assert_eq!(body["order"].as_array().map(Vec::len), Some(9));
    assert_eq!(body["identity"]["name"], "Jane Doe");
    assert_eq!(body["identity"]["locked"], true);
    assert_eq!(body["meta"]["section"], "010 - 9:30");
    assert_eq!(body["data"]["explore"]["expNotes"], "instructor repeated");
    assert_eq!(body["version"], 3);
    assert_eq!(body["salt"], fx.deck.salt());
    assert_eq!(body["docId"], receipt.doc_id);
    assert!(receipt.file_name.starts_with("MISY261_Homework_1_Jane_Doe_010_9_30_"));
    assert!(receipt.file_name.ends_with(".json"));
}

#[test]
fn fallback_hash_gives_a_shorter_doc_id() {
    let mut config = DeckConfig::default();
    config.hash_algorithm = HashAlgorithm::Fallback;
    let mut fx = open_fixture_with(SharedMemoryStorage::new(), config);
    lock_identity(&mut fx, "Jane", "Doe", "010 - 9:30");
    let mut sink = MemorySink::default();
    let receipt = fx
        .deck
        .export(ExportFormat::Html, Some("test"), &mut sink)
        .expect("export");
    assert_eq!(receipt.doc_id.len(), 8);
    assert!(receipt.doc_id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn sidecar_refuses_then_saves_to_the_workspace() {
    let workspace = temp_dir("slidekit-export");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "deck.open",
        json!({
            "path": workspace.to_string_lossy(),
            "config": { "openWindows": false }
        }),
    );
    let refused = request_err(&mut stdin, &mut reader, "2", "export.run", json!({ "format": "html" }));
    assert_eq!(refused["code"], "export_refused");
    assert_eq!(refused["details"]["reason"], "name_missing");

    request_ok(&mut stdin, &mut reader, "3", "deck.navigate", json!({ "to": 1 }));
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "welcome.setName",
        json!({ "first": "Jane", "last": "Doe" }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "welcome.setSection",
        json!({ "section": "010 - 12:40" }),
    );
    let refused = request_err(&mut stdin, &mut reader, "6", "export.run", json!({ "format": "html" }));
    assert_eq!(refused["details"]["reason"], "not_locked");

    request_ok(&mut stdin, &mut reader, "7", "welcome.record", json!({}));
    let bad = request_err(&mut stdin, &mut reader, "8", "export.run", json!({ "format": "docx" }));
    assert_eq!(bad["code"], "bad_params");

    let receipt = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "export.run",
        json!({ "format": "html", "device": "en-US, UTC, test" }),
    );
    assert_eq!(receipt["delivery"], "download");
    let location = receipt["location"].as_str().expect("location");
    assert!(location.starts_with(&*workspace.join("exports").to_string_lossy()));
    let body = std::fs::read_to_string(location).expect("saved export");
    assert!(body.contains("Jane Doe"));
    assert!(body.contains(receipt["docId"].as_str().expect("docId")));
}
