use std::sync::Arc;
use std::thread;

use chill_core::span::Position;
use chill_ide::{QueryService, UpdateOutcome, Workspace};

const LIB: &str = "lib: MODULE\n  GRANT limit;\n  SYN limit = 10;\nEND lib;\n";
const APP: &str = "app: MODULE\n  SEIZE limit;\n  DCL x INT := limit;\nEND app;\n";

fn published(outcome: UpdateOutcome) -> Arc<chill_core::Analysis> {
    match outcome {
        UpdateOutcome::Published(snapshot) => snapshot,
        UpdateOutcome::Stale => panic!("update was discarded"),
    }
}

#[test]
fn open_publishes_a_snapshot() {
    let ws = Workspace::new();
    let snapshot = published(ws.open("file:///lib.ch", LIB));
    assert!(snapshot.diagnostics.is_empty(), "{:#?}", snapshot.diagnostics);
    let current = ws.snapshot("file:///lib.ch").expect("snapshot");
    assert!(Arc::ptr_eq(&snapshot, &current));
    assert_eq!(ws.uris(), ["file:///lib.ch"]);
}

#[test]
fn update_replaces_the_snapshot_but_keeps_old_readers_valid() {
    let ws = Workspace::new();
    let old = published(ws.open("file:///a.ch", "m: MODULE\n  DCL x INT;\nEND m;\n"));
    published(ws.update("file:///a.ch", "m: MODULE\n  DCL y BOOL;\nEND m;\n"));
    let new = ws.snapshot("file:///a.ch").expect("snapshot");
    assert!(!Arc::ptr_eq(&old, &new));
    assert!(old.source.contains("DCL x"));
    assert!(new.source.contains("DCL y"));
    assert_eq!(old.file_id, new.file_id);
}

#[test]
fn older_analysis_finishing_last_is_discarded() {
    let ws = Workspace::new();
    published(ws.open("file:///a.ch", "m: MODULE\nEND m;\n"));
    let first = ws.begin_update("file:///a.ch", "m: MODULE\n  DCL first INT;\nEND m;\n").expect("open");
    let second = ws.begin_update("file:///a.ch", "m: MODULE\n  DCL second INT;\nEND m;\n").expect("open");
    assert!(second.ticket() > first.ticket());

    published(ws.finish_update(second));
    assert!(matches!(ws.finish_update(first), UpdateOutcome::Stale));
    let snapshot = ws.snapshot("file:///a.ch").expect("snapshot");
    assert!(snapshot.source.contains("second"));
}

#[test]
fn superseded_analysis_finishing_first_is_discarded() {
    let ws = Workspace::new();
    published(ws.open("file:///a.ch", "m: MODULE\nEND m;\n"));
    let first = ws.begin_update("file:///a.ch", "m: MODULE\n  DCL first INT;\nEND m;\n").expect("open");
    let second = ws.begin_update("file:///a.ch", "m: MODULE\n  DCL second INT;\nEND m;\n").expect("open");

    assert!(matches!(ws.finish_update(first), UpdateOutcome::Stale));
    let snapshot = ws.snapshot("file:///a.ch").expect("snapshot");
    assert!(!snapshot.source.contains("first"));
    published(ws.finish_update(second));
}

#[test]
fn closing_during_analysis_discards_the_result() {
    let ws = Workspace::new();
    published(ws.open("file:///a.ch", "m: MODULE\nEND m;\n"));
    let pending = ws.begin_update("file:///a.ch", "m: MODULE\nEND m;\n").expect("open");
    assert!(ws.close("file:///a.ch"));
    assert!(matches!(ws.finish_update(pending), UpdateOutcome::Stale));
    assert!(ws.snapshot("file:///a.ch").is_none());
    assert!(ws.begin_update("file:///a.ch", "").is_none());
}

#[test]
fn seize_is_satisfied_by_another_open_document() {
    let ws = Workspace::new();
    published(ws.open("file:///lib.ch", LIB));
    let app = published(ws.open("file:///app.ch", APP));
    assert!(app.diagnostics.is_empty(), "{:#?}", app.diagnostics);

    let hover = app
        .hover_at(Position::new(2, 15))
        .expect("hover on the seized name");
    assert_eq!(hover.signature, "SYN limit INT");
    assert!(hover.notes.iter().any(|n| n.contains("Seized")));
}

#[test]
fn seize_resolves_after_the_granting_document_opens() {
    let ws = Workspace::new();
    let app = published(ws.open("file:///app.ch", APP));
    let codes: Vec<&str> = app.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, ["W0201"]);

    published(ws.open("file:///lib.ch", LIB));
    let app = published(ws.update("file:///app.ch", APP));
    assert!(app.diagnostics.is_empty(), "{:#?}", app.diagnostics);
}

#[test]
fn readers_always_see_a_complete_snapshot() {
    let ws = Workspace::new();
    let versions: Vec<String> = (0..8)
        .map(|n| format!("m: MODULE\n  DCL v{n} INT;\n  v{n} := {n};\nEND m;\n"))
        .collect();
    published(ws.open("file:///a.ch", &versions[0]));

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    let snapshot = ws.snapshot("file:///a.ch").expect("snapshot");
                    assert!(versions.contains(&snapshot.source));
                    assert!(snapshot.diagnostics.is_empty());
                    let outline = snapshot.document_symbols();
                    assert_eq!(outline[0].children.len(), 1);
                }
            });
        }
        for version in &versions[1..] {
            ws.update("file:///a.ch", version);
        }
    });

    let last = ws.snapshot("file:///a.ch").expect("snapshot");
    assert_eq!(last.source, versions[7]);
}
