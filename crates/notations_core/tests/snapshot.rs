use notations_core::{
    FileSnapshotStore, MemoryHashTransport, MemorySnapshotStore, Navigator, SnapshotStore,
    Workspace,
};
use serde_json::{json, Value};

#[test]
fn seed_round_trips_through_the_snapshot_codec() {
    let workspace = Workspace::seed();
    let blob = workspace.to_snapshot().unwrap();
    let restored = Workspace::from_snapshot(&blob);

    assert_eq!(restored.store.root_id(), workspace.store.root_id());
    assert_eq!(restored.store.len(), workspace.store.len());

    let root = workspace.store.root_id();
    assert_eq!(
        restored.store.stack(root).unwrap().children,
        workspace.store.stack(root).unwrap().children
    );
    assert_eq!(restored.settings, workspace.settings);
}

#[test]
fn snapshot_uses_the_historical_wire_schema() {
    let workspace = Workspace::seed();
    let value: Value = serde_json::from_str(&workspace.to_snapshot().unwrap()).unwrap();

    assert!(value["rootId"].is_string());
    assert!(value["containers"].is_object());
    assert!(value["auth"]["loggedIn"].is_boolean());
    assert!(value["settings"]["paperSize"].is_string());
    assert!(value["ui"]["settingsOpen"].is_boolean());

    let root_id = value["rootId"].as_str().unwrap();
    let root = &value["containers"][root_id];
    assert_eq!(root["kind"], "stack");
    assert_eq!(root["parentId"], Value::Null);
    assert!(root["children"].is_array());
}

#[test]
fn unknown_settings_fields_round_trip_unchanged() {
    let mut value: Value =
        serde_json::from_str(&Workspace::seed().to_snapshot().unwrap()).unwrap();
    value["settings"]["theme"] = json!("sepia");
    value["settings"]["experiments"] = json!({"columns": 2});

    let restored = Workspace::from_snapshot(&value.to_string());
    let out: Value = serde_json::from_str(&restored.to_snapshot().unwrap()).unwrap();

    assert_eq!(out["settings"]["theme"], "sepia");
    assert_eq!(out["settings"]["experiments"]["columns"], 2);
    // Known siblings were not discarded along the way.
    assert!(out["settings"]["paperSize"].is_string());
}

#[test]
fn dangling_children_and_bad_pointers_are_repaired() {
    let workspace = Workspace::seed();
    let root_id = workspace.store.root_id().to_string();
    let mut value: Value = serde_json::from_str(&workspace.to_snapshot().unwrap()).unwrap();

    // A child id that resolves to nothing, a bogus current pointer, and an
    // active sheet that does not exist.
    value["containers"][&root_id]["children"]
        .as_array_mut()
        .unwrap()
        .push(json!("11111111-2222-4333-8444-555555555555"));
    value["currentStackId"] = json!("11111111-2222-4333-8444-555555555555");
    value["activeSheetId"] = json!("11111111-2222-4333-8444-555555555555");

    let restored = Workspace::from_snapshot(&value.to_string());

    assert_eq!(restored.current_stack_id, restored.store.root_id());
    assert_eq!(restored.active_sheet_id, None);
    for (_, node) in restored.store.iter() {
        if let Some(stack) = node.as_stack() {
            for child in &stack.children {
                assert!(restored.store.contains(*child));
            }
        }
    }
}

#[test]
fn nodes_unreachable_from_root_are_pruned() {
    let workspace = Workspace::seed();
    let mut value: Value = serde_json::from_str(&workspace.to_snapshot().unwrap()).unwrap();

    // An orphan sheet present in the map but in nobody's children.
    value["containers"]["99999999-8888-4777-8666-555555555555"] = json!({
        "kind": "sheet",
        "id": "99999999-8888-4777-8666-555555555555",
        "parentId": null,
        "title": "Orphan",
        "body": ""
    });

    let restored = Workspace::from_snapshot(&value.to_string());
    for (_, node) in restored.store.iter() {
        assert_ne!(node.title(), "Orphan");
    }
}

#[test]
fn sheet_tags_and_margins_are_normalized_on_load() {
    let mut store = notations_core::TreeStore::new("Notations");
    let root = store.root_id();
    let sheet = store.create_sheet("Messy", "", root, "").unwrap();
    let sheet_key = sheet.to_string();

    let workspace = Workspace {
        store,
        ..Workspace::seed()
    };
    let mut value: Value = serde_json::from_str(&workspace.to_snapshot().unwrap()).unwrap();
    value["containers"][&sheet_key]["tags"] =
        json!(["Work", "  work ", "", "Ideas", "ideas", "  "]);
    value["containers"][&sheet_key]["margins"] = json!({
        "top": -4.0,
        "right": 1.119,
        "bottom": 0.75,
        "left": 0.42
    });

    let restored = Workspace::from_snapshot(&value.to_string());
    let restored_sheet = restored.store.sheet(sheet).unwrap();
    assert_eq!(restored_sheet.tags, vec!["Work".to_string(), "Ideas".to_string()]);
    assert!(restored_sheet.margins.top >= 0.0);
    assert_eq!(restored_sheet.margins.right, 1.12);
}

#[test]
fn snapshot_missing_the_root_reseeds() {
    let mut value: Value =
        serde_json::from_str(&Workspace::seed().to_snapshot().unwrap()).unwrap();
    value["rootId"] = json!("11111111-2222-4333-8444-555555555555");

    let restored = Workspace::from_snapshot(&value.to_string());
    // A seed store always resolves its own root.
    assert!(restored.store.contains(restored.store.root_id()));
    assert_eq!(restored.current_stack_id, restored.store.root_id());
}

#[test]
fn navigator_seeds_when_nothing_was_persisted() {
    let nav = Navigator::load(MemorySnapshotStore::new(), MemoryHashTransport::new());

    assert!(!nav.workspace().auth.logged_in);
    assert!(nav.workspace().store.len() > 1);
}

#[test]
fn navigator_seeds_on_corrupt_blobs() {
    let nav = Navigator::load(
        MemorySnapshotStore::with_blob("{\"rootId\": 42"),
        MemoryHashTransport::new(),
    );

    assert!(nav.workspace().store.contains(nav.workspace().store.root_id()));
}

#[test]
fn file_store_round_trips_and_cleans_its_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notations-state.json");
    let mut store = FileSnapshotStore::new(&path);

    assert_eq!(store.load(), None);

    let blob = Workspace::seed().to_snapshot().unwrap();
    assert!(store.save(&blob));
    assert!(store.save(&blob));
    assert_eq!(store.load().as_deref(), Some(blob.as_str()));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("notations-state.json")]);
}

#[test]
fn file_store_save_failure_reports_false_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    // The parent of the target path does not exist; writes cannot land.
    let mut store = FileSnapshotStore::new(dir.path().join("missing").join("state.json"));

    assert!(!store.save("{}"));
    assert_eq!(store.load(), None);
}
