use notations_core::{
    MemoryHashTransport, MemorySnapshotStore, NavError, Navigator, NodeId, View, Workspace,
};

/// Logged-in navigator over the seed library, plus the ids of the demo
/// "Food Notes" stack and its recipe sheet.
fn seeded_navigator() -> (
    Navigator<MemorySnapshotStore, MemoryHashTransport>,
    NodeId,
    NodeId,
) {
    let mut workspace = Workspace::seed();
    workspace.auth.logged_in = true;

    let food = find_by_title(&workspace, "Food Notes");
    let recipe = find_by_title(&workspace, "Huckleberry Pie Recipe");

    let nav = Navigator::new(workspace, MemorySnapshotStore::new(), MemoryHashTransport::new());
    (nav, food, recipe)
}

fn find_by_title(workspace: &Workspace, title: &str) -> NodeId {
    workspace
        .store
        .iter()
        .find(|(_, node)| node.title() == title)
        .map(|(id, _)| *id)
        .unwrap_or_else(|| panic!("seed should contain \"{title}\""))
}

#[test]
fn library_navigation_sets_pointers_and_syncs_the_hash() {
    let (mut nav, food, _) = seeded_navigator();

    assert!(nav.navigate_to_library(food));

    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, food);
    assert_eq!(nav.workspace().active_sheet_id, None);
    assert_eq!(nav.workspace().ui.selected_card_id, Some(food));
    assert_eq!(nav.hash_transport().last(), Some("#/food-notes"));
}

#[test]
fn sheet_navigation_derives_the_current_stack() {
    let (mut nav, food, recipe) = seeded_navigator();

    assert!(nav.navigate_to_sheet(recipe));

    assert_eq!(nav.view(), View::Editor);
    assert_eq!(nav.workspace().active_sheet_id, Some(recipe));
    assert_eq!(nav.workspace().current_stack_id, food);
}

#[test]
fn navigation_to_unknown_ids_is_refused() {
    let (mut nav, _, recipe) = seeded_navigator();
    let before_stack = nav.workspace().current_stack_id;

    assert!(!nav.navigate_to_library(recipe));
    assert!(!nav.navigate_to_sheet(uuid::Uuid::new_v4()));
    assert_eq!(nav.workspace().current_stack_id, before_stack);
}

#[test]
fn hash_changes_resolve_routes() {
    let (mut nav, food, recipe) = seeded_navigator();

    nav.handle_hash_change("#/food-notes/huckleberry-pie-recipe");
    assert_eq!(nav.view(), View::Editor);
    assert_eq!(nav.workspace().active_sheet_id, Some(recipe));

    nav.handle_hash_change("#/food-notes");
    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, food);
}

#[test]
fn unresolved_hash_changes_fall_back_to_root() {
    let (mut nav, food, _) = seeded_navigator();
    nav.navigate_to_library(food);

    nav.handle_hash_change("#/no-such-stack/no-such-sheet");

    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, nav.workspace().store.root_id());
}

#[test]
fn own_hash_writes_are_not_reapplied_as_navigation() {
    let (mut nav, food, recipe) = seeded_navigator();

    // Two quick programmatic transitions; the transport now carries the
    // hash for the sheet view.
    nav.navigate_to_library(food);
    nav.navigate_to_sheet(recipe);
    let writes_before = nav.hash_transport().writes.len();

    // The echo for the last write must be consumed silently.
    nav.handle_hash_change("#/food-notes/huckleberry-pie-recipe");
    assert_eq!(nav.view(), View::Editor);
    assert_eq!(nav.workspace().active_sheet_id, Some(recipe));
    assert_eq!(nav.hash_transport().writes.len(), writes_before);

    // A later identical value is no longer our echo: it re-resolves, which
    // lands on the same state without another hash write.
    nav.handle_hash_change("#/food-notes/huckleberry-pie-recipe");
    assert_eq!(nav.workspace().active_sheet_id, Some(recipe));
    assert_eq!(nav.hash_transport().writes.len(), writes_before);
}

#[test]
fn stale_echoes_of_older_writes_navigate_again() {
    let (mut nav, food, recipe) = seeded_navigator();
    nav.navigate_to_library(food);
    nav.navigate_to_sheet(recipe);

    // Only the most recent write is suppressed; an echo of the older write
    // is treated as a genuine incoming navigation.
    nav.handle_hash_change("#/food-notes");
    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, food);
}

#[test]
fn routes_while_logged_out_show_login_and_replay_after_login() {
    let mut workspace = Workspace::seed();
    let food = find_by_title(&workspace, "Food Notes");
    workspace.auth.logged_in = false;
    let mut nav = Navigator::new(
        workspace,
        MemorySnapshotStore::new(),
        MemoryHashTransport::new(),
    );

    nav.handle_hash_change("#/food-notes");
    assert_eq!(nav.view(), View::Login);

    nav.login("ann");
    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, food);
    assert_eq!(nav.workspace().auth.username, "ann");
}

#[test]
fn login_route_while_authenticated_falls_back_to_root_library() {
    let (mut nav, _, _) = seeded_navigator();

    nav.handle_hash_change("#/login");

    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, nav.workspace().store.root_id());
}

#[test]
fn deep_link_before_startup_is_queued_and_applied_once() {
    let (mut nav, food, recipe) = seeded_navigator();

    // Arrives before the UI is ready: queued, not applied.
    nav.handle_deep_link("/food-notes/huckleberry-pie-recipe");
    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.pending_deep_link(), Some("/food-notes/huckleberry-pie-recipe"));

    nav.startup(None);
    assert_eq!(nav.view(), View::Editor);
    assert_eq!(nav.workspace().active_sheet_id, Some(recipe));
    assert_eq!(nav.pending_deep_link(), None);

    // An unrelated later hash change must not replay the deep link.
    nav.handle_hash_change("#/");
    assert_eq!(nav.view(), View::Library);
    assert_eq!(nav.workspace().current_stack_id, nav.workspace().store.root_id());
    assert_ne!(nav.workspace().current_stack_id, food);
}

#[test]
fn newer_queued_deep_link_overwrites_the_older_one() {
    let (mut nav, food, _) = seeded_navigator();

    nav.handle_deep_link("/poems");
    nav.handle_deep_link("/food-notes");
    nav.startup(None);

    assert_eq!(nav.workspace().current_stack_id, food);
}

#[test]
fn deep_links_after_startup_apply_immediately() {
    let (mut nav, food, _) = seeded_navigator();
    nav.startup(None);

    nav.handle_deep_link("/food-notes");
    assert_eq!(nav.workspace().current_stack_id, food);

    nav.handle_deep_link("/nowhere");
    assert_eq!(nav.workspace().current_stack_id, nav.workspace().store.root_id());
}

#[test]
fn startup_without_routes_restores_persisted_pointers() {
    let (mut nav, _, recipe) = seeded_navigator();
    nav.navigate_to_sheet(recipe);

    // Simulate a fresh process over the saved snapshot.
    let blob = nav.workspace().to_snapshot().unwrap();
    let mut restored = Navigator::load(
        MemorySnapshotStore::with_blob(blob),
        MemoryHashTransport::new(),
    );
    restored.startup(None);

    assert_eq!(restored.view(), View::Editor);
    assert_eq!(restored.workspace().active_sheet_id, Some(recipe));
}

#[test]
fn startup_prefers_the_location_hash_over_persisted_pointers() {
    let (mut nav, food, recipe) = seeded_navigator();
    nav.navigate_to_sheet(recipe);
    let blob = nav.workspace().to_snapshot().unwrap();

    let mut restored = Navigator::load(
        MemorySnapshotStore::with_blob(blob),
        MemoryHashTransport::new(),
    );
    restored.startup(Some("#/food-notes"));

    assert_eq!(restored.view(), View::Library);
    assert_eq!(restored.workspace().current_stack_id, food);
}

#[test]
fn logged_out_startup_lands_on_login() {
    let workspace = Workspace::seed();
    let mut nav = Navigator::new(
        workspace,
        MemorySnapshotStore::new(),
        MemoryHashTransport::new(),
    );

    nav.startup(None);
    assert_eq!(nav.view(), View::Login);
}

#[test]
fn deleting_the_open_sheet_resets_active_pointers() {
    let (mut nav, food, recipe) = seeded_navigator();
    nav.navigate_to_sheet(recipe);

    nav.delete_cascade(recipe).unwrap();

    assert_eq!(nav.workspace().active_sheet_id, None);
    assert_eq!(nav.view(), View::Library);
    assert!(!nav.workspace().store.contains(recipe));
    // The surrounding stack is untouched.
    assert!(nav.workspace().store.contains(food));
}

#[test]
fn deleting_the_current_stack_falls_back_to_root() {
    let (mut nav, food, _) = seeded_navigator();
    nav.navigate_to_library(food);

    nav.delete_cascade(food).unwrap();

    assert_eq!(nav.workspace().current_stack_id, nav.workspace().store.root_id());
    assert_eq!(nav.workspace().ui.selected_card_id, None);
}

#[test]
fn unstacking_the_current_stack_keeps_its_sheets() {
    let (mut nav, food, recipe) = seeded_navigator();
    nav.navigate_to_library(food);

    nav.unstack_and_delete(food).unwrap();

    let root = nav.workspace().store.root_id();
    assert_eq!(nav.workspace().current_stack_id, root);
    assert!(!nav.workspace().store.contains(food));
    assert_eq!(
        nav.workspace().store.sheet(recipe).unwrap().parent_id,
        Some(root)
    );
}

#[test]
fn move_command_reports_already_in_stack() {
    let (mut nav, food, recipe) = seeded_navigator();
    nav.navigate_to_sheet(recipe);

    let err = nav.move_active_sheet(food).unwrap_err();
    assert!(matches!(err, NavError::AlreadyInStack { .. }));
    assert!(err.to_string().contains("already in"));
}

#[test]
fn move_command_follows_the_sheet_to_its_new_stack() {
    let (mut nav, _, recipe) = seeded_navigator();
    let poems = find_by_title(nav.workspace(), "Poems");
    nav.navigate_to_sheet(recipe);

    nav.move_active_sheet(poems).unwrap();

    assert_eq!(nav.view(), View::Editor);
    assert_eq!(nav.workspace().active_sheet_id, Some(recipe));
    assert_eq!(nav.workspace().current_stack_id, poems);
}

#[test]
fn tag_commands_surface_duplicate_and_missing_tags() {
    let (mut nav, _, recipe) = seeded_navigator();
    nav.navigate_to_sheet(recipe);

    assert_eq!(nav.add_tag_to_active(" Pie ").unwrap(), "Pie");
    assert_eq!(
        nav.add_tag_to_active("pie").unwrap_err(),
        NavError::DuplicateTag("pie".to_string())
    );
    assert_eq!(
        nav.remove_tag_from_active("crumble").unwrap_err(),
        NavError::UnknownTag("crumble".to_string())
    );
    assert_eq!(nav.add_tag_to_active("   ").unwrap_err(), NavError::BlankTag);

    assert!(nav.apply_tag_to_active("-pie").unwrap());
    assert!(nav
        .workspace()
        .store
        .sheet(recipe)
        .unwrap()
        .tags
        .is_empty());
}

#[test]
fn tag_commands_require_an_open_sheet() {
    let (mut nav, _, _) = seeded_navigator();

    assert_eq!(nav.add_tag_to_active("x").unwrap_err(), NavError::NoActiveSheet);
    assert_eq!(nav.apply_tag_to_active("x").unwrap_err(), NavError::NoActiveSheet);
    assert_eq!(nav.rename_active_sheet("x").unwrap_err(), NavError::NoActiveSheet);
}

#[test]
fn rename_command_reports_whether_anything_changed() {
    let (mut nav, _, recipe) = seeded_navigator();
    nav.navigate_to_sheet(recipe);

    assert!(!nav.rename_active_sheet("Huckleberry Pie Recipe").unwrap());
    assert!(nav.rename_active_sheet("Blueberry Pie Recipe").unwrap());
    assert_eq!(
        nav.workspace().store.sheet(recipe).unwrap().title,
        "Blueberry Pie Recipe"
    );
}

#[test]
fn create_commands_land_in_the_current_stack() {
    let (mut nav, food, _) = seeded_navigator();
    nav.navigate_to_library(food);

    let sheet = nav.create_sheet_in_current().unwrap();
    let stack = nav.create_stack_in_current().unwrap();

    let children = nav.workspace().store.stack(food).unwrap().children.clone();
    assert_eq!(children[0], stack);
    assert_eq!(children[1], sheet);
    assert_eq!(nav.workspace().ui.selected_card_id, Some(stack));
}
