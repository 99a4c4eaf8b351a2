//! Navigation controller: view transitions, hash sync, deep links.
//!
//! # Responsibility
//! - Orchestrate login/library/editor transitions over the tree store.
//! - Mirror state into the external hash and persist after each mutation.
//! - Reconcile externally triggered routes (hash changes, OS deep links).
//!
//! # Invariants
//! - Programmatic hash writes are tagged; an incoming change notification
//!   matching the last written value is consumed, not re-applied.
//! - A deep link arriving before startup is held in a single pending slot
//!   (most recent wins) and replayed exactly once.
//! - Unresolved routes fall back to the root library, never to a guess.

use crate::model::node::{normalize_tag, Margins, NodeId, UNTITLED_SHEET, UNTITLED_STACK};
use crate::route::{
    build_hash, resolve_route, segments_from_hash, segments_from_path, sheet_route_segments,
    stack_route_segments, RouteTarget, LOGIN_TOKEN, ROOT_HASH,
};
use crate::state::Workspace;
use crate::storage::SnapshotStore;
use crate::store::TreeError;
use log::{debug, error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// External hash/URL representation seam.
///
/// The navigation controller pushes canonical hashes through this; the
/// embedding shell applies them to whatever owns the real location bar.
pub trait HashTransport {
    fn write_hash(&mut self, hash: &str);
}

/// Recording transport for tests and headless embedding.
#[derive(Debug, Default)]
pub struct MemoryHashTransport {
    pub writes: Vec<String>,
}

impl MemoryHashTransport {
    pub fn new() -> MemoryHashTransport {
        MemoryHashTransport::default()
    }

    pub fn last(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }
}

impl HashTransport for MemoryHashTransport {
    fn write_hash(&mut self, hash: &str) {
        self.writes.push(hash.to_string());
    }
}

/// The three top-level views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Library,
    Editor,
}

/// Errors from navigation commands. `Display` renders the transient status
/// text shown to the user; raw internals never surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// A command needing an open sheet ran without one.
    NoActiveSheet,
    /// Tag input was blank after normalization.
    BlankTag,
    /// The tag is already on the sheet.
    DuplicateTag(String),
    /// The tag is not on the sheet.
    UnknownTag(String),
    /// Move target equals the sheet's current stack.
    AlreadyInStack { sheet: String, stack: String },
    /// Structural-reference failure from the tree store.
    Tree(TreeError),
}

impl Display for NavError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveSheet => write!(f, "open a notation first"),
            Self::BlankTag => write!(f, "enter a tag name"),
            Self::DuplicateTag(tag) => write!(f, "tag \"{tag}\" already exists"),
            Self::UnknownTag(tag) => write!(f, "tag \"{tag}\" not found"),
            Self::AlreadyInStack { sheet, stack } => {
                write!(f, "\"{sheet}\" is already in {stack}")
            }
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for NavError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// View-state machine over one workspace, one persistence collaborator and
/// one hash transport. Explicit instance; nothing global.
pub struct Navigator<S: SnapshotStore, H: HashTransport> {
    workspace: Workspace,
    snapshots: S,
    hash: H,
    view: View,
    /// Our belief of the external hash value.
    external_hash: Option<String>,
    /// Last-write token for suppressing feedback from our own writes.
    last_written_hash: Option<String>,
    pending_deep_link: Option<String>,
    ready: bool,
}

impl<S: SnapshotStore, H: HashTransport> Navigator<S, H> {
    pub fn new(workspace: Workspace, snapshots: S, hash: H) -> Navigator<S, H> {
        let view = if workspace.auth.logged_in {
            View::Library
        } else {
            View::Login
        };
        Navigator {
            workspace,
            snapshots,
            hash,
            view,
            external_hash: None,
            last_written_hash: None,
            pending_deep_link: None,
            ready: false,
        }
    }

    /// Loads the persisted snapshot (seeding on absence or failure) and
    /// wraps it in a controller.
    pub fn load(snapshots: S, hash: H) -> Navigator<S, H> {
        let workspace = match snapshots.load() {
            Some(raw) => Workspace::from_snapshot(&raw),
            None => Workspace::seed(),
        };
        Navigator::new(workspace, snapshots, hash)
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn hash_transport(&self) -> &H {
        &self.hash
    }

    pub fn pending_deep_link(&self) -> Option<&str> {
        self.pending_deep_link.as_deref()
    }

    /// Finishes initial load: replays a queued deep link, then the location
    /// hash, then falls back to persisted pointers.
    ///
    /// Precedence mirrors interactive behavior: deep link > hash > login
    /// gate > active sheet > current stack > root.
    pub fn startup(&mut self, location_hash: Option<&str>) {
        self.ready = true;

        if let Some(path) = self.pending_deep_link.take() {
            let segments = segments_from_path(&path);
            if self.apply_route_segments(&segments, true, true) {
                return;
            }
        }

        if let Some(raw_hash) = location_hash {
            if !raw_hash.is_empty() && raw_hash != "#" {
                self.external_hash = Some(raw_hash.to_string());
                let segments = segments_from_hash(raw_hash);
                if self.apply_route_segments(&segments, true, true) {
                    return;
                }
            }
        }

        if !self.workspace.auth.logged_in {
            self.view = View::Login;
            self.sync_hash();
            return;
        }

        if let Some(sheet_id) = self.workspace.active_sheet_id {
            if self.go_sheet(sheet_id, true, false) {
                return;
            }
        }

        let fallback = self.valid_current_stack();
        self.go_library(fallback, true, false);
    }

    /// Applies an incoming hash-change notification.
    ///
    /// A value matching our last programmatic write is our own echo; it is
    /// consumed without re-resolving the route.
    pub fn handle_hash_change(&mut self, raw_hash: &str) {
        self.external_hash = Some(raw_hash.to_string());
        if self.last_written_hash.as_deref() == Some(raw_hash) {
            self.last_written_hash = None;
            return;
        }
        let segments = segments_from_hash(raw_hash);
        if !self.apply_route_segments(&segments, true, true) {
            let root = self.workspace.store.root_id();
            self.go_library(root, true, true);
        }
    }

    /// Applies an OS deep-link path (`/seg/seg`). Before startup completes
    /// the path is queued; a newer link overwrites an older queued one.
    pub fn handle_deep_link(&mut self, path: &str) {
        if !self.ready {
            debug!("event=deep_link module=nav status=queued path={path}");
            self.pending_deep_link = Some(path.to_string());
            return;
        }
        let segments = segments_from_path(path);
        if !self.apply_route_segments(&segments, true, true) {
            let root = self.workspace.store.root_id();
            self.go_library(root, true, true);
        }
    }

    /// Marks the session authenticated, then replays the current hash route
    /// or falls back to the last browsed stack.
    pub fn login(&mut self, username: &str) {
        self.workspace.auth.logged_in = true;
        self.workspace.auth.username = username.trim().to_string();
        self.workspace.ui.selected_card_id = None;
        self.persist();

        let segments = self
            .external_hash
            .clone()
            .map(|hash| segments_from_hash(&hash))
            .unwrap_or_default();
        if !self.apply_route_segments(&segments, true, true) {
            let fallback = self.valid_current_stack();
            self.go_library(fallback, true, true);
        }
    }

    pub fn navigate_to_library(&mut self, stack_id: NodeId) -> bool {
        self.go_library(stack_id, true, true)
    }

    pub fn navigate_to_sheet(&mut self, sheet_id: NodeId) -> bool {
        self.go_sheet(sheet_id, true, true)
    }

    pub fn navigate_to_login(&mut self) {
        self.workspace.active_sheet_id = None;
        self.workspace.current_stack_id = self.workspace.store.root_id();
        self.workspace.ui.selected_card_id = None;
        self.view = View::Login;
        self.persist();
        self.sync_hash();
    }

    /// Creates a sheet at the front of the current stack.
    pub fn create_sheet_in_current(&mut self) -> Result<NodeId, NavError> {
        let parent = self.valid_current_stack();
        let id = self
            .workspace
            .store
            .create_sheet(UNTITLED_SHEET, "", parent, "")?;
        self.workspace.ui.selected_card_id = Some(id);
        self.persist();
        Ok(id)
    }

    /// Creates a stack at the front of the current stack.
    pub fn create_stack_in_current(&mut self) -> Result<NodeId, NavError> {
        let parent = self.valid_current_stack();
        let id = self.workspace.store.create_stack(UNTITLED_STACK, parent)?;
        self.workspace.ui.selected_card_id = Some(id);
        self.persist();
        Ok(id)
    }

    /// Renames the open sheet. `Ok(false)` when the coerced title is
    /// unchanged; the hash is re-synced on change since the slug moved.
    pub fn rename_active_sheet(&mut self, raw_title: &str) -> Result<bool, NavError> {
        let sheet_id = self.active_sheet()?;
        let changed = self.workspace.store.rename(sheet_id, raw_title)?;
        if changed {
            self.persist();
            self.sync_hash();
        }
        Ok(changed)
    }

    /// Moves the open sheet into another stack and follows it there.
    pub fn move_active_sheet(&mut self, target_stack_id: NodeId) -> Result<(), NavError> {
        let sheet_id = self.active_sheet()?;
        let sheet_title = self
            .workspace
            .store
            .sheet(sheet_id)
            .map(|sheet| sheet.title.clone())?;
        let stack_title = self
            .workspace
            .store
            .stack(target_stack_id)
            .map(|stack| stack.title.clone())?;

        let moved = self.workspace.store.move_sheet(sheet_id, target_stack_id)?;
        if !moved {
            return Err(NavError::AlreadyInStack {
                sheet: sheet_title,
                stack: stack_title,
            });
        }
        self.persist();
        self.go_sheet(sheet_id, true, false);
        Ok(())
    }

    /// Deletes a node and its descendants, clearing any pointers into the
    /// removed subtree.
    pub fn delete_cascade(&mut self, node_id: NodeId) -> Result<(), NavError> {
        let removed = self.workspace.store.delete_cascade(node_id)?;
        self.clear_removed_pointers(&removed);
        self.persist();
        self.sync_hash();
        Ok(())
    }

    /// Deletes a stack while relocating its sheets to the root.
    pub fn unstack_and_delete(&mut self, stack_id: NodeId) -> Result<(), NavError> {
        let removed = self.workspace.store.unstack_and_delete(stack_id)?;
        self.clear_removed_pointers(&removed);
        self.persist();
        self.sync_hash();
        Ok(())
    }

    /// Adds a tag to the open sheet, returning the normalized tag.
    pub fn add_tag_to_active(&mut self, raw_tag: &str) -> Result<String, NavError> {
        let sheet_id = self.active_sheet()?;
        let tag = normalize_tag(raw_tag);
        if tag.is_empty() {
            return Err(NavError::BlankTag);
        }
        if !self.workspace.store.add_tag(sheet_id, &tag)? {
            return Err(NavError::DuplicateTag(tag));
        }
        self.persist();
        Ok(tag)
    }

    /// Removes a tag from the open sheet, returning the normalized tag.
    pub fn remove_tag_from_active(&mut self, raw_tag: &str) -> Result<String, NavError> {
        let sheet_id = self.active_sheet()?;
        let tag = normalize_tag(raw_tag);
        if tag.is_empty() {
            return Err(NavError::BlankTag);
        }
        if !self.workspace.store.remove_tag(sheet_id, &tag)? {
            return Err(NavError::UnknownTag(tag));
        }
        self.persist();
        Ok(tag)
    }

    /// Applies a `+tag` / `-tag` / bare `tag` command to the open sheet,
    /// persisting on success.
    pub fn apply_tag_to_active(&mut self, input: &str) -> Result<bool, NavError> {
        let sheet_id = self.active_sheet()?;
        let changed = self.workspace.store.apply_tag_operation(sheet_id, input)?;
        if changed {
            self.persist();
        }
        Ok(changed)
    }

    /// Replaces the open sheet's body.
    pub fn update_active_body(&mut self, body: &str) -> Result<(), NavError> {
        let sheet_id = self.active_sheet()?;
        self.workspace.store.update_body(sheet_id, body)?;
        self.persist();
        Ok(())
    }

    /// Stores normalized margins on the open sheet.
    pub fn set_active_margins(&mut self, margins: Margins) -> Result<Margins, NavError> {
        let sheet_id = self.active_sheet()?;
        let normalized = self.workspace.store.set_sheet_margins(sheet_id, margins)?;
        self.persist();
        Ok(normalized)
    }

    pub fn toggle_settings_open(&mut self) -> bool {
        self.workspace.ui.settings_open = !self.workspace.ui.settings_open;
        self.persist();
        self.workspace.ui.settings_open
    }

    pub fn set_zen_mode(&mut self, enabled: bool) {
        self.workspace.ui.zen_mode = enabled;
        self.persist();
    }

    pub fn set_typewriter_mode(&mut self, enabled: bool) {
        self.workspace.ui.typewriter_mode = enabled;
        self.persist();
    }

    pub fn toggle_tags_hidden(&mut self) -> bool {
        self.workspace.ui.tags_hidden = !self.workspace.ui.tags_hidden;
        self.persist();
        self.workspace.ui.tags_hidden
    }

    fn active_sheet(&self) -> Result<NodeId, NavError> {
        self.workspace
            .active_sheet_id
            .ok_or(NavError::NoActiveSheet)
    }

    fn valid_current_stack(&self) -> NodeId {
        let current = self.workspace.current_stack_id;
        let is_stack = self
            .workspace
            .store
            .node(current)
            .map(|node| node.is_stack())
            .unwrap_or(false);
        if is_stack {
            current
        } else {
            self.workspace.store.root_id()
        }
    }

    fn clear_removed_pointers(&mut self, removed: &[NodeId]) {
        let root = self.workspace.store.root_id();
        if self
            .workspace
            .active_sheet_id
            .map(|id| removed.contains(&id))
            .unwrap_or(false)
        {
            self.workspace.active_sheet_id = None;
        }
        if removed.contains(&self.workspace.current_stack_id) {
            self.workspace.current_stack_id = root;
        }
        if self
            .workspace
            .ui
            .selected_card_id
            .map(|id| removed.contains(&id))
            .unwrap_or(false)
        {
            self.workspace.ui.selected_card_id = None;
        }
        if self.view == View::Editor && self.workspace.active_sheet_id.is_none() {
            self.view = View::Library;
        }
    }

    fn go_library(&mut self, stack_id: NodeId, sync: bool, persist: bool) -> bool {
        let is_stack = self
            .workspace
            .store
            .node(stack_id)
            .map(|node| node.is_stack())
            .unwrap_or(false);
        if !is_stack {
            return false;
        }
        self.workspace.current_stack_id = stack_id;
        self.workspace.active_sheet_id = None;
        self.workspace.ui.selected_card_id = if stack_id == self.workspace.store.root_id() {
            None
        } else {
            Some(stack_id)
        };
        self.view = View::Library;
        debug!("event=navigate module=nav view=library stack={stack_id}");
        if persist {
            self.persist();
        }
        if sync {
            self.sync_hash();
        }
        true
    }

    fn go_sheet(&mut self, sheet_id: NodeId, sync: bool, persist: bool) -> bool {
        let parent = match self.workspace.store.node(sheet_id) {
            Some(node) if node.is_sheet() => {
                node.parent_id().unwrap_or(self.workspace.store.root_id())
            }
            _ => return false,
        };
        self.workspace.active_sheet_id = Some(sheet_id);
        self.workspace.current_stack_id = parent;
        self.workspace.ui.selected_card_id = Some(sheet_id);
        self.view = View::Editor;
        debug!("event=navigate module=nav view=editor sheet={sheet_id}");
        if persist {
            self.persist();
        }
        if sync {
            self.sync_hash();
        }
        true
    }

    fn apply_route_segments(&mut self, segments: &[String], sync: bool, persist: bool) -> bool {
        let Some(resolved) = resolve_route(&self.workspace.store, segments) else {
            return false;
        };

        if let RouteTarget::Login = resolved {
            if !self.workspace.auth.logged_in {
                if sync {
                    self.write_hash_if_changed(build_hash(&[LOGIN_TOKEN.to_string()]));
                }
                self.view = View::Login;
                return true;
            }
            let root = self.workspace.store.root_id();
            return self.go_library(root, sync, persist);
        }

        if !self.workspace.auth.logged_in {
            // Keep the requested route in the hash so login can replay it.
            if sync {
                self.write_hash_if_changed(build_hash(segments));
            }
            self.view = View::Login;
            return true;
        }

        match resolved {
            RouteTarget::Library { stack_id } => self.go_library(stack_id, sync, persist),
            RouteTarget::Editor { sheet_id } => self.go_sheet(sheet_id, sync, persist),
            RouteTarget::Login => false,
        }
    }

    /// Canonical hash for the current state.
    fn canonical_hash(&self) -> String {
        if !self.workspace.auth.logged_in {
            return build_hash(&[LOGIN_TOKEN.to_string()]);
        }
        if let Some(sheet_id) = self.workspace.active_sheet_id {
            return build_hash(&sheet_route_segments(&self.workspace.store, sheet_id));
        }
        let current = self.workspace.current_stack_id;
        if current == self.workspace.store.root_id() {
            return ROOT_HASH.to_string();
        }
        build_hash(&stack_route_segments(&self.workspace.store, current))
    }

    fn sync_hash(&mut self) {
        let next = self.canonical_hash();
        self.write_hash_if_changed(next);
    }

    fn write_hash_if_changed(&mut self, next: String) {
        if self.external_hash.as_deref() == Some(next.as_str()) {
            return;
        }
        self.hash.write_hash(&next);
        self.external_hash = Some(next.clone());
        self.last_written_hash = Some(next);
    }

    fn persist(&mut self) {
        match self.workspace.to_snapshot() {
            Ok(blob) => {
                if !self.snapshots.save(&blob) {
                    warn!("event=state_save module=nav status=dropped");
                }
            }
            Err(err) => {
                error!("event=state_encode module=nav status=error error={err}");
            }
        }
    }
}
