//! Workspace snapshot: everything that persists between sessions.
//!
//! # Responsibility
//! - Define the serialized state shape (auth, settings, tree, pointers,
//!   UI flags) and its JSON codec.
//! - Normalize loaded snapshots: repair what can be repaired, reseed when
//!   the root is unrecoverable.
//!
//! # Invariants
//! - After `normalize`, `current_stack_id` resolves to a stack and
//!   `active_sheet_id` (when set) resolves to a sheet.
//! - A snapshot that cannot produce a valid root is discarded wholesale in
//!   favor of the seed; safety over preservation.

use crate::model::node::NodeId;
use crate::model::settings::Settings;
use crate::store::TreeStore;
use log::warn;
use serde::{Deserialize, Serialize};

/// Login gate state. Single-user; the username is cosmetic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthState {
    pub logged_in: bool,
    pub username: String,
}

/// Transient view preferences carried in the snapshot but not structural to
/// the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiFlags {
    pub selected_card_id: Option<NodeId>,
    pub settings_open: bool,
    pub tags_hidden: bool,
    pub zen_mode: bool,
    pub typewriter_mode: bool,
}

/// The full persisted application state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workspace {
    pub auth: AuthState,
    pub settings: Settings,
    #[serde(flatten)]
    pub store: TreeStore,
    pub current_stack_id: NodeId,
    pub active_sheet_id: Option<NodeId>,
    pub ui: UiFlags,
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace::seed()
    }
}

impl Workspace {
    /// Fresh default state around the seeded demo library.
    pub fn seed() -> Workspace {
        let store = TreeStore::seed();
        let current_stack_id = store.root_id();
        Workspace {
            auth: AuthState::default(),
            settings: Settings::default(),
            store,
            current_stack_id,
            active_sheet_id: None,
            ui: UiFlags::default(),
        }
    }

    /// Decodes a serialized snapshot, normalizing whatever was loaded.
    ///
    /// Any parse failure falls back to the seed; the user is never blocked
    /// by a bad snapshot.
    pub fn from_snapshot(raw: &str) -> Workspace {
        match serde_json::from_str::<Workspace>(raw) {
            Ok(mut workspace) => {
                workspace.normalize();
                workspace
            }
            Err(err) => {
                warn!("event=state_parse module=state status=error error={err}");
                Workspace::seed()
            }
        }
    }

    /// Encodes the snapshot for the persistence collaborator.
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Repairs structural pieces of a loaded snapshot and clamps settings.
    ///
    /// When the tree's root cannot be recovered the whole workspace is
    /// replaced by the seed.
    pub fn normalize(&mut self) {
        self.settings.normalize();
        if !self.store.repair(&self.settings.margins) {
            warn!("event=state_normalize module=state status=reseed reason=missing_root");
            *self = Workspace::seed();
            return;
        }

        let current_is_stack = self
            .store
            .node(self.current_stack_id)
            .map(|node| node.is_stack())
            .unwrap_or(false);
        if !current_is_stack {
            self.current_stack_id = self.store.root_id();
        }

        let active_is_sheet = self
            .active_sheet_id
            .and_then(|id| self.store.node(id))
            .map(|node| node.is_sheet())
            .unwrap_or(false);
        if !active_is_sheet {
            self.active_sheet_id = None;
        }

        let selected_exists = self
            .ui
            .selected_card_id
            .map(|id| self.store.contains(id))
            .unwrap_or(false);
        if !selected_exists {
            self.ui.selected_card_id = None;
        }
    }
}
