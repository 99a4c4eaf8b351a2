//! Core domain logic for Notations.
//! This crate is the single source of truth for tree and routing invariants.

pub mod logging;
pub mod model;
pub mod nav;
pub mod route;
pub mod state;
pub mod storage;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::node::{
    normalize_tag, safe_title, Margins, Node, NodeId, NodeKind, SheetNode, StackNode,
    TagOperation, UNTITLED_SHEET, UNTITLED_STACK,
};
pub use model::settings::{FontFamily, PaperSize, Settings};
pub use nav::{HashTransport, MemoryHashTransport, NavError, Navigator, View};
pub use route::{
    build_hash, path_from_deep_link_url, resolve_route, segments_from_hash, segments_from_path,
    sheet_route_segments, stack_route_segments, title_to_segment, RouteTarget,
};
pub use state::{AuthState, UiFlags, Workspace};
pub use storage::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use store::{TreeError, TreeResult, TreeStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
