//! Domain model for the stack/sheet tree.
//!
//! # Responsibility
//! - Define the canonical node shapes shared by store, router and navigation.
//! - Keep normalization helpers for titles, tags and margins in one place.
//!
//! # Invariants
//! - Every node carries a stable `NodeId` that is never reused.
//! - Sheet tags are unique case-insensitively and contain no blank entries.

pub mod node;
pub mod settings;
