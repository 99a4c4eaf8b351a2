//! Tree store: the single writer over the node arena.
//!
//! # Responsibility
//! - Own every node value and keep the id map and children arrays in sync.
//! - Expose the full mutation surface; nothing outside this module edits
//!   `parent_id` or `children` directly.
//!
//! # Invariants
//! - Exactly one root stack; it is never moved or deleted.
//! - Every non-root node is listed exactly once in its parent's children.

mod tree;

pub use tree::{TreeError, TreeResult, TreeStore};
