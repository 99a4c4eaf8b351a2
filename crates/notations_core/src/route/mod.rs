//! Slug router: two-way mapping between tree paths and route segments.
//!
//! # Responsibility
//! - Derive URL-safe segments from human-authored titles.
//! - Resolve incoming segment paths back to stacks and sheets.
//!
//! # Invariants
//! - Resolution is read-only over the store and never panics; an unresolved
//!   route is `None`, distinct from "resolved to root".
//! - Colliding sibling titles resolve to the first child in display order;
//!   later siblings stay reachable through their id segment.

mod path;
mod slug;

pub use path::{
    build_hash, path_from_deep_link_url, resolve_route, segments_from_hash, segments_from_path,
    sheet_route_segments, stack_route_segments, RouteTarget, LIBRARY_TOKEN, LOGIN_TOKEN,
    ROOT_HASH,
};
pub use slug::{matches_segment, normalize_token, title_to_segment};
