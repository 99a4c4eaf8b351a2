//! Path resolution, route construction and hash/deep-link codecs.
//!
//! # Responsibility
//! - Walk segment paths down from the root, stacks first, sheet last.
//! - Build root-relative segment paths for stacks and sheets.
//! - Encode/decode the `#/seg/seg` hash form and the OS deep-link form.
//!
//! # Invariants
//! - Non-last segments only match stacks; the last tries stack then sheet.
//! - A miss anywhere yields `None`; callers pick the fallback deliberately.

use crate::model::node::{NodeId, NodeKind};
use crate::route::slug::{matches_segment, normalize_token, title_to_segment};
use crate::store::TreeStore;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Reserved first segment for the login view.
pub const LOGIN_TOKEN: &str = "login";
/// Legacy alias once used as a path prefix; stripped on resolve.
pub const LIBRARY_TOKEN: &str = "library";
/// Hash denoting the root library view.
pub const ROOT_HASH: &str = "#/";

// Mirrors encodeURIComponent: everything but alphanumerics and -_.!~*'()
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Where a resolved route points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Login,
    Library { stack_id: NodeId },
    Editor { sheet_id: NodeId },
}

fn find_child_by_segment(
    store: &TreeStore,
    parent_id: NodeId,
    kind: NodeKind,
    segment: &str,
) -> Option<NodeId> {
    let parent = store.node(parent_id)?.as_stack()?;
    parent
        .children
        .iter()
        .filter_map(|child_id| store.node(*child_id))
        .find(|child| child.kind() == kind && matches_segment(child, segment))
        .map(|child| child.id())
}

/// Resolves a decoded segment path against the tree.
///
/// Empty paths land on the root library; `login` is reserved; a leading
/// `library` alias is stripped. Returns `None` when any segment fails to
/// match, leaving the fallback decision to the caller.
pub fn resolve_route(store: &TreeStore, segments: &[String]) -> Option<RouteTarget> {
    let root_id = store.root_id();
    if segments.is_empty() {
        return Some(RouteTarget::Library { stack_id: root_id });
    }

    if normalize_token(&segments[0]) == LOGIN_TOKEN {
        return Some(RouteTarget::Login);
    }

    let path = if normalize_token(&segments[0]) == LIBRARY_TOKEN {
        &segments[1..]
    } else {
        segments
    };
    if path.is_empty() {
        return Some(RouteTarget::Library { stack_id: root_id });
    }

    store.node(root_id)?.as_stack()?;
    let mut current_stack = root_id;
    for (index, segment) in path.iter().enumerate() {
        let is_last = index == path.len() - 1;
        let stack_match = find_child_by_segment(store, current_stack, NodeKind::Stack, segment);

        if !is_last {
            current_stack = stack_match?;
            continue;
        }

        if let Some(stack_id) = stack_match {
            return Some(RouteTarget::Library { stack_id });
        }
        if let Some(sheet_id) =
            find_child_by_segment(store, current_stack, NodeKind::Sheet, segment)
        {
            return Some(RouteTarget::Editor { sheet_id });
        }
        return None;
    }

    Some(RouteTarget::Library { stack_id: root_id })
}

/// Root-relative segments for a stack, shallow to deep, root excluded.
pub fn stack_route_segments(store: &TreeStore, stack_id: NodeId) -> Vec<String> {
    store
        .stack_trail(stack_id)
        .iter()
        .filter_map(|id| store.node(*id))
        .map(|node| title_to_segment(node.title()))
        .collect()
}

/// Segments for a sheet: its ancestor stack path plus its own slug.
pub fn sheet_route_segments(store: &TreeStore, sheet_id: NodeId) -> Vec<String> {
    let Some(sheet) = store.node(sheet_id).and_then(|node| node.as_sheet()) else {
        return Vec::new();
    };
    let parent = sheet.parent_id.unwrap_or(store.root_id());
    let mut segments = stack_route_segments(store, parent);
    segments.push(title_to_segment(&sheet.title));
    segments
}

/// Builds the canonical hash form: `#/` for the root, otherwise
/// `#/seg1/seg2` with each segment percent-encoded.
pub fn build_hash(segments: &[String]) -> String {
    if segments.is_empty() {
        return ROOT_HASH.to_string();
    }
    let encoded: Vec<String> = segments
        .iter()
        .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
        .collect();
    format!("#/{}", encoded.join("/"))
}

/// Splits a `/a/b` path into decoded segments. A segment whose percent
/// escapes do not decode to UTF-8 is kept raw rather than dropped.
pub fn segments_from_path(path: &str) -> Vec<String> {
    let raw = path.trim();
    if raw.is_empty() || raw == "/" {
        return Vec::new();
    }
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        })
        .collect()
}

/// Splits a `#/a/b` hash into decoded segments.
pub fn segments_from_hash(hash: &str) -> Vec<String> {
    segments_from_path(hash.strip_prefix('#').unwrap_or(hash))
}

/// Converts an OS deep-link URL (`notations://a/b`) into the absolute path
/// form (`/a/b`) the route-apply entry point accepts. Segments stay
/// percent-encoded; decoding happens once, in `segments_from_path`.
///
/// Returns `None` for other schemes.
pub fn path_from_deep_link_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix("notations://")?;
    let rest = rest
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    Some(format!("/{}", segments.join("/")))
}
