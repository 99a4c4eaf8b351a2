//! Stack/sheet node model.
//!
//! # Responsibility
//! - Define the tagged `Node` union and its creation factories.
//! - Provide sheet-level tag and margin normalization.
//!
//! # Invariants
//! - `id` is stable for the node lifetime and unique across both kinds.
//! - `parent_id` is `None` only for the root stack.
//! - `title` is never blank; blank input coerces to a kind-specific fallback.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier shared by stacks and sheets.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NodeId = Uuid;

/// Fallback title for sheets created or renamed with blank input.
pub const UNTITLED_SHEET: &str = "Untitled";
/// Fallback title for stacks created or renamed with blank input.
pub const UNTITLED_STACK: &str = "Untitled Stack";

/// Current time in epoch milliseconds, the timestamp unit used on every node.
pub(crate) fn epoch_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Coerces free-form title input to a non-blank display title.
pub fn safe_title(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Node kind discriminator used by router and store lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Stack,
    Sheet,
}

/// Print-layout insets in inches, stored per sheet and in settings defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default = "default_margin_top")]
    pub top: f64,
    #[serde(default = "default_margin_right")]
    pub right: f64,
    #[serde(default = "default_margin_bottom")]
    pub bottom: f64,
    #[serde(default = "default_margin_left")]
    pub left: f64,
}

fn default_margin_top() -> f64 {
    Margins::DEFAULT.top
}
fn default_margin_right() -> f64 {
    Margins::DEFAULT.right
}
fn default_margin_bottom() -> f64 {
    Margins::DEFAULT.bottom
}
fn default_margin_left() -> f64 {
    Margins::DEFAULT.left
}

impl Margins {
    /// Factory defaults applied to new sheets and fresh settings.
    pub const DEFAULT: Margins = Margins {
        top: 0.42,
        right: 1.12,
        bottom: 0.75,
        left: 0.42,
    };

    /// Returns a copy where every inset is finite, non-negative and rounded
    /// to two decimal places. Invalid insets fall back per side.
    pub fn normalized(&self, fallback: &Margins) -> Margins {
        Margins {
            top: normalize_inset(self.top, fallback.top),
            right: normalize_inset(self.right, fallback.right),
            bottom: normalize_inset(self.bottom, fallback.bottom),
            left: normalize_inset(self.left, fallback.left),
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Margins::DEFAULT
    }
}

fn normalize_inset(value: f64, fallback: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return fallback;
    }
    (value * 100.0).round() / 100.0
}

/// Normalizes raw tag input: trims and collapses internal whitespace runs.
///
/// Returns an empty string for blank input; callers treat that as "no tag".
pub fn normalize_tag(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One parsed tag-edit command from single-line user input.
///
/// `+tag` adds, `-tag` removes, a bare `tag` defaults to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOperation {
    Add(String),
    Remove(String),
}

impl TagOperation {
    /// Parses raw input into an operation, or `None` when the input is blank
    /// or consists of a marker with no tag text.
    pub fn parse(raw: &str) -> Option<TagOperation> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let (remove, rest) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let tag = normalize_tag(rest);
        if tag.is_empty() {
            return None;
        }
        Some(if remove {
            TagOperation::Remove(tag)
        } else {
            TagOperation::Add(tag)
        })
    }
}

/// Folder-like container node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackNode {
    #[serde(default = "Uuid::nil")]
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub title: String,
    /// Display hint for library cards; not structural.
    #[serde(default)]
    pub preview_count: Option<u32>,
    /// Child ids in display order. Creation prepends, so index 0 is the most
    /// recently created child.
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl StackNode {
    /// Creates a stack with stamped id and timestamps.
    pub fn new(title: &str, parent_id: Option<NodeId>) -> StackNode {
        let now = epoch_ms_now();
        StackNode {
            id: Uuid::new_v4(),
            parent_id,
            title: safe_title(title, UNTITLED_STACK),
            preview_count: None,
            children: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Document node holding the editable text body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetNode {
    #[serde(default = "Uuid::nil")]
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub margins: Margins,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl SheetNode {
    /// Creates a sheet with stamped id, timestamps and default margins.
    pub fn new(title: &str, body: &str, parent_id: NodeId, subtitle: &str) -> SheetNode {
        let now = epoch_ms_now();
        SheetNode {
            id: Uuid::new_v4(),
            parent_id: Some(parent_id),
            title: safe_title(title, UNTITLED_SHEET),
            subtitle: subtitle.to_string(),
            body: body.to_string(),
            tags: Vec::new(),
            margins: Margins::DEFAULT,
            created_at: now,
            updated_at: now,
        }
    }

    /// Index of a tag under case-insensitive comparison, after normalization.
    pub fn tag_index(&self, raw: &str) -> Option<usize> {
        let key = normalize_tag(raw).to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.tags
            .iter()
            .position(|tag| tag.to_lowercase() == key)
    }

    /// Adds a normalized tag. Returns `false` when the input is blank or the
    /// tag is already present in any case/whitespace variant.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let tag = normalize_tag(raw);
        if tag.is_empty() || self.tag_index(&tag).is_some() {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Removes a tag under case-insensitive comparison. Returns `false` when
    /// the tag is absent.
    pub fn remove_tag(&mut self, raw: &str) -> bool {
        match self.tag_index(raw) {
            Some(index) => {
                self.tags.remove(index);
                true
            }
            None => false,
        }
    }

    /// Rebuilds the tag list dropping blanks and case-insensitive duplicates,
    /// preserving first-occurrence order. Used when adopting untrusted data.
    pub fn dedupe_tags(&mut self) {
        let mut seen = Vec::new();
        let mut kept = Vec::new();
        for raw in &self.tags {
            let tag = normalize_tag(raw);
            if tag.is_empty() {
                continue;
            }
            let key = tag.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            kept.push(tag);
        }
        self.tags = kept;
    }
}

/// Tagged union over the two node kinds, keyed by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Stack(StackNode),
    Sheet(SheetNode),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Stack(stack) => stack.id,
            Node::Sheet(sheet) => sheet.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        match self {
            Node::Stack(stack) => stack.id = id,
            Node::Sheet(sheet) => sheet.id = id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Stack(_) => NodeKind::Stack,
            Node::Sheet(_) => NodeKind::Sheet,
        }
    }

    pub fn is_stack(&self) -> bool {
        matches!(self, Node::Stack(_))
    }

    pub fn is_sheet(&self) -> bool {
        matches!(self, Node::Sheet(_))
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        match self {
            Node::Stack(stack) => stack.parent_id,
            Node::Sheet(sheet) => sheet.parent_id,
        }
    }

    pub(crate) fn set_parent_id(&mut self, parent_id: Option<NodeId>) {
        match self {
            Node::Stack(stack) => stack.parent_id = parent_id,
            Node::Sheet(sheet) => sheet.parent_id = parent_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Node::Stack(stack) => &stack.title,
            Node::Sheet(sheet) => &sheet.title,
        }
    }

    pub(crate) fn set_title(&mut self, title: String) {
        match self {
            Node::Stack(stack) => stack.title = title,
            Node::Sheet(sheet) => sheet.title = title,
        }
    }

    /// Blank-input fallback title for this node's kind.
    pub fn title_fallback(&self) -> &'static str {
        match self {
            Node::Stack(_) => UNTITLED_STACK,
            Node::Sheet(_) => UNTITLED_SHEET,
        }
    }

    pub fn created_at(&self) -> i64 {
        match self {
            Node::Stack(stack) => stack.created_at,
            Node::Sheet(sheet) => sheet.created_at,
        }
    }

    pub fn updated_at(&self) -> i64 {
        match self {
            Node::Stack(stack) => stack.updated_at,
            Node::Sheet(sheet) => sheet.updated_at,
        }
    }

    /// Advances `updated_at`; called by the store on every mutation.
    pub(crate) fn touch(&mut self, now: i64) {
        match self {
            Node::Stack(stack) => stack.updated_at = now,
            Node::Sheet(sheet) => sheet.updated_at = now,
        }
    }

    pub fn as_stack(&self) -> Option<&StackNode> {
        match self {
            Node::Stack(stack) => Some(stack),
            Node::Sheet(_) => None,
        }
    }

    pub(crate) fn as_stack_mut(&mut self) -> Option<&mut StackNode> {
        match self {
            Node::Stack(stack) => Some(stack),
            Node::Sheet(_) => None,
        }
    }

    pub fn as_sheet(&self) -> Option<&SheetNode> {
        match self {
            Node::Sheet(sheet) => Some(sheet),
            Node::Stack(_) => None,
        }
    }

    pub(crate) fn as_sheet_mut(&mut self) -> Option<&mut SheetNode> {
        match self {
            Node::Sheet(sheet) => Some(sheet),
            Node::Stack(_) => None,
        }
    }
}
