//! Arena-style store for the stack/sheet hierarchy.
//!
//! # Responsibility
//! - Provide create, rename, move, tag, delete and unstack operations that
//!   keep `parent_id` and `children` mirrors consistent.
//! - Repair untrusted loaded data back into a well-formed tree.
//!
//! # Invariants
//! - The graph is acyclic and weakly connected from the root after every
//!   public operation.
//! - Expected failures are semantic `TreeError` values, never panics.
//! - Recursive walks carry a visited set; loaded data is not trusted to be
//!   cycle-free until `repair` has run.

use crate::model::node::{
    epoch_ms_now, safe_title, Margins, Node, NodeId, SheetNode, StackNode, TagOperation,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from tree store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Target id is absent from the store.
    NodeNotFound(NodeId),
    /// Target exists but a stack was required.
    NotAStack(NodeId),
    /// Target exists but a sheet was required.
    NotASheet(NodeId),
    /// The root stack cannot be deleted, moved or unstacked.
    RootImmutable,
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::NotAStack(id) => write!(f, "node is not a stack: {id}"),
            Self::NotASheet(id) => write!(f, "node is not a sheet: {id}"),
            Self::RootImmutable => write!(f, "the root stack cannot be changed"),
        }
    }
}

impl Error for TreeError {}

/// Id-addressed node arena plus the root pointer.
///
/// Serializes to the snapshot's `rootId` + `containers` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeStore {
    #[serde(rename = "rootId")]
    root_id: NodeId,
    #[serde(rename = "containers")]
    nodes: HashMap<NodeId, Node>,
}

impl TreeStore {
    /// Creates a store holding only a root stack with the given title.
    pub fn new(root_title: &str) -> TreeStore {
        let root = StackNode::new(root_title, None);
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, Node::Stack(root));
        TreeStore { root_id, nodes }
    }

    /// Builds the default demo library used when no snapshot can be loaded.
    pub fn seed() -> TreeStore {
        const SAMPLE_TEXT: &str = "This is the first paragraph of the text. Its main purpose is to provide quick context for the contents of this notation.\n\nIt also works as a visual element in the grid.";

        let mut store = TreeStore::new("Notations");
        let root = store.root_id;

        let stack_a = store
            .create_stack("This is a stack", root)
            .unwrap_or(root);
        let food = store.create_stack("Food Notes", root).unwrap_or(root);
        let poems = store.create_stack("Poems", root).unwrap_or(root);
        store.set_preview_count(stack_a, Some(5));
        store.set_preview_count(food, Some(33));
        store.set_preview_count(poems, Some(25));

        let note_a = store
            .create_sheet("This is the title", SAMPLE_TEXT, root, "")
            .unwrap_or(root);
        let note_b = store
            .create_sheet("This is a notation with a longer title", "", root, "")
            .unwrap_or(root);
        let note_date = store.create_sheet("12-01-14", "", root, "").unwrap_or(root);
        let note_etc = store.create_sheet("ETC.", "", root, "").unwrap_or(root);

        let food_a = store
            .create_sheet("Huckleberry Pie Recipe", SAMPLE_TEXT, food, "")
            .unwrap_or(root);
        let long_body =
            "A line of sample text to validate screen and print parity.\n".repeat(80);
        let food_b = store
            .create_sheet(
                "A Moveable Feast - Chapter 1",
                long_body.trim_end(),
                food,
                "Chapter 1 - Jan. 4 1920",
            )
            .unwrap_or(root);
        for tag in ["first person", "biographical", "final draft", "chapter"] {
            let _ = store.add_tag(food_b, tag);
        }

        let _ = store.create_sheet("Draft", "Stack sample note.", stack_a, "");
        let _ = store.create_sheet("Poems", "Line one\nLine two\nLine three", poems, "");

        // Seed cards read left to right in a fixed order, not creation order.
        if let Some(root_stack) = store
            .nodes
            .get_mut(&root)
            .and_then(|node| node.as_stack_mut())
        {
            root_stack.children =
                vec![stack_a, food, note_a, note_b, poems, note_date, note_etc];
        }
        if let Some(food_stack) = store
            .nodes
            .get_mut(&food)
            .and_then(|node| node.as_stack_mut())
        {
            food_stack.children = vec![food_a, food_b];
        }

        store
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Resolves a stack, rejecting missing ids and sheets.
    pub fn stack(&self, id: NodeId) -> TreeResult<&StackNode> {
        self.nodes
            .get(&id)
            .ok_or(TreeError::NodeNotFound(id))?
            .as_stack()
            .ok_or(TreeError::NotAStack(id))
    }

    /// Resolves a sheet, rejecting missing ids and stacks.
    pub fn sheet(&self, id: NodeId) -> TreeResult<&SheetNode> {
        self.nodes
            .get(&id)
            .ok_or(TreeError::NodeNotFound(id))?
            .as_sheet()
            .ok_or(TreeError::NotASheet(id))
    }

    /// Creates a stack at the front of the parent's children.
    pub fn create_stack(&mut self, title: &str, parent_id: NodeId) -> TreeResult<NodeId> {
        self.stack(parent_id)?;
        let stack = StackNode::new(title, Some(parent_id));
        let id = stack.id;
        self.nodes.insert(id, Node::Stack(stack));
        self.attach_front(parent_id, id);
        Ok(id)
    }

    /// Creates a sheet at the front of the parent's children.
    pub fn create_sheet(
        &mut self,
        title: &str,
        body: &str,
        parent_id: NodeId,
        subtitle: &str,
    ) -> TreeResult<NodeId> {
        self.stack(parent_id)?;
        let sheet = SheetNode::new(title, body, parent_id, subtitle);
        let id = sheet.id;
        self.nodes.insert(id, Node::Sheet(sheet));
        self.attach_front(parent_id, id);
        Ok(id)
    }

    fn attach_front(&mut self, parent_id: NodeId, child_id: NodeId) {
        let now = epoch_ms_now();
        if let Some(parent) = self
            .nodes
            .get_mut(&parent_id)
            .and_then(|node| node.as_stack_mut())
        {
            parent.children.retain(|id| *id != child_id);
            parent.children.insert(0, child_id);
            parent.updated_at = now;
        }
    }

    /// Renames a node. Returns `Ok(false)` without touching timestamps when
    /// the coerced title is identical to the current one.
    pub fn rename(&mut self, id: NodeId, new_title: &str) -> TreeResult<bool> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))?;
        let next = safe_title(new_title, node.title_fallback());
        if node.title() == next {
            return Ok(false);
        }
        node.set_title(next);
        node.touch(epoch_ms_now());
        Ok(true)
    }

    /// Reparents a sheet under another stack, prepending it there.
    ///
    /// Returns `Ok(false)` when the sheet is already in the target stack; in
    /// that case nothing is touched. Stacks are not movable.
    pub fn move_sheet(&mut self, sheet_id: NodeId, target_stack_id: NodeId) -> TreeResult<bool> {
        let current_parent = self
            .sheet(sheet_id)?
            .parent_id
            .unwrap_or(self.root_id);
        self.stack(target_stack_id)?;
        if current_parent == target_stack_id {
            return Ok(false);
        }

        let now = epoch_ms_now();
        if let Some(source) = self
            .nodes
            .get_mut(&current_parent)
            .and_then(|node| node.as_stack_mut())
        {
            source.children.retain(|id| *id != sheet_id);
            source.updated_at = now;
        }
        if let Some(target) = self
            .nodes
            .get_mut(&target_stack_id)
            .and_then(|node| node.as_stack_mut())
        {
            target.children.retain(|id| *id != sheet_id);
            target.children.insert(0, sheet_id);
            target.updated_at = now;
        }
        if let Some(sheet) = self
            .nodes
            .get_mut(&sheet_id)
            .and_then(|node| node.as_sheet_mut())
        {
            sheet.parent_id = Some(target_stack_id);
            sheet.updated_at = now;
        }
        Ok(true)
    }

    /// Deletes a node and, for stacks, every descendant.
    ///
    /// Returns the removed ids so the caller can clear any active pointers
    /// into the deleted subtree. The root stack is rejected.
    pub fn delete_cascade(&mut self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        if id == self.root_id {
            return Err(TreeError::RootImmutable);
        }
        let node = self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))?;
        let parent_id = node.parent_id();

        let removed = self.collect_subtree(id);
        if let Some(parent_id) = parent_id {
            let now = epoch_ms_now();
            if let Some(parent) = self
                .nodes
                .get_mut(&parent_id)
                .and_then(|node| node.as_stack_mut())
            {
                parent.children.retain(|child| *child != id);
                parent.updated_at = now;
            }
        }
        for removed_id in &removed {
            self.nodes.remove(removed_id);
        }
        Ok(removed)
    }

    /// Deletes a stack while relocating every descendant sheet to the root.
    ///
    /// Sheets keep their relative order and are prepended as a block to the
    /// root's children; ids already present at root are not duplicated. The
    /// returned ids are the deleted stacks.
    pub fn unstack_and_delete(&mut self, stack_id: NodeId) -> TreeResult<Vec<NodeId>> {
        if stack_id == self.root_id {
            return Err(TreeError::RootImmutable);
        }
        self.stack(stack_id)?;

        let mut descendant_stacks = Vec::new();
        let mut descendant_sheets = Vec::new();
        let mut visited = HashSet::new();
        self.collect_stack_descendants(
            stack_id,
            &mut visited,
            &mut descendant_stacks,
            &mut descendant_sheets,
        );

        let mut seen_sheets = HashSet::new();
        let sheets_to_move: Vec<NodeId> = descendant_sheets
            .into_iter()
            .filter(|id| seen_sheets.insert(*id))
            .collect();

        let now = epoch_ms_now();
        let root_id = self.root_id;
        for sheet_id in &sheets_to_move {
            if let Some(sheet) = self
                .nodes
                .get_mut(sheet_id)
                .and_then(|node| node.as_sheet_mut())
            {
                sheet.parent_id = Some(root_id);
                sheet.updated_at = now;
            }
        }

        // Intermediate stacks keep only stack children so the cascade below
        // cannot reach the relocated sheets.
        for descendant_id in &descendant_stacks {
            let stack_children: Vec<NodeId> = match self.nodes.get(descendant_id) {
                Some(Node::Stack(stack)) => stack
                    .children
                    .iter()
                    .copied()
                    .filter(|child| {
                        self.nodes
                            .get(child)
                            .map(Node::is_stack)
                            .unwrap_or(false)
                    })
                    .collect(),
                _ => continue,
            };
            if let Some(stack) = self
                .nodes
                .get_mut(descendant_id)
                .and_then(|node| node.as_stack_mut())
            {
                stack.children = stack_children;
            }
        }

        let stack_id_set: HashSet<NodeId> = descendant_stacks.iter().copied().collect();
        if let Some(root) = self
            .nodes
            .get_mut(&root_id)
            .and_then(|node| node.as_stack_mut())
        {
            root.children.retain(|id| !stack_id_set.contains(id));
            let existing: HashSet<NodeId> = root.children.iter().copied().collect();
            let mut next: Vec<NodeId> = sheets_to_move
                .iter()
                .copied()
                .filter(|id| !existing.contains(id))
                .collect();
            next.extend(root.children.iter().copied());
            root.children = next;
            root.updated_at = now;
        }

        self.delete_cascade(stack_id)
    }

    fn collect_stack_descendants(
        &self,
        stack_id: NodeId,
        visited: &mut HashSet<NodeId>,
        stacks: &mut Vec<NodeId>,
        sheets: &mut Vec<NodeId>,
    ) {
        if !visited.insert(stack_id) {
            return;
        }
        let Some(Node::Stack(stack)) = self.nodes.get(&stack_id) else {
            return;
        };
        stacks.push(stack_id);
        for child_id in &stack.children {
            match self.nodes.get(child_id) {
                Some(Node::Stack(_)) => {
                    self.collect_stack_descendants(*child_id, visited, stacks, sheets)
                }
                Some(Node::Sheet(_)) => sheets.push(*child_id),
                None => {}
            }
        }
    }

    /// Pre-order subtree ids starting at `id`, visited-guarded.
    fn collect_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            if let Node::Stack(stack) = node {
                for child in stack.children.iter().rev() {
                    pending.push(*child);
                }
            }
        }
        out
    }

    /// Adds a tag to a sheet. `Ok(false)` when blank or already present.
    pub fn add_tag(&mut self, sheet_id: NodeId, raw: &str) -> TreeResult<bool> {
        self.with_sheet(sheet_id, |sheet| sheet.add_tag(raw))
    }

    /// Removes a tag from a sheet. `Ok(false)` when the tag is absent.
    pub fn remove_tag(&mut self, sheet_id: NodeId, raw: &str) -> TreeResult<bool> {
        self.with_sheet(sheet_id, |sheet| sheet.remove_tag(raw))
    }

    /// Applies a `+tag` / `-tag` / bare `tag` edit command to a sheet.
    pub fn apply_tag_operation(&mut self, sheet_id: NodeId, input: &str) -> TreeResult<bool> {
        match TagOperation::parse(input) {
            Some(TagOperation::Add(tag)) => self.add_tag(sheet_id, &tag),
            Some(TagOperation::Remove(tag)) => self.remove_tag(sheet_id, &tag),
            None => Ok(false),
        }
    }

    /// Replaces a sheet's body text.
    pub fn update_body(&mut self, sheet_id: NodeId, body: &str) -> TreeResult<()> {
        self.with_sheet(sheet_id, |sheet| {
            sheet.body = body.to_string();
            true
        })
        .map(|_| ())
    }

    /// Replaces a sheet's subtitle.
    pub fn set_subtitle(&mut self, sheet_id: NodeId, subtitle: &str) -> TreeResult<()> {
        self.with_sheet(sheet_id, |sheet| {
            sheet.subtitle = subtitle.to_string();
            true
        })
        .map(|_| ())
    }

    /// Stores normalized margins on a sheet and returns them.
    pub fn set_sheet_margins(&mut self, sheet_id: NodeId, margins: Margins) -> TreeResult<Margins> {
        let normalized = margins.normalized(&Margins::DEFAULT);
        self.with_sheet(sheet_id, |sheet| {
            sheet.margins = normalized;
            true
        })?;
        Ok(normalized)
    }

    /// Updates a stack's display-only preview hint without touching
    /// `updated_at`.
    pub fn set_preview_count(&mut self, stack_id: NodeId, count: Option<u32>) {
        if let Some(stack) = self
            .nodes
            .get_mut(&stack_id)
            .and_then(|node| node.as_stack_mut())
        {
            stack.preview_count = count;
        }
    }

    fn with_sheet(
        &mut self,
        sheet_id: NodeId,
        apply: impl FnOnce(&mut SheetNode) -> bool,
    ) -> TreeResult<bool> {
        let node = self
            .nodes
            .get_mut(&sheet_id)
            .ok_or(TreeError::NodeNotFound(sheet_id))?;
        let sheet = node.as_sheet_mut().ok_or(TreeError::NotASheet(sheet_id))?;
        if !apply(sheet) {
            return Ok(false);
        }
        sheet.updated_at = epoch_ms_now();
        Ok(true)
    }

    /// Counts descendant sheets under a stack. Missing ids and sheets count
    /// as zero rather than failing; loaded data may be malformed, so the
    /// walk carries a visited set.
    pub fn count_sheets(&self, stack_id: NodeId) -> usize {
        fn walk(store: &TreeStore, stack_id: NodeId, visited: &mut HashSet<NodeId>) -> usize {
            if !visited.insert(stack_id) {
                return 0;
            }
            let Some(Node::Stack(stack)) = store.nodes.get(&stack_id) else {
                return 0;
            };
            let mut total = 0;
            for child_id in &stack.children {
                match store.nodes.get(child_id) {
                    Some(Node::Sheet(_)) => total += 1,
                    Some(Node::Stack(_)) => total += walk(store, *child_id, visited),
                    None => {}
                }
            }
            total
        }
        walk(self, stack_id, &mut HashSet::new())
    }

    /// Ancestor chain for a stack, shallow to deep, excluding the root and
    /// including the stack itself. Empty for the root or unknown ids.
    pub fn stack_trail(&self, stack_id: NodeId) -> Vec<NodeId> {
        let mut trail = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(stack_id);
        while let Some(current) = cursor {
            if current == self.root_id || !visited.insert(current) {
                break;
            }
            let Some(node) = self.nodes.get(&current) else {
                break;
            };
            if node.is_stack() {
                trail.push(current);
            }
            cursor = node.parent_id();
        }
        trail.reverse();
        trail
    }

    /// Rebuilds structural consistency after loading untrusted data.
    ///
    /// The children arrays are authoritative: parent pointers are rewritten
    /// from them, duplicate claims resolve to the first parent in walk order,
    /// and nodes unreachable from the root are dropped. Titles, tags and
    /// margins are coerced to valid values.
    ///
    /// Returns `false` when the root itself cannot be recovered; the caller
    /// is expected to discard the store in favor of a fresh seed.
    pub(crate) fn repair(&mut self, fallback_margins: &Margins) -> bool {
        match self.nodes.get_mut(&self.root_id) {
            Some(Node::Stack(root)) => root.parent_id = None,
            _ => return false,
        }

        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            if let Some(node) = self.nodes.get_mut(&id) {
                // The map key is the address every other structure uses.
                node.set_id(id);
                let coerced = safe_title(node.title(), node.title_fallback());
                node.set_title(coerced);
                if let Some(sheet) = node.as_sheet_mut() {
                    sheet.dedupe_tags();
                    sheet.margins = sheet.margins.normalized(fallback_margins);
                }
            }
        }

        let mut reachable = HashSet::new();
        reachable.insert(self.root_id);
        let mut queue = vec![self.root_id];
        while let Some(stack_id) = queue.pop() {
            let raw_children = match self.nodes.get(&stack_id) {
                Some(Node::Stack(stack)) => stack.children.clone(),
                _ => continue,
            };
            let mut kept = Vec::new();
            for child_id in raw_children {
                if child_id == self.root_id || !self.nodes.contains_key(&child_id) {
                    continue;
                }
                // First parent in walk order wins a contested child.
                if !reachable.insert(child_id) {
                    continue;
                }
                kept.push(child_id);
                if let Some(child) = self.nodes.get_mut(&child_id) {
                    child.set_parent_id(Some(stack_id));
                    if child.is_stack() {
                        queue.push(child_id);
                    }
                }
            }
            if let Some(stack) = self
                .nodes
                .get_mut(&stack_id)
                .and_then(|node| node.as_stack_mut())
            {
                stack.children = kept;
            }
        }

        self.nodes.retain(|id, _| reachable.contains(id));
        true
    }
}
