use tracing::debug;

use super::node::{Arena, NodeId, NodeKind, TreeNode};
use super::sink::{ChangeSink, ModelEvent, ModelIndex, NullSink};
use crate::error::TreeError;

pub type TreeResult<T> = Result<T, TreeError>;

const DEFAULT_ELLIPSIS_LABEL: &str = "...";

/// Owns every node of one tree and announces each change to a `ChangeSink`.
///
/// Structural changes are bracketed: a `Begin*Rows` event naming the parent
/// and row range, the mutation, then the matching `End*Rows`. Removed nodes
/// are freed only after their `EndRemoveRows` went out, so an observer can
/// still resolve them while handling the begin event.
pub struct TreeModel<T> {
    arena: Arena<T>,
    root: NodeId,
    headers: Vec<String>,
    ellipsis_label: String,
    sink: Box<dyn ChangeSink>,
}

impl<T> TreeModel<T> {
    pub fn new(headers: Vec<String>, root_item: T) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(TreeNode::new(
            None,
            headers.clone(),
            NodeKind::Item(root_item),
        ));
        Self {
            arena,
            root,
            headers,
            ellipsis_label: DEFAULT_ELLIPSIS_LABEL.to_string(),
            sink: Box::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Installs a new sink and hands back the previous one.
    pub fn set_sink(&mut self, sink: Box<dyn ChangeSink>) -> Box<dyn ChangeSink> {
        std::mem::replace(&mut self.sink, sink)
    }

    pub fn set_ellipsis_label(&mut self, label: impl Into<String>) {
        self.ellipsis_label = label.into();
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Live nodes, root and ellipsis markers included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.arena.get(id)
    }

    pub fn item(&self, id: NodeId) -> Option<&T> {
        self.arena.get(id).and_then(TreeNode::item)
    }

    pub fn item_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.arena.get_mut(id).and_then(TreeNode::item_mut)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(TreeNode::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena.get(id).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn child(&self, id: NodeId, row: usize) -> Option<NodeId> {
        self.arena.get(id).and_then(|node| node.child(row))
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.arena.get(id).map(TreeNode::child_count).unwrap_or(0)
    }

    pub fn has_more(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(TreeNode::has_more)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(TreeNode::is_expanded)
    }

    pub fn is_ellipsis(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(TreeNode::is_ellipsis)
    }

    pub fn column_text(&self, id: NodeId, column: usize) -> &str {
        self.arena.get(id).map(|node| node.column(column)).unwrap_or("")
    }

    /// Position of `id` among its parent's rows; the root is row 0.
    pub fn row(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id).and_then(|p| self.arena.get(p)) else {
            return 0;
        };
        if parent.ellipsis == Some(id) {
            return parent.children.len();
        }
        parent
            .children
            .iter()
            .position(|child| *child == id)
            .unwrap_or(0)
    }

    pub fn index_for_node(&self, id: NodeId, column: usize) -> ModelIndex {
        let mut rows = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            rows.push(self.row(current));
            current = parent;
        }
        rows.reverse();
        ModelIndex::new(rows, column)
    }

    pub fn node_for_index(&self, index: &ModelIndex) -> Option<NodeId> {
        index
            .rows()
            .iter()
            .try_fold(self.root, |node, &row| self.child(node, row))
    }

    /// Every real descendant of `id` in pre-order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    fn checked(&self, id: NodeId) -> TreeResult<&TreeNode<T>> {
        match self.arena.get(id) {
            Some(node) => Ok(node),
            None => {
                debug_assert!(false, "use of stale node handle {}", id);
                Err(TreeError::StaleNode(id))
            }
        }
    }

    fn checked_mut(&mut self, id: NodeId) -> TreeResult<&mut TreeNode<T>> {
        match self.arena.get_mut(id) {
            Some(node) => Ok(node),
            None => {
                debug_assert!(false, "use of stale node handle {}", id);
                Err(TreeError::StaleNode(id))
            }
        }
    }

    fn emit(&mut self, event: ModelEvent) {
        self.sink.notify(&event);
    }

    /// Replaces all columns without notifying.
    pub fn set_columns(&mut self, id: NodeId, columns: Vec<String>) -> TreeResult<()> {
        self.checked_mut(id)?.columns = columns;
        Ok(())
    }

    /// Overwrites one column without notifying; callers report the change.
    pub fn set_column(
        &mut self,
        id: NodeId,
        column: usize,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        let node = self.checked_mut(id)?;
        if node.columns.len() <= column {
            node.columns.resize(column + 1, String::new());
        }
        node.columns[column] = value.into();
        Ok(())
    }

    /// Announces that every column of `id` changed.
    pub fn report_change(&mut self, id: NodeId) -> TreeResult<()> {
        let width = self.checked(id)?.columns.len().max(1);
        let top_left = self.index_for_node(id, 0);
        let bottom_right = top_left.sibling(width - 1);
        self.emit(ModelEvent::DataChanged {
            top_left,
            bottom_right,
        });
        Ok(())
    }

    pub fn report_change_column(&mut self, id: NodeId, column: usize) -> TreeResult<()> {
        self.checked(id)?;
        let index = self.index_for_node(id, column);
        self.emit(ModelEvent::DataChanged {
            top_left: index.clone(),
            bottom_right: index,
        });
        Ok(())
    }

    pub fn append_child(
        &mut self,
        parent: NodeId,
        columns: Vec<String>,
        item: T,
    ) -> TreeResult<NodeId> {
        self.append(parent, columns, item, true)
    }

    /// Appends without notifying, for a parent no observer has seen yet.
    pub fn append_child_initial(
        &mut self,
        parent: NodeId,
        columns: Vec<String>,
        item: T,
    ) -> TreeResult<NodeId> {
        self.append(parent, columns, item, false)
    }

    fn append(
        &mut self,
        parent: NodeId,
        columns: Vec<String>,
        item: T,
        notify: bool,
    ) -> TreeResult<NodeId> {
        let (row, ellipsis) = {
            let node = self.checked(parent)?;
            (node.children.len(), node.ellipsis)
        };
        let parent_index = self.index_for_node(parent, 0);

        // Row count is unchanged when a real child takes the ellipsis' place,
        // but the row is a different node, so observers get a removal first.
        if let Some(marker) = ellipsis {
            if notify {
                self.emit(ModelEvent::BeginRemoveRows {
                    parent: parent_index.clone(),
                    first: row,
                    last: row,
                });
            }
            if let Some(node) = self.arena.get_mut(parent) {
                node.ellipsis = None;
            }
            if notify {
                self.emit(ModelEvent::EndRemoveRows);
            }
            self.free_subtree(marker);
        }

        let child = self
            .arena
            .insert(TreeNode::new(Some(parent), columns, NodeKind::Item(item)));
        if notify {
            self.emit(ModelEvent::BeginInsertRows {
                parent: parent_index,
                first: row,
                last: row,
            });
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(child);
        }
        if notify {
            self.emit(ModelEvent::EndInsertRows);
        }
        Ok(child)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeId,
        position: usize,
        columns: Vec<String>,
        item: T,
    ) -> TreeResult<NodeId> {
        if position > self.checked(parent)?.children.len() {
            return Err(TreeError::RowOutOfRange {
                parent,
                row: position,
            });
        }
        let parent_index = self.index_for_node(parent, 0);
        let child = self
            .arena
            .insert(TreeNode::new(Some(parent), columns, NodeKind::Item(item)));
        self.emit(ModelEvent::BeginInsertRows {
            parent: parent_index,
            first: position,
            last: position,
        });
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.insert(position, child);
        }
        self.emit(ModelEvent::EndInsertRows);
        Ok(child)
    }

    /// Removes real child `row` and destroys it with its whole subtree.
    pub fn remove_child(&mut self, parent: NodeId, row: usize) -> TreeResult<()> {
        if row >= self.checked(parent)?.children.len() {
            return Err(TreeError::RowOutOfRange { parent, row });
        }
        let parent_index = self.index_for_node(parent, 0);
        self.emit(ModelEvent::BeginRemoveRows {
            parent: parent_index,
            first: row,
            last: row,
        });
        let removed = self
            .arena
            .get_mut(parent)
            .map(|node| node.children.remove(row));
        self.emit(ModelEvent::EndRemoveRows);
        if let Some(child) = removed {
            self.free_subtree(child);
        }
        Ok(())
    }

    pub fn remove_self(&mut self, id: NodeId) -> TreeResult<()> {
        let parent = self.checked(id)?.parent.ok_or(TreeError::NoParent(id))?;
        if self.arena.get(parent).and_then(|p| p.ellipsis) == Some(id) {
            return self.set_has_more(parent, false);
        }
        let row = self.row(id);
        self.remove_child(parent, row)
    }

    /// Removes every row of `id`, ellipsis included, in one bracket.
    pub fn clear(&mut self, id: NodeId) -> TreeResult<()> {
        let rows = self.checked(id)?.child_count();
        if rows == 0 {
            return Ok(());
        }
        let index = self.index_for_node(id, 0);
        self.emit(ModelEvent::BeginRemoveRows {
            parent: index,
            first: 0,
            last: rows - 1,
        });
        let (detached, marker) = match self.arena.get_mut(id) {
            Some(node) => (std::mem::take(&mut node.children), node.ellipsis.take()),
            None => (Vec::new(), None),
        };
        self.emit(ModelEvent::EndRemoveRows);
        for child in detached.into_iter().chain(marker) {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Shows or hides the trailing ellipsis row.
    pub fn set_has_more(&mut self, id: NodeId, more: bool) -> TreeResult<()> {
        let (row, current) = {
            let node = self.checked(id)?;
            (node.children.len(), node.ellipsis)
        };
        match (more, current) {
            (true, None) => {
                let index = self.index_for_node(id, 0);
                let marker = self.new_ellipsis(id);
                self.emit(ModelEvent::BeginInsertRows {
                    parent: index,
                    first: row,
                    last: row,
                });
                if let Some(node) = self.arena.get_mut(id) {
                    node.ellipsis = Some(marker);
                }
                self.emit(ModelEvent::EndInsertRows);
            }
            (false, Some(marker)) => {
                let index = self.index_for_node(id, 0);
                self.emit(ModelEvent::BeginRemoveRows {
                    parent: index,
                    first: row,
                    last: row,
                });
                if let Some(node) = self.arena.get_mut(id) {
                    node.ellipsis = None;
                }
                self.emit(ModelEvent::EndRemoveRows);
                self.free_subtree(marker);
            }
            _ => {}
        }
        Ok(())
    }

    /// Like `set_has_more`, for a node that is not observed yet.
    pub fn set_has_more_initial(&mut self, id: NodeId, more: bool) -> TreeResult<()> {
        let current = self.checked(id)?.ellipsis;
        match (more, current) {
            (true, None) => {
                let marker = self.new_ellipsis(id);
                if let Some(node) = self.arena.get_mut(id) {
                    node.ellipsis = Some(marker);
                }
            }
            (false, Some(marker)) => {
                if let Some(node) = self.arena.get_mut(id) {
                    node.ellipsis = None;
                }
                self.free_subtree(marker);
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns whether the state actually changed.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> TreeResult<bool> {
        let node = self.checked_mut(id)?;
        if node.expanded == expanded {
            return Ok(false);
        }
        node.expanded = expanded;
        let index = self.index_for_node(id, 0);
        self.emit(if expanded {
            ModelEvent::Expanded(index)
        } else {
            ModelEvent::Collapsed(index)
        });
        Ok(true)
    }

    /// A click on `id`. For an ellipsis this names the owner whose remaining
    /// children should be fetched; anything else has nothing to fetch.
    pub fn activate(&self, id: NodeId) -> Option<NodeId> {
        let node = self.arena.get(id)?;
        if !node.is_ellipsis() {
            return None;
        }
        debug!(node = %id, "ellipsis activated");
        node.parent
    }

    fn new_ellipsis(&mut self, parent: NodeId) -> NodeId {
        let mut columns = vec![String::new(); self.headers.len().max(1)];
        columns[0] = self.ellipsis_label.clone();
        self.arena
            .insert(TreeNode::new(Some(parent), columns, NodeKind::Ellipsis))
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.arena.remove(next) {
                stack.extend(node.children);
                stack.extend(node.ellipsis);
            }
        }
    }
}
