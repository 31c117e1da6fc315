use std::fmt;

/// Generational handle into a `TreeModel` arena.
///
/// A handle keeps identifying the node it was issued for: once that node is
/// destroyed the slot's generation moves on, so the handle is detectably
/// stale even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    fn slot(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// What a node carries besides its columns.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<T> {
    Item(T),
    /// "More children available" marker, always the last row of its parent.
    Ellipsis,
}

/// One row of the tree.
#[derive(Debug)]
pub struct TreeNode<T> {
    pub(crate) columns: Vec<String>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) ellipsis: Option<NodeId>,
    pub(crate) expanded: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind<T>,
}

impl<T> TreeNode<T> {
    pub(crate) fn new(parent: Option<NodeId>, columns: Vec<String>, kind: NodeKind<T>) -> Self {
        Self {
            columns,
            children: Vec::new(),
            ellipsis: None,
            expanded: false,
            parent,
            kind,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Text of one column; empty when the node has fewer columns.
    pub fn column(&self, column: usize) -> &str {
        self.columns.get(column).map(String::as_str).unwrap_or("")
    }

    /// Real children, without the ellipsis.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_more(&self) -> bool {
        self.ellipsis.is_some()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind<T> {
        &self.kind
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self.kind, NodeKind::Ellipsis)
    }

    pub fn item(&self) -> Option<&T> {
        match &self.kind {
            NodeKind::Item(item) => Some(item),
            NodeKind::Ellipsis => None,
        }
    }

    pub fn item_mut(&mut self) -> Option<&mut T> {
        match &mut self.kind {
            NodeKind::Item(item) => Some(item),
            NodeKind::Ellipsis => None,
        }
    }

    /// Number of displayed rows: real children plus the ellipsis.
    pub fn child_count(&self) -> usize {
        self.children.len() + usize::from(self.has_more())
    }

    /// Row `row` as the view sees it; one past the last real child is the
    /// ellipsis when present.
    pub fn child(&self, row: usize) -> Option<NodeId> {
        if row < self.children.len() {
            Some(self.children[row])
        } else if row == self.children.len() {
            self.ellipsis
        } else {
            None
        }
    }
}

struct Slot<T> {
    generation: u32,
    node: Option<TreeNode<T>>,
}

/// Slot storage for every node of one model.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, node: TreeNode<T>) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.slots
            .get(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>> {
        self.slots
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Frees the slot; the handle (and every copy of it) goes stale.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<TreeNode<T>> {
        let slot = self
            .slots
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(label: &str) -> TreeNode<()> {
        TreeNode::new(None, vec![label.to_string()], NodeKind::Item(()))
    }

    #[test]
    fn test_reused_slot_invalidates_old_handle() {
        let mut arena = Arena::new();
        let first = arena.insert(leaf("a"));
        assert!(arena.remove(first).is_some());

        let second = arena.insert(leaf("b"));
        assert_eq!(first.slot(), second.slot(), "slot should be reused");
        assert!(!arena.contains(first));
        assert_eq!(arena.get(second).map(|n| n.column(0)), Some("b"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_child_row_past_end_is_ellipsis() {
        let mut arena = Arena::new();
        let marker = arena.insert(TreeNode::<()>::new(None, vec![], NodeKind::Ellipsis));
        let mut node = leaf("parent");
        node.ellipsis = Some(marker);

        assert_eq!(node.child_count(), 1);
        assert_eq!(node.child(0), Some(marker));
        assert_eq!(node.child(1), None);
        assert_eq!(node.column(5), "");
    }
}
