use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Row path from the root down to a node, plus a column.
///
/// The root itself is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    rows: Vec<usize>,
    column: usize,
}

impl ModelIndex {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(rows: Vec<usize>, column: usize) -> Self {
        Self { rows, column }
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn is_root(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row within the parent, `None` for the root.
    pub fn row(&self) -> Option<usize> {
        self.rows.last().copied()
    }

    pub fn parent(&self) -> ModelIndex {
        let mut rows = self.rows.clone();
        rows.pop();
        ModelIndex { rows, column: 0 }
    }

    /// Same row, other column.
    pub fn sibling(&self, column: usize) -> ModelIndex {
        ModelIndex {
            rows: self.rows.clone(),
            column,
        }
    }
}

impl fmt::Display for ModelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(f, "<root>:{}", self.column);
        }
        for row in &self.rows {
            write!(f, "/{}", row)?;
        }
        write!(f, ":{}", self.column)
    }
}

/// Notification emitted by a `TreeModel`.
///
/// Structural changes always arrive as a begin/end pair; nothing else about
/// the affected parent changes in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    BeginInsertRows {
        parent: ModelIndex,
        first: usize,
        last: usize,
    },
    EndInsertRows,
    BeginRemoveRows {
        parent: ModelIndex,
        first: usize,
        last: usize,
    },
    EndRemoveRows,
    DataChanged {
        top_left: ModelIndex,
        bottom_right: ModelIndex,
    },
    Expanded(ModelIndex),
    Collapsed(ModelIndex),
}

impl ModelEvent {
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            ModelEvent::DataChanged { .. } | ModelEvent::Expanded(_) | ModelEvent::Collapsed(_)
        )
    }
}

/// Receiver of model notifications (the view side).
pub trait ChangeSink {
    fn notify(&mut self, event: &ModelEvent);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn notify(&mut self, _event: &ModelEvent) {}
}

/// Collects notifications so they can be inspected after the fact.
///
/// Clones share the same buffer, so one clone can be handed to the model
/// while the other stays with the caller.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<ModelEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.borrow().clone()
    }

    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<ModelEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn structural_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.is_structural())
            .count()
    }
}

impl ChangeSink for RecordingSink {
    fn notify(&mut self, event: &ModelEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
