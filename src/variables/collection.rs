use std::collections::HashMap;

use tracing::debug;

use super::variable::{Variable, NAME_COLUMN, TYPE_COLUMN, VALUE_COLUMN};
use crate::config::InspectorConfig;
use crate::error::TreeError;
use crate::session::{AutoUpdate, ChildPage, DebugSession, VariableUpdate};
use crate::tree::{ChangeSink, NodeId, TreeModel, TreeResult};

/// Payload of an inspector row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Root,
    Watches { finish_result: Option<NodeId> },
    Locals { scope: String },
    Variable(Variable),
}

impl Item {
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Item::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut Variable> {
        match self {
            Item::Variable(var) => Some(var),
            _ => None,
        }
    }
}

/// The variables tree: one Watches container followed by one Locals
/// container per scope, each holding `Variable` rows.
pub struct VariableCollection {
    pub(super) model: TreeModel<Item>,
    pub(super) watches: NodeId,
    pub(super) locals: HashMap<String, NodeId>,
    pub(super) config: InspectorConfig,
    widget_visible: bool,
}

impl VariableCollection {
    pub fn new(config: InspectorConfig) -> Self {
        let mut model = TreeModel::new(config.columns.clone(), Item::Root);
        model.set_ellipsis_label(config.ellipsis_label.clone());
        let root = model.root();
        // The root was just created, nothing can observe it yet.
        let watches = model
            .append_child_initial(
                root,
                vec![config.watches_label.clone(), String::new()],
                Item::Watches {
                    finish_result: None,
                },
            )
            .expect("fresh root is live");
        Self {
            model,
            watches,
            locals: HashMap::new(),
            config,
            widget_visible: false,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ChangeSink>) -> Self {
        self.model.set_sink(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Box<dyn ChangeSink>) -> Box<dyn ChangeSink> {
        self.model.set_sink(sink)
    }

    pub fn model(&self) -> &TreeModel<Item> {
        &self.model
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn root(&self) -> NodeId {
        self.model.root()
    }

    pub fn watches(&self) -> NodeId {
        self.watches
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.model.contains(id)
    }

    /// Handles held by callers must be live; a stale one fails fast in
    /// debug builds.
    pub(super) fn live(&self, id: NodeId) -> TreeResult<()> {
        if self.model.contains(id) {
            return Ok(());
        }
        debug_assert!(false, "use of stale node handle {}", id);
        Err(TreeError::StaleNode(id))
    }

    pub fn variable(&self, id: NodeId) -> Option<&Variable> {
        self.model.item(id).and_then(Item::as_variable)
    }

    pub fn expression(&self, id: NodeId) -> Option<&str> {
        self.variable(id).map(Variable::expression)
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.model.column_text(id, NAME_COLUMN)
    }

    pub fn value(&self, id: NodeId) -> &str {
        self.model.column_text(id, VALUE_COLUMN)
    }

    pub fn type_name(&self, id: NodeId) -> &str {
        self.model.column_text(id, TYPE_COLUMN)
    }

    /// Expressions of the variable children of `id`, in display order.
    pub fn child_expressions(&self, id: NodeId) -> Vec<&str> {
        self.model
            .children(id)
            .iter()
            .filter_map(|child| self.expression(*child))
            .collect()
    }

    /// Appends `variable` under `parent` and lets the session bind it.
    pub(super) fn append_variable(
        &mut self,
        parent: NodeId,
        variable: Variable,
        session: &mut dyn DebugSession,
    ) -> TreeResult<NodeId> {
        let id = self
            .model
            .append_child(parent, variable.columns(), Item::Variable(variable))?;
        if let Some(var) = self.model.item_mut(id).and_then(Item::as_variable_mut) {
            session.attach_maybe(id, var);
        }
        Ok(id)
    }

    /// Binds every unattached variable among `nodes`.
    pub fn attach(&mut self, nodes: &[NodeId], session: &mut dyn DebugSession) {
        for &id in nodes {
            if let Some(var) = self.model.item_mut(id).and_then(Item::as_variable_mut) {
                session.attach_maybe(id, var);
            }
        }
    }

    /// Clears "changed" across watches and every scope, ahead of a new stop.
    pub fn reset_changed(&mut self) -> TreeResult<()> {
        self.reset_changed_under(self.watches)?;
        let scopes: Vec<NodeId> = self.locals.values().copied().collect();
        for scope in scopes {
            self.reset_changed_under(scope)?;
        }
        Ok(())
    }

    /// Applies a session answer. Returns `false` when the node it was meant
    /// for has been removed in the meantime.
    pub fn apply_update(
        &mut self,
        update: VariableUpdate,
        session: &mut dyn DebugSession,
    ) -> TreeResult<bool> {
        let id = update.node;
        if !self.model.contains(id) {
            debug!(node = %id, "dropping update for a removed variable");
            return Ok(false);
        }
        if self.variable(id).is_none() {
            return Err(TreeError::NotAVariable(id));
        }

        if let Some(value) = update.value {
            self.set_value(id, value)?;
        }
        if let Some(type_name) = update.type_name {
            self.set_type(id, type_name)?;
        }
        if let Some(changed) = update.changed {
            self.set_changed(id, changed)?;
        }
        if let Some(in_scope) = update.in_scope {
            if self.variable(id).map(Variable::in_scope) != Some(in_scope) {
                self.set_in_scope(id, in_scope)?;
            }
        }
        if let Some(error) = update.error {
            if self.variable(id).map(Variable::shows_error) != Some(error) {
                self.set_show_error(id, error)?;
            }
        }
        if let Some(page) = update.children {
            self.apply_child_page(id, page, session)?;
        }
        Ok(true)
    }

    fn apply_child_page(
        &mut self,
        id: NodeId,
        page: ChildPage,
        session: &mut dyn DebugSession,
    ) -> TreeResult<()> {
        let loaded = self.model.children(id).len();
        if page.offset != loaded {
            debug!(node = %id, offset = page.offset, loaded, "ignoring out-of-order child page");
            return Ok(());
        }
        let in_scope = self.variable(id).map_or(true, Variable::in_scope);
        for entry in page.children {
            let mut child = session.create_variable(id, &entry.expression, Some(&entry.name));
            child.set_top_level(false);
            child.in_scope = in_scope;
            self.append_variable(id, child, session)?;
        }
        self.model.set_has_more(id, page.has_more)
    }

    /// Asks the session for fresh values of `nodes` and all their variable
    /// descendants.
    pub fn refresh(&self, nodes: &[NodeId], session: &mut dyn DebugSession) {
        for &node in nodes {
            let subtree = std::iter::once(node).chain(self.model.descendants(node));
            for id in subtree {
                if let Some(var) = self.variable(id) {
                    if var.is_attached() {
                        session.refresh(id, var);
                    }
                }
            }
        }
    }

    /// A click on `id`. On an ellipsis row the owning variable asks the
    /// session for its remaining children; returns whether that happened.
    pub fn activate(&self, id: NodeId, session: &mut dyn DebugSession) -> bool {
        let Some(owner) = self.model.activate(id) else {
            return false;
        };
        let loaded = self.model.children(owner).len();
        match self.variable(owner) {
            Some(var) => {
                session.fetch_more_children(owner, var, loaded);
                true
            }
            None => {
                debug!(node = %owner, "ellipsis owner has nothing to fetch");
                false
            }
        }
    }

    /// Expand or collapse on behalf of the view. Watches and Locals feed the
    /// auto-update policy.
    pub fn set_expanded(
        &mut self,
        id: NodeId,
        expanded: bool,
        session: &mut dyn DebugSession,
    ) -> TreeResult<bool> {
        let changed = self.model.set_expanded(id, expanded)?;
        let container = matches!(
            self.model.item(id),
            Some(Item::Watches { .. } | Item::Locals { .. })
        );
        if changed && container {
            self.update_auto_update(session);
        }
        Ok(changed)
    }

    pub fn set_widget_visible(&mut self, visible: bool, session: &mut dyn DebugSession) {
        self.widget_visible = visible;
        self.update_auto_update(session);
    }

    pub fn is_widget_visible(&self) -> bool {
        self.widget_visible
    }

    /// Nothing while hidden; otherwise whatever containers are expanded.
    pub fn auto_update(&self) -> AutoUpdate {
        if !self.widget_visible {
            return AutoUpdate::NONE;
        }
        AutoUpdate {
            locals: self.locals.values().any(|id| self.model.is_expanded(*id)),
            watches: self.model.is_expanded(self.watches),
        }
    }

    pub fn update_auto_update(&self, session: &mut dyn DebugSession) {
        let update = self.auto_update();
        debug!(?update, "auto update");
        session.set_auto_update(update);
    }

    pub(super) fn forget_finish_result(&mut self, id: NodeId) {
        if let Some(Item::Watches { finish_result }) = self.model.item_mut(self.watches) {
            if *finish_result == Some(id) {
                *finish_result = None;
            }
        }
    }
}
