use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::collection::{Item, VariableCollection};
use crate::session::DebugSession;
use crate::tree::{NodeId, TreeResult};

impl VariableCollection {
    /// The Locals container for `scope`, created on first request.
    pub fn locals(&mut self, scope: &str) -> TreeResult<NodeId> {
        if let Some(id) = self.locals.get(scope) {
            return Ok(*id);
        }
        let root = self.model.root();
        let id = self.model.append_child(
            root,
            vec![scope.to_string(), String::new()],
            Item::Locals {
                scope: scope.to_string(),
            },
        )?;
        debug!(scope, node = %id, "new scope");
        self.locals.insert(scope.to_string(), id);
        Ok(id)
    }

    pub fn find_locals(&self, scope: &str) -> Option<NodeId> {
        self.locals.get(scope).copied()
    }

    pub fn all_locals(&self) -> &HashMap<String, NodeId> {
        &self.locals
    }

    /// Drops a scope container. Unknown scopes are logged and ignored.
    pub fn remove_locals(
        &mut self,
        scope: &str,
        session: &mut dyn DebugSession,
    ) -> TreeResult<bool> {
        let Some(id) = self.locals.remove(scope) else {
            warn!(scope, "no such scope, ignoring removal");
            return Ok(false);
        };
        self.model.remove_self(id)?;
        self.update_auto_update(session);
        Ok(true)
    }

    /// Marks every variable of a scope the debugger no longer reports as
    /// out of scope. Rows stay in place so their last values remain visible.
    pub fn retire_locals(&mut self, locals: NodeId) -> TreeResult<usize> {
        self.live(locals)?;
        let mut retired = 0;
        for child in self.model.children(locals).to_vec() {
            let in_scope = self.variable(child).map(|var| var.in_scope());
            if in_scope == Some(true) {
                self.set_in_scope(child, false)?;
                retired += 1;
            }
        }
        debug!(node = %locals, retired, "scope left");
        Ok(retired)
    }

    /// Brings the children of `locals` in line with the names the debugger
    /// reports for that scope.
    ///
    /// New names are appended after the kept ones and stale ones removed;
    /// kept rows are not touched, so their expansion and position survive
    /// the step. Value refreshes are left to the caller, who gets the final
    /// children back.
    pub fn update_locals(
        &mut self,
        locals: NodeId,
        reported: &[String],
        session: &mut dyn DebugSession,
    ) -> TreeResult<Vec<NodeId>> {
        self.live(locals)?;

        let mut existing: HashSet<String> = self
            .child_expressions(locals)
            .into_iter()
            .map(str::to_owned)
            .collect();
        for name in reported {
            if existing.insert(name.clone()) {
                let variable = session.create_variable(locals, name, None);
                self.model
                    .append_child(locals, variable.columns(), Item::Variable(variable))?;
            }
        }

        let current: HashSet<&str> = reported.iter().map(String::as_str).collect();
        let mut row = 0;
        while let Some(&child) = self.model.children(locals).get(row) {
            let keep = self
                .expression(child)
                .is_some_and(|expr| current.contains(expr));
            if keep {
                row += 1;
            } else {
                self.model.remove_child(locals, row)?;
            }
        }

        // A fresh listing is complete.
        self.model.set_has_more(locals, false)?;

        Ok(self.model.children(locals).to_vec())
    }

    /// `locals(scope)` followed by `update_locals`.
    pub fn update_scope(
        &mut self,
        scope: &str,
        reported: &[String],
        session: &mut dyn DebugSession,
    ) -> TreeResult<Vec<NodeId>> {
        let id = self.locals(scope)?;
        self.update_locals(id, reported, session)
    }
}
