use tracing::{debug, warn};

use super::collection::{Item, VariableCollection};
use crate::error::TreeError;
use crate::session::DebugSession;
use crate::tree::{NodeId, TreeResult};

impl VariableCollection {
    /// Watches `expression`. Without a started session nothing is created.
    pub fn add_watch(
        &mut self,
        session: &mut dyn DebugSession,
        expression: &str,
    ) -> Option<NodeId> {
        if !session.is_started() {
            debug!(expression, "no active session, watch not added");
            return None;
        }
        let variable = session.create_variable(self.watches, expression, None);
        let id = match self.append_variable(self.watches, variable, session) {
            Ok(id) => id,
            Err(err) => {
                warn!(%err, expression, "could not add watch");
                return None;
            }
        };
        self.expand_on_first_watch(session);
        Some(id)
    }

    /// Shows the value returned by the function just finished, replacing
    /// the previous one.
    pub fn add_finish_result(
        &mut self,
        session: &mut dyn DebugSession,
        convenience_variable: &str,
    ) -> Option<NodeId> {
        if !session.is_started() {
            return None;
        }
        self.remove_finish_result();

        let label = self.config.finish_result_label.clone();
        let variable = session.create_variable(self.watches, convenience_variable, Some(&label));
        let id = match self.append_variable(self.watches, variable, session) {
            Ok(id) => id,
            Err(err) => {
                warn!(%err, "could not add finish result");
                return None;
            }
        };
        if let Some(Item::Watches { finish_result }) = self.model.item_mut(self.watches) {
            *finish_result = Some(id);
        }
        self.expand_on_first_watch(session);
        Some(id)
    }

    pub fn remove_finish_result(&mut self) {
        let Some(id) = self.finish_result() else {
            return;
        };
        self.forget_finish_result(id);
        if let Err(err) = self.die(id) {
            warn!(%err, "could not remove finish result");
        }
    }

    /// The finish-result row, if one is shown.
    pub fn finish_result(&self) -> Option<NodeId> {
        match self.model.item(self.watches) {
            Some(Item::Watches { finish_result }) => {
                finish_result.filter(|id| self.model.contains(*id))
            }
            _ => None,
        }
    }

    /// Removes one watch chosen by the user.
    pub fn remove_watch(&mut self, id: NodeId) -> TreeResult<()> {
        if self.model.parent(id) != Some(self.watches) {
            return Err(TreeError::NotAVariable(id));
        }
        self.die(id)
    }

    /// Binds every watch again, after the session restarted.
    pub fn reinstall(&mut self, session: &mut dyn DebugSession) {
        let watches: Vec<NodeId> = self.model.children(self.watches).to_vec();
        for id in watches {
            if let Some(var) = self.model.item_mut(id).and_then(Item::as_variable_mut) {
                var.detach();
                session.attach_maybe(id, var);
            }
        }
    }

    /// User-entered watch expressions, finish result excluded.
    pub fn watch_expressions(&self) -> Vec<String> {
        let finish = self.finish_result();
        self.model
            .children(self.watches)
            .iter()
            .filter(|id| Some(**id) != finish)
            .filter_map(|id| self.expression(*id))
            .map(str::to_owned)
            .collect()
    }

    fn expand_on_first_watch(&mut self, session: &mut dyn DebugSession) {
        let watches = self.watches;
        if self.model.child_count(watches) == 1 && !self.model.is_expanded(watches) {
            if let Err(err) = self.set_expanded(watches, true, session) {
                warn!(%err, "could not expand watches");
            }
        }
    }
}
