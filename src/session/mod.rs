//! The debugger-session side of the inspector.
//!
//! The tree never talks to a debugger directly. It asks a `DebugSession` to
//! create, bind and refresh variables; the session answers later with
//! `VariableUpdate`s that the owner of the tree applies.

mod scripted;

pub use scripted::{ScopeListing, ScriptedSession, ScriptedValue, Stop, Transcript};

use crate::tree::NodeId;
use crate::variables::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    Paused,
    Ended,
}

impl SessionState {
    pub fn is_started(self) -> bool {
        !matches!(self, SessionState::NotStarted | SessionState::Ended)
    }
}

/// Which containers the session should refresh on each stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoUpdate {
    pub locals: bool,
    pub watches: bool,
}

impl AutoUpdate {
    pub const NONE: AutoUpdate = AutoUpdate {
        locals: false,
        watches: false,
    };
}

/// One child reported for a structured variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub expression: String,
    pub name: String,
}

/// A slice of a variable's children, starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChildPage {
    pub offset: usize,
    pub children: Vec<ChildEntry>,
    pub has_more: bool,
}

/// Result of an earlier attach, refresh or fetch request.
///
/// `None` fields leave the node untouched. The node may be gone by the time
/// the update is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableUpdate {
    pub node: NodeId,
    pub value: Option<String>,
    pub type_name: Option<String>,
    pub changed: Option<bool>,
    pub in_scope: Option<bool>,
    pub error: Option<bool>,
    pub children: Option<ChildPage>,
}

impl VariableUpdate {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            value: None,
            type_name: None,
            changed: None,
            in_scope: None,
            error: None,
            children: None,
        }
    }
}

/// What the inspector needs from a live debugger.
pub trait DebugSession {
    fn state(&self) -> SessionState;

    fn is_started(&self) -> bool {
        self.state().is_started()
    }

    /// Builds the payload for a new variable row under `parent`.
    fn create_variable(
        &mut self,
        parent: NodeId,
        expression: &str,
        display: Option<&str>,
    ) -> Variable;

    /// Binds `variable` to live evaluation if the debugger can evaluate it
    /// now. Safe to repeat, and a no-op when binding is impossible.
    fn attach_maybe(&mut self, node: NodeId, variable: &mut Variable);

    /// Asks for the latest value of an attached variable.
    fn refresh(&mut self, node: NodeId, variable: &Variable);

    /// Asks for the children after the first `loaded` ones.
    fn fetch_more_children(&mut self, node: NodeId, variable: &Variable, loaded: usize);

    /// The display format changed; the value should be rendered again.
    fn format_changed(&mut self, _node: NodeId, _variable: &Variable) {}

    fn set_auto_update(&mut self, _update: AutoUpdate) {}
}
