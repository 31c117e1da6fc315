use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AutoUpdate, ChildEntry, ChildPage, DebugSession, SessionState, VariableUpdate};
use crate::tree::NodeId;
use crate::variables::{Format, Variable};

/// A recorded debugging run: watches to set up, then one entry per stop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub watches: Vec<String>,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

impl Transcript {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// What the debugger reports when the program stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(default)]
    pub scopes: Vec<ScopeListing>,
    /// Values by expression, children included (`s.field`)
    #[serde(default)]
    pub values: BTreeMap<String, ScriptedValue>,
    /// Convenience variable holding the return value of a finished call
    #[serde(default)]
    pub finish_result: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeListing {
    pub name: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedValue {
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    /// Member names, in order
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub error: bool,
    /// `true` hides the children behind the ellipsis until fetched
    #[serde(default)]
    pub has_more: Option<bool>,
}

const DEFAULT_PAGE_SIZE: usize = 20;

/// A `DebugSession` that answers from a `Transcript`.
///
/// Requests are queued as `VariableUpdate`s and handed out by
/// `take_updates`, the way a real debugger answers some time later.
pub struct ScriptedSession {
    transcript: Transcript,
    position: Option<usize>,
    state: SessionState,
    previous: HashMap<String, String>,
    pending: Vec<VariableUpdate>,
    auto_update: AutoUpdate,
    page_size: usize,
    next_handle: u32,
}

impl ScriptedSession {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            position: None,
            state: SessionState::NotStarted,
            previous: HashMap::new(),
            pending: Vec::new(),
            auto_update: AutoUpdate::NONE,
            page_size: DEFAULT_PAGE_SIZE,
            next_handle: 0,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Starts (or restarts) the run from before the first stop.
    pub fn start(&mut self) {
        if self.state.is_started() {
            return;
        }
        self.state = SessionState::Running;
        self.position = None;
        self.previous.clear();
        self.pending.clear();
        info!(stops = self.transcript.stops.len(), "session started");
    }

    /// Moves to the next stop; `None` once the transcript is exhausted, which
    /// ends the session.
    pub fn advance(&mut self) -> Option<&Stop> {
        if !self.state.is_started() {
            return None;
        }
        let previous: HashMap<String, String> = self
            .current_stop()
            .map(|stop| {
                stop.values
                    .iter()
                    .map(|(expr, v)| (expr.clone(), v.value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        self.previous = previous;

        let next = self.position.map_or(0, |p| p + 1);
        if next >= self.transcript.stops.len() {
            info!("transcript exhausted, session ended");
            self.finish();
            return None;
        }
        self.position = Some(next);
        self.state = SessionState::Paused;
        debug!(stop = next, "stopped");
        self.transcript.stops.get(next)
    }

    pub fn finish(&mut self) {
        self.state = SessionState::Ended;
        self.pending.clear();
    }

    pub fn current_stop(&self) -> Option<&Stop> {
        self.position.and_then(|p| self.transcript.stops.get(p))
    }

    /// Zero-based index of the current stop.
    pub fn stop_number(&self) -> Option<usize> {
        self.position
    }

    pub fn auto_update(&self) -> AutoUpdate {
        self.auto_update
    }

    /// Answers produced since the last call, oldest first.
    pub fn take_updates(&mut self) -> Vec<VariableUpdate> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn lookup(&self, expression: &str) -> Option<&ScriptedValue> {
        self.current_stop()?.values.get(expression)
    }

    fn is_visible(&self, expression: &str) -> bool {
        let Some(stop) = self.current_stop() else {
            return false;
        };
        stop.values.contains_key(expression)
            || stop
                .scopes
                .iter()
                .any(|scope| scope.variables.iter().any(|v| v == expression))
    }

    fn value_update(&self, node: NodeId, variable: &Variable) -> VariableUpdate {
        let expression = variable.expression();
        let mut update = VariableUpdate::new(node);
        match self.lookup(expression) {
            Some(v) => {
                update.value = Some(render_value(&v.value, variable.format()));
                update.type_name = Some(v.type_name.clone());
                update.in_scope = Some(true);
                update.error = Some(v.error);
                if self
                    .previous
                    .get(expression)
                    .is_some_and(|old| *old != v.value)
                {
                    update.changed = Some(true);
                }
            }
            None => update.in_scope = Some(self.is_visible(expression)),
        }
        update
    }

    fn first_page(&self, expression: &str) -> Option<ChildPage> {
        let value = self.lookup(expression)?;
        if value.has_more == Some(true) {
            return Some(ChildPage {
                offset: 0,
                children: Vec::new(),
                has_more: true,
            });
        }
        if value.children.is_empty() {
            return None;
        }
        self.child_page(expression, 0)
    }

    fn child_page(&self, expression: &str, offset: usize) -> Option<ChildPage> {
        let value = self.lookup(expression)?;
        let total = value.children.len();
        let start = offset.min(total);
        let end = (start + self.page_size).min(total);
        let children = value.children[start..end]
            .iter()
            .map(|name| ChildEntry {
                expression: child_expression(expression, name),
                name: name.clone(),
            })
            .collect();
        Some(ChildPage {
            offset,
            children,
            has_more: end < total,
        })
    }
}

impl DebugSession for ScriptedSession {
    fn state(&self) -> SessionState {
        self.state
    }

    fn create_variable(
        &mut self,
        parent: NodeId,
        expression: &str,
        display: Option<&str>,
    ) -> Variable {
        debug!(%parent, expression, "create variable");
        let variable = Variable::new(expression);
        match display {
            Some(display) => variable.with_display(display),
            None => variable,
        }
    }

    fn attach_maybe(&mut self, node: NodeId, variable: &mut Variable) {
        if !self.state.is_started()
            || variable.is_attached()
            || !self.is_visible(variable.expression())
        {
            return;
        }
        self.next_handle += 1;
        variable.attach(format!("var{}", self.next_handle));
        let mut update = self.value_update(node, variable);
        update.children = self.first_page(variable.expression());
        self.pending.push(update);
    }

    fn refresh(&mut self, node: NodeId, variable: &Variable) {
        if !self.state.is_started() {
            return;
        }
        let update = self.value_update(node, variable);
        self.pending.push(update);
    }

    fn fetch_more_children(&mut self, node: NodeId, variable: &Variable, loaded: usize) {
        let Some(page) = self.child_page(variable.expression(), loaded) else {
            return;
        };
        let mut update = VariableUpdate::new(node);
        update.children = Some(page);
        self.pending.push(update);
    }

    fn format_changed(&mut self, node: NodeId, variable: &Variable) {
        let Some(value) = self.lookup(variable.expression()) else {
            return;
        };
        let mut update = VariableUpdate::new(node);
        update.value = Some(render_value(&value.value, variable.format()));
        self.pending.push(update);
    }

    fn set_auto_update(&mut self, update: AutoUpdate) {
        self.auto_update = update;
    }
}

fn child_expression(parent: &str, name: &str) -> String {
    if name.starts_with('[') {
        format!("{}{}", parent, name)
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Integer values are re-rendered in the requested base; anything else is
/// shown as recorded.
pub(crate) fn render_value(raw: &str, format: Format) -> String {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => raw.parse::<i64>().ok(),
    };
    match (parsed, format) {
        (None, _) | (_, Format::Natural) => raw.to_string(),
        (Some(n), Format::Binary) => format!("0b{:b}", n),
        (Some(n), Format::Octal) => format!("0{:o}", n),
        (Some(n), Format::Decimal) => n.to_string(),
        (Some(n), Format::Hexadecimal) => format!("0x{:x}", n),
    }
}
