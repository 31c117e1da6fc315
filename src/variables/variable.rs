use std::fmt;

use super::collection::{Item, VariableCollection};
use crate::error::TreeError;
use crate::session::DebugSession;
use crate::tree::{NodeId, TreeResult};

pub const NAME_COLUMN: usize = 0;
pub const VALUE_COLUMN: usize = 1;
pub const TYPE_COLUMN: usize = 2;

/// How the debugger should render a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Natural,
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Natural,
        Format::Binary,
        Format::Octal,
        Format::Decimal,
        Format::Hexadecimal,
    ];

    /// Case-insensitive; anything unrecognised is `Natural`.
    pub fn parse(text: &str) -> Format {
        match text.to_ascii_lowercase().as_str() {
            "binary" => Format::Binary,
            "octal" => Format::Octal,
            "decimal" => Format::Decimal,
            "hexadecimal" => Format::Hexadecimal,
            _ => Format::Natural,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Natural => "natural",
            Format::Binary => "binary",
            Format::Octal => "octal",
            Format::Decimal => "decimal",
            Format::Hexadecimal => "hexadecimal",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inspected expression.
///
/// Value and type live in the row's columns; this carries everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    expression: String,
    name: String,
    handle: Option<String>,
    pub(crate) in_scope: bool,
    top_level: bool,
    pub(crate) changed: bool,
    pub(crate) show_error: bool,
    pub(crate) format: Format,
}

impl Variable {
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        Variable {
            name: expression.clone(),
            expression,
            handle: None,
            in_scope: true,
            top_level: true,
            changed: false,
            show_error: false,
            format: Format::Natural,
        }
    }

    /// Shows `display` in the name column instead of the expression.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.name = display.into();
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Text of the name column.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session-side identity once attached.
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    pub fn attach(&mut self, handle: impl Into<String>) {
        self.handle = Some(handle.into());
    }

    pub fn detach(&mut self) {
        self.handle = None;
    }

    pub fn in_scope(&self) -> bool {
        self.in_scope
    }

    pub fn is_top_level(&self) -> bool {
        self.top_level
    }

    pub fn set_top_level(&mut self, top_level: bool) {
        self.top_level = top_level;
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn shows_error(&self) -> bool {
        self.show_error
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub(crate) fn columns(&self) -> Vec<String> {
        vec![self.name.clone(), String::new(), String::new()]
    }
}

/// A value equal to the configured null-pointer text gets a warning colour.
pub fn is_potential_problematic_value(value: &str, null_pointer: &str) -> bool {
    value == null_pointer
}

/// Kind of information a view asks a cell for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRole {
    Display,
    ToolTip,
    Decoration,
    Highlight,
    Italic,
}

/// Foreground class for a value cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// Variable is out of scope
    Inactive,
    /// Value looks like a null pointer
    Negative,
    /// Value changed at the last stop
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellData {
    Text(String),
    Highlight(Highlight),
    Flag(bool),
}

impl VariableCollection {
    fn variable_mut(&mut self, id: NodeId) -> TreeResult<&mut Variable> {
        self.live(id)?;
        self.model
            .item_mut(id)
            .and_then(Item::as_variable_mut)
            .ok_or(TreeError::NotAVariable(id))
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> TreeResult<()> {
        self.variable_mut(id)?;
        self.model.set_column(id, VALUE_COLUMN, value)?;
        self.model.report_change_column(id, VALUE_COLUMN)
    }

    pub fn set_type(&mut self, id: NodeId, type_name: impl Into<String>) -> TreeResult<()> {
        self.variable_mut(id)?;
        self.model.set_column(id, TYPE_COLUMN, type_name)?;
        self.model.report_change_column(id, TYPE_COLUMN)
    }

    /// Scope applies to the whole subtree; only `id`'s row is announced,
    /// descendants pick the flag up when they are next drawn.
    pub fn set_in_scope(&mut self, id: NodeId, in_scope: bool) -> TreeResult<()> {
        self.variable_mut(id)?.in_scope = in_scope;
        for descendant in self.model.descendants(id) {
            if let Some(var) = self.model.item_mut(descendant).and_then(Item::as_variable_mut) {
                var.in_scope = in_scope;
            }
        }
        self.model.report_change(id)
    }

    pub fn set_changed(&mut self, id: NodeId, changed: bool) -> TreeResult<()> {
        self.variable_mut(id)?.changed = changed;
        self.model.report_change(id)
    }

    pub fn set_show_error(&mut self, id: NodeId, show_error: bool) -> TreeResult<()> {
        self.variable_mut(id)?.show_error = show_error;
        self.model.report_change(id)
    }

    /// Asks the session to re-render the value when the format really changed.
    pub fn set_format(
        &mut self,
        id: NodeId,
        format: Format,
        session: &mut dyn DebugSession,
    ) -> TreeResult<()> {
        let var = self.variable_mut(id)?;
        if var.format == format {
            return Ok(());
        }
        var.format = format;
        if let Some(var) = self.variable(id) {
            session.format_changed(id, var);
        }
        Ok(())
    }

    /// Clears "changed" on `id` and everything below it. Rows whose flag was
    /// not set are not announced.
    pub fn reset_changed_under(&mut self, id: NodeId) -> TreeResult<()> {
        self.live(id)?;
        let mut nodes = vec![id];
        nodes.extend(self.model.descendants(id));
        for node in nodes {
            let was_changed = match self.model.item_mut(node).and_then(Item::as_variable_mut) {
                Some(var) => std::mem::replace(&mut var.changed, false),
                None => false,
            };
            if was_changed {
                self.model.report_change(node)?;
            }
        }
        Ok(())
    }

    /// Removes the variable from its parent and destroys it.
    pub fn die(&mut self, id: NodeId) -> TreeResult<()> {
        self.variable_mut(id)?;
        self.forget_finish_result(id);
        self.model.remove_self(id)
    }

    pub fn is_potential_problematic(&self, id: NodeId) -> bool {
        is_potential_problematic_value(self.value(id), &self.config.null_pointer)
    }

    /// What a view shows for `column` of `id` in `role`.
    pub fn data(&self, id: NodeId, column: usize, role: DataRole) -> Option<CellData> {
        let node = self.model.node(id)?;
        let text = node.column(column);
        let Some(var) = node.item().and_then(Item::as_variable) else {
            return match role {
                DataRole::Display => Some(CellData::Text(text.to_string())),
                _ => None,
            };
        };

        match role {
            DataRole::Display if var.show_error && column == VALUE_COLUMN => {
                Some(CellData::Text(self.config.error_label.clone()))
            }
            DataRole::Display | DataRole::ToolTip => Some(CellData::Text(text.to_string())),
            DataRole::Italic => Some(CellData::Flag(var.show_error)),
            DataRole::Highlight if column == VALUE_COLUMN => {
                let highlight = if !var.in_scope {
                    Some(Highlight::Inactive)
                } else if is_potential_problematic_value(text, &self.config.null_pointer) {
                    Some(Highlight::Negative)
                } else if var.changed {
                    Some(Highlight::Neutral)
                } else {
                    None
                };
                highlight.map(CellData::Highlight)
            }
            DataRole::Highlight | DataRole::Decoration => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InspectorConfig;
    use crate::session::{ScriptedSession, Transcript};
    use crate::tree::{ModelEvent, RecordingSink};

    fn setup() -> (VariableCollection, ScriptedSession, RecordingSink) {
        let sink = RecordingSink::new();
        let collection =
            VariableCollection::new(InspectorConfig::default()).with_sink(Box::new(sink.clone()));
        let mut session = ScriptedSession::new(Transcript::default());
        session.start();
        (collection, session, sink)
    }

    #[test]
    fn test_format_round_trip() {
        for format in Format::ALL {
            assert_eq!(Format::parse(format.as_str()), format);
            assert_eq!(Format::parse(&format.to_string().to_uppercase()), format);
        }
        assert_eq!(Format::parse("Hexadecimal"), Format::Hexadecimal);
        assert_eq!(Format::parse("garbage"), Format::Natural);
        assert_eq!(Format::parse(""), Format::Natural);
        assert_eq!(Format::Natural.as_str(), "natural");
    }

    #[test]
    fn test_set_value_reports_single_column() {
        let (mut collection, mut session, sink) = setup();
        let id = collection.add_watch(&mut session, "x").unwrap();
        sink.clear();

        collection.set_value(id, "42").unwrap();
        collection.set_type(id, "int").unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ModelEvent::DataChanged { top_left, bottom_right } => {
                assert_eq!(top_left.column(), VALUE_COLUMN);
                assert_eq!(bottom_right.column(), VALUE_COLUMN);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(collection.value(id), "42");
        assert_eq!(collection.type_name(id), "int");
    }

    #[test]
    fn test_value_update_keeps_changed_flag() {
        let (mut collection, mut session, _sink) = setup();
        let id = collection.add_watch(&mut session, "x").unwrap();
        collection.set_changed(id, true).unwrap();
        collection.set_value(id, "7").unwrap();
        assert!(collection.variable(id).unwrap().is_changed());

        collection.reset_changed().unwrap();
        assert!(!collection.variable(id).unwrap().is_changed());
        assert_eq!(collection.value(id), "7");
    }

    #[test]
    fn test_highlight_priority() {
        let (mut collection, mut session, _sink) = setup();
        let id = collection.add_watch(&mut session, "p").unwrap();
        let highlight = |c: &VariableCollection| c.data(id, VALUE_COLUMN, DataRole::Highlight);

        assert_eq!(highlight(&collection), None);
        collection.set_changed(id, true).unwrap();
        assert_eq!(highlight(&collection), Some(CellData::Highlight(Highlight::Neutral)));
        collection.set_value(id, "0x0").unwrap();
        assert!(collection.is_potential_problematic(id));
        assert_eq!(highlight(&collection), Some(CellData::Highlight(Highlight::Negative)));
        collection.set_in_scope(id, false).unwrap();
        assert_eq!(highlight(&collection), Some(CellData::Highlight(Highlight::Inactive)));
        assert_eq!(collection.data(id, VALUE_COLUMN, DataRole::Decoration), None);
    }

    #[test]
    fn test_error_display() {
        let (mut collection, mut session, _sink) = setup();
        let id = collection.add_watch(&mut session, "bad").unwrap();
        collection.set_value(id, "<cannot read>").unwrap();
        collection.set_show_error(id, true).unwrap();

        assert_eq!(
            collection.data(id, VALUE_COLUMN, DataRole::Display),
            Some(CellData::Text("Error".to_string()))
        );
        assert_eq!(
            collection.data(id, VALUE_COLUMN, DataRole::ToolTip),
            Some(CellData::Text("<cannot read>".to_string()))
        );
        assert_eq!(
            collection.data(id, NAME_COLUMN, DataRole::Italic),
            Some(CellData::Flag(true))
        );
    }

    #[test]
    fn test_set_format_is_noop_when_unchanged() {
        let (mut collection, mut session, _sink) = setup();
        let id = collection.add_watch(&mut session, "n").unwrap();
        collection.set_format(id, Format::Natural, &mut session).unwrap();
        assert!(session.take_updates().iter().all(|u| u.value.is_none()));

        collection.set_format(id, Format::Hexadecimal, &mut session).unwrap();
        assert_eq!(collection.variable(id).unwrap().format(), Format::Hexadecimal);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "stale node handle")]
    fn test_setter_on_removed_watch_fails_fast() {
        let (mut collection, mut session, _sink) = setup();
        let id = collection.add_watch(&mut session, "n").unwrap();
        collection.remove_watch(id).unwrap();
        let _ = collection.set_value(id, "1");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_setter_on_removed_watch_is_an_error() {
        let (mut collection, mut session, _sink) = setup();
        let id = collection.add_watch(&mut session, "n").unwrap();
        collection.remove_watch(id).unwrap();
        assert_eq!(collection.set_value(id, "1"), Err(TreeError::StaleNode(id)));
        assert_eq!(collection.reset_changed_under(id), Err(TreeError::StaleNode(id)));
    }

    #[test]
    fn test_non_variable_nodes_reject_variable_ops() {
        let (mut collection, _session, _sink) = setup();
        let watches = collection.watches();
        assert_eq!(
            collection.set_value(watches, "1"),
            Err(TreeError::NotAVariable(watches))
        );
        assert_eq!(
            collection.data(watches, NAME_COLUMN, DataRole::Display),
            Some(CellData::Text("Auto".to_string()))
        );
        assert_eq!(collection.data(watches, NAME_COLUMN, DataRole::ToolTip), None);
    }
}
