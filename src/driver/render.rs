use std::fmt::Write;

use crate::tree::NodeId;
use crate::variables::{
    CellData, DataRole, Highlight, VariableCollection, NAME_COLUMN, TYPE_COLUMN, VALUE_COLUMN,
};

/// Draws the expanded part of the tree, one row per line.
///
/// Rows are prefixed with `+` when collapsed with something to show and `-`
/// when expanded. With `paths` each line starts with the row path the
/// console accepts (`1/0`).
pub fn render(collection: &VariableCollection, paths: bool) -> String {
    let mut out = String::new();
    let model = collection.model();
    let root = collection.root();
    for (row, &child) in rows(collection, root).iter().enumerate() {
        render_row(collection, child, &[row], paths, &mut out);
    }
    if model.child_count(root) == 0 {
        out.push_str("(empty)\n");
    }
    out
}

fn rows(collection: &VariableCollection, id: NodeId) -> Vec<NodeId> {
    let model = collection.model();
    (0..model.child_count(id))
        .filter_map(|row| model.child(id, row))
        .collect()
}

fn render_row(
    collection: &VariableCollection,
    id: NodeId,
    path: &[usize],
    paths: bool,
    out: &mut String,
) {
    let model = collection.model();
    let depth = path.len() - 1;
    if paths {
        let joined: Vec<String> = path.iter().map(usize::to_string).collect();
        write!(out, "{:<8}", joined.join("/")).ok();
    }
    write!(out, "{}", "  ".repeat(depth)).ok();

    if model.is_ellipsis(id) {
        writeln!(out, "  {}", model.column_text(id, NAME_COLUMN)).ok();
        return;
    }

    let marker = match (model.child_count(id) > 0, model.is_expanded(id)) {
        (false, _) => ' ',
        (true, true) => '-',
        (true, false) => '+',
    };
    write!(out, "{} {}", marker, text(collection, id, NAME_COLUMN)).ok();

    if collection.variable(id).is_some() {
        let value = text(collection, id, VALUE_COLUMN);
        if !value.is_empty() {
            write!(out, " = {}", value).ok();
        }
        let type_name = text(collection, id, TYPE_COLUMN);
        if !type_name.is_empty() {
            write!(out, " : {}", type_name).ok();
        }
        match collection.data(id, VALUE_COLUMN, DataRole::Highlight) {
            Some(CellData::Highlight(Highlight::Inactive)) => out.push_str("  [out of scope]"),
            Some(CellData::Highlight(Highlight::Negative)) => out.push_str("  [null]"),
            Some(CellData::Highlight(Highlight::Neutral)) => out.push_str("  [changed]"),
            _ => {}
        }
    }
    out.push('\n');

    if model.is_expanded(id) {
        for (row, &child) in rows(collection, id).iter().enumerate() {
            let mut child_path = path.to_vec();
            child_path.push(row);
            render_row(collection, child, &child_path, paths, out);
        }
    }
}

fn text(collection: &VariableCollection, id: NodeId, column: usize) -> String {
    match collection.data(id, column, DataRole::Display) {
        Some(CellData::Text(text)) => text,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InspectorConfig;
    use crate::session::{ScriptedSession, Transcript};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_expanded_rows() {
        let mut collection = VariableCollection::new(InspectorConfig::default());
        let mut session = ScriptedSession::new(
            Transcript::from_json(
                r#"{"stops": [{"values": {
                    "p": {"value": "0x0", "type": "char *"},
                    "n": {"value": "3", "type": "int", "error": true}
                }}]}"#,
            )
            .unwrap(),
        );
        session.start();
        session.advance();
        collection.add_watch(&mut session, "p").unwrap();
        collection.add_watch(&mut session, "n").unwrap();
        collection.add_watch(&mut session, "gone").unwrap();
        for update in session.take_updates() {
            collection.apply_update(update, &mut session).unwrap();
        }
        let locals = collection.locals("Locals").unwrap();
        collection
            .update_locals(locals, &["i".to_string()], &mut session)
            .unwrap();

        assert_eq!(
            render(&collection, false),
            "- Auto\n    p = 0x0 : char *  [null]\n    n = Error : int\n    gone\n+ Locals\n"
        );
        assert!(render(&collection, true).starts_with("0       - Auto\n0/0       "));
    }

    #[test]
    fn test_ellipsis_row() {
        let mut collection = VariableCollection::new(InspectorConfig::default());
        let mut session = ScriptedSession::new(
            Transcript::from_json(
                r#"{"stops": [{"values": {"v": {"value": "[3]", "children": ["[0]"], "has_more": true}}}]}"#,
            )
            .unwrap(),
        );
        session.start();
        session.advance();
        let v = collection.add_watch(&mut session, "v").unwrap();
        for update in session.take_updates() {
            collection.apply_update(update, &mut session).unwrap();
        }
        collection.set_expanded(v, true, &mut session).unwrap();

        assert_eq!(render(&collection, false), "- Auto\n  - v = [3]\n      ...\n");
    }
}
