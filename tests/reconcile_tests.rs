// tests/reconcile_tests.rs
// Locals reconciliation and lazy children through the public API

use debug_inspector::config::InspectorConfig;
use debug_inspector::session::{DebugSession, ScriptedSession, Stop, Transcript};
use debug_inspector::tree::{ModelEvent, ModelIndex, NodeId, RecordingSink};
use debug_inspector::variables::VariableCollection;

#[cfg(test)]
mod reconcile_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Paused at the first stop; an empty transcript gets one empty stop.
    fn fresh(mut transcript: Transcript) -> (VariableCollection, ScriptedSession, RecordingSink) {
        if transcript.stops.is_empty() {
            transcript.stops.push(Stop::default());
        }
        let sink = RecordingSink::new();
        let collection =
            VariableCollection::new(InspectorConfig::default()).with_sink(Box::new(sink.clone()));
        let mut session = ScriptedSession::new(transcript);
        session.start();
        session.advance();
        (collection, session, sink)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn pump(collection: &mut VariableCollection, session: &mut ScriptedSession) {
        loop {
            let updates = session.take_updates();
            if updates.is_empty() {
                break;
            }
            for update in updates {
                collection.apply_update(update, session).unwrap();
            }
        }
    }

    #[test]
    fn test_new_local_is_appended_once() {
        let (mut collection, mut session, sink) = fresh(Transcript::default());
        let locals = collection.locals("Locals").unwrap();
        let before = collection
            .update_locals(locals, &names(&["a", "b"]), &mut session)
            .unwrap();
        sink.clear();

        let after = collection
            .update_locals(locals, &names(&["a", "b", "c"]), &mut session)
            .unwrap();

        assert_eq!(&after[..2], &before[..]);
        assert_eq!(collection.child_expressions(locals), vec!["a", "b", "c"]);
        assert_eq!(
            sink.events(),
            vec![
                ModelEvent::BeginInsertRows {
                    parent: ModelIndex::new(vec![1], 0),
                    first: 2,
                    last: 2,
                },
                ModelEvent::EndInsertRows,
            ]
        );
    }

    #[test]
    fn test_stale_locals_are_removed() {
        let (mut collection, mut session, sink) = fresh(Transcript::default());
        let locals = collection.locals("Locals").unwrap();
        let before = collection
            .update_locals(locals, &names(&["a", "b", "c"]), &mut session)
            .unwrap();
        sink.clear();

        let after = collection
            .update_locals(locals, &names(&["b"]), &mut session)
            .unwrap();

        assert_eq!(after, vec![before[1]]);
        let removals = sink
            .events()
            .iter()
            .filter(|e| matches!(e, ModelEvent::BeginRemoveRows { .. }))
            .count();
        assert_eq!(removals, 2);
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, ModelEvent::BeginInsertRows { .. })));
    }

    #[test]
    fn test_repeated_listing_is_silent() {
        let (mut collection, mut session, sink) = fresh(Transcript::default());
        let listing = names(&["x", "y", "z"]);
        let first = collection
            .update_scope("Locals", &listing, &mut session)
            .unwrap();
        sink.clear();

        let second = collection
            .update_scope("Locals", &listing, &mut session)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(sink.structural_count(), 0);
    }

    #[test]
    fn test_children_follow_every_listing() {
        let listings: &[&[&str]] = &[
            &["a", "b", "c"],
            &["c", "d"],
            &["e", "a", "d", "c"],
            &[],
            &["b", "b", "a"],
            &["a", "b", "c", "d", "e"],
            &["e"],
        ];
        let (mut collection, mut session, _sink) = fresh(Transcript::default());
        let locals = collection.locals("Locals").unwrap();
        let mut expected: Vec<String> = Vec::new();

        for listing in listings {
            let reported = names(listing);
            expected.retain(|name| reported.contains(name));
            for name in &reported {
                if !expected.contains(name) {
                    expected.push(name.clone());
                }
            }

            collection
                .update_locals(locals, &reported, &mut session)
                .unwrap();

            assert_eq!(collection.child_expressions(locals), expected);
            assert!(!collection.model().has_more(locals));
        }
    }

    #[test]
    fn test_ellipsis_gives_way_to_fetched_child() {
        let transcript = Transcript::from_json(
            r#"{"stops": [{"values": {
                "v": {"value": "{...}", "type": "node", "children": ["x"], "has_more": true}
            }}]}"#,
        )
        .unwrap();
        let (mut collection, mut session, sink) = fresh(transcript);
        let v = collection.add_watch(&mut session, "v").unwrap();
        pump(&mut collection, &mut session);
        assert!(collection.model().has_more(v));
        let marker = collection.model().child(v, 0).unwrap();
        assert!(collection.model().is_ellipsis(marker));
        sink.clear();

        assert!(collection.activate(marker, &mut session));
        pump(&mut collection, &mut session);

        let at_v = ModelIndex::new(vec![0, 0], 0);
        assert_eq!(
            sink.events(),
            vec![
                ModelEvent::BeginRemoveRows {
                    parent: at_v.clone(),
                    first: 0,
                    last: 0,
                },
                ModelEvent::EndRemoveRows,
                ModelEvent::BeginInsertRows {
                    parent: at_v,
                    first: 0,
                    last: 0,
                },
                ModelEvent::EndInsertRows,
            ]
        );
        assert_eq!(collection.child_expressions(v), vec!["v.x"]);
        assert!(!collection.model().has_more(v));
        assert!(!collection.contains(marker));
    }

    #[test]
    fn test_late_answer_for_removed_row_is_dropped() {
        let transcript = Transcript::from_json(
            r#"{"stops": [{"scopes": [{"name": "Locals", "variables": ["a"]}],
                           "values": {"a": {"value": "1"}}}]}"#,
        )
        .unwrap();
        let (mut collection, mut session, _sink) = fresh(transcript);
        let locals = collection.locals("Locals").unwrap();
        let kids = collection
            .update_locals(locals, &names(&["a"]), &mut session)
            .unwrap();
        collection.attach(&kids, &mut session);
        let pending = session.take_updates();
        assert_eq!(pending.len(), 1);

        collection
            .update_locals(locals, &[], &mut session)
            .unwrap();

        for update in pending {
            assert_eq!(collection.apply_update(update, &mut session), Ok(false));
        }
        assert_eq!(collection.model().child_count(locals), 0);
    }

    #[test]
    fn test_scope_change_reaches_grandchildren() {
        let transcript = Transcript::from_json(
            r#"{"stops": [{"values": {
                "s": {"value": "{...}", "children": ["inner"]},
                "s.inner": {"value": "{...}", "children": ["leaf"]},
                "s.inner.leaf": {"value": "4"}
            }}]}"#,
        )
        .unwrap();
        let (mut collection, mut session, _sink) = fresh(transcript);
        let s = collection.add_watch(&mut session, "s").unwrap();
        pump(&mut collection, &mut session);
        let subtree: Vec<NodeId> = collection.model().descendants(s);
        assert_eq!(subtree.len(), 2);

        collection.set_in_scope(s, false).unwrap();

        for id in subtree {
            assert!(!collection.variable(id).unwrap().in_scope());
        }
    }

    #[test]
    fn test_one_finish_result_at_a_time() {
        let (mut collection, mut session, _sink) = fresh(Transcript::default());
        assert!(session.is_started());
        for convenience in ["$1", "$2", "$3"] {
            collection.add_finish_result(&mut session, convenience);
        }
        let watches = collection.watches();
        assert_eq!(collection.child_expressions(watches), vec!["$3"]);
    }
}
