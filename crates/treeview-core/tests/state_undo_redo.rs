use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use treeview_core::{ExpandMode, FlagSink, Record, TreeConfig, TreeItem, TreeView};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Write {
    Expanded(String, bool),
    Visible(String, bool),
}

#[derive(Clone, Default)]
struct RecordingSink(Rc<RefCell<Vec<Write>>>);

impl RecordingSink {
    fn take(&self) -> Vec<Write> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl FlagSink<Record> for RecordingSink {
    fn set_expanded(&mut self, record: &Record, expanded: bool) {
        self.0
            .borrow_mut()
            .push(Write::Expanded(record.record_key().into_owned(), expanded));
    }

    fn set_visible(&mut self, record: &Record, visible: bool) {
        self.0
            .borrow_mut()
            .push(Write::Visible(record.record_key().into_owned(), visible));
    }
}

/// root ─┬─ a ─┬─ a1
///       │     └─ a2 ── a2x
///       └─ b
/// solo
fn items() -> Vec<Record> {
    vec![
        Record::new("root"),
        Record::new("a").with_parent("root"),
        Record::new("a1").with_parent("a"),
        Record::new("a2").with_parent("a"),
        Record::new("a2x").with_parent("a2"),
        Record::new("b").with_parent("root"),
        Record::new("solo"),
    ]
}

fn view_with_sink(config: TreeConfig) -> (TreeView<Record>, RecordingSink) {
    let sink = RecordingSink::default();
    let view = TreeView::builder(items())
        .config(config)
        .flag_sink(sink.clone())
        .build()
        .unwrap();
    (view, sink)
}

fn expanded(view: &TreeView<Record>) -> HashSet<String> {
    view.state().expanded().clone()
}

fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_visibility_cascade_writes_every_descendant() {
    let (mut view, sink) = view_with_sink(TreeConfig::default());
    let before = view.state().visible().len();

    // "a" has 3 descendants.
    assert!(view.toggle_visibility("a"));
    let writes = sink.take();
    assert_eq!(writes.len(), 4);
    assert_eq!(before - view.state().visible().len(), 4);
    for id in ["a", "a1", "a2", "a2x"] {
        assert!(!view.is_visible(id));
        assert!(writes.contains(&Write::Visible(id.to_string(), false)));
    }
    assert!(view.is_visible("root"));
    assert!(view.is_visible("b"));

    assert!(view.undo());
    assert_eq!(sink.take().len(), 4);
    assert_eq!(view.state().visible().len(), before);
}

#[test]
fn test_set_visibility_records_only_changes() {
    let (mut view, sink) = view_with_sink(TreeConfig::default());
    assert!(!view.set_visibility("a", true));
    assert!(!view.can_undo());

    assert!(view.set_visibility("a", false));
    assert_eq!(sink.take(), vec![Write::Visible("a".into(), false)]);
    // Not cascaded.
    assert!(view.is_visible("a1"));
    assert!(view.can_undo());
}

#[test]
fn test_single_expand_collapses_siblings_in_one_undo_unit() {
    let config = TreeConfig::default().with_expand_mode(ExpandMode::Single);
    let (mut view, sink) = view_with_sink(config);

    view.toggle_expanded("root");
    view.toggle_expanded("a");
    view.toggle_expanded("a2");
    sink.take();

    // Expanding "b" collapses its sibling "a" but leaves a's descendants alone.
    view.toggle_expanded("b");
    assert_eq!(expanded(&view), set(&["root", "b", "a2"]));
    assert_eq!(
        sink.take(),
        vec![
            Write::Expanded("a".into(), false),
            Write::Expanded("b".into(), true),
        ]
    );

    assert!(view.undo());
    assert_eq!(expanded(&view), set(&["root", "a", "a2"]));

    // Roots are independent of each other.
    view.toggle_expanded("solo");
    assert_eq!(expanded(&view), set(&["root", "a", "a2", "solo"]));
}

#[test]
fn test_expand_to_level_is_exact() {
    let (mut view, _) = view_with_sink(TreeConfig::default());
    view.toggle_expanded("a2");

    for level in 0..5 {
        view.expand_to_level(level);
        let expected: HashSet<String> = view
            .index()
            .nodes()
            .filter(|n| !n.is_leaf && n.level < level)
            .map(|n| n.id.clone())
            .collect();
        assert_eq!(expanded(&view), expected, "level {level}");
    }

    view.expand_to_level(0);
    assert!(expanded(&view).is_empty());
}

#[test]
fn test_expand_all_collapse_all_and_sinks() {
    let (mut view, sink) = view_with_sink(TreeConfig::default());
    assert!(view.expand_all());
    assert_eq!(expanded(&view), set(&["root", "a", "a2"]));
    let writes = sink.take();
    assert_eq!(
        writes,
        vec![
            Write::Expanded("root".into(), true),
            Write::Expanded("a".into(), true),
            Write::Expanded("a2".into(), true),
        ]
    );

    assert!(!view.expand_all());
    assert!(sink.take().is_empty());

    assert!(view.collapse_all());
    assert!(expanded(&view).is_empty());
    assert_eq!(sink.take().len(), 3);

    assert!(view.undo());
    assert_eq!(expanded(&view), set(&["root", "a", "a2"]));
}

#[test]
fn test_new_action_clears_redo() {
    let (mut view, _) = view_with_sink(TreeConfig::default());
    view.toggle_expanded("root");
    view.toggle_expanded("a");
    view.undo();
    assert!(view.can_redo());

    view.toggle_expanded("a2");
    assert!(!view.can_redo());
    assert!(!view.redo());
    assert_eq!(view.history().undo_depth, 2);
}

#[test]
fn test_empty_log_and_disabled_history_are_noops() {
    let (mut view, sink) = view_with_sink(TreeConfig::default());
    assert!(!view.undo());
    assert!(!view.redo());
    assert!(sink.take().is_empty());

    let (mut view, _) = view_with_sink(TreeConfig::default().with_undo_redo(false));
    view.toggle_expanded("root");
    assert!(!view.can_undo());
    assert!(!view.undo());
    assert!(view.is_expanded("root"));
}

#[test]
fn test_history_capacity_drops_oldest() {
    let (mut view, _) = view_with_sink(TreeConfig::default().with_max_history(2));
    view.toggle_expanded("root");
    view.toggle_expanded("a");
    view.toggle_expanded("a2");
    assert_eq!(view.history().undo_depth, 2);

    assert!(view.undo());
    assert!(view.undo());
    assert!(!view.undo());
    assert_eq!(expanded(&view), set(&["root"]));
}

#[test]
fn test_default_expand_level_writes_sinks() {
    let sink = RecordingSink::default();
    let items = vec![
        Record::new("r"),
        Record::new("c").with_parent("r"),
        Record::new("g").with_parent("c"),
        Record::new("x").with_parent("g"),
        Record::new("persisted").with_expanded(true),
        Record::new("p1").with_parent("persisted"),
    ];
    let view = TreeView::builder(items)
        .config(TreeConfig::default().with_default_expand_level(2))
        .flag_sink(sink.clone())
        .build()
        .unwrap();

    assert_eq!(expanded(&view), set(&["r", "c", "persisted"]));
    let writes = sink.take();
    assert!(writes.contains(&Write::Expanded("r".into(), true)));
    assert!(writes.contains(&Write::Expanded("c".into(), true)));
    // Already persisted as expanded: no write.
    assert_eq!(writes.len(), 2);
    assert!(!view.can_undo());
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    expanded: HashSet<String>,
    visible: HashSet<String>,
}

fn snapshot(view: &TreeView<Record>) -> Snapshot {
    Snapshot {
        expanded: view.state().expanded().clone(),
        visible: view.state().visible().clone(),
    }
}

#[test]
fn test_random_undo_redo_round_trip() {
    let ids = ["root", "a", "a1", "a2", "a2x", "b", "solo", "missing"];

    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mode = if rng.gen_bool(0.5) {
            ExpandMode::Single
        } else {
            ExpandMode::Multiple
        };
        let (mut view, _) = view_with_sink(TreeConfig::default().with_expand_mode(mode));

        let mut applied = 0;
        for _ in 0..30 {
            let id = ids[rng.gen_range(0..ids.len())];
            let changed = match rng.gen_range(0..7) {
                0 | 1 => view.toggle_expanded(id),
                2 => view.toggle_visibility(id),
                3 => view.set_visibility(id, rng.gen_bool(0.5)),
                4 => view.expand_all(),
                5 => view.collapse_all(),
                _ => view.expand_to_level(rng.gen_range(0..4)),
            };
            if changed {
                applied += 1;
            }
        }
        assert_eq!(view.history().undo_depth, applied, "seed {seed}");

        let after = snapshot(&view);
        for _ in 0..applied {
            assert!(view.undo(), "seed {seed}");
        }
        assert!(!view.can_undo());
        for _ in 0..applied {
            assert!(view.redo(), "seed {seed}");
        }
        assert_eq!(snapshot(&view), after, "seed {seed}");
    }
}
