use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;
use treeview_core::{
    ActionError, ActionFn, ActionSlot, AriaAttributes, ConfigError, Connector, ContextAction,
    DiagnosticEvent, FieldValue, Guide, Modifiers, Record, SelectionMode, TreeChangeKind,
    TreeConfig, TreeItem, TreeMetrics, TreeView,
};

fn items() -> Vec<Record> {
    vec![
        Record::new("docs").with_field("title", "Documents"),
        Record::new("inv").with_parent("docs").with_field("title", "Invoices"),
        Record::new("q1").with_parent("inv").with_field("title", "Q1"),
        Record::new("rec").with_parent("docs").with_field("title", "Receipts"),
        Record::new("pics").with_field("title", "Pictures"),
    ]
}

fn config() -> TreeConfig {
    TreeConfig::default().with_label_field("title")
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = TreeView::new(items(), config().with_item_size(-1.0)).unwrap_err();
    assert_eq!(err, ConfigError::InvalidItemSize(-1.0));
    assert!(err.to_string().contains("item size"));
}

#[test]
fn test_rows_carry_guides_and_aria() {
    let mut view = TreeView::new(items(), config()).unwrap();
    view.expand_all();
    view.select_node("q1");

    let rows = view.visible_rows();
    let ids: Vec<&str> = rows.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, vec!["docs", "inv", "q1", "rec", "pics"]);

    let q1 = &rows[2];
    assert_eq!(q1.label, "Q1");
    assert_eq!(q1.level, 2);
    assert_eq!(q1.indent, 40.0);
    assert_eq!(q1.guides, vec![Guide::Line]);
    assert_eq!(q1.connector, Connector::Corner);
    assert_eq!(q1.guide_prefix(), "│  └─ ");
    assert!(q1.is_selected && q1.is_focused);
    assert_eq!(
        q1.aria,
        AriaAttributes {
            role: "treeitem",
            level: 3,
            expanded: None,
            selected: true,
            set_size: 1,
            pos_in_set: 1,
        }
    );

    let inv = &rows[1];
    assert_eq!(inv.connector, Connector::Tee);
    assert_eq!(inv.aria.expanded, Some(true));
    assert_eq!(inv.disclosure(), "▾");
    assert_eq!(rows[4].connector, Connector::None);
    assert_eq!(rows[4].aria.pos_in_set, 2);
}

#[test]
fn test_breadcrumb_and_focus_breadcrumb() {
    let mut view = TreeView::new(items(), config()).unwrap();
    view.set_focus("q1");
    let crumbs: Vec<(String, bool)> = view
        .breadcrumb()
        .into_iter()
        .map(|c| (c.label, c.is_current))
        .collect();
    assert_eq!(
        crumbs,
        vec![
            ("Documents".to_string(), false),
            ("Invoices".to_string(), false),
            ("Q1".to_string(), true),
        ]
    );

    assert!(view.focus_breadcrumb("docs"));
    assert_eq!(view.focused(), Some("docs"));
    assert_eq!(view.selected_ids(), vec!["docs"]);
}

#[test]
fn test_metrics_and_queries() {
    let mut view = TreeView::new(items(), config()).unwrap();
    view.toggle_expanded("docs");
    view.select_node("rec");
    assert_eq!(
        view.metrics(),
        TreeMetrics {
            total_nodes: 5,
            expanded_count: 1,
            selected_count: 1,
            shown_count: 5,
            displayed_count: 4,
            match_count: 0,
        }
    );
    assert_eq!(view.node_count(), 5);
    assert_eq!(view.descendants("docs"), vec!["inv", "q1", "rec"]);
    assert_eq!(view.ancestors("q1"), vec!["inv", "docs"]);
    assert_eq!(view.subtree_depth("docs"), 2);
    assert_eq!(
        view.find_by_path(&["docs", "inv"]).map(|n| n.id.as_str()),
        Some("inv")
    );
}

#[test]
fn test_hidden_nodes_can_be_filtered_out() {
    let mut view = TreeView::new(items(), config().with_hide_hidden_nodes(true)).unwrap();
    view.expand_all();
    assert_eq!(view.displayed_count(), 5);

    view.toggle_visibility("inv");
    assert_eq!(view.visible_ordering(), vec!["docs", "rec", "pics"]);

    // Without the filter, visibility and display are independent.
    let mut view = TreeView::new(items(), config()).unwrap();
    view.expand_all();
    view.toggle_visibility("inv");
    assert_eq!(view.displayed_count(), 5);
    assert!(!view.row(1).unwrap().is_visible);
}

#[test]
fn test_visibility_action_runs_after_toggle() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let mut view = TreeView::builder(items())
        .config(config())
        .action(
            ActionSlot::VisibilityChange,
            ActionFn::new("visibility", move || {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        )
        .build()
        .unwrap();

    view.toggle_visibility("docs");
    view.toggle_visibility("missing");
    // set_visibility is not a toggle.
    view.set_visibility("pics", false);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_lazy_load_runs_once_and_set_items_keeps_state() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let mut view = TreeView::builder(items())
        .config(config().with_lazy_load_children(true))
        .action(
            ActionSlot::LazyLoad,
            ActionFn::new("load children", move || {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        )
        .build()
        .unwrap();

    view.toggle_expanded("docs");
    view.select_node("rec");
    assert_eq!(calls.get(), 0);

    // Childless node: expanding it asks the host for children.
    view.toggle_expanded("pics");
    assert_eq!(calls.get(), 1);
    assert!(!view.is_loading());
    view.toggle_expanded("pics");
    view.toggle_expanded("pics");
    assert_eq!(calls.get(), 1);

    let mut next = items();
    next.push(Record::new("beach").with_parent("pics").with_field("title", "Beach"));
    next.retain(|r| r.id.as_deref() != Some("q1"));
    view.set_items(next);

    assert!(view.is_expanded("docs"));
    assert!(view.is_expanded("pics"));
    assert_eq!(view.selected_ids(), vec!["rec"]);
    assert!(!view.can_undo());
    assert_eq!(
        view.visible_ordering(),
        vec!["docs", "inv", "rec", "pics", "beach"]
    );
    assert!(view.node("inv").unwrap().is_leaf);
}

#[test]
fn test_failed_lazy_load_is_retried_and_reported() {
    let attempts = Rc::new(Cell::new(0));
    let counter = attempts.clone();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    let mut view = TreeView::builder(items())
        .config(config().with_lazy_load_children(true))
        .action(
            ActionSlot::LazyLoad,
            ActionFn::new("load children", move || {
                counter.set(counter.get() + 1);
                Err(ActionError::failed("load children", "offline"))
            }),
        )
        .on_diagnostic(move |event| sink.borrow_mut().push(event.clone()))
        .build()
        .unwrap();

    assert!(!view.load_children("pics"));
    assert!(!view.is_loading());
    assert!(!view.load_children("pics"));
    assert_eq!(attempts.get(), 2);
    assert_eq!(
        events.borrow()[0],
        DiagnosticEvent::ActionFailed {
            action: "load children".into(),
            message: "action `load children` failed: offline".into(),
        }
    );
}

#[test]
fn test_set_items_drops_stale_selection_and_publishes() {
    let config = config().with_selection(SelectionMode::Multiple, true);
    let mut view = TreeView::new(items(), config).unwrap();
    view.select_range("inv", "rec");
    assert_eq!(view.selected_ids(), vec!["inv", "q1", "rec"]);

    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = changes.clone();
    let _subscription = view.subscribe(move |change| log.borrow_mut().push(change.kind));

    let next: Vec<Record> = items()
        .into_iter()
        .filter(|r| r.id.as_deref() != Some("q1"))
        .collect();
    view.set_items(next);
    assert_eq!(view.selected_ids(), vec!["inv", "rec"]);
    assert_eq!(
        *changes.borrow(),
        vec![TreeChangeKind::Structure, TreeChangeKind::Selection]
    );
}

#[test]
fn test_click_and_hover_actions() {
    let clicks = Rc::new(Cell::new(0));
    let hovers = Rc::new(Cell::new(0));
    let (c, h) = (clicks.clone(), hovers.clone());
    let mut view = TreeView::builder(items())
        .config(config())
        .action(
            ActionSlot::NodeClick,
            ActionFn::new("click", move || {
                c.set(c.get() + 1);
                Ok(())
            }),
        )
        .action(
            ActionSlot::NodeHover,
            ActionFn::new("hover", move || {
                h.set(h.get() + 1);
                Ok(())
            }),
        )
        .build()
        .unwrap();

    assert!(view.node_click("pics", Modifiers::NONE));
    assert!(!view.node_click("missing", Modifiers::NONE));
    assert_eq!(clicks.get(), 1);
    assert_eq!(view.selected_ids(), vec!["pics"]);

    view.node_hover("docs");
    view.node_hover("docs");
    view.node_hover("pics");
    assert_eq!(hovers.get(), 2);
    assert_eq!(view.hovered(), Some("pics"));
}

#[test]
fn test_context_actions_filter_per_node() {
    let renamed = Rc::new(RefCell::new(Vec::new()));
    let log = renamed.clone();
    let mut view = TreeView::builder(items())
        .config(config())
        .context_action(ContextAction::new("Rename", move |record: &Record| {
            log.borrow_mut().push(record.record_key().into_owned());
            Ok(())
        }))
        .context_action(
            ContextAction::new("Delete", |_: &Record| Ok(()))
                .with_guard(|record: &Record| record.parent_id.is_some()),
        )
        .context_action(ContextAction::new("Archive", |_: &Record| {
            Err(ActionError::failed("Archive", "disk full"))
        }))
        .build()
        .unwrap();

    assert_eq!(view.context_actions("docs"), vec!["Rename", "Archive"]);
    assert_eq!(view.context_actions("inv"), vec!["Rename", "Delete", "Archive"]);
    assert!(view.context_actions("missing").is_empty());

    assert_eq!(view.run_context_action("inv", "Rename"), Ok(()));
    assert_eq!(*renamed.borrow(), vec!["inv"]);
    assert!(view.run_context_action("inv", "Delete").is_ok());

    // Guard rejections and unknown targets are not run and not reported as failures.
    assert_eq!(
        view.run_context_action("docs", "Delete"),
        Err(ActionError::NotExecutable("Delete".into()))
    );
    assert_eq!(
        view.run_context_action("missing", "Rename"),
        Err(ActionError::NotExecutable("Rename".into()))
    );
    assert_eq!(
        view.run_context_action("docs", "Print"),
        Err(ActionError::NotExecutable("Print".into()))
    );
    assert!(view.diagnostics().is_empty());
    assert_eq!(renamed.borrow().len(), 1);

    let err = view.run_context_action("pics", "Archive").unwrap_err();
    assert_eq!(err, ActionError::failed("Archive", "disk full"));
    assert_eq!(
        view.diagnostics().events().cloned().collect::<Vec<_>>(),
        vec![DiagnosticEvent::ActionFailed {
            action: "Archive".into(),
            message: "action `Archive` failed: disk full".into(),
        }]
    );
}

#[test]
fn test_clearing_an_idle_search_is_silent() {
    let mut view = TreeView::new(items(), config().with_search_fields(["title"])).unwrap();
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let _subscription = view.subscribe(move |_| counter.set(counter.get() + 1));

    assert!(!view.clear_search());
    assert_eq!(view.version(), 0);
    assert_eq!(hits.get(), 0);

    view.evaluate_search("invoice");
    let before = view.version();
    assert!(view.clear_search());
    assert!(view.has_changed_since(before));
    assert!(!view.search().is_active());
    assert!(!view.clear_search());
    assert_eq!(hits.get() as u64, view.version());
}

#[test]
fn test_subscriptions_and_versions() {
    let mut view = TreeView::new(items(), config()).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let subscription = view.subscribe(move |change| {
        log.borrow_mut()
            .push((change.kind, change.old_version, change.new_version));
    });

    view.toggle_expanded("docs");
    view.set_focus("inv");
    view.toggle_expanded("missing");
    assert_eq!(
        *seen.borrow(),
        vec![
            (TreeChangeKind::Expansion, 0, 1),
            (TreeChangeKind::Focus, 1, 2),
        ]
    );

    subscription.unsubscribe();
    view.collapse_all();
    assert_eq!(seen.borrow().len(), 2);
    assert!(view.has_changed_since(2));
}

#[test]
fn test_teardown_cancels_pending_search_and_listeners() {
    let mut view = TreeView::new(items(), config().with_search_fields(["title"])).unwrap();
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let subscription = view.subscribe(move |_| counter.set(counter.get() + 1));

    let now = Instant::now();
    view.set_search_query("invoice", now);
    assert!(view.search().is_pending());

    view.teardown();
    assert!(!view.search().is_pending());
    assert!(!subscription.is_active());
    assert!(!view.tick(now + view.config().search_debounce()));
    view.expand_all();
    assert_eq!(hits.get(), 0);
}

#[test]
fn test_diagnostics_callback_sees_build_events() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut items = items();
    items.push(Record::new("lost").with_parent("nowhere"));
    let view = TreeView::builder(items)
        .config(config())
        .on_diagnostic(move |event| sink.borrow_mut().push(event.clone()))
        .build()
        .unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![DiagnosticEvent::OrphanPromoted {
            node_id: "lost".into(),
            missing_parent: "nowhere".into(),
        }]
    );
    assert_eq!(view.diagnostics().len(), 1);
    assert_eq!(view.index().roots(), ["docs", "pics", "lost"]);
}

#[test]
fn test_items_and_config_load_from_json() {
    let items: Vec<Record> = serde_json::from_str(
        r#"[
            { "id": "a", "fields": { "title": "Alpha" }, "expanded": true },
            { "id": "b", "parent_id": "a", "fields": { "title": "Beta", "size": 3 } },
            { "parent_id": "a" }
        ]"#,
    )
    .unwrap();
    let config = config().with_selection(SelectionMode::Multiple, true);
    let json = serde_json::to_string(&config).unwrap();
    let restored: TreeConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, config);

    let view = TreeView::new(items, restored).unwrap();
    assert_eq!(view.visible_ordering(), vec!["a", "b"]);
    assert_eq!(view.label("b"), "Beta");
    // The record without an id is dropped.
    assert_eq!(view.diagnostics().len(), 1);
}

#[test]
fn test_json_numbers_never_become_dates() {
    let value: FieldValue = serde_json::from_str("1700000000000").unwrap();
    assert_eq!(value, FieldValue::Number(1_700_000_000_000.0));

    let record: Record = serde_json::from_str(r#"{ "id": "a", "fields": { "at": 5 } }"#).unwrap();
    assert_eq!(record.field("at"), Some(FieldValue::Number(5.0)));
}
