//! State walkthrough example
//!
//! Builds a small tree, drives it through commands and key presses, and prints the rows a
//! renderer would draw after each step.

use std::cell::RefCell;
use std::rc::Rc;
use treeview_core::{
    ExpandCommand, HistoryCommand, Record, SelectionCommand, SelectionMode, TreeCommand,
    TreeConfig, TreeKey, TreeView,
};

fn items() -> Vec<Record> {
    let named = |id: &str, name: &str| Record::new(id).with_field("name", name);
    vec![
        named("src", "src"),
        named("lib", "lib.rs").with_parent("src"),
        named("view", "view.rs").with_parent("src"),
        named("tests", "tests"),
        named("search", "search.rs").with_parent("tests"),
        named("readme", "README.md").with_expanded(false),
    ]
}

fn print_rows(title: &str, view: &TreeView<Record>) {
    println!("{title}");
    for row in view.visible_rows() {
        let focus = if row.is_focused { ">" } else { " " };
        let mark = if row.is_selected { "*" } else { " " };
        println!(
            "  {focus}{mark} {}{} {}",
            row.guide_prefix(),
            row.disclosure(),
            row.label
        );
    }
    println!();
}

fn main() {
    let config = TreeConfig::default()
        .with_label_field("name")
        .with_selection(SelectionMode::Multiple, true);
    let mut view = TreeView::new(items(), config).expect("valid configuration");

    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = changes.clone();
    let _subscription = view.subscribe(move |change| {
        log.borrow_mut().push(format!(
            "{:?} ({} -> {})",
            change.kind, change.old_version, change.new_version
        ));
    });

    print_rows("1. Initial tree:", &view);

    view.execute_batch(vec![
        TreeCommand::Expand(ExpandCommand::Toggle {
            node_id: "src".into(),
        }),
        TreeCommand::Selection(SelectionCommand::Select {
            node_id: "view".into(),
        }),
    ]);
    print_rows("2. After expanding src and selecting view.rs:", &view);

    view.handle_key(TreeKey::Down);
    view.handle_key(TreeKey::Right);
    print_rows("3. After Down + Right:", &view);

    view.execute(TreeCommand::History(HistoryCommand::Undo));
    print_rows("4. After undo:", &view);

    let metrics = view.metrics();
    println!(
        "Metrics: {} nodes, {} expanded, {} selected, {} displayed",
        metrics.total_nodes,
        metrics.expanded_count,
        metrics.selected_count,
        metrics.displayed_count
    );
    println!("Selection value: {:?}", view.selection_value());

    println!("\nChange log:");
    for (i, change) in changes.borrow().iter().enumerate() {
        println!("  #{}: {change}", i + 1);
    }
}
