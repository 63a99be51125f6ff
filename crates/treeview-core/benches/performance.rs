use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::Instant;
use treeview_core::{Align, KeyInput, Modifiers, Record, TreeConfig, TreeKey, TreeView};

/// `roots` top-level folders, each with `per_folder` children that hold `per_child` leaves.
fn large_tree(roots: usize, per_folder: usize, per_child: usize) -> Vec<Record> {
    let mut out = Vec::with_capacity(roots * per_folder * (per_child + 1) + roots);
    for r in 0..roots {
        let root = format!("r{r}");
        out.push(Record::new(root.clone()).with_field("name", format!("Folder {r}")));
        for c in 0..per_folder {
            let child = format!("{root}.{c}");
            out.push(
                Record::new(child.clone())
                    .with_parent(root.clone())
                    .with_field("name", format!("Group {r}-{c}")),
            );
            for l in 0..per_child {
                out.push(
                    Record::new(format!("{child}.{l}"))
                        .with_parent(child.clone())
                        .with_field("name", format!("Item {r}-{c}-{l} quick brown fox")),
                );
            }
        }
    }
    out
}

fn config() -> TreeConfig {
    TreeConfig::default()
        .with_label_field("name")
        .with_search_fields(["name"])
}

fn bench_build_large_hierarchy(c: &mut Criterion) {
    let items = large_tree(100, 20, 50);
    c.bench_function("build/100k_nodes", |b| {
        b.iter_batched(
            || items.clone(),
            |items| {
                let view = TreeView::new(items, config()).unwrap();
                black_box(view.node_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_expand_all(c: &mut Criterion) {
    let items = large_tree(100, 20, 50);
    c.bench_function("expand_all/100k_nodes", |b| {
        b.iter_batched(
            || TreeView::new(items.clone(), config()).unwrap(),
            |mut view| {
                view.expand_all();
                black_box(view.displayed_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_visible_rows_deep_scroll(c: &mut Criterion) {
    let mut view = TreeView::new(large_tree(100, 20, 50), config()).unwrap();
    view.expand_all();
    view.set_viewport(800.0);
    let middle = view.displayed_count() / 2;
    view.scroll_to_index(middle, Align::Center);

    c.bench_function("visible_rows/middle_of_100k", |b| {
        b.iter(|| {
            let rows = view.visible_rows();
            black_box(rows.len());
        })
    });
}

fn bench_keyboard_walk(c: &mut Criterion) {
    let mut view = TreeView::new(large_tree(20, 20, 20), config()).unwrap();
    view.expand_all();
    view.set_viewport(600.0);
    c.bench_function("keyboard/500_down", |b| {
        b.iter(|| {
            view.handle_key(KeyInput::with_modifiers(TreeKey::Home, Modifiers::CTRL));
            for _ in 0..500 {
                view.handle_key(TreeKey::Down);
            }
            black_box(view.focused().map(str::len));
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let items = large_tree(100, 20, 50);
    c.bench_function("search/substring_100k", |b| {
        b.iter_batched(
            || TreeView::new(items.clone(), config()).unwrap(),
            |mut view| {
                view.set_search_query("7-13-4", Instant::now());
                view.flush_search();
                black_box(view.search().results().len());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_build_large_hierarchy,
    bench_expand_all,
    bench_visible_rows_deep_scroll,
    bench_keyboard_walk,
    bench_search
);
criterion_main!(benches);
