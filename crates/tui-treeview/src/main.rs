//! TUI tree browser demo
//!
//! A terminal tree view built with crossterm and ratatui on top of `treeview-core`.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p tui-treeview -- [items.json] [config.json]
//! ```
//!
//! `items.json` is a JSON array of records (`{"id": "...", "parent_id": "...", "fields": {...}}`).
//! Without it a generated sample tree is shown. `config.json` is an optional `TreeConfig`.
//!
//! Set `TREEVIEW_LOG=/path/to/file` to write engine logs there (filtered by `RUST_LOG`).
//!
//! # Keys
//!
//! - Arrows: move / collapse / expand (Shift+Up/Down extends the selection)
//! - Enter: select, Space: toggle, `*`: expand siblings
//! - Ctrl+Home / Ctrl+End: first / last row
//! - Ctrl+A: select all visible, Esc: clear selection
//! - `/`: search (Enter keeps results, Esc clears)
//! - `v`: toggle visibility, `e` / `c`: expand / collapse all
//! - Ctrl+Z / Ctrl+Y: undo / redo
//! - `q` / Ctrl+C: quit

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env, fs,
    io::{self, stdout},
    path::Path,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;
use treeview_core::{
    KeyInput, Modifiers, Record, RowModel, SelectionMode, TreeConfig, TreeKey, TreeView,
    display_width, highlight_segments, truncate_to_width,
};

const SAMPLE_FOLDERS: [&str; 5] = ["src", "docs", "assets", "tests", "scripts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

struct App {
    view: TreeView<Record>,
    mode: InputMode,
    query: String,
    status_message: String,
    should_quit: bool,
}

impl App {
    fn new(items: Vec<Record>, config: TreeConfig) -> io::Result<Self> {
        let view = TreeView::new(items, config)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let status_message = if view.diagnostics().is_empty() {
            String::new()
        } else {
            format!("{} input problem(s) absorbed", view.diagnostics().len())
        };
        Ok(Self {
            view,
            mode: InputMode::Normal,
            query: String::new(),
            status_message,
            should_quit: false,
        })
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.status_message.clear();
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Search => self.handle_search_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('z') if ctrl => {
                if !self.view.undo() {
                    self.status_message = "Nothing to undo".into();
                }
            }
            KeyCode::Char('y') if ctrl => {
                if !self.view.redo() {
                    self.status_message = "Nothing to redo".into();
                }
            }
            KeyCode::Char('/') => {
                self.mode = InputMode::Search;
                self.query.clear();
            }
            KeyCode::Char('v') => {
                if let Some(id) = self.view.focused().map(str::to_string) {
                    self.view.toggle_visibility(&id);
                }
            }
            KeyCode::Char('e') => {
                self.view.expand_all();
            }
            KeyCode::Char('c') => {
                self.view.collapse_all();
            }
            _ => {
                if let Some(input) = key_input(key) {
                    self.view.handle_key(input);
                }
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.query.clear();
                self.view.clear_search();
                self.mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                self.view.flush_search();
                self.mode = InputMode::Normal;
                let count = self.view.search().results().len();
                self.status_message = format!("{count} match(es)");
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.view.set_search_query(&self.query, Instant::now());
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.view.set_search_query(&self.query, Instant::now());
            }
            _ => {}
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let tree_area = chunks[1];
        let viewport_height = tree_area.height.saturating_sub(2);
        self.view.set_viewport(f64::from(viewport_height));

        self.render_breadcrumb(frame, chunks[0]);
        self.render_tree(frame, tree_area);
        self.render_status_line(frame, chunks[2]);
        self.render_shortcuts(frame, chunks[3]);
    }

    fn render_breadcrumb(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (i, crumb) in self.view.breadcrumb().into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" › "));
            }
            let style = if crumb.is_current {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(crumb.label, style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_tree(&self, frame: &mut Frame, area: Rect) {
        let inner_width = usize::from(area.width.saturating_sub(2));
        let offset = self.view.virtualizer().scroll_offset();
        let window = self.view.window();
        let rows = self.view.visible_rows();

        // The window carries overscan rows above the viewport; skip those.
        let lines: Vec<Line> = window
            .items
            .iter()
            .zip(rows.iter())
            .filter(|(item, _)| item.start >= offset)
            .map(|(_, row)| self.row_line(row, inner_width))
            .collect();

        let title = format!(
            " {} nodes, {} displayed ",
            self.view.node_count(),
            self.view.displayed_count()
        );
        let tree = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(tree, area);
    }

    fn row_line(&self, row: &RowModel, width: usize) -> Line<'static> {
        let mut base = Style::default();
        if !row.is_visible {
            base = base.fg(Color::DarkGray).add_modifier(Modifier::DIM);
        }
        if row.is_selected {
            base = base.fg(Color::Yellow).add_modifier(Modifier::BOLD);
        }
        if row.is_focused {
            base = base.add_modifier(Modifier::REVERSED);
        }

        let prefix = format!("{}{} ", row.guide_prefix(), row.disclosure());
        let label = truncate_to_width(&row.label, width.saturating_sub(display_width(&prefix)));
        let mut spans = vec![Span::styled(prefix, Style::default().fg(Color::DarkGray))];

        match self.view.search().applied_query() {
            Some(query) if row.is_highlighted => {
                let options = self.view.search().options();
                for segment in highlight_segments(&label, query, options) {
                    let style = if segment.highlighted {
                        base.bg(Color::Magenta).fg(Color::White)
                    } else {
                        base
                    };
                    spans.push(Span::styled(segment.text, style));
                }
            }
            _ => spans.push(Span::styled(label, base)),
        }
        Line::from(spans)
    }

    fn render_status_line(&self, frame: &mut Frame, area: Rect) {
        let text = if self.mode == InputMode::Search {
            let searching = if self.view.is_searching() { " …" } else { "" };
            format!("Search > {}{searching}  (Enter=Keep, Esc=Clear)", self.query)
        } else if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let metrics = self.view.metrics();
            format!(
                "expanded:{} selected:{} matches:{} | undo:{} redo:{} | version:{}",
                metrics.expanded_count,
                metrics.selected_count,
                metrics.match_count,
                self.view.history().undo_depth,
                self.view.history().redo_depth,
                self.view.version()
            )
        };

        let status_line = Paragraph::new(text).style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, area);
    }

    fn render_shortcuts(&self, frame: &mut Frame, area: Rect) {
        let shortcuts = "↑↓←→:Move  Enter:Select  Space:Toggle  /:Search  v:Visibility  e/c:Expand/Collapse all  Ctrl-Z/Y:Undo/Redo  q:Quit";
        let shortcuts_line =
            Paragraph::new(shortcuts).style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_widget(shortcuts_line, area);
    }
}

fn key_input(key: KeyEvent) -> Option<KeyInput> {
    let tree_key = match key.code {
        KeyCode::Up => TreeKey::Up,
        KeyCode::Down => TreeKey::Down,
        KeyCode::Left => TreeKey::Left,
        KeyCode::Right => TreeKey::Right,
        KeyCode::Enter => TreeKey::Enter,
        KeyCode::Char(' ') => TreeKey::Space,
        KeyCode::Home => TreeKey::Home,
        KeyCode::End => TreeKey::End,
        KeyCode::Esc => TreeKey::Escape,
        KeyCode::Char(c) => TreeKey::Char(c),
        _ => return None,
    };
    let modifiers = Modifiers {
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        meta: key.modifiers.contains(KeyModifiers::SUPER),
        alt: key.modifiers.contains(KeyModifiers::ALT),
    };
    Some(KeyInput::with_modifiers(tree_key, modifiers))
}

fn sample_items() -> Vec<Record> {
    let mut items = Vec::new();
    for (f, folder) in SAMPLE_FOLDERS.iter().enumerate() {
        items.push(Record::new(*folder).with_field("name", *folder));
        for s in 0..4 {
            let sub = format!("{folder}/module_{s}");
            items.push(
                Record::new(sub.clone())
                    .with_parent(*folder)
                    .with_field("name", format!("module_{s}")),
            );
            for n in 0..(3 + (f + s) % 5) {
                items.push(
                    Record::new(format!("{sub}/file_{n}.rs"))
                        .with_parent(sub.clone())
                        .with_field("name", format!("file_{n}.rs")),
                );
            }
        }
    }
    items
}

fn load_items(path: &Path) -> io::Result<Vec<Record>> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(io::Error::from)
}

fn load_config(path: Option<&Path>) -> io::Result<TreeConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(io::Error::from)?
        }
        None => TreeConfig::default()
            .with_label_field("name")
            .with_search_fields(["name"])
            .with_selection(SelectionMode::Multiple, true),
    };
    // One terminal line per row.
    Ok(config.with_item_size(1.0).with_indent_size(3.0).with_overscan(2))
}

fn init_logging() -> io::Result<()> {
    let Ok(path) = env::var("TREEVIEW_LOG") else {
        return Ok(());
    };
    let file = fs::File::create(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("treeview_core=debug,tui_treeview=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> io::Result<()> {
    init_logging()?;

    let args: Vec<String> = env::args().collect();
    let items = match args.get(1) {
        Some(path) => load_items(Path::new(path))?,
        None => sample_items(),
    };
    let config = load_config(args.get(2).map(Path::new))?;
    let mut app = App::new(items, config)?;
    tracing::info!(nodes = app.view.node_count(), "starting tree browser");

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    app.view.teardown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("error: {err}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.view.tick(Instant::now());
        terminal.draw(|f| app.render(f))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.handle_key_event(key),
                // Resize and mouse events only need a redraw.
                _ => {}
            }
        }
    }
    Ok(())
}
