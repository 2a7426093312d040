//! Interactive TUI (Terminal User Interface) for Cadenza.
//!
//! Provides a responsive search interface with:
//! - Search as you type, run on a background worker
//! - Navigation through results
//! - Album/artist ordering toggle
//!
//! Enter quits and prints the selected pathname, so the TUI can feed a player:
//! `mpv "$(cadenza i)"`.

use crate::app::App;
use crate::commands::query::format_record;
use cadenza_core::{arrange_hits, Config, SearchHits, SearchWorker, SortBy};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::*};
use std::io;
use std::time::{Duration, Instant};
use tracing::warn;

/// TUI application state.
struct TuiApp {
    /// The main application
    app: App,

    /// Background search thread
    worker: SearchWorker,

    /// Current search query string
    query_string: String,

    /// Every hit of the last applied search, in catalog order
    matched: SearchHits,

    /// Hits shown, in display order and capped
    results: SearchHits,

    /// Selected result index
    selected: usize,

    /// Vertical scroll offset
    scroll_offset: usize,

    /// Rows available for results in the last frame
    visible_height: usize,

    /// Whether we should quit
    should_quit: bool,

    /// Pathname chosen with Enter
    chosen: Option<String>,

    /// Last search time
    last_search_time: Duration,

    /// Current result ordering
    sort_by: SortBy,

    /// Status message
    status_message: Option<String>,

    // Debounce
    dirty: bool,
    last_input_at: Instant,
    debounce: Duration,
}

impl TuiApp {
    fn new(app: App) -> anyhow::Result<Self> {
        let worker = SearchWorker::spawn(app.catalog.clone(), app.config.worker_settings())?;
        let sort_by = app.config.ui.sort_by;
        let debounce = app.config.ui.debounce();

        Ok(TuiApp {
            app,
            worker,
            query_string: String::new(),
            matched: Vec::new(),
            results: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            visible_height: 20,
            should_quit: false,
            chosen: None,
            last_search_time: Duration::ZERO,
            sort_by,
            status_message: None,
            dirty: true,
            last_input_at: Instant::now(),
            debounce,
        })
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.last_input_at = Instant::now();
    }

    /// Submit the current query once the input has been quiet long enough.
    fn maybe_search(&mut self) {
        if !self.dirty || self.last_input_at.elapsed() < self.debounce {
            return;
        }
        self.dirty = false;

        if let Err(e) = self.worker.submit(&self.query_string) {
            warn!(error = %e, "Search submission failed");
            self.status_message = Some(format!("Search failed: {}", e));
        }
    }

    /// Apply the newest finished search, if any.
    fn poll_results(&mut self) {
        if let Some(done) = self.worker.poll() {
            self.matched = done.hits;
            self.arrange();
            self.last_search_time = done.took;
            self.selected = 0;
            self.scroll_offset = 0;
            self.status_message = None;
        }
    }

    /// Rebuild the displayed rows from the full hit list.
    fn arrange(&mut self) {
        let mut hits = self.matched.clone();
        arrange_hits(&self.app.catalog, &mut hits, self.sort_by, self.app.config.result_limit());
        self.results = hits;
    }

    /// Handle input character.
    fn on_char(&mut self, c: char) {
        self.query_string.push(c);
        self.mark_dirty();
    }

    /// Handle backspace.
    fn on_backspace(&mut self) {
        self.query_string.pop();
        self.mark_dirty();
    }

    /// Clear the query.
    fn clear_query(&mut self) {
        self.query_string.clear();
        self.mark_dirty();
    }

    /// Move selection up.
    fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.ensure_visible();
        }
    }

    /// Move selection down.
    fn select_next(&mut self) {
        if self.selected + 1 < self.results.len() {
            self.selected += 1;
            self.ensure_visible();
        }
    }

    /// Page up.
    fn page_up(&mut self) {
        self.selected = self.selected.saturating_sub(self.page_size());
        self.ensure_visible();
    }

    /// Page down.
    fn page_down(&mut self) {
        self.selected =
            (self.selected + self.page_size()).min(self.results.len().saturating_sub(1));
        self.ensure_visible();
    }

    fn page_size(&self) -> usize {
        self.app
            .config
            .ui
            .page_size
            .min(self.visible_height.max(1))
    }

    /// Ensure selected item is visible.
    fn ensure_visible(&mut self) {
        let visible_height = self.visible_height.max(1);

        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected - visible_height + 1;
        }
    }

    /// Cycle album -> artist -> catalog order.
    fn toggle_sort(&mut self) {
        self.sort_by = match self.sort_by {
            SortBy::Album => SortBy::Artist,
            SortBy::Artist => SortBy::None,
            SortBy::None => SortBy::Album,
        };
        self.arrange();
        self.selected = 0;
        self.scroll_offset = 0;
        self.status_message = Some(format!("Sorted by {}", self.sort_by));
    }

    /// Quit, remembering the selected pathname.
    fn choose_selected(&mut self) {
        if let Some(record) = self
            .results
            .get(self.selected)
            .and_then(|&i| self.app.catalog.get(i))
        {
            self.chosen = Some(record.pathname().to_string());
            self.should_quit = true;
        }
    }
}

/// Run the TUI application.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;

    if app.catalog.is_empty() {
        eprintln!("Catalog is empty. Nothing to search.");
        return Ok(());
    }

    let mut tui_app = TuiApp::new(app)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_loop(&mut terminal, &mut tui_app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(pathname) = tui_app.chosen.take() {
        println!("{}", pathname);
    }

    result
}

/// Main event loop.
fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut TuiApp) -> anyhow::Result<()> {
    loop {
        app.maybe_search();
        app.poll_results();

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(30))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => {
                            app.should_quit = true;
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            app.should_quit = true;
                        }
                        KeyCode::Char(c) => {
                            if key.modifiers.contains(KeyModifiers::CONTROL) {
                                match c {
                                    's' => app.toggle_sort(),
                                    'u' => app.clear_query(),
                                    _ => {}
                                }
                            } else {
                                app.on_char(c);
                            }
                        }
                        KeyCode::Backspace => {
                            app.on_backspace();
                        }
                        KeyCode::Up => {
                            app.select_previous();
                        }
                        KeyCode::Down => {
                            app.select_next();
                        }
                        KeyCode::PageUp => {
                            app.page_up();
                        }
                        KeyCode::PageDown => {
                            app.page_down();
                        }
                        KeyCode::Home => {
                            app.selected = 0;
                            app.scroll_offset = 0;
                        }
                        KeyCode::End => {
                            if !app.results.is_empty() {
                                app.selected = app.results.len() - 1;
                                app.ensure_visible();
                            }
                        }
                        KeyCode::Enter => {
                            app.choose_selected();
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

mod ui {
    use super::*;

    /// Draw the UI.
    pub fn draw(f: &mut Frame, app: &mut TuiApp) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Search box
                Constraint::Min(10),   // Results
                Constraint::Length(2), // Status bar
            ])
            .split(f.area());

        draw_search_box(f, app, chunks[0]);
        draw_results(f, app, chunks[1]);
        draw_status_bar(f, app, chunks[2]);
    }

    /// Draw the search input box.
    fn draw_search_box(f: &mut Frame, app: &TuiApp, area: Rect) {
        let title = if app.query_string.trim_start().starts_with('(') {
            " Search (expression) "
        } else {
            " Search (artist: album: name: year: -exclude) "
        };
        let input = Paragraph::new(app.query_string.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);

        // Show cursor
        f.set_cursor_position(Position::new(cursor_column(area, &app.query_string), area.y + 1));
    }

    /// Draw the results list.
    fn draw_results(f: &mut Frame, app: &mut TuiApp, area: Rect) {
        let visible_height = area.height.saturating_sub(2) as usize;
        app.visible_height = visible_height;
        app.ensure_visible();

        let items: Vec<ListItem> = app
            .results
            .iter()
            .skip(app.scroll_offset)
            .take(visible_height)
            .enumerate()
            .filter_map(|(i, &hit)| {
                let record = app.app.catalog.get(hit)?;
                let style = if i + app.scroll_offset == app.selected {
                    Style::default()
                        .bg(Color::Blue)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Some(ListItem::new(format_record(record)).style(style))
            })
            .collect();

        let pending = if app.worker.in_flight() { " …" } else { "" };
        let shown = if app.results.len() < app.matched.len() {
            format!(", {} shown", app.results.len())
        } else {
            String::new()
        };
        let title = format!(
            " Results ({} found{} in {:.1}ms){} ",
            app.matched.len(),
            shown,
            app.last_search_time.as_secs_f64() * 1000.0,
            pending
        );

        let results = List::new(items).block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(results, area);
    }

    /// Draw the status bar.
    fn draw_status_bar(f: &mut Frame, app: &TuiApp, area: Rect) {
        let status = if let Some(ref msg) = app.status_message {
            msg.clone()
        } else {
            format!(
                "Catalog: {} items | Sort: {} | ↑↓:Navigate Enter:Choose Ctrl+S:Sort Ctrl+U:Clear Esc:Quit",
                app.app.catalog.len(),
                app.sort_by
            )
        };

        let status_bar = Paragraph::new(status).style(Style::default().fg(Color::Gray));

        f.render_widget(status_bar, area);
    }

    /// Terminal column just past the typed query, clamped to the screen.
    pub(super) fn cursor_column(area: Rect, query: &str) -> u16 {
        let typed = u16::try_from(query.chars().count()).unwrap_or(u16::MAX);
        area.x.saturating_add(typed).saturating_add(1)
    }
}
