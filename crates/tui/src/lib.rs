use std::collections::BTreeSet;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use qgrid_adapters::export::{export_selection, ExportFormat};
use qgrid_adapters::import::clipboard_records_to_rows;
use qgrid_core::boundary::{export_column_intervals, map_dimension_boundary_union, union};
use qgrid_core::column_selector::ColumnSelector;
use qgrid_core::csv::parse_csv;
use qgrid_core::event::{ArrowKey, Key, KeyPress, Modifiers};
use qgrid_core::grid::{ColumnDefinition, Grid, ResultGrid, Row};
use qgrid_core::grid_selector::GridSelector;
use qgrid_core::host::GridHost;
use qgrid_core::preferences::FilePreferencesStore;
use qgrid_core::range::{Cell, Interval, Range};
use qgrid_core::range_helper::{
    is_any_cell_of_column_selected, is_any_cell_of_row_selected,
    is_range_entirely_within_selected_ranges, selection_to_csv,
};
use qgrid_core::result_grid_host;
use qgrid_core::staged_rows::{StagedRowsTracker, ToolbarState};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use serde_json::Value;
use thiserror::Error;

const TICK_RATE: Duration = Duration::from_millis(120);
const ROW_HEADER_WIDTH: u16 = 8;
const DEFAULT_COLUMN_WIDTH: u16 = 16;
const MIN_COLUMN_WIDTH: u16 = 4;
const EXPORT_FILE_STEM: &str = "qgrid-selection";

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    Key(KeyPress),
    ToggleRow,
    ToggleColumn,
    ToggleAll,
    Copy,
    Paste,
    Export(ExportFormat),
    ToggleDelete,
    ToggleEditLock,
    ToggleCopyHeaders,
    MouseDown { x: u16, y: u16 },
    MouseDrag { x: u16, y: u16 },
    MouseUp { x: u16, y: u16 },
    MouseMove { x: u16, y: u16 },
    Resize { width: u16, height: u16 },
}

/// What sits under a terminal position inside the grid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Header(usize),
    Cell(Cell),
}

/// Mouse button held since the last press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pointer {
    Cell(Cell),
    Header { column: usize, x: u16, resized: bool },
}

/// Text copied by `y` together with the cells it came from, so a paste can
/// put every field back under its own column.
#[derive(Debug, Clone, PartialEq)]
struct Clipboard {
    text: String,
    columns: Vec<usize>,
    rows: Vec<Row>,
    with_headers: bool,
}

/// Terminal result-grid viewer.
pub struct TuiApp {
    host: GridHost<ResultGrid>,
    preferences: FilePreferencesStore,
    column_widths: Vec<u16>,
    area: Rect,
    pointer: Option<Pointer>,
    mouse_in_header: bool,
    clipboard: Option<Clipboard>,
    pending_delete: BTreeSet<String>,
    pasted_rows: usize,
    export_dir: PathBuf,
    status_line: String,
    show_help: bool,
    should_quit: bool,
}

impl std::fmt::Debug for TuiApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TuiApp")
            .field("host", &self.host)
            .field("status_line", &self.status_line)
            .finish_non_exhaustive()
    }
}

impl TuiApp {
    /// Builds a viewer over a result set. `columns` are the data columns;
    /// the checkbox column is added here. Rows are deletable only when
    /// `primary_keys` is non-empty.
    #[must_use]
    pub fn new(
        columns: Vec<ColumnDefinition>,
        rows: Vec<Row>,
        primary_keys: Vec<String>,
        preferences: FilePreferencesStore,
    ) -> Self {
        let prefs = preferences.preferences();
        let editable = !primary_keys.is_empty();
        let staged = StagedRowsTracker::new(primary_keys)
            .with_client_primary_key(prefs.client_primary_key.clone())
            .with_editable(editable);
        let columns = GridSelector::column_definitions(columns);
        let column_widths = columns
            .iter()
            .map(|column| {
                if column.is_row_header() {
                    ROW_HEADER_WIDTH
                } else {
                    DEFAULT_COLUMN_WIDTH
                }
            })
            .collect();
        let host = result_grid_host(
            ResultGrid::new(columns, rows),
            prefs.selection_model_options(),
            staged,
        );

        let mut app = Self {
            host,
            preferences,
            column_widths,
            area: Rect::new(0, 0, 80, 24),
            pointer: None,
            mouse_in_header: false,
            clipboard: None,
            pending_delete: BTreeSet::new(),
            pasted_rows: 0,
            export_dir: PathBuf::from("."),
            status_line: "Ready. Press ? for help.".to_string(),
            show_help: false,
            should_quit: false,
        };
        app.fit_viewport();
        app
    }

    /// Directory that `e`/`E` exports are written into.
    #[must_use]
    pub fn with_export_dir(mut self, export_dir: impl Into<PathBuf>) -> Self {
        self.export_dir = export_dir.into();
        self
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => {
                self.show_help = !self.show_help;
                self.status_line = if self.show_help {
                    "Help opened".to_string()
                } else {
                    "Help closed".to_string()
                };
            }
            Msg::Key(key) => {
                self.host.key_down(key);
                self.status_line = self.selection_summary();
            }
            Msg::ToggleRow => match self.host.grid().active_cell() {
                Some(active) => {
                    self.host.click(active.row, 0);
                    self.status_line = self.selection_summary();
                }
                None => self.status_line = "No active cell".to_string(),
            },
            Msg::ToggleColumn => match self.host.grid().active_cell() {
                Some(active) => {
                    self.host.header_click(active.cell);
                    self.status_line = self.selection_summary();
                }
                None => self.status_line = "No active cell".to_string(),
            },
            Msg::ToggleAll => {
                self.host.header_click(0);
                self.status_line = self.selection_summary();
            }
            Msg::Copy => self.copy(),
            Msg::Paste => self.paste(),
            Msg::Export(format) => self.export(format),
            Msg::ToggleDelete => self.toggle_delete(),
            Msg::ToggleEditLock => {
                let locked = !self.host.grid().is_edit_locked();
                self.host.grid_mut().set_edit_locked(locked);
                self.status_line = if locked {
                    "Editing cell: range drag disabled".to_string()
                } else {
                    "Editing finished".to_string()
                };
            }
            Msg::ToggleCopyHeaders => self.toggle_copy_headers(),
            Msg::MouseDown { x, y } => self.mouse_down(x, y),
            Msg::MouseDrag { x, y } => self.mouse_drag(x, y),
            Msg::MouseUp { x, y } => self.mouse_up(x, y),
            Msg::MouseMove { x, y } => {
                let hit = self.hit_test(x, y);
                self.track_header_hover(hit);
            }
            Msg::Resize { width, height } => {
                self.area = Rect::new(0, 0, width, height);
            }
        }
        self.fit_viewport();
    }

    fn shutdown(&mut self) {
        self.host.destroy();
        log::debug!("viewer closed");
    }

    fn toolbar(&self) -> ToolbarState {
        self.host
            .plugin::<StagedRowsTracker>()
            .map(StagedRowsTracker::toolbar)
            .unwrap_or_default()
    }

    fn selection_summary(&self) -> String {
        let ranges = self.host.selected_ranges().len();
        match self.host.grid().active_cell() {
            Some(active) => format!(
                "{ranges} range(s) selected, active row {} column {}",
                active.row + 1,
                active.cell
            ),
            None => format!("{ranges} range(s) selected"),
        }
    }

    fn copy(&mut self) {
        if !self.toolbar().copy_enabled {
            self.status_line = "Nothing selected to copy".to_string();
            return;
        }
        let prefs = self.preferences.preferences();
        let grid = self.host.grid();
        let ranges = self.host.selected_ranges();
        let text = selection_to_csv(grid, ranges, &prefs.csv, prefs.copy_with_headers);
        let columns =
            map_dimension_boundary_union(&export_column_intervals(grid.columns(), ranges), |col| {
                col
            });
        let row_intervals: Vec<Interval> = ranges.iter().map(Range::rows).collect();
        let rows = map_dimension_boundary_union(&union(&row_intervals), |row| {
            grid.item(row).cloned().unwrap_or_default()
        });

        let lines = text.lines().count();
        self.clipboard = Some(Clipboard {
            text,
            columns,
            rows,
            with_headers: prefs.copy_with_headers,
        });
        self.status_line = format!("Copied {lines} line(s)");
    }

    fn paste(&mut self) {
        let Some(clipboard) = self.clipboard.as_ref() else {
            self.status_line = "Clipboard is empty".to_string();
            return;
        };
        let prefs = self.preferences.preferences();
        let mut records =
            match parse_csv(&clipboard.text, prefs.csv.field_separator, prefs.csv.quote_char) {
                Ok(records) => records,
                Err(error) => {
                    self.status_line = format!("Paste failed: {error}");
                    return;
                }
            };
        if clipboard.with_headers && !records.is_empty() {
            records.remove(0);
        }
        let mut rows = match clipboard_records_to_rows(
            self.host.grid().columns(),
            &clipboard.columns,
            records,
            &clipboard.rows,
        ) {
            Ok(rows) => rows,
            Err(error) => {
                self.status_line = format!("Paste failed: {error}");
                return;
            }
        };
        for row in &mut rows {
            self.pasted_rows += 1;
            row.insert(
                prefs.client_primary_key.clone(),
                Value::String(format!("pasted-{}", self.pasted_rows)),
            );
        }

        let added = self.host.grid_mut().append_rows(rows);
        self.host.refresh_plugins();
        log::info!("pasted {added} row(s)");
        self.status_line = format!("Pasted {added} row(s)");
    }

    fn export(&mut self, format: ExportFormat) {
        let extension = match format {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        };
        let path = self
            .export_dir
            .join(format!("{EXPORT_FILE_STEM}.{extension}"));
        let prefs = self.preferences.preferences();
        self.status_line = match export_selection(
            &path,
            self.host.grid(),
            self.host.selected_ranges(),
            &prefs.csv,
            prefs.copy_with_headers,
        ) {
            Ok(written) => format!("Exported {written} row(s) to {}", path.display()),
            Err(error) => format!("Export failed: {error}"),
        };
    }

    fn toggle_delete(&mut self) {
        if !self.toolbar().delete_enabled {
            self.status_line = "Select whole rows with primary keys to delete".to_string();
            return;
        }
        let Some(tracker) = self.host.plugin::<StagedRowsTracker>() else {
            return;
        };
        let keys: Vec<String> = tracker.staged_rows().keys().cloned().collect();
        if keys.iter().all(|key| self.pending_delete.contains(key)) {
            for key in &keys {
                self.pending_delete.remove(key);
            }
            self.status_line = format!("Kept {} row(s)", keys.len());
        } else {
            self.status_line = format!("Marked {} row(s) for deletion", keys.len());
            self.pending_delete.extend(keys);
        }
    }

    fn toggle_copy_headers(&mut self) {
        let prefs = self.preferences.preferences_mut();
        prefs.copy_with_headers = !prefs.copy_with_headers;
        let enabled = prefs.copy_with_headers;
        let state = if enabled { "on" } else { "off" };
        self.status_line = match self.preferences.persist() {
            Ok(()) => format!("Copy with headers: {state}"),
            Err(error) => format!("Copy with headers: {state} (save failed: {error})"),
        };
    }

    fn mouse_down(&mut self, x: u16, y: u16) {
        let hit = self.hit_test(x, y);
        self.track_header_hover(hit);
        self.pointer = match hit {
            Some(Hit::Header(column)) => Some(Pointer::Header {
                column,
                x,
                resized: false,
            }),
            Some(Hit::Cell(cell)) => Some(Pointer::Cell(cell)),
            None => None,
        };
    }

    fn mouse_drag(&mut self, x: u16, y: u16) {
        let hit = self.hit_test(x, y);
        self.track_header_hover(hit);
        let Some(Pointer::Header {
            column,
            x: last_x,
            resized,
        }) = self.pointer
        else {
            return;
        };
        if x == last_x {
            return;
        }

        let width = self.width_of(column);
        let width = if x > last_x {
            width.saturating_add(x - last_x)
        } else {
            width.saturating_sub(last_x - x).max(MIN_COLUMN_WIDTH)
        };
        if let Some(slot) = self.column_widths.get_mut(column) {
            *slot = width;
        }
        if !resized {
            self.host.columns_resized();
        }
        self.pointer = Some(Pointer::Header {
            column,
            x,
            resized: true,
        });
    }

    fn mouse_up(&mut self, x: u16, y: u16) {
        let hit = self.hit_test(x, y);
        match (self.pointer.take(), hit) {
            (Some(Pointer::Header { column, .. }), _) => {
                self.host.header_click(column);
            }
            (Some(Pointer::Cell(start)), Some(Hit::Cell(end))) if start == end => {
                self.host.click(start.row, start.cell);
            }
            (Some(Pointer::Cell(start)), Some(Hit::Cell(end))) => {
                if !self.host.drag_select(start, end) {
                    self.status_line = "Range selection is disabled while editing".to_string();
                    return;
                }
            }
            _ => return,
        }
        self.status_line = self.selection_summary();
    }

    fn track_header_hover(&mut self, hit: Option<Hit>) {
        let in_header = matches!(hit, Some(Hit::Header(_)));
        if in_header == self.mouse_in_header {
            return;
        }
        self.mouse_in_header = in_header;
        if in_header {
            self.host.header_mouse_enter();
        } else {
            self.host.header_mouse_leave();
        }
    }

    fn width_of(&self, column: usize) -> u16 {
        self.column_widths
            .get(column)
            .copied()
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    fn grid_rect(&self) -> Rect {
        let (_, body, _) = split_screen(self.area);
        Block::default().borders(Borders::ALL).inner(body)
    }

    /// Columns drawn left to right: the pinned checkbox column, then the
    /// scrolled data columns.
    fn visible_columns(&self) -> Vec<usize> {
        let grid = self.host.grid();
        let viewport = grid.viewport();
        let mut start = viewport.left_cell;
        let mut visible = Vec::new();
        if grid
            .columns()
            .first()
            .is_some_and(ColumnDefinition::is_row_header)
        {
            visible.push(0);
            start = start.max(1);
        }
        visible.extend((start..grid.columns().len()).take(viewport.visible_cells));
        visible
    }

    fn visible_rows(&self) -> std::ops::Range<usize> {
        let grid = self.host.grid();
        let viewport = grid.viewport();
        let end = (viewport.top_row + viewport.visible_rows).min(grid.row_count());
        viewport.top_row.min(end)..end
    }

    fn fit_viewport(&mut self) {
        let inner = self.grid_rect();
        let visible_rows = usize::from(inner.height.saturating_sub(1));
        let left = self.host.grid().viewport().left_cell.max(1);
        let mut remaining = inner.width.saturating_sub(self.width_of(0));
        let mut visible_cells = 0;
        for column in left..self.column_widths.len() {
            let width = self.width_of(column);
            if width > remaining {
                break;
            }
            remaining -= width;
            visible_cells += 1;
        }
        self.host
            .grid_mut()
            .resize_viewport(visible_rows, visible_cells);
    }

    fn hit_test(&self, x: u16, y: u16) -> Option<Hit> {
        let inner = self.grid_rect();
        if x < inner.x || y < inner.y || x >= inner.right() || y >= inner.bottom() {
            return None;
        }

        let mut left = inner.x;
        let mut column = None;
        for candidate in self.visible_columns() {
            let right = left.saturating_add(self.width_of(candidate));
            if x < right {
                column = Some(candidate);
                break;
            }
            left = right;
        }
        let column = column?;

        if y == inner.y {
            return Some(Hit::Header(column));
        }
        let row = self.host.grid().viewport().top_row + usize::from(y - inner.y - 1);
        (row < self.host.grid().row_count()).then_some(Hit::Cell(Cell::new(row, column)))
    }
}

pub fn run(app: TuiApp) -> Result<(), TuiError> {
    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, app);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: TuiApp,
) -> Result<(), TuiError> {
    let size = terminal.size()?;
    app.handle(Msg::Resize {
        width: size.width,
        height: size.height,
    });

    loop {
        terminal.draw(|frame| render(frame, &app))?;

        if event::poll(TICK_RATE)? {
            let message = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => map_key_event(key),
                Event::Mouse(mouse) => map_mouse_event(mouse),
                Event::Resize(width, height) => Some(Msg::Resize { width, height }),
                _ => None,
            };
            if let Some(message) = message {
                app.handle(message);
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    Ok(())
}

fn split_screen(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Truncates or pads `text` to exactly `width` columns, keeping one blank
/// column as a separator.
fn fit(text: &str, width: u16) -> String {
    let width = usize::from(width);
    let clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{clipped:<width$}")
}

fn cell_text(row: Option<&Row>, column: &ColumnDefinition) -> String {
    let value = column
        .field
        .as_deref()
        .and_then(|field| row.and_then(|item| item.get(field)));
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn header_line(app: &TuiApp, columns: &[usize]) -> Line<'static> {
    let grid = app.host.grid();
    let ranges = app.host.selected_ranges();
    let selector = app.host.plugin::<GridSelector>();
    let spans = columns
        .iter()
        .filter_map(|index| grid.columns().get(*index).map(|column| (*index, column)))
        .map(|(index, column)| {
            let (checked, label) = if column.is_row_header() {
                let checked = selector.is_some_and(GridSelector::all_checked);
                (checked, checkbox(checked).to_string())
            } else {
                let checked = selector
                    .is_some_and(|selector| selector.column_selector().is_column_checked(index));
                let label = format!(
                    "{} {}",
                    checkbox(checked),
                    ColumnSelector::header_label(column)
                );
                (checked, label)
            };
            let style = if checked {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if !column.is_row_header() && is_any_cell_of_column_selected(ranges, index) {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Span::styled(fit(&label, app.width_of(index)), style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn row_line(app: &TuiApp, row: usize, columns: &[usize]) -> Line<'static> {
    let grid = app.host.grid();
    let item = grid.item(row);
    let selector = app.host.plugin::<GridSelector>();
    let deleted = match (app.host.plugin::<StagedRowsTracker>(), item) {
        (Some(tracker), Some(item)) => app
            .pending_delete
            .contains(&tracker.client_key(row, item)),
        _ => false,
    };
    let active = grid.active_cell();
    let ranges = app.host.selected_ranges();
    let row_touched = is_any_cell_of_row_selected(ranges, row);

    let spans = columns
        .iter()
        .filter_map(|index| grid.columns().get(*index).map(|column| (*index, column)))
        .map(|(index, column)| {
            let text = if column.is_row_header() {
                let checked =
                    selector.is_some_and(|selector| selector.row_selector().is_row_checked(row));
                format!("{}{:>4}", checkbox(checked), row + 1)
            } else {
                cell_text(item, column)
            };

            let mut style = Style::default();
            if column.is_row_header() && row_touched {
                style = style.fg(Color::Yellow);
            }
            if is_range_entirely_within_selected_ranges(ranges, &Range::cell(row, index)) {
                style = style.bg(Color::Blue).fg(Color::White);
            }
            if active == Some(Cell::new(row, index)) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if deleted {
                style = style.fg(Color::Red).add_modifier(Modifier::CROSSED_OUT);
            }
            Span::styled(fit(&text, app.width_of(index)), style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let (header_area, body_area, footer_area) = split_screen(frame.area());
    let grid = app.host.grid();
    let toolbar = app.toolbar();
    let staged = app
        .host
        .plugin::<StagedRowsTracker>()
        .map_or(0, |tracker| tracker.staged_rows().len());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" Rows: {} ", grid.row_count()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!("Ranges: {}", app.host.selected_ranges().len())),
        Span::raw(" | "),
        Span::raw(format!("Staged: {staged}")),
        Span::raw(" | "),
        Span::raw(format!("Copy: {}", on_off(toolbar.copy_enabled))),
        Span::raw(" | "),
        Span::raw(format!("Delete: {}", on_off(toolbar.delete_enabled))),
        Span::raw(" | "),
        Span::raw(format!(
            "Headers: {}",
            on_off(app.preferences.preferences().copy_with_headers)
        )),
        Span::raw(" | "),
        Span::raw(format!("Editing: {}", on_off(grid.is_edit_locked()))),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Query Result Grid"),
    );
    frame.render_widget(header, header_area);

    let columns = app.visible_columns();
    let mut lines = vec![header_line(app, &columns)];
    lines.extend(app.visible_rows().map(|row| row_line(app, row, &columns)));
    if grid.row_count() == 0 {
        lines.push(Line::from("No rows"));
    }
    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .alignment(Alignment::Left);
    frame.render_widget(body, body_area);

    let pending = if app.pending_delete.is_empty() {
        String::new()
    } else {
        format!(" | {} row(s) marked for deletion", app.pending_delete.len())
    };
    let footer = Paragraph::new(vec![
        Line::from(
            "arrows: move | shift+arrows: extend | space: row | c: column | ctrl+a: all | ?: help",
        ),
        Line::from(format!("Status: {}{pending}", app.status_line)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(footer, footer_area);

    if app.show_help {
        render_help_popup(frame);
    }
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Keymap"),
        Line::from("q: quit"),
        Line::from("?: toggle help"),
        Line::from("Arrows or hjkl: move the active cell"),
        Line::from("Shift+arrows or HJKL: extend the selection"),
        Line::from("Space: toggle the active row checkbox"),
        Line::from("c: toggle the active column checkbox"),
        Line::from("Ctrl+A: select or clear the whole grid"),
        Line::from("y / Ctrl+C: copy selection as CSV"),
        Line::from("p: paste copied rows at the end"),
        Line::from("e / E: export selection to CSV / JSON"),
        Line::from("d: mark staged rows for deletion"),
        Line::from("i: toggle cell editing"),
        Line::from("t: toggle copy with headers"),
        Line::from("Mouse: click, drag, header click, drag header to resize"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn key_modifiers(modifiers: KeyModifiers) -> Modifiers {
    Modifiers {
        shift: modifiers.contains(KeyModifiers::SHIFT),
        ctrl: modifiers.contains(KeyModifiers::CONTROL),
        alt: modifiers.contains(KeyModifiers::ALT),
        meta: modifiers.intersects(KeyModifiers::META | KeyModifiers::SUPER),
    }
}

fn arrow(arrow: ArrowKey, modifiers: KeyModifiers) -> Msg {
    Msg::Key(KeyPress::new(Key::Arrow(arrow), key_modifiers(modifiers)))
}

fn map_key_event(key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('a')) => Some(Msg::ToggleAll),
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Msg::Copy),
        (_, KeyCode::Char('q')) => Some(Msg::Quit),
        (_, KeyCode::Char('?')) => Some(Msg::ToggleHelp),
        (_, KeyCode::Char(' ')) => Some(Msg::ToggleRow),
        (_, KeyCode::Char('c')) => Some(Msg::ToggleColumn),
        (_, KeyCode::Char('y')) => Some(Msg::Copy),
        (_, KeyCode::Char('p')) => Some(Msg::Paste),
        (_, KeyCode::Char('e')) => Some(Msg::Export(ExportFormat::Csv)),
        (_, KeyCode::Char('E')) => Some(Msg::Export(ExportFormat::Json)),
        (_, KeyCode::Char('d')) => Some(Msg::ToggleDelete),
        (_, KeyCode::Char('i')) => Some(Msg::ToggleEditLock),
        (_, KeyCode::Char('t')) => Some(Msg::ToggleCopyHeaders),
        (modifiers, KeyCode::Up) => Some(arrow(ArrowKey::Up, modifiers)),
        (modifiers, KeyCode::Down) => Some(arrow(ArrowKey::Down, modifiers)),
        (modifiers, KeyCode::Left) => Some(arrow(ArrowKey::Left, modifiers)),
        (modifiers, KeyCode::Right) => Some(arrow(ArrowKey::Right, modifiers)),
        (_, KeyCode::Char('k')) => Some(Msg::Key(KeyPress::arrow(ArrowKey::Up))),
        (_, KeyCode::Char('j')) => Some(Msg::Key(KeyPress::arrow(ArrowKey::Down))),
        (_, KeyCode::Char('h')) => Some(Msg::Key(KeyPress::arrow(ArrowKey::Left))),
        (_, KeyCode::Char('l')) => Some(Msg::Key(KeyPress::arrow(ArrowKey::Right))),
        (_, KeyCode::Char('K')) => Some(Msg::Key(KeyPress::shift_arrow(ArrowKey::Up))),
        (_, KeyCode::Char('J')) => Some(Msg::Key(KeyPress::shift_arrow(ArrowKey::Down))),
        (_, KeyCode::Char('H')) => Some(Msg::Key(KeyPress::shift_arrow(ArrowKey::Left))),
        (_, KeyCode::Char('L')) => Some(Msg::Key(KeyPress::shift_arrow(ArrowKey::Right))),
        _ => None,
    }
}

fn map_mouse_event(mouse: MouseEvent) -> Option<Msg> {
    let (x, y) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Msg::MouseDown { x, y }),
        MouseEventKind::Drag(MouseButton::Left) => Some(Msg::MouseDrag { x, y }),
        MouseEventKind::Up(MouseButton::Left) => Some(Msg::MouseUp { x, y }),
        MouseEventKind::Moved => Some(Msg::MouseMove { x, y }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use qgrid_adapters::export::ExportFormat;
    use qgrid_core::event::{ArrowKey, KeyPress};
    use qgrid_core::grid::{ColumnDefinition, Grid, Row};
    use qgrid_core::preferences::FilePreferencesStore;
    use qgrid_core::range::{Cell, Range};
    use qgrid_core::staged_rows::StagedRowsTracker;
    use ratatui::style::Color;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::{fit, header_line, map_key_event, map_mouse_event, row_line, Msg, TuiApp};

    // With an 80x24 screen the grid body's header line sits at y = 4, the
    // first data row at y = 5, the checkbox column spans x = 1..9 and the
    // first data column x = 9..25.
    const HEADER_Y: u16 = 4;
    const FIRST_ROW_Y: u16 = 5;
    const FIRST_DATA_X: u16 = 11;
    const SECOND_DATA_X: u16 = 27;

    fn animal(id: i64, name: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(id));
        row.insert("animal".to_string(), json!(name));
        row
    }

    fn app(temp_dir: &TempDir) -> TuiApp {
        let preferences =
            FilePreferencesStore::load_from_path(temp_dir.path().join("preferences.toml"))
                .expect("failed to load preferences");
        let columns = vec![
            ColumnDefinition::data("id", 0).with_type("int"),
            ColumnDefinition::data("animal", 1),
        ];
        let rows = vec![animal(1, "leopard"), animal(2, "lion"), animal(3, "lynx")];
        TuiApp::new(columns, rows, vec!["id".to_string()], preferences)
            .with_export_dir(temp_dir.path())
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Option<Msg> {
        map_key_event(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn keymap_supports_selection_keys() {
        assert_eq!(key(KeyCode::Char('q'), KeyModifiers::NONE), Some(Msg::Quit));
        assert_eq!(
            key(KeyCode::Char('a'), KeyModifiers::CONTROL),
            Some(Msg::ToggleAll)
        );
        assert_eq!(key(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(Msg::Copy));
        assert_eq!(
            key(KeyCode::Char('c'), KeyModifiers::NONE),
            Some(Msg::ToggleColumn)
        );
        assert_eq!(key(KeyCode::Char(' '), KeyModifiers::NONE), Some(Msg::ToggleRow));
        assert_eq!(
            key(KeyCode::Char('E'), KeyModifiers::SHIFT),
            Some(Msg::Export(ExportFormat::Json))
        );
    }

    #[test]
    fn arrows_carry_their_modifiers() {
        assert_eq!(
            key(KeyCode::Right, KeyModifiers::SHIFT),
            Some(Msg::Key(KeyPress::shift_arrow(ArrowKey::Right)))
        );
        assert_eq!(
            key(KeyCode::Char('j'), KeyModifiers::NONE),
            Some(Msg::Key(KeyPress::arrow(ArrowKey::Down)))
        );
        assert_eq!(
            key(KeyCode::Char('L'), KeyModifiers::SHIFT),
            Some(Msg::Key(KeyPress::shift_arrow(ArrowKey::Right)))
        );
        let Some(Msg::Key(press)) = key(KeyCode::Up, KeyModifiers::CONTROL) else {
            panic!("ctrl+up should map to a key press");
        };
        assert!(press.modifiers.ctrl);
        assert_eq!(press.range_extension(), None);
    }

    #[test]
    fn mouse_buttons_map_to_pointer_messages() {
        let event = |kind| MouseEvent {
            kind,
            column: 3,
            row: 7,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(
            map_mouse_event(event(MouseEventKind::Down(MouseButton::Left))),
            Some(Msg::MouseDown { x: 3, y: 7 })
        );
        assert_eq!(
            map_mouse_event(event(MouseEventKind::Up(MouseButton::Left))),
            Some(Msg::MouseUp { x: 3, y: 7 })
        );
        assert_eq!(
            map_mouse_event(event(MouseEventKind::Down(MouseButton::Right))),
            None
        );
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("abcdef", 4), "abc ");
    }

    #[test]
    fn keyboard_row_toggle_stages_the_row() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::ToggleRow);
        assert_eq!(app.status_line, "No active cell");

        app.handle(Msg::Key(KeyPress::arrow(ArrowKey::Down)));
        assert_eq!(app.host.grid().active_cell(), Some(Cell::new(0, 1)));

        app.handle(Msg::ToggleRow);
        assert_eq!(app.host.selected_ranges(), &[Range::new(0, 1, 0, 2)]);
        let tracker = app
            .host
            .plugin::<StagedRowsTracker>()
            .expect("tracker registered");
        assert_eq!(tracker.staged_rows().len(), 1);
        assert!(app.toolbar().delete_enabled);

        app.handle(Msg::ToggleDelete);
        assert_eq!(app.pending_delete.len(), 1);
        app.handle(Msg::ToggleDelete);
        assert!(app.pending_delete.is_empty());
    }

    #[test]
    fn copy_then_paste_appends_rows() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::Paste);
        assert_eq!(app.status_line, "Clipboard is empty");

        app.handle(Msg::ToggleAll);
        app.handle(Msg::Copy);
        assert_eq!(
            app.clipboard.as_ref().map(|clipboard| clipboard.text.as_str()),
            Some("1,\"leopard\"\n2,\"lion\"\n3,\"lynx\"")
        );

        app.handle(Msg::Paste);
        assert_eq!(app.host.grid().row_count(), 6);
        let pasted = app.host.grid().item(3).expect("pasted row");
        assert_eq!(pasted["animal"], json!("leopard"));
        assert_eq!(pasted["__temp_PK"], json!("pasted-1"));
    }

    #[test]
    fn pasting_a_column_copy_fills_only_that_column() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::Key(KeyPress::arrow(ArrowKey::Down)));
        app.handle(Msg::Key(KeyPress::arrow(ArrowKey::Right)));
        app.handle(Msg::ToggleColumn);
        assert_eq!(app.host.selected_ranges(), &[Range::new(0, 2, 2, 2)]);

        app.handle(Msg::Copy);
        assert_eq!(
            app.clipboard.as_ref().map(|clipboard| clipboard.text.as_str()),
            Some("\"leopard\"\n\"lion\"\n\"lynx\"")
        );

        app.handle(Msg::Paste);
        assert_eq!(app.host.grid().row_count(), 6);
        let pasted = app.host.grid().item(3).expect("pasted row");
        assert_eq!(pasted["animal"], json!("leopard"));
        assert_eq!(pasted["id"], Value::Null);
        assert_eq!(pasted["__temp_PK"], json!("pasted-1"));
    }

    #[test]
    fn paste_uses_the_header_flag_of_the_copy() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::ToggleCopyHeaders);
        app.handle(Msg::ToggleAll);
        app.handle(Msg::Copy);
        app.handle(Msg::ToggleCopyHeaders);
        assert!(!app.preferences.preferences().copy_with_headers);

        app.handle(Msg::Paste);
        assert_eq!(app.host.grid().row_count(), 6);
        let pasted = app.host.grid().item(3).expect("pasted row");
        assert_eq!(pasted["id"], json!("1"));
        assert_eq!(pasted["animal"], json!("leopard"));
    }

    #[test]
    fn partially_selected_rows_and_columns_are_highlighted() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);
        app.handle(Msg::Key(KeyPress::arrow(ArrowKey::Down)));

        let header = header_line(&app, &[0, 1, 2]);
        assert_eq!(header.spans[1].style.fg, Some(Color::Yellow));
        assert_eq!(header.spans[2].style.fg, None);

        let first = row_line(&app, 0, &[0, 1, 2]);
        assert_eq!(first.spans[0].style.fg, Some(Color::Yellow));
        assert_eq!(first.spans[1].style.bg, Some(Color::Blue));
        assert_eq!(first.spans[2].style.bg, None);

        let second = row_line(&app, 1, &[0, 1, 2]);
        assert_eq!(second.spans[0].style.fg, None);
    }

    #[test]
    fn mouse_click_and_drag_select_cells() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::MouseDown {
            x: FIRST_DATA_X,
            y: FIRST_ROW_Y,
        });
        app.handle(Msg::MouseUp {
            x: FIRST_DATA_X,
            y: FIRST_ROW_Y,
        });
        assert_eq!(app.host.grid().active_cell(), Some(Cell::new(0, 1)));
        assert_eq!(app.host.selected_ranges(), &[Range::cell(0, 1)]);

        app.handle(Msg::MouseDown {
            x: FIRST_DATA_X,
            y: FIRST_ROW_Y,
        });
        app.handle(Msg::MouseUp {
            x: SECOND_DATA_X,
            y: FIRST_ROW_Y + 1,
        });
        assert_eq!(app.host.selected_ranges(), &[Range::new(0, 1, 1, 2)]);

        app.handle(Msg::ToggleEditLock);
        app.handle(Msg::MouseDown {
            x: FIRST_DATA_X,
            y: FIRST_ROW_Y + 2,
        });
        app.handle(Msg::MouseUp {
            x: SECOND_DATA_X,
            y: FIRST_ROW_Y + 2,
        });
        assert_eq!(app.host.selected_ranges(), &[Range::new(0, 1, 1, 2)]);
        assert_eq!(app.status_line, "Range selection is disabled while editing");
    }

    #[test]
    fn header_resize_swallows_the_following_click() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::MouseMove {
            x: FIRST_DATA_X,
            y: HEADER_Y,
        });
        app.handle(Msg::MouseDown {
            x: FIRST_DATA_X,
            y: HEADER_Y,
        });
        app.handle(Msg::MouseDrag {
            x: FIRST_DATA_X + 3,
            y: HEADER_Y,
        });
        app.handle(Msg::MouseUp {
            x: FIRST_DATA_X + 3,
            y: HEADER_Y,
        });
        assert_eq!(app.width_of(1), 19);
        assert!(app.host.selected_ranges().is_empty());

        app.handle(Msg::MouseDown {
            x: FIRST_DATA_X,
            y: HEADER_Y,
        });
        app.handle(Msg::MouseUp {
            x: FIRST_DATA_X,
            y: HEADER_Y,
        });
        assert_eq!(app.host.selected_ranges(), &[Range::new(0, 1, 2, 1)]);
    }

    #[test]
    fn export_writes_selection_and_copy_headers_persist() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut app = app(&temp_dir);

        app.handle(Msg::Export(ExportFormat::Csv));
        assert!(app.status_line.starts_with("Export failed"));

        app.handle(Msg::ToggleCopyHeaders);
        assert!(app.preferences.preferences().copy_with_headers);
        assert!(temp_dir.path().join("preferences.toml").exists());

        app.handle(Msg::Key(KeyPress::arrow(ArrowKey::Down)));
        app.handle(Msg::ToggleColumn);
        app.handle(Msg::Export(ExportFormat::Csv));
        let output = fs::read_to_string(temp_dir.path().join("qgrid-selection.csv"))
            .expect("export file");
        assert_eq!(output, "\"id\"\n1\n2\n3\n");
    }
}
