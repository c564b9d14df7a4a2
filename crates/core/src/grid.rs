use serde_json::{Map, Value};

use crate::range::Cell;

pub const ROW_HEADER_COLUMN_ID: &str = "row-header-column";

/// One result row keyed by column field.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub id: String,
    pub name: String,
    pub field: Option<String>,
    /// Position of the column in the result set; `None` for synthetic columns.
    pub pos: Option<usize>,
    pub selectable: bool,
    pub column_type: Option<String>,
    pub select_all_on_click: bool,
}

impl ColumnDefinition {
    /// A result-set column whose values live under `name` in each row.
    #[must_use]
    pub fn data(name: impl Into<String>, pos: usize) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            field: Some(name.clone()),
            name,
            pos: Some(pos),
            selectable: true,
            column_type: None,
            select_all_on_click: false,
        }
    }

    #[must_use]
    pub fn row_header() -> Self {
        Self {
            id: ROW_HEADER_COLUMN_ID.to_string(),
            name: String::new(),
            field: None,
            pos: None,
            selectable: false,
            column_type: None,
            select_all_on_click: true,
        }
    }

    #[must_use]
    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    #[must_use]
    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    #[must_use]
    pub fn is_row_header(&self) -> bool {
        self.id == ROW_HEADER_COLUMN_ID
    }
}

/// The grid surface the selection engine works against.
///
/// Moving the active cell through this trait is silent: only the host's
/// native navigation raises `GridEvent::ActiveCellChanged`.
pub trait Grid {
    fn columns(&self) -> &[ColumnDefinition];

    fn row_count(&self) -> usize;

    fn item(&self, row: usize) -> Option<&Row>;

    fn can_cell_be_selected(&self, row: usize, cell: usize) -> bool {
        row < self.row_count()
            && self
                .columns()
                .get(cell)
                .is_some_and(|column| column.selectable)
    }

    fn can_cell_be_active(&self, row: usize, cell: usize) -> bool {
        self.can_cell_be_selected(row, cell)
    }

    fn is_edit_locked(&self) -> bool;

    fn active_cell(&self) -> Option<Cell>;

    fn set_active_cell(&mut self, row: usize, cell: usize);

    fn reset_active_cell(&mut self);

    fn scroll_row_into_view(&mut self, row: usize);

    fn scroll_column_into_view(&mut self, cell: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top_row: usize,
    pub left_cell: usize,
    pub visible_rows: usize,
    pub visible_cells: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            top_row: 0,
            left_cell: 0,
            visible_rows: 20,
            visible_cells: 8,
        }
    }
}

/// In-memory result grid.
#[derive(Debug, Clone, Default)]
pub struct ResultGrid {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Row>,
    active: Option<Cell>,
    edit_locked: bool,
    viewport: Viewport,
}

impl ResultGrid {
    #[must_use]
    pub fn new(columns: Vec<ColumnDefinition>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn append_rows(&mut self, rows: impl IntoIterator<Item = Row>) -> usize {
        let before = self.rows.len();
        self.rows.extend(rows);
        self.rows.len() - before
    }

    pub fn set_edit_locked(&mut self, locked: bool) {
        self.edit_locked = locked;
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize_viewport(&mut self, visible_rows: usize, visible_cells: usize) {
        self.viewport.visible_rows = visible_rows.max(1);
        self.viewport.visible_cells = visible_cells.max(1);
    }
}

impl Grid for ResultGrid {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn item(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    fn is_edit_locked(&self) -> bool {
        self.edit_locked
    }

    fn active_cell(&self) -> Option<Cell> {
        self.active
    }

    fn set_active_cell(&mut self, row: usize, cell: usize) {
        self.active = Some(Cell::new(row, cell));
    }

    fn reset_active_cell(&mut self) {
        self.active = None;
    }

    fn scroll_row_into_view(&mut self, row: usize) {
        let viewport = &mut self.viewport;
        if row < viewport.top_row {
            viewport.top_row = row;
        } else if row >= viewport.top_row + viewport.visible_rows {
            viewport.top_row = row + 1 - viewport.visible_rows;
        }
    }

    fn scroll_column_into_view(&mut self, cell: usize) {
        let viewport = &mut self.viewport;
        if cell < viewport.left_cell {
            viewport.left_cell = cell;
        } else if cell >= viewport.left_cell + viewport.visible_cells {
            viewport.left_cell = cell + 1 - viewport.visible_cells;
        }
    }
}
