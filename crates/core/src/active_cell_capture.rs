use std::any::Any;

use crate::event::{EventControl, GridEvent};
use crate::grid::Grid;
use crate::plugin::GridPlugin;
use crate::range::Cell;
use crate::range_helper::{is_range_selected, range_for_column, range_for_row, selectable_span};
use crate::selection_model::CellSelectionModel;

/// Keeps the active cell on the row or column last toggled through a header
/// checkbox, so Shift+Arrow has an anchor to extend from.
#[derive(Debug, Default)]
pub struct ActiveCellCapture {
    mouse_in_header: bool,
    columns_resized: bool,
}

impl ActiveCellCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn header_clicked(
        &mut self,
        grid: &mut dyn Grid,
        selection: &CellSelectionModel,
        column: usize,
        control: &mut EventControl,
    ) {
        if self.columns_resized {
            self.columns_resized = false;
            control.stop_propagation();
            return;
        }
        if !grid.can_cell_be_selected(0, column) {
            return;
        }

        let ranges = selection.selected_ranges();
        let column_selected =
            range_for_column(grid, column).is_some_and(|range| is_range_selected(ranges, &range));
        if grid.active_cell() == Some(Cell::new(0, column)) {
            match ranges {
                [.., previous, _] => grid.set_active_cell(0, previous.from_cell),
                _ => grid.reset_active_cell(),
            }
        } else if !column_selected {
            grid.set_active_cell(0, column);
        }
    }

    fn row_header_clicked(grid: &mut dyn Grid, selection: &CellSelectionModel, row: usize) {
        if row >= grid.row_count() {
            return;
        }
        let Some(span) = selectable_span(grid) else {
            return;
        };

        let ranges = selection.selected_ranges();
        let row_selected =
            range_for_row(grid, row).is_some_and(|range| is_range_selected(ranges, &range));
        if grid.active_cell() == Some(Cell::new(row, span.low)) {
            match ranges {
                [.., previous, _] => grid.set_active_cell(previous.from_row, span.low),
                _ => grid.reset_active_cell(),
            }
        } else if !row_selected {
            grid.set_active_cell(row, span.low);
        }
    }
}

impl GridPlugin for ActiveCellCapture {
    fn name(&self) -> &'static str {
        "active_cell_capture"
    }

    fn handle_event(
        &mut self,
        grid: &mut dyn Grid,
        selection: &mut CellSelectionModel,
        event: &GridEvent,
        control: &mut EventControl,
    ) {
        match event {
            GridEvent::HeaderMouseEnter => self.mouse_in_header = true,
            GridEvent::HeaderMouseLeave => self.mouse_in_header = false,
            GridEvent::ColumnsResized => {
                if self.mouse_in_header {
                    self.columns_resized = true;
                }
            }
            GridEvent::HeaderClick { column } => {
                self.header_clicked(grid, selection, *column, control);
            }
            GridEvent::Click { row, cell } => {
                let on_row_header = grid
                    .columns()
                    .get(*cell)
                    .is_some_and(|column| column.is_row_header());
                if on_row_header {
                    Self::row_header_clicked(grid, selection, *row);
                }
            }
            GridEvent::KeyDown(key) => {
                if key.range_extension().is_some() && grid.active_cell().is_some() {
                    if let [_, .., last] = selection.selected_ranges() {
                        let last = *last;
                        selection.set_selected_ranges(grid, vec![last]);
                    }
                }
            }
            GridEvent::DragEnd { start, .. } => grid.set_active_cell(start.row, start.cell),
            _ => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
