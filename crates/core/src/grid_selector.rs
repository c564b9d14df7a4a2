use std::any::Any;

use crate::column_selector::ColumnSelector;
use crate::event::{EventControl, GridEvent};
use crate::grid::{ColumnDefinition, Grid};
use crate::plugin::GridPlugin;
use crate::range_helper::{is_entire_grid_selected, range_for_whole_grid};
use crate::row_selector::RowSelector;
use crate::selection_model::CellSelectionModel;

/// Row and column checkboxes plus the master checkbox on the row header
/// column.
#[derive(Debug, Default)]
pub struct GridSelector {
    rows: RowSelector,
    columns: ColumnSelector,
    all_checked: bool,
}

impl GridSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn column_definitions(columns: Vec<ColumnDefinition>) -> Vec<ColumnDefinition> {
        RowSelector::column_definitions(columns)
    }

    #[must_use]
    pub fn row_selector(&self) -> &RowSelector {
        &self.rows
    }

    #[must_use]
    pub fn column_selector(&self) -> &ColumnSelector {
        &self.columns
    }

    #[must_use]
    pub fn all_checked(&self) -> bool {
        self.all_checked
    }

    pub fn toggle_all(grid: &mut dyn Grid, selection: &mut CellSelectionModel) {
        if is_entire_grid_selected(grid, selection.selected_ranges()) {
            selection.set_selected_ranges(grid, Vec::new());
            return;
        }
        if let Some(whole) = range_for_whole_grid(grid) {
            grid.set_active_cell(0, whole.from_cell);
            selection.set_selected_ranges(grid, vec![whole]);
        }
    }
}

impl GridPlugin for GridSelector {
    fn name(&self) -> &'static str {
        "grid_selector"
    }

    fn init(&mut self, grid: &mut dyn Grid, selection: &mut CellSelectionModel) {
        self.rows.init(grid, selection);
        self.columns.init(grid, selection);
    }

    fn destroy(&mut self) {
        self.rows.destroy();
        self.columns.destroy();
    }

    fn handle_event(
        &mut self,
        grid: &mut dyn Grid,
        selection: &mut CellSelectionModel,
        event: &GridEvent,
        control: &mut EventControl,
    ) {
        if let GridEvent::HeaderClick { column } = *event {
            let selects_all = grid
                .columns()
                .get(column)
                .is_some_and(|definition| definition.select_all_on_click);
            if selects_all {
                control.stop_propagation();
                Self::toggle_all(grid, selection);
                return;
            }
        }

        self.rows.handle_event(grid, selection, event, control);
        if !control.is_propagation_stopped() {
            self.columns.handle_event(grid, selection, event, control);
        }
    }

    fn selection_changed(&mut self, grid: &dyn Grid, selection: &mut CellSelectionModel) {
        self.rows.selection_changed(grid, selection);
        self.columns.selection_changed(grid, selection);
        self.all_checked = is_entire_grid_selected(grid, selection.selected_ranges());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::GridSelector;
    use crate::event::{EventControl, GridEvent};
    use crate::grid::{ColumnDefinition, Grid, ResultGrid, Row};
    use crate::plugin::GridPlugin;
    use crate::range::{Cell, Range};
    use crate::selection_model::CellSelectionModel;

    fn fixture() -> (ResultGrid, CellSelectionModel, GridSelector) {
        let columns = GridSelector::column_definitions(vec![
            ColumnDefinition::data("id", 0),
            ColumnDefinition::data("name", 1),
        ]);
        let grid = ResultGrid::new(columns, vec![Row::new(); 10]);
        let mut selection = CellSelectionModel::default();
        selection.init(&grid);
        (grid, selection, GridSelector::new())
    }

    fn send(
        grid: &mut ResultGrid,
        selection: &mut CellSelectionModel,
        selector: &mut GridSelector,
        event: GridEvent,
    ) -> EventControl {
        let mut control = EventControl::default();
        selector.handle_event(grid, selection, &event, &mut control);
        selector.selection_changed(grid, selection);
        control
    }

    #[test]
    fn master_checkbox_toggles_whole_grid() {
        let (mut grid, mut selection, mut selector) = fixture();

        let control = send(
            &mut grid,
            &mut selection,
            &mut selector,
            GridEvent::HeaderClick { column: 0 },
        );
        assert!(control.is_propagation_stopped());
        assert_eq!(selection.selected_ranges(), &[Range::new(0, 1, 9, 2)]);
        assert_eq!(grid.active_cell(), Some(Cell::new(0, 1)));
        assert!(selector.all_checked());
        assert!(selector.row_selector().is_row_checked(9));
        assert!(selector.column_selector().is_column_checked(2));

        send(
            &mut grid,
            &mut selection,
            &mut selector,
            GridEvent::HeaderClick { column: 0 },
        );
        assert!(selection.selected_ranges().is_empty());
        assert!(!selector.all_checked());
        assert_eq!(selector.row_selector().checked_rows().count(), 0);
    }

    #[test]
    fn delegates_row_and_column_headers() {
        let (mut grid, mut selection, mut selector) = fixture();

        send(
            &mut grid,
            &mut selection,
            &mut selector,
            GridEvent::HeaderClick { column: 2 },
        );
        assert_eq!(selection.selected_ranges(), &[Range::new(0, 2, 9, 2)]);

        send(
            &mut grid,
            &mut selection,
            &mut selector,
            GridEvent::Click { row: 3, cell: 0 },
        );
        assert_eq!(selection.selected_ranges(), &[Range::new(3, 1, 3, 2)]);
        assert!(!selector.all_checked());
    }
}
