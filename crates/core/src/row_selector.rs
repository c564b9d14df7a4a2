use std::any::Any;
use std::collections::BTreeSet;

use crate::event::{EventControl, GridEvent};
use crate::grid::{ColumnDefinition, Grid};
use crate::plugin::GridPlugin;
use crate::range_helper::{
    add_range, are_all_ranges_rows, get_indexes_of_complete_rows, is_range_selected,
    range_for_row, remove_range,
};
use crate::selection_model::CellSelectionModel;

/// Row header checkboxes.
#[derive(Debug, Default)]
pub struct RowSelector {
    checked: BTreeSet<usize>,
}

impl RowSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends the synthetic row header column.
    #[must_use]
    pub fn column_definitions(columns: Vec<ColumnDefinition>) -> Vec<ColumnDefinition> {
        let mut with_header = Vec::with_capacity(columns.len() + 1);
        with_header.push(ColumnDefinition::row_header());
        with_header.extend(columns);
        with_header
    }

    #[must_use]
    pub fn is_row_checked(&self, row: usize) -> bool {
        self.checked.contains(&row)
    }

    pub fn checked_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.checked.iter().copied()
    }

    /// Removes the row when selected, adds it next to other whole rows, and
    /// otherwise replaces the selection with it.
    pub fn toggle_row(grid: &dyn Grid, selection: &mut CellSelectionModel, row: usize) {
        let Some(range) = range_for_row(grid, row) else {
            return;
        };
        let ranges = selection.selected_ranges();
        let next = if is_range_selected(ranges, &range) {
            remove_range(ranges, &range)
        } else if are_all_ranges_rows(ranges, grid) {
            add_range(ranges, range)
        } else {
            vec![range]
        };
        selection.set_selected_ranges(grid, next);
    }
}

impl GridPlugin for RowSelector {
    fn name(&self) -> &'static str {
        "row_selector"
    }

    fn handle_event(
        &mut self,
        grid: &mut dyn Grid,
        selection: &mut CellSelectionModel,
        event: &GridEvent,
        control: &mut EventControl,
    ) {
        if let GridEvent::Click { row, cell } = *event {
            let on_row_header = grid
                .columns()
                .get(cell)
                .is_some_and(ColumnDefinition::is_row_header);
            if on_row_header {
                control.stop_propagation();
                Self::toggle_row(grid, selection, row);
            }
        }
    }

    fn selection_changed(&mut self, grid: &dyn Grid, selection: &mut CellSelectionModel) {
        let covered: BTreeSet<usize> =
            get_indexes_of_complete_rows(grid, selection.selected_ranges())
                .into_iter()
                .collect();
        if covered != self.checked {
            log::trace!(
                "row checkboxes: {} unchecked, {} checked",
                self.checked.difference(&covered).count(),
                covered.difference(&self.checked).count()
            );
            self.checked = covered;
        }
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
    use serde_json::json;

    use super::RowSelector;
    use crate::event::{EventControl, GridEvent};
    use crate::grid::{ColumnDefinition, Grid, ResultGrid, Row};
    use crate::plugin::GridPlugin;
    use crate::range::Range;
    use crate::selection_model::CellSelectionModel;

    fn fixture() -> (ResultGrid, CellSelectionModel, RowSelector) {
        let columns = RowSelector::column_definitions(vec![
            ColumnDefinition::data("id", 0),
            ColumnDefinition::data("name", 1),
        ]);
        let rows = (0..6)
            .map(|index| {
                let mut row = Row::new();
                row.insert("id".to_string(), json!(index));
                row
            })
            .collect();
        let grid = ResultGrid::new(columns, rows);
        let mut selection = CellSelectionModel::default();
        selection.init(&grid);
        (grid, selection, RowSelector::new())
    }

    fn click_row_header(
        grid: &mut ResultGrid,
        selection: &mut CellSelectionModel,
        selector: &mut RowSelector,
        row: usize,
    ) -> EventControl {
        let mut control = EventControl::default();
        selector.handle_event(grid, selection, &GridEvent::Click { row, cell: 0 }, &mut control);
        selector.selection_changed(grid, selection);
        control
    }

    #[test]
    fn column_definitions_prepend_row_header() {
        let columns = RowSelector::column_definitions(vec![ColumnDefinition::data("id", 0)]);
        assert_eq!(columns.len(), 2);
        assert!(columns[0].is_row_header());
        assert!(!columns[0].selectable);
    }

    #[test]
    fn row_header_clicks_extend_then_toggle_off() {
        let (mut grid, mut selection, mut selector) = fixture();

        let control = click_row_header(&mut grid, &mut selection, &mut selector, 4);
        assert!(control.is_propagation_stopped());
        click_row_header(&mut grid, &mut selection, &mut selector, 0);
        assert_eq!(
            selection.selected_ranges(),
            &[Range::new(4, 1, 4, 2), Range::new(0, 1, 0, 2)]
        );
        assert!(selector.is_row_checked(0) && selector.is_row_checked(4));

        click_row_header(&mut grid, &mut selection, &mut selector, 4);
        assert_eq!(selection.selected_ranges(), &[Range::new(0, 1, 0, 2)]);
        assert!(!selector.is_row_checked(4));
        assert_eq!(selector.checked_rows().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn row_header_click_replaces_a_mixed_selection() {
        let (mut grid, mut selection, mut selector) = fixture();
        selection.set_selected_ranges(&grid, vec![Range::new(0, 2, 5, 2)]);

        click_row_header(&mut grid, &mut selection, &mut selector, 3);
        assert_eq!(selection.selected_ranges(), &[Range::new(3, 1, 3, 2)]);
    }

    #[test]
    fn clicks_on_data_cells_pass_through() {
        let (mut grid, mut selection, mut selector) = fixture();
        let mut control = EventControl::default();
        selector.handle_event(
            &mut grid,
            &mut selection,
            &GridEvent::Click { row: 1, cell: 1 },
            &mut control,
        );
        assert!(!control.is_handled());
        assert!(selection.selected_ranges().is_empty());
        assert_eq!(grid.active_cell(), None);
    }

    #[test]
    fn checkbox_follows_multi_row_ranges() {
        let (grid, mut selection, mut selector) = fixture();
        selection.set_selected_ranges(&grid, vec![Range::new(1, 1, 3, 2), Range::cell(5, 1)]);
        selector.selection_changed(&grid, &mut selection);
        assert_eq!(selector.checked_rows().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
