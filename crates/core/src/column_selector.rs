use std::any::Any;
use std::collections::BTreeSet;

use crate::event::{EventControl, GridEvent};
use crate::grid::{ColumnDefinition, Grid};
use crate::plugin::GridPlugin;
use crate::range_helper::{
    add_range, are_all_ranges_single_columns, get_indexes_of_complete_columns, is_range_selected,
    range_for_column, remove_range,
};
use crate::selection_model::CellSelectionModel;

/// Column header checkboxes.
#[derive(Debug, Default)]
pub struct ColumnSelector {
    checked: BTreeSet<usize>,
}

impl ColumnSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header text: the column name followed by its type when known.
    #[must_use]
    pub fn header_label(column: &ColumnDefinition) -> String {
        match &column.column_type {
            Some(column_type) => format!("{} ({column_type})", column.name),
            None => column.name.clone(),
        }
    }

    #[must_use]
    pub fn is_column_checked(&self, column: usize) -> bool {
        self.checked.contains(&column)
    }

    pub fn checked_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.checked.iter().copied()
    }

    pub fn toggle_column(grid: &dyn Grid, selection: &mut CellSelectionModel, column: usize) {
        let selectable = grid
            .columns()
            .get(column)
            .is_some_and(|definition| definition.selectable);
        if !selectable {
            return;
        }
        let Some(range) = range_for_column(grid, column) else {
            return;
        };

        let ranges = selection.selected_ranges();
        let next = if is_range_selected(ranges, &range) {
            remove_range(ranges, &range)
        } else if are_all_ranges_single_columns(ranges, grid) {
            add_range(ranges, range)
        } else {
            vec![range]
        };
        selection.set_selected_ranges(grid, next);
    }
}

impl GridPlugin for ColumnSelector {
    fn name(&self) -> &'static str {
        "column_selector"
    }

    fn handle_event(
        &mut self,
        grid: &mut dyn Grid,
        selection: &mut CellSelectionModel,
        event: &GridEvent,
        _control: &mut EventControl,
    ) {
        if let GridEvent::HeaderClick { column } = *event {
            Self::toggle_column(grid, selection, column);
        }
    }

    fn selection_changed(&mut self, grid: &dyn Grid, selection: &mut CellSelectionModel) {
        let covered: BTreeSet<usize> =
            get_indexes_of_complete_columns(grid, selection.selected_ranges())
                .into_iter()
                .filter(|column| {
                    grid.columns()
                        .get(*column)
                        .is_some_and(|definition| definition.selectable)
                })
                .collect();
        if covered != self.checked {
            log::trace!(
                "column checkboxes: {} unchecked, {} checked",
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
