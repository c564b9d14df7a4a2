pub mod active_cell_capture;
pub mod boundary;
pub mod column_selector;
pub mod csv;
pub mod event;
pub mod grid;
pub mod grid_selector;
pub mod host;
pub mod plugin;
pub mod preferences;
pub mod range;
pub mod range_helper;
pub mod row_selector;
pub mod selection_model;
pub mod staged_rows;

use crate::active_cell_capture::ActiveCellCapture;
use crate::grid::Grid;
use crate::grid_selector::GridSelector;
use crate::host::GridHost;
use crate::selection_model::{CellSelectionModel, SelectionModelOptions};
use crate::staged_rows::StagedRowsTracker;

/// Wires a grid the way the result panel does: active cell capture, the
/// selection model, header checkboxes, then the staged-rows tracker.
#[must_use]
pub fn result_grid_host<G: Grid>(
    grid: G,
    options: SelectionModelOptions,
    staged: StagedRowsTracker,
) -> GridHost<G> {
    let mut host = GridHost::new(grid);
    host.register_plugin(ActiveCellCapture::new());
    host.set_selection_model(CellSelectionModel::new(options));
    host.register_plugin(GridSelector::new());
    host.register_plugin(staged);
    host
}
