use std::fmt;

use crate::event::{ArrowKey, EventControl, GridEvent};
use crate::grid::Grid;
use crate::range::{Cell, Range};
use crate::range_helper::range_for_row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionModelOptions {
    /// Replace the selection with the active cell whenever the grid's own
    /// navigation moves it.
    pub select_active_cell: bool,
}

impl Default for SelectionModelOptions {
    fn default() -> Self {
        Self {
            select_active_cell: true,
        }
    }
}

type Listener = Box<dyn FnMut(&[Range])>;

/// Multi-range cell selection.
///
/// The stored list never holds two equal ranges and is only replaced through
/// `set_selected_ranges` and `set_selected_rows`. Every effective change bumps
/// the revision and notifies listeners once.
pub struct CellSelectionModel {
    options: SelectionModelOptions,
    ranges: Vec<Range>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    revision: u64,
    attached: bool,
}

impl fmt::Debug for CellSelectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellSelectionModel")
            .field("options", &self.options)
            .field("ranges", &self.ranges)
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .field("attached", &self.attached)
            .finish()
    }
}

impl Default for CellSelectionModel {
    fn default() -> Self {
        Self::new(SelectionModelOptions::default())
    }
}

impl CellSelectionModel {
    #[must_use]
    pub fn new(options: SelectionModelOptions) -> Self {
        Self {
            options,
            ranges: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
            revision: 0,
            attached: false,
        }
    }

    #[must_use]
    pub fn options(&self) -> SelectionModelOptions {
        self.options
    }

    pub fn init(&mut self, grid: &dyn Grid) {
        self.attached = true;
        log::debug!(
            "selection model attached to grid ({} columns, {} rows)",
            grid.columns().len(),
            grid.row_count()
        );
    }

    pub fn destroy(&mut self) {
        self.attached = false;
        self.listeners.clear();
        log::debug!("selection model detached");
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    #[must_use]
    pub fn selected_ranges(&self) -> &[Range] {
        &self.ranges
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn on_selection_changed(&mut self, listener: impl FnMut(&[Range]) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Stores `ranges` minus those with a corner that cannot be selected.
    /// Returns whether the selection changed.
    pub fn set_selected_ranges(&mut self, grid: &dyn Grid, ranges: Vec<Range>) -> bool {
        let mut kept = Vec::with_capacity(ranges.len());
        for range in ranges {
            let valid = grid.can_cell_be_selected(range.from_row, range.from_cell)
                && grid.can_cell_be_selected(range.to_row, range.to_cell);
            if !valid {
                log::trace!("dropping unselectable range {range:?}");
                continue;
            }
            if !kept.contains(&range) {
                kept.push(range);
            }
        }
        self.store(kept)
    }

    /// Selects one full-row range per index. Indexes are not validated.
    pub fn set_selected_rows(&mut self, grid: &dyn Grid, rows: &[usize]) -> bool {
        let mut ranges = Vec::with_capacity(rows.len());
        for range in rows.iter().filter_map(|row| range_for_row(grid, *row)) {
            if !ranges.contains(&range) {
                ranges.push(range);
            }
        }
        self.store(ranges)
    }

    fn store(&mut self, ranges: Vec<Range>) -> bool {
        if ranges == self.ranges {
            return false;
        }
        self.ranges = ranges;
        self.revision += 1;
        log::debug!(
            "selection changed to {} range(s), revision {}",
            self.ranges.len(),
            self.revision
        );

        let ranges = &self.ranges;
        for (_, listener) in &mut self.listeners {
            listener(ranges);
        }
        true
    }

    pub fn handle_event(
        &mut self,
        grid: &mut dyn Grid,
        event: &GridEvent,
        control: &mut EventControl,
    ) {
        if !self.attached {
            return;
        }

        match event {
            GridEvent::ActiveCellChanged(Some(cell)) if self.options.select_active_cell => {
                self.set_selected_ranges(grid, vec![Range::cell(cell.row, cell.cell)]);
            }
            GridEvent::BeforeCellRangeSelected => {
                if grid.is_edit_locked() {
                    control.stop_propagation();
                }
            }
            GridEvent::CellRangeSelected(range) => {
                self.set_selected_ranges(grid, vec![*range]);
            }
            GridEvent::KeyDown(key) => {
                if let Some(arrow) = key.range_extension() {
                    self.extend_last_range(grid, arrow, control);
                }
            }
            _ => {}
        }
    }

    fn extend_last_range(
        &mut self,
        grid: &mut dyn Grid,
        arrow: ArrowKey,
        control: &mut EventControl,
    ) {
        let Some(active) = grid.active_cell() else {
            return;
        };

        let last = self
            .ranges
            .last()
            .copied()
            .filter(|range| range.opposite_corner(active).is_some())
            .unwrap_or(Range::cell(active.row, active.cell));
        let mobile = last.opposite_corner(active).unwrap_or(active);

        if let Some(moved) = step(mobile, arrow) {
            let candidate = Range::spanning(active, moved);
            let selectable = candidate
                .cells_iter()
                .all(|cell| grid.can_cell_be_selected(cell.row, cell.cell));
            if selectable {
                let mut ranges = self.ranges.clone();
                ranges.pop();
                ranges.push(candidate);
                self.set_selected_ranges(grid, ranges);
                match arrow {
                    ArrowKey::Up | ArrowKey::Down => grid.scroll_row_into_view(moved.row),
                    ArrowKey::Left | ArrowKey::Right => grid.scroll_column_into_view(moved.cell),
                }
            } else {
                log::trace!("ignoring extension to unselectable range {candidate:?}");
            }
        }

        control.prevent_default();
        control.stop_propagation();
    }
}

fn step(cell: Cell, arrow: ArrowKey) -> Option<Cell> {
    match arrow {
        ArrowKey::Up => cell.row.checked_sub(1).map(|row| Cell::new(row, cell.cell)),
        ArrowKey::Down => Some(Cell::new(cell.row + 1, cell.cell)),
        ArrowKey::Left => cell.cell.checked_sub(1).map(|col| Cell::new(cell.row, col)),
        ArrowKey::Right => Some(Cell::new(cell.row, cell.cell + 1)),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::{CellSelectionModel, SelectionModelOptions};
    use crate::event::{ArrowKey, EventControl, GridEvent, KeyPress};
    use crate::grid::{ColumnDefinition, Grid, ResultGrid, Row};
    use crate::range::{Cell, Range};

    fn grid() -> ResultGrid {
        let columns = vec![
            ColumnDefinition::row_header(),
            ColumnDefinition::data("a", 0),
            ColumnDefinition::data("b", 1),
            ColumnDefinition::data("c", 2),
        ];
        let rows = (0..5)
            .map(|index| {
                let mut row = Row::new();
                row.insert("a".to_string(), json!(index));
                row
            })
            .collect();
        ResultGrid::new(columns, rows)
    }

    fn attached(grid: &ResultGrid) -> CellSelectionModel {
        let mut model = CellSelectionModel::default();
        model.init(grid);
        model
    }

    fn press(
        model: &mut CellSelectionModel,
        grid: &mut ResultGrid,
        key: KeyPress,
    ) -> EventControl {
        let mut control = EventControl::default();
        model.handle_event(grid, &GridEvent::KeyDown(key), &mut control);
        control
    }

    #[test]
    fn set_ranges_filters_deduplicates_and_notifies_once() {
        let grid = grid();
        let mut model = attached(&grid);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        model.on_selection_changed(move |ranges| sink.borrow_mut().push(ranges.to_vec()));

        let row = Range::new(1, 1, 1, 3);
        let changed = model.set_selected_ranges(
            &grid,
            vec![row, Range::new(0, 0, 0, 2), row, Range::cell(9, 1)],
        );

        assert!(changed);
        assert_eq!(model.selected_ranges(), &[row]);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(model.revision(), 1);
    }

    #[test]
    fn unchanged_selection_is_silent() {
        let grid = grid();
        let mut model = attached(&grid);
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        model.on_selection_changed(move |_| *sink.borrow_mut() += 1);

        assert!(!model.set_selected_ranges(&grid, Vec::new()));
        assert!(model.set_selected_ranges(&grid, vec![Range::cell(2, 2)]));
        assert!(!model.set_selected_ranges(&grid, vec![Range::cell(2, 2)]));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let grid = grid();
        let mut model = attached(&grid);
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = model.on_selection_changed(move |_| *sink.borrow_mut() += 1);

        assert!(model.remove_listener(id));
        assert!(!model.remove_listener(id));
        model.set_selected_ranges(&grid, vec![Range::cell(0, 1)]);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn set_rows_builds_full_width_ranges() {
        let grid = grid();
        let mut model = attached(&grid);
        model.set_selected_rows(&grid, &[3, 1, 3]);
        assert_eq!(
            model.selected_ranges(),
            &[Range::new(3, 1, 3, 3), Range::new(1, 1, 1, 3)]
        );
        assert!(model.set_selected_rows(&grid, &[]));
        assert!(model.selected_ranges().is_empty());
    }

    #[test]
    fn active_cell_change_selects_that_cell_unless_disabled() {
        let mut grid = grid();
        let mut model = attached(&grid);
        let mut control = EventControl::default();
        let event = GridEvent::ActiveCellChanged(Some(Cell::new(2, 2)));

        model.handle_event(&mut grid, &event, &mut control);
        assert_eq!(model.selected_ranges(), &[Range::cell(2, 2)]);

        let mut passive = CellSelectionModel::new(SelectionModelOptions {
            select_active_cell: false,
        });
        passive.init(&grid);
        passive.handle_event(&mut grid, &event, &mut control);
        assert!(passive.selected_ranges().is_empty());
    }

    #[test]
    fn shift_arrows_grow_the_range_in_every_direction() {
        let mut grid = grid();
        let mut model = attached(&grid);

        grid.set_active_cell(2, 2);
        model.set_selected_ranges(&grid, vec![Range::cell(2, 2)]);
        let control = press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Down));
        assert!(control.is_default_prevented());
        assert!(control.is_propagation_stopped());
        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Right));
        assert_eq!(model.selected_ranges(), &[Range::new(2, 2, 3, 3)]);

        model.set_selected_ranges(&grid, vec![Range::cell(2, 2)]);
        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Up));
        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Left));
        assert_eq!(model.selected_ranges(), &[Range::new(1, 1, 2, 2)]);

        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Down));
        assert_eq!(model.selected_ranges(), &[Range::new(2, 1, 2, 2)]);
    }

    #[test]
    fn extension_into_unselectable_cells_keeps_last_range() {
        let mut grid = grid();
        let mut model = attached(&grid);
        grid.set_active_cell(2, 3);
        model.set_selected_ranges(&grid, vec![Range::cell(0, 1), Range::cell(2, 3)]);

        let control = press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Right));
        assert!(control.is_default_prevented());
        assert_eq!(
            model.selected_ranges(),
            &[Range::cell(0, 1), Range::cell(2, 3)]
        );

        grid.set_active_cell(4, 1);
        model.set_selected_ranges(&grid, vec![Range::cell(4, 1)]);
        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Down));
        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Left));
        assert_eq!(model.selected_ranges(), &[Range::cell(4, 1)]);
    }

    #[test]
    fn extension_restarts_when_active_cell_is_not_a_corner() {
        let mut grid = grid();
        let mut model = attached(&grid);
        model.set_selected_ranges(&grid, vec![Range::new(0, 1, 2, 3)]);
        grid.set_active_cell(1, 2);

        press(&mut model, &mut grid, KeyPress::shift_arrow(ArrowKey::Down));
        assert_eq!(model.selected_ranges(), &[Range::new(1, 2, 2, 2)]);
    }

    #[test]
    fn plain_arrows_are_left_to_the_grid() {
        let mut grid = grid();
        let mut model = attached(&grid);
        grid.set_active_cell(1, 1);
        let control = press(&mut model, &mut grid, KeyPress::arrow(ArrowKey::Down));
        assert!(!control.is_handled());
        assert!(model.selected_ranges().is_empty());
    }

    #[test]
    fn edit_lock_stops_range_selection() {
        let mut grid = grid();
        let mut model = attached(&grid);
        let mut control = EventControl::default();
        model.handle_event(&mut grid, &GridEvent::BeforeCellRangeSelected, &mut control);
        assert!(!control.is_propagation_stopped());

        grid.set_edit_locked(true);
        model.handle_event(&mut grid, &GridEvent::BeforeCellRangeSelected, &mut control);
        assert!(control.is_propagation_stopped());
    }

    #[test]
    fn detached_model_ignores_events() {
        let mut grid = grid();
        let mut model = attached(&grid);
        model.destroy();
        let mut control = EventControl::default();
        let range = Range::new(0, 1, 1, 2);
        model.handle_event(&mut grid, &GridEvent::CellRangeSelected(range), &mut control);
        assert!(model.selected_ranges().is_empty());
        assert!(!model.is_attached());
    }
}
