use crate::event::{ArrowKey, EventControl, GridEvent, KeyPress};
use crate::grid::Grid;
use crate::plugin::GridPlugin;
use crate::range::{Cell, Range};
use crate::selection_model::CellSelectionModel;

const MAX_SYNC_ROUNDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscriber {
    SelectionModel,
    Plugin(usize),
}

/// Owns a grid together with its selection model and plugins, routes input
/// to them and runs the grid's native default actions.
pub struct GridHost<G: Grid> {
    grid: G,
    selection: CellSelectionModel,
    plugins: Vec<Box<dyn GridPlugin>>,
    subscribers: Vec<Subscriber>,
    synced_revision: u64,
}

impl<G: Grid> std::fmt::Debug for GridHost<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|plugin| plugin.name()).collect();
        f.debug_struct("GridHost")
            .field("selection", &self.selection)
            .field("plugins", &plugins)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl<G: Grid> GridHost<G> {
    #[must_use]
    pub fn new(grid: G) -> Self {
        Self {
            grid,
            selection: CellSelectionModel::default(),
            plugins: Vec::new(),
            subscribers: Vec::new(),
            synced_revision: 0,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut G {
        &mut self.grid
    }

    #[must_use]
    pub fn selection(&self) -> &CellSelectionModel {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut CellSelectionModel {
        &mut self.selection
    }

    #[must_use]
    pub fn selected_ranges(&self) -> &[Range] {
        self.selection.selected_ranges()
    }

    pub fn set_selection_model(&mut self, model: CellSelectionModel) {
        self.selection.destroy();
        self.selection = model;
        self.selection.init(&self.grid);
        self.synced_revision = self.selection.revision();
        if !self.subscribers.contains(&Subscriber::SelectionModel) {
            self.subscribers.push(Subscriber::SelectionModel);
        }
    }

    pub fn register_plugin(&mut self, plugin: impl GridPlugin + 'static) {
        let mut plugin: Box<dyn GridPlugin> = Box::new(plugin);
        plugin.init(&mut self.grid, &mut self.selection);
        log::debug!("registered grid plugin {}", plugin.name());
        self.subscribers.push(Subscriber::Plugin(self.plugins.len()));
        self.plugins.push(plugin);
        self.sync_plugins();
    }

    #[must_use]
    pub fn plugin<T: GridPlugin + 'static>(&self) -> Option<&T> {
        self.plugins
            .iter()
            .find_map(|plugin| plugin.as_any().downcast_ref::<T>())
    }

    pub fn plugin_mut<T: GridPlugin + 'static>(&mut self) -> Option<&mut T> {
        self.plugins
            .iter_mut()
            .find_map(|plugin| plugin.as_any_mut().downcast_mut::<T>())
    }

    pub fn destroy(&mut self) {
        for plugin in &mut self.plugins {
            plugin.destroy();
        }
        self.plugins.clear();
        self.subscribers.clear();
        self.selection.destroy();
    }

    pub fn set_selected_ranges(&mut self, ranges: Vec<Range>) -> bool {
        let changed = self.selection.set_selected_ranges(&self.grid, ranges);
        self.sync_plugins();
        changed
    }

    pub fn set_selected_rows(&mut self, rows: &[usize]) -> bool {
        let changed = self.selection.set_selected_rows(&self.grid, rows);
        self.sync_plugins();
        changed
    }

    /// Re-runs every plugin's selection hook, e.g. after rows were appended.
    pub fn refresh_plugins(&mut self) {
        for plugin in &mut self.plugins {
            plugin.selection_changed(&self.grid, &mut self.selection);
        }
        self.synced_revision = self.selection.revision();
        self.sync_plugins();
    }

    pub fn dispatch(&mut self, event: GridEvent) -> EventControl {
        log::trace!("dispatching {event:?}");
        let mut control = EventControl::default();
        for subscriber in &self.subscribers {
            if control.is_propagation_stopped() {
                break;
            }
            match *subscriber {
                Subscriber::SelectionModel => {
                    self.selection.handle_event(&mut self.grid, &event, &mut control);
                }
                Subscriber::Plugin(plugin) => {
                    self.plugins[plugin].handle_event(
                        &mut self.grid,
                        &mut self.selection,
                        &event,
                        &mut control,
                    );
                }
            }
        }
        self.sync_plugins();
        control
    }

    fn sync_plugins(&mut self) {
        for _ in 0..MAX_SYNC_ROUNDS {
            if self.selection.revision() == self.synced_revision {
                return;
            }
            self.synced_revision = self.selection.revision();
            for plugin in &mut self.plugins {
                plugin.selection_changed(&self.grid, &mut self.selection);
            }
        }
        if self.selection.revision() != self.synced_revision {
            log::warn!("selection still changing after {MAX_SYNC_ROUNDS} plugin rounds");
        }
    }

    /// Mouse click on a cell. Unless a subscriber handled it, the cell
    /// becomes active.
    pub fn click(&mut self, row: usize, cell: usize) -> EventControl {
        let control = self.dispatch(GridEvent::Click { row, cell });
        if !control.is_handled()
            && self.grid.can_cell_be_active(row, cell)
            && self.grid.active_cell() != Some(Cell::new(row, cell))
        {
            self.activate(Cell::new(row, cell));
        }
        control
    }

    pub fn header_click(&mut self, column: usize) -> EventControl {
        self.dispatch(GridEvent::HeaderClick { column })
    }

    /// Key press. Unhandled plain arrows move the active cell.
    pub fn key_down(&mut self, key: KeyPress) -> EventControl {
        let control = self.dispatch(GridEvent::KeyDown(key));
        if !control.is_handled() {
            if let Some(arrow) = key.navigation() {
                self.navigate(arrow);
            }
        }
        control
    }

    /// Completed mouse drag from `start` to `end`. Returns whether the range
    /// was delivered to subscribers.
    pub fn drag_select(&mut self, start: Cell, end: Cell) -> bool {
        if self.dispatch(GridEvent::BeforeCellRangeSelected).is_handled() {
            log::debug!("range drag cancelled");
            return false;
        }
        let range = Range::spanning(start, end);
        self.dispatch(GridEvent::CellRangeSelected(range));
        self.dispatch(GridEvent::DragEnd { start, range });
        true
    }

    pub fn header_mouse_enter(&mut self) {
        self.dispatch(GridEvent::HeaderMouseEnter);
    }

    pub fn header_mouse_leave(&mut self) {
        self.dispatch(GridEvent::HeaderMouseLeave);
    }

    pub fn columns_resized(&mut self) {
        self.dispatch(GridEvent::ColumnsResized);
    }

    fn activate(&mut self, cell: Cell) {
        self.grid.set_active_cell(cell.row, cell.cell);
        self.grid.scroll_row_into_view(cell.row);
        self.grid.scroll_column_into_view(cell.cell);
        self.dispatch(GridEvent::ActiveCellChanged(Some(cell)));
    }

    fn navigate(&mut self, arrow: ArrowKey) {
        let target = match self.grid.active_cell() {
            Some(active) => self.next_active(active, arrow),
            None => self.first_active(),
        };
        if let Some(target) = target {
            self.activate(target);
        }
    }

    fn first_active(&self) -> Option<Cell> {
        (0..self.grid.columns().len())
            .find(|cell| self.grid.can_cell_be_active(0, *cell))
            .map(|cell| Cell::new(0, cell))
    }

    fn next_active(&self, from: Cell, arrow: ArrowKey) -> Option<Cell> {
        let rows = self.grid.row_count();
        let cells = self.grid.columns().len();
        let mut current = from;
        loop {
            current = match arrow {
                ArrowKey::Up => Cell::new(current.row.checked_sub(1)?, current.cell),
                ArrowKey::Down if current.row + 1 < rows => {
                    Cell::new(current.row + 1, current.cell)
                }
                ArrowKey::Left => Cell::new(current.row, current.cell.checked_sub(1)?),
                ArrowKey::Right if current.cell + 1 < cells => {
                    Cell::new(current.row, current.cell + 1)
                }
                ArrowKey::Down | ArrowKey::Right => return None,
            };
            if self.grid.can_cell_be_active(current.row, current.cell) {
                return Some(current);
            }
        }
    }
}
