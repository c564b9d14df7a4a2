use std::any::Any;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::event::{EventControl, GridEvent};
use crate::grid::{Grid, Row};
use crate::plugin::GridPlugin;
use crate::range_helper::{are_all_ranges_complete_rows, get_indexes_of_complete_rows};
use crate::selection_model::CellSelectionModel;

pub const DEFAULT_CLIENT_PRIMARY_KEY: &str = "__temp_PK";

/// Prefix of client keys derived from the row index.
pub const INDEX_KEY_PREFIX: &str = "idx:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolbarState {
    pub copy_enabled: bool,
    pub delete_enabled: bool,
}

/// Tracks whole rows that can be identified by primary key for bulk copy
/// and delete.
#[derive(Debug, Clone)]
pub struct StagedRowsTracker {
    primary_keys: Vec<String>,
    client_primary_key: String,
    editable: bool,
    staged: BTreeMap<String, Row>,
    toolbar: ToolbarState,
}

impl StagedRowsTracker {
    #[must_use]
    pub fn new(primary_keys: Vec<String>) -> Self {
        Self {
            primary_keys,
            client_primary_key: DEFAULT_CLIENT_PRIMARY_KEY.to_string(),
            editable: false,
            staged: BTreeMap::new(),
            toolbar: ToolbarState::default(),
        }
    }

    #[must_use]
    pub fn with_client_primary_key(mut self, column: impl Into<String>) -> Self {
        self.client_primary_key = column.into();
        self
    }

    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        self.toolbar.delete_enabled = editable && !self.staged.is_empty();
    }

    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    #[must_use]
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Staged rows keyed by client row key, holding only primary-key fields.
    #[must_use]
    pub fn staged_rows(&self) -> &BTreeMap<String, Row> {
        &self.staged
    }

    #[must_use]
    pub fn toolbar(&self) -> ToolbarState {
        self.toolbar
    }

    /// Client key of row `index`: its value in the client key column, or
    /// `idx:<index>` when the column is absent.
    #[must_use]
    pub fn client_key(&self, index: usize, row: &Row) -> String {
        match row.get(&self.client_primary_key) {
            Some(Value::String(key)) => key.clone(),
            Some(Value::Null) | None => format!("{INDEX_KEY_PREFIX}{index}"),
            Some(other) => other.to_string(),
        }
    }

    pub fn recompute(&mut self, grid: &dyn Grid, selection: &mut CellSelectionModel) {
        let ranges = selection.selected_ranges();
        let any_selected = !ranges.is_empty();

        if !are_all_ranges_complete_rows(grid, ranges) {
            self.staged.clear();
            self.toolbar = ToolbarState {
                copy_enabled: any_selected,
                delete_enabled: false,
            };
            return;
        }

        let mut staged = BTreeMap::new();
        for index in get_indexes_of_complete_rows(grid, ranges) {
            let Some(row) = grid.item(index) else {
                continue;
            };
            let Some(keys) = self.primary_key_subset(row) else {
                log::debug!("row {index} lacks a primary key column; not staged");
                continue;
            };
            staged.insert(self.client_key(index, row), keys);
        }
        self.staged = staged;

        if self.staged.is_empty() {
            selection.set_selected_rows(grid, &[]);
        }

        self.toolbar = ToolbarState {
            copy_enabled: !selection.selected_ranges().is_empty(),
            delete_enabled: !self.staged.is_empty() && self.editable,
        };
        log::debug!(
            "{} staged row(s), delete {}",
            self.staged.len(),
            if self.toolbar.delete_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
    }

    fn primary_key_subset(&self, row: &Row) -> Option<Row> {
        self.primary_keys
            .iter()
            .map(|key| row.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }
}

impl Default for StagedRowsTracker {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GridPlugin for StagedRowsTracker {
    fn name(&self) -> &'static str {
        "staged_rows"
    }

    fn handle_event(
        &mut self,
        _grid: &mut dyn Grid,
        _selection: &mut CellSelectionModel,
        _event: &GridEvent,
        _control: &mut EventControl,
    ) {
    }

    fn selection_changed(&mut self, grid: &dyn Grid, selection: &mut CellSelectionModel) {
        self.recompute(grid, selection);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
