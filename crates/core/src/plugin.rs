use std::any::Any;

use crate::event::{EventControl, GridEvent};
use crate::grid::Grid;
use crate::selection_model::CellSelectionModel;

/// A grid extension driven by the host.
///
/// Plugins see every dispatched event in registration order and are told
/// about selection changes once the dispatch that caused them is over.
pub trait GridPlugin {
    fn name(&self) -> &'static str;

    fn init(&mut self, _grid: &mut dyn Grid, _selection: &mut CellSelectionModel) {}

    fn destroy(&mut self) {}

    fn handle_event(
        &mut self,
        grid: &mut dyn Grid,
        selection: &mut CellSelectionModel,
        event: &GridEvent,
        control: &mut EventControl,
    );

    fn selection_changed(&mut self, _grid: &dyn Grid, _selection: &mut CellSelectionModel) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
