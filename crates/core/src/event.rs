use crate::range::{Cell, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Arrow(ArrowKey),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    #[must_use]
    pub const fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    #[must_use]
    pub const fn arrow(arrow: ArrowKey) -> Self {
        Self::new(Key::Arrow(arrow), Modifiers::NONE)
    }

    #[must_use]
    pub const fn shift_arrow(arrow: ArrowKey) -> Self {
        Self::new(Key::Arrow(arrow), Modifiers::SHIFT)
    }

    /// The arrow of a Shift+Arrow chord pressed without Ctrl, Alt or Meta.
    #[must_use]
    pub fn range_extension(&self) -> Option<ArrowKey> {
        let Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        } = self.modifiers;
        match self.key {
            Key::Arrow(arrow) if shift && !ctrl && !alt && !meta => Some(arrow),
            _ => None,
        }
    }

    /// The arrow of an unmodified arrow key.
    #[must_use]
    pub fn navigation(&self) -> Option<ArrowKey> {
        match self.key {
            Key::Arrow(arrow) if self.modifiers.is_empty() => Some(arrow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    ActiveCellChanged(Option<Cell>),
    KeyDown(KeyPress),
    Click { row: usize, cell: usize },
    HeaderClick { column: usize },
    HeaderMouseEnter,
    HeaderMouseLeave,
    ColumnsResized,
    BeforeCellRangeSelected,
    CellRangeSelected(Range),
    DragEnd { start: Cell, range: Range },
}

/// Per-dispatch flags set by subscribers.
///
/// A stopped event reaches no further subscribers; both flags suppress the
/// host's native default action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventControl {
    default_prevented: bool,
    propagation_stopped: bool,
}

impl EventControl {
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.default_prevented || self.propagation_stopped
    }
}
