//! tracescope terminal player
//!
//! Projects reconstructed state into view models and draws them with
//! ratatui: numbered source with the current line, call tree, frame locals
//! and program output.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod input;
pub mod layout;
pub mod presentation;
pub mod ui;
pub mod view;

pub use input::{InputError, InputEvent, InputHandler, KeyBinding, KeyCombo};
pub use layout::{Layout, LayoutConfig, PlayerLayout};
pub use presentation::{
    fmt_value, frame_order, FrameSelection, FrameTab, LocalRow, LocalsTable, PlayerView,
    SourceLine, StatusLine, TreeRow,
};
pub use ui::{ColorScheme, TuiApp, TuiConfig, TuiError};
pub use view::{CallTreeView, LocalsView, SourceView, StatusView, StdoutView, Theme, View};
