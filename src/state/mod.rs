//! Hold state management.
//!
//! The controller is the single subscriber of the hotkey dispatcher: each
//! activation toggles between idle and holding, pairing the key-down and
//! key-up posts the injector fires at the chosen target window.

mod machine;

pub use machine::{ControlCommand, HoldController};
