//! Semantic key and modifier model.
//!
//! Pure value types shared by the hotkey subsystem and the key injector,
//! independent of any OS encoding.

mod code;
mod modifiers;

#[cfg(target_os = "macos")]
pub(crate) mod macos;

pub use code::KeyCode;
pub use modifiers::ModifierSet;
