//! Ownership of the single global hotkey slot.
//!
//! The registrar mediates every OS registration call: preconditions are
//! rejected before the OS is touched, a prior binding is always released
//! before a new one is requested, and unregistering an empty slot is a no-op.

use tracing::{debug, warn};

use crate::keys::{KeyCode, ModifierSet};

/// The one slot id this process ever registers.
pub const HOTKEY_SLOT: i32 = 1;

/// A confirmed key/modifier combination for the slot.
///
/// Constructible only with a non-empty modifier set and a real key, so a
/// binding that exists is always registrable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    key: KeyCode,
    modifiers: ModifierSet,
}

impl HotkeyBinding {
    pub fn new(key: KeyCode, modifiers: ModifierSet) -> Result<Self, RegistrationError> {
        if key.is_none() || modifiers.is_empty() {
            return Err(RegistrationError::InvalidCombination);
        }
        Ok(Self { key, modifiers })
    }

    pub fn key(&self) -> KeyCode {
        self.key
    }

    pub fn modifiers(&self) -> ModifierSet {
        self.modifiers
    }
}

impl std::fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.modifiers, self.key)
    }
}

/// Errors from registering or releasing the hotkey slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("hotkey combination is already claimed by another application")]
    Conflict,

    #[error("hotkey requires at least one modifier and a key other than None")]
    InvalidCombination,

    #[error("hotkey listener is not armed")]
    NotArmed,

    #[error("hotkey listener has been disposed")]
    Disposed,

    #[error("hotkey backend error: {0}")]
    Backend(String),
}

impl RegistrationError {
    /// Stable machine-readable code for the IPC surface.
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::Conflict => "conflict",
            RegistrationError::InvalidCombination => "invalid_combination",
            RegistrationError::NotArmed => "not_armed",
            RegistrationError::Disposed => "disposed",
            RegistrationError::Backend(_) => "backend",
        }
    }
}

/// Raw OS registration capability, implemented per platform and stubbed in
/// tests.
pub trait HotkeyApi {
    fn register(&mut self, slot: i32, binding: HotkeyBinding) -> Result<(), RegistrationError>;
    fn unregister(&mut self, slot: i32) -> Result<(), RegistrationError>;
}

/// Single-slot registrar state, owned by the pump thread.
pub struct SlotRegistrar<A> {
    api: A,
    current: Option<HotkeyBinding>,
}

impl<A: HotkeyApi> SlotRegistrar<A> {
    pub fn new(api: A) -> Self {
        Self { api, current: None }
    }

    pub fn current(&self) -> Option<HotkeyBinding> {
        self.current
    }

    /// Register a combination, replacing any prior one.
    ///
    /// Invalid combinations are rejected before any OS call. The prior
    /// registration is released first; release failure is logged and the new
    /// registration is still attempted, so a stale slot cannot wedge the
    /// registrar.
    pub fn register(
        &mut self,
        key: KeyCode,
        modifiers: ModifierSet,
    ) -> Result<(), RegistrationError> {
        let binding = HotkeyBinding::new(key, modifiers)?;

        if let Some(old) = self.current.take() {
            if let Err(e) = self.api.unregister(HOTKEY_SLOT) {
                warn!(binding = %old, error = %e, "failed to release prior hotkey");
            }
        }

        self.api.register(HOTKEY_SLOT, binding)?;
        self.current = Some(binding);
        debug!(binding = %binding, "hotkey registered");
        Ok(())
    }

    /// Release the slot. A no-op when nothing is registered.
    ///
    /// The local slot state is cleared even when the OS call fails, so a
    /// subsequent register starts from a clean slate; the failure is still
    /// surfaced to the caller.
    pub fn unregister(&mut self) -> Result<(), RegistrationError> {
        if self.current.take().is_none() {
            return Ok(());
        }
        self.api.unregister(HOTKEY_SLOT)
    }

    /// Best-effort release during teardown. Failure is logged, never
    /// escalated.
    pub fn release(&mut self) {
        if let Err(e) = self.unregister() {
            warn!(error = %e, "failed to release hotkey during teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::mock::{ApiCall, RecordingApi};

    fn registrar() -> (SlotRegistrar<RecordingApi>, crate::hotkey::mock::ApiLog) {
        let (api, log) = RecordingApi::new();
        (SlotRegistrar::new(api), log)
    }

    #[test]
    fn test_invalid_combination_makes_no_os_call() {
        let (mut reg, log) = registrar();

        assert_eq!(
            reg.register(KeyCode::NONE, ModifierSet::CONTROL),
            Err(RegistrationError::InvalidCombination)
        );
        assert_eq!(
            reg.register(KeyCode::F1, ModifierSet::NONE),
            Err(RegistrationError::InvalidCombination)
        );
        assert!(log.calls().is_empty());
        assert_eq!(reg.current(), None);
    }

    #[test]
    fn test_register_unregister_register_cycles_cleanly() {
        let (mut reg, log) = registrar();

        reg.register(KeyCode::F1, ModifierSet::CONTROL).unwrap();
        reg.unregister().unwrap();
        reg.register(KeyCode::F2, ModifierSet::ALT | ModifierSet::SHIFT)
            .unwrap();

        let calls = log.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], ApiCall::Register { slot: HOTKEY_SLOT, .. }));
        assert!(matches!(calls[1], ApiCall::Unregister { slot: HOTKEY_SLOT }));
        assert!(matches!(calls[2], ApiCall::Register { slot: HOTKEY_SLOT, .. }));
        assert_eq!(
            reg.current().map(|b| b.key()),
            Some(KeyCode::F2)
        );
    }

    #[test]
    fn test_replace_unregisters_before_second_register() {
        let (mut reg, log) = registrar();

        reg.register(KeyCode::F1, ModifierSet::CONTROL).unwrap();
        reg.register(KeyCode::F2, ModifierSet::CONTROL).unwrap();

        let calls = log.calls();
        assert_eq!(
            calls,
            vec![
                ApiCall::Register {
                    slot: HOTKEY_SLOT,
                    binding: HotkeyBinding::new(KeyCode::F1, ModifierSet::CONTROL).unwrap(),
                },
                ApiCall::Unregister { slot: HOTKEY_SLOT },
                ApiCall::Register {
                    slot: HOTKEY_SLOT,
                    binding: HotkeyBinding::new(KeyCode::F2, ModifierSet::CONTROL).unwrap(),
                },
            ]
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let (mut reg, log) = registrar();

        assert_eq!(reg.unregister(), Ok(()));
        assert_eq!(reg.unregister(), Ok(()));
        assert!(log.calls().is_empty());

        reg.register(KeyCode::F1, ModifierSet::CONTROL).unwrap();
        assert_eq!(reg.unregister(), Ok(()));
        assert_eq!(reg.unregister(), Ok(()));
        assert_eq!(log.calls().len(), 2);
    }

    #[test]
    fn test_conflict_is_surfaced_and_slot_stays_empty() {
        let (mut reg, log) = registrar();
        log.fail_next_register();

        assert_eq!(
            reg.register(KeyCode::F1, ModifierSet::CONTROL),
            Err(RegistrationError::Conflict)
        );
        assert_eq!(reg.current(), None);

        // A retry after the conflict clears is a plain registration.
        reg.register(KeyCode::F1, ModifierSet::CONTROL).unwrap();
        assert!(reg.current().is_some());
    }

    #[test]
    fn test_binding_requires_modifier_and_key() {
        assert!(HotkeyBinding::new(KeyCode::F1, ModifierSet::CONTROL).is_ok());
        assert_eq!(
            HotkeyBinding::new(KeyCode::NONE, ModifierSet::CONTROL),
            Err(RegistrationError::InvalidCombination)
        );
        assert_eq!(
            HotkeyBinding::new(KeyCode::F1, ModifierSet::NONE),
            Err(RegistrationError::InvalidCombination)
        );
    }

    #[test]
    fn test_binding_display() {
        let binding =
            HotkeyBinding::new(KeyCode::F1, ModifierSet::CONTROL | ModifierSet::SHIFT).unwrap();
        assert_eq!(binding.to_string(), "Control+Shift+F1");
    }
}
