//! macOS hotkey backend using a CGEventTap.
//!
//! macOS has no global hotkey slot to claim, so "registration" arms a filter:
//! a listen-only key-down tap on a dedicated CFRunLoop compares each event
//! against the armed binding and forwards matches. Requires the Accessibility
//! permission, like any event tap.

use std::sync::mpsc;
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType, EventField,
};
use tracing::{debug, warn};

use super::backend::{HotkeyBackend, HotkeyError, PumpCommand, PumpWaker};
use super::dispatch::Dispatcher;
use super::event::HotkeyEvent;
use super::registrar::{HotkeyApi, HotkeyBinding, RegistrationError, SlotRegistrar};
use crate::keys::macos::{mac_keycode, modifiers_from_flags};

/// How long each run-loop turn may block before command channels are polled.
const LOOP_INTERVAL: Duration = Duration::from_millis(50);

pub struct MacBackend;

impl MacBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Tap-side slot bookkeeping. There is no OS registration call to make;
/// conflicts with other applications cannot occur. Keys with no macOS
/// keycode are rejected here so arming an unmatchable filter fails loudly.
struct MacHotkeyApi;

impl HotkeyApi for MacHotkeyApi {
    fn register(&mut self, _slot: i32, binding: HotkeyBinding) -> Result<(), RegistrationError> {
        if mac_keycode(binding.key()).is_none() {
            return Err(RegistrationError::Backend(format!(
                "key {} has no macOS keycode",
                binding.key()
            )));
        }
        Ok(())
    }

    fn unregister(&mut self, _slot: i32) -> Result<(), RegistrationError> {
        Ok(())
    }
}

/// The pump polls its channels every run-loop turn, so a queued command is
/// picked up without an explicit nudge.
struct NoopWaker;

impl PumpWaker for NoopWaker {
    fn wake(&self) {}
}

impl HotkeyBackend for MacBackend {
    fn name(&self) -> &'static str {
        "cgeventtap"
    }

    fn run(
        self: Box<Self>,
        ready: mpsc::Sender<Result<Box<dyn PumpWaker>, HotkeyError>>,
        commands: mpsc::Receiver<PumpCommand>,
        events: Dispatcher,
    ) {
        // Channel from the tap callback into the loop body; the callback
        // must stay fast and non-blocking.
        let (tap_tx, tap_rx) = mpsc::channel::<(i64, CGEventFlags)>();

        let callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                             event_type: CGEventType,
                             event: &CGEvent|
              -> Option<CGEvent> {
            if let CGEventType::KeyDown = event_type {
                // Skip autorepeat so one physical press is one activation.
                if event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT) == 0 {
                    let keycode =
                        event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
                    let _ = tap_tx.send((keycode, event.get_flags()));
                }
            }
            Some(event.clone())
        };

        let tap = match CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            vec![CGEventType::KeyDown],
            callback,
        ) {
            Ok(tap) => tap,
            Err(_) => {
                let _ = ready.send(Err(HotkeyError::BackendInit(
                    "failed to create event tap - check Accessibility permissions".into(),
                )));
                return;
            }
        };

        tap.enable();

        let run_loop_source = match tap.mach_port.create_runloop_source(0) {
            Ok(source) => source,
            Err(_) => {
                let _ = ready.send(Err(HotkeyError::BackendInit(
                    "failed to create run loop source".into(),
                )));
                return;
            }
        };
        let run_loop = CFRunLoop::get_current();
        unsafe {
            run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
        }

        if ready.send(Ok(Box::new(NoopWaker))).is_err() {
            return;
        }

        debug!("event tap created and enabled");

        let mut registrar = SlotRegistrar::new(MacHotkeyApi);

        'pump: loop {
            unsafe {
                CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, LOOP_INTERVAL, true);
            }

            while let Ok(command) = commands.try_recv() {
                match command {
                    PumpCommand::Register {
                        key,
                        modifiers,
                        reply,
                    } => {
                        let result = registrar.register(key, modifiers);
                        if let Err(e) = &result {
                            warn!(error = %e, "hotkey registration failed");
                        }
                        let _ = reply.send(result);
                    }
                    PumpCommand::Unregister { reply } => {
                        let _ = reply.send(registrar.unregister());
                    }
                    PumpCommand::Shutdown => break 'pump,
                }
            }

            while let Ok((keycode, flags)) = tap_rx.try_recv() {
                let Some(binding) = registrar.current() else {
                    continue;
                };
                let modifiers = modifiers_from_flags(flags);
                if modifiers == binding.modifiers()
                    && mac_keycode(binding.key()) == Some(keycode as u16)
                {
                    events.deliver(HotkeyEvent {
                        modifiers,
                        key: binding.key(),
                    });
                }
            }
        }

        registrar.release();
        debug!("event tap pump exited");
    }
}
