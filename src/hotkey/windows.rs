//! Win32 hotkey backend.
//!
//! A hidden message-only window receives `WM_HOTKEY` for the registered
//! slot; its thread runs the blocking `GetMessageW` pump. Registration calls
//! arrive over the command channel and are executed between messages: the
//! waker posts a private `WM_APP`-range message so a blocked pump notices
//! queued commands. Every other message falls through to `DefWindowProcW`
//! untouched.

use std::cell::RefCell;
use std::sync::mpsc;

use tracing::{debug, error, warn};
use windows::core::w;
use windows::Win32::Foundation::{
    GetLastError, ERROR_CLASS_ALREADY_EXISTS, ERROR_HOTKEY_ALREADY_REGISTERED, HWND, LPARAM,
    LRESULT, WPARAM,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, PostMessageW,
    PostQuitMessage, RegisterClassW, TranslateMessage, UnregisterClassW, HWND_MESSAGE, MSG,
    WINDOW_EX_STYLE, WM_APP, WM_HOTKEY, WNDCLASSW, WS_OVERLAPPED,
};

use super::backend::{HotkeyBackend, HotkeyError, PumpCommand, PumpWaker};
use super::dispatch::Dispatcher;
use super::event::{decode_payload, HOTKEY_NOTIFY};
use super::registrar::{HotkeyApi, HotkeyBinding, RegistrationError, SlotRegistrar};

// The ABI constant this crate carries must be the message the OS sends.
const _: () = assert!(HOTKEY_NOTIFY == WM_HOTKEY);

/// Private wake message for draining the command channel.
const WM_PUMP_WAKE: u32 = WM_APP + 1;

/// Win32 backend; all real state lives on the pump thread.
pub struct Win32Backend;

impl Win32Backend {
    pub fn new() -> Self {
        Self
    }
}

/// Raw registration calls against the hidden window.
struct Win32HotkeyApi {
    hwnd: HWND,
}

impl HotkeyApi for Win32HotkeyApi {
    fn register(&mut self, slot: i32, binding: HotkeyBinding) -> Result<(), RegistrationError> {
        let modifiers = HOT_KEY_MODIFIERS(binding.modifiers().bits() as u32);
        unsafe { RegisterHotKey(Some(self.hwnd), slot, modifiers, binding.key().raw() as u32) }
            .map_err(|e| {
                if e.code() == ERROR_HOTKEY_ALREADY_REGISTERED.to_hresult() {
                    RegistrationError::Conflict
                } else {
                    RegistrationError::Backend(e.message())
                }
            })
    }

    fn unregister(&mut self, slot: i32) -> Result<(), RegistrationError> {
        unsafe { UnregisterHotKey(Some(self.hwnd), slot) }
            .map_err(|e| RegistrationError::Backend(e.message()))
    }
}

/// Wakes the pump by posting to its window from any thread.
struct Win32Waker {
    hwnd: isize,
}

impl PumpWaker for Win32Waker {
    fn wake(&self) {
        let hwnd = HWND(self.hwnd as *mut _);
        unsafe {
            let _ = PostMessageW(Some(hwnd), WM_PUMP_WAKE, WPARAM(0), LPARAM(0));
        }
    }
}

/// Per-pump-thread state reachable from the window procedure.
struct PumpContext {
    commands: mpsc::Receiver<PumpCommand>,
    events: Dispatcher,
    registrar: SlotRegistrar<Win32HotkeyApi>,
}

thread_local! {
    static PUMP_CONTEXT: RefCell<Option<PumpContext>> = const { RefCell::new(None) };
}

impl HotkeyBackend for Win32Backend {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn run(
        self: Box<Self>,
        ready: mpsc::Sender<Result<Box<dyn PumpWaker>, HotkeyError>>,
        commands: mpsc::Receiver<PumpCommand>,
        events: Dispatcher,
    ) {
        unsafe {
            let instance = match GetModuleHandleW(None) {
                Ok(instance) => instance,
                Err(e) => {
                    let _ = ready.send(Err(HotkeyError::BackendInit(e.message())));
                    return;
                }
            };

            let class_name = w!("KeyholdHotkeyPump");
            let wc = WNDCLASSW {
                lpfnWndProc: Some(pump_wndproc),
                hInstance: instance.into(),
                lpszClassName: class_name,
                ..Default::default()
            };

            if RegisterClassW(&wc) == 0 {
                let err = GetLastError();
                if err != ERROR_CLASS_ALREADY_EXISTS {
                    let _ = ready.send(Err(HotkeyError::BackendInit(format!(
                        "failed to register window class (error {:?})",
                        err
                    ))));
                    return;
                }
                debug!("pump window class already registered, reusing");
            }

            // Message-only window: invisible, receives WM_HOTKEY and the
            // wake message, nothing else ever targets it.
            let hwnd = match CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                class_name,
                w!("keyhold hotkey pump"),
                WS_OVERLAPPED,
                0,
                0,
                0,
                0,
                Some(HWND_MESSAGE),
                None,
                Some(instance.into()),
                None,
            ) {
                Ok(hwnd) => hwnd,
                Err(e) => {
                    let _ = ready.send(Err(HotkeyError::BackendInit(e.message())));
                    return;
                }
            };

            PUMP_CONTEXT.with(|ctx| {
                *ctx.borrow_mut() = Some(PumpContext {
                    commands,
                    events,
                    registrar: SlotRegistrar::new(Win32HotkeyApi { hwnd }),
                });
            });

            if ready
                .send(Ok(Box::new(Win32Waker {
                    hwnd: hwnd.0 as isize,
                })))
                .is_err()
            {
                // The listener gave up waiting; unwind the receiver.
                PUMP_CONTEXT.with(|ctx| *ctx.borrow_mut() = None);
                let _ = DestroyWindow(hwnd);
                return;
            }

            debug!("hotkey pump ready");

            let mut msg = MSG::default();
            while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            // Release the slot before the window it is bound to goes away.
            PUMP_CONTEXT.with(|ctx| {
                if let Some(mut ctx) = ctx.borrow_mut().take() {
                    ctx.registrar.release();
                }
            });
            let _ = DestroyWindow(hwnd);
            let _ = UnregisterClassW(class_name, Some(instance.into()));

            debug!("hotkey pump exited");
        }
    }
}

unsafe extern "system" fn pump_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        HOTKEY_NOTIFY => {
            let event = decode_payload(lparam.0 as u32);
            debug!(?event, "hotkey fired");
            PUMP_CONTEXT.with(|ctx| {
                if let Some(ctx) = ctx.borrow().as_ref() {
                    ctx.events.deliver(event);
                }
            });
            LRESULT(0)
        }
        WM_PUMP_WAKE => {
            drain_commands();
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// Execute queued registrar commands on the pump thread.
fn drain_commands() {
    PUMP_CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        let Some(ctx) = ctx.as_mut() else {
            error!("pump wake without context");
            return;
        };

        while let Ok(command) = ctx.commands.try_recv() {
            match command {
                PumpCommand::Register {
                    key,
                    modifiers,
                    reply,
                } => {
                    let result = ctx.registrar.register(key, modifiers);
                    if let Err(e) = &result {
                        warn!(error = %e, "hotkey registration failed");
                    }
                    let _ = reply.send(result);
                }
                PumpCommand::Unregister { reply } => {
                    let _ = reply.send(ctx.registrar.unregister());
                }
                PumpCommand::Shutdown => unsafe {
                    PostQuitMessage(0);
                },
            }
        }
    });
}
