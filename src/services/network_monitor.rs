// ============================================================================
// NETWORK MONITOR
// ============================================================================
// Listens for the browser `online` event so queued writes go out as soon as
// the connection is back instead of waiting for the next drain tick.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Event};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NetworkStatus {
    Online,
    Offline,
    Unknown,
}

pub struct NetworkMonitor {
    status: Rc<Cell<NetworkStatus>>,
    listening: Cell<bool>,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        let initial = window()
            .map(|w| {
                if w.navigator().on_line() {
                    NetworkStatus::Online
                } else {
                    NetworkStatus::Offline
                }
            })
            .unwrap_or(NetworkStatus::Unknown);
        Self {
            status: Rc::new(Cell::new(initial)),
            listening: Cell::new(false),
        }
    }

    pub fn current_status(&self) -> NetworkStatus {
        self.status.get()
    }

    pub fn is_online(&self) -> bool {
        !matches!(self.current_status(), NetworkStatus::Offline)
    }

    /// Registers the online/offline listeners once; later calls are ignored
    pub fn start<F>(&self, on_online: F) -> Result<(), JsValue>
    where
        F: Fn() + 'static,
    {
        if self.listening.replace(true) {
            log::warn!("⚠️ NetworkMonitor already listening, ignoring duplicate start");
            return Ok(());
        }
        let window = window().ok_or_else(|| JsValue::from_str("no window"))?;

        let online_closure = Closure::wrap(Box::new({
            let status = self.status.clone();
            move |_event: Event| {
                log::info!("🌐 Network: ONLINE");
                status.set(NetworkStatus::Online);
                on_online();
            }
        }) as Box<dyn FnMut(Event)>);

        let offline_closure = Closure::wrap(Box::new({
            let status = self.status.clone();
            move |_event: Event| {
                log::warn!("📴 Network: OFFLINE");
                status.set(NetworkStatus::Offline);
            }
        }) as Box<dyn FnMut(Event)>);

        window.add_event_listener_with_callback("online", online_closure.as_ref().unchecked_ref())?;
        window.add_event_listener_with_callback("offline", offline_closure.as_ref().unchecked_ref())?;

        // Window listeners live as long as the page
        online_closure.forget();
        offline_closure.forget();
        Ok(())
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}
