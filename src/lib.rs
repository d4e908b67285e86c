// ============================================================================
// CLASSROOM PWA - SYNC CORE (RUST + WASM)
// ============================================================================
// - Services: Google Sheet client, Firestore cache, local backup, write queue
// - State: current snapshot + sync status with Rc<RefCell>
// - Models: data snapshot, sync outcomes, pending writes
// The sync logic builds natively so it can be tested without a browser;
// the browser adapters live behind `target_arch = "wasm32"`.
// ============================================================================

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(target_arch = "wasm32")]
mod app;

#[cfg(target_arch = "wasm32")]
pub use wasm_api::*;

#[cfg(target_arch = "wasm32")]
mod wasm_api {
    use std::cell::RefCell;

    use wasm_bindgen::prelude::*;
    use wasm_logger::Config;

    use crate::app::App;
    use crate::config::CONFIG;
    use crate::models::SubmitOutcome;
    use crate::services::SyncController;

    // Single App instance for the page
    thread_local! {
        static APP: RefCell<Option<App>> = RefCell::new(None);
    }

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();

        let level = if CONFIG.is_logging_enabled() {
            log::Level::Debug
        } else {
            log::Level::Warn
        };
        wasm_logger::init(Config::new(level));
        log::info!("🚀 Classroom PWA sync core");

        let mut app = App::new();
        app.start()?;

        APP.with(|cell| {
            *cell.borrow_mut() = Some(app);
        });
        Ok(())
    }

    /// Clones the controller out so no borrow is held across an await
    fn controller() -> Result<SyncController, JsValue> {
        APP.with(|cell| {
            cell.borrow()
                .as_ref()
                .map(|app| app.controller().clone())
                .ok_or_else(|| JsValue::from_str("App not initialized"))
        })
    }

    fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
        serde_json::to_string(value)
            .map(|json| JsValue::from_str(&json))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Manual read-sync; resolves to the outcome name
    #[wasm_bindgen]
    pub async fn sync_data() -> Result<JsValue, JsValue> {
        let outcome = controller()?.sync().await;
        Ok(JsValue::from_str(&format!("{:?}", outcome)))
    }

    /// Login resolves to the server answer (JSON text); other actions
    /// resolve to `null` once queued
    #[wasm_bindgen]
    pub async fn submit_write(action: String, payload_json: String) -> Result<JsValue, JsValue> {
        let payload: serde_json::Value = serde_json::from_str(&payload_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid payload: {}", e)))?;
        match controller()?.submit(action, payload).await {
            Ok(SubmitOutcome::Sent(answer)) => to_js(&answer),
            Ok(SubmitOutcome::Queued { .. }) => Ok(JsValue::NULL),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    #[wasm_bindgen]
    pub async fn force_refresh_cache() -> Result<JsValue, JsValue> {
        controller()?
            .force_refresh_cache()
            .await
            .map(|outcome| JsValue::from_str(&format!("{:?}", outcome)))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// RFC 3339 time of the last cache write-back, or `null`
    #[wasm_bindgen]
    pub async fn cache_last_updated() -> Result<JsValue, JsValue> {
        match controller()?.cache_status().await {
            Ok(Some(status)) => Ok(JsValue::from_str(&status.updated_at)),
            Ok(None) => Ok(JsValue::NULL),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Logout hook
    #[wasm_bindgen]
    pub fn clear_local_backup() -> Result<(), JsValue> {
        controller()?
            .clear_local_backup()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn current_data_json() -> Result<JsValue, JsValue> {
        let data = controller()?.data();
        to_js(&*data)
    }

    #[wasm_bindgen]
    pub fn find_student(code_or_id: String) -> Result<JsValue, JsValue> {
        let data = controller()?.data();
        match data.find_student(&code_or_id) {
            Some(student) => to_js(student),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen]
    pub fn pending_writes() -> Result<usize, JsValue> {
        Ok(controller()?.pending_writes())
    }
}
