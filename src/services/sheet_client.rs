// ============================================================================
// SYSTEM-OF-RECORD CLIENT - Google Apps Script endpoint (stateless)
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SyncError;
use crate::models::{PendingWrite, SheetPayload};

/// The authoritative, spreadsheet-backed data source
#[async_trait(?Send)]
pub trait RecordSource {
    /// `GET ?action=getData`
    async fn fetch_data(&self) -> Result<SheetPayload, SyncError>;

    /// Sends one write; `Err(SyncError::Rejected)` when the script refused it
    async fn send_write(&self, write: &PendingWrite) -> Result<Value, SyncError>;
}

/// Read URL with the cache-busting timestamp
pub fn get_data_url(base_url: &str, now_ms: i64) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}action=getData&t={}", base_url, separator, now_ms)
}

#[cfg(target_arch = "wasm32")]
pub use http::SheetClient;

#[cfg(target_arch = "wasm32")]
mod http {
    use std::rc::Rc;

    use async_trait::async_trait;
    use gloo_net::http::{Request, Response};
    use serde_json::Value;

    use super::{get_data_url, RecordSource};
    use crate::errors::SyncError;
    use crate::models::{parse_sheet_response, parse_write_response, PendingWrite, SheetPayload};
    use crate::utils::clock::Clock;

    /// Apps Script client over `fetch`
    #[derive(Clone)]
    pub struct SheetClient {
        base_url: String,
        clock: Rc<dyn Clock>,
    }

    impl SheetClient {
        pub fn new(base_url: &str, clock: Rc<dyn Clock>) -> Self {
            Self {
                base_url: base_url.to_string(),
                clock,
            }
        }

        async fn read_json(response: Response) -> Result<Value, SyncError> {
            if !response.ok() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SyncError::Http { status, body });
            }
            response
                .json::<Value>()
                .await
                .map_err(|e| SyncError::Parse(e.to_string()))
        }
    }

    #[async_trait(?Send)]
    impl RecordSource for SheetClient {
        async fn fetch_data(&self) -> Result<SheetPayload, SyncError> {
            let url = get_data_url(&self.base_url, self.clock.now_ms());
            log::info!("📥 Fetching data from Google Sheet");

            let response = Request::get(&url)
                .send()
                .await
                .map_err(|e| SyncError::Network(e.to_string()))?;
            let result = Self::read_json(response).await?;
            Ok(parse_sheet_response(result))
        }

        async fn send_write(&self, write: &PendingWrite) -> Result<Value, SyncError> {
            let body = serde_json::to_string(&write.to_request_body())
                .map_err(|e| SyncError::Parse(e.to_string()))?;
            log::info!("📤 Sending '{}' to Google Sheet", write.kind.as_str());

            // text/plain keeps Apps Script out of a CORS preflight
            let response = Request::post(&self.base_url)
                .header("Content-Type", "text/plain;charset=utf-8")
                .body(body)
                .map_err(|e| SyncError::Network(format!("Request build error: {}", e)))?
                .send()
                .await
                .map_err(|e| SyncError::Network(e.to_string()))?;
            let result = Self::read_json(response).await?;
            parse_write_response(result)
        }
    }
}
