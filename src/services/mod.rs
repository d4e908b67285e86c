pub mod cache_service;
pub mod fallback_policy;
pub mod firestore_cache;
#[cfg(target_arch = "wasm32")]
pub mod network_monitor;
pub mod offline_service;
pub mod scheduler;
pub mod sheet_client;
pub mod status_reporter;
pub mod sync_service;
pub mod write_queue;

pub use cache_service::{CacheBackend, CacheStatus, NoCache};
pub use fallback_policy::FallbackPolicy;
pub use offline_service::OfflineService;
pub use scheduler::{LocalTask, Scheduler, TaskKind};
pub use sheet_client::RecordSource;
pub use status_reporter::StatusReporter;
pub use sync_service::{SyncBackends, SyncController};
pub use write_queue::WriteQueue;

#[cfg(target_arch = "wasm32")]
pub use firestore_cache::FirestoreCache;
#[cfg(target_arch = "wasm32")]
pub use scheduler::BrowserScheduler;
#[cfg(target_arch = "wasm32")]
pub use sheet_client::SheetClient;
#[cfg(target_arch = "wasm32")]
pub use status_reporter::DomStatusReporter;
