use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CacheError;
use crate::models::DataState;

/// Content of the `last_sync` status document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    /// RFC 3339 time of the last write-back
    pub updated_at: String,
}

/// Remote Cache Backend: bulk load/save of the whole snapshot
#[async_trait(?Send)]
pub trait CacheBackend {
    /// `false` when the backend was never configured or failed to start;
    /// an unavailable cache is skipped without counting as an error
    fn is_available(&self) -> bool;

    /// `Ok(None)` when nothing has been cached yet
    async fn load_all_data(&self) -> Result<Option<DataState>, CacheError>;

    async fn save_all_data(&self, data: &DataState) -> Result<(), CacheError>;

    async fn clear_cache(&self) -> Result<(), CacheError>;

    async fn cache_status(&self) -> Result<Option<CacheStatus>, CacheError> {
        Ok(None)
    }
}

/// Stand-in when no cache project is configured
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

#[async_trait(?Send)]
impl CacheBackend for NoCache {
    fn is_available(&self) -> bool {
        false
    }

    async fn load_all_data(&self) -> Result<Option<DataState>, CacheError> {
        Err(CacheError::Unavailable)
    }

    async fn save_all_data(&self, _data: &DataState) -> Result<(), CacheError> {
        Err(CacheError::Unavailable)
    }

    async fn clear_cache(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
