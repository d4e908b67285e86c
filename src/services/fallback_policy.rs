// ============================================================================
// FALLBACK / QUOTA POLICY
// ============================================================================
// Decides whether the Firestore cache is consulted at all. Once fallback
// mode is entered only a verified System-of-Record sync leaves it.
// ============================================================================

use std::cell::Cell;

use crate::errors::CacheError;

#[derive(Debug)]
pub struct FallbackPolicy {
    error_threshold: u32,
    consecutive_errors: Cell<u32>,
    fallback_mode: Cell<bool>,
}

impl FallbackPolicy {
    pub fn new(error_threshold: u32) -> Self {
        Self {
            error_threshold: error_threshold.max(1),
            consecutive_errors: Cell::new(0),
            fallback_mode: Cell::new(false),
        }
    }

    pub fn should_use_cache(&self) -> bool {
        !self.fallback_mode.get()
    }

    pub fn is_fallback_mode(&self) -> bool {
        self.fallback_mode.get()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.get()
    }

    /// Counts a cache failure. Quota errors enter fallback mode at once,
    /// anything else after `error_threshold` failures in a row.
    pub fn record_cache_error(&self, error: &CacheError) {
        let errors = self.consecutive_errors.get().saturating_add(1);
        self.consecutive_errors.set(errors);

        if self.fallback_mode.get() {
            return;
        }

        if error.is_quota() {
            log::warn!("⚠️ Cache quota exhausted, entering fallback mode: {}", error);
            self.fallback_mode.set(true);
        } else if errors >= self.error_threshold {
            log::warn!(
                "⚠️ {} consecutive cache errors, entering fallback mode (last: {})",
                errors,
                error
            );
            self.fallback_mode.set(true);
        }
    }

    /// A working cache call breaks the error streak; it does not leave
    /// fallback mode
    pub fn record_cache_success(&self) {
        self.consecutive_errors.set(0);
    }

    /// Called after an authoritative sync succeeded
    pub fn handle_success(&self) {
        if self.fallback_mode.get() {
            log::info!("✅ System-of-Record sync succeeded, leaving fallback mode");
        }
        self.fallback_mode.set(false);
        self.consecutive_errors.set(0);
    }

    /// Appends the "(No Cache)" qualifier to "Online" texts while the cache is bypassed
    pub fn annotate(&self, text: &str) -> String {
        if self.fallback_mode.get() && text.contains("Online") {
            text.replacen("Online", "Online (No Cache)", 1)
        } else {
            text.to_string()
        }
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_error() -> CacheError {
        CacheError::Backend("unavailable".to_string())
    }

    #[test]
    fn three_errors_in_a_row_enter_fallback_mode() {
        let policy = FallbackPolicy::new(3);

        policy.record_cache_error(&backend_error());
        policy.record_cache_error(&backend_error());
        assert!(policy.should_use_cache());

        policy.record_cache_error(&backend_error());
        assert!(!policy.should_use_cache());
        assert!(policy.is_fallback_mode());
    }

    #[test]
    fn success_in_between_resets_the_streak() {
        let policy = FallbackPolicy::new(3);

        policy.record_cache_error(&backend_error());
        policy.record_cache_error(&backend_error());
        policy.record_cache_success();
        policy.record_cache_error(&backend_error());

        assert!(policy.should_use_cache());
        assert_eq!(policy.consecutive_errors(), 1);
    }

    #[test]
    fn quota_error_enters_immediately() {
        let policy = FallbackPolicy::new(3);
        policy.record_cache_error(&CacheError::QuotaExceeded("429".to_string()));
        assert!(!policy.should_use_cache());
    }

    #[test]
    fn cache_success_does_not_leave_fallback_mode() {
        let policy = FallbackPolicy::new(1);
        policy.record_cache_error(&backend_error());
        policy.record_cache_success();
        assert!(!policy.should_use_cache());

        policy.handle_success();
        assert!(policy.should_use_cache());
        assert_eq!(policy.consecutive_errors(), 0);
    }

    #[test]
    fn annotation_only_touches_online_texts_in_fallback_mode() {
        let policy = FallbackPolicy::new(1);
        assert_eq!(policy.annotate("Online"), "Online");

        policy.record_cache_error(&backend_error());
        assert_eq!(policy.annotate("Online"), "Online (No Cache)");
        assert_eq!(policy.annotate("Offline"), "Offline");
        assert_eq!(policy.annotate("Syncing..."), "Syncing...");
    }
}
