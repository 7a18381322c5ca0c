//! Failure injection for cache storage
//!
//! Supports configurable failure injection for testing error paths.

use std::collections::HashMap;

/// A storage operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Open,
    Has,
    Keys,
    Delete,
    Match,
    Put,
    Entries,
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Message carried by the injected error
    pub message: String,
    /// Only fail for this store tag (None = every tag)
    pub tag: Option<String>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
    /// Matching calls that succeed before the first failure
    pub succeed_first: u32,
}

impl FailureConfig {
    /// Create a config that always fails
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tag: None,
            fail_count: None,
            succeed_first: 0,
        }
    }

    /// Restrict the failure to one store
    pub fn for_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Let the first `calls` matching calls through, failing from the next one
    pub fn after(mut self, calls: u32) -> Self {
        self.succeed_first = calls;
        self
    }
}

/// Failure injector for [`super::FlakyStorage`]
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<StoreOp, FailureConfig>,
    /// Matching calls seen per operation (for fail_count tracking)
    call_counts: HashMap<StoreOp, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation
    pub fn inject(&mut self, op: StoreOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    pub fn inject_error(&mut self, op: StoreOp, message: impl Into<String>) {
        self.inject(op, FailureConfig::error(message));
    }

    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    pub fn clear_op(&mut self, op: StoreOp) {
        self.configs.remove(&op);
        self.call_counts.remove(&op);
    }

    /// Check if `op` on store `tag` should fail.
    /// Returns the error message if so.
    pub fn check(&mut self, op: StoreOp, tag: Option<&str>) -> Option<String> {
        let config = self.configs.get(&op)?;
        if let Some(ref only) = config.tag {
            if tag != Some(only.as_str()) {
                return None;
            }
        }

        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if *count <= config.succeed_first {
            return None;
        }
        if let Some(fail_limit) = config.fail_count {
            if *count - config.succeed_first > fail_limit {
                return None;
            }
        }

        Some(config.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_injector_basic() {
        let mut injector = FailureInjector::new();

        assert!(injector.check(StoreOp::Put, Some("earcheo-v1.1")).is_none());

        injector.inject_error(StoreOp::Put, "quota exceeded");

        assert_eq!(
            injector.check(StoreOp::Put, Some("earcheo-v1.1")),
            Some("quota exceeded".to_string())
        );
        assert!(injector.check(StoreOp::Delete, Some("earcheo-v1.1")).is_none());
    }

    #[test]
    fn test_failure_injector_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(StoreOp::Keys, FailureConfig::error("busy").with_fail_count(2));

        assert!(injector.check(StoreOp::Keys, None).is_some());
        assert!(injector.check(StoreOp::Keys, None).is_some());
        assert!(injector.check(StoreOp::Keys, None).is_none());
    }

    #[test]
    fn test_failure_injector_after() {
        let mut injector = FailureInjector::new();
        injector.inject(StoreOp::Put, FailureConfig::error("quota").after(1).with_fail_count(1));

        assert!(injector.check(StoreOp::Put, Some("earcheo-v1.1")).is_none());
        assert!(injector.check(StoreOp::Put, Some("earcheo-v1.1")).is_some());
        assert!(injector.check(StoreOp::Put, Some("earcheo-v1.1")).is_none());
    }

    #[test]
    fn test_failure_injector_tag_filter() {
        let mut injector = FailureInjector::new();
        injector.inject(StoreOp::Delete, FailureConfig::error("locked").for_tag("earcheo-v1.0"));

        assert!(injector.check(StoreOp::Delete, Some("earcheo-v0.9")).is_none());
        assert!(injector.check(StoreOp::Delete, Some("earcheo-v1.0")).is_some());
    }

    #[test]
    fn test_failure_injector_clear() {
        let mut injector = FailureInjector::new();

        injector.inject_error(StoreOp::Match, "io");
        assert!(injector.check(StoreOp::Match, None).is_some());

        injector.clear_op(StoreOp::Match);
        assert!(injector.check(StoreOp::Match, None).is_none());
    }
}
