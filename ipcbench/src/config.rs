use snafu::prelude::*;

use crate::error::{BenchError, InvalidConfigSnafu};

/// How many consecutive failed channel operations a loop tolerates before it
/// gives up. The default retries forever.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const FOREVER: RetryPolicy = RetryPolicy { max_attempts: None };

    pub const fn bounded(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: Some(max_attempts),
        }
    }

    pub fn exhausted(&self, failures: u32) -> bool {
        matches!(self.max_attempts, Some(max) if failures >= max)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BenchConfig {
    /// Successful round trips to measure.
    pub iterations: u64,
    /// Core the server thread is migrated to.
    pub server_core: usize,
    /// Core the client (calling) thread is pinned to, if any.
    pub client_core: Option<usize>,
    /// Real-time priority for the server thread, if any.
    pub priority: Option<i32>,
    pub retry: RetryPolicy,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            iterations: 100_000,
            server_core: 1,
            client_core: None,
            priority: None,
            retry: RetryPolicy::FOREVER,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), BenchError> {
        ensure!(
            self.iterations > 0,
            InvalidConfigSnafu {
                reason: "at least one iteration is required"
            }
        );
        ensure!(
            self.client_core != Some(self.server_core),
            InvalidConfigSnafu {
                reason: format!(
                    "client and server cannot share core {}",
                    self.server_core
                )
            }
        );
        ensure!(
            self.retry.max_attempts != Some(0),
            InvalidConfigSnafu {
                reason: "max attempts must be at least 1"
            }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.iterations, 100_000);
        assert_eq!(config.retry, RetryPolicy::FOREVER);
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let config = BenchConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BenchError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_rejects_shared_core() {
        let config = BenchConfig {
            server_core: 2,
            client_core: Some(2),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy() {
        assert!(!RetryPolicy::FOREVER.exhausted(u32::MAX));
        let policy = RetryPolicy::bounded(3);
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
        let config = BenchConfig {
            retry: RetryPolicy::bounded(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
