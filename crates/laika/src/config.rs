//! Executor configuration

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Configuration for a [`Executor`](crate::Executor).
///
/// The worker pool is sized once at construction; there is no way to grow or
/// shrink it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of worker threads in the pool.
    pub num_threads: usize,

    /// Prefix for worker thread names; workers are named `<prefix>-<index>`.
    pub thread_name_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name_prefix: "laika-worker".to_owned(),
        }
    }
}

impl ExecutorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn with_num_threads(mut self, num_threads: usize) -> ConfigResult<Self> {
        if num_threads == 0 {
            return Err(ConfigError::invalid_num_threads(num_threads));
        }
        self.num_threads = num_threads;
        Ok(self)
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_threads == 0 {
            return Err(ConfigError::invalid_num_threads(self.num_threads));
        }
        Ok(())
    }

    /// Create a configuration suited to tests: a small fixed pool.
    pub fn for_testing() -> Self {
        Self {
            num_threads: 2,
            thread_name_prefix: "laika-test".to_owned(),
        }
    }
}
