use crate::error::{Error, Result};

/// Hard upper bound on worker threads per pool.
pub const MAX_POOL_THREADS: usize = 1024;

/// Hard upper bound on the pending-task queue capacity.
pub const MAX_QUEUED_TASKS: usize = 100_000;

/// Pool construction parameters.
///
/// Both capacity bounds are fixed for the lifetime of the pool; exceeding
/// them at runtime is reported through [`Error`], never silently truncated.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_threads: Option<usize>,
    pub max_queued: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_threads: None,
            max_queued: 10_000,
            thread_name_prefix: "corral-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_threads {
            if n == 0 {
                return Err(Error::invalid_argument("max_threads must be > 0"));
            }
            if n > MAX_POOL_THREADS {
                return Err(Error::invalid_argument(format!(
                    "max_threads too large (max {MAX_POOL_THREADS})"
                )));
            }
        }

        if self.max_queued == 0 {
            return Err(Error::invalid_argument("max_queued must be > 0"));
        }
        if self.max_queued > MAX_QUEUED_TASKS {
            return Err(Error::invalid_argument(format!(
                "max_queued too large (max {MAX_QUEUED_TASKS})"
            )));
        }

        Ok(())
    }

    /// Resolved worker-thread cap: the configured value, or one per CPU.
    pub fn worker_threads(&self) -> usize {
        self.max_threads
            .unwrap_or_else(|| num_cpus::get().min(MAX_POOL_THREADS))
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.config.max_threads = Some(n);
        self
    }

    pub fn max_queued(mut self, n: usize) -> Self {
        self.config.max_queued = n;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = Config::builder().max_threads(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_thread_cap_enforced() {
        let result = Config::builder().max_threads(MAX_POOL_THREADS + 1).build();
        assert!(result.is_err());

        let result = Config::builder().max_threads(MAX_POOL_THREADS).build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_queue_rejected() {
        let result = Config::builder().max_queued(0).build();
        assert!(result.is_err());
    }
}
