//! Build configuration.

use std::fmt;

use crate::codec::Format;

/// Errors from [`BuildConfig::validate()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker count must be greater than zero.
    ZeroWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWorkers => write!(f, "worker count must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How a corpus is turned into a persisted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildConfig {
    /// Insertion workers. `None` uses rayon's default (one per core).
    pub workers: Option<usize>,
    /// Snapshot encoding written by `save`.
    pub format: Format,
}

impl BuildConfig {
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// A dedicated pool sized by `workers`, so a build never competes with the global pool.
    pub fn thread_pool(&self) -> crate::Result<rayon::ThreadPool> {
        self.validate()?;
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("schematree-insert-{i}"));
        if let Some(workers) = self.workers {
            builder = builder.num_threads(workers);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod test {

    use super::{BuildConfig, ConfigError};
    use crate::codec::Format;

    #[test]
    fn zero_workers_rejected() {
        let config = BuildConfig::default().with_workers(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkers));
        assert!(config.thread_pool().is_err());
    }

    #[test]
    fn pool_honours_worker_count() {
        let config = BuildConfig::default().with_workers(3).with_format(Format::Sequential);
        let pool = config.thread_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        assert_eq!(config.format, Format::Sequential);
    }
}
