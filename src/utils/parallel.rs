//! Parallel processing utilities

use crate::error::{CostBenchError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use the global rayon pool)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `n_jobs` knob of the pipeline configuration
    pub fn from_n_jobs(n_jobs: Option<usize>) -> Self {
        Self { n_threads: n_jobs }
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n);
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Run `f` inside a dedicated pool when a thread count is set.
    ///
    /// Every rayon iterator started from `f` uses that pool. When the caller
    /// already runs in a pool of the requested size, `f` runs there and no
    /// new pool is built.
    pub fn install<R, F>(&self, f: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.n_threads {
            Some(n) if n != rayon::current_num_threads() => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| CostBenchError::ConfigError(format!("cannot build thread pool: {}", e)))?;
                Ok(pool.install(f))
            }
            _ => Ok(f()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_uses_dedicated_pool() {
        let config = ParallelConfig::new().with_threads(2);
        let threads = config.install(rayon::current_num_threads).unwrap();
        assert_eq!(threads, 2);
    }

    #[test]
    fn test_nested_install_reuses_pool() {
        let config = ParallelConfig::new().with_threads(3);
        let (outer, inner) = config
            .install(|| {
                let outer = std::thread::current().id();
                let inner = config.install(|| std::thread::current().id()).unwrap();
                (outer, inner)
            })
            .unwrap();
        assert_eq!(outer, inner);
    }

    #[test]
    fn test_from_n_jobs() {
        assert_eq!(ParallelConfig::from_n_jobs(Some(3)).num_threads(), 3);
        assert_eq!(ParallelConfig::from_n_jobs(None).n_threads, None);
    }
}
