//! Rayon pool setup for the per-region work
//!
//! Region rasterization and band statistics run on the global pool, so the
//! pool must be sized before the first job runs.

use crate::errors::{Result, ZonalError};
use rayon::ThreadPoolBuilder;

/// Thread count requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// `None` leaves rayon's default of one thread per core
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    #[must_use]
    pub const fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Size the global pool. `Some(1)` gives a sequential run.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::ThreadPoolError`] for a zero thread count or when
    /// the global pool was already built.
    pub fn setup_global_pool(&self) -> Result<()> {
        let Some(threads) = self.num_threads else {
            log::debug!("Using rayon's default pool ({} threads)", rayon::current_num_threads());
            return Ok(());
        };

        if threads == 0 {
            return Err(ZonalError::ThreadPoolError(
                "--threads must be at least 1".to_string(),
            ));
        }

        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| ZonalError::ThreadPoolError(format!("{threads} threads: {e}")))?;

        log::info!("Processing regions on {threads} thread(s)");
        Ok(())
    }
}

/// Pool size against what the machine offers
#[derive(Debug, Clone, Copy)]
pub struct ParallelInfo {
    pub pool_threads: usize,
    pub cpu_cores: usize,
}

impl ParallelInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            pool_threads: rayon::current_num_threads(),
            cpu_cores: num_cpus::get(),
        }
    }

    pub fn print_info(&self) {
        println!(
            "📊 Regions processed on {} thread(s), {} CPU core(s) available",
            self.pool_threads, self.cpu_cores
        );
    }
}
