//! Bounded worker pool used for the symbol loading phases.
//!
//! Each phase fans a batch of independent units out over the pool and blocks until every
//! unit has finished. Failures are collected rather than short-circuited, so a phase reports
//! every failing unit at once.

use crate::error::{RespackError, Result};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Default pool size: half the reported parallelism, at least one.
///
/// Loading is mostly I/O and the reported core count may overstate what a shared host
/// actually grants.
pub fn default_threads() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 2).max(1)
}

pub struct WorkerPool {
    pool: ThreadPool,
    in_flight: Arc<AtomicUsize>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("respack-symbols-{i}"))
            .build()
            .map_err(|e| RespackError::Pool(e.to_string()))?;
        Ok(Self {
            pool,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Runs `f` against a fresh pool and tears the pool down on every exit path.
    ///
    /// A teardown failure is reported only when `f` itself succeeded.
    pub fn scoped<R>(threads: usize, f: impl FnOnce(&WorkerPool) -> Result<R>) -> Result<R> {
        let pool = Self::new(threads)?;
        let result = f(&pool);
        let shutdown = pool.shutdown();
        let value = result?;
        shutdown?;
        Ok(value)
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs every unit of `items` and waits for all of them.
    ///
    /// Results come back in input order. If any unit failed the whole phase fails with a
    /// single [`RespackError::Load`] listing each failure.
    pub fn run_all<I, T, F>(&self, phase: &'static str, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync,
    {
        let count = items.len();
        let in_flight = self.in_flight.as_ref();
        let results: Vec<Result<T>> = self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    let _guard = InFlight::enter(in_flight);
                    f(item)
                })
                .collect()
        });

        let mut values = Vec::with_capacity(count);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if !failures.is_empty() {
            return Err(RespackError::Load { phase, failures });
        }
        debug!("Completed {} units: {}", count, phase);
        Ok(values)
    }

    /// Releases the pool. Units still running at this point are an internal error.
    pub fn shutdown(self) -> Result<()> {
        let running = self.in_flight.load(Ordering::SeqCst);
        drop(self.pool);
        if running != 0 {
            return Err(RespackError::Pool(format!(
                "shutting down with {running} unfinished tasks"
            )));
        }
        Ok(())
    }
}
