//! Bounded-parallelism execution of independent per-container actions.

use crate::error::{EngineError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError, mpsc};
use std::thread;
use tracing::debug;

/// The kind of bulk operation, used to pick a default worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Start,
    Stop,
    Remove,
    Prune,
}

impl BatchOp {
    /// Worker count used when none is configured.
    pub fn default_workers(self) -> usize {
        let cpus = thread::available_parallelism().map_or(1, |n| n.get());
        match self {
            Self::Remove | Self::Prune if cpus <= 3 => cpus * 3,
            Self::Remove | Self::Prune => cpus * 4,
            Self::Stop => cpus * 3,
            Self::Start => cpus,
        }
    }
}

type Action<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;

/// One container plus the action to run against it.
pub struct BatchUnit<'a> {
    pub container_id: String,
    action: Action<'a>,
}

impl<'a> BatchUnit<'a> {
    pub fn new(
        container_id: impl Into<String>,
        action: impl FnOnce() -> Result<()> + Send + 'a,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            action: Box::new(action),
        }
    }
}

#[derive(Debug)]
pub struct TaggedError {
    pub container_id: String,
    pub error: EngineError,
}

/// Per-batch result. Failures keep submission order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: Vec<String>,
    pub failures: Vec<TaggedError>,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    max_workers: usize,
}

impl BatchExecutor {
    /// A `None` or zero worker count falls back to the default for `op`.
    pub fn for_op(op: BatchOp, max_workers: Option<usize>) -> Self {
        let max_workers = match max_workers {
            Some(n) if n > 0 => n,
            _ => op.default_workers(),
        };
        Self { max_workers }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs every unit exactly once on at most `max_workers` threads and
    /// returns after all of them have finished. A panicking unit is reported
    /// as that unit's failure.
    pub fn run(&self, units: Vec<BatchUnit<'_>>) -> BatchOutcome {
        let total = units.len();
        if total == 0 {
            return BatchOutcome::default();
        }

        let workers = self.max_workers.clamp(1, total);
        debug!("running {total} unit(s) on {workers} worker(s)");

        let queue = Mutex::new(units.into_iter().enumerate());
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    loop {
                        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                        let Some((index, unit)) = next else { break };

                        let result = panic::catch_unwind(AssertUnwindSafe(unit.action))
                            .unwrap_or_else(|payload| {
                                Err(EngineError::runtime(
                                    "process",
                                    &unit.container_id,
                                    panic_message(payload.as_ref()),
                                ))
                            });

                        if tx.send((index, unit.container_id, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut results: Vec<_> = rx.into_iter().collect();
        results.sort_by_key(|(index, _, _)| *index);

        let mut outcome = BatchOutcome {
            total,
            ..Default::default()
        };
        for (_, container_id, result) in results {
            match result {
                Ok(()) => outcome.succeeded.push(container_id),
                Err(error) => outcome.failures.push(TaggedError {
                    container_id,
                    error,
                }),
            }
        }
        debug!(
            "batch finished: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed()
        );
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn units_with_failures<'a>(
        n: usize,
        failing: &'a [usize],
        calls: &'a AtomicUsize,
    ) -> Vec<BatchUnit<'a>> {
        (0..n)
            .map(|i| {
                BatchUnit::new(format!("c{i}"), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if failing.contains(&i) {
                        Err(EngineError::runtime("remove", format!("c{i}"), "boom"))
                    } else {
                        Ok(())
                    }
                })
            })
            .collect()
    }

    #[test]
    fn test_reports_exact_failures_for_every_worker_count() {
        let n = 7;
        let failing = [1, 4, 6];

        for workers in 1..=n {
            let calls = AtomicUsize::new(0);
            let executor = BatchExecutor::for_op(BatchOp::Remove, Some(workers));
            let outcome = executor.run(units_with_failures(n, &failing, &calls));

            assert_eq!(calls.load(Ordering::SeqCst), n, "workers={workers}");
            assert_eq!(outcome.total, n);
            assert_eq!(outcome.failed(), failing.len());
            assert_eq!(outcome.succeeded.len(), n - failing.len());

            let failed_ids: Vec<&str> = outcome
                .failures
                .iter()
                .map(|f| f.container_id.as_str())
                .collect();
            assert_eq!(failed_ids, vec!["c1", "c4", "c6"]);
        }
    }

    #[test]
    fn test_panicking_unit_does_not_affect_others() {
        let calls = AtomicUsize::new(0);
        let mut units = units_with_failures(3, &[], &calls);
        units.insert(1, BatchUnit::new("bad", || panic!("kaboom")));

        let outcome = BatchExecutor::for_op(BatchOp::Prune, Some(2)).run(units);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].container_id, "bad");
        assert!(outcome.failures[0].error.to_string().contains("kaboom"));
    }

    #[test]
    fn test_concurrency_is_capped() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let units = (0..12)
            .map(|i| {
                let running = &running;
                let peak = &peak;
                BatchUnit::new(format!("c{i}"), move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let outcome = BatchExecutor::for_op(BatchOp::Stop, Some(3)).run(units);

        assert!(outcome.is_success());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_empty_batch() {
        let outcome = BatchExecutor::for_op(BatchOp::Remove, None).run(Vec::new());
        assert_eq!(outcome.total, 0);
        assert!(outcome.is_success());
    }

    #[test]
    fn test_zero_workers_falls_back_to_default() {
        let executor = BatchExecutor::for_op(BatchOp::Start, Some(0));
        assert_eq!(executor.max_workers(), BatchOp::Start.default_workers());
        assert!(executor.max_workers() >= 1);
    }
}
