//! Bounded-concurrency batches.
//!
//! [`BoundedBatchScheduler`] runs a worker over every input with at most `limit`
//! operations in flight. It is a fixed pool of lanes on the calling task: each
//! lane takes the next unstarted input from a shared cursor, awaits the worker,
//! records the outcome and goes back for more until the cursor is exhausted.
//!
//! - Inputs start in submission order.
//! - Completion order is whatever the workers produce; it is recorded.
//! - A failing input never cancels or blocks the others.
//! - Outcomes are returned in input order once every input has settled.

use futures::future::join_all;
use std::fmt;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One input's settled outcome.
#[derive(Debug)]
pub struct BatchTask<O, E> {
    pub index: usize,
    pub outcome: Result<O, E>,
}

impl<O, E> BatchTask<O, E> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
pub struct BatchReport<O, E> {
    tasks: Vec<BatchTask<O, E>>,
    completion_order: Vec<usize>,
}

impl<O, E> BatchReport<O, E> {
    /// Outcomes in input order.
    pub fn tasks(&self) -> &[BatchTask<O, E>] {
        &self.tasks
    }

    /// Input indices in the order their workers settled.
    pub fn completion_order(&self) -> &[usize] {
        &self.completion_order
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &E)> {
        self.tasks
            .iter()
            .filter_map(|t| t.outcome.as_ref().err().map(|e| (t.index, e)))
    }

    pub fn into_tasks(self) -> Vec<BatchTask<O, E>> {
        self.tasks
    }
}

impl<O, E: fmt::Display> BatchReport<O, E> {
    /// All success values, or a [`BatchPartialFailure`] listing every failed input.
    pub fn into_result(self) -> Result<Vec<O>, BatchPartialFailure> {
        let total = self.tasks.len();
        let mut values = Vec::with_capacity(total);
        let mut failed = Vec::new();
        for task in self.tasks {
            match task.outcome {
                Ok(v) => values.push(v),
                Err(e) => failed.push(FailedItem {
                    index: task.index,
                    reason: e.to_string(),
                }),
            }
        }
        if failed.is_empty() {
            Ok(values)
        } else {
            Err(BatchPartialFailure { total, failed })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} of {} batch items failed", failed.len(), total)]
pub struct BatchPartialFailure {
    pub total: usize,
    pub failed: Vec<FailedItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedBatchScheduler {
    limit: usize,
}

impl BoundedBatchScheduler {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        if limit == 0 {
            warn!("[BATCH] Concurrency limit 0 requested, using 1");
        }
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn run<I, O, E, F, Fut>(&self, items: Vec<I>, worker: F) -> BatchReport<O, E>
    where
        F: Fn(I, usize) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let total = items.len();
        let lanes = self.limit.min(total);
        info!(total, limit = self.limit, lanes, "[BATCH] Starting");

        let cursor = Mutex::new(items.into_iter().enumerate());
        let settled: Mutex<Vec<(usize, Result<O, E>)>> = Mutex::new(Vec::with_capacity(total));

        let cursor = &cursor;
        let settled = &settled;
        let worker = &worker;
        let pool = (0..lanes).map(|lane| async move {
            loop {
                let next = cursor.lock().await.next();
                let Some((index, item)) = next else {
                    break;
                };
                debug!(lane, index, "[BATCH] Item started");
                let outcome = worker(item, index).await;
                debug!(lane, index, ok = outcome.is_ok(), "[BATCH] Item settled");
                settled.lock().await.push((index, outcome));
            }
        });
        join_all(pool).await;

        let mut settled = std::mem::take(&mut *settled.lock().await);
        let completion_order: Vec<usize> = settled.iter().map(|(i, _)| *i).collect();
        settled.sort_by_key(|(i, _)| *i);
        let tasks: Vec<BatchTask<O, E>> = settled
            .into_iter()
            .map(|(index, outcome)| BatchTask { index, outcome })
            .collect();

        let failed = tasks.iter().filter(|t| !t.is_success()).count();
        info!(total, failed, "[BATCH] Finished");
        BatchReport {
            tasks,
            completion_order,
        }
    }
}
