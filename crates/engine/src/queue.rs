// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-kind operation queue
//!
//! A fixed pool of workers pulls operation IDs from a channel and hands them
//! to the executor. An ID stays in the in-flight set from `add` until the
//! operation is terminal or dropped, including while it waits on a requeue
//! timer, so at most one executor call per ID runs at a time.

use crate::executor::{Disposition, Execute};
use pv_core::OperationKind;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sink for operation IDs, keyed by kind
pub trait Enqueue: Send + Sync {
    fn enqueue(&self, kind: OperationKind, id: &str);
}

/// Bounded-concurrency work queue for one operation kind
pub struct OperationQueue<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for OperationQueue<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<E> {
    kind: OperationKind,
    executor: Arc<E>,
    workers: usize,
    in_flight: Mutex<HashSet<String>>,
    tx: mpsc::UnboundedSender<String>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    closed: AtomicBool,
}

impl<E: Execute> OperationQueue<E> {
    pub fn new(kind: OperationKind, executor: Arc<E>, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                kind,
                executor,
                workers: workers.max(1),
                in_flight: Mutex::new(HashSet::new()),
                tx,
                rx: tokio::sync::Mutex::new(rx),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    /// Schedule an operation. No-op if it is already in flight or the queue
    /// has stopped.
    pub fn add(&self, id: &str) {
        if self.inner.closed.load(Ordering::SeqCst) {
            tracing::debug!(queue = %self.inner.kind, id, "queue stopped, ignoring add");
            return;
        }
        {
            let mut in_flight = self.inner.lock_in_flight();
            if !in_flight.insert(id.to_string()) {
                tracing::trace!(queue = %self.inner.kind, id, "already in flight");
                return;
            }
        }
        self.inner.post(id.to_string());
    }

    /// Number of IDs currently owned by the queue
    pub fn in_flight(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.inner.lock_in_flight().contains(id)
    }

    /// Start the worker pool and return immediately.
    ///
    /// Cancelling `stop` closes the queue to new work and pending timers;
    /// running executor calls finish before their worker exits.
    pub fn run(&self, stop: CancellationToken) -> QueueHandle {
        tracing::info!(
            queue = %self.inner.kind,
            workers = self.inner.workers,
            "starting queue"
        );
        let workers = (0..self.inner.workers)
            .map(|worker| {
                let inner = Arc::clone(&self.inner);
                let stop = stop.clone();
                tokio::spawn(async move { inner.work(worker, stop).await })
            })
            .collect();
        QueueHandle { workers }
    }
}

impl<E: Execute> Inner<E> {
    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self, id: &str) {
        self.lock_in_flight().remove(id);
    }

    /// Put an owned ID on the channel
    fn post(&self, id: String) {
        if self.closed.load(Ordering::SeqCst) {
            self.release(&id);
            return;
        }
        if let Err(mpsc::error::SendError(id)) = self.tx.send(id) {
            self.release(&id);
        }
    }

    async fn work(self: Arc<Self>, worker: usize, stop: CancellationToken) {
        loop {
            let next = tokio::select! {
                biased;
                _ = stop.cancelled() => None,
                id = async { self.rx.lock().await.recv().await } => id,
            };
            let Some(id) = next else {
                break;
            };
            self.process(id, &stop).await;
        }
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!(queue = %self.kind, worker, "worker stopped");
    }

    async fn process(self: &Arc<Self>, id: String, stop: &CancellationToken) {
        // A panicking executor call takes down its own task, not the worker
        let executor = Arc::clone(&self.executor);
        let task_id = id.clone();
        let result = tokio::spawn(async move { executor.execute(&task_id).await }).await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    queue = %self.kind,
                    id = %id,
                    error = %e,
                    "executor task aborted; dropping operation"
                );
                self.release(&id);
                return;
            }
        };

        match result {
            Ok(Disposition::Done) => self.release(&id),
            Ok(Disposition::Requeue(delay)) => self.requeue(id, delay, stop),
            Err(e) => match e.requeue_delay() {
                Some(delay) => {
                    tracing::warn!(
                        queue = %self.kind,
                        id = %id,
                        error = %e,
                        "requeueing after error"
                    );
                    self.requeue(id, delay, stop);
                }
                None => {
                    tracing::error!(
                        queue = %self.kind,
                        id = %id,
                        error = %e,
                        "dropping operation"
                    );
                    self.release(&id);
                }
            },
        }
    }

    fn requeue(self: &Arc<Self>, id: String, delay: Duration, stop: &CancellationToken) {
        if stop.is_cancelled() {
            self.release(&id);
            return;
        }
        if delay.is_zero() {
            self.post(id);
            return;
        }

        // Timers hold no worker
        let inner = Arc::clone(self);
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = stop.cancelled() => inner.release(&id),
                _ = tokio::time::sleep(delay) => inner.post(id),
            }
        });
    }
}

/// Join handle for a running queue's workers
pub struct QueueHandle {
    workers: Vec<JoinHandle<()>>,
}

impl QueueHandle {
    /// Wait for every worker to exit
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "queue worker panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
