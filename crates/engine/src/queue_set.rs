// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One queue per operation kind, sharing an executor

use crate::executor::Execute;
use crate::queue::{Enqueue, OperationQueue, QueueHandle};
use pv_core::OperationKind;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The queues for every operation kind
pub struct QueueSet<E> {
    queues: BTreeMap<OperationKind, OperationQueue<E>>,
}

impl<E: Execute> QueueSet<E> {
    /// Build a queue for every kind, sized by `workers`
    pub fn new(executor: Arc<E>, workers: impl Fn(OperationKind) -> usize) -> Self {
        let queues = OperationKind::ALL
            .into_iter()
            .map(|kind| {
                let queue = OperationQueue::new(kind, Arc::clone(&executor), workers(kind));
                (kind, queue)
            })
            .collect();
        Self { queues }
    }

    pub fn get(&self, kind: OperationKind) -> Option<&OperationQueue<E>> {
        self.queues.get(&kind)
    }

    /// Start every queue's workers
    pub fn run(&self, stop: CancellationToken) -> QueueSetHandle {
        let handles = self
            .queues
            .values()
            .map(|queue| queue.run(stop.clone()))
            .collect();
        QueueSetHandle { handles }
    }
}

impl<E: Execute> Enqueue for QueueSet<E> {
    fn enqueue(&self, kind: OperationKind, id: &str) {
        match self.queues.get(&kind) {
            Some(queue) => queue.add(id),
            None => tracing::error!(%kind, id, "no queue for operation kind"),
        }
    }
}

/// Join handle for every queue in a [`QueueSet`]
pub struct QueueSetHandle {
    handles: Vec<QueueHandle>,
}

impl QueueSetHandle {
    /// Wait for every queue to drain its workers
    pub async fn join(self) {
        for handle in self.handles {
            handle.join().await;
        }
    }
}

#[cfg(test)]
#[path = "queue_set_tests.rs"]
mod tests;
