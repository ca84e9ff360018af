// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::executor::ExecuteError;
use async_trait::async_trait;
use pv_storage::StoreError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicUsize;

#[derive(Debug, Clone, Copy)]
enum Step {
    Done,
    Requeue(Duration),
    NotFound,
    PersistFailed(Duration),
    Panic,
}

/// Executor that replays scripted steps per ID and records concurrency
#[derive(Default)]
struct FakeExecutor {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<String>>,
    running: Mutex<HashMap<String, usize>>,
    max_per_id: AtomicUsize,
    total: AtomicUsize,
    max_total: AtomicUsize,
    work: Duration,
}

impl FakeExecutor {
    fn new(work: Duration) -> Self {
        Self {
            work,
            ..Self::default()
        }
    }

    fn script(&self, id: &str, steps: impl IntoIterator<Item = Step>) {
        self.script
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into_iter().collect());
    }

    fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Execute for FakeExecutor {
    async fn execute(&self, id: &str) -> Result<Disposition, ExecuteError> {
        self.calls.lock().unwrap().push(id.to_string());
        {
            let mut running = self.running.lock().unwrap();
            let count = running.entry(id.to_string()).or_default();
            *count += 1;
            self.max_per_id.fetch_max(*count, Ordering::SeqCst);
        }
        let total = self.total.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_total.fetch_max(total, Ordering::SeqCst);

        tokio::time::sleep(self.work).await;

        self.total.fetch_sub(1, Ordering::SeqCst);
        *self.running.lock().unwrap().get_mut(id).unwrap() -= 1;

        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Done);
        match step {
            Step::Done => Ok(Disposition::Done),
            Step::Requeue(delay) => Ok(Disposition::Requeue(delay)),
            Step::NotFound => Err(ExecuteError::NotFound(id.to_string())),
            Step::PersistFailed(delay) => Err(ExecuteError::Persist {
                id: id.to_string(),
                delay,
                source: StoreError::Unavailable("database is down".to_string()),
            }),
            Step::Panic => panic!("stage bug while executing {}", id),
        }
    }
}

fn queue(executor: &Arc<FakeExecutor>, workers: usize) -> OperationQueue<FakeExecutor> {
    OperationQueue::new(OperationKind::Provision, Arc::clone(executor), workers)
}

async fn wait_idle(queue: &OperationQueue<FakeExecutor>) {
    for _ in 0..10_000 {
        if queue.in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queue did not drain");
}

#[tokio::test(start_paused = true)]
async fn repeated_adds_run_one_executor_at_a_time() {
    let executor = Arc::new(FakeExecutor::new(Duration::from_millis(50)));
    executor.script(
        "op-1",
        [
            Step::Requeue(Duration::from_millis(10)),
            Step::Requeue(Duration::ZERO),
            Step::Requeue(Duration::from_millis(10)),
        ],
    );
    let queue = queue(&executor, 8);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    for _ in 0..100 {
        queue.add("op-1");
        tokio::task::yield_now().await;
    }
    wait_idle(&queue).await;

    assert_eq!(executor.max_per_id.load(Ordering::SeqCst), 1);
    assert_eq!(executor.calls_for("op-1"), 4);

    stop.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn requeue_waits_for_the_delay() {
    let executor = Arc::new(FakeExecutor::new(Duration::ZERO));
    executor.script("op-1", [Step::Requeue(Duration::from_secs(5))]);
    let queue = queue(&executor, 1);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    queue.add("op-1");
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(executor.calls_for("op-1"), 1);
    assert!(queue.is_in_flight("op-1"));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(executor.calls_for("op-1"), 2);
    assert!(!queue.is_in_flight("op-1"));

    stop.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn dropped_ids_are_released() {
    let executor = Arc::new(FakeExecutor::new(Duration::ZERO));
    executor.script("op-404", [Step::NotFound]);
    let queue = queue(&executor, 2);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    queue.add("op-404");
    wait_idle(&queue).await;
    assert_eq!(executor.calls_for("op-404"), 1);

    // Released, so a later add runs it again
    queue.add("op-404");
    wait_idle(&queue).await;
    assert_eq!(executor.calls_for("op-404"), 2);

    stop.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_executor_releases_id_and_keeps_worker() {
    let executor = Arc::new(FakeExecutor::new(Duration::ZERO));
    executor.script("op-1", [Step::Panic]);
    let queue = queue(&executor, 1);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    queue.add("op-1");
    wait_idle(&queue).await;
    assert_eq!(executor.calls_for("op-1"), 1);
    assert!(!queue.is_in_flight("op-1"));

    // The single worker is still alive and the ID can be added again
    queue.add("op-1");
    queue.add("op-2");
    wait_idle(&queue).await;
    assert_eq!(executor.calls_for("op-1"), 2);
    assert_eq!(executor.calls_for("op-2"), 1);

    stop.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn persist_failures_are_requeued_after_their_delay() {
    let executor = Arc::new(FakeExecutor::new(Duration::ZERO));
    executor.script("op-1", [Step::PersistFailed(Duration::from_secs(3))]);
    let queue = queue(&executor, 1);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    queue.add("op-1");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(executor.calls_for("op-1"), 1);

    wait_idle(&queue).await;
    assert_eq!(executor.calls_for("op-1"), 2);

    stop.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn pool_bounds_concurrency_across_ids() {
    let executor = Arc::new(FakeExecutor::new(Duration::from_millis(100)));
    let queue = queue(&executor, 2);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    for i in 0..6 {
        queue.add(&format!("op-{}", i));
    }
    wait_idle(&queue).await;

    assert_eq!(executor.total_calls(), 6);
    assert_eq!(executor.max_total.load(Ordering::SeqCst), 2);

    stop.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_timers_and_rejects_adds() {
    let executor = Arc::new(FakeExecutor::new(Duration::ZERO));
    executor.script("op-1", [Step::Requeue(Duration::from_secs(60))]);
    let queue = queue(&executor, 1);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    queue.add("op-1");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(executor.calls_for("op-1"), 1);

    stop.cancel();
    handle.join().await;

    queue.add("op-2");
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(executor.calls_for("op-1"), 1);
    assert_eq!(executor.calls_for("op-2"), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_lets_running_calls_finish() {
    let executor = Arc::new(FakeExecutor::new(Duration::from_secs(10)));
    let queue = queue(&executor, 1);
    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());

    queue.add("op-1");
    tokio::time::sleep(Duration::from_secs(1)).await;
    stop.cancel();
    handle.join().await;

    // The running call completed and released its ID
    assert_eq!(executor.calls_for("op-1"), 1);
    assert_eq!(executor.total.load(Ordering::SeqCst), 0);
    assert!(!queue.is_in_flight("op-1"));
}

#[tokio::test(start_paused = true)]
async fn adds_before_run_are_buffered() {
    let executor = Arc::new(FakeExecutor::new(Duration::ZERO));
    let queue = queue(&executor, 1);

    queue.add("op-1");
    queue.add("op-1");
    assert_eq!(queue.in_flight(), 1);

    let stop = CancellationToken::new();
    let handle = queue.run(stop.clone());
    wait_idle(&queue).await;
    assert_eq!(executor.calls_for("op-1"), 1);

    stop.cancel();
    handle.join().await;
}
