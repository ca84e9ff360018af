// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted stages for engine tests

use crate::stage::{Stage, StageOutcome};
use async_trait::async_trait;
use pv_core::Operation;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stage that replays a fixed list of outcomes, then repeats a fallback
#[derive(Clone)]
pub struct ScriptedStage {
    script: Arc<Mutex<VecDeque<StageOutcome>>>,
    fallback: StageOutcome,
    sleep: Option<Duration>,
    seen: Arc<Mutex<Vec<Operation>>>,
}

impl ScriptedStage {
    pub fn new(outcomes: impl IntoIterator<Item = StageOutcome>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            fallback: StageOutcome::Finished,
            sleep: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Stage that always finishes
    pub fn finishing() -> Self {
        Self::new([])
    }

    /// Outcome once the script is exhausted
    pub fn then(mut self, fallback: StageOutcome) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sleep before answering
    pub fn sleeping(mut self, duration: Duration) -> Self {
        self.sleep = Some(duration);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Snapshots the stage was invoked with
    pub fn seen(&self) -> Vec<Operation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        self.seen.lock().unwrap().push(operation.clone());
        if let Some(duration) = self.sleep {
            tokio::time::sleep(duration).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
