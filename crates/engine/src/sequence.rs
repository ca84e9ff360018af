// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage sequences and the kind-to-sequence registry

use crate::stage::{Stage, StagePolicy};
use pv_core::OperationKind;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors building a sequence or registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("sequence for {0} has no stages")]
    Empty(OperationKind),
    #[error("sequence for {kind} has duplicate stage: {name}")]
    DuplicateStage { kind: OperationKind, name: String },
    #[error("more than one sequence registered for {0}")]
    DuplicateKind(OperationKind),
}

/// A named stage with its policy
#[derive(Clone)]
pub struct StageEntry {
    name: String,
    policy: StagePolicy,
    stage: Arc<dyn Stage>,
}

impl StageEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &StagePolicy {
        &self.policy
    }

    pub fn stage(&self) -> &dyn Stage {
        self.stage.as_ref()
    }
}

impl fmt::Debug for StageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageEntry")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Ordered, immutable stages for one operation kind.
///
/// Falling off the end of the sequence means the operation succeeded.
#[derive(Debug, Clone)]
pub struct StageSequence {
    kind: OperationKind,
    stages: Vec<StageEntry>,
    deadline: Option<Duration>,
}

impl StageSequence {
    pub fn builder(kind: OperationKind) -> SequenceBuilder {
        SequenceBuilder {
            kind,
            stages: Vec::new(),
            deadline: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Overall limit measured from the operation's start
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// The stage new operations start at
    pub fn first(&self) -> &StageEntry {
        // Non-empty by construction
        &self.stages[0]
    }

    /// Look up a stage and its position by name
    pub fn find(&self, name: &str) -> Option<(usize, &StageEntry)> {
        self.stages
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.name == name)
    }

    /// The stage after position `index`, or `None` after the last one
    pub fn next_after(&self, index: usize) -> Option<&StageEntry> {
        self.stages.get(index + 1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for [`StageSequence`]
pub struct SequenceBuilder {
    kind: OperationKind,
    stages: Vec<StageEntry>,
    deadline: Option<Duration>,
}

impl SequenceBuilder {
    /// Append a stage
    pub fn stage(mut self, name: impl Into<String>, policy: StagePolicy, stage: impl Stage) -> Self {
        self.stages.push(StageEntry {
            name: name.into(),
            policy,
            stage: Arc::new(stage),
        });
        self
    }

    /// Fail operations that run longer than `deadline` overall
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<StageSequence, SequenceError> {
        if self.stages.is_empty() {
            return Err(SequenceError::Empty(self.kind));
        }

        let mut seen = HashSet::new();
        for entry in &self.stages {
            if !seen.insert(entry.name.as_str()) {
                return Err(SequenceError::DuplicateStage {
                    kind: self.kind,
                    name: entry.name.clone(),
                });
            }
        }

        Ok(StageSequence {
            kind: self.kind,
            stages: self.stages,
            deadline: self.deadline,
        })
    }
}

/// Read-only map from operation kind to its sequence, built once at startup
#[derive(Debug, Clone, Default)]
pub struct SequenceRegistry {
    sequences: HashMap<OperationKind, Arc<StageSequence>>,
}

impl SequenceRegistry {
    pub fn new(sequences: impl IntoIterator<Item = StageSequence>) -> Result<Self, SequenceError> {
        let mut map = HashMap::new();
        for sequence in sequences {
            let kind = sequence.kind;
            if map.insert(kind, Arc::new(sequence)).is_some() {
                return Err(SequenceError::DuplicateKind(kind));
            }
        }
        Ok(Self { sequences: map })
    }

    pub fn get(&self, kind: OperationKind) -> Option<Arc<StageSequence>> {
        self.sequences.get(&kind).cloned()
    }

    /// Kinds with a registered sequence
    pub fn kinds(&self) -> impl Iterator<Item = OperationKind> + '_ {
        self.sequences.keys().copied()
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
