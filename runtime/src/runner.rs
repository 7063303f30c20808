// Radicle Registry
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Execution of graph algorithms against committed snapshots.
//!
//! An execution is split in two steps. [AlgorithmRunner::execute] only needs a [Snapshot]
//! and can run while the ledger keeps committing transactions. [AlgorithmRunner::commit]
//! then writes the buffered annotations and the output through the [CheckpointManager] and
//! stores the new [Context].

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use parity_scale_codec::Encode;

use oscoin_ledger_core::api::{
    AnnotatedField, ExecutionEnv, GraphAlgorithm, GraphAnnotator, GraphReader, Interrupt,
};
use oscoin_ledger_core::graph::NodeId;
use oscoin_ledger_core::{
    hash_of, AlgorithmId, Context, ErrorKind, GraphError, Id, StateVersion, TransactionError,
};

use crate::checkpoint::{CheckpointManager, Committed};
use crate::config::RuntimeConfig;
use crate::entity_graph::Snapshot;

/// Node-local storage of algorithm contexts.
///
/// Contexts are not part of the ledger state. The last stored context wins.
pub trait ContextStore {
    fn load(&self, algorithm: &AlgorithmId) -> std::io::Result<Option<Context>>;

    fn store(&mut self, algorithm: &AlgorithmId, context: Context) -> std::io::Result<()>;

    /// Remove the context of `algorithm`. Returns `false` if there was none.
    fn reset(&mut self, algorithm: &AlgorithmId) -> std::io::Result<bool>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryContextStore {
    contexts: HashMap<AlgorithmId, Context>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MemoryContextStore {
    fn load(&self, algorithm: &AlgorithmId) -> std::io::Result<Option<Context>> {
        Ok(self.contexts.get(algorithm).cloned())
    }

    fn store(&mut self, algorithm: &AlgorithmId, context: Context) -> std::io::Result<()> {
        self.contexts.insert(algorithm.clone(), context);
        Ok(())
    }

    fn reset(&mut self, algorithm: &AlgorithmId) -> std::io::Result<bool> {
        Ok(self.contexts.remove(algorithm).is_some())
    }
}

/// [GraphAnnotator] that buffers the annotations of one execution.
///
/// Annotations are checked against the snapshot the algorithm reads.
pub struct Annotations<'a, F: AnnotatedField> {
    reader: &'a dyn GraphReader,
    values: BTreeMap<Id, F::Value>,
}

impl<'a, F: AnnotatedField> Annotations<'a, F> {
    pub fn new(reader: &'a dyn GraphReader) -> Self {
        Annotations {
            reader,
            values: BTreeMap::new(),
        }
    }

    pub fn into_values(self) -> BTreeMap<Id, F::Value> {
        self.values
    }
}

impl<'a, F: AnnotatedField> GraphAnnotator<F> for Annotations<'a, F> {
    fn write_annotation(&mut self, id: &Id, value: F::Value) -> Result<(), GraphError> {
        let node = NodeId::new(F::KIND, id.clone());
        if self.reader.get_node(&node).is_none() {
            return Err(GraphError::NodeNotFound(node));
        }
        self.values.insert(id.clone(), value);
        Ok(())
    }
}

/// Result of a successful execution that has not been committed yet.
pub struct Execution<A: GraphAlgorithm> {
    pub algorithm: AlgorithmId,
    /// Version of the snapshot the algorithm ran against.
    pub version: StateVersion,
    pub context: Context,
    /// SCALE encoded output.
    pub output: Option<Vec<u8>>,
    pub annotations: BTreeMap<Id, <A::Field as AnnotatedField>::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("algorithm execution was cancelled")]
    Cancelled,

    #[error("algorithm execution failed: {0}")]
    Aborted(String),

    #[error(transparent)]
    Commit(#[from] TransactionError),

    #[error("context storage failed: {0}")]
    Context(#[from] std::io::Error),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Cancelled => ErrorKind::Cancelled,
            RunError::Aborted(_) | RunError::Context(_) => ErrorKind::Aborted,
            RunError::Commit(error) => error.kind(),
        }
    }
}

pub struct AlgorithmRunner {
    timeout: Option<std::time::Duration>,
}

impl AlgorithmRunner {
    pub fn new(config: &RuntimeConfig) -> Self {
        AlgorithmRunner {
            timeout: config.algorithm_timeout(),
        }
    }

    /// Environment for running `algorithm` against `snapshot`.
    ///
    /// The seed only depends on the algorithm and the graph content. The configured timeout
    /// is added to `interrupt`.
    pub fn env(
        &self,
        algorithm: &AlgorithmId,
        snapshot: &Snapshot,
        interrupt: &Interrupt,
    ) -> ExecutionEnv {
        let seed = hash_of(&(algorithm, snapshot.content_hash())).0;
        let interrupt = match self.timeout {
            Some(timeout) => interrupt.until(Instant::now() + timeout),
            None => interrupt.clone(),
        };
        ExecutionEnv { seed, interrupt }
    }

    /// Run `algorithm` against `snapshot` with its stored context.
    ///
    /// Nothing is written. Fails with [RunError::Cancelled] if `interrupt` fires before or
    /// during the execution, even if the algorithm returned a result.
    pub fn execute<A: GraphAlgorithm>(
        &self,
        algorithm: &A,
        snapshot: &Snapshot,
        contexts: &dyn ContextStore,
        interrupt: &Interrupt,
    ) -> Result<Execution<A>, RunError> {
        let id = algorithm.id();
        let env = self.env(&id, snapshot, interrupt);
        if env.interrupt.is_interrupted() {
            return Err(RunError::Cancelled);
        }
        let context = match contexts.load(&id)? {
            Some(context) => context,
            None => algorithm.default_context(),
        };

        let mut annotations = Annotations::<A::Field>::new(snapshot);
        let result = algorithm.execute(&context, snapshot, &mut annotations, &env);
        if env.interrupt.is_interrupted() {
            return Err(RunError::Cancelled);
        }
        let (context, output) = result.map_err(|error| RunError::Aborted(error.to_string()))?;

        Ok(Execution {
            algorithm: id,
            version: snapshot.version(),
            context,
            output: output.map(|output| output.encode()),
            annotations: annotations.into_values(),
        })
    }

    /// Commit the annotations and output of `execution`, then store its context.
    ///
    /// Once the commit succeeded the run is successful. If the context cannot be stored
    /// afterwards the next run starts from the previously stored context.
    pub fn commit<A: GraphAlgorithm>(
        &self,
        execution: Execution<A>,
        checkpoints: &mut CheckpointManager,
        contexts: &mut dyn ContextStore,
    ) -> Result<Committed, RunError> {
        let committed = checkpoints.commit_execution::<A::Field>(
            &execution.algorithm,
            execution.version,
            &execution.annotations,
            execution.output,
        )?;
        if let Err(error) = contexts.store(&execution.algorithm, execution.context) {
            log::warn!(
                "failed to store context of {} after {}: {}",
                execution.algorithm,
                committed.version,
                error
            );
        }
        log::info!(
            "committed {} annotations of {} computed at {} in {}",
            execution.annotations.len(),
            execution.algorithm,
            execution.version,
            committed.version
        );
        Ok(committed)
    }

    /// Execute `algorithm` against the head and commit the result.
    pub fn run<A: GraphAlgorithm>(
        &self,
        algorithm: &A,
        checkpoints: &mut CheckpointManager,
        contexts: &mut dyn ContextStore,
        interrupt: &Interrupt,
    ) -> Result<Committed, RunError> {
        let snapshot = checkpoints.snapshot();
        let started = Instant::now();
        let execution = self.execute(algorithm, &snapshot, &*contexts, interrupt)?;
        log::info!(
            "ran {} against {} in {:?}",
            execution.algorithm,
            execution.version,
            started.elapsed()
        );
        self.commit(execution, checkpoints, contexts)
    }

    /// Drop the stored context of `algorithm`. The next run starts from its default.
    pub fn reset_context<A: GraphAlgorithm>(
        &self,
        algorithm: &A,
        contexts: &mut dyn ContextStore,
    ) -> Result<bool, RunError> {
        Ok(contexts.reset(&algorithm.id())?)
    }
}
