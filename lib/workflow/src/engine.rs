//! Workflow execution engine.
//!
//! The engine drives a thread step by step, checkpointing after every step
//! so a run can stop at a declared interrupt point, survive a process
//! restart, and pick up exactly where it left off when resumed with
//! external input.

use crate::error::EngineError;
use crate::graph::WorkflowGraph;
use crate::state::WorkflowState;
use crate::step::StepName;
use crate::store::{StepPointer, ThreadSnapshot, ThreadStore};
use oryjin_core::ThreadId;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

/// How a run segment ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run paused before the named step, waiting for external input.
    /// `prompt` carries the message the workflow wants relayed to whoever
    /// supplies that input.
    Interrupted {
        at: StepName,
        prompt: Option<String>,
    },
    /// The workflow ran to completion.
    Completed,
    /// The named step failed. The thread's checkpoint is untouched, so a
    /// later resume retries the same step.
    Error { at: StepName, message: String },
}

/// Drives workflow threads over a [`WorkflowGraph`] and a [`ThreadStore`].
pub struct Engine<S: WorkflowState, T: ThreadStore<S>> {
    graph: WorkflowGraph<S>,
    store: T,
    interrupt_before: HashSet<StepName>,
    in_flight: Mutex<HashSet<ThreadId>>,
}

impl<S: WorkflowState, T: ThreadStore<S>> Engine<S, T> {
    #[must_use]
    pub fn new(graph: WorkflowGraph<S>, store: T) -> Self {
        Self {
            graph,
            store,
            interrupt_before: HashSet::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Declares steps the run must pause before, handing control back to
    /// the caller instead of executing them.
    #[must_use]
    pub fn with_interrupt_before<N>(mut self, steps: impl IntoIterator<Item = N>) -> Self
    where
        N: Into<StepName>,
    {
        self.interrupt_before = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Creates a new thread, merges `initial` into default state (the
    /// opening human message is in state before any step runs), and runs
    /// until the thread completes, pauses at an interrupt point, or a step
    /// fails.
    #[instrument(skip_all)]
    pub async fn start(&self, initial: S::Update) -> Result<(ThreadId, RunOutcome), EngineError> {
        let start = self.graph.start_step().clone();
        let mut state = S::default();
        state.apply(initial);
        let thread_id = self
            .store
            .create(StepPointer::At(start.clone()), state.clone())
            .await?;
        debug!(%thread_id, step = %start, "thread created");

        let _guard = RunGuard::acquire(&self.in_flight, thread_id)?;
        let outcome = self.drive(&thread_id, start, state).await?;
        Ok((thread_id, outcome))
    }

    /// Resumes a paused thread, folding `update` into its state exactly
    /// once before the pending step executes.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ThreadBusy` if a run segment for this thread
    /// is already in flight, and `EngineError::ThreadNotInterruptible` if
    /// the thread already completed.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn resume(
        &self,
        thread_id: ThreadId,
        update: S::Update,
    ) -> Result<RunOutcome, EngineError> {
        let _guard = RunGuard::acquire(&self.in_flight, thread_id)?;

        let snapshot = self.store.get(&thread_id).await?;
        let step = match snapshot.pointer {
            StepPointer::At(step) | StepPointer::AwaitingInput(step) => step,
            StepPointer::Done => {
                return Err(EngineError::ThreadNotInterruptible { thread_id });
            }
        };

        // Commit the merged state before executing anything, so the input
        // is not lost if the pending step fails.
        let mut state = snapshot.state;
        state.apply(update);
        self.store
            .save(&thread_id, StepPointer::At(step.clone()), state.clone())
            .await?;
        debug!(step = %step, "thread resumed");

        self.drive(&thread_id, step, state).await
    }

    /// Loads the latest snapshot of a thread.
    pub async fn state(&self, thread_id: &ThreadId) -> Result<ThreadSnapshot<S>, EngineError> {
        Ok(self.store.get(thread_id).await?)
    }

    /// Executes steps from `current` until the run completes, reaches an
    /// interrupt point, or a step fails. Checkpoints after every step; a
    /// failed step checkpoints nothing, leaving the thread retryable.
    async fn drive(
        &self,
        thread_id: &ThreadId,
        mut current: StepName,
        mut state: S,
    ) -> Result<RunOutcome, EngineError> {
        loop {
            let step = self.graph.step(&current)?;
            debug!(step = %current, "executing step");
            match step.run(&state).await {
                Ok(update) => state.apply(update),
                Err(error) => {
                    warn!(step = %current, %error, "step failed");
                    return Ok(RunOutcome::Error {
                        at: current,
                        message: error.to_string(),
                    });
                }
            }

            match self.graph.transition(&current, &state)? {
                None => {
                    self.store
                        .save(thread_id, StepPointer::Done, state)
                        .await?;
                    debug!(step = %current, "thread completed");
                    return Ok(RunOutcome::Completed);
                }
                Some(next) if self.interrupt_before.contains(&next) => {
                    self.store
                        .save(
                            thread_id,
                            StepPointer::AwaitingInput(next.clone()),
                            state.clone(),
                        )
                        .await?;
                    debug!(step = %next, "thread interrupted");
                    return Ok(RunOutcome::Interrupted {
                        at: next,
                        prompt: state.interrupt_prompt(),
                    });
                }
                Some(next) => {
                    self.store
                        .save(thread_id, StepPointer::At(next.clone()), state.clone())
                        .await?;
                    current = next;
                }
            }
        }
    }
}

/// Marks a thread as in flight for the lifetime of a run segment.
struct RunGuard<'a> {
    in_flight: &'a Mutex<HashSet<ThreadId>>,
    thread_id: ThreadId,
}

impl<'a> RunGuard<'a> {
    fn acquire(
        in_flight: &'a Mutex<HashSet<ThreadId>>,
        thread_id: ThreadId,
    ) -> Result<Self, EngineError> {
        let mut set = lock_in_flight(in_flight);
        if !set.insert(thread_id) {
            return Err(EngineError::ThreadBusy { thread_id });
        }
        Ok(Self {
            in_flight,
            thread_id,
        })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        lock_in_flight(self.in_flight).remove(&self.thread_id);
    }
}

fn lock_in_flight(
    in_flight: &Mutex<HashSet<ThreadId>>,
) -> std::sync::MutexGuard<'_, HashSet<ThreadId>> {
    in_flight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
