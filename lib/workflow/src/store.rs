//! Thread checkpoint storage.
//!
//! Every pause point persists the full workflow state together with a
//! pointer to the step awaiting execution, so a thread can be resumed from
//! durable storage alone.

use crate::error::StoreError;
use crate::state::WorkflowState;
use crate::step::StepName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oryjin_core::ThreadId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Where a thread stands in its workflow.
///
/// The pointer always names the step that has *not yet* executed, so a
/// snapshot loaded after a crash replays nothing that already committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "step")]
pub enum StepPointer {
    /// The named step is next to execute.
    At(StepName),
    /// The named step is next to execute, but the run paused for external
    /// input before it.
    AwaitingInput(StepName),
    /// The workflow ran to completion.
    Done,
}

impl StepPointer {
    /// The step the pointer names, if any.
    #[must_use]
    pub fn step(&self) -> Option<&StepName> {
        match self {
            Self::At(step) | Self::AwaitingInput(step) => Some(step),
            Self::Done => None,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// A persisted checkpoint: pointer plus full state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSnapshot<S> {
    pub pointer: StepPointer,
    pub state: S,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<S> ThreadSnapshot<S> {
    #[must_use]
    pub fn new(pointer: StepPointer, state: S) -> Self {
        let now = Utc::now();
        Self {
            pointer,
            state,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Durable storage for workflow threads.
#[async_trait]
pub trait ThreadStore<S: WorkflowState>: Send + Sync {
    /// Creates a new thread and returns its identifier.
    async fn create(&self, pointer: StepPointer, state: S) -> Result<ThreadId, StoreError>;

    /// Loads the latest snapshot of a thread.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for unknown identifiers.
    async fn get(&self, thread_id: &ThreadId) -> Result<ThreadSnapshot<S>, StoreError>;

    /// Replaces a thread's snapshot with a new pointer and state.
    async fn save(
        &self,
        thread_id: &ThreadId,
        pointer: StepPointer,
        state: S,
    ) -> Result<(), StoreError>;

    /// Applies an update to the stored state without moving the pointer.
    async fn patch_values(&self, thread_id: &ThreadId, update: S::Update)
    -> Result<(), StoreError>;
}

/// In-memory [`ThreadStore`], for tests and single-process deployments.
#[derive(Debug)]
pub struct InMemoryThreadStore<S> {
    threads: Mutex<HashMap<ThreadId, ThreadSnapshot<S>>>,
}

impl<S> InMemoryThreadStore<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ThreadId, ThreadSnapshot<S>>> {
        self.threads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S> Default for InMemoryThreadStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: WorkflowState> ThreadStore<S> for InMemoryThreadStore<S> {
    async fn create(&self, pointer: StepPointer, state: S) -> Result<ThreadId, StoreError> {
        let thread_id = ThreadId::new();
        self.lock()
            .insert(thread_id.clone(), ThreadSnapshot::new(pointer, state));
        Ok(thread_id)
    }

    async fn get(&self, thread_id: &ThreadId) -> Result<ThreadSnapshot<S>, StoreError> {
        self.lock()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                thread_id: thread_id.clone(),
            })
    }

    async fn save(
        &self,
        thread_id: &ThreadId,
        pointer: StepPointer,
        state: S,
    ) -> Result<(), StoreError> {
        let mut threads = self.lock();
        match threads.get_mut(thread_id) {
            Some(snapshot) => {
                snapshot.pointer = pointer;
                snapshot.state = state;
                snapshot.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                thread_id: thread_id.clone(),
            }),
        }
    }

    async fn patch_values(
        &self,
        thread_id: &ThreadId,
        update: S::Update,
    ) -> Result<(), StoreError> {
        let mut threads = self.lock();
        match threads.get_mut(thread_id) {
            Some(snapshot) => {
                snapshot.state.apply(update);
                snapshot.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                thread_id: thread_id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestState {
        log: Vec<String>,
    }

    impl WorkflowState for TestState {
        type Update = Vec<String>;

        fn apply(&mut self, update: Vec<String>) {
            self.log.extend(update);
        }

        fn interrupt_prompt(&self) -> Option<String> {
            self.log.last().cloned()
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryThreadStore::new();
        let state = TestState {
            log: vec!["started".to_string()],
        };

        let thread_id = store
            .create(StepPointer::At(StepName::from("first")), state.clone())
            .await
            .unwrap();

        let snapshot = store.get(&thread_id).await.unwrap();
        assert_eq!(snapshot.pointer, StepPointer::At(StepName::from("first")));
        assert_eq!(snapshot.state, state);
    }

    #[tokio::test]
    async fn save_replaces_pointer_and_state() {
        let store = InMemoryThreadStore::new();
        let thread_id = store
            .create(StepPointer::At(StepName::from("first")), TestState::default())
            .await
            .unwrap();

        store
            .save(
                &thread_id,
                StepPointer::AwaitingInput(StepName::from("second")),
                TestState {
                    log: vec!["ran first".to_string()],
                },
            )
            .await
            .unwrap();

        let snapshot = store.get(&thread_id).await.unwrap();
        assert_eq!(
            snapshot.pointer,
            StepPointer::AwaitingInput(StepName::from("second"))
        );
        assert_eq!(snapshot.state.log, vec!["ran first".to_string()]);
        assert!(snapshot.updated_at >= snapshot.created_at);
    }

    #[tokio::test]
    async fn patch_values_applies_without_moving_pointer() {
        let store = InMemoryThreadStore::new();
        let thread_id = store
            .create(
                StepPointer::AwaitingInput(StepName::from("second")),
                TestState {
                    log: vec!["one".to_string()],
                },
            )
            .await
            .unwrap();

        store
            .patch_values(&thread_id, vec!["two".to_string()])
            .await
            .unwrap();

        let snapshot = store.get(&thread_id).await.unwrap();
        assert_eq!(
            snapshot.pointer,
            StepPointer::AwaitingInput(StepName::from("second"))
        );
        assert_eq!(snapshot.state.log, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let store: InMemoryThreadStore<TestState> = InMemoryThreadStore::new();
        let missing = ThreadId::new();

        let result = store.get(&missing).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        let result = store
            .save(&missing, StepPointer::Done, TestState::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn pointer_serializes_tagged() {
        let pointer = StepPointer::AwaitingInput(StepName::from("await_input"));
        let json = serde_json::to_string(&pointer).unwrap();
        assert_eq!(
            json,
            r#"{"status":"awaiting_input","step":"await_input"}"#
        );

        let done = serde_json::to_string(&StepPointer::Done).unwrap();
        assert_eq!(done, r#"{"status":"done"}"#);

        let back: StepPointer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pointer);
    }
}
