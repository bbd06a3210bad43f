//! Workflow steps and the step registry.
//!
//! A step is a named, pure transition function over state: it receives the
//! full current state and returns only the fields it changes. Steps may call
//! external collaborators but must not retain handles across invocations,
//! and must not mutate the input state — merging is the engine's job.

use crate::error::{CollaboratorError, GraphError};
use crate::state::WorkflowState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The name of a step within a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new step name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StepName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A named transition function over workflow state.
#[async_trait]
pub trait Step<S: WorkflowState>: Send + Sync {
    /// Executes the step against the current state.
    ///
    /// # Errors
    ///
    /// Returns a [`CollaboratorError`] if an external service call fails.
    /// Domain validation failures are not errors: they are expressed in the
    /// returned update (a message plus a routing flag).
    async fn run(&self, state: &S) -> Result<S::Update, CollaboratorError>;
}

/// A pure no-op step, used as a named interrupt marker.
///
/// Markers exist so "await input" is a distinct step in the graph: the
/// engine pauses *before* a declared interrupt step, and the marker itself
/// changes nothing once it finally runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerStep;

#[async_trait]
impl<S: WorkflowState> Step<S> for MarkerStep {
    async fn run(&self, _state: &S) -> Result<S::Update, CollaboratorError> {
        Ok(S::Update::default())
    }
}

/// Registry mapping step names to transition functions.
pub struct StepRegistry<S: WorkflowState> {
    steps: HashMap<StepName, Arc<dyn Step<S>>>,
}

impl<S: WorkflowState> StepRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Registers a step under the given name.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateStep` if the name is already taken.
    pub fn register(
        &mut self,
        name: StepName,
        step: Arc<dyn Step<S>>,
    ) -> Result<(), GraphError> {
        if self.steps.contains_key(&name) {
            return Err(GraphError::DuplicateStep { step: name });
        }
        self.steps.insert(name, step);
        Ok(())
    }

    /// Looks up a step by name.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownStep` if no step is registered under the
    /// name.
    pub fn get(&self, name: &StepName) -> Result<&Arc<dyn Step<S>>, GraphError> {
        self.steps
            .get(name)
            .ok_or_else(|| GraphError::UnknownStep { step: name.clone() })
    }

    /// Returns true if a step is registered under the name.
    #[must_use]
    pub fn contains(&self, name: &StepName) -> bool {
        self.steps.contains_key(name)
    }

    /// Iterates over the registered step names.
    pub fn names(&self) -> impl Iterator<Item = &StepName> {
        self.steps.keys()
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<S: WorkflowState> Default for StepRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WorkflowState> fmt::Debug for StepRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct TestState {
        log: Vec<String>,
    }

    impl WorkflowState for TestState {
        type Update = Vec<String>;

        fn apply(&mut self, update: Self::Update) {
            self.log.extend(update);
        }

        fn interrupt_prompt(&self) -> Option<String> {
            self.log.last().cloned()
        }
    }

    struct RecordStep {
        entry: &'static str,
    }

    #[async_trait]
    impl Step<TestState> for RecordStep {
        async fn run(&self, _state: &TestState) -> Result<Vec<String>, CollaboratorError> {
            Ok(vec![self.entry.to_string()])
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry: StepRegistry<TestState> = StepRegistry::new();
        registry
            .register(StepName::from("record"), Arc::new(RecordStep { entry: "a" }))
            .unwrap();

        assert!(registry.contains(&StepName::from("record")));
        assert!(registry.get(&StepName::from("record")).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry: StepRegistry<TestState> = StepRegistry::new();
        registry
            .register(StepName::from("record"), Arc::new(RecordStep { entry: "a" }))
            .unwrap();

        let result =
            registry.register(StepName::from("record"), Arc::new(RecordStep { entry: "b" }));
        assert!(matches!(result, Err(GraphError::DuplicateStep { .. })));
    }

    #[test]
    fn unknown_step_lookup_fails() {
        let registry: StepRegistry<TestState> = StepRegistry::new();
        let result = registry.get(&StepName::from("missing"));
        assert!(matches!(result, Err(GraphError::UnknownStep { .. })));
    }

    #[tokio::test]
    async fn marker_step_returns_empty_update() {
        let marker = MarkerStep;
        let state = TestState {
            log: vec!["before".to_string()],
        };

        let update = Step::<TestState>::run(&marker, &state).await.unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn step_name_display_and_serde() {
        let name = StepName::from("collect_data");
        assert_eq!(name.to_string(), "collect_data");

        let json = serde_json::to_string(&name).expect("serialize");
        assert_eq!(json, "\"collect_data\"");
        let parsed: StepName = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(name, parsed);
    }
}
