//! Workflow graph model.
//!
//! A graph is an immutable set of steps plus exactly one outgoing transition
//! per step: a direct edge, a conditional edge resolved by a router, or the
//! terminal marker. The builder validates the whole structure up front so a
//! malformed graph fails at build time, never mid-run.

use crate::error::GraphError;
use crate::state::WorkflowState;
use crate::step::{Step, StepName, StepRegistry};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A conditional edge: a pure function of state choosing the next step from
/// a pre-declared finite candidate set.
pub struct Router<S> {
    candidates: Vec<StepName>,
    decide: Arc<dyn Fn(&S) -> StepName + Send + Sync>,
}

impl<S> Router<S> {
    /// Creates a router over the given candidate set.
    pub fn new(
        candidates: Vec<StepName>,
        decide: impl Fn(&S) -> StepName + Send + Sync + 'static,
    ) -> Self {
        Self {
            candidates,
            decide: Arc::new(decide),
        }
    }

    /// Returns the declared candidate steps.
    #[must_use]
    pub fn candidates(&self) -> &[StepName] {
        &self.candidates
    }

    fn route(&self, state: &S) -> StepName {
        (self.decide)(state)
    }
}

impl<S> Clone for Router<S> {
    fn clone(&self) -> Self {
        Self {
            candidates: self.candidates.clone(),
            decide: Arc::clone(&self.decide),
        }
    }
}

impl<S> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}

/// The single outgoing transition of a step.
pub enum Transition<S> {
    /// Unconditional edge to the named step.
    Direct(StepName),
    /// Conditional edge resolved by a router at run time.
    Conditional(Router<S>),
    /// Terminal marker: the run completes after this step executes.
    End,
}

impl<S> fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(next) => f.debug_tuple("Direct").field(next).finish(),
            Self::Conditional(router) => f.debug_tuple("Conditional").field(router).finish(),
            Self::End => f.write_str("End"),
        }
    }
}

/// An immutable, validated workflow graph.
pub struct WorkflowGraph<S: WorkflowState> {
    registry: StepRegistry<S>,
    transitions: HashMap<StepName, Transition<S>>,
    start: StepName,
}

impl<S: WorkflowState> WorkflowGraph<S> {
    /// Starts building a graph.
    #[must_use]
    pub fn builder() -> GraphBuilder<S> {
        GraphBuilder::new()
    }

    /// Returns the start step.
    #[must_use]
    pub fn start_step(&self) -> &StepName {
        &self.start
    }

    /// Returns the number of steps in the graph.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.registry.len()
    }

    /// Looks up a step's transition function by name.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownStep` for unregistered names.
    pub fn step(&self, name: &StepName) -> Result<&Arc<dyn Step<S>>, GraphError> {
        self.registry.get(name)
    }

    /// Returns true if the run completes after the named step executes.
    #[must_use]
    pub fn is_terminal(&self, name: &StepName) -> bool {
        matches!(self.transitions.get(name), Some(Transition::End))
    }

    /// Resolves the step that follows `name` given the current state.
    ///
    /// Returns `None` when `name` is terminal.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownStep` for unregistered names, or
    /// `GraphError::RouteOutsideCandidates` if a router function returns a
    /// step it never declared.
    pub fn transition(&self, name: &StepName, state: &S) -> Result<Option<StepName>, GraphError> {
        match self.transitions.get(name) {
            None => Err(GraphError::UnknownStep { step: name.clone() }),
            Some(Transition::End) => Ok(None),
            Some(Transition::Direct(next)) => Ok(Some(next.clone())),
            Some(Transition::Conditional(router)) => {
                let chose = router.route(state);
                if !router.candidates().contains(&chose) {
                    return Err(GraphError::RouteOutsideCandidates {
                        step: name.clone(),
                        chose,
                    });
                }
                Ok(Some(chose))
            }
        }
    }
}

impl<S: WorkflowState> fmt::Debug for WorkflowGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("start", &self.start)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

/// Builder for [`WorkflowGraph`].
///
/// All structural checks are deferred to [`GraphBuilder::build`], so wiring
/// can be written as one declarative chain.
pub struct GraphBuilder<S: WorkflowState> {
    steps: Vec<(StepName, Arc<dyn Step<S>>)>,
    transitions: Vec<(StepName, Transition<S>)>,
    start: Option<StepName>,
}

impl<S: WorkflowState> GraphBuilder<S> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            transitions: Vec::new(),
            start: None,
        }
    }

    /// Registers a step under the given name.
    #[must_use]
    pub fn step(mut self, name: impl Into<StepName>, step: impl Step<S> + 'static) -> Self {
        self.steps.push((name.into(), Arc::new(step)));
        self
    }

    /// Registers an already-shared step under the given name.
    #[must_use]
    pub fn step_arc(mut self, name: impl Into<StepName>, step: Arc<dyn Step<S>>) -> Self {
        self.steps.push((name.into(), step));
        self
    }

    /// Declares the start step.
    #[must_use]
    pub fn start(mut self, name: impl Into<StepName>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Adds an unconditional edge.
    #[must_use]
    pub fn edge(mut self, from: impl Into<StepName>, to: impl Into<StepName>) -> Self {
        self.transitions
            .push((from.into(), Transition::Direct(to.into())));
        self
    }

    /// Adds a conditional edge resolved by `decide` among `candidates`.
    #[must_use]
    pub fn conditional<N>(
        mut self,
        from: impl Into<StepName>,
        candidates: impl IntoIterator<Item = N>,
        decide: impl Fn(&S) -> StepName + Send + Sync + 'static,
    ) -> Self
    where
        N: Into<StepName>,
    {
        let candidates = candidates.into_iter().map(Into::into).collect();
        self.transitions
            .push((from.into(), Transition::Conditional(Router::new(candidates, decide))));
        self
    }

    /// Marks a step as terminal: the run completes after it executes.
    #[must_use]
    pub fn terminal(mut self, name: impl Into<StepName>) -> Self {
        self.transitions.push((name.into(), Transition::End));
        self
    }

    /// Validates the wiring and produces the immutable graph.
    ///
    /// Checks, in order: unique step names; a declared, registered start
    /// step; exactly one transition per step with all targets and router
    /// candidates registered; and reachability of every step from the start.
    ///
    /// # Errors
    ///
    /// Returns the first `GraphError` found.
    pub fn build(self) -> Result<WorkflowGraph<S>, GraphError> {
        let mut registry = StepRegistry::new();
        for (name, step) in self.steps {
            registry.register(name, step)?;
        }

        let start = self.start.ok_or(GraphError::MissingStart)?;
        if !registry.contains(&start) {
            return Err(GraphError::UnknownStep { step: start });
        }

        let mut transitions: HashMap<StepName, Transition<S>> = HashMap::new();
        for (from, transition) in self.transitions {
            if !registry.contains(&from) {
                return Err(GraphError::UnknownStep { step: from });
            }
            match &transition {
                Transition::Direct(to) => {
                    if !registry.contains(to) {
                        return Err(GraphError::UnknownStep { step: to.clone() });
                    }
                }
                Transition::Conditional(router) => {
                    if router.candidates().is_empty() {
                        return Err(GraphError::EmptyCandidates { step: from });
                    }
                    for candidate in router.candidates() {
                        if !registry.contains(candidate) {
                            return Err(GraphError::UnknownStep {
                                step: candidate.clone(),
                            });
                        }
                    }
                }
                Transition::End => {}
            }
            if transitions.insert(from.clone(), transition).is_some() {
                return Err(GraphError::DuplicateTransition { step: from });
            }
        }

        for name in registry.names() {
            if !transitions.contains_key(name) {
                return Err(GraphError::MissingTransition { step: name.clone() });
            }
        }

        check_reachability(&registry, &transitions, &start)?;

        Ok(WorkflowGraph {
            registry,
            transitions,
            start,
        })
    }
}

impl<S: WorkflowState> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies every registered step is reachable from the start step.
///
/// Conditional edges count an edge to each declared candidate, so
/// reachability is over the full candidate envelope.
fn check_reachability<S: WorkflowState>(
    registry: &StepRegistry<S>,
    transitions: &HashMap<StepName, Transition<S>>,
    start: &StepName,
) -> Result<(), GraphError> {
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let mut indices: HashMap<&StepName, NodeIndex> = HashMap::new();

    for name in registry.names() {
        indices.insert(name, graph.add_node(()));
    }

    for (from, transition) in transitions {
        let from_index = indices[from];
        match transition {
            Transition::Direct(to) => {
                graph.add_edge(from_index, indices[to], ());
            }
            Transition::Conditional(router) => {
                for candidate in router.candidates() {
                    graph.add_edge(from_index, indices[candidate], ());
                }
            }
            Transition::End => {}
        }
    }

    let mut reached: HashSet<NodeIndex> = HashSet::new();
    let mut dfs = Dfs::new(&graph, indices[start]);
    while let Some(index) = dfs.next(&graph) {
        reached.insert(index);
    }

    for (name, index) in &indices {
        if !reached.contains(index) {
            return Err(GraphError::UnreachableStep {
                step: (*name).clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::step::MarkerStep;
    use async_trait::async_trait;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct TestState {
        log: Vec<String>,
        ready: bool,
    }

    #[derive(Debug, Clone, Default)]
    struct TestUpdate {
        log: Vec<String>,
        ready: Option<bool>,
    }

    impl WorkflowState for TestState {
        type Update = TestUpdate;

        fn apply(&mut self, update: TestUpdate) {
            self.log.extend(update.log);
            if let Some(ready) = update.ready {
                self.ready = ready;
            }
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
        async fn run(&self, _state: &TestState) -> Result<TestUpdate, CollaboratorError> {
            Ok(TestUpdate {
                log: vec![self.entry.to_string()],
                ready: None,
            })
        }
    }

    fn two_step_graph() -> GraphBuilder<TestState> {
        WorkflowGraph::builder()
            .step("first", RecordStep { entry: "first" })
            .step("second", RecordStep { entry: "second" })
            .start("first")
            .edge("first", "second")
            .terminal("second")
    }

    #[test]
    fn build_valid_graph() {
        let graph = two_step_graph().build().expect("valid graph");

        assert_eq!(graph.step_count(), 2);
        assert_eq!(graph.start_step(), &StepName::from("first"));
        assert!(graph.is_terminal(&StepName::from("second")));
        assert!(!graph.is_terminal(&StepName::from("first")));
    }

    #[test]
    fn direct_transition_resolves() {
        let graph = two_step_graph().build().unwrap();
        let state = TestState::default();

        let next = graph
            .transition(&StepName::from("first"), &state)
            .unwrap();
        assert_eq!(next, Some(StepName::from("second")));

        let after_terminal = graph
            .transition(&StepName::from("second"), &state)
            .unwrap();
        assert_eq!(after_terminal, None);
    }

    #[test]
    fn conditional_transition_follows_state() {
        let graph = WorkflowGraph::builder()
            .step("check", MarkerStep)
            .step("go", MarkerStep)
            .step("wait", MarkerStep)
            .start("check")
            .conditional("check", ["go", "wait"], |state: &TestState| {
                if state.ready {
                    StepName::from("go")
                } else {
                    StepName::from("wait")
                }
            })
            .edge("wait", "check")
            .terminal("go")
            .build()
            .unwrap();

        let mut state = TestState::default();
        assert_eq!(
            graph.transition(&StepName::from("check"), &state).unwrap(),
            Some(StepName::from("wait"))
        );

        state.ready = true;
        assert_eq!(
            graph.transition(&StepName::from("check"), &state).unwrap(),
            Some(StepName::from("go"))
        );
    }

    #[test]
    fn build_rejects_missing_start() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("only", MarkerStep)
            .terminal("only")
            .build();
        assert!(matches!(result, Err(GraphError::MissingStart)));
    }

    #[test]
    fn build_rejects_unknown_edge_target() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("first", MarkerStep)
            .start("first")
            .edge("first", "missing")
            .build();
        assert!(matches!(result, Err(GraphError::UnknownStep { .. })));
    }

    #[test]
    fn build_rejects_unknown_router_candidate() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("check", MarkerStep)
            .step("go", MarkerStep)
            .start("check")
            .conditional("check", ["go", "missing"], |_: &TestState| {
                StepName::from("go")
            })
            .terminal("go")
            .build();
        assert!(matches!(result, Err(GraphError::UnknownStep { .. })));
    }

    #[test]
    fn build_rejects_step_without_transition() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("first", MarkerStep)
            .step("dangling", MarkerStep)
            .start("first")
            .edge("first", "dangling")
            .build();
        assert!(matches!(
            result,
            Err(GraphError::MissingTransition { .. })
        ));
    }

    #[test]
    fn build_rejects_duplicate_transition() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("first", MarkerStep)
            .step("second", MarkerStep)
            .start("first")
            .edge("first", "second")
            .terminal("first")
            .terminal("second")
            .build();
        assert!(matches!(
            result,
            Err(GraphError::DuplicateTransition { .. })
        ));
    }

    #[test]
    fn build_rejects_unreachable_step() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("first", MarkerStep)
            .step("island", MarkerStep)
            .start("first")
            .terminal("first")
            .terminal("island")
            .build();
        assert!(matches!(result, Err(GraphError::UnreachableStep { .. })));
    }

    #[test]
    fn build_rejects_empty_candidates() {
        let result = WorkflowGraph::<TestState>::builder()
            .step("check", MarkerStep)
            .start("check")
            .conditional("check", Vec::<StepName>::new(), |_: &TestState| {
                StepName::from("check")
            })
            .build();
        assert!(matches!(result, Err(GraphError::EmptyCandidates { .. })));
    }

    #[test]
    fn router_outside_candidates_is_runtime_error() {
        let graph = WorkflowGraph::builder()
            .step("check", MarkerStep)
            .step("go", MarkerStep)
            .start("check")
            .conditional("check", ["go"], |_: &TestState| StepName::from("check"))
            .terminal("go")
            .build()
            .unwrap();

        let result = graph.transition(&StepName::from("check"), &TestState::default());
        assert!(matches!(
            result,
            Err(GraphError::RouteOutsideCandidates { .. })
        ));
    }

    #[test]
    fn cycles_through_routers_are_allowed() {
        // The clarification loop shape: validate routes back through a
        // marker that re-enters collection.
        let graph = WorkflowGraph::builder()
            .step("collect", RecordStep { entry: "collect" })
            .step("validate", RecordStep { entry: "validate" })
            .step("await_input", MarkerStep)
            .step("done", MarkerStep)
            .start("collect")
            .edge("collect", "validate")
            .conditional("validate", ["done", "await_input"], |state: &TestState| {
                if state.ready {
                    StepName::from("done")
                } else {
                    StepName::from("await_input")
                }
            })
            .edge("await_input", "collect")
            .terminal("done")
            .build();

        assert!(graph.is_ok());
    }
}
