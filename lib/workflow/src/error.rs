//! Error types for the workflow crate.
//!
//! Errors follow the layering of the engine:
//! - `GraphError`: malformed graph definitions; raised at build time, and for
//!   programmer errors detected while routing (never during normal operation)
//! - `StoreError`: thread store failures
//! - `CollaboratorError`: external-service failures inside a step; the thread
//!   pointer is left unmoved so the step can be retried
//! - `EngineError`: caller protocol violations on `start`/`resume`

use crate::step::StepName;
use oryjin_core::ThreadId;
use std::fmt;

/// Errors from graph construction and routing.
///
/// All variants indicate a misconfigured graph. They are detected when the
/// builder validates, with the exception of `RouteOutsideCandidates`, which
/// can only be observed once a router function runs against real state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A step name was referenced but never registered.
    UnknownStep { step: StepName },
    /// The same step name was registered twice.
    DuplicateStep { step: StepName },
    /// No start step was declared.
    MissingStart,
    /// A step was given more than one outgoing transition.
    DuplicateTransition { step: StepName },
    /// A non-terminal step has no outgoing transition.
    MissingTransition { step: StepName },
    /// A conditional edge declared an empty candidate set.
    EmptyCandidates { step: StepName },
    /// A step cannot be reached from the start step.
    UnreachableStep { step: StepName },
    /// A router returned a step outside its declared candidate set.
    RouteOutsideCandidates { step: StepName, chose: StepName },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownStep { step } => {
                write!(f, "unknown step: {step}")
            }
            Self::DuplicateStep { step } => {
                write!(f, "step registered twice: {step}")
            }
            Self::MissingStart => write!(f, "no start step declared"),
            Self::DuplicateTransition { step } => {
                write!(f, "step {step} has more than one outgoing transition")
            }
            Self::MissingTransition { step } => {
                write!(f, "step {step} has no outgoing transition")
            }
            Self::EmptyCandidates { step } => {
                write!(f, "conditional edge on step {step} declares no candidates")
            }
            Self::UnreachableStep { step } => {
                write!(f, "step {step} is unreachable from the start step")
            }
            Self::RouteOutsideCandidates { step, chose } => {
                write!(
                    f,
                    "router on step {step} chose {chose}, outside its declared candidates"
                )
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from thread store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No thread exists with the given identifier.
    NotFound { thread_id: ThreadId },
    /// The backing store failed to read or write a snapshot.
    Backend { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { thread_id } => write!(f, "thread not found: {thread_id}"),
            Self::Backend { message } => write!(f, "thread store failure: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Failure of an external collaborator call inside a step.
///
/// The engine persists no state change for the failed step, so a caller may
/// retry with `resume(thread_id, empty update)` once the collaborator is
/// healthy again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError {
    /// The collaborator that failed (e.g. "extraction", "clustering").
    pub service: String,
    /// Failure description.
    pub message: String,
}

impl CollaboratorError {
    /// Creates a new collaborator error.
    #[must_use]
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collaborator '{}' failed: {}", self.service, self.message)
    }
}

impl std::error::Error for CollaboratorError {}

/// Caller-visible errors from the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Graph configuration error surfaced while routing.
    Graph(GraphError),
    /// Thread store error.
    Store(StoreError),
    /// The thread has already reached its terminal step.
    ThreadNotInterruptible { thread_id: ThreadId },
    /// Another `resume` call for the same thread is still in flight.
    ThreadBusy { thread_id: ThreadId },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "graph error: {e}"),
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::ThreadNotInterruptible { thread_id } => {
                write!(f, "thread {thread_id} is not awaiting input")
            }
            Self::ThreadBusy { thread_id } => {
                write!(f, "thread {thread_id} already has a resume in flight")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<GraphError> for EngineError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
