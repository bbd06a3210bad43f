//! Interruptible workflow engine for the Oryjin campaign studio.
//!
//! This crate provides the core state-machine engine, including:
//!
//! - **State contract**: accumulated state plus mergeable partial updates
//! - **Steps**: named async transition functions over state
//! - **Graph Model**: steps wired by direct and conditional (routed) edges
//! - **Execution**: a resumable loop that pauses at declared interrupt
//!   points until external input has been merged
//! - **Thread Store**: checkpointed snapshots keyed by thread identifier

pub mod engine;
pub mod error;
pub mod graph;
pub mod state;
pub mod step;
pub mod store;

pub use engine::{Engine, RunOutcome};
pub use error::{CollaboratorError, EngineError, GraphError, StoreError};
pub use graph::{GraphBuilder, Router, Transition, WorkflowGraph};
pub use state::WorkflowState;
pub use step::{MarkerStep, Step, StepName, StepRegistry};
pub use store::{InMemoryThreadStore, StepPointer, ThreadSnapshot, ThreadStore};
