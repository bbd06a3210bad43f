//! State contract for workflow execution.
//!
//! Accumulated state is owned by a thread; steps never mutate it directly.
//! Each step returns a partial update, and the engine merges the update into
//! the accumulated state before persisting a checkpoint.

/// Accumulated state of one workflow thread.
///
/// Implementations decide merge semantics per field. The convention used by
/// the campaign domain — and expected by the engine's auditability
/// guarantees — is that the message transcript concatenates on merge while
/// every other field replaces when the update carries a value.
pub trait WorkflowState: Clone + Default + Send + Sync + 'static {
    /// The partial update a step produces.
    ///
    /// `Default` must yield an empty update (merging it changes nothing);
    /// callers retry a failed step by resuming with the default update.
    type Update: Clone + Default + Send + Sync + 'static;

    /// Merges a partial update into this state.
    fn apply(&mut self, update: Self::Update);

    /// The human-readable request to surface when execution pauses at an
    /// interrupt point, typically the latest assistant message.
    fn interrupt_prompt(&self) -> Option<String>;
}
