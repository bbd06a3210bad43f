//! Conversation types for the Oryjin campaign studio.
//!
//! A workflow thread carries an append-only transcript of role-tagged
//! messages; this crate provides the message model shared by the engine
//! and the campaign steps.

pub mod message;

pub use message::{Message, MessageRole};
