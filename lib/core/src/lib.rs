//! Core domain types for the Oryjin campaign studio.
//!
//! This crate provides the strongly-typed identifiers shared by the
//! conversation and workflow layers.

pub mod id;

pub use id::{MessageId, ParseIdError, ThreadId};
