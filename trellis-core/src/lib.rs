//! Core types for the Trellis planning system.
//!
//! This crate defines the shared vocabulary the rest of the workspace builds
//! on: the [`TrellisError`] taxonomy with its retriability classification,
//! the [`ChatProvider`] contract that abstracts LLM backends, and the
//! validated planning model ([`Task`], [`Sprint`], [`SubTask`]).

mod chat;
mod error;
mod plan;

pub use chat::{ChatMessage, ChatProvider, ChatRole};
pub use error::{Result, TrellisError};
pub use plan::{
    MAX_DETAIL_CHARS, MAX_ESTIMATE_HOURS, MAX_SPRINT_NAME_CHARS, MAX_TITLE_CHARS, Priority,
    Sprint, SubTask, Task,
};
