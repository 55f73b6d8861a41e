//! IPC message protocol for the shape key tools
//!
//! Defines the messages exchanged between a host application (the panel or
//! menu that triggers an operation) and the shape key tools: commands flow
//! in as [`HostToTools`], progress and the final [`CommandReport`] flow back
//! as [`ToolsToHost`].

mod error;
mod messages;
mod types;

pub use error::*;
pub use messages::*;
pub use types::*;
