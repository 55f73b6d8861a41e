//! Type definitions for IPC messages.

mod report;

pub use report::*;
