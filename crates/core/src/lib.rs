//! Sandbox execution domain logic.
//!
//! Holds the request/result data model shared by the broker and its clients,
//! and the subprocess governance used to launch one isolated container per
//! request. Nothing here performs HTTP; the broker and tool crates build on it.

pub mod config;
pub mod error;
pub mod execution;
pub mod scripting;
