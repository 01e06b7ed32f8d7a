//! Sandbox tool adapters.
//!
//! Turns the broker's generic run-code contract into two tools with their
//! own success and error semantics:
//!
//! - [`python_exec`]: direct interpreter code; non-zero exits and silent
//!   runs are errors.
//! - [`shell_exec`]: shell scripts; the exit code is data and only
//!   transport failures raise.
//!
//! Both are reachable by name through the [`registry`], built once at
//! startup from a [`config::ToolConfig`].

pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod python_exec;
pub mod registry;
pub mod shell_exec;
