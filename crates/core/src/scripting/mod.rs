//! Sandboxed process execution.
//!
//! [`container`] shapes a locked-down runtime invocation; [`subprocess`]
//! governs the spawned process (stdin, capped output, deadline, kill).
//! Both are free of HTTP concerns so they can be tested in isolation.

pub mod container;
pub mod subprocess;
