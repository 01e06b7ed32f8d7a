//! Route tree.
//!
//! ```text
//! GET  /healthz      liveness probe (image, runtime identity)
//! POST /run          interpreter code on stdin
//! POST /exec         explicit argv with stdin
//! ```

pub mod health;
pub mod sandbox;
