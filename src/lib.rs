#![deny(clippy::all, clippy::perf, clippy::suspicious)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

//! Core library for the Vel language frontend and live-analysis engine.
//!
//! The crate turns Vel source text into an analyzed module IR, runs an
//! ordered schedule of passes over it, and keeps a fingerprint-checked
//! workspace cache that editor-facing consumers (diagnostics, formatting,
//! symbol and dependency queries) read from.

pub mod alerts;
pub mod error;
pub mod frontend;
pub mod loader;
pub mod logging;
pub mod lsp;
pub mod passes;
pub mod source;
pub mod symtab;
pub mod workspace;

pub use error::{Error, Result};
pub use workspace::Workspace;
