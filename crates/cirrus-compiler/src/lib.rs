// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Compilation orchestration for Cirrus.
//!
//! - [`Compilation`]: an immutable module graph with one semantic model
//!   per file, built in one synchronous pass.
//! - [`CompilationManager`]: recompiles open entry points as files change,
//!   coalescing edits that arrive mid-compile, and serves the last
//!   completed [`CompilationSnapshot`] without blocking.
//! - [`CirrusConfig`]: `cirrus.yaml` project settings.

mod compilation;
pub mod config;
mod manager;

pub use compilation::Compilation;
pub use config::{CirrusConfig, ConfigError};
pub use manager::{CompilationManager, CompilationSnapshot, CompileState, ManagerOptions};
