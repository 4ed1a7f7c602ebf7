// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Source registry and module graph for Cirrus.
//!
//! - [`Workspace`]: the set of open files, keyed by [`FileUri`]
//! - [`FileResolver`]: the only I/O boundary, used for files not open in
//!   the workspace
//! - [`ModuleGraphBuilder`]: discovers the files an entry point depends on
//!   and produces an acyclic [`ModuleGraph`]
//!
//! [`FileUri`]: cirrus_ast::FileUri

mod graph;
mod resolver;
mod workspace;

pub use graph::{GraphError, ModuleFailure, ModuleGraph, ModuleGraphBuilder, ResolvedModule};
pub use resolver::{FileResolveError, FileResolver, FileSystemResolver, InMemoryFileResolver};
pub use workspace::Workspace;
