// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Binding and type checking for Cirrus.
//!
//! [`bind`] resolves every identifier of a module graph, types every
//! expression against the built-in function table and a
//! [`ResourceTypeProvider`], and produces one [`SemanticModel`] per file.
//! Nothing here fails: every problem becomes a diagnostic on its model.
//!
//! # Examples
//!
//! ```
//! # use cirrus_ast::{DiagnosticCode, FileUri};
//! # use cirrus_resolve::{bind, StaticCatalog};
//! # use cirrus_workspace::{InMemoryFileResolver, ModuleGraphBuilder, Workspace};
//! let uri = FileUri::parse("inmemory:///main.cirrus").unwrap();
//! let resolver = InMemoryFileResolver::with_files([(uri.clone(), "var a = b\n")]);
//! let graph = ModuleGraphBuilder::build(&resolver, &Workspace::new(), &uri).unwrap();
//!
//! let bound = bind(&graph, &StaticCatalog::new());
//! let codes: Vec<_> = bound.entry.diagnostics().iter().map(|d| d.code).collect();
//! assert_eq!(codes, vec![DiagnosticCode::UndefinedSymbol]);
//! ```

mod binder;
pub mod catalog;
pub mod decorators;
pub mod functions;
mod model;
mod symbols;
pub mod types;

pub use binder::{bind, BoundGraph};
pub use catalog::{
    CatalogError, PropertySchema, ResourceSchema, ResourceTypeProvider, ResourceTypeReference,
    SchemaKind, StaticCatalog,
};
pub use model::SemanticModel;
pub use symbols::{Symbol, SymbolId, SymbolKind};
pub use types::{ModuleType, ObjectType, PropertyType, ResourceType, TypeSymbol};
