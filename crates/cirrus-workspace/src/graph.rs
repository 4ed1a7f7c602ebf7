//! Module graph construction.
//!
//! Starting from an entry point, every top-level `module` declaration is
//! resolved relative to its file's URI and loaded from the workspace (or,
//! failing that, the file resolver), depth first, in declaration order.
//!
//! # Cycles
//!
//! A reference to a file still on the visiting stack closes a cycle. The
//! chain is recorded as a failure on every declaration that forms the
//! cycle, and the closing edge is dropped, so the graph handed to the binder
//! is always acyclic.
//!
//! # Failures
//!
//! Missing files, invalid paths and cycles are recorded per `(file,
//! declaration)` and surface as diagnostics on that declaration. Only a
//! missing entry point is an `Err`.

use crate::resolver::{FileResolveError, FileResolver};
use crate::workspace::Workspace;
use cirrus_ast::{Diagnostic, DiagnosticCode, FileUri, NodeId, TextSpan};
use cirrus_parser::SourceTree;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// The entry point itself could not be loaded.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("entry point '{uri}' could not be loaded: {source}")]
    EntryNotFound {
        uri: FileUri,
        #[source]
        source: FileResolveError,
    },
}

/// Why a `module` declaration has no usable target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleFailure {
    /// The target file could not be read.
    NotFound { uri: FileUri, reason: String },
    /// The path is not a usable relative reference.
    InvalidPath { reason: String },
    /// The reference closes a cycle. `chain` lists each file once, starting
    /// where the cycle was entered.
    Cycle { chain: Vec<FileUri> },
}

impl ModuleFailure {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ModuleFailure::NotFound { .. } => DiagnosticCode::ModuleNotFound,
            ModuleFailure::InvalidPath { .. } => DiagnosticCode::InvalidModulePath,
            ModuleFailure::Cycle { .. } => DiagnosticCode::ModuleCycle,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ModuleFailure::NotFound { uri, reason } => {
                format!("unable to load module '{uri}': {reason}")
            }
            ModuleFailure::InvalidPath { reason } => format!("invalid module path: {reason}"),
            ModuleFailure::Cycle { chain } => format!(
                "this module reference forms a cycle: {}",
                format_cycle(chain)
            ),
        }
    }

    pub fn to_diagnostic(&self, span: TextSpan) -> Diagnostic {
        Diagnostic::error(self.code(), span, self.message())
    }
}

/// `a -> b -> c -> a`
fn format_cycle(chain: &[FileUri]) -> String {
    chain
        .iter()
        .chain(chain.first())
        .map(FileUri::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A successfully resolved module reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub declaration: NodeId,
    pub uri: FileUri,
}

/// Acyclic graph of the files reachable from one entry point.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    entry: FileUri,
    entry_tree: Arc<SourceTree>,
    trees: IndexMap<FileUri, Arc<SourceTree>>,
    references: IndexMap<FileUri, Vec<ResolvedModule>>,
    failures: IndexMap<(FileUri, NodeId), ModuleFailure>,
}

impl ModuleGraph {
    pub fn entry(&self) -> &FileUri {
        &self.entry
    }

    pub fn entry_tree(&self) -> &Arc<SourceTree> {
        &self.entry_tree
    }

    pub fn tree(&self, uri: &FileUri) -> Option<&Arc<SourceTree>> {
        self.trees.get(uri)
    }

    /// Files in discovery order, entry first.
    pub fn trees(&self) -> impl Iterator<Item = (&FileUri, &Arc<SourceTree>)> {
        self.trees.iter()
    }

    pub fn contains(&self, uri: &FileUri) -> bool {
        self.trees.contains_key(uri)
    }

    /// Whether a change to `uri` can change this graph.
    ///
    /// # Parameters
    /// - `uri`: File that was edited, opened or closed.
    ///
    /// # Returns
    /// `true` if the file is in the graph, or a reference to it failed to
    /// load (it may load now).
    pub fn mentions(&self, uri: &FileUri) -> bool {
        self.contains(uri)
            || self.failures.values().any(|failure| {
                matches!(failure, ModuleFailure::NotFound { uri: missing, .. } if missing == uri)
            })
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Resolved module edges out of `uri`, in declaration order.
    pub fn references(&self, uri: &FileUri) -> &[ResolvedModule] {
        self.references.get(uri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Target of a `module` declaration.
    ///
    /// # Parameters
    /// - `uri`: File containing the declaration.
    /// - `declaration`: The `Module` declaration node.
    ///
    /// # Returns
    /// The resolved file, or `None` if the reference failed.
    pub fn module_target(&self, uri: &FileUri, declaration: NodeId) -> Option<&FileUri> {
        if self.failure(uri, declaration).is_some() {
            return None;
        }
        self.references(uri)
            .iter()
            .find(|reference| reference.declaration == declaration)
            .map(|reference| &reference.uri)
    }

    pub fn failure(&self, uri: &FileUri, declaration: NodeId) -> Option<&ModuleFailure> {
        self.failures.get(&(uri.clone(), declaration))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileUri, NodeId, &ModuleFailure)> {
        self.failures
            .iter()
            .map(|((uri, decl), failure)| (uri, *decl, failure))
    }

    /// Module failures of one file as diagnostics on the declaration's path.
    pub fn diagnostics(&self, uri: &FileUri) -> Vec<Diagnostic> {
        let Some(tree) = self.trees.get(uri) else {
            return Vec::new();
        };
        let spans: IndexMap<NodeId, TextSpan> = tree
            .module_references()
            .into_iter()
            .map(|reference| (reference.declaration, reference.span))
            .collect();
        self.failures
            .iter()
            .filter(|((file, _), _)| file == uri)
            .map(|((_, decl), failure)| {
                let span = spans.get(decl).copied().unwrap_or_else(|| tree.span(*decl));
                failure.to_diagnostic(span)
            })
            .collect()
    }

    /// Every file of the graph in binding order.
    ///
    /// # Returns
    /// Each file once, dependencies before their dependents and the entry
    /// last. Ties follow declaration order, so the result is deterministic.
    pub fn dependency_order(&self) -> Vec<FileUri> {
        let mut visited = IndexSet::new();
        self.post_order(&self.entry, &mut visited);
        visited.into_iter().collect()
    }

    fn post_order(&self, uri: &FileUri, visited: &mut IndexSet<FileUri>) {
        if visited.contains(uri) {
            return;
        }
        for reference in self.references(uri) {
            self.post_order(&reference.uri, visited);
        }
        visited.insert(uri.clone());
    }
}

/// Builds a [`ModuleGraph`] from an entry point.
pub struct ModuleGraphBuilder<'a> {
    resolver: &'a dyn FileResolver,
    workspace: &'a Workspace,
    trees: IndexMap<FileUri, Arc<SourceTree>>,
    references: IndexMap<FileUri, Vec<ResolvedModule>>,
    failures: IndexMap<(FileUri, NodeId), ModuleFailure>,
    /// Read failures by target, so a missing file is only read once.
    unreadable: IndexMap<FileUri, String>,
    /// Files being visited, each with the declaration currently followed.
    stack: Vec<(FileUri, Option<NodeId>)>,
}

impl<'a> ModuleGraphBuilder<'a> {
    /// Discover every file reachable from `entry`.
    ///
    /// # Parameters
    /// - `resolver`: Reads files that are not open in `workspace`.
    /// - `workspace`: Open files; these shadow whatever `resolver` returns.
    /// - `entry`: Root of the graph.
    ///
    /// # Returns
    /// An acyclic [`ModuleGraph`]. Missing modules, invalid paths and cycles
    /// are recorded on the declarations that caused them.
    ///
    /// # Errors
    /// [`GraphError::EntryNotFound`] if `entry` itself cannot be loaded.
    #[instrument(skip_all, fields(entry = %entry))]
    pub fn build(
        resolver: &'a dyn FileResolver,
        workspace: &'a Workspace,
        entry: &FileUri,
    ) -> Result<ModuleGraph, GraphError> {
        let mut builder = Self {
            resolver,
            workspace,
            trees: IndexMap::new(),
            references: IndexMap::new(),
            failures: IndexMap::new(),
            unreadable: IndexMap::new(),
            stack: Vec::new(),
        };

        let tree = builder
            .load(entry)
            .map_err(|source| GraphError::EntryNotFound {
                uri: entry.clone(),
                source,
            })?;
        builder.trees.insert(entry.clone(), tree.clone());
        builder.visit(entry, &tree);

        debug!(
            files = builder.trees.len(),
            failures = builder.failures.len(),
            "module graph built"
        );

        Ok(ModuleGraph {
            entry: entry.clone(),
            entry_tree: tree,
            trees: builder.trees,
            references: builder.references,
            failures: builder.failures,
        })
    }

    fn load(&self, uri: &FileUri) -> Result<Arc<SourceTree>, FileResolveError> {
        if let Some(tree) = self.workspace.get(uri) {
            return Ok(tree.clone());
        }
        let text = self.resolver.read(uri)?;
        debug!(uri = %uri, "loaded module from resolver");
        Ok(Arc::new(SourceTree::parse(uri.clone(), text)))
    }

    fn visit(&mut self, uri: &FileUri, tree: &Arc<SourceTree>) {
        self.stack.push((uri.clone(), None));
        let mut edges = Vec::new();

        for reference in tree.module_references() {
            if reference.malformed {
                continue;
            }
            let key = (uri.clone(), reference.declaration);
            let target = match resolve_path(uri, reference.path.as_deref()) {
                Ok(target) => target,
                Err(reason) => {
                    self.failures.insert(key, ModuleFailure::InvalidPath { reason });
                    continue;
                }
            };
            if let Some(top) = self.stack.last_mut() {
                top.1 = Some(reference.declaration);
            }

            if let Some(start) = self.stack.iter().position(|(file, _)| *file == target) {
                self.record_cycle(start);
                continue;
            }

            if self.trees.contains_key(&target) {
                edges.push(ResolvedModule {
                    declaration: reference.declaration,
                    uri: target,
                });
                continue;
            }

            if let Some(reason) = self.unreadable.get(&target) {
                let failure = ModuleFailure::NotFound {
                    uri: target.clone(),
                    reason: reason.clone(),
                };
                self.failures.insert(key, failure);
                continue;
            }

            match self.load(&target) {
                Ok(child) => {
                    self.trees.insert(target.clone(), child.clone());
                    edges.push(ResolvedModule {
                        declaration: reference.declaration,
                        uri: target.clone(),
                    });
                    self.visit(&target, &child);
                }
                Err(error) => {
                    warn!(uri = %target, error = %error, "module could not be loaded");
                    let reason = error.to_string();
                    self.unreadable.insert(target.clone(), reason.clone());
                    self.failures.insert(
                        key,
                        ModuleFailure::NotFound {
                            uri: target,
                            reason,
                        },
                    );
                }
            }
        }

        self.references.insert(uri.clone(), edges);
        self.stack.pop();
    }

    /// Record a cycle failure on every edge from `stack[start]` to the top.
    fn record_cycle(&mut self, start: usize) {
        let chain: Vec<FileUri> = self.stack[start..]
            .iter()
            .map(|(file, _)| file.clone())
            .collect();
        debug!(length = chain.len(), "module cycle detected");
        for (file, decl) in &self.stack[start..] {
            if let Some(decl) = decl {
                self.failures.insert(
                    (file.clone(), *decl),
                    ModuleFailure::Cycle {
                        chain: chain.clone(),
                    },
                );
            }
        }
    }
}

/// Resolve a module path relative to the referencing file.
fn resolve_path(base: &FileUri, path: Option<&str>) -> Result<FileUri, String> {
    let Some(path) = path else {
        return Err("the path must be a string literal without interpolation".to_string());
    };
    if path.is_empty() {
        return Err("the path must not be empty".to_string());
    }
    if path.contains('\\') {
        return Err(format!("'{path}' uses '\\'; use '/' as the path separator"));
    }
    if path.starts_with('/') || path.contains(':') {
        return Err(format!("'{path}' must be relative to the referencing file"));
    }
    if path.ends_with('/') {
        return Err(format!("'{path}' refers to a directory"));
    }
    base.join(path).map_err(|error| error.to_string())
}
