//! Immutable compilation snapshots.

use cirrus_ast::{Diagnostic, FileUri};
use cirrus_emit::{EmitError, EmitResult, TemplateEmitter};
use cirrus_resolve::{bind, ResourceTypeProvider, SemanticModel};
use cirrus_workspace::{FileResolver, GraphError, ModuleGraph, ModuleGraphBuilder, Workspace};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One module graph and a semantic model for every file in it.
///
/// Never mutated; an edit produces a new `Compilation`.
pub struct Compilation {
    graph: ModuleGraph,
    entry_model: Arc<SemanticModel>,
    models: IndexMap<FileUri, Arc<SemanticModel>>,
}

impl Compilation {
    /// Build the graph rooted at `entry` and bind it.
    ///
    /// Only an unloadable entry point is an `Err`; every other problem is a
    /// diagnostic on some model.
    #[instrument(skip_all, fields(entry = %entry))]
    pub fn build(
        resolver: &dyn FileResolver,
        workspace: &Workspace,
        catalog: &dyn ResourceTypeProvider,
        entry: &FileUri,
    ) -> Result<Self, GraphError> {
        let graph = ModuleGraphBuilder::build(resolver, workspace, entry)?;
        Ok(Self::from_graph(graph, catalog))
    }

    pub fn from_graph(graph: ModuleGraph, catalog: &dyn ResourceTypeProvider) -> Self {
        let bound = bind(&graph, catalog);
        debug!(
            files = bound.models.len(),
            errors = bound.models.values().filter(|model| model.has_errors()).count(),
            "compilation built"
        );
        Self {
            graph,
            entry_model: bound.entry,
            models: bound.models,
        }
    }

    pub fn entry(&self) -> &FileUri {
        self.graph.entry()
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// The model queries go to by default.
    pub fn entry_model(&self) -> &Arc<SemanticModel> {
        &self.entry_model
    }

    pub fn model(&self, uri: &FileUri) -> Option<&Arc<SemanticModel>> {
        self.models.get(uri)
    }

    /// Models in dependency order, entry last.
    pub fn models(&self) -> impl Iterator<Item = (&FileUri, &Arc<SemanticModel>)> {
        self.models.iter()
    }

    pub fn diagnostics(&self, uri: &FileUri) -> &[Diagnostic] {
        self.models
            .get(uri)
            .map(|model| model.diagnostics())
            .unwrap_or(&[])
    }

    /// True if any file in the graph has an error.
    pub fn has_errors(&self) -> bool {
        self.models.values().any(|model| model.has_errors())
    }

    /// Emit the entry point's template.
    pub fn emit(&self, emitter: &TemplateEmitter) -> Result<EmitResult, EmitError> {
        emitter.emit(self.entry_model())
    }
}
