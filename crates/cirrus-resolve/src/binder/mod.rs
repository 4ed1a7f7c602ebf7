//! Binding and type checking.
//!
//! Files are bound in module-dependency order, leaves first, so a module's
//! parameter and output types are known before its consumers are checked.
//! Each file goes through three passes:
//!
//! 1. **Declarations** - one flat scope per file; duplicates are reported
//!    on every declaration sharing the name. Parameters, outputs, resources
//!    and modules get their types from their headers.
//! 2. **Value cycles** - references between variables, resources, modules
//!    and parameter defaults form a graph; each strongly connected group is
//!    reported once and its members take the `Error` type.
//! 3. **Checking** - every declaration is checked in source order.
//!    Variables are typed on first use, so order of declaration never
//!    matters.
//!
//! A failed check types its node as `Error`, and an `Error` operand never
//! produces another diagnostic.

mod cycles;
mod declarations;
mod expressions;

use crate::catalog::ResourceTypeProvider;
use crate::model::SemanticModel;
use crate::symbols::{Symbol, SymbolId, SymbolKind};
use crate::types::TypeSymbol;
use cirrus_ast::diagnostic::sort_by_span;
use cirrus_ast::{Diagnostic, DiagnosticCode, FileUri, NodeId, SyntaxArena, TextSpan};
use cirrus_parser::SourceTree;
use cirrus_workspace::ModuleGraph;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Semantic models of one module graph.
#[derive(Debug, Clone)]
pub struct BoundGraph {
    /// Model of the graph's entry point.
    pub entry: Arc<SemanticModel>,
    /// Every model, the entry's included, in dependency order.
    pub models: IndexMap<FileUri, Arc<SemanticModel>>,
}

/// Bind every file of a module graph.
///
/// # Parameters
/// - `graph`: Files to bind; modules that failed to resolve are already
///   recorded on it.
/// - `catalog`: Schemas for resource bodies.
///
/// # Returns
/// A [`BoundGraph`] with one model per file, dependencies first and the
/// entry point last. Never fails: problems are diagnostics on the models.
#[instrument(skip_all, fields(entry = %graph.entry()))]
pub fn bind(graph: &ModuleGraph, catalog: &dyn ResourceTypeProvider) -> BoundGraph {
    let mut models: IndexMap<FileUri, Arc<SemanticModel>> = IndexMap::new();
    for uri in graph.dependency_order() {
        if uri == *graph.entry() {
            continue;
        }
        let Some(tree) = graph.tree(&uri) else {
            continue;
        };
        let model = bind_file(tree, graph, catalog, &models);
        models.insert(uri, model);
    }
    let entry = bind_file(graph.entry_tree(), graph, catalog, &models);
    models.insert(graph.entry().clone(), entry.clone());
    BoundGraph { entry, models }
}

fn bind_file(
    tree: &Arc<SourceTree>,
    graph: &ModuleGraph,
    catalog: &dyn ResourceTypeProvider,
    models: &IndexMap<FileUri, Arc<SemanticModel>>,
) -> Arc<SemanticModel> {
    let model = Binder::new(tree.clone(), graph, catalog, models).run();
    debug!(
        uri = %tree.uri(),
        symbols = model.symbols.len(),
        diagnostics = model.diagnostics.len(),
        "bound file"
    );
    Arc::new(model)
}

/// Checking progress of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclState {
    Pending,
    InProgress,
    Done,
}

/// Where for-expressions may appear in the value being checked.
#[derive(Debug, Clone, Copy, Default)]
struct Ctx {
    in_resource: bool,
    /// Below the top-level object of a resource body.
    nested: bool,
    property_loops: bool,
}

impl Ctx {
    fn plain() -> Self {
        Self::default()
    }

    fn resource_body() -> Self {
        Self {
            in_resource: true,
            ..Self::default()
        }
    }

    /// Context for the property values of an object checked under `self`.
    /// Only objects nested inside a resource body may hold property loops.
    fn members(self) -> Self {
        Self {
            in_resource: self.in_resource,
            nested: self.in_resource,
            property_loops: self.in_resource && self.nested,
        }
    }
}

struct Binder<'a> {
    tree: Arc<SourceTree>,
    graph: &'a ModuleGraph,
    catalog: &'a dyn ResourceTypeProvider,
    models: &'a IndexMap<FileUri, Arc<SemanticModel>>,

    symbols: Vec<Symbol>,
    scope: IndexMap<String, SymbolId>,
    /// Top-level declarations and their symbols, in source order.
    declarations: Vec<(NodeId, SymbolId)>,
    states: HashMap<SymbolId, DeclState>,
    duplicates: HashSet<SymbolId>,
    in_cycle: HashSet<SymbolId>,
    used: HashSet<SymbolId>,
    /// Loop locals in scope, innermost last.
    locals: Vec<(String, SymbolId)>,

    bindings: HashMap<NodeId, SymbolId>,
    types: HashMap<NodeId, TypeSymbol>,
    modules: IndexMap<NodeId, Arc<SemanticModel>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Binder<'a> {
    fn new(
        tree: Arc<SourceTree>,
        graph: &'a ModuleGraph,
        catalog: &'a dyn ResourceTypeProvider,
        models: &'a IndexMap<FileUri, Arc<SemanticModel>>,
    ) -> Self {
        Self {
            tree,
            graph,
            catalog,
            models,
            symbols: Vec::new(),
            scope: IndexMap::new(),
            declarations: Vec::new(),
            states: HashMap::new(),
            duplicates: HashSet::new(),
            in_cycle: HashSet::new(),
            used: HashSet::new(),
            locals: Vec::new(),
            bindings: HashMap::new(),
            types: HashMap::new(),
            modules: IndexMap::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> SemanticModel {
        self.declare_all();
        self.detect_value_cycles();

        let declarations = self.declarations.clone();
        for (_, id) in declarations {
            self.check_symbol(id);
        }
        self.report_unused_parameters();

        let mut diagnostics: Vec<Diagnostic> = self.tree.diagnostics().to_vec();
        diagnostics.extend(self.graph.diagnostics(self.tree.uri()));
        diagnostics.append(&mut self.diagnostics);
        sort_by_span(&mut diagnostics);

        SemanticModel {
            tree: self.tree,
            symbols: self.symbols,
            scope: self.scope,
            bindings: self.bindings,
            types: self.types,
            modules: self.modules,
            diagnostics,
        }
    }

    fn arena(&self) -> &SyntaxArena {
        self.tree.arena()
    }

    fn span(&self, node: NodeId) -> TextSpan {
        self.tree.span(node)
    }

    fn error(&mut self, code: DiagnosticCode, span: TextSpan, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(code, span, message));
    }

    fn warning(&mut self, code: DiagnosticCode, span: TextSpan, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::warning(code, span, message));
    }

    fn new_symbol(
        &mut self,
        name: String,
        kind: SymbolKind,
        declaration: NodeId,
        name_span: TextSpan,
        ty: TypeSymbol,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            name,
            kind,
            declaration,
            name_span,
            ty,
        });
        self.bindings.insert(declaration, id);
        id
    }

    fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    fn record(&mut self, node: NodeId, ty: TypeSymbol) -> TypeSymbol {
        self.types.insert(node, ty.clone());
        ty
    }

    /// Type of a symbol, checking its declaration first if needed.
    fn symbol_type(&mut self, id: SymbolId) -> TypeSymbol {
        if self.in_cycle.contains(&id) || self.duplicates.contains(&id) {
            return TypeSymbol::Error;
        }
        match self.states.get(&id).copied() {
            Some(DeclState::Pending) => {
                self.check_symbol(id);
                self.symbol(id).ty.clone()
            }
            Some(DeclState::InProgress) => TypeSymbol::Error,
            Some(DeclState::Done) | None => self.symbol(id).ty.clone(),
        }
    }

    fn check_symbol(&mut self, id: SymbolId) {
        if self.states.get(&id) != Some(&DeclState::Pending) {
            return;
        }
        self.states.insert(id, DeclState::InProgress);
        let declaration = self.symbol(id).declaration;
        let ty = self.check_declaration(declaration, id);
        if self.symbol(id).kind == SymbolKind::Variable
            && !self.in_cycle.contains(&id)
            && !self.duplicates.contains(&id)
        {
            self.symbols[id.index()].ty = ty;
        }
        self.states.insert(id, DeclState::Done);
    }

    fn report_unused_parameters(&mut self) {
        let unused: Vec<(String, TextSpan)> = self
            .declarations
            .iter()
            .map(|(_, id)| self.symbol(*id))
            .filter(|symbol| symbol.kind == SymbolKind::Parameter)
            .filter(|symbol| !self.duplicates.contains(&symbol.id) && !self.used.contains(&symbol.id))
            .map(|symbol| (symbol.name.clone(), symbol.name_span))
            .collect();
        for (name, span) in unused {
            self.warning(
                DiagnosticCode::UnusedParameter,
                span,
                format!("parameter '{name}' is declared but never used"),
            );
        }
    }
}
