//! Per-file binding and typing results.

use crate::symbols::{Symbol, SymbolId, SymbolKind};
use crate::types::TypeSymbol;
use cirrus_ast::{Diagnostic, FileUri, NodeId};
use cirrus_parser::SourceTree;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Symbols, bindings, types and diagnostics of one file.
///
/// Immutable once the binder returns it. Module declarations hold their
/// target's model, so a model is self-contained for emission.
#[derive(Debug)]
pub struct SemanticModel {
    pub(crate) tree: Arc<SourceTree>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) scope: IndexMap<String, SymbolId>,
    pub(crate) bindings: HashMap<NodeId, SymbolId>,
    pub(crate) types: HashMap<NodeId, TypeSymbol>,
    pub(crate) modules: IndexMap<NodeId, Arc<SemanticModel>>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl SemanticModel {
    pub fn uri(&self) -> &FileUri {
        self.tree.uri()
    }

    pub fn tree(&self) -> &Arc<SourceTree> {
        &self.tree
    }

    /// Type computed for an expression or declaration node.
    pub fn type_of(&self, node: NodeId) -> Option<&TypeSymbol> {
        self.types.get(&node)
    }

    /// Symbol a variable access refers to, or the symbol a declaration
    /// (or loop variable) node declares.
    pub fn symbol_of(&self, node: NodeId) -> Option<&Symbol> {
        self.bindings
            .get(&node)
            .map(|id| &self.symbols[id.index()])
    }

    /// File-scope symbol by name. With duplicates, the first declaration.
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.scope.get(name).map(|id| &self.symbols[id.index()])
    }

    pub fn symbol_by_id(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Every symbol, loop locals included, in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Top-level symbols of one kind, in declaration order.
    pub fn symbols_of_kind(&self, kind: SymbolKind) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(move |symbol| symbol.kind == kind)
    }

    /// Model of the file a `module` declaration refers to.
    pub fn module_model(&self, declaration: NodeId) -> Option<&Arc<SemanticModel>> {
        self.modules.get(&declaration)
    }

    /// Parse, module resolution, binding and type diagnostics, sorted by
    /// span.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}
