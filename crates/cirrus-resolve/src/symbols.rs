//! Declared names.

use crate::types::TypeSymbol;
use cirrus_ast::{NodeId, TextSpan};
use std::fmt;

/// Index of a symbol in its [`SemanticModel`](crate::SemanticModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Parameter,
    Variable,
    Resource,
    Module,
    Output,
    /// Item or index variable of a for-expression.
    LoopLocal,
}

impl SymbolKind {
    /// Whether uses of the symbol create value dependencies.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            SymbolKind::Parameter | SymbolKind::Variable | SymbolKind::Resource | SymbolKind::Module
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolKind::Parameter => "parameter",
            SymbolKind::Variable => "variable",
            SymbolKind::Resource => "resource",
            SymbolKind::Module => "module",
            SymbolKind::Output => "output",
            SymbolKind::LoopLocal => "loop variable",
        })
    }
}

/// A named declaration.
///
/// `declaration` is the declaring node in the file's arena: a top-level
/// declaration, or a `LoopVariable` for loop locals.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub declaration: NodeId,
    pub name_span: TextSpan,
    pub ty: TypeSymbol,
}
