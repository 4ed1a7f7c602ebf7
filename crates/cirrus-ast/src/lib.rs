// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Foundation types for the Cirrus compiler.
//!
//! This crate holds everything the pipeline stages share without depending
//! on each other: byte spans and line tables, file identities, diagnostics,
//! and the arena-backed concrete syntax tree produced by the parser.

pub mod diagnostic;
pub mod span;
pub mod syntax;
pub mod uri;

pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticLevel};
pub use span::{LineStarts, TextSpan};
pub use syntax::{
    BinaryOperator, Element, NodeId, SyntaxArena, SyntaxKind, SyntaxNode, TokenId, UnaryOperator,
};
pub use uri::{FileUri, UriError};
