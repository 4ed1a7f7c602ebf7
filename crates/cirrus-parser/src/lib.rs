// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Error-tolerant parser for Cirrus.
//!
//! [`parse`] turns a token list into an arena-backed concrete syntax tree
//! and never fails; [`SourceTree`] bundles one file's text, tokens, tree,
//! line table and diagnostics.
//!
//! # Examples
//!
//! ```
//! # use cirrus_ast::FileUri;
//! # use cirrus_parser::SourceTree;
//! let uri = FileUri::parse("inmemory:///main.cirrus").unwrap();
//! let tree = SourceTree::parse(uri, "var a = 1 +\nvar b = 2\n");
//! assert_eq!(tree.declarations().len(), 2);
//! assert_eq!(tree.diagnostics().len(), 1);
//! ```

pub mod parser;
mod tree;

pub use parser::{parse, ParseError, ParseErrorKind, ParseOutput, MAX_NESTING_DEPTH};
pub use tree::{ModuleReference, SourceTree};

// Re-export lexer
pub use cirrus_lexer::{Token, TokenKind};
