//! One parsed file.

use crate::parser::{parse, ParseOutput};
use cirrus_ast::{
    diagnostic::sort_by_span, Diagnostic, FileUri, LineStarts, NodeId, SyntaxArena, SyntaxKind,
    TextSpan, TokenId,
};
use cirrus_lexer::{lex, Token};
use tracing::debug;

/// A `module` declaration's path as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    /// The `Module` declaration node.
    pub declaration: NodeId,
    /// Decoded path, or `None` when it is missing or interpolated.
    pub path: Option<String>,
    /// Span of the path literal (or of the declaration when missing).
    pub span: TextSpan,
    /// The path failed to parse; the parser already reported it.
    pub malformed: bool,
}

/// One file's text, tokens, syntax tree, line table and parse diagnostics.
///
/// Immutable. An edit produces a new tree; identity is the URI plus the
/// allocation, so consumers compare trees with `Arc::ptr_eq`.
#[derive(Debug, Clone)]
pub struct SourceTree {
    uri: FileUri,
    text: String,
    tokens: Vec<Token>,
    arena: SyntaxArena,
    root: NodeId,
    line_starts: LineStarts,
    diagnostics: Vec<Diagnostic>,
}

impl SourceTree {
    /// Lex and parse one file.
    ///
    /// # Parameters
    /// - `uri`: Identity of the file; module paths inside it resolve
    ///   relative to this.
    /// - `text`: Full source text.
    ///
    /// # Returns
    /// The parsed tree with lexical and syntax diagnostics merged and sorted
    /// by position. Never fails.
    pub fn parse(uri: FileUri, text: impl Into<String>) -> Self {
        let text = text.into();
        let lexed = lex(&text);
        let ParseOutput {
            arena,
            root,
            diagnostics: parse_diagnostics,
        } = parse(&lexed.tokens);

        let mut diagnostics = lexed.diagnostics;
        diagnostics.extend(parse_diagnostics);
        sort_by_span(&mut diagnostics);

        debug!(
            uri = %uri,
            tokens = lexed.tokens.len(),
            nodes = arena.len(),
            diagnostics = diagnostics.len(),
            "parsed source tree"
        );

        Self {
            line_starts: LineStarts::new(&text),
            uri,
            text,
            tokens: lexed.tokens,
            arena,
            root,
            diagnostics,
        }
    }

    pub fn uri(&self) -> &FileUri {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    pub fn arena(&self) -> &SyntaxArena {
        &self.arena
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, node: NodeId) -> &SyntaxKind {
        self.arena.kind(node)
    }

    pub fn span(&self, node: NodeId) -> TextSpan {
        self.arena.span(node)
    }

    pub fn line_starts(&self) -> &LineStarts {
        &self.line_starts
    }

    /// Lexical and syntax diagnostics, sorted by span.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Zero-based `(line, column)` of a byte offset.
    pub fn position_at(&self, offset: u32) -> (u32, u32) {
        self.line_starts.position_at(offset)
    }

    /// Byte offset of a zero-based `(line, column)` pair.
    pub fn offset_at(&self, line: u32, column: u32) -> Option<u32> {
        self.line_starts.offset_at(line, column)
    }

    /// Source text under a node, excluding the node's leading trivia.
    pub fn text_of(&self, node: NodeId) -> &str {
        self.arena.span(node).slice(&self.text)
    }

    /// Top-level declaration nodes in source order.
    pub fn declarations(&self) -> Vec<NodeId> {
        self.arena
            .child_nodes(self.root)
            .into_iter()
            .filter(|node| self.arena.kind(*node).is_declaration())
            .collect()
    }

    /// Top-level `module` declarations and their paths.
    ///
    /// # Returns
    /// One [`ModuleReference`] per `module` declaration in source order,
    /// including those whose path is missing or interpolated.
    pub fn module_references(&self) -> Vec<ModuleReference> {
        self.declarations()
            .into_iter()
            .filter_map(|decl| match self.arena.kind(decl) {
                SyntaxKind::Module { path, .. } => Some(ModuleReference {
                    declaration: decl,
                    malformed: self.arena.kind(*path).is_skipped(),
                    path: self.arena.string_value(*path).map(str::to_string),
                    span: if self.arena.span(*path).is_empty() {
                        self.arena.span(decl)
                    } else {
                        self.arena.span(*path)
                    },
                }),
                _ => None,
            })
            .collect()
    }

    /// Rebuild the text from the tokens reachable from the root.
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        for token in self.arena.tokens_under(self.root) {
            self.tokens[token.index()].write_to(&mut out);
        }
        out
    }
}
