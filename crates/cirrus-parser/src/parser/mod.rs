//! Hand-written recursive descent parser for Cirrus.
//!
//! ## Architecture
//!
//! - `stream`: TokenStream wrapper with lookahead and rewind
//! - `error`: ParseError and its diagnostic mapping
//! - `decl`: Declaration parsers (keyword-dispatched)
//! - `expr`: Expression parser using Pratt parsing, plus literals and
//!   containers
//! - `strings`: escape decoding for string literal pieces
//!
//! ## Recovery
//!
//! Parsing functions return `Result<NodeId, ParseError>` and use `?` freely.
//! Errors are caught at *slots* (a declaration value, an object property, an
//! array item, a call argument): the stream is rewound to the slot start and
//! the tokens up to the next recovery point (end of line, or the closing
//! bracket of an enclosing container) become a `Skipped` node. Missing
//! single tokens (`=`, `:`, `)`) are filled with zero-token `Skipped` nodes
//! without unwinding.
//!
//! Only the first failure inside a declaration is reported; later failures
//! in the same declaration are still recovered, silently.
//!
//! ## Depth
//!
//! Expression nesting is capped at [`MAX_NESTING_DEPTH`]. Brackets, unary
//! and ternary operators each open a level, and so does every link of a
//! binary or postfix chain, since the chain builds a left-deep tree. Deeper
//! input fails like any other parse error, so every later pass walks a tree
//! of bounded depth.

mod decl;
mod error;
mod expr;
mod stream;
mod strings;

pub use error::{ParseError, ParseErrorKind};
pub use stream::TokenStream;

use cirrus_ast::{Diagnostic, Element, NodeId, SyntaxArena, SyntaxKind, TokenId};
use cirrus_lexer::{Token, TokenKind};

/// Result of parsing one token list.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub arena: SyntaxArena,
    pub root: NodeId,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a token list into a concrete syntax tree.
///
/// # Parameters
/// - `tokens`: Tokens of one file as produced by [`cirrus_lexer::lex`],
///   ending in `EndOfFile`.
///
/// # Returns
/// A [`ParseOutput`] whose `Program` root reaches every token, so the tree
/// reconstructs the input exactly, plus the syntax diagnostics. Never fails:
/// malformed input becomes `Skipped` nodes, and expressions nested deeper
/// than [`MAX_NESTING_DEPTH`] are rejected the same way.
pub fn parse(tokens: &[Token]) -> ParseOutput {
    let spans = tokens.iter().map(|t| t.span).collect();
    let mut parser = Parser {
        stream: TokenStream::new(tokens),
        arena: SyntaxArena::new(spans),
        diagnostics: Vec::new(),
        recovering: false,
        open_brackets: Vec::new(),
        depth: 0,
    };
    let root = parser.program();
    ParseOutput {
        arena: parser.arena,
        root,
        diagnostics: parser.diagnostics,
    }
}

/// Deepest expression nesting the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Keywords that start a top-level declaration.
pub(crate) const DECLARATION_KEYWORDS: &[&str] = &["param", "var", "resource", "module", "output"];

pub(crate) struct Parser<'t> {
    pub(crate) stream: TokenStream<'t>,
    pub(crate) arena: SyntaxArena,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Set after the first reported failure in the current declaration.
    pub(crate) recovering: bool,
    /// Closing brackets of the containers currently being parsed,
    /// innermost last.
    pub(crate) open_brackets: Vec<TokenKind>,
    /// Current expression nesting.
    pub(crate) depth: usize,
}

impl<'t> Parser<'t> {
    /// Record an error unless the current declaration already reported one.
    pub(crate) fn report(&mut self, error: ParseError) {
        if !self.recovering {
            self.recovering = true;
            self.diagnostics.push(error.into_diagnostic());
        }
    }

    /// Record an error that does not affect recovery state (for example an
    /// out-of-range integer whose node is still usable).
    pub(crate) fn report_local(&mut self, error: ParseError) {
        if !self.recovering {
            self.diagnostics.push(error.into_diagnostic());
        }
    }

    /// Run `parse` as a recovery slot.
    pub(crate) fn slot<F>(&mut self, parse: F) -> NodeId
    where
        F: FnOnce(&mut Self) -> Result<NodeId, ParseError>,
    {
        let start = self.stream.position();
        let diagnostics_mark = self.diagnostics.len();
        let brackets_mark = self.open_brackets.len();
        match parse(self) {
            Ok(node) => node,
            Err(error) => {
                self.stream.rewind(start);
                self.diagnostics.truncate(diagnostics_mark);
                self.open_brackets.truncate(brackets_mark);
                self.report(error);
                self.skip_to_recovery_point()
            }
        }
    }

    /// Consume tokens up to (not including) the end of the line, or the
    /// closing bracket of an enclosing container. Brackets opened while
    /// skipping are balanced, so a skipped `{ ... }` spanning lines is
    /// swallowed whole.
    pub(crate) fn skip_to_recovery_point(&mut self) -> NodeId {
        let offset = self.stream.current_span().start;
        let mut tokens = Vec::new();
        let mut nesting: Vec<TokenKind> = Vec::new();
        loop {
            let kind = self.stream.peek_kind();
            match kind {
                TokenKind::EndOfFile => break,
                TokenKind::NewLine if nesting.is_empty() => break,
                // An unbalanced bracket must not swallow the next declaration.
                TokenKind::NewLine if self.declaration_follows(1) => break,
                TokenKind::LeftBrace => nesting.push(TokenKind::RightBrace),
                TokenKind::LeftParen => nesting.push(TokenKind::RightParen),
                TokenKind::LeftSquare => nesting.push(TokenKind::RightSquare),
                TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightSquare => {
                    if nesting.last() == Some(&kind) {
                        nesting.pop();
                    } else if nesting.is_empty() && self.open_brackets.contains(&kind) {
                        break;
                    }
                }
                _ => {}
            }
            tokens.push(self.stream.advance());
        }
        self.arena.alloc_skipped(tokens, offset)
    }

    /// Consume a token of `kind`, or fill the slot with an empty `Skipped`
    /// node and report.
    pub(crate) fn expect_element(&mut self, kind: TokenKind, what: &str) -> Element {
        if self.stream.check(kind) {
            Element::Token(self.stream.advance())
        } else {
            let error = ParseError::expected(what, self.stream.peek());
            self.report(error);
            Element::Node(self.missing())
        }
    }

    /// Like [`Parser::expect_element`] for a contextual keyword.
    pub(crate) fn expect_keyword_element(&mut self, keyword: &str) -> Element {
        if self.stream.check_keyword(keyword) {
            Element::Token(self.stream.advance())
        } else {
            let error = ParseError::expected(&format!("'{keyword}'"), self.stream.peek());
            self.report(error);
            Element::Node(self.missing())
        }
    }

    pub(crate) fn expect_token(&mut self, kind: TokenKind, what: &str) -> Result<TokenId, ParseError> {
        if self.stream.check(kind) {
            Ok(self.stream.advance())
        } else {
            Err(ParseError::expected(what, self.stream.peek()))
        }
    }

    /// Zero-width placeholder positioned after the last consumed token.
    pub(crate) fn missing(&mut self) -> NodeId {
        let offset = self.stream.previous_end();
        self.arena.alloc_empty(offset)
    }

    /// Identifier node, or an error if the current token is not one.
    pub(crate) fn identifier(&mut self, what: &str) -> Result<NodeId, ParseError> {
        let token = self.stream.peek();
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::expected(what, token));
        }
        let id = self.stream.advance();
        Ok(self.arena.alloc(SyntaxKind::Identifier {
            token: id,
            name: token.text.clone(),
        }))
    }

    /// Identifier in a slot that must not unwind: a missing name becomes an
    /// empty `Skipped` node.
    pub(crate) fn identifier_or_missing(&mut self, what: &str) -> NodeId {
        match self.identifier(what) {
            Ok(node) => node,
            Err(error) => {
                self.report(error);
                self.missing()
            }
        }
    }

    /// Push new-line tokens onto `out` while they are next.
    pub(crate) fn consume_newlines(&mut self, out: &mut Vec<Element>) {
        while self.stream.check(TokenKind::NewLine) {
            out.push(Element::Token(self.stream.advance()));
        }
    }

    /// Run `parse` one nesting level deeper, failing past
    /// [`MAX_NESTING_DEPTH`].
    pub(crate) fn nested<F>(&mut self, parse: F) -> Result<NodeId, ParseError>
    where
        F: FnOnce(&mut Self) -> Result<NodeId, ParseError>,
    {
        let depth = self.depth;
        let result = self.deepen().and_then(|()| parse(self));
        self.depth = depth;
        result
    }

    /// Open one nesting level without closing it. Callers restore
    /// `self.depth` when the construct ends.
    pub(crate) fn deepen(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::too_deep(self.stream.peek()));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` with `close` registered as an enclosing bracket.
    pub(crate) fn within<T, F>(&mut self, close: TokenKind, parse: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.open_brackets.push(close);
        let result = parse(self);
        self.open_brackets.pop();
        result
    }

    /// Report a container whose closing bracket never arrived and fill the
    /// slot with an empty `Skipped` node.
    pub(crate) fn unterminated(&mut self, open: TokenId, close: TokenKind) -> Element {
        let error = ParseError::unterminated(
            self.stream.token(open),
            close,
            self.stream.current_span(),
        );
        self.report(error);
        Element::Node(self.missing())
    }

    /// True if the token `offset` ahead starts a declaration header such as
    /// `var name` or `resource name`.
    pub(crate) fn declaration_follows(&self, offset: usize) -> bool {
        let keyword = self.stream.peek_nth(offset);
        keyword.kind == TokenKind::Identifier
            && DECLARATION_KEYWORDS.contains(&keyword.text.as_str())
            && self.stream.peek_nth(offset + 1).kind == TokenKind::Identifier
    }

    /// True if a closing bracket belongs to some container still open.
    pub(crate) fn closes_enclosing(&self, kind: TokenKind) -> bool {
        self.open_brackets.contains(&kind)
    }
}
