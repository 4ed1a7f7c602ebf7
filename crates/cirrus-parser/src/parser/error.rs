//! Parse errors and their diagnostic form.

use cirrus_ast::{Diagnostic, DiagnosticCode, TextSpan};
use cirrus_lexer::{Token, TokenKind};
use std::fmt;

/// Parse error with source location and context.
///
/// Errors never escape the parser: the nearest recovery point turns them
/// into a [`Diagnostic`] and a `Skipped` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: TextSpan,
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token or construct was expected but something else was
    /// found.
    UnexpectedToken,
    /// The file ended inside a construct.
    UnexpectedEof,
    /// A line does not start with a declaration keyword or decorator.
    ExpectedDeclaration,
    /// Extra tokens after a complete declaration or object property.
    ExpectedNewLine,
    /// A `{`, `[` or `(` without its closing bracket.
    UnterminatedContainer,
    IntegerOutOfRange,
    InvalidEscape,
    /// Expressions nested past [`MAX_NESTING_DEPTH`](super::MAX_NESTING_DEPTH).
    NestingTooDeep,
}

impl ParseErrorKind {
    pub fn code(self) -> DiagnosticCode {
        match self {
            ParseErrorKind::UnexpectedToken
            | ParseErrorKind::UnexpectedEof
            | ParseErrorKind::NestingTooDeep => DiagnosticCode::UnexpectedToken,
            ParseErrorKind::ExpectedDeclaration => DiagnosticCode::ExpectedDeclaration,
            ParseErrorKind::ExpectedNewLine => DiagnosticCode::ExpectedNewLine,
            ParseErrorKind::UnterminatedContainer => DiagnosticCode::UnterminatedContainer,
            ParseErrorKind::IntegerOutOfRange => DiagnosticCode::IntegerOutOfRange,
            ParseErrorKind::InvalidEscape => DiagnosticCode::InvalidEscape,
        }
    }
}

/// How a token is named in messages.
fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::EndOfFile => "end of file".to_string(),
        TokenKind::NewLine => "new line".to_string(),
        TokenKind::Identifier | TokenKind::Integer => format!("'{}'", token.text),
        kind if kind.is_string() => "string".to_string(),
        kind => format!("'{}'", kind.describe()),
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: TextSpan, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// `expected <what> but found <token>`.
    pub fn expected(what: &str, found: &Token) -> Self {
        let kind = if found.kind == TokenKind::EndOfFile {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::UnexpectedToken
        };
        Self::new(
            kind,
            found.span,
            format!("expected {what} but found {}", describe(found)),
        )
    }

    pub fn unterminated(open: &Token, close: TokenKind, at: TextSpan) -> Self {
        Self::new(
            ParseErrorKind::UnterminatedContainer,
            at,
            format!(
                "the '{}' opened at offset {} is missing its closing '{}'",
                open.text,
                open.span.start,
                close.describe()
            ),
        )
    }

    pub fn too_deep(at: &Token) -> Self {
        Self::new(
            ParseErrorKind::NestingTooDeep,
            at.span,
            format!(
                "expressions are nested more than {} levels deep",
                super::MAX_NESTING_DEPTH
            ),
        )
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(self.kind.code(), self.span, self.message)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}
