//! Compile-time diagnostics.
//!
//! Every user-facing problem the pipeline finds, from an unrecognized
//! character to an unknown resource property, is a [`Diagnostic`] value. No
//! stage reports user errors through `Result::Err`; those are reserved for
//! collaborator failures and compiler defects.
//!
//! # Design
//!
//! - `Diagnostic`: span, level, stable code and message
//! - `DiagnosticCode`: closed set of codes grouped by compiler phase
//! - `DiagnosticLevel`: info, warning or error
//!
//! # Examples
//!
//! ```
//! # use cirrus_ast::{Diagnostic, DiagnosticCode, TextSpan};
//! let diag = Diagnostic::error(
//!     DiagnosticCode::UndefinedSymbol,
//!     TextSpan::new(8, 9),
//!     "the name 'b' does not exist in the current context",
//! );
//! assert_eq!(diag.code.as_str(), "CIR031");
//! ```

use crate::span::TextSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Informational note
    Info,
    /// Suspicious but valid code; emission still succeeds
    Warning,
    /// Emission fails
    Error,
}

/// Stable diagnostic code.
///
/// # Invariant
///
/// The discriminant values are the numeric part of the rendered code
/// (`CIR` followed by three digits) and must never be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum DiagnosticCode {
    // Lexical
    UnrecognizedCharacter = 1,
    UnterminatedString = 2,
    UnterminatedMultilineString = 3,
    UnterminatedComment = 4,
    InvalidEscape = 5,

    // Syntax
    UnexpectedToken = 10,
    ExpectedDeclaration = 11,
    ExpectedNewLine = 12,
    IntegerOutOfRange = 13,
    UnterminatedContainer = 14,

    // Module resolution
    ModuleNotFound = 20,
    ModuleCycle = 21,
    InvalidModulePath = 22,

    // Binding and type checking
    DuplicateSymbol = 30,
    UndefinedSymbol = 31,
    TypeMismatch = 32,
    UnknownFunction = 33,
    ArgumentCount = 34,
    ArgumentType = 35,
    UnknownProperty = 36,
    ValueCycle = 37,
    InvalidTypeName = 38,
    UnknownResourceType = 39,
    MissingRequiredProperty = 40,
    InvalidDecorator = 41,
    InvalidLoopSource = 42,
    ForExpressionNotAllowed = 43,
    InvalidResourceType = 44,
    ReadOnlyProperty = 45,
    DuplicateProperty = 46,
    PropertyAccessOnNonObject = 47,
    InvalidIndex = 48,
    StringLiteralRequired = 49,
    UnusedParameter = 50,
    CollectionNotIndexed = 51,
    ObjectLiteralRequired = 52,

    // Defects
    InternalFault = 900,
}

impl DiagnosticCode {
    /// Rendered code, e.g. `CIR031`.
    pub fn as_str(self) -> String {
        format!("CIR{:03}", self as u16)
    }

    /// Short human-readable name of the problem class.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticCode::UnrecognizedCharacter => "unrecognized character",
            DiagnosticCode::UnterminatedString => "unterminated string",
            DiagnosticCode::UnterminatedMultilineString => "unterminated multi-line string",
            DiagnosticCode::UnterminatedComment => "unterminated comment",
            DiagnosticCode::InvalidEscape => "invalid escape sequence",
            DiagnosticCode::UnexpectedToken => "unexpected token",
            DiagnosticCode::ExpectedDeclaration => "expected declaration",
            DiagnosticCode::ExpectedNewLine => "expected new line",
            DiagnosticCode::IntegerOutOfRange => "integer out of range",
            DiagnosticCode::UnterminatedContainer => "unterminated container",
            DiagnosticCode::ModuleNotFound => "module not found",
            DiagnosticCode::ModuleCycle => "module cycle",
            DiagnosticCode::InvalidModulePath => "invalid module path",
            DiagnosticCode::DuplicateSymbol => "duplicate symbol",
            DiagnosticCode::UndefinedSymbol => "undefined symbol",
            DiagnosticCode::TypeMismatch => "type mismatch",
            DiagnosticCode::UnknownFunction => "unknown function",
            DiagnosticCode::ArgumentCount => "wrong argument count",
            DiagnosticCode::ArgumentType => "argument type mismatch",
            DiagnosticCode::UnknownProperty => "unknown property",
            DiagnosticCode::ValueCycle => "value dependency cycle",
            DiagnosticCode::InvalidTypeName => "invalid type name",
            DiagnosticCode::UnknownResourceType => "unknown resource type",
            DiagnosticCode::MissingRequiredProperty => "missing required property",
            DiagnosticCode::InvalidDecorator => "invalid decorator",
            DiagnosticCode::InvalidLoopSource => "invalid loop source",
            DiagnosticCode::ForExpressionNotAllowed => "for-expression not allowed",
            DiagnosticCode::InvalidResourceType => "invalid resource type",
            DiagnosticCode::ReadOnlyProperty => "read-only property",
            DiagnosticCode::DuplicateProperty => "duplicate property",
            DiagnosticCode::PropertyAccessOnNonObject => "property access on non-object",
            DiagnosticCode::InvalidIndex => "invalid index",
            DiagnosticCode::StringLiteralRequired => "string literal required",
            DiagnosticCode::UnusedParameter => "unused parameter",
            DiagnosticCode::CollectionNotIndexed => "collection not indexed",
            DiagnosticCode::ObjectLiteralRequired => "object literal required",
            DiagnosticCode::InternalFault => "internal compiler fault",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CIR{:03}", *self as u16)
    }
}

/// A single diagnostic attached to one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub span: TextSpan,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        level: DiagnosticLevel,
        code: DiagnosticCode,
        span: TextSpan,
        message: impl Into<String>,
    ) -> Self {
        Self {
            span,
            level,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: DiagnosticCode, span: TextSpan, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, code, span, message)
    }

    pub fn warning(code: DiagnosticCode, span: TextSpan, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, code, span, message)
    }

    pub fn info(code: DiagnosticCode, span: TextSpan, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, code, span, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Info => write!(f, "info"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.level, self.code, self.message)
    }
}

/// Sort diagnostics by span, then code, keeping the original order for ties.
pub fn sort_by_span(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.span.cmp(&b.span).then((a.code as u16).cmp(&(b.code as u16))));
}
