// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for Cirrus.
//!
//! Raw scanning is done by a logos-derived `RawToken` enum; [`lex`] turns
//! that stream into [`Token`]s, folding whitespace and comments into the
//! leading trivia of the next token.
//!
//! # Design
//!
//! - Lossless: concatenating every token's trivia and text reproduces the
//!   input byte for byte, line endings included
//! - `\r\n`, `\r` and `\n` each lex as one `NewLine` token whose text is the
//!   exact bytes consumed; mixed endings in one file are fine
//! - Strings are single-quoted with `${...}` interpolation; the lexer keeps
//!   a stack of open interpolations in the logos extras so a `}` knows
//!   whether it closes a brace or resumes a string
//! - Unrecognized input becomes one `Unrecognized` token per character plus
//!   a diagnostic; the lexer never stops early
//!
//! # Examples
//!
//! ```
//! # use cirrus_lexer::*;
//! let result = lex("param name string = 'vm-${suffix}'\n");
//! let kinds: Vec<TokenKind> = result.tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(kinds[3], TokenKind::Assignment);
//! assert_eq!(kinds[4], TokenKind::StringLeftPiece);
//! assert!(result.diagnostics.is_empty());
//! ```

use cirrus_ast::{Diagnostic, DiagnosticCode, TextSpan};
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a lexed token.
///
/// Declaration keywords (`param`, `resource`, `existing`, `for`, ...) are
/// contextual and lex as `Identifier`; only the literal keywords `true`,
/// `false` and `null` are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenKind {
    Identifier,
    Integer,
    /// `'text'` with no interpolation
    StringComplete,
    /// `'text${`
    StringLeftPiece,
    /// `}text${`
    StringMiddlePiece,
    /// `}text'`
    StringRightPiece,
    /// `'''text'''`, verbatim
    MultilineString,
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    Comma,
    Dot,
    Colon,
    Question,
    At,
    Assignment,
    Equals,
    NotEquals,
    EqualsInsensitive,
    NotEqualsInsensitive,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Modulo,
    Exclamation,
    LogicalAnd,
    LogicalOr,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,
    NewLine,
    /// A character the lexer does not understand.
    Unrecognized,
    EndOfFile,
}

/// Fixed spellings, indexed by `TokenKind` discriminant. Variable-text kinds
/// hold a descriptive name instead.
const TOKEN_STRINGS: &[&str] = &[
    "identifier",
    "integer",
    "string",
    "string",
    "string",
    "string",
    "multi-line string",
    "{",
    "}",
    "(",
    ")",
    "[",
    "]",
    ",",
    ".",
    ":",
    "?",
    "@",
    "=",
    "==",
    "!=",
    "=~",
    "!~",
    "<",
    "<=",
    ">",
    ">=",
    "+",
    "-",
    "*",
    "/",
    "%",
    "!",
    "&&",
    "||",
    "true",
    "false",
    "null",
    "new line",
    "unrecognized character",
    "end of file",
];

impl TokenKind {
    /// Spelling (or description) used in diagnostics.
    pub fn describe(self) -> &'static str {
        TOKEN_STRINGS[self as usize]
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            TokenKind::StringComplete
                | TokenKind::StringLeftPiece
                | TokenKind::StringMiddlePiece
                | TokenKind::StringRightPiece
                | TokenKind::MultilineString
        )
    }

    pub fn is_opening_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::LeftSquare
        )
    }

    pub fn is_closing_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightSquare
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriviaKind {
    Whitespace,
    LineComment,
    BlockComment,
}

/// Non-semantic text attached to the following token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: TextSpan,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Span of the token text, excluding trivia.
    pub span: TextSpan,
    pub text: String,
    pub leading_trivia: Vec<Trivia>,
}

impl Token {
    /// True for an identifier spelled `keyword`.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == keyword
    }

    /// Span including leading trivia.
    pub fn full_span(&self) -> TextSpan {
        match self.leading_trivia.first() {
            Some(first) => first.span.merge(&self.span),
            None => self.span,
        }
    }

    /// Append trivia and text to `out`, reproducing the source.
    pub fn write_to(&self, out: &mut String) {
        for trivia in &self.leading_trivia {
            out.push_str(&trivia.text);
        }
        out.push_str(&self.text);
    }
}

/// Tokens (ending with `EndOfFile`) and lexical diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rebuild source text from tokens.
pub fn reconstruct(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        token.write_to(&mut out);
    }
    out
}

// === Raw scanning ===

/// How a string piece ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringEnd {
    /// Closing quote.
    Quote,
    /// `${` opening an interpolation.
    Interpolation,
    /// Line break or end of input before the closing quote.
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceClose {
    Plain,
    String(StringEnd),
}

/// Open interpolations, innermost last. Each entry counts the plain `{`
/// currently open inside that interpolation.
#[derive(Debug, Default)]
struct LexerState {
    interpolations: Vec<u32>,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(extras = LexerState)]
enum RawToken {
    #[regex(r"[ \t]+")]
    Whitespace,
    #[regex(r"//[^\r\n]*")]
    LineComment,
    /// Payload is `false` when the comment is unterminated.
    #[token("/*", block_comment)]
    BlockComment(bool),
    #[regex(r"\r\n|\r|\n", end_line)]
    NewLine,

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
    #[regex(r"[0-9]+")]
    Integer,

    #[token("'''", multiline_string)]
    MultilineString(bool),
    #[token("'", string_body)]
    StringStart(StringEnd),

    #[token("{", open_brace)]
    LeftBrace,
    #[token("}", close_brace)]
    RightBrace(BraceClose),
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftSquare,
    #[token("]")]
    RightSquare,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("@")]
    At,
    #[token("=")]
    Assignment,
    #[token("==")]
    Equals,
    #[token("!=")]
    NotEquals,
    #[token("=~")]
    EqualsInsensitive,
    #[token("!~")]
    NotEqualsInsensitive,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanOrEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanOrEqual,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("%")]
    Modulo,
    #[token("!")]
    Exclamation,
    #[token("&&")]
    LogicalAnd,
    #[token("||")]
    LogicalOr,
}

fn block_comment(lex: &mut logos::Lexer<RawToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(pos) => {
            lex.bump(pos + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

fn multiline_string(lex: &mut logos::Lexer<RawToken>) -> bool {
    match lex.remainder().find("'''") {
        Some(pos) => {
            lex.bump(pos + 3);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

/// Scan string content after an opening `'` or a closing interpolation `}`.
///
/// Stops only on ASCII bytes, so every bump lands on a char boundary.
fn string_body(lex: &mut logos::Lexer<RawToken>) -> StringEnd {
    let bytes = lex.remainder().as_bytes();
    let mut idx = 0;
    let end = loop {
        match bytes.get(idx) {
            None | Some(b'\r') | Some(b'\n') => break StringEnd::Unterminated,
            Some(b'\\') => match bytes.get(idx + 1) {
                None | Some(b'\r') | Some(b'\n') => idx += 1,
                Some(_) => idx += 2,
            },
            Some(b'\'') => {
                idx += 1;
                break StringEnd::Quote;
            }
            Some(b'$') if bytes.get(idx + 1) == Some(&b'{') => {
                idx += 2;
                break StringEnd::Interpolation;
            }
            Some(_) => idx += 1,
        }
    };
    lex.bump(idx);
    if end == StringEnd::Interpolation {
        lex.extras.interpolations.push(0);
    }
    end
}

/// Strings are single-line, so a line break abandons every open
/// interpolation.
fn end_line(lex: &mut logos::Lexer<RawToken>) -> bool {
    lex.extras.interpolations.clear();
    true
}

fn open_brace(lex: &mut logos::Lexer<RawToken>) -> bool {
    if let Some(depth) = lex.extras.interpolations.last_mut() {
        *depth += 1;
    }
    true
}

fn close_brace(lex: &mut logos::Lexer<RawToken>) -> BraceClose {
    match lex.extras.interpolations.last().copied() {
        Some(0) => {
            lex.extras.interpolations.pop();
            BraceClose::String(string_body(lex))
        }
        Some(_) => {
            if let Some(depth) = lex.extras.interpolations.last_mut() {
                *depth -= 1;
            }
            BraceClose::Plain
        }
        None => BraceClose::Plain,
    }
}

// === Token assembly ===

struct Assembler<'src> {
    text: &'src str,
    tokens: Vec<Token>,
    trivia: Vec<Trivia>,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Assembler<'src> {
    fn push_trivia(&mut self, kind: TriviaKind, span: TextSpan) {
        self.trivia.push(Trivia {
            kind,
            span,
            text: span.slice(self.text).to_string(),
        });
    }

    fn push_token(&mut self, kind: TokenKind, span: TextSpan) {
        self.tokens.push(Token {
            kind,
            span,
            text: span.slice(self.text).to_string(),
            leading_trivia: std::mem::take(&mut self.trivia),
        });
    }

    /// One `Unrecognized` token and diagnostic per character.
    fn push_unrecognized(&mut self, range: std::ops::Range<usize>) {
        let chunk = &self.text[range.clone()];
        for (offset, ch) in chunk.char_indices() {
            let start = range.start + offset;
            let span = TextSpan::from_range(start..start + ch.len_utf8());
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::UnrecognizedCharacter,
                span,
                format!("the character '{}' is not recognized", ch.escape_debug()),
            ));
            self.push_token(TokenKind::Unrecognized, span);
        }
    }

    fn push_string(&mut self, start_kind: StringStartKind, end: StringEnd, span: TextSpan) {
        let kind = match (start_kind, end) {
            (StringStartKind::Quote, StringEnd::Interpolation) => TokenKind::StringLeftPiece,
            (StringStartKind::Quote, _) => TokenKind::StringComplete,
            (StringStartKind::Brace, StringEnd::Interpolation) => TokenKind::StringMiddlePiece,
            (StringStartKind::Brace, _) => TokenKind::StringRightPiece,
        };
        if end == StringEnd::Unterminated {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::UnterminatedString,
                span,
                "the string at this location is not terminated",
            ));
        }
        self.push_token(kind, span);
    }
}

#[derive(Clone, Copy)]
enum StringStartKind {
    Quote,
    Brace,
}

/// Tokenize `text`.
///
/// Always returns at least the `EndOfFile` token; the end-of-file token
/// carries any trailing trivia.
pub fn lex(text: &str) -> LexResult {
    let mut asm = Assembler {
        text,
        tokens: Vec::new(),
        trivia: Vec::new(),
        diagnostics: Vec::new(),
    };
    let mut cursor = 0usize;

    for (raw, range) in RawToken::lexer(text).spanned() {
        if range.start > cursor {
            asm.push_unrecognized(cursor..range.start);
        }
        if range.end <= cursor {
            continue;
        }
        cursor = range.end;
        let span = TextSpan::from_range(range.clone());

        let raw = match raw {
            Ok(raw) => raw,
            Err(()) => {
                asm.push_unrecognized(range);
                continue;
            }
        };

        let kind = match raw {
            RawToken::Whitespace => {
                asm.push_trivia(TriviaKind::Whitespace, span);
                continue;
            }
            RawToken::LineComment => {
                asm.push_trivia(TriviaKind::LineComment, span);
                continue;
            }
            RawToken::BlockComment(terminated) => {
                if !terminated {
                    asm.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::UnterminatedComment,
                        span,
                        "the multi-line comment at this location is not terminated",
                    ));
                }
                asm.push_trivia(TriviaKind::BlockComment, span);
                continue;
            }
            RawToken::StringStart(end) => {
                asm.push_string(StringStartKind::Quote, end, span);
                continue;
            }
            RawToken::RightBrace(BraceClose::String(end)) => {
                asm.push_string(StringStartKind::Brace, end, span);
                continue;
            }
            RawToken::MultilineString(terminated) => {
                if !terminated {
                    asm.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::UnterminatedMultilineString,
                        span,
                        "the multi-line string at this location is not terminated",
                    ));
                }
                TokenKind::MultilineString
            }
            RawToken::RightBrace(BraceClose::Plain) => TokenKind::RightBrace,
            RawToken::NewLine => TokenKind::NewLine,
            RawToken::True => TokenKind::TrueKeyword,
            RawToken::False => TokenKind::FalseKeyword,
            RawToken::Null => TokenKind::NullKeyword,
            RawToken::Identifier => TokenKind::Identifier,
            RawToken::Integer => TokenKind::Integer,
            RawToken::LeftBrace => TokenKind::LeftBrace,
            RawToken::LeftParen => TokenKind::LeftParen,
            RawToken::RightParen => TokenKind::RightParen,
            RawToken::LeftSquare => TokenKind::LeftSquare,
            RawToken::RightSquare => TokenKind::RightSquare,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Question => TokenKind::Question,
            RawToken::At => TokenKind::At,
            RawToken::Assignment => TokenKind::Assignment,
            RawToken::Equals => TokenKind::Equals,
            RawToken::NotEquals => TokenKind::NotEquals,
            RawToken::EqualsInsensitive => TokenKind::EqualsInsensitive,
            RawToken::NotEqualsInsensitive => TokenKind::NotEqualsInsensitive,
            RawToken::LessThan => TokenKind::LessThan,
            RawToken::LessThanOrEqual => TokenKind::LessThanOrEqual,
            RawToken::GreaterThan => TokenKind::GreaterThan,
            RawToken::GreaterThanOrEqual => TokenKind::GreaterThanOrEqual,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Asterisk => TokenKind::Asterisk,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Modulo => TokenKind::Modulo,
            RawToken::Exclamation => TokenKind::Exclamation,
            RawToken::LogicalAnd => TokenKind::LogicalAnd,
            RawToken::LogicalOr => TokenKind::LogicalOr,
        };
        asm.push_token(kind, span);
    }

    if cursor < text.len() {
        asm.push_unrecognized(cursor..text.len());
    }
    asm.push_token(TokenKind::EndOfFile, TextSpan::empty(text.len() as u32));

    LexResult {
        tokens: asm.tokens,
        diagnostics: asm.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test helper: token kinds without the trailing end-of-file token.
    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut kinds: Vec<_> = lex(source).tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds.pop(), Some(TokenKind::EndOfFile));
        kinds
    }

    fn texts(source: &str) -> Vec<String> {
        lex(source).tokens.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_declaration_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("param location string = 'westus'"),
            vec![Identifier, Identifier, Identifier, Assignment, StringComplete]
        );
    }

    #[test]
    fn test_literal_keywords_are_reserved() {
        use TokenKind::*;
        assert_eq!(
            kinds("true false null trueish"),
            vec![TrueKeyword, FalseKeyword, NullKeyword, Identifier]
        );
    }

    #[test]
    fn test_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("== != =~ !~ < <= > >= + - * / % ! && || ? : . , @ ="),
            vec![
                Equals,
                NotEquals,
                EqualsInsensitive,
                NotEqualsInsensitive,
                LessThan,
                LessThanOrEqual,
                GreaterThan,
                GreaterThanOrEqual,
                Plus,
                Minus,
                Asterisk,
                Slash,
                Modulo,
                Exclamation,
                LogicalAnd,
                LogicalOr,
                Question,
                Colon,
                Dot,
                Comma,
                At,
                Assignment
            ]
        );
    }

    #[test]
    fn test_each_line_ending_is_one_token() {
        let result = lex("a\r\nb\rc\nd");
        let newlines: Vec<_> = result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::NewLine)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(newlines, vec!["\r\n", "\r", "\n"]);
    }

    #[test]
    fn test_round_trip_mixed_line_endings() {
        let source = "// header\r\nparam a string\n\n/* block\r\n */ var b = 'x${a}y' \r";
        let result = lex(source);
        assert_eq!(reconstruct(&result.tokens), source);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_round_trip_garbage() {
        let sources = [
            "",
            "$$$",
            "param ¤ ~ #",
            "'unterminated",
            "'a${'b${c}'",
            "}}}{{{",
            "/* never closed",
            "'''open",
            "\u{feff}var x = 1",
        ];
        for source in sources {
            let result = lex(source);
            assert_eq!(reconstruct(&result.tokens), source, "source {source:?}");
            assert_eq!(result.tokens.last().unwrap().kind, TokenKind::EndOfFile);
        }
    }

    #[test]
    fn test_comments_are_leading_trivia() {
        let result = lex("// note\nvar /* inline */ x = 1");
        let newline = &result.tokens[0];
        assert_eq!(newline.kind, TokenKind::NewLine);
        assert_eq!(newline.leading_trivia[0].kind, TriviaKind::LineComment);
        assert_eq!(newline.leading_trivia[0].text, "// note");

        let x = &result.tokens[2];
        assert_eq!(x.text, "x");
        let trivia: Vec<_> = x.leading_trivia.iter().map(|t| t.kind).collect();
        assert_eq!(
            trivia,
            vec![
                TriviaKind::Whitespace,
                TriviaKind::BlockComment,
                TriviaKind::Whitespace
            ]
        );
    }

    #[test]
    fn test_unrecognized_character_is_single_token() {
        let result = lex("var a = 1 ~~ 2");
        let unrecognized: Vec<_> = result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Unrecognized)
            .collect();
        assert_eq!(unrecognized.len(), 2);
        assert!(unrecognized.iter().all(|t| t.text == "~"));
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(
            result.diagnostics[0].code,
            DiagnosticCode::UnrecognizedCharacter
        );
        assert_eq!(result.diagnostics[0].span, TextSpan::new(10, 11));
    }

    #[test]
    fn test_interpolation_pieces() {
        use TokenKind::*;
        assert_eq!(
            kinds("'a${b}c${d}e'"),
            vec![
                StringLeftPiece,
                Identifier,
                StringMiddlePiece,
                Identifier,
                StringRightPiece
            ]
        );
        assert_eq!(texts("'a${b}c'")[..3], ["'a${", "b", "}c'"]);
    }

    #[test]
    fn test_braces_inside_interpolation() {
        use TokenKind::*;
        assert_eq!(
            kinds("'${f({a: 1})}'"),
            vec![
                StringLeftPiece,
                Identifier,
                LeftParen,
                LeftBrace,
                Identifier,
                Colon,
                Integer,
                RightBrace,
                RightParen,
                StringRightPiece
            ]
        );
    }

    #[test]
    fn test_nested_interpolation() {
        use TokenKind::*;
        assert_eq!(
            kinds("'a${'b${c}'}d'"),
            vec![
                StringLeftPiece,
                StringLeftPiece,
                Identifier,
                StringRightPiece,
                StringRightPiece
            ]
        );
    }

    #[test]
    fn test_escaped_quote_and_dollar() {
        use TokenKind::*;
        assert_eq!(kinds(r"'it\'s \${x}'"), vec![StringComplete]);
    }

    #[test]
    fn test_unterminated_string_stops_at_line_end() {
        let result = lex("var a = 'oops\nvar b = 1");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].code,
            DiagnosticCode::UnterminatedString
        );
        let string = result
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::StringComplete)
            .unwrap();
        assert_eq!(string.text, "'oops");
    }

    #[test]
    fn test_unclosed_interpolation_ends_at_line_break() {
        use TokenKind::*;
        let source = "var s = 'a${b\nvar o = {\n  x: 1\n}\n";
        let result = lex(source);
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Identifier, Identifier, Assignment, StringLeftPiece, Identifier, NewLine,
                Identifier, Identifier, Assignment, LeftBrace, NewLine,
                Identifier, Colon, Integer, NewLine,
                RightBrace, NewLine, EndOfFile
            ]
        );
        assert!(result.diagnostics.is_empty());
        assert_eq!(reconstruct(&result.tokens), source);
    }

    #[test]
    fn test_unclosed_interpolation_at_end_of_input() {
        use TokenKind::*;
        assert_eq!(kinds("'a${b"), vec![StringLeftPiece, Identifier]);
        assert_eq!(kinds("'a${b\n}'"), vec![StringLeftPiece, Identifier, NewLine, RightBrace, StringComplete]);
    }

    #[test]
    fn test_multiline_string_is_verbatim() {
        let source = "'''\nline ${not} interpolated\r\n'''";
        let result = lex(source);
        assert_eq!(result.tokens[0].kind, TokenKind::MultilineString);
        assert_eq!(result.tokens[0].text, source);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_unterminated_block_comment() {
        let result = lex("var x = 1 /* dangling");
        assert_eq!(
            result.diagnostics[0].code,
            DiagnosticCode::UnterminatedComment
        );
        let eof = result.tokens.last().unwrap();
        assert_eq!(eof.leading_trivia.last().unwrap().text, "/* dangling");
    }

    #[test]
    fn test_eof_carries_trailing_trivia() {
        let result = lex("var x = 1   // done");
        let eof = result.tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::EndOfFile);
        assert_eq!(eof.span, TextSpan::empty(19));
        assert_eq!(eof.leading_trivia.len(), 2);
    }

    #[test]
    fn test_describe_table_matches_variants() {
        assert_eq!(TokenKind::EndOfFile.describe(), "end of file");
        assert_eq!(TokenKind::LogicalOr.describe(), "||");
        assert_eq!(TokenKind::NewLine.describe(), "new line");
        assert_eq!(TOKEN_STRINGS.len(), TokenKind::EndOfFile as usize + 1);
    }
}
