//! Atom parsing: literals, strings, identifiers, calls and parentheses.

use super::super::strings::decode_piece;
use super::super::{ParseError, ParseErrorKind, Parser};
use cirrus_ast::{Element, NodeId, SyntaxKind, TokenId};
use cirrus_lexer::TokenKind;

impl<'t> Parser<'t> {
    pub(super) fn atom(&mut self) -> Result<NodeId, ParseError> {
        let token = self.stream.peek();
        match token.kind {
            TokenKind::Integer => {
                let id = self.stream.advance();
                let value = match token.text.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.report_local(ParseError::new(
                            ParseErrorKind::IntegerOutOfRange,
                            token.span,
                            format!(
                                "the integer literal {} is outside the range of a 64-bit signed integer",
                                token.text
                            ),
                        ));
                        0
                    }
                };
                Ok(self
                    .arena
                    .alloc(SyntaxKind::IntegerLiteral { token: id, value }))
            }
            TokenKind::TrueKeyword | TokenKind::FalseKeyword => {
                let id = self.stream.advance();
                Ok(self.arena.alloc(SyntaxKind::BooleanLiteral {
                    token: id,
                    value: token.kind == TokenKind::TrueKeyword,
                }))
            }
            TokenKind::NullKeyword => {
                let id = self.stream.advance();
                Ok(self.arena.alloc(SyntaxKind::NullLiteral { token: id }))
            }
            TokenKind::StringComplete
            | TokenKind::StringLeftPiece
            | TokenKind::MultilineString => self.string_literal(),
            TokenKind::Identifier => self.identifier_atom(),
            TokenKind::LeftParen => self.parenthesized(),
            TokenKind::LeftSquare => self.array_or_for(),
            TokenKind::LeftBrace => self.object(),
            _ => Err(ParseError::expected("an expression", token)),
        }
    }

    /// String literal, collecting interpolation holes.
    pub(crate) fn string_literal(&mut self) -> Result<NodeId, ParseError> {
        let first = self.stream.peek();
        let mut tokens = vec![self.stream.advance()];
        let mut expressions = Vec::new();
        let mut segments = Vec::new();
        self.push_segment(first, &mut segments);

        if first.kind == TokenKind::StringLeftPiece {
            loop {
                let hole = self.expression()?;
                expressions.push(hole);
                let piece = self.stream.peek();
                match piece.kind {
                    TokenKind::StringMiddlePiece | TokenKind::StringRightPiece => {
                        tokens.push(self.stream.advance());
                        self.push_segment(piece, &mut segments);
                        if piece.kind == TokenKind::StringRightPiece {
                            break;
                        }
                    }
                    _ => return Err(ParseError::expected("'}'", piece)),
                }
            }
        }

        Ok(self.arena.alloc(SyntaxKind::StringLiteral {
            tokens,
            expressions,
            segments,
        }))
    }

    fn push_segment(&mut self, token: &cirrus_lexer::Token, segments: &mut Vec<String>) {
        let (text, errors) = decode_piece(token);
        for error in errors {
            self.report_local(error);
        }
        segments.push(text);
    }

    /// Variable reference or function call.
    fn identifier_atom(&mut self) -> Result<NodeId, ParseError> {
        let name = self.identifier("an identifier")?;
        if !self.stream.check(TokenKind::LeftParen) {
            return Ok(self.arena.alloc(SyntaxKind::VariableAccess { name }));
        }
        let open = self.stream.advance();
        let (children, close) = self.within(TokenKind::RightParen, |p| p.call_arguments(open));
        Ok(self.arena.alloc(SyntaxKind::FunctionCall {
            name,
            open,
            children,
            close,
        }))
    }

    /// Arguments after `(`, through the closing `)`. New lines between
    /// arguments are allowed.
    fn call_arguments(&mut self, open: TokenId) -> (Vec<Element>, Element) {
        let mut children = Vec::new();
        loop {
            self.consume_newlines(&mut children);
            match self.stream.peek_kind() {
                TokenKind::RightParen => {
                    return (children, Element::Token(self.stream.advance()));
                }
                TokenKind::EndOfFile => {
                    return (children, self.unterminated(open, TokenKind::RightParen));
                }
                TokenKind::Comma => {
                    // Leading or doubled comma.
                    let error = ParseError::expected("an expression", self.stream.peek());
                    self.report(error);
                    children.push(Element::Token(self.stream.advance()));
                }
                kind if kind.is_closing_bracket() && self.closes_enclosing(kind) => {
                    return (children, self.unterminated(open, TokenKind::RightParen));
                }
                _ => {
                    let arg = self.slot(|p| p.expression());
                    children.push(Element::Node(arg));
                    self.consume_newlines(&mut children);
                    if self.stream.check(TokenKind::Comma) {
                        children.push(Element::Token(self.stream.advance()));
                    } else if !self.stream.check(TokenKind::RightParen)
                        && !self.stream.at_end()
                        && !self.stream.peek_kind().is_closing_bracket()
                    {
                        let error = ParseError::expected("',' or ')'", self.stream.peek());
                        self.report(error);
                        let skipped = self.skip_to_recovery_point();
                        children.push(Element::Node(skipped));
                    }
                }
            }
        }
    }

    /// `( expression )`
    pub(crate) fn parenthesized(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect_token(TokenKind::LeftParen, "'('")?;
        let expression = self.within(TokenKind::RightParen, |p| p.expression())?;
        let close = self.expect_element(TokenKind::RightParen, "')'");
        Ok(self.arena.alloc(SyntaxKind::Parenthesized {
            open,
            expression,
            close,
        }))
    }
}
