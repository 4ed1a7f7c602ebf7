//! Arrays, objects and for-expressions.
//!
//! Items and properties are separated by new lines or commas. Each item is
//! a recovery slot, so one bad property never loses its siblings.

use super::super::{ParseError, ParseErrorKind, Parser};
use cirrus_ast::{Element, NodeId, SyntaxKind, TokenId};
use cirrus_lexer::TokenKind;

/// Outcome of checking a container's terminators.
enum LoopStep {
    /// A separator or member comes next.
    Member,
    /// A stray token was consumed; check again.
    Again,
    Close(Element),
}

impl<'t> Parser<'t> {
    /// `[...]`, or `[for ...]` when the bracket is followed by `for`.
    pub(super) fn array_or_for(&mut self) -> Result<NodeId, ParseError> {
        if self.stream.peek_nth(1).is_keyword("for") {
            return self.for_expression();
        }
        let open = self.stream.advance();
        let (children, close) = self.within(TokenKind::RightSquare, |p| {
            p.members(open, TokenKind::RightSquare, |p| {
                let value = p.slot(|p| p.expression());
                p.arena.alloc(SyntaxKind::ArrayItem { value })
            })
        });
        Ok(self.arena.alloc(SyntaxKind::Array {
            open,
            children,
            close,
        }))
    }

    pub(super) fn object(&mut self) -> Result<NodeId, ParseError> {
        let open = self.stream.advance();
        let (children, close) = self.within(TokenKind::RightBrace, |p| {
            p.members(open, TokenKind::RightBrace, |p| p.slot(|p| p.object_property()))
        });
        Ok(self.arena.alloc(SyntaxKind::Object {
            open,
            children,
            close,
        }))
    }

    /// `key: value`; the key is an identifier or a string.
    fn object_property(&mut self) -> Result<NodeId, ParseError> {
        let key = match self.stream.peek_kind() {
            TokenKind::Identifier => self.identifier("a property name")?,
            TokenKind::StringComplete | TokenKind::StringLeftPiece => self.string_literal()?,
            _ => return Err(ParseError::expected("a property name", self.stream.peek())),
        };
        let colon = self.expect_element(TokenKind::Colon, "':'");
        let value = self.slot(|p| p.expression());
        Ok(self
            .arena
            .alloc(SyntaxKind::ObjectProperty { key, colon, value }))
    }

    /// Shared member loop for arrays and objects.
    fn members<F>(&mut self, open: TokenId, close: TokenKind, mut member: F) -> (Vec<Element>, Element)
    where
        F: FnMut(&mut Self) -> NodeId,
    {
        let mut children = Vec::new();
        let mut line_start = false;
        loop {
            match self.member_step(open, close, line_start, &mut children) {
                LoopStep::Close(element) => return (children, element),
                LoopStep::Again => continue,
                LoopStep::Member => {}
            }
            if matches!(
                self.stream.peek_kind(),
                TokenKind::NewLine | TokenKind::Comma
            ) {
                line_start = self.stream.check(TokenKind::NewLine);
                children.push(Element::Token(self.stream.advance()));
                continue;
            }

            children.push(Element::Node(member(self)));
            line_start = false;

            // A member must be followed by a separator or the closing bracket.
            let next = self.stream.peek_kind();
            if !matches!(next, TokenKind::NewLine | TokenKind::Comma | TokenKind::EndOfFile)
                && !next.is_closing_bracket()
            {
                let error = ParseError::new(
                    ParseErrorKind::ExpectedNewLine,
                    self.stream.current_span(),
                    "expected a new line or ',' after this item",
                );
                self.report(error);
                let skipped = self.skip_to_recovery_point();
                children.push(Element::Node(skipped));
            }
        }
    }

    /// Handle the container's terminators.
    fn member_step(
        &mut self,
        open: TokenId,
        close: TokenKind,
        line_start: bool,
        children: &mut Vec<Element>,
    ) -> LoopStep {
        let kind = self.stream.peek_kind();
        if kind == close {
            return LoopStep::Close(Element::Token(self.stream.advance()));
        }
        if kind == TokenKind::EndOfFile
            || (line_start && self.declaration_follows(0))
            || (kind.is_closing_bracket() && self.closes_enclosing(kind))
        {
            return LoopStep::Close(self.unterminated(open, close));
        }
        if kind.is_closing_bracket() {
            // Stray closer that belongs to nothing open.
            let error = ParseError::expected(&format!("'{}'", close.describe()), self.stream.peek());
            self.report(error);
            let tokens = vec![self.stream.advance()];
            let offset = self.arena.token_span(tokens[0]).start;
            children.push(Element::Node(self.arena.alloc_skipped(tokens, offset)));
            return LoopStep::Again;
        }
        LoopStep::Member
    }

    /// `[for item in source: body]` or `[for (item, index) in source: body]`
    fn for_expression(&mut self) -> Result<NodeId, ParseError> {
        let open = self.stream.advance();
        let keyword = self.stream.advance();
        self.within(TokenKind::RightSquare, |p| {
            let variables = if p.stream.check(TokenKind::LeftParen) {
                p.for_variable_block()?
            } else {
                p.loop_variable()?
            };
            let in_keyword = p.expect_keyword_element("in");
            let source = p.expression()?;
            let colon = p.expect_element(TokenKind::Colon, "':'");
            let body = p.body_expression()?;
            let close = p.expect_element(TokenKind::RightSquare, "']'");
            Ok(p.arena.alloc(SyntaxKind::ForExpression {
                open,
                keyword,
                variables,
                in_keyword,
                source,
                colon,
                body,
                close,
            }))
        })
    }

    fn loop_variable(&mut self) -> Result<NodeId, ParseError> {
        let token = self.stream.peek();
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::expected("a loop variable name", token));
        }
        let id = self.stream.advance();
        Ok(self.arena.alloc(SyntaxKind::LoopVariable {
            token: id,
            name: token.text.clone(),
        }))
    }

    /// `(item, index)`
    fn for_variable_block(&mut self) -> Result<NodeId, ParseError> {
        let open = self.stream.advance();
        let item = self.loop_variable()?;
        let comma = self.expect_element(TokenKind::Comma, "','");
        let index = self.loop_variable()?;
        let close = self.expect_element(TokenKind::RightParen, "')'");
        Ok(self.arena.alloc(SyntaxKind::ForVariableBlock {
            open,
            item,
            comma,
            index,
            close,
        }))
    }
}
