//! Expression parsing.
//!
//! - `pratt`: ternary, binary and unary operators, postfix chains
//! - `atoms`: literals, strings, identifiers, calls, parentheses
//! - `collections`: arrays, objects, for-expressions

mod atoms;
mod collections;
mod pratt;

use super::{ParseError, Parser};
use cirrus_ast::{NodeId, SyntaxKind};
use cirrus_lexer::TokenKind;

impl<'t> Parser<'t> {
    /// Parse a full expression, ternary included.
    pub(crate) fn expression(&mut self) -> Result<NodeId, ParseError> {
        self.ternary()
    }

    /// Value of a resource or module declaration, or the body of a
    /// for-expression: `if (cond) { ... }` or any expression.
    pub(crate) fn body_expression(&mut self) -> Result<NodeId, ParseError> {
        if self.stream.check_keyword("if") && self.stream.peek_nth(1).kind == TokenKind::LeftParen {
            self.if_condition()
        } else {
            self.expression()
        }
    }

    /// `if (condition) body`
    fn if_condition(&mut self) -> Result<NodeId, ParseError> {
        let keyword = self.stream.advance();
        let condition = self.parenthesized()?;
        let body = self.expression()?;
        Ok(self.arena.alloc(SyntaxKind::IfCondition {
            keyword,
            condition,
            body,
        }))
    }
}
