//! Pratt parser core - precedence climbing for binary and unary operators.

use super::super::{ParseError, Parser};
use cirrus_ast::{BinaryOperator, NodeId, SyntaxKind, UnaryOperator};
use cirrus_lexer::TokenKind;

/// Get binary operator metadata (precedence and operator enum).
///
/// Higher precedence binds tighter. All binary operators are
/// left-associative.
fn binary_op_info(kind: TokenKind) -> Option<(u8, BinaryOperator)> {
    match kind {
        TokenKind::LogicalOr => Some((10, BinaryOperator::LogicalOr)),
        TokenKind::LogicalAnd => Some((20, BinaryOperator::LogicalAnd)),
        TokenKind::Equals => Some((30, BinaryOperator::Equals)),
        TokenKind::NotEquals => Some((30, BinaryOperator::NotEquals)),
        TokenKind::EqualsInsensitive => Some((30, BinaryOperator::EqualsInsensitive)),
        TokenKind::NotEqualsInsensitive => Some((30, BinaryOperator::NotEqualsInsensitive)),
        TokenKind::LessThan => Some((40, BinaryOperator::LessThan)),
        TokenKind::LessThanOrEqual => Some((40, BinaryOperator::LessThanOrEqual)),
        TokenKind::GreaterThan => Some((40, BinaryOperator::GreaterThan)),
        TokenKind::GreaterThanOrEqual => Some((40, BinaryOperator::GreaterThanOrEqual)),
        TokenKind::Plus => Some((50, BinaryOperator::Add)),
        TokenKind::Minus => Some((50, BinaryOperator::Subtract)),
        TokenKind::Asterisk => Some((60, BinaryOperator::Multiply)),
        TokenKind::Slash => Some((60, BinaryOperator::Divide)),
        TokenKind::Modulo => Some((60, BinaryOperator::Modulo)),
        _ => None,
    }
}

impl<'t> Parser<'t> {
    /// `cond ? a : b`, right-associative.
    pub(super) fn ternary(&mut self) -> Result<NodeId, ParseError> {
        self.nested(|p| p.ternary_inner())
    }

    fn ternary_inner(&mut self) -> Result<NodeId, ParseError> {
        let condition = self.binary(0)?;
        if !self.stream.check(TokenKind::Question) {
            return Ok(condition);
        }
        let question = self.stream.advance();
        let true_value = self.ternary()?;
        let colon = self.expect_element(TokenKind::Colon, "':'");
        let false_value = self.ternary()?;
        Ok(self.arena.alloc(SyntaxKind::Ternary {
            condition,
            question,
            true_value,
            colon,
            false_value,
        }))
    }

    /// Precedence climbing over [`binary_op_info`].
    fn binary(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let depth = self.depth;
        let result = self.binary_chain(min_prec);
        self.depth = depth;
        result
    }

    fn binary_chain(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let mut left = self.prefix()?;

        while let Some((prec, op)) = binary_op_info(self.stream.peek_kind()) {
            if prec < min_prec {
                break;
            }
            self.deepen()?;
            let operator = self.stream.advance();
            let right = self.binary(prec + 1)?;
            left = self.arena.alloc(SyntaxKind::Binary {
                left,
                operator,
                op,
                right,
            });
        }

        Ok(left)
    }

    /// Unary operators, then postfix chains.
    fn prefix(&mut self) -> Result<NodeId, ParseError> {
        let op = match self.stream.peek_kind() {
            TokenKind::Exclamation => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Minus,
            _ => return self.postfix(),
        };
        let operator = self.stream.advance();
        let operand = self.nested(|p| p.prefix())?;
        Ok(self.arena.alloc(SyntaxKind::Unary {
            operator,
            op,
            operand,
        }))
    }

    /// Property access and indexing, left to right.
    pub(crate) fn postfix(&mut self) -> Result<NodeId, ParseError> {
        let depth = self.depth;
        let result = self.postfix_chain();
        self.depth = depth;
        result
    }

    fn postfix_chain(&mut self) -> Result<NodeId, ParseError> {
        let mut expr = self.atom()?;

        loop {
            let kind = self.stream.peek_kind();
            if matches!(kind, TokenKind::Dot | TokenKind::LeftSquare) {
                self.deepen()?;
            }
            match kind {
                TokenKind::Dot => {
                    let dot = self.stream.advance();
                    let property = self.identifier("a property name")?;
                    expr = self.arena.alloc(SyntaxKind::PropertyAccess {
                        base: expr,
                        dot,
                        property,
                    });
                }
                TokenKind::LeftSquare => {
                    let open = self.stream.advance();
                    let index = self.within(TokenKind::RightSquare, |p| p.expression())?;
                    let close = self.expect_element(TokenKind::RightSquare, "']'");
                    expr = self.arena.alloc(SyntaxKind::ArrayAccess {
                        base: expr,
                        open,
                        index,
                        close,
                    });
                }
                _ => break,
            }
        }

        Ok(expr)
    }
}
