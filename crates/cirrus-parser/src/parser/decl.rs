//! Declaration parsers (keyword-dispatched).
//!
//! This module implements the top-level loop and one parser per
//! declaration form:
//! - `param NAME TYPE [= EXPR]`
//! - `var NAME = EXPR`
//! - `resource NAME 'type@version' [existing] = BODY`
//! - `module NAME 'path' = BODY`
//! - `output NAME TYPE = EXPR`
//!
//! Each declaration resets the recovery flag, so every line gets its own
//! first diagnostic.

use super::{ParseError, ParseErrorKind, Parser};
use cirrus_ast::{Element, NodeId, SyntaxKind, TokenId};
use cirrus_lexer::TokenKind;

impl<'t> Parser<'t> {
    /// Parse the whole file. The end-of-file token is the last child.
    pub(crate) fn program(&mut self) -> NodeId {
        let mut children = Vec::new();
        loop {
            match self.stream.peek_kind() {
                TokenKind::EndOfFile => {
                    children.push(Element::Token(self.stream.advance()));
                    break;
                }
                TokenKind::NewLine => children.push(Element::Token(self.stream.advance())),
                _ => {
                    self.recovering = false;
                    children.push(Element::Node(self.declaration()));
                    // A container left open can end on a line break the
                    // declaration already consumed.
                    let at_line_start = self.stream.previous_kind() == Some(TokenKind::NewLine);
                    if !at_line_start
                        && !matches!(
                            self.stream.peek_kind(),
                            TokenKind::NewLine | TokenKind::EndOfFile
                        )
                    {
                        let error = ParseError::new(
                            ParseErrorKind::ExpectedNewLine,
                            self.stream.current_span(),
                            "expected a new line after the declaration",
                        );
                        self.report(error);
                        children.push(Element::Node(self.skip_to_recovery_point()));
                    }
                }
            }
        }
        self.arena.alloc(SyntaxKind::Program { children })
    }

    /// Parse a single declaration with its leading decorators.
    fn declaration(&mut self) -> NodeId {
        let mut leading = Vec::new();
        while self.stream.check(TokenKind::At) {
            let decorator = self.slot(|p| p.decorator());
            leading.push(Element::Node(decorator));
            self.consume_newlines(&mut leading);
        }

        let token = self.stream.peek();
        let keyword = match token.kind {
            TokenKind::Identifier => token.text.as_str(),
            _ => "",
        };
        match keyword {
            "param" => self.parameter(leading),
            "var" => self.variable(leading),
            "resource" => self.resource(leading),
            "module" => self.module(leading),
            "output" => self.output(leading),
            _ => {
                let error = if leading.is_empty() {
                    ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        token.span,
                        "expected a declaration: param, var, resource, module or output",
                    )
                } else {
                    ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        token.span,
                        "a decorator must be followed by a declaration",
                    )
                };
                self.report(error);
                self.dangling(leading)
            }
        }
    }

    /// Fold decorators that precede no declaration, plus the rest of the
    /// line, into one `Skipped` node.
    fn dangling(&mut self, leading: Vec<Element>) -> NodeId {
        let mut tokens: Vec<TokenId> = Vec::new();
        for element in leading {
            match element {
                Element::Token(token) => tokens.push(token),
                Element::Node(node) => tokens.extend(self.arena.tokens_under(node)),
            }
        }
        let rest = self.skip_to_recovery_point();
        tokens.extend(self.arena.tokens_under(rest));
        let offset = self.stream.current_span().start;
        self.arena.alloc_skipped(tokens, offset)
    }

    /// `@name(args)`
    fn decorator(&mut self) -> Result<NodeId, ParseError> {
        let at = self.stream.advance();
        let expression = self.postfix()?;
        if !matches!(self.arena.kind(expression), SyntaxKind::FunctionCall { .. }) {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                self.arena.span(expression),
                "expected a decorator call such as '@description('...')'",
            ));
        }
        Ok(self.arena.alloc(SyntaxKind::Decorator { at, expression }))
    }

    /// `param NAME TYPE [= EXPR]`
    fn parameter(&mut self, leading: Vec<Element>) -> NodeId {
        let keyword = self.stream.advance();
        let name = self.identifier_or_missing("a parameter name");
        let ty = self.type_name();
        let default = if self.stream.check(TokenKind::Assignment) {
            let assignment = self.stream.advance();
            let value = self.slot(|p| p.expression());
            Some(
                self.arena
                    .alloc(SyntaxKind::ParameterDefault { assignment, value }),
            )
        } else {
            None
        };
        self.arena.alloc(SyntaxKind::Parameter {
            leading,
            keyword,
            name,
            ty,
            default,
        })
    }

    /// `var NAME = EXPR`
    fn variable(&mut self, leading: Vec<Element>) -> NodeId {
        let keyword = self.stream.advance();
        let name = self.identifier_or_missing("a variable name");
        let assignment = self.expect_element(TokenKind::Assignment, "'='");
        let value = self.value_slot(|p| p.expression());
        self.arena.alloc(SyntaxKind::Variable {
            leading,
            keyword,
            name,
            assignment,
            value,
        })
    }

    /// `resource NAME 'type@version' [existing] = BODY`
    fn resource(&mut self, leading: Vec<Element>) -> NodeId {
        let keyword = self.stream.advance();
        let name = self.identifier_or_missing("a resource symbolic name");
        let type_string = self.string_slot("a resource type string");
        let existing = self
            .stream
            .check_keyword("existing")
            .then(|| self.stream.advance());
        let assignment = self.expect_element(TokenKind::Assignment, "'='");
        let value = self.value_slot(|p| p.body_expression());
        self.arena.alloc(SyntaxKind::Resource {
            leading,
            keyword,
            name,
            type_string,
            existing,
            assignment,
            value,
        })
    }

    /// `module NAME 'path' = BODY`
    fn module(&mut self, leading: Vec<Element>) -> NodeId {
        let keyword = self.stream.advance();
        let name = self.identifier_or_missing("a module symbolic name");
        let path = self.string_slot("a module path string");
        let assignment = self.expect_element(TokenKind::Assignment, "'='");
        let value = self.value_slot(|p| p.body_expression());
        self.arena.alloc(SyntaxKind::Module {
            leading,
            keyword,
            name,
            path,
            assignment,
            value,
        })
    }

    /// `output NAME TYPE = EXPR`
    fn output(&mut self, leading: Vec<Element>) -> NodeId {
        let keyword = self.stream.advance();
        let name = self.identifier_or_missing("an output name");
        let ty = self.type_name();
        let assignment = self.expect_element(TokenKind::Assignment, "'='");
        let value = self.value_slot(|p| p.expression());
        self.arena.alloc(SyntaxKind::Output {
            leading,
            keyword,
            name,
            ty,
            assignment,
            value,
        })
    }

    /// Type keyword of a parameter or output. Validity of the name is the
    /// binder's concern.
    fn type_name(&mut self) -> NodeId {
        let token = self.stream.peek();
        if token.kind == TokenKind::Identifier {
            let id = self.stream.advance();
            self.arena.alloc(SyntaxKind::TypeName {
                token: id,
                name: token.text.clone(),
            })
        } else {
            let error = ParseError::expected("a type name", token);
            self.report(error);
            self.missing()
        }
    }

    /// String literal header slot (resource type, module path).
    fn string_slot(&mut self, what: &str) -> NodeId {
        match self.stream.peek_kind() {
            TokenKind::StringComplete | TokenKind::StringLeftPiece | TokenKind::MultilineString => {
                self.slot(|p| p.string_literal())
            }
            _ => {
                let error = ParseError::expected(what, self.stream.peek());
                self.report(error);
                self.missing()
            }
        }
    }

    /// Declaration value. A value missing at the end of the line becomes an
    /// empty `Skipped` node at the line end.
    fn value_slot<F>(&mut self, parse: F) -> NodeId
    where
        F: FnOnce(&mut Self) -> Result<NodeId, ParseError>,
    {
        if matches!(
            self.stream.peek_kind(),
            TokenKind::NewLine | TokenKind::EndOfFile
        ) {
            let error = ParseError::expected("a value", self.stream.peek());
            self.report(error);
            return self.missing();
        }
        self.slot(parse)
    }
}
