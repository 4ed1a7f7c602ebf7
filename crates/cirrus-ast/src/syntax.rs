//! Concrete syntax tree.
//!
//! The parser stores every node in a flat [`SyntaxArena`]; nodes refer to
//! their children by [`NodeId`] and to tokens by [`TokenId`] (an index into
//! the owning source tree's token list). Nothing here owns a token, and no
//! node points back at its parent, so a whole tree is dropped or shared as
//! one value.
//!
//! # Design
//!
//! - **Closed variant set** - `SyntaxKind` is exhaustive; every consumer
//!   matches on it, so a new node kind is a compile error everywhere it
//!   matters
//! - **Lossless** - every token the lexer produced (including new lines and
//!   tokens swallowed by error recovery) is reachable from the program node
//! - **Recovery nodes** - `Skipped` holds zero or more tokens the parser
//!   could not use; a zero-token `Skipped` marks a construct that is missing
//!   entirely and carries an explicit empty span
//!
//! Spans are computed once, at allocation, as the union of the children's
//! spans.

use crate::span::TextSpan;
use std::fmt;

/// Index of a token in its source tree's token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u32);

/// Index of a node in its [`SyntaxArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl TokenId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A child slot: either a token or a nested node.
///
/// Slots that expect a single token (such as `=`) hold a zero-token
/// `Skipped` node when the token is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Token(TokenId),
    Node(NodeId),
}

/// Binary operators, loosest-binding first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    LogicalOr,
    LogicalAnd,
    Equals,
    NotEquals,
    EqualsInsensitive,
    NotEqualsInsensitive,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::EqualsInsensitive => "=~",
            BinaryOperator::NotEqualsInsensitive => "!~",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Minus => "-",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Every node shape in the language.
///
/// `leading` on declarations holds decorators and the new lines between
/// them, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxKind {
    /// Root: declarations, new lines and skipped lines.
    Program { children: Vec<Element> },
    /// Tokens discarded by error recovery.
    Skipped { tokens: Vec<TokenId> },

    Identifier { token: TokenId, name: String },
    /// Parameter/output type keyword (`string`, `int`, ...).
    TypeName { token: TokenId, name: String },
    Decorator { at: TokenId, expression: NodeId },

    Parameter {
        leading: Vec<Element>,
        keyword: TokenId,
        name: NodeId,
        ty: NodeId,
        default: Option<NodeId>,
    },
    ParameterDefault { assignment: TokenId, value: NodeId },
    Variable {
        leading: Vec<Element>,
        keyword: TokenId,
        name: NodeId,
        assignment: Element,
        value: NodeId,
    },
    Resource {
        leading: Vec<Element>,
        keyword: TokenId,
        name: NodeId,
        type_string: NodeId,
        existing: Option<TokenId>,
        assignment: Element,
        value: NodeId,
    },
    Module {
        leading: Vec<Element>,
        keyword: TokenId,
        name: NodeId,
        path: NodeId,
        assignment: Element,
        value: NodeId,
    },
    Output {
        leading: Vec<Element>,
        keyword: TokenId,
        name: NodeId,
        ty: NodeId,
        assignment: Element,
        value: NodeId,
    },

    /// `if (condition) { ... }` as a resource or module body.
    IfCondition {
        keyword: TokenId,
        condition: NodeId,
        body: NodeId,
    },
    /// `[for item in source: body]`
    ForExpression {
        open: TokenId,
        keyword: TokenId,
        variables: NodeId,
        in_keyword: Element,
        source: NodeId,
        colon: Element,
        body: NodeId,
        close: Element,
    },
    /// `(item, index)` in a for-expression header.
    ForVariableBlock {
        open: TokenId,
        item: NodeId,
        comma: Element,
        index: NodeId,
        close: Element,
    },
    /// Loop-scoped variable declaration.
    LoopVariable { token: TokenId, name: String },

    /// String with optional interpolation. `tokens` are the string pieces,
    /// `expressions` the holes between them and `segments` the decoded text
    /// of each piece (`segments.len() == expressions.len() + 1`).
    StringLiteral {
        tokens: Vec<TokenId>,
        expressions: Vec<NodeId>,
        segments: Vec<String>,
    },
    IntegerLiteral { token: TokenId, value: i64 },
    BooleanLiteral { token: TokenId, value: bool },
    NullLiteral { token: TokenId },

    Array {
        open: TokenId,
        children: Vec<Element>,
        close: Element,
    },
    ArrayItem { value: NodeId },
    Object {
        open: TokenId,
        children: Vec<Element>,
        close: Element,
    },
    ObjectProperty {
        key: NodeId,
        colon: Element,
        value: NodeId,
    },

    Parenthesized {
        open: TokenId,
        expression: NodeId,
        close: Element,
    },
    Unary {
        operator: TokenId,
        op: UnaryOperator,
        operand: NodeId,
    },
    Binary {
        left: NodeId,
        operator: TokenId,
        op: BinaryOperator,
        right: NodeId,
    },
    Ternary {
        condition: NodeId,
        question: TokenId,
        true_value: NodeId,
        colon: Element,
        false_value: NodeId,
    },
    /// `name(args)`; argument expressions are the node children.
    FunctionCall {
        name: NodeId,
        open: TokenId,
        children: Vec<Element>,
        close: Element,
    },
    PropertyAccess {
        base: NodeId,
        dot: TokenId,
        property: NodeId,
    },
    ArrayAccess {
        base: NodeId,
        open: TokenId,
        index: NodeId,
        close: Element,
    },
    VariableAccess { name: NodeId },
}

fn push_all(out: &mut Vec<Element>, items: &[Element]) {
    out.extend_from_slice(items);
}

impl SyntaxKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<Element> {
        use Element::{Node as N, Token as T};
        let mut out = Vec::new();
        match self {
            SyntaxKind::Program { children } => push_all(&mut out, children),
            SyntaxKind::Array {
                open,
                children,
                close,
            }
            | SyntaxKind::Object {
                open,
                children,
                close,
            } => {
                out.push(T(*open));
                push_all(&mut out, children);
                out.push(*close);
            }
            SyntaxKind::FunctionCall {
                name,
                open,
                children,
                close,
            } => {
                out.extend([N(*name), T(*open)]);
                push_all(&mut out, children);
                out.push(*close);
            }
            SyntaxKind::Skipped { tokens } => out.extend(tokens.iter().map(|t| T(*t))),
            SyntaxKind::Identifier { token, .. }
            | SyntaxKind::TypeName { token, .. }
            | SyntaxKind::LoopVariable { token, .. }
            | SyntaxKind::IntegerLiteral { token, .. }
            | SyntaxKind::BooleanLiteral { token, .. }
            | SyntaxKind::NullLiteral { token } => out.push(T(*token)),
            SyntaxKind::Decorator { at, expression } => {
                out.push(T(*at));
                out.push(N(*expression));
            }
            SyntaxKind::Parameter {
                leading,
                keyword,
                name,
                ty,
                default,
            } => {
                push_all(&mut out, leading);
                out.extend([T(*keyword), N(*name), N(*ty)]);
                out.extend(default.map(N));
            }
            SyntaxKind::ParameterDefault { assignment, value } => {
                out.extend([T(*assignment), N(*value)]);
            }
            SyntaxKind::Variable {
                leading,
                keyword,
                name,
                assignment,
                value,
            } => {
                push_all(&mut out, leading);
                out.extend([T(*keyword), N(*name), *assignment, N(*value)]);
            }
            SyntaxKind::Resource {
                leading,
                keyword,
                name,
                type_string,
                existing,
                assignment,
                value,
            } => {
                push_all(&mut out, leading);
                out.extend([T(*keyword), N(*name), N(*type_string)]);
                out.extend(existing.map(T));
                out.extend([*assignment, N(*value)]);
            }
            SyntaxKind::Module {
                leading,
                keyword,
                name,
                path,
                assignment,
                value,
            } => {
                push_all(&mut out, leading);
                out.extend([T(*keyword), N(*name), N(*path), *assignment, N(*value)]);
            }
            SyntaxKind::Output {
                leading,
                keyword,
                name,
                ty,
                assignment,
                value,
            } => {
                push_all(&mut out, leading);
                out.extend([T(*keyword), N(*name), N(*ty), *assignment, N(*value)]);
            }
            SyntaxKind::IfCondition {
                keyword,
                condition,
                body,
            } => out.extend([T(*keyword), N(*condition), N(*body)]),
            SyntaxKind::ForExpression {
                open,
                keyword,
                variables,
                in_keyword,
                source,
                colon,
                body,
                close,
            } => out.extend([
                T(*open),
                T(*keyword),
                N(*variables),
                *in_keyword,
                N(*source),
                *colon,
                N(*body),
                *close,
            ]),
            SyntaxKind::ForVariableBlock {
                open,
                item,
                comma,
                index,
                close,
            } => out.extend([T(*open), N(*item), *comma, N(*index), *close]),
            SyntaxKind::StringLiteral {
                tokens,
                expressions,
                ..
            } => {
                for (idx, token) in tokens.iter().enumerate() {
                    out.push(T(*token));
                    if let Some(expr) = expressions.get(idx) {
                        out.push(N(*expr));
                    }
                }
            }
            SyntaxKind::ArrayItem { value } => out.push(N(*value)),
            SyntaxKind::ObjectProperty { key, colon, value } => {
                out.extend([N(*key), *colon, N(*value)])
            }
            SyntaxKind::Parenthesized {
                open,
                expression,
                close,
            } => out.extend([T(*open), N(*expression), *close]),
            SyntaxKind::Unary {
                operator, operand, ..
            } => out.extend([T(*operator), N(*operand)]),
            SyntaxKind::Binary {
                left,
                operator,
                right,
                ..
            } => out.extend([N(*left), T(*operator), N(*right)]),
            SyntaxKind::Ternary {
                condition,
                question,
                true_value,
                colon,
                false_value,
            } => out.extend([
                N(*condition),
                T(*question),
                N(*true_value),
                *colon,
                N(*false_value),
            ]),
            SyntaxKind::PropertyAccess {
                base,
                dot,
                property,
            } => out.extend([N(*base), T(*dot), N(*property)]),
            SyntaxKind::ArrayAccess {
                base,
                open,
                index,
                close,
            } => out.extend([N(*base), T(*open), N(*index), *close]),
            SyntaxKind::VariableAccess { name } => out.push(N(*name)),
        }
        out
    }

    /// True for the five top-level declaration forms.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            SyntaxKind::Parameter { .. }
                | SyntaxKind::Variable { .. }
                | SyntaxKind::Resource { .. }
                | SyntaxKind::Module { .. }
                | SyntaxKind::Output { .. }
        )
    }

    /// Name node of a declaration.
    pub fn declaration_name(&self) -> Option<NodeId> {
        match self {
            SyntaxKind::Parameter { name, .. }
            | SyntaxKind::Variable { name, .. }
            | SyntaxKind::Resource { name, .. }
            | SyntaxKind::Module { name, .. }
            | SyntaxKind::Output { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Decorators and new lines preceding a declaration keyword.
    pub fn leading(&self) -> &[Element] {
        match self {
            SyntaxKind::Parameter { leading, .. }
            | SyntaxKind::Variable { leading, .. }
            | SyntaxKind::Resource { leading, .. }
            | SyntaxKind::Module { leading, .. }
            | SyntaxKind::Output { leading, .. } => leading,
            _ => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyntaxKind::Skipped { .. })
    }
}

/// A node and its cached span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: TextSpan,
}

/// Flat node storage for one source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxArena {
    nodes: Vec<SyntaxNode>,
    token_spans: Vec<TextSpan>,
}

impl SyntaxArena {
    /// Create an arena for a token list with the given spans.
    pub fn new(token_spans: Vec<TextSpan>) -> Self {
        Self {
            nodes: Vec::new(),
            token_spans,
        }
    }

    /// Allocate a node whose span is the union of its children.
    ///
    /// A node without children gets a zero-width span after the last
    /// allocated node; prefer [`SyntaxArena::alloc_empty`] for recovery
    /// nodes with a known position.
    pub fn alloc(&mut self, kind: SyntaxKind) -> NodeId {
        let span = self
            .children_span(&kind)
            .unwrap_or_else(|| TextSpan::empty(self.nodes.last().map_or(0, |n| n.span.end)));
        self.push(SyntaxNode { kind, span })
    }

    /// Allocate a zero-token `Skipped` node at `offset`.
    pub fn alloc_empty(&mut self, offset: u32) -> NodeId {
        self.push(SyntaxNode {
            kind: SyntaxKind::Skipped { tokens: Vec::new() },
            span: TextSpan::empty(offset),
        })
    }

    /// Allocate a `Skipped` node over `tokens`, or an empty one at `offset`.
    pub fn alloc_skipped(&mut self, tokens: Vec<TokenId>, offset: u32) -> NodeId {
        if tokens.is_empty() {
            self.alloc_empty(offset)
        } else {
            self.alloc(SyntaxKind::Skipped { tokens })
        }
    }

    fn push(&mut self, node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn children_span(&self, kind: &SyntaxKind) -> Option<TextSpan> {
        kind.children()
            .into_iter()
            .map(|child| self.element_span(child))
            .reduce(|acc, span| acc.merge(&span))
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &SyntaxKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> TextSpan {
        self.nodes[id.index()].span
    }

    pub fn token_span(&self, id: TokenId) -> TextSpan {
        self.token_spans[id.index()]
    }

    pub fn element_span(&self, element: Element) -> TextSpan {
        match element {
            Element::Token(token) => self.token_span(token),
            Element::Node(node) => self.span(node),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visit `root` and all of its descendants in pre-order.
    ///
    /// Uses an explicit stack, so tree depth is not bounded by the call
    /// stack.
    pub fn walk<V>(&self, root: NodeId, visitor: &mut V)
    where
        V: FnMut(NodeId, &SyntaxKind),
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let kind = self.kind(id);
            visitor(id, kind);
            // Reversed so the first child is visited next.
            stack.extend(kind.children().into_iter().rev().filter_map(|child| match child {
                Element::Node(node) => Some(node),
                Element::Token(_) => None,
            }));
        }
    }

    /// Every token reachable from `root`, in source order.
    pub fn tokens_under(&self, root: NodeId) -> Vec<TokenId> {
        let mut out = Vec::new();
        let mut stack = vec![Element::Node(root)];
        while let Some(element) = stack.pop() {
            match element {
                Element::Token(token) => out.push(token),
                Element::Node(node) => stack.extend(self.kind(node).children().into_iter().rev()),
            }
        }
        out
    }

    /// Child nodes of a container (array, object, call, program),
    /// skipping tokens.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            SyntaxKind::Program { children }
            | SyntaxKind::Array { children, .. }
            | SyntaxKind::Object { children, .. }
            | SyntaxKind::FunctionCall { children, .. } => children
                .iter()
                .filter_map(|child| match child {
                    Element::Node(node) => Some(*node),
                    Element::Token(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Name carried by an `Identifier`, `TypeName` or `LoopVariable` node.
    pub fn identifier_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            SyntaxKind::Identifier { name, .. }
            | SyntaxKind::TypeName { name, .. }
            | SyntaxKind::LoopVariable { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Literal value of a string node without interpolation.
    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            SyntaxKind::StringLiteral {
                expressions,
                segments,
                ..
            } if expressions.is_empty() => segments.first().map(String::as_str),
            _ => None,
        }
    }

    /// Function name of a call node.
    pub fn function_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            SyntaxKind::FunctionCall { name, .. } => self.identifier_name(*name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> SyntaxArena {
        // Tokens for `var x = 1`
        SyntaxArena::new(vec![
            TextSpan::new(0, 3),
            TextSpan::new(4, 5),
            TextSpan::new(6, 7),
            TextSpan::new(8, 9),
            TextSpan::new(9, 9),
        ])
    }

    #[test]
    fn test_span_is_union_of_children() {
        let mut arena = arena();
        let name = arena.alloc(SyntaxKind::Identifier {
            token: TokenId(1),
            name: "x".into(),
        });
        let value = arena.alloc(SyntaxKind::IntegerLiteral {
            token: TokenId(3),
            value: 1,
        });
        let var = arena.alloc(SyntaxKind::Variable {
            leading: Vec::new(),
            keyword: TokenId(0),
            name,
            assignment: Element::Token(TokenId(2)),
            value,
        });
        assert_eq!(arena.span(var), TextSpan::new(0, 9));
        assert_eq!(
            arena.tokens_under(var),
            vec![TokenId(0), TokenId(1), TokenId(2), TokenId(3)]
        );
    }

    #[test]
    fn test_empty_skipped_keeps_position() {
        let mut arena = arena();
        let missing = arena.alloc_skipped(Vec::new(), 9);
        assert!(arena.kind(missing).is_skipped());
        assert_eq!(arena.span(missing), TextSpan::empty(9));
        assert!(arena.tokens_under(missing).is_empty());
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut arena = arena();
        let left = arena.alloc(SyntaxKind::IntegerLiteral {
            token: TokenId(1),
            value: 1,
        });
        let right = arena.alloc(SyntaxKind::IntegerLiteral {
            token: TokenId(3),
            value: 2,
        });
        let sum = arena.alloc(SyntaxKind::Binary {
            left,
            operator: TokenId(2),
            op: BinaryOperator::Add,
            right,
        });
        let mut order = Vec::new();
        arena.walk(sum, &mut |id, _| order.push(id));
        assert_eq!(order, vec![sum, left, right]);
    }

    #[test]
    fn test_deep_chain_walks_without_recursion() {
        // `- - - ... 1`, deeper than any call stack would allow.
        let depth = 200_000;
        let mut spans: Vec<_> = (0..depth).map(|i| TextSpan::new(i, i + 1)).collect();
        spans.push(TextSpan::new(depth, depth + 1));
        let mut arena = SyntaxArena::new(spans);
        let mut node = arena.alloc(SyntaxKind::IntegerLiteral {
            token: TokenId(depth),
            value: 1,
        });
        for i in (0..depth).rev() {
            node = arena.alloc(SyntaxKind::Unary {
                operator: TokenId(i),
                op: UnaryOperator::Minus,
                operand: node,
            });
        }

        let mut visited = 0;
        arena.walk(node, &mut |_, _| visited += 1);
        assert_eq!(visited, depth as usize + 1);
        let tokens = arena.tokens_under(node);
        assert_eq!(tokens.len(), depth as usize + 1);
        assert_eq!(tokens.first(), Some(&TokenId(0)));
        assert_eq!(tokens.last(), Some(&TokenId(depth)));
    }

    #[test]
    fn test_alloc_without_children_is_zero_width() {
        let mut arena = arena();
        arena.alloc(SyntaxKind::IntegerLiteral {
            token: TokenId(3),
            value: 1,
        });
        let program = arena.alloc(SyntaxKind::Program {
            children: Vec::new(),
        });
        assert_eq!(arena.span(program), TextSpan::empty(9));
    }
}
