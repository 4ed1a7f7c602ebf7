//! Expression typing.

use super::{Binder, Ctx};
use crate::functions;
use crate::symbols::SymbolKind;
use crate::types::{ObjectType, PropertyType, TypeSymbol};
use cirrus_ast::{BinaryOperator, DiagnosticCode, NodeId, SyntaxKind, UnaryOperator};
use indexmap::IndexMap;

impl<'a> Binder<'a> {
    /// Type `node` where a value of type `expected` is required.
    ///
    /// Object and array literals are checked member by member against the
    /// expected shape; anything else is typed and then checked for
    /// assignability.
    pub(super) fn value(
        &mut self,
        node: NodeId,
        expected: Option<&TypeSymbol>,
        ctx: Ctx,
    ) -> TypeSymbol {
        match (self.tree.kind(node).clone(), expected) {
            (SyntaxKind::Object { .. }, Some(TypeSymbol::Object(shape))) => {
                self.check_object(node, shape, ctx)
            }
            (SyntaxKind::Object { .. }, None | Some(TypeSymbol::Any)) if ctx.in_resource => {
                let shape = ObjectType {
                    properties: IndexMap::new(),
                    strict: false,
                };
                self.check_object(node, &shape, ctx)
            }
            (SyntaxKind::Array { .. }, Some(TypeSymbol::Array(element))) => {
                let element = (**element).clone();
                for item in self.arena().child_nodes(node) {
                    if let SyntaxKind::ArrayItem { value } = self.tree.kind(item) {
                        let value = *value;
                        self.value(value, Some(&element), Ctx::plain());
                    }
                }
                self.record(node, TypeSymbol::array(element))
            }
            (SyntaxKind::Parenthesized { expression, .. }, _) => {
                let ty = self.value(expression, expected, ctx);
                self.record(node, ty)
            }
            (SyntaxKind::ForExpression { .. }, _) if ctx.property_loops => {
                let element = expected.and_then(TypeSymbol::element_type);
                let ty = self.for_expression(node, |this, body| {
                    this.value(body, element.as_ref(), Ctx::plain())
                });
                if let Some(expected) = expected {
                    self.check_assignable(node, &ty, expected);
                }
                ty
            }
            _ => {
                let ty = self.expression(node);
                if let Some(expected) = expected {
                    self.check_assignable(node, &ty, expected);
                }
                ty
            }
        }
    }

    pub(super) fn check_assignable(&mut self, node: NodeId, ty: &TypeSymbol, expected: &TypeSymbol) {
        if !ty.is_assignable_to(expected) {
            let span = self.span(node);
            self.error(
                DiagnosticCode::TypeMismatch,
                span,
                format!("expected a value of type '{expected}' but the provided value is of type '{ty}'"),
            );
        }
    }

    /// Object literal against a known shape.
    fn check_object(&mut self, node: NodeId, shape: &ObjectType, ctx: Ctx) -> TypeSymbol {
        let ctx = ctx.members();
        let mut present: Vec<String> = Vec::new();
        for child in self.arena().child_nodes(node) {
            let SyntaxKind::ObjectProperty { key, value, .. } = self.tree.kind(child).clone() else {
                continue;
            };
            let Some(name) = self.property_key(key, &mut present) else {
                self.expression(value);
                continue;
            };
            let key_span = self.span(key);
            match shape.properties.get(&name) {
                None if shape.strict => {
                    let known: Vec<&str> = shape
                        .properties
                        .iter()
                        .filter(|(_, property)| !property.read_only)
                        .map(|(name, _)| name.as_str())
                        .collect();
                    self.error(
                        DiagnosticCode::UnknownProperty,
                        key_span,
                        format!(
                            "the property '{name}' is not allowed; permissible properties are {}",
                            quote_list(&known)
                        ),
                    );
                    self.value(value, None, ctx);
                }
                None => {
                    self.value(value, None, ctx);
                }
                Some(property) if property.read_only => {
                    self.error(
                        DiagnosticCode::ReadOnlyProperty,
                        key_span,
                        format!("the property '{name}' is read-only"),
                    );
                    self.value(value, None, ctx);
                }
                Some(property) => {
                    let expected = property.ty.clone();
                    self.value(value, Some(&expected), ctx);
                }
            }
        }

        let missing: Vec<&str> = shape
            .properties
            .iter()
            .filter(|(name, property)| property.required && !present.contains(name))
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() {
            let span = match self.tree.kind(node) {
                SyntaxKind::Object { open, .. } => self.arena().token_span(*open),
                _ => self.span(node),
            };
            let message = format!(
                "the object is missing required properties: {}",
                quote_list(&missing)
            );
            self.error(DiagnosticCode::MissingRequiredProperty, span, message);
        }

        self.record(node, TypeSymbol::Object(shape.clone()))
    }

    /// Name of a property key; reports duplicates and interpolated keys.
    fn property_key(&mut self, key: NodeId, seen: &mut Vec<String>) -> Option<String> {
        let name = match self.tree.kind(key) {
            SyntaxKind::Identifier { name, .. } => name.clone(),
            SyntaxKind::StringLiteral { .. } => match self.arena().string_value(key) {
                Some(name) => name.to_string(),
                None => {
                    let span = self.span(key);
                    self.error(
                        DiagnosticCode::StringLiteralRequired,
                        span,
                        "property names must be string literals without interpolation",
                    );
                    return None;
                }
            },
            _ => return None,
        };
        if seen.contains(&name) {
            let span = self.span(key);
            self.error(
                DiagnosticCode::DuplicateProperty,
                span,
                format!("the property '{name}' is declared multiple times in this object"),
            );
            return None;
        }
        seen.push(name.clone());
        Some(name)
    }

    /// Type an expression with no expectation.
    pub(super) fn expression(&mut self, node: NodeId) -> TypeSymbol {
        let ty = match self.tree.kind(node).clone() {
            SyntaxKind::Skipped { .. } => TypeSymbol::Error,
            SyntaxKind::StringLiteral { expressions, .. } => {
                for expression in expressions {
                    self.expression(expression);
                }
                TypeSymbol::String
            }
            SyntaxKind::IntegerLiteral { .. } => TypeSymbol::Int,
            SyntaxKind::BooleanLiteral { .. } => TypeSymbol::Bool,
            SyntaxKind::NullLiteral { .. } => TypeSymbol::Null,
            SyntaxKind::Array { .. } => self.array_literal(node),
            SyntaxKind::Object { .. } => self.object_literal(node),
            SyntaxKind::Parenthesized { expression, .. } => self.expression(expression),
            SyntaxKind::Unary { op, operand, .. } => self.unary(node, op, operand),
            SyntaxKind::Binary { left, op, right, .. } => self.binary(node, left, op, right),
            SyntaxKind::Ternary {
                condition,
                true_value,
                false_value,
                ..
            } => {
                self.value(condition, Some(&TypeSymbol::Bool), Ctx::plain());
                let a = self.expression(true_value);
                let b = self.expression(false_value);
                TypeSymbol::union(a, b)
            }
            SyntaxKind::FunctionCall { name, .. } => self.function_call(node, name),
            SyntaxKind::PropertyAccess { base, property, .. } => {
                self.property_access(base, property)
            }
            SyntaxKind::ArrayAccess { base, index, .. } => self.array_access(node, base, index),
            SyntaxKind::VariableAccess { name } => self.variable_access(node, name, false),
            SyntaxKind::ForExpression { .. } => {
                let span = self.span(node);
                self.error(
                    DiagnosticCode::ForExpressionNotAllowed,
                    span,
                    "for-expressions are only allowed as resource, module or output values, or as property values of objects nested in a resource body",
                );
                self.for_expression(node, |this, body| this.expression(body));
                TypeSymbol::Error
            }
            SyntaxKind::IfCondition {
                condition, body, ..
            } => {
                let span = self.span(node);
                self.error(
                    DiagnosticCode::ForExpressionNotAllowed,
                    span,
                    "a condition is only allowed as the body of a resource or module",
                );
                self.expression(condition);
                self.expression(body);
                TypeSymbol::Error
            }
            _ => TypeSymbol::Error,
        };
        self.record(node, ty)
    }

    fn array_literal(&mut self, node: NodeId) -> TypeSymbol {
        let mut element: Option<TypeSymbol> = None;
        for item in self.arena().child_nodes(node) {
            let SyntaxKind::ArrayItem { value } = self.tree.kind(item) else {
                continue;
            };
            let value = *value;
            let ty = self.expression(value);
            element = Some(match element {
                None => ty,
                Some(previous) => TypeSymbol::union(previous, ty),
            });
        }
        TypeSymbol::array(element.unwrap_or(TypeSymbol::Any))
    }

    /// An object literal's own shape: every written property, strict.
    fn object_literal(&mut self, node: NodeId) -> TypeSymbol {
        let mut seen = Vec::new();
        let mut properties = IndexMap::new();
        for child in self.arena().child_nodes(node) {
            let SyntaxKind::ObjectProperty { key, value, .. } = self.tree.kind(child).clone() else {
                continue;
            };
            let name = self.property_key(key, &mut seen);
            let ty = self.expression(value);
            if let Some(name) = name {
                properties.insert(name, PropertyType::optional(ty));
            }
        }
        TypeSymbol::Object(ObjectType {
            properties,
            strict: true,
        })
    }

    fn unary(&mut self, node: NodeId, op: UnaryOperator, operand: NodeId) -> TypeSymbol {
        let ty = self.expression(operand);
        let (accepted, result) = match op {
            UnaryOperator::Not => (TypeSymbol::Bool, TypeSymbol::Bool),
            UnaryOperator::Minus => (TypeSymbol::Int, TypeSymbol::Int),
        };
        if ty.is_error() {
            return TypeSymbol::Error;
        }
        if !ty.is_assignable_to(&accepted) {
            let span = self.span(node);
            self.error(
                DiagnosticCode::TypeMismatch,
                span,
                format!("cannot apply operator '{op}' to an operand of type '{ty}'"),
            );
            return TypeSymbol::Error;
        }
        result
    }

    fn binary(
        &mut self,
        node: NodeId,
        left: NodeId,
        op: BinaryOperator,
        right: NodeId,
    ) -> TypeSymbol {
        let lhs = self.expression(left);
        let rhs = self.expression(right);
        if lhs.is_error() || rhs.is_error() {
            return TypeSymbol::Error;
        }

        let both = |ty: &TypeSymbol| lhs.is_assignable_to(ty) && rhs.is_assignable_to(ty);
        let result = match op {
            BinaryOperator::LogicalOr | BinaryOperator::LogicalAnd => {
                both(&TypeSymbol::Bool).then_some(TypeSymbol::Bool)
            }
            BinaryOperator::Equals | BinaryOperator::NotEquals => (lhs.is_assignable_to(&rhs)
                || rhs.is_assignable_to(&lhs))
            .then_some(TypeSymbol::Bool),
            BinaryOperator::EqualsInsensitive | BinaryOperator::NotEqualsInsensitive => {
                both(&TypeSymbol::String).then_some(TypeSymbol::Bool)
            }
            BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual => {
                both(&TypeSymbol::Int).then_some(TypeSymbol::Bool)
            }
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => both(&TypeSymbol::Int).then_some(TypeSymbol::Int),
        };

        match result {
            Some(ty) => ty,
            None => {
                let span = self.span(node);
                self.error(
                    DiagnosticCode::TypeMismatch,
                    span,
                    format!(
                        "cannot apply operator '{op}' to operands of type '{lhs}' and '{rhs}'"
                    ),
                );
                TypeSymbol::Error
            }
        }
    }

    fn function_call(&mut self, node: NodeId, name_node: NodeId) -> TypeSymbol {
        let args = self.arena().child_nodes(node);
        let arg_types: Vec<TypeSymbol> = args.iter().map(|arg| self.expression(*arg)).collect();
        let Some(name) = self.arena().identifier_name(name_node).map(str::to_string) else {
            return TypeSymbol::Error;
        };

        let Some(signature) = functions::lookup(&name) else {
            let span = self.span(name_node);
            self.error(
                DiagnosticCode::UnknownFunction,
                span,
                format!("the function '{name}' does not exist"),
            );
            return TypeSymbol::Error;
        };

        let recovered = args
            .iter()
            .any(|arg| self.tree.kind(*arg).is_skipped());
        if recovered {
            return (signature.returns)(&arg_types);
        }

        let count = args.len();
        let too_many = signature.max_args().is_some_and(|max| count > max);
        if count < signature.min_args() || too_many {
            let span = self.span(node);
            self.error(
                DiagnosticCode::ArgumentCount,
                span,
                format!(
                    "the function '{name}' expects {} argument(s) but {count} were provided",
                    signature.arity()
                ),
            );
            return TypeSymbol::Error;
        }

        for (idx, (arg, ty)) in args.iter().zip(&arg_types).enumerate() {
            let Some(kind) = signature.argument_kind(idx) else {
                continue;
            };
            if !kind.accepts(ty) {
                let span = self.span(*arg);
                self.error(
                    DiagnosticCode::ArgumentType,
                    span,
                    format!(
                        "argument of type '{ty}' is not assignable to parameter of type '{}'",
                        kind.describe()
                    ),
                );
            }
        }
        (signature.returns)(&arg_types)
    }

    fn property_access(&mut self, base: NodeId, property: NodeId) -> TypeSymbol {
        let base_ty = self.expression(base);
        let Some(name) = self.arena().identifier_name(property).map(str::to_string) else {
            return TypeSymbol::Error;
        };
        let span = self.span(property);

        let shape = match &base_ty {
            ty if ty.is_loose() => return base_ty.clone(),
            TypeSymbol::Object(shape) => shape.clone(),
            TypeSymbol::Resource(resource) => resource.body.clone(),
            TypeSymbol::Module(module) => module.body(),
            TypeSymbol::Union(_) => return TypeSymbol::Any,
            other => {
                let message = format!("cannot access properties of a value of type '{other}'");
                self.error(DiagnosticCode::PropertyAccessOnNonObject, span, message);
                return TypeSymbol::Error;
            }
        };

        match shape.properties.get(&name) {
            Some(property) => property.ty.clone(),
            None if shape.strict => {
                self.error(
                    DiagnosticCode::UnknownProperty,
                    span,
                    format!("the type '{base_ty}' does not contain property '{name}'"),
                );
                TypeSymbol::Error
            }
            None => TypeSymbol::Any,
        }
    }

    fn array_access(&mut self, node: NodeId, base: NodeId, index: NodeId) -> TypeSymbol {
        let base_ty = match self.tree.kind(base) {
            SyntaxKind::VariableAccess { name } => {
                let name = *name;
                let ty = self.variable_access(base, name, true);
                self.record(base, ty)
            }
            _ => self.expression(base),
        };
        let index_ty = self.expression(index);
        if base_ty.is_error() || index_ty.is_error() {
            return TypeSymbol::Error;
        }
        let index_span = self.span(index);

        match &base_ty {
            TypeSymbol::Any => TypeSymbol::Any,
            TypeSymbol::Array(element) => {
                if !index_ty.is_assignable_to(&TypeSymbol::Int) {
                    self.error(
                        DiagnosticCode::InvalidIndex,
                        index_span,
                        format!("an array index must be of type 'int' but is of type '{index_ty}'"),
                    );
                    return TypeSymbol::Error;
                }
                (**element).clone()
            }
            TypeSymbol::Object(shape) => {
                if !index_ty.is_assignable_to(&TypeSymbol::String) {
                    self.error(
                        DiagnosticCode::InvalidIndex,
                        index_span,
                        format!("an object index must be of type 'string' but is of type '{index_ty}'"),
                    );
                    return TypeSymbol::Error;
                }
                self.arena()
                    .string_value(index)
                    .and_then(|key| shape.properties.get(key))
                    .map(|property| property.ty.clone())
                    .unwrap_or(TypeSymbol::Any)
            }
            other => {
                let span = self.span(node);
                let message = format!("cannot index into a value of type '{other}'");
                self.error(DiagnosticCode::InvalidIndex, span, message);
                TypeSymbol::Error
            }
        }
    }

    /// Resolve a name. Resource and module collections are only usable
    /// when `indexed`.
    fn variable_access(&mut self, node: NodeId, name_node: NodeId, indexed: bool) -> TypeSymbol {
        let Some(name) = self.arena().identifier_name(name_node).map(str::to_string) else {
            return TypeSymbol::Error;
        };
        let local = self
            .locals
            .iter()
            .rev()
            .find(|(local, _)| *local == name)
            .map(|(_, id)| *id);
        let Some(id) = local.or_else(|| self.scope.get(&name).copied()) else {
            let span = self.span(name_node);
            self.error(
                DiagnosticCode::UndefinedSymbol,
                span,
                format!("the name '{name}' does not exist in the current context"),
            );
            return TypeSymbol::Error;
        };

        self.bindings.insert(node, id);
        self.used.insert(id);
        if self.symbol(id).kind == SymbolKind::Output {
            let span = self.span(name_node);
            self.error(
                DiagnosticCode::UndefinedSymbol,
                span,
                format!("the output '{name}' cannot be referenced"),
            );
            return TypeSymbol::Error;
        }
        let ty = self.symbol_type(id);
        let collection = matches!(self.symbol(id).kind, SymbolKind::Resource | SymbolKind::Module)
            && matches!(ty, TypeSymbol::Array(_));
        if collection && !indexed {
            let span = self.span(name_node);
            self.error(
                DiagnosticCode::CollectionNotIndexed,
                span,
                format!("the collection '{name}' must be indexed to access one of its elements"),
            );
            return TypeSymbol::Error;
        }
        ty
    }

    /// Type a for-expression: declare its loop locals, type the body with
    /// `body`, and yield an array of the body type.
    pub(super) fn for_expression<F>(&mut self, node: NodeId, body: F) -> TypeSymbol
    where
        F: FnOnce(&mut Self, NodeId) -> TypeSymbol,
    {
        let SyntaxKind::ForExpression {
            variables,
            source,
            body: body_node,
            ..
        } = self.tree.kind(node).clone()
        else {
            return TypeSymbol::Error;
        };

        let source_ty = self.expression(source);
        let item_ty = match &source_ty {
            TypeSymbol::Int => TypeSymbol::Int,
            ty => match ty.element_type() {
                Some(element) => element,
                None => {
                    let span = self.span(source);
                    self.error(
                        DiagnosticCode::InvalidLoopSource,
                        span,
                        format!(
                            "a loop source must be an array or an integer count, not '{source_ty}'"
                        ),
                    );
                    TypeSymbol::Error
                }
            },
        };

        let (item, index) = match self.tree.kind(variables) {
            SyntaxKind::ForVariableBlock { item, index, .. } => (*item, Some(*index)),
            _ => (variables, None),
        };
        let scope_depth = self.locals.len();
        self.declare_local(item, item_ty);
        if let Some(index) = index {
            self.declare_local(index, TypeSymbol::Int);
        }

        let body_ty = body(self, body_node);
        self.locals.truncate(scope_depth);

        let ty = if body_ty.is_error() && source_ty.is_error() {
            TypeSymbol::Error
        } else {
            TypeSymbol::array(body_ty)
        };
        self.record(node, ty)
    }

    fn declare_local(&mut self, node: NodeId, ty: TypeSymbol) {
        let Some(name) = self.arena().identifier_name(node).map(str::to_string) else {
            return;
        };
        let span = self.span(node);
        let id = self.new_symbol(name.clone(), SymbolKind::LoopLocal, node, span, ty.clone());
        self.types.insert(node, ty);
        self.locals.push((name, id));
    }
}

fn quote_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
