//! Declaration pass and per-declaration checks.

use super::{Binder, Ctx, DeclState};
use crate::catalog::ResourceTypeReference;
use crate::decorators;
use crate::functions::ArgKind;
use crate::symbols::{SymbolId, SymbolKind};
use crate::types::{ModuleType, ObjectType, PropertyType, ResourceType, TypeSymbol};
use cirrus_ast::{DiagnosticCode, Element, NodeId, SyntaxKind};
use indexmap::IndexMap;
use std::sync::Arc;

impl<'a> Binder<'a> {
    /// Create one symbol per named top-level declaration.
    pub(super) fn declare_all(&mut self) {
        let mut by_name: IndexMap<String, Vec<SymbolId>> = IndexMap::new();

        for decl in self.tree.declarations() {
            let kind = self.tree.kind(decl).clone();
            let Some(name_node) = kind.declaration_name() else {
                continue;
            };
            let Some(name) = self.arena().identifier_name(name_node).map(str::to_string) else {
                continue;
            };
            let name_span = self.span(name_node);

            let (symbol_kind, ty) = match &kind {
                SyntaxKind::Parameter { ty, .. } => (SymbolKind::Parameter, self.declared_type(*ty)),
                SyntaxKind::Output { ty, .. } => (SymbolKind::Output, self.declared_type(*ty)),
                SyntaxKind::Variable { .. } => (SymbolKind::Variable, TypeSymbol::Error),
                SyntaxKind::Resource {
                    type_string,
                    existing,
                    value,
                    ..
                } => {
                    let ty = self.resource_header(*type_string, existing.is_some());
                    (SymbolKind::Resource, self.collection_of(ty, *value))
                }
                SyntaxKind::Module { value, .. } => {
                    let ty = self.module_header(decl);
                    (SymbolKind::Module, self.collection_of(ty, *value))
                }
                _ => continue,
            };

            let id = self.new_symbol(name.clone(), symbol_kind, decl, name_span, ty);
            self.states.insert(id, DeclState::Pending);
            self.declarations.push((decl, id));
            self.scope.entry(name.clone()).or_insert(id);
            by_name.entry(name).or_default().push(id);
        }

        for (name, ids) in by_name {
            if ids.len() < 2 {
                continue;
            }
            for id in ids {
                self.duplicates.insert(id);
                let span = self.symbol(id).name_span;
                self.error(
                    DiagnosticCode::DuplicateSymbol,
                    span,
                    format!("the identifier '{name}' is declared multiple times"),
                );
            }
        }
    }

    /// A declaration whose value is a for-expression declares a collection.
    fn collection_of(&self, ty: TypeSymbol, value: NodeId) -> TypeSymbol {
        match self.tree.kind(value) {
            SyntaxKind::ForExpression { .. } if !ty.is_error() => TypeSymbol::array(ty),
            _ => ty,
        }
    }

    /// Type keyword of a parameter or output.
    fn declared_type(&mut self, node: NodeId) -> TypeSymbol {
        let Some(name) = self.arena().identifier_name(node).map(str::to_string) else {
            return TypeSymbol::Error;
        };
        match TypeSymbol::from_type_name(&name) {
            Some(ty) => ty,
            None => {
                let span = self.span(node);
                self.error(
                    DiagnosticCode::InvalidTypeName,
                    span,
                    format!(
                        "'{name}' is not a valid type; expected string, int, bool, array or object"
                    ),
                );
                TypeSymbol::Error
            }
        }
    }

    fn resource_header(&mut self, type_string: NodeId, existing: bool) -> TypeSymbol {
        let span = self.span(type_string);
        if !matches!(self.tree.kind(type_string), SyntaxKind::StringLiteral { .. }) {
            return TypeSymbol::Error;
        }
        let Some(text) = self.arena().string_value(type_string).map(str::to_string) else {
            self.error(
                DiagnosticCode::StringLiteralRequired,
                span,
                "the resource type must be a string literal without interpolation",
            );
            return TypeSymbol::Error;
        };

        let reference = match ResourceTypeReference::parse(&text) {
            Ok(reference) => reference,
            Err(_) => {
                self.error(
                    DiagnosticCode::InvalidResourceType,
                    span,
                    format!(
                        "'{text}' is not a valid resource type; expected 'Namespace/type@api-version'"
                    ),
                );
                return TypeSymbol::Error;
            }
        };

        let schema = self.catalog.lookup(&reference);
        if schema.is_none() {
            self.warning(
                DiagnosticCode::UnknownResourceType,
                span,
                format!("resource type '{reference}' is not in the catalog; its body is not validated"),
            );
        }
        TypeSymbol::Resource(Arc::new(ResourceType::new(
            reference,
            schema.as_deref(),
            existing,
        )))
    }

    /// Module shape from the target's already bound model.
    fn module_header(&mut self, decl: NodeId) -> TypeSymbol {
        let Some(target) = self.graph.module_target(self.tree.uri(), decl).cloned() else {
            return TypeSymbol::Error;
        };
        let Some(model) = self.models.get(&target).cloned() else {
            return TypeSymbol::Error;
        };

        let tree = model.tree().clone();
        let mut params = ObjectType {
            properties: IndexMap::new(),
            strict: true,
        };
        let mut outputs = ObjectType {
            properties: IndexMap::new(),
            strict: true,
        };
        for symbol in model.symbols() {
            // Only the first declaration of a duplicated name is visible.
            if model.symbol(&symbol.name).map(|first| first.id) != Some(symbol.id) {
                continue;
            }
            match symbol.kind {
                SymbolKind::Parameter => {
                    let has_default = matches!(
                        tree.kind(symbol.declaration),
                        SyntaxKind::Parameter {
                            default: Some(_),
                            ..
                        }
                    );
                    params.properties.insert(
                        symbol.name.clone(),
                        PropertyType {
                            ty: symbol.ty.clone(),
                            required: !has_default,
                            read_only: false,
                        },
                    );
                }
                SymbolKind::Output => {
                    outputs
                        .properties
                        .insert(symbol.name.clone(), PropertyType::read_only(symbol.ty.clone()));
                }
                _ => {}
            }
        }

        self.modules.insert(decl, model);
        TypeSymbol::Module(Arc::new(ModuleType {
            uri: target,
            params,
            outputs,
        }))
    }

    /// Check one declaration. Returns the type of its value.
    pub(super) fn check_declaration(&mut self, decl: NodeId, id: SymbolId) -> TypeSymbol {
        let kind = self.tree.kind(decl).clone();
        let symbol_kind = self.symbol(id).kind;
        let header = self.symbol(id).ty.clone();

        self.check_decorators(kind.leading(), symbol_kind, &header);

        let ty = match &kind {
            SyntaxKind::Parameter { default, .. } => {
                if let Some(default) = default {
                    if let SyntaxKind::ParameterDefault { value, .. } = self.tree.kind(*default) {
                        let value = *value;
                        self.value(value, Some(&header), Ctx::plain());
                    }
                }
                header
            }
            SyntaxKind::Variable { value, .. } => self.value(*value, None, Ctx::plain()),
            SyntaxKind::Resource {
                type_string, value, ..
            } => {
                // Rejected header, but its references still count as uses.
                if let SyntaxKind::StringLiteral { expressions, .. } =
                    self.tree.kind(*type_string).clone()
                {
                    for expression in expressions {
                        self.expression(expression);
                    }
                }
                let body = match unwrap_collection(&header) {
                    TypeSymbol::Resource(resource) => Some(resource.body.clone()),
                    _ => None,
                };
                self.declaration_body(*value, body.as_ref(), true);
                header
            }
            SyntaxKind::Module { value, .. } => {
                let body = match unwrap_collection(&header) {
                    TypeSymbol::Module(module) => Some(module.body()),
                    _ => None,
                };
                self.declaration_body(*value, body.as_ref(), false);
                header
            }
            SyntaxKind::Output { value, .. } => {
                if matches!(self.tree.kind(*value), SyntaxKind::ForExpression { .. }) {
                    let element = header.element_type();
                    let ty = self.for_expression(*value, |this, body| {
                        this.value(body, element.as_ref(), Ctx::plain())
                    });
                    self.check_assignable(*value, &ty, &header);
                } else {
                    self.value(*value, Some(&header), Ctx::plain());
                }
                header
            }
            _ => TypeSymbol::Error,
        };
        self.types.insert(decl, ty.clone());
        ty
    }

    /// Resource or module body: an object, `if (cond) object` or a loop
    /// over either.
    fn declaration_body(&mut self, node: NodeId, body: Option<&ObjectType>, resource: bool) {
        match self.tree.kind(node).clone() {
            SyntaxKind::ForExpression { .. } => {
                let body = body.cloned();
                self.for_expression(node, |this, inner| {
                    this.conditional_body(inner, body.as_ref(), resource)
                });
            }
            _ => {
                self.conditional_body(node, body, resource);
            }
        }
    }

    fn conditional_body(
        &mut self,
        node: NodeId,
        body: Option<&ObjectType>,
        resource: bool,
    ) -> TypeSymbol {
        let ctx = if resource { Ctx::resource_body() } else { Ctx::plain() };
        let expected = body.map(|body| TypeSymbol::Object(body.clone()));
        match self.tree.kind(node).clone() {
            SyntaxKind::IfCondition {
                condition,
                body: inner,
                ..
            } => {
                self.value(condition, Some(&TypeSymbol::Bool), Ctx::plain());
                let ty = self.body_object(inner, expected.as_ref(), ctx, resource);
                self.record(node, ty)
            }
            _ => self.body_object(node, expected.as_ref(), ctx, resource),
        }
    }

    /// The object literal at the heart of a declaration body. Anything else
    /// is still typed, so its references count as uses.
    fn body_object(
        &mut self,
        node: NodeId,
        expected: Option<&TypeSymbol>,
        ctx: Ctx,
        resource: bool,
    ) -> TypeSymbol {
        let kind = self.tree.kind(node);
        if matches!(kind, SyntaxKind::Object { .. }) {
            return self.value(node, expected, ctx);
        }
        // A skipped body was already reported by the parser.
        if !kind.is_skipped() {
            let span = self.span(node);
            let what = if resource { "resource" } else { "module" };
            self.error(
                DiagnosticCode::ObjectLiteralRequired,
                span,
                format!(
                    "the body of a {what} declaration must be an object literal, optionally wrapped in 'if' or 'for'"
                ),
            );
        }
        self.value(node, None, Ctx::plain());
        TypeSymbol::Error
    }

    fn check_decorators(&mut self, leading: &[Element], kind: SymbolKind, target: &TypeSymbol) {
        let mut seen: Vec<String> = Vec::new();
        for element in leading {
            let Element::Node(node) = element else {
                continue;
            };
            let SyntaxKind::Decorator { expression, .. } = self.tree.kind(*node).clone() else {
                continue;
            };
            let Some(name) = self.arena().function_name(expression).map(str::to_string) else {
                continue;
            };
            let span = self.span(expression);
            let args = self.arena().child_nodes(expression);
            let arg_types: Vec<TypeSymbol> = args.iter().map(|arg| self.expression(*arg)).collect();

            let Some(signature) = decorators::lookup(&name) else {
                self.error(
                    DiagnosticCode::InvalidDecorator,
                    span,
                    format!("'@{name}' is not a known decorator"),
                );
                continue;
            };
            if seen.contains(&name) {
                self.error(
                    DiagnosticCode::InvalidDecorator,
                    span,
                    format!("'@{name}' is applied more than once"),
                );
                continue;
            }
            seen.push(name.clone());

            if signature.parameters_only && kind != SymbolKind::Parameter {
                self.error(
                    DiagnosticCode::InvalidDecorator,
                    span,
                    format!("'@{name}' can only be applied to parameters"),
                );
                continue;
            }
            if kind == SymbolKind::Parameter && !(signature.applies_to)(target) {
                self.error(
                    DiagnosticCode::InvalidDecorator,
                    span,
                    format!("'@{name}' cannot be applied to a parameter of type '{target}'"),
                );
                continue;
            }

            let expected = usize::from(signature.argument.is_some());
            if args.len() != expected {
                self.error(
                    DiagnosticCode::ArgumentCount,
                    span,
                    format!(
                        "'@{name}' expects {expected} argument(s) but {} were provided",
                        args.len()
                    ),
                );
                continue;
            }
            let Some((arg, ty)) = args.first().copied().zip(arg_types.first()) else {
                continue;
            };
            let kind = signature.argument.unwrap_or(ArgKind::Any);
            if !kind.accepts(ty) {
                let arg_span = self.span(arg);
                self.error(
                    DiagnosticCode::ArgumentType,
                    arg_span,
                    format!(
                        "argument of type '{ty}' is not assignable to parameter of type '{}'",
                        kind.describe()
                    ),
                );
                continue;
            }
            if !self.is_constant(arg) {
                let arg_span = self.span(arg);
                self.error(
                    DiagnosticCode::InvalidDecorator,
                    arg_span,
                    "decorator arguments must be constant values",
                );
                continue;
            }
            if name == "allowed" {
                self.check_allowed_values(arg, target);
            }
        }
    }

    /// Every `@allowed` item must be a valid value of the parameter.
    fn check_allowed_values(&mut self, array: NodeId, target: &TypeSymbol) {
        for item in self.arena().child_nodes(array) {
            let SyntaxKind::ArrayItem { value } = self.tree.kind(item) else {
                continue;
            };
            let value = *value;
            let ty = self.types.get(&value).cloned().unwrap_or(TypeSymbol::Any);
            self.check_assignable(value, &ty, target);
        }
    }

    /// Literal, collection or operator tree without references or calls.
    fn is_constant(&self, node: NodeId) -> bool {
        let mut constant = true;
        self.arena().walk(node, &mut |_, kind| {
            if matches!(
                kind,
                SyntaxKind::VariableAccess { .. }
                    | SyntaxKind::FunctionCall { .. }
                    | SyntaxKind::ForExpression { .. }
            ) {
                constant = false;
            }
        });
        constant
    }
}

/// Element type of a looped declaration, or the type itself.
fn unwrap_collection(ty: &TypeSymbol) -> &TypeSymbol {
    match ty {
        TypeSymbol::Array(element) => element,
        other => other,
    }
}
