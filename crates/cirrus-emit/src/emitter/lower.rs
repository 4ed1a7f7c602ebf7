//! Expression lowering.
//!
//! Variables are inlined at every use, parameters become `parameters()`
//! calls and loop locals stand for `copyIndex()` expressions of the copy
//! loop being emitted. References to resources and modules go through
//! [`Target`] so that `r.id`, `r.properties.x` and `m.outputs.y` each get
//! their own template form.

use crate::error::EmitError;
use crate::expression::LanguageExpression as E;
use cirrus_ast::{NodeId, SyntaxKind};
use cirrus_resolve::{SemanticModel, SymbolId, SymbolKind, TypeSymbol};

pub(crate) const DEPLOYMENTS_TYPE: &str = "Microsoft.Resources/deployments";
pub(crate) const DEPLOYMENTS_API_VERSION: &str = "2019-10-01";

/// A resource or module deployment as seen from an expression.
#[derive(Debug, Clone)]
pub(crate) struct ResourceRef {
    pub full_type: String,
    pub api_version: String,
    /// Number of type segments after the namespace.
    pub depth: usize,
    pub name: E,
}

impl ResourceRef {
    /// Reference for a declaration of type `ty`: a resource, a module, or
    /// a collection of either.
    pub fn new(ty: &TypeSymbol, name: E) -> Self {
        let element = match ty {
            TypeSymbol::Array(element) => element.as_ref(),
            ty => ty,
        };
        match element {
            TypeSymbol::Resource(resource) => Self {
                full_type: resource.reference.full_type(),
                api_version: resource.reference.api_version.clone(),
                depth: resource.reference.types.len(),
                name,
            },
            _ => Self {
                full_type: DEPLOYMENTS_TYPE.to_string(),
                api_version: DEPLOYMENTS_API_VERSION.to_string(),
                depth: 1,
                name,
            },
        }
    }

    pub fn id(&self) -> E {
        let mut args = vec![E::string(self.full_type.clone())];
        match &self.name {
            E::String(name) if self.depth > 1 => {
                args.extend(name.split('/').map(E::string));
            }
            name => args.push(name.clone()),
        }
        E::call("resourceId", args)
    }

    pub fn reference(&self, full: bool) -> E {
        let mut args = vec![self.id(), E::string(self.api_version.clone())];
        if full {
            args.push(E::string("full"));
        }
        E::call("reference", args)
    }
}

/// Result of lowering an access chain.
#[derive(Debug, Clone)]
enum Target {
    Value(E),
    Resource(ResourceRef),
    /// `r.properties`: the runtime state of the resource.
    ResourceProperties(E),
    Module(ResourceRef),
    /// `m.outputs`: each output is wrapped in `{ value }`.
    ModuleOutputs(E),
    /// A looped resource or module that has not been indexed yet.
    Collection(SymbolId),
}

/// Body of a resource or module declaration with its loop and condition
/// peeled off.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeclarationBody {
    pub for_expression: Option<NodeId>,
    pub condition: Option<NodeId>,
    pub object: NodeId,
}

pub(crate) fn declaration_body(model: &SemanticModel, value: NodeId) -> DeclarationBody {
    let tree = model.tree();
    let (for_expression, inner) = match tree.kind(value) {
        SyntaxKind::ForExpression { body, .. } => (Some(value), *body),
        _ => (None, value),
    };
    let (condition, object) = match tree.kind(inner) {
        SyntaxKind::IfCondition {
            condition, body, ..
        } => (Some(*condition), *body),
        _ => (None, inner),
    };
    DeclarationBody {
        for_expression,
        condition,
        object,
    }
}

/// Value node of the property `name` of an object literal.
pub(crate) fn object_property(model: &SemanticModel, object: NodeId, name: &str) -> Option<NodeId> {
    let arena = model.tree().arena();
    arena.child_nodes(object).into_iter().find_map(|child| {
        let SyntaxKind::ObjectProperty { key, value, .. } = arena.kind(child) else {
            return None;
        };
        (property_key(model, *key)? == name).then_some(*value)
    })
}

pub(crate) fn property_key(model: &SemanticModel, key: NodeId) -> Option<&str> {
    let arena = model.tree().arena();
    match arena.kind(key) {
        SyntaxKind::Identifier { name, .. } => Some(name),
        _ => arena.string_value(key),
    }
}

pub(crate) struct Lowerer<'m> {
    model: &'m SemanticModel,
    /// Loop locals in scope, innermost last.
    locals: Vec<(SymbolId, E)>,
    /// Variables currently being inlined.
    inlining: Vec<SymbolId>,
}

impl<'m> Lowerer<'m> {
    pub fn new(model: &'m SemanticModel) -> Self {
        Self {
            model,
            locals: Vec::new(),
            inlining: Vec::new(),
        }
    }

    fn kind(&self, node: NodeId) -> &'m SyntaxKind {
        self.model.tree().kind(node)
    }

    fn unexpected(&self, node: NodeId) -> EmitError {
        EmitError::UnexpectedSyntax {
            span: self.model.tree().span(node),
        }
    }

    pub fn lower(&mut self, node: NodeId) -> Result<E, EmitError> {
        let model = self.model;
        let lowered = match self.kind(node) {
            SyntaxKind::StringLiteral {
                expressions,
                segments,
                ..
            } => {
                let values = expressions
                    .iter()
                    .map(|expression| self.lower(*expression))
                    .collect::<Result<Vec<_>, _>>()?;
                E::interpolate(segments, values)
            }
            SyntaxKind::IntegerLiteral { value, .. } => E::Int(*value),
            SyntaxKind::BooleanLiteral { value, .. } => E::Bool(*value),
            SyntaxKind::NullLiteral { .. } => E::Null,
            SyntaxKind::Array { .. } => {
                let mut items = Vec::new();
                for item in self.model.tree().arena().child_nodes(node) {
                    if let SyntaxKind::ArrayItem { value } = self.kind(item) {
                        items.push(self.lower(*value)?);
                    }
                }
                E::Array(items)
            }
            SyntaxKind::Object { .. } => self.object(node)?,
            SyntaxKind::Parenthesized { expression, .. } => self.lower(*expression)?,
            SyntaxKind::Unary { op, operand, .. } => E::unary(*op, self.lower(*operand)?),
            SyntaxKind::Binary {
                left, op, right, ..
            } => {
                let left = self.lower(*left)?;
                let right = self.lower(*right)?;
                E::binary(*op, left, right)
            }
            SyntaxKind::Ternary {
                condition,
                true_value,
                false_value,
                ..
            } => {
                let condition = self.lower(*condition)?;
                let true_value = self.lower(*true_value)?;
                let false_value = self.lower(*false_value)?;
                E::ternary(condition, true_value, false_value)
            }
            SyntaxKind::FunctionCall { name, .. } => {
                let name = model
                    .tree()
                    .arena()
                    .identifier_name(*name)
                    .ok_or_else(|| self.unexpected(node))?;
                let mut args = Vec::new();
                for arg in model.tree().arena().child_nodes(node) {
                    args.push(self.lower(arg)?);
                }
                match (name, args.len()) {
                    // `any()` only relaxes type checking.
                    ("any", 1) => args.remove(0),
                    _ => E::call(name, args),
                }
            }
            SyntaxKind::VariableAccess { .. }
            | SyntaxKind::PropertyAccess { .. }
            | SyntaxKind::ArrayAccess { .. } => {
                let target = self.target(node)?;
                self.into_value(target)?
            }
            _ => return Err(self.unexpected(node)),
        };
        Ok(lowered)
    }

    /// Object literal. Property loops become entries of the object's
    /// `copy` array.
    fn object(&mut self, node: NodeId) -> Result<E, EmitError> {
        let mut properties = Vec::new();
        let mut copies = Vec::new();
        for child in self.model.tree().arena().child_nodes(node) {
            let SyntaxKind::ObjectProperty { key, value, .. } = self.kind(child) else {
                continue;
            };
            let key = property_key(self.model, *key)
                .ok_or_else(|| self.unexpected(*key))?
                .to_string();
            if matches!(self.kind(*value), SyntaxKind::ForExpression { .. }) {
                let (count, input) =
                    self.with_loop(*value, Some(&key), |this, body| this.lower(body))?;
                copies.push(E::Object(vec![
                    ("name".to_string(), E::string(key)),
                    ("count".to_string(), count),
                    ("input".to_string(), input),
                ]));
            } else {
                let value = self.lower(*value)?;
                properties.push((key, value));
            }
        }
        if !copies.is_empty() {
            properties.push(("copy".to_string(), E::Array(copies)));
        }
        Ok(E::Object(properties))
    }

    /// Run `body` with the loop locals of the for-expression `node` bound
    /// to `copyIndex()` forms. Returns the copy count and the body result.
    pub fn with_loop<T, F>(
        &mut self,
        node: NodeId,
        copy_name: Option<&str>,
        body: F,
    ) -> Result<(E, T), EmitError>
    where
        F: FnOnce(&mut Self, NodeId) -> Result<T, EmitError>,
    {
        let SyntaxKind::ForExpression {
            variables,
            source,
            body: body_node,
            ..
        } = self.kind(node)
        else {
            return Err(self.unexpected(node));
        };

        let source_value = self.lower(*source)?;
        let index = match copy_name {
            Some(name) => E::call("copyIndex", vec![E::string(name)]),
            None => E::call("copyIndex", Vec::new()),
        };
        let (count, item) = match self.model.type_of(*source) {
            Some(TypeSymbol::Int) => (source_value, index.clone()),
            _ => (
                E::call("length", vec![source_value.clone()]),
                source_value.index(index.clone()),
            ),
        };

        let depth = self.locals.len();
        self.bind_loop_variables(*variables, item, index)?;
        let result = body(self, *body_node);
        self.locals.truncate(depth);
        Ok((count, result?))
    }

    fn bind_loop_variables(&mut self, variables: NodeId, item: E, index: E) -> Result<(), EmitError> {
        let (item_node, index_node) = match self.kind(variables) {
            SyntaxKind::ForVariableBlock { item, index, .. } => (*item, Some(*index)),
            _ => (variables, None),
        };
        let item_symbol = self.loop_symbol(item_node)?;
        self.locals.push((item_symbol, item));
        if let Some(index_node) = index_node {
            let index_symbol = self.loop_symbol(index_node)?;
            self.locals.push((index_symbol, index));
        }
        Ok(())
    }

    fn loop_symbol(&self, node: NodeId) -> Result<SymbolId, EmitError> {
        self.model
            .symbol_of(node)
            .map(|symbol| symbol.id)
            .ok_or_else(|| self.unexpected(node))
    }

    fn target(&mut self, node: NodeId) -> Result<Target, EmitError> {
        let model = self.model;
        match self.kind(node) {
            SyntaxKind::VariableAccess { name } => {
                let symbol = model.symbol_of(node).ok_or_else(|| EmitError::Unbound {
                    name: model
                        .tree()
                        .arena()
                        .identifier_name(*name)
                        .unwrap_or_default()
                        .to_string(),
                })?;
                self.symbol_target(symbol.id)
            }
            SyntaxKind::PropertyAccess { base, property, .. } => {
                let name = model
                    .tree()
                    .arena()
                    .identifier_name(*property)
                    .ok_or_else(|| self.unexpected(*property))?;
                let base = self.target(*base)?;
                self.member(base, name)
            }
            SyntaxKind::ArrayAccess { base, index, .. } => {
                let base = self.target(*base)?;
                let index_value = self.lower(*index)?;
                match base {
                    Target::Collection(id) => self.element(id, index_value),
                    Target::ModuleOutputs(outputs) => match index_value {
                        E::String(name) => self.member(Target::ModuleOutputs(outputs), &name),
                        index_value => Ok(Target::Value(outputs.index(index_value))),
                    },
                    base => Ok(Target::Value(self.into_value(base)?.index(index_value))),
                }
            }
            _ => Ok(Target::Value(self.lower(node)?)),
        }
    }

    fn symbol_target(&mut self, id: SymbolId) -> Result<Target, EmitError> {
        let model = self.model;
        let symbol = model.symbol_by_id(id);
        match symbol.kind {
            SymbolKind::LoopLocal => self
                .locals
                .iter()
                .rev()
                .find(|(local, _)| *local == id)
                .map(|(_, value)| Target::Value(value.clone()))
                .ok_or_else(|| EmitError::Unbound {
                    name: symbol.name.clone(),
                }),
            SymbolKind::Parameter => Ok(Target::Value(E::call(
                "parameters",
                vec![E::string(symbol.name.clone())],
            ))),
            SymbolKind::Variable => {
                if self.inlining.contains(&id) {
                    return Err(EmitError::RecursiveVariable {
                        name: symbol.name.clone(),
                    });
                }
                let SyntaxKind::Variable { value, .. } = self.kind(symbol.declaration) else {
                    return Err(self.unexpected(symbol.declaration));
                };
                // Loop locals of the use site are not visible in the
                // variable's own value.
                let locals = std::mem::take(&mut self.locals);
                self.inlining.push(id);
                let value = self.lower(*value);
                self.inlining.pop();
                self.locals = locals;
                Ok(Target::Value(value?))
            }
            SymbolKind::Resource | SymbolKind::Module
                if matches!(symbol.ty, TypeSymbol::Array(_)) =>
            {
                Ok(Target::Collection(id))
            }
            SymbolKind::Resource => Ok(Target::Resource(self.resource_ref(id, None)?)),
            SymbolKind::Module => Ok(Target::Module(self.resource_ref(id, None)?)),
            SymbolKind::Output => Err(EmitError::Unbound {
                name: symbol.name.clone(),
            }),
        }
    }

    /// One element of a looped resource or module.
    fn element(&mut self, id: SymbolId, index: E) -> Result<Target, EmitError> {
        let reference = self.resource_ref(id, Some(index))?;
        Ok(match self.model.symbol_by_id(id).kind {
            SymbolKind::Module => Target::Module(reference),
            _ => Target::Resource(reference),
        })
    }

    /// Type and name of the resource or module `id`. For an element of a
    /// collection the loop locals of its name stand for element `index`.
    pub fn resource_ref(&mut self, id: SymbolId, index: Option<E>) -> Result<ResourceRef, EmitError> {
        let model = self.model;
        let symbol = model.symbol_by_id(id);
        let value = match self.kind(symbol.declaration) {
            SyntaxKind::Resource { value, .. } | SyntaxKind::Module { value, .. } => *value,
            _ => return Err(self.unexpected(symbol.declaration)),
        };

        let body = declaration_body(model, value);
        let name_node = object_property(model, body.object, "name")
            .ok_or_else(|| self.unexpected(body.object))?;

        // The name is evaluated in the declaration's own scope.
        let outer = std::mem::take(&mut self.locals);
        let name = match (body.for_expression, index) {
            (Some(for_expression), Some(index)) => {
                self.element_name(for_expression, index, name_node)
            }
            _ => self.lower(name_node),
        };
        self.locals = outer;
        Ok(ResourceRef::new(&symbol.ty, name?))
    }

    fn element_name(&mut self, for_expression: NodeId, index: E, name_node: NodeId) -> Result<E, EmitError> {
        let SyntaxKind::ForExpression {
            variables, source, ..
        } = self.kind(for_expression)
        else {
            return Err(self.unexpected(for_expression));
        };
        let source_value = self.lower(*source)?;
        let item = match self.model.type_of(*source) {
            Some(TypeSymbol::Int) => index.clone(),
            _ => source_value.index(index.clone()),
        };
        self.bind_loop_variables(*variables, item, index)?;
        self.lower(name_node)
    }

    fn member(&mut self, base: Target, name: &str) -> Result<Target, EmitError> {
        Ok(match base {
            Target::Value(value) => Target::Value(value.property(name)),
            Target::Resource(resource) => match name {
                "id" => Target::Value(resource.id()),
                "name" => Target::Value(resource.name),
                "type" => Target::Value(E::string(resource.full_type)),
                "apiVersion" => Target::Value(E::string(resource.api_version)),
                "properties" => Target::ResourceProperties(resource.reference(false)),
                other => Target::Value(resource.reference(true).property(other)),
            },
            Target::ResourceProperties(properties) => Target::Value(properties.property(name)),
            Target::Module(module) => match name {
                "name" => Target::Value(module.name),
                "outputs" => Target::ModuleOutputs(module.reference(false).property("outputs")),
                other => Target::Value(module.reference(true).property(other)),
            },
            Target::ModuleOutputs(outputs) => {
                Target::Value(outputs.property(name).property("value"))
            }
            Target::Collection(id) => {
                return Err(EmitError::Unbound {
                    name: self.model.symbol_by_id(id).name.clone(),
                })
            }
        })
    }

    fn into_value(&self, target: Target) -> Result<E, EmitError> {
        match target {
            Target::Value(value)
            | Target::ResourceProperties(value)
            | Target::ModuleOutputs(value) => Ok(value),
            Target::Resource(resource) | Target::Module(resource) => Ok(resource.reference(true)),
            Target::Collection(id) => Err(EmitError::Unbound {
                name: self.model.symbol_by_id(id).name.clone(),
            }),
        }
    }
}
