//! Template document assembly.

use super::dependencies::{collect_dependencies, deployment_order};
use super::lower::{declaration_body, DeclarationBody, Lowerer, ResourceRef};
use super::EmitOptions;
use crate::error::EmitError;
use crate::expression::LanguageExpression as E;
use cirrus_ast::{Element, NodeId, SyntaxKind};
use cirrus_resolve::{SemanticModel, SymbolId, TypeSymbol};
use serde_json::{json, Map, Value};

pub const TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";

/// One entry of the `resources` array before ordering.
pub(crate) struct Deployment {
    pub symbol: SymbolId,
    pub name: String,
    pub body: Map<String, Value>,
    pub dependencies: Vec<SymbolId>,
    /// How dependents list this entry in `dependsOn`.
    pub reference: Value,
}

pub(crate) fn build_template(model: &SemanticModel, options: &EmitOptions) -> Result<Value, EmitError> {
    let tree = model.tree();
    let mut parameters = Map::new();
    let mut deployments = Vec::new();
    let mut outputs = Map::new();

    for decl in tree.declarations() {
        let Some(symbol) = model.symbol_of(decl) else {
            continue;
        };
        let (id, name) = (symbol.id, symbol.name.clone());
        match tree.kind(decl) {
            SyntaxKind::Parameter { .. } => {
                parameters.insert(name, parameter(model, decl)?);
            }
            SyntaxKind::Resource { existing: None, .. } => {
                deployments.push(resource(model, decl, id)?);
            }
            SyntaxKind::Module { .. } => {
                deployments.push(module(model, decl, id, options)?);
            }
            SyntaxKind::Output { .. } => {
                outputs.insert(name, output(model, decl)?);
            }
            _ => {}
        }
    }

    let order = deployment_order(&deployments)?;
    let mut position = vec![usize::MAX; deployments.len()];
    for (rank, idx) in order.iter().enumerate() {
        position[*idx] = rank;
    }
    let mut resources = Vec::new();
    for idx in &order {
        let deployment = &deployments[*idx];
        let mut body = deployment.body.clone();
        let mut depends: Vec<usize> = deployment
            .dependencies
            .iter()
            .filter_map(|dep| deployments.iter().position(|other| other.symbol == *dep))
            .collect();
        depends.sort_by_key(|dep| position[*dep]);
        if !depends.is_empty() {
            let refs = depends
                .into_iter()
                .map(|dep| deployments[dep].reference.clone())
                .collect();
            body.insert("dependsOn".to_string(), Value::Array(refs));
        }
        resources.push(Value::Object(body));
    }

    Ok(json!({
        "$schema": TEMPLATE_SCHEMA,
        "contentVersion": options.content_version,
        "parameters": parameters,
        "functions": [],
        "variables": {},
        "resources": resources,
        "outputs": outputs,
    }))
}

/// Decorator name and lowered argument, in source order.
fn decorators(model: &SemanticModel, leading: &[Element]) -> Result<Vec<(String, E)>, EmitError> {
    let arena = model.tree().arena();
    let mut lowerer = Lowerer::new(model);
    let mut out = Vec::new();
    for element in leading {
        let Element::Node(node) = element else {
            continue;
        };
        let SyntaxKind::Decorator { expression, .. } = arena.kind(*node) else {
            continue;
        };
        let Some(name) = arena.function_name(*expression) else {
            continue;
        };
        let argument = match arena.child_nodes(*expression).first() {
            Some(arg) => lowerer.lower(*arg)?,
            None => E::Null,
        };
        out.push((name.to_string(), argument));
    }
    Ok(out)
}

fn parameter(model: &SemanticModel, decl: NodeId) -> Result<Value, EmitError> {
    let tree = model.tree();
    let SyntaxKind::Parameter {
        leading,
        ty,
        default,
        ..
    } = tree.kind(decl)
    else {
        return Err(EmitError::UnexpectedSyntax {
            span: tree.span(decl),
        });
    };

    let decorators = decorators(model, leading)?;
    let secure = decorators.iter().any(|(name, _)| name == "secure");
    let type_name = tree.arena().identifier_name(*ty).unwrap_or("object");
    let type_name = match (type_name, secure) {
        ("string", true) => "securestring",
        ("object", true) => "secureObject",
        (name, _) => name,
    };

    let mut out = Map::new();
    out.insert("type".to_string(), json!(type_name));
    if let Some(default) = default {
        if let SyntaxKind::ParameterDefault { value, .. } = tree.kind(*default) {
            let value = Lowerer::new(model).lower(*value)?;
            out.insert("defaultValue".to_string(), value.to_json());
        }
    }

    let mut metadata = Map::new();
    for (name, argument) in decorators {
        match name.as_str() {
            "allowed" => {
                out.insert("allowedValues".to_string(), argument.to_json());
            }
            "minValue" | "maxValue" | "minLength" | "maxLength" => {
                out.insert(name, argument.to_json());
            }
            "description" => {
                metadata.insert("description".to_string(), argument.to_json());
            }
            "metadata" => {
                if let Value::Object(entries) = argument.to_json() {
                    metadata.extend(entries);
                }
            }
            _ => {}
        }
    }
    if !metadata.is_empty() {
        out.insert("metadata".to_string(), Value::Object(metadata));
    }
    Ok(Value::Object(out))
}

/// Properties of a declaration body object, without `name`.
fn body_properties(value: E) -> Vec<(String, E)> {
    match value {
        E::Object(properties) => properties
            .into_iter()
            .filter(|(key, _)| key != "name")
            .collect(),
        _ => Vec::new(),
    }
}

/// `condition` and `copy` of a looped or conditional body, plus the
/// lowered body object. Loop locals are bound while lowering both.
struct LoweredBody {
    copy: Option<Value>,
    condition: Option<E>,
    object: E,
}

fn lower_body(
    lowerer: &mut Lowerer<'_>,
    body: DeclarationBody,
    copy_name: &str,
) -> Result<LoweredBody, EmitError> {
    match body.for_expression {
        Some(node) => {
            let (count, (condition, object)) =
                lowerer.with_loop(node, None, |this, _| lower_inner(this, body))?;
            Ok(LoweredBody {
                copy: Some(json!({ "name": copy_name, "count": count.to_json() })),
                condition,
                object,
            })
        }
        None => {
            let (condition, object) = lower_inner(lowerer, body)?;
            Ok(LoweredBody {
                copy: None,
                condition,
                object,
            })
        }
    }
}

fn lower_inner(
    lowerer: &mut Lowerer<'_>,
    body: DeclarationBody,
) -> Result<(Option<E>, E), EmitError> {
    let condition = body.condition.map(|node| lowerer.lower(node)).transpose()?;
    let object = lowerer.lower(body.object)?;
    Ok((condition, object))
}

fn deployment_header(
    reference: &ResourceRef,
    lowered: &LoweredBody,
) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("type".to_string(), json!(reference.full_type));
    out.insert("apiVersion".to_string(), json!(reference.api_version));
    out.insert("name".to_string(), reference.name.to_json());
    if let Some(condition) = &lowered.condition {
        out.insert("condition".to_string(), condition.to_json());
    }
    if let Some(copy) = &lowered.copy {
        out.insert("copy".to_string(), copy.clone());
    }
    out
}

/// Loops are listed in `dependsOn` by copy name, single deployments by id.
fn dependency_reference(model: &SemanticModel, symbol: SymbolId, reference: &ResourceRef) -> Value {
    let symbol = model.symbol_by_id(symbol);
    match symbol.ty {
        TypeSymbol::Array(_) => json!(symbol.name),
        _ => reference.id().to_json(),
    }
}

fn resource(model: &SemanticModel, decl: NodeId, id: SymbolId) -> Result<Deployment, EmitError> {
    let SyntaxKind::Resource { value, .. } = model.tree().kind(decl) else {
        return Err(EmitError::UnexpectedSyntax {
            span: model.tree().span(decl),
        });
    };
    let symbol = model.symbol_by_id(id);
    let mut lowerer = Lowerer::new(model);
    let lowered = lower_body(&mut lowerer, declaration_body(model, *value), &symbol.name)?;

    let reference = ResourceRef::new(&symbol.ty, lowered.object.clone().property("name"));
    let mut body = deployment_header(&reference, &lowered);
    for (key, value) in body_properties(lowered.object) {
        body.insert(key, value.to_json());
    }

    Ok(Deployment {
        symbol: id,
        name: symbol.name.clone(),
        body,
        dependencies: collect_dependencies(model, id),
        reference: dependency_reference(model, id, &reference),
    })
}

fn module(
    model: &SemanticModel,
    decl: NodeId,
    id: SymbolId,
    options: &EmitOptions,
) -> Result<Deployment, EmitError> {
    let SyntaxKind::Module { value, .. } = model.tree().kind(decl) else {
        return Err(EmitError::UnexpectedSyntax {
            span: model.tree().span(decl),
        });
    };
    let symbol = model.symbol_by_id(id);
    let target = model
        .module_model(decl)
        .ok_or_else(|| EmitError::MissingModuleModel {
            name: symbol.name.clone(),
        })?;
    let inner = build_template(target, options)?;

    let mut lowerer = Lowerer::new(model);
    let lowered = lower_body(&mut lowerer, declaration_body(model, *value), &symbol.name)?;

    let reference = ResourceRef::new(&symbol.ty, lowered.object.clone().property("name"));
    let parameters = module_parameters(&symbol.ty, &symbol.name, &lowered.object)?;

    let mut body = deployment_header(&reference, &lowered);
    body.insert(
        "properties".to_string(),
        json!({
            "expressionEvaluationOptions": { "scope": "inner" },
            "mode": "Incremental",
            "parameters": parameters,
            "template": inner,
        }),
    );

    Ok(Deployment {
        symbol: id,
        name: symbol.name.clone(),
        body,
        dependencies: collect_dependencies(model, id),
        reference: dependency_reference(model, id, &reference),
    })
}

/// `parameters` of a module deployment. Every parameter of the module
/// without a default must be supplied.
fn module_parameters(ty: &TypeSymbol, name: &str, body: &E) -> Result<Map<String, Value>, EmitError> {
    let dynamic = || EmitError::DynamicModuleParameters {
        name: name.to_string(),
    };
    let E::Object(properties) = body else {
        return Err(dynamic());
    };
    let mut parameters = Map::new();
    match properties.iter().find(|(key, _)| key == "params") {
        Some((_, E::Object(entries))) => {
            for (key, value) in entries {
                parameters.insert(key.clone(), json!({ "value": value.to_json() }));
            }
        }
        Some(_) => return Err(dynamic()),
        None => {}
    }

    let module = match ty {
        TypeSymbol::Array(element) => element.as_ref(),
        ty => ty,
    };
    let TypeSymbol::Module(module) = module else {
        return Err(EmitError::MissingModuleModel {
            name: name.to_string(),
        });
    };
    let missing: Vec<String> = module
        .params
        .properties
        .iter()
        .filter(|(param, property)| property.required && !parameters.contains_key(param.as_str()))
        .map(|(param, _)| param.clone())
        .collect();
    if !missing.is_empty() {
        return Err(EmitError::MissingModuleParameters {
            name: name.to_string(),
            params: missing,
        });
    }
    Ok(parameters)
}

fn output(model: &SemanticModel, decl: NodeId) -> Result<Value, EmitError> {
    let tree = model.tree();
    let SyntaxKind::Output { ty, value, .. } = tree.kind(decl) else {
        return Err(EmitError::UnexpectedSyntax {
            span: tree.span(decl),
        });
    };
    let type_name = tree.arena().identifier_name(*ty).unwrap_or("object");
    let mut lowerer = Lowerer::new(model);

    if matches!(tree.kind(*value), SyntaxKind::ForExpression { .. }) {
        let (count, input) = lowerer.with_loop(*value, None, |this, body| this.lower(body))?;
        return Ok(json!({
            "type": type_name,
            "copy": { "count": count.to_json(), "input": input.to_json() },
        }));
    }
    let value = lowerer.lower(*value)?;
    Ok(json!({ "type": type_name, "value": value.to_json() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_ast::FileUri;
    use cirrus_resolve::{ModuleType, ObjectType, PropertyType};
    use std::sync::Arc;

    /// A module with a required `size` and an optional `label`.
    fn module_type() -> TypeSymbol {
        let mut params = ObjectType::default();
        params
            .properties
            .insert("size".to_string(), PropertyType::required(TypeSymbol::Int));
        params
            .properties
            .insert("label".to_string(), PropertyType::optional(TypeSymbol::String));
        TypeSymbol::Module(Arc::new(ModuleType {
            uri: FileUri::parse("inmemory:///m.cirrus").unwrap(),
            params,
            outputs: ObjectType::default(),
        }))
    }

    fn body(params: Option<E>) -> E {
        let mut properties = vec![("name".to_string(), E::string("m"))];
        properties.extend(params.map(|params| ("params".to_string(), params)));
        E::Object(properties)
    }

    #[test]
    fn test_module_parameters_are_wrapped_in_values() {
        let params = E::Object(vec![("size".to_string(), E::Int(2))]);
        let parameters = module_parameters(&module_type(), "m", &body(Some(params))).unwrap();
        assert_eq!(Value::Object(parameters), json!({ "size": { "value": 2 } }));

        let looped = TypeSymbol::array(module_type());
        let params = E::Object(vec![("size".to_string(), E::Int(3))]);
        assert!(module_parameters(&looped, "m", &body(Some(params))).is_ok());
    }

    #[test]
    fn test_missing_required_parameters_are_an_error() {
        let err = module_parameters(&module_type(), "m", &body(None)).unwrap_err();
        match err {
            EmitError::MissingModuleParameters { name, params } => {
                assert_eq!(name, "m");
                assert_eq!(params, vec!["size"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let only_label = E::Object(vec![("label".to_string(), E::string("x"))]);
        assert!(matches!(
            module_parameters(&module_type(), "m", &body(Some(only_label))),
            Err(EmitError::MissingModuleParameters { .. })
        ));
    }

    #[test]
    fn test_non_object_parameters_are_an_error() {
        let dynamic = E::call("parameters", vec![E::string("p")]);
        assert!(matches!(
            module_parameters(&module_type(), "m", &body(Some(dynamic))),
            Err(EmitError::DynamicModuleParameters { .. })
        ));
        assert!(matches!(
            module_parameters(&module_type(), "m", &E::string("m")),
            Err(EmitError::DynamicModuleParameters { .. })
        ));
    }
}
