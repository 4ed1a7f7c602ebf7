//! The type lattice.
//!
//! `Any` is the loose top type: it is assignable to and from everything.
//! `Error` marks a value that already failed to type check; it is
//! assignable everywhere too, so one mistake never cascades into further
//! diagnostics.

use crate::catalog::{PropertySchema, ResourceSchema, ResourceTypeReference, SchemaKind};
use cirrus_ast::FileUri;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSymbol {
    Any,
    Error,
    String,
    Int,
    Bool,
    Null,
    Array(Box<TypeSymbol>),
    Object(ObjectType),
    Resource(Arc<ResourceType>),
    Module(Arc<ModuleType>),
    Union(Vec<TypeSymbol>),
}

/// An object shape. A strict object rejects unknown properties; a loose one
/// types them as `Any`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectType {
    pub properties: IndexMap<String, PropertyType>,
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyType {
    pub ty: TypeSymbol,
    pub required: bool,
    pub read_only: bool,
}

impl PropertyType {
    pub fn optional(ty: TypeSymbol) -> Self {
        Self {
            ty,
            required: false,
            read_only: false,
        }
    }

    pub fn required(ty: TypeSymbol) -> Self {
        Self {
            ty,
            required: true,
            read_only: false,
        }
    }

    pub fn read_only(ty: TypeSymbol) -> Self {
        Self {
            ty,
            required: false,
            read_only: true,
        }
    }
}

/// A resource declaration's type: its reference plus the body shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceType {
    pub reference: ResourceTypeReference,
    pub body: ObjectType,
    pub existing: bool,
}

/// Shape of a module as seen by its consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleType {
    pub uri: FileUri,
    /// The module's parameters; required when they have no default.
    pub params: ObjectType,
    pub outputs: ObjectType,
}

impl TypeSymbol {
    pub fn array(element: TypeSymbol) -> Self {
        TypeSymbol::Array(Box::new(element))
    }

    /// `object` with no known properties.
    pub fn loose_object() -> Self {
        TypeSymbol::Object(ObjectType::default())
    }

    /// Union of two types, flattened and deduplicated. `Any` and `Error`
    /// absorb everything.
    pub fn union(a: TypeSymbol, b: TypeSymbol) -> Self {
        if a.is_error() || b.is_error() {
            return TypeSymbol::Error;
        }
        if matches!(a, TypeSymbol::Any) || matches!(b, TypeSymbol::Any) {
            return TypeSymbol::Any;
        }
        let mut members: Vec<TypeSymbol> = Vec::new();
        for ty in [a, b] {
            let parts = match ty {
                TypeSymbol::Union(parts) => parts,
                other => vec![other],
            };
            for part in parts {
                if !members.contains(&part) {
                    members.push(part);
                }
            }
        }
        if members.len() == 1 {
            members.remove(0)
        } else {
            TypeSymbol::Union(members)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeSymbol::Error)
    }

    /// True for `Any` and `Error`, which accept every operation.
    pub fn is_loose(&self) -> bool {
        matches!(self, TypeSymbol::Any | TypeSymbol::Error)
    }

    /// Element type of an array, `Any` for loose types.
    pub fn element_type(&self) -> Option<TypeSymbol> {
        match self {
            TypeSymbol::Array(element) => Some((**element).clone()),
            TypeSymbol::Any => Some(TypeSymbol::Any),
            TypeSymbol::Error => Some(TypeSymbol::Error),
            _ => None,
        }
    }

    /// Type for a parameter or output type keyword.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(TypeSymbol::String),
            "int" => Some(TypeSymbol::Int),
            "bool" => Some(TypeSymbol::Bool),
            "array" => Some(TypeSymbol::array(TypeSymbol::Any)),
            "object" => Some(TypeSymbol::loose_object()),
            _ => None,
        }
    }

    /// Whether a value of this type may be stored where `target` is
    /// expected.
    pub fn is_assignable_to(&self, target: &TypeSymbol) -> bool {
        match (self, target) {
            (a, b) if a.is_loose() || b.is_loose() => true,
            (TypeSymbol::Union(members), target) => {
                members.iter().all(|member| member.is_assignable_to(target))
            }
            (value, TypeSymbol::Union(members)) => {
                members.iter().any(|member| value.is_assignable_to(member))
            }
            (TypeSymbol::String, TypeSymbol::String)
            | (TypeSymbol::Int, TypeSymbol::Int)
            | (TypeSymbol::Bool, TypeSymbol::Bool)
            | (TypeSymbol::Null, TypeSymbol::Null) => true,
            (TypeSymbol::Array(value), TypeSymbol::Array(target)) => value.is_assignable_to(target),
            (TypeSymbol::Object(value), TypeSymbol::Object(target)) => {
                // A loose value may carry any property, required ones included.
                let has_required = !value.strict
                    || target
                        .properties
                        .iter()
                        .filter(|(_, expected)| expected.required)
                        .all(|(name, _)| value.properties.contains_key(name));
                has_required
                    && value.properties.iter().all(|(name, property)| {
                        target
                            .properties
                            .get(name)
                            .map_or(true, |expected| property.ty.is_assignable_to(&expected.ty))
                    })
            }
            (TypeSymbol::Resource(a), TypeSymbol::Resource(b)) => a.reference == b.reference,
            (TypeSymbol::Module(a), TypeSymbol::Module(b)) => a.uri == b.uri,
            _ => false,
        }
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSymbol::Any => f.write_str("any"),
            TypeSymbol::Error => f.write_str("error"),
            TypeSymbol::String => f.write_str("string"),
            TypeSymbol::Int => f.write_str("int"),
            TypeSymbol::Bool => f.write_str("bool"),
            TypeSymbol::Null => f.write_str("null"),
            TypeSymbol::Array(element) => match **element {
                TypeSymbol::Any => f.write_str("array"),
                TypeSymbol::Union(_) => write!(f, "({element})[]"),
                _ => write!(f, "{element}[]"),
            },
            TypeSymbol::Object(_) => f.write_str("object"),
            TypeSymbol::Resource(resource) => write!(f, "resource '{}'", resource.reference),
            TypeSymbol::Module(module) => write!(f, "module '{}'", module.uri.file_name()),
            TypeSymbol::Union(members) => {
                for (idx, member) in members.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&PropertySchema> for TypeSymbol {
    fn from(schema: &PropertySchema) -> Self {
        match schema.kind {
            SchemaKind::String => TypeSymbol::String,
            SchemaKind::Int => TypeSymbol::Int,
            SchemaKind::Bool => TypeSymbol::Bool,
            SchemaKind::Any => TypeSymbol::Any,
            SchemaKind::Array => TypeSymbol::array(
                schema
                    .items
                    .as_deref()
                    .map(TypeSymbol::from)
                    .unwrap_or(TypeSymbol::Any),
            ),
            SchemaKind::Object => TypeSymbol::Object(ObjectType {
                properties: schema
                    .properties
                    .iter()
                    .map(|(name, property)| (name.clone(), PropertyType::from(property)))
                    .collect(),
                strict: schema.strict,
            }),
        }
    }
}

impl From<&PropertySchema> for PropertyType {
    fn from(schema: &PropertySchema) -> Self {
        Self {
            ty: TypeSymbol::from(schema),
            required: schema.required,
            read_only: schema.read_only,
        }
    }
}

impl ResourceType {
    /// Build the body shape for a declaration. Without a schema the body is
    /// loose. An `existing` resource only takes its name; everything else
    /// is readable but not assignable.
    pub fn new(
        reference: ResourceTypeReference,
        schema: Option<&ResourceSchema>,
        existing: bool,
    ) -> Self {
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), PropertyType::read_only(TypeSymbol::String));
        properties.insert("name".to_string(), PropertyType::required(TypeSymbol::String));
        properties.insert("type".to_string(), PropertyType::read_only(TypeSymbol::String));
        properties.insert(
            "apiVersion".to_string(),
            PropertyType::read_only(TypeSymbol::String),
        );

        if let Some(schema) = schema {
            for (name, property) in &schema.properties {
                let mut property = PropertyType::from(property);
                if existing {
                    property.required = false;
                    property.read_only = true;
                }
                properties.insert(name.clone(), property);
            }
        }

        Self {
            reference,
            body: ObjectType {
                properties,
                strict: schema.map_or(false, |schema| schema.strict) || existing,
            },
            existing,
        }
    }
}

impl ModuleType {
    /// Body shape of a `module` declaration: `name` and `params`.
    pub fn body(&self) -> ObjectType {
        let params_required = self.params.properties.values().any(|param| param.required);
        let mut properties = IndexMap::new();
        properties.insert("name".to_string(), PropertyType::required(TypeSymbol::String));
        properties.insert(
            "params".to_string(),
            PropertyType {
                ty: TypeSymbol::Object(self.params.clone()),
                required: params_required,
                read_only: false,
            },
        );
        properties.insert(
            "outputs".to_string(),
            PropertyType::read_only(TypeSymbol::Object(self.outputs.clone())),
        );
        ObjectType {
            properties,
            strict: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_flattens_and_dedups() {
        let ty = TypeSymbol::union(
            TypeSymbol::Union(vec![TypeSymbol::Int, TypeSymbol::String]),
            TypeSymbol::Int,
        );
        assert_eq!(ty, TypeSymbol::Union(vec![TypeSymbol::Int, TypeSymbol::String]));
        assert_eq!(ty.to_string(), "int | string");
        assert_eq!(TypeSymbol::union(TypeSymbol::Bool, TypeSymbol::Bool), TypeSymbol::Bool);
        assert_eq!(TypeSymbol::union(TypeSymbol::Bool, TypeSymbol::Any), TypeSymbol::Any);
    }

    #[test]
    fn test_assignability() {
        assert!(TypeSymbol::Int.is_assignable_to(&TypeSymbol::Int));
        assert!(!TypeSymbol::Int.is_assignable_to(&TypeSymbol::String));
        assert!(TypeSymbol::Error.is_assignable_to(&TypeSymbol::String));
        assert!(TypeSymbol::array(TypeSymbol::Int).is_assignable_to(&TypeSymbol::array(TypeSymbol::Any)));
        assert!(!TypeSymbol::array(TypeSymbol::Int).is_assignable_to(&TypeSymbol::array(TypeSymbol::Bool)));
        let union = TypeSymbol::Union(vec![TypeSymbol::Int, TypeSymbol::String]);
        assert!(TypeSymbol::Int.is_assignable_to(&union));
        assert!(!union.is_assignable_to(&TypeSymbol::Int));
    }

    #[test]
    fn test_object_assignability_checks_required_properties() {
        let mut properties = IndexMap::new();
        properties.insert("name".to_string(), PropertyType::required(TypeSymbol::String));
        properties.insert("size".to_string(), PropertyType::optional(TypeSymbol::Int));
        let target = TypeSymbol::Object(ObjectType {
            properties,
            strict: true,
        });

        let literal = |names: &[&str]| {
            TypeSymbol::Object(ObjectType {
                properties: names
                    .iter()
                    .map(|name| (name.to_string(), PropertyType::optional(TypeSymbol::Any)))
                    .collect(),
                strict: true,
            })
        };
        assert!(literal(&["name"]).is_assignable_to(&target));
        assert!(literal(&["name", "size"]).is_assignable_to(&target));
        assert!(!literal(&["size"]).is_assignable_to(&target));
        assert!(!literal(&[]).is_assignable_to(&target));
        // `object` parameters have an unknown shape.
        assert!(TypeSymbol::loose_object().is_assignable_to(&target));
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeSymbol::array(TypeSymbol::Any).to_string(), "array");
        assert_eq!(TypeSymbol::array(TypeSymbol::String).to_string(), "string[]");
        assert_eq!(TypeSymbol::loose_object().to_string(), "object");
    }

    #[test]
    fn test_existing_resource_body_is_read_only() {
        let reference = ResourceTypeReference::parse("A.B/c@1").unwrap();
        let schema = ResourceSchema::new()
            .with_property("location", PropertySchema::new(SchemaKind::String).required());
        let declared = ResourceType::new(reference.clone(), Some(&schema), false);
        assert!(declared.body.properties["location"].required);
        assert!(!declared.body.strict);

        let existing = ResourceType::new(reference, Some(&schema), true);
        let location = &existing.body.properties["location"];
        assert!(!location.required && location.read_only);
        assert!(existing.body.properties["name"].required);
    }
}
