//! Resource-type catalog.
//!
//! The binder asks a [`ResourceTypeProvider`] for the schema of every
//! `resource` declaration's type. A type the provider does not know is a
//! warning, not an error: the body is then checked loosely.
//!
//! [`StaticCatalog`] is the bundled provider. It is filled programmatically
//! or loaded from JSON:
//!
//! ```json
//! {
//!   "types": {
//!     "Microsoft.Storage/storageAccounts@2019-06-01": {
//!       "strict": true,
//!       "properties": {
//!         "location": { "type": "string", "required": true },
//!         "kind": { "type": "string" },
//!         "properties": {
//!           "type": "object",
//!           "properties": { "accessTier": { "type": "string" } }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid resource type reference '{reference}': {reason}")]
    InvalidTypeReference { reference: String, reason: String },
}

/// `Namespace/type[/child...]@api-version`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceTypeReference {
    pub namespace: String,
    pub types: Vec<String>,
    pub api_version: String,
}

impl ResourceTypeReference {
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidTypeReference {
            reference: text.to_string(),
            reason: reason.to_string(),
        };

        let (full_type, api_version) = text
            .split_once('@')
            .ok_or_else(|| invalid("expected 'Namespace/type@api-version'"))?;
        if api_version.is_empty() || api_version.contains('@') {
            return Err(invalid("the API version must follow a single '@'"));
        }

        let mut segments = full_type.split('/');
        let namespace = segments.next().unwrap_or_default();
        let types: Vec<String> = segments.map(str::to_string).collect();
        if namespace.is_empty() || types.is_empty() {
            return Err(invalid("expected at least a namespace and a type name"));
        }
        let all = std::iter::once(namespace)
            .chain(types.iter().map(String::as_str))
            .chain(std::iter::once(api_version));
        for segment in all {
            if segment.is_empty() || segment.chars().any(char::is_whitespace) {
                return Err(invalid("segments must be non-empty and contain no whitespace"));
            }
        }

        Ok(Self {
            namespace: namespace.to_string(),
            types,
            api_version: api_version.to_string(),
        })
    }

    /// `Namespace/type` without the API version.
    pub fn full_type(&self) -> String {
        let mut out = self.namespace.clone();
        for ty in &self.types {
            out.push('/');
            out.push_str(ty);
        }
        out
    }

    /// Catalog key; resource type names compare case-insensitively.
    fn key(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for ResourceTypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.full_type(), self.api_version)
    }
}

/// Value kind of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    String,
    Int,
    Bool,
    Array,
    Object,
    Any,
}

/// One property of a resource body or nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: SchemaKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub read_only: bool,
    /// Nested properties when `kind` is `object`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertySchema>,
    /// Whether unknown nested properties are errors.
    #[serde(default)]
    pub strict: bool,
    /// Element schema when `kind` is `array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            required: false,
            read_only: false,
            properties: IndexMap::new(),
            strict: false,
            items: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_items(mut self, items: PropertySchema) -> Self {
        self.items = Some(Box::new(items));
        self
    }
}

/// Schema of a resource body: its top-level properties.
///
/// `name`, `id`, `type` and `apiVersion` are implied for every resource
/// and need not be listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,
    #[serde(default)]
    pub strict: bool,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }
}

/// Source of resource schemas for the binder.
pub trait ResourceTypeProvider: Send + Sync {
    fn lookup(&self, reference: &ResourceTypeReference) -> Option<Arc<ResourceSchema>>;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: IndexMap<String, ResourceSchema>,
}

/// In-memory catalog keyed by `type@api-version`.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    types: IndexMap<String, Arc<ResourceSchema>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, reference: &str, schema: ResourceSchema) -> Result<Self, CatalogError> {
        self.insert(reference, schema)?;
        Ok(self)
    }

    pub fn insert(&mut self, reference: &str, schema: ResourceSchema) -> Result<(), CatalogError> {
        let reference = ResourceTypeReference::parse(reference)?;
        self.types.insert(reference.key(), Arc::new(schema));
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (reference, schema) in file.types {
            catalog.insert(&reference, schema)?;
        }
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ResourceTypeProvider for StaticCatalog {
    fn lookup(&self, reference: &ResourceTypeReference) -> Option<Arc<ResourceSchema>> {
        self.types.get(&reference.key()).cloned()
    }
}
