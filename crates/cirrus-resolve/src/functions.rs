//! Built-in function signatures.
//!
//! Every call is checked against this table: arity first, then each
//! argument against its parameter kind. Return types may depend on the
//! argument types (`first` of a `string[]` is a `string`).

use crate::types::{ObjectType, PropertyType, TypeSymbol};
use indexmap::IndexMap;

/// Accepted argument kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Any,
    String,
    Int,
    Bool,
    Array,
    Object,
    StringOrArray,
    IntOrArray,
    ArrayOrObject,
    /// String, array or object.
    Collection,
}

impl ArgKind {
    pub fn accepts(self, ty: &TypeSymbol) -> bool {
        if ty.is_loose() {
            return true;
        }
        if let TypeSymbol::Union(members) = ty {
            return members.iter().all(|member| self.accepts(member));
        }
        let string = matches!(ty, TypeSymbol::String);
        let int = matches!(ty, TypeSymbol::Int);
        let array = matches!(ty, TypeSymbol::Array(_));
        let object = matches!(ty, TypeSymbol::Object(_));
        match self {
            ArgKind::Any => true,
            ArgKind::String => string,
            ArgKind::Int => int,
            ArgKind::Bool => matches!(ty, TypeSymbol::Bool),
            ArgKind::Array => array,
            ArgKind::Object => object,
            ArgKind::StringOrArray => string || array,
            ArgKind::IntOrArray => int || array,
            ArgKind::ArrayOrObject => array || object,
            ArgKind::Collection => string || array || object,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ArgKind::Any => "any",
            ArgKind::String => "string",
            ArgKind::Int => "int",
            ArgKind::Bool => "bool",
            ArgKind::Array => "array",
            ArgKind::Object => "object",
            ArgKind::StringOrArray => "string | array",
            ArgKind::IntOrArray => "int | array",
            ArgKind::ArrayOrObject => "array | object",
            ArgKind::Collection => "string | array | object",
        }
    }
}

/// Signature of one built-in.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSignature {
    pub name: &'static str,
    /// Positional parameters; the last `optional` of them may be omitted.
    pub parameters: &'static [ArgKind],
    pub optional: usize,
    /// Kind of any further arguments, when the function is variadic.
    pub variadic: Option<ArgKind>,
    pub returns: fn(&[TypeSymbol]) -> TypeSymbol,
}

impl FunctionSignature {
    pub fn min_args(&self) -> usize {
        self.parameters.len() - self.optional
    }

    pub fn max_args(&self) -> Option<usize> {
        match self.variadic {
            Some(_) => None,
            None => Some(self.parameters.len()),
        }
    }

    /// Expected kind of the argument at `index`.
    pub fn argument_kind(&self, index: usize) -> Option<ArgKind> {
        self.parameters.get(index).copied().or(self.variadic)
    }

    /// Human-readable arity for messages, e.g. `2 to 3` or `at least 1`.
    pub fn arity(&self) -> String {
        let min = self.min_args();
        match self.max_args() {
            None => format!("at least {min}"),
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{min} to {max}"),
        }
    }
}

fn string(_: &[TypeSymbol]) -> TypeSymbol {
    TypeSymbol::String
}

fn int(_: &[TypeSymbol]) -> TypeSymbol {
    TypeSymbol::Int
}

fn bool(_: &[TypeSymbol]) -> TypeSymbol {
    TypeSymbol::Bool
}

fn any(_: &[TypeSymbol]) -> TypeSymbol {
    TypeSymbol::Any
}

fn int_array(_: &[TypeSymbol]) -> TypeSymbol {
    TypeSymbol::array(TypeSymbol::Int)
}

fn string_array(_: &[TypeSymbol]) -> TypeSymbol {
    TypeSymbol::array(TypeSymbol::String)
}

/// `concat`: arrays concatenate into an array, anything else into a string.
fn concatenated(args: &[TypeSymbol]) -> TypeSymbol {
    match args.first() {
        Some(TypeSymbol::Array(_)) => TypeSymbol::array(TypeSymbol::Any),
        Some(ty) if ty.is_loose() => TypeSymbol::Any,
        _ => TypeSymbol::String,
    }
}

/// `union`: the merged shape is not tracked.
fn merged(args: &[TypeSymbol]) -> TypeSymbol {
    match args.first() {
        Some(TypeSymbol::Array(_)) => TypeSymbol::array(TypeSymbol::Any),
        Some(TypeSymbol::Object(_)) => TypeSymbol::loose_object(),
        _ => TypeSymbol::Any,
    }
}

/// `first`/`last`: element of an array, character of a string.
fn element(args: &[TypeSymbol]) -> TypeSymbol {
    match args.first() {
        Some(TypeSymbol::String) => TypeSymbol::String,
        Some(ty) => ty.element_type().unwrap_or(TypeSymbol::Any),
        None => TypeSymbol::Any,
    }
}

fn loose_object_with(names: &[&str]) -> TypeSymbol {
    let properties: IndexMap<String, PropertyType> = names
        .iter()
        .map(|name| (name.to_string(), PropertyType::read_only(TypeSymbol::String)))
        .collect();
    TypeSymbol::Object(ObjectType {
        properties,
        strict: false,
    })
}

fn resource_group(_: &[TypeSymbol]) -> TypeSymbol {
    loose_object_with(&["id", "name", "location", "type"])
}

fn subscription(_: &[TypeSymbol]) -> TypeSymbol {
    loose_object_with(&["id", "subscriptionId", "tenantId", "displayName"])
}

fn deployment(_: &[TypeSymbol]) -> TypeSymbol {
    loose_object_with(&["name"])
}

fn environment(_: &[TypeSymbol]) -> TypeSymbol {
    loose_object_with(&["name"])
}

macro_rules! sig {
    ($name:literal, [$($param:ident),*], optional $optional:literal, variadic $variadic:expr, $returns:expr) => {
        FunctionSignature {
            name: $name,
            parameters: &[$(ArgKind::$param),*],
            optional: $optional,
            variadic: $variadic,
            returns: $returns,
        }
    };
    ($name:literal, [$($param:ident),*], $returns:expr) => {
        sig!($name, [$($param),*], optional 0, variadic None, $returns)
    };
}

/// Every built-in function, sorted by name.
pub static FUNCTIONS: &[FunctionSignature] = &[
    sig!("any", [Any], any),
    sig!("base64", [String], string),
    sig!("bool", [Any], bool),
    sig!("concat", [StringOrArray], optional 0, variadic Some(ArgKind::StringOrArray), concatenated),
    sig!("contains", [Collection, Any], bool),
    sig!("deployment", [], deployment),
    sig!("empty", [Collection], bool),
    sig!("endsWith", [String, String], bool),
    sig!("environment", [], environment),
    sig!("first", [StringOrArray], element),
    sig!("format", [String], optional 0, variadic Some(ArgKind::Any), string),
    sig!("guid", [String], optional 0, variadic Some(ArgKind::String), string),
    sig!("int", [Any], int),
    sig!("json", [String], any),
    sig!("last", [StringOrArray], element),
    sig!("length", [Collection], int),
    sig!("max", [IntOrArray], optional 0, variadic Some(ArgKind::Int), int),
    sig!("min", [IntOrArray], optional 0, variadic Some(ArgKind::Int), int),
    sig!("range", [Int, Int], int_array),
    sig!("replace", [String, String, String], string),
    sig!("resourceGroup", [], resource_group),
    sig!("split", [String, String], string_array),
    sig!("startsWith", [String, String], bool),
    sig!("string", [Any], string),
    sig!("subscription", [], subscription),
    sig!("substring", [String, Int, Int], optional 1, variadic None, string),
    sig!("toLower", [String], string),
    sig!("toUpper", [String], string),
    sig!("trim", [String], string),
    sig!("union", [ArrayOrObject, ArrayOrObject], optional 0, variadic Some(ArgKind::ArrayOrObject), merged),
    sig!("uniqueString", [String], optional 0, variadic Some(ArgKind::String), string),
];

/// Look up a built-in by its exact name.
pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    FUNCTIONS
        .binary_search_by(|signature| signature.name.cmp(name))
        .ok()
        .map(|index| &FUNCTIONS[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        for pair in FUNCTIONS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("toLower").map(|sig| sig.name), Some("toLower"));
        assert!(lookup("tolower").is_none());
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn test_arity() {
        assert_eq!(lookup("substring").unwrap().arity(), "2 to 3");
        assert_eq!(lookup("format").unwrap().arity(), "at least 1");
        assert_eq!(lookup("resourceGroup").unwrap().arity(), "0");
        assert_eq!(lookup("union").unwrap().argument_kind(5), Some(ArgKind::ArrayOrObject));
    }

    #[test]
    fn test_return_types() {
        let first = lookup("first").unwrap();
        assert_eq!(
            (first.returns)(&[TypeSymbol::array(TypeSymbol::String)]),
            TypeSymbol::String
        );
        let concat = lookup("concat").unwrap();
        assert_eq!(
            (concat.returns)(&[TypeSymbol::String, TypeSymbol::String]),
            TypeSymbol::String
        );
    }

    #[test]
    fn test_accepts() {
        assert!(ArgKind::Collection.accepts(&TypeSymbol::String));
        assert!(!ArgKind::Int.accepts(&TypeSymbol::String));
        assert!(ArgKind::Int.accepts(&TypeSymbol::Error));
        assert!(!ArgKind::String.accepts(&TypeSymbol::Union(vec![
            TypeSymbol::String,
            TypeSymbol::Int
        ])));
    }
}
