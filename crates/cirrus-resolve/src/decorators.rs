//! Declaration decorators.

use crate::functions::ArgKind;
use crate::types::TypeSymbol;

/// Signature of one decorator.
#[derive(Debug, Clone, Copy)]
pub struct DecoratorSignature {
    pub name: &'static str,
    /// The single argument's kind; `None` for `@secure()`.
    pub argument: Option<ArgKind>,
    pub parameters_only: bool,
    /// Parameter types the decorator applies to.
    pub applies_to: fn(&TypeSymbol) -> bool,
}

fn any_type(_: &TypeSymbol) -> bool {
    true
}

fn int_type(ty: &TypeSymbol) -> bool {
    ty.is_loose() || matches!(ty, TypeSymbol::Int)
}

fn sized_type(ty: &TypeSymbol) -> bool {
    ty.is_loose() || matches!(ty, TypeSymbol::String | TypeSymbol::Array(_))
}

fn secure_type(ty: &TypeSymbol) -> bool {
    ty.is_loose() || matches!(ty, TypeSymbol::String | TypeSymbol::Object(_))
}

pub static DECORATORS: &[DecoratorSignature] = &[
    DecoratorSignature {
        name: "allowed",
        argument: Some(ArgKind::Array),
        parameters_only: true,
        applies_to: any_type,
    },
    DecoratorSignature {
        name: "description",
        argument: Some(ArgKind::String),
        parameters_only: false,
        applies_to: any_type,
    },
    DecoratorSignature {
        name: "maxLength",
        argument: Some(ArgKind::Int),
        parameters_only: true,
        applies_to: sized_type,
    },
    DecoratorSignature {
        name: "maxValue",
        argument: Some(ArgKind::Int),
        parameters_only: true,
        applies_to: int_type,
    },
    DecoratorSignature {
        name: "metadata",
        argument: Some(ArgKind::Object),
        parameters_only: true,
        applies_to: any_type,
    },
    DecoratorSignature {
        name: "minLength",
        argument: Some(ArgKind::Int),
        parameters_only: true,
        applies_to: sized_type,
    },
    DecoratorSignature {
        name: "minValue",
        argument: Some(ArgKind::Int),
        parameters_only: true,
        applies_to: int_type,
    },
    DecoratorSignature {
        name: "secure",
        argument: None,
        parameters_only: true,
        applies_to: secure_type,
    },
];

pub fn lookup(name: &str) -> Option<&'static DecoratorSignature> {
    DECORATORS.iter().find(|decorator| decorator.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_targets() {
        let secure = lookup("secure").unwrap();
        assert!(secure.parameters_only);
        assert!((secure.applies_to)(&TypeSymbol::String));
        assert!(!(secure.applies_to)(&TypeSymbol::Int));
        assert!(!lookup("description").unwrap().parameters_only);
        assert!(lookup("Secure").is_none());
    }
}
