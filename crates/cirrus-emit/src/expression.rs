//! Template language expressions.
//!
//! Values that fold to literals are written as plain JSON. Everything else
//! is written as a template expression: a JSON string wrapped in `[` `]`,
//! e.g. `"[parameters('foo')]"`. A literal string that itself starts with
//! `[` is escaped as `[[`.

use cirrus_ast::{BinaryOperator, UnaryOperator};
use serde_json::{Map, Value};
use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum LanguageExpression {
    String(String),
    Int(i64),
    Bool(bool),
    Null,
    Array(Vec<LanguageExpression>),
    /// Properties in source order.
    Object(Vec<(String, LanguageExpression)>),
    Call {
        name: String,
        args: Vec<LanguageExpression>,
    },
    Property {
        base: Box<LanguageExpression>,
        name: String,
    },
    Index {
        base: Box<LanguageExpression>,
        index: Box<LanguageExpression>,
    },
}

use LanguageExpression as E;

impl LanguageExpression {
    pub fn string(value: impl Into<String>) -> Self {
        E::String(value.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<LanguageExpression>) -> Self {
        E::Call {
            name: name.into(),
            args,
        }
    }

    /// `base.name`, folded when `self` is an object literal holding `name`.
    pub fn property(self, name: &str) -> Self {
        if let E::Object(properties) = &self {
            if let Some((_, value)) = properties.iter().find(|(key, _)| key == name) {
                return value.clone();
            }
        }
        E::Property {
            base: Box::new(self),
            name: name.to_string(),
        }
    }

    /// `base[index]`, folded for literal arrays and objects.
    pub fn index(self, index: LanguageExpression) -> Self {
        match (&self, &index) {
            (E::Array(items), E::Int(idx)) => {
                if let Some(item) = usize::try_from(*idx).ok().and_then(|idx| items.get(idx)) {
                    return item.clone();
                }
            }
            (E::Object(_), E::String(key)) => {
                let key = key.clone();
                return self.property(&key);
            }
            _ => {}
        }
        E::Index {
            base: Box::new(self),
            index: Box::new(index),
        }
    }

    /// Literal without calls or accesses.
    pub fn is_constant(&self) -> bool {
        match self {
            E::String(_) | E::Int(_) | E::Bool(_) | E::Null => true,
            E::Array(items) => items.iter().all(E::is_constant),
            E::Object(properties) => properties.iter().all(|(_, value)| value.is_constant()),
            E::Call { .. } | E::Property { .. } | E::Index { .. } => false,
        }
    }

    fn is_scalar(&self) -> bool {
        matches!(self, E::String(_) | E::Int(_) | E::Bool(_) | E::Null)
    }

    /// JSON form. Arrays and objects stay JSON containers so their literal
    /// members remain readable; anything else that is not a literal becomes
    /// a bracketed expression string.
    pub fn to_json(&self) -> Value {
        match self {
            E::String(text) if text.starts_with('[') => Value::String(format!("[{text}")),
            E::String(text) => Value::String(text.clone()),
            E::Int(value) => Value::from(*value),
            E::Bool(value) => Value::Bool(*value),
            E::Null => Value::Null,
            E::Array(items) => Value::Array(items.iter().map(E::to_json).collect()),
            E::Object(properties) => {
                let mut map = Map::new();
                for (key, value) in properties {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
            expression => Value::String(format!("[{expression}]")),
        }
    }

    /// Apply `op`, folding literal operands.
    pub fn binary(op: BinaryOperator, left: Self, right: Self) -> Self {
        if let Some(folded) = fold_binary(op, &left, &right) {
            return folded;
        }
        let name = match op {
            BinaryOperator::Add => "add",
            BinaryOperator::Subtract => "sub",
            BinaryOperator::Multiply => "mul",
            BinaryOperator::Divide => "div",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::LessThan => "less",
            BinaryOperator::LessThanOrEqual => "lessOrEquals",
            BinaryOperator::GreaterThan => "greater",
            BinaryOperator::GreaterThanOrEqual => "greaterOrEquals",
            BinaryOperator::LogicalAnd => "and",
            BinaryOperator::LogicalOr => "or",
            BinaryOperator::Equals => "equals",
            BinaryOperator::NotEquals => {
                return E::call("not", vec![E::call("equals", vec![left, right])]);
            }
            BinaryOperator::EqualsInsensitive => return insensitive_equals(left, right),
            BinaryOperator::NotEqualsInsensitive => {
                return E::call("not", vec![insensitive_equals(left, right)]);
            }
        };
        E::call(name, vec![left, right])
    }

    pub fn unary(op: UnaryOperator, operand: Self) -> Self {
        match (op, operand) {
            (UnaryOperator::Not, E::Bool(value)) => E::Bool(!value),
            (UnaryOperator::Not, operand) => E::call("not", vec![operand]),
            (UnaryOperator::Minus, E::Int(value)) if value != i64::MIN => E::Int(-value),
            (UnaryOperator::Minus, operand) => E::call("sub", vec![E::Int(0), operand]),
        }
    }

    pub fn ternary(condition: Self, true_value: Self, false_value: Self) -> Self {
        match condition {
            E::Bool(true) => true_value,
            E::Bool(false) => false_value,
            condition => E::call("if", vec![condition, true_value, false_value]),
        }
    }

    /// Interpolated string from its literal `segments` and the `values`
    /// between them. Literal values are spliced into the text; the rest
    /// become `format()` arguments.
    pub fn interpolate(segments: &[String], values: Vec<Self>) -> Self {
        let mut text = String::new();
        let mut format = String::new();
        let mut args = Vec::new();
        let mut values = values.into_iter();

        for segment in segments {
            text.push_str(segment);
            push_format_literal(&mut format, segment);
            let Some(value) = values.next() else {
                continue;
            };
            match value {
                E::String(value) => {
                    text.push_str(&value);
                    push_format_literal(&mut format, &value);
                }
                E::Int(value) => {
                    let value = value.to_string();
                    text.push_str(&value);
                    format.push_str(&value);
                }
                value => {
                    let _ = write!(format, "{{{}}}", args.len());
                    args.push(value);
                }
            }
        }

        if args.is_empty() {
            return E::String(text);
        }
        let mut call_args = vec![E::String(format)];
        call_args.extend(args);
        E::call("format", call_args)
    }
}

fn fold_binary(op: BinaryOperator, left: &E, right: &E) -> Option<E> {
    use BinaryOperator::*;
    let folded = match (op, left, right) {
        (Add, E::Int(a), E::Int(b)) => E::Int(a.checked_add(*b)?),
        (Subtract, E::Int(a), E::Int(b)) => E::Int(a.checked_sub(*b)?),
        (Multiply, E::Int(a), E::Int(b)) => E::Int(a.checked_mul(*b)?),
        (Divide, E::Int(a), E::Int(b)) => E::Int(a.checked_div(*b)?),
        (Modulo, E::Int(a), E::Int(b)) => E::Int(a.checked_rem(*b)?),
        (LessThan, E::Int(a), E::Int(b)) => E::Bool(a < b),
        (LessThanOrEqual, E::Int(a), E::Int(b)) => E::Bool(a <= b),
        (GreaterThan, E::Int(a), E::Int(b)) => E::Bool(a > b),
        (GreaterThanOrEqual, E::Int(a), E::Int(b)) => E::Bool(a >= b),
        (LogicalAnd, E::Bool(a), E::Bool(b)) => E::Bool(*a && *b),
        (LogicalOr, E::Bool(a), E::Bool(b)) => E::Bool(*a || *b),
        (Equals, a, b) if a.is_scalar() && b.is_scalar() => E::Bool(a == b),
        (NotEquals, a, b) if a.is_scalar() && b.is_scalar() => E::Bool(a != b),
        (EqualsInsensitive, E::String(a), E::String(b)) => {
            E::Bool(a.to_lowercase() == b.to_lowercase())
        }
        (NotEqualsInsensitive, E::String(a), E::String(b)) => {
            E::Bool(a.to_lowercase() != b.to_lowercase())
        }
        _ => return None,
    };
    Some(folded)
}

fn insensitive_equals(left: E, right: E) -> E {
    E::call(
        "equals",
        vec![E::call("toLower", vec![left]), E::call("toLower", vec![right])],
    )
}

/// `format()` treats braces as placeholders.
fn push_format_literal(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '{' => out.push_str("{{"),
            '}' => out.push_str("}}"),
            ch => out.push(ch),
        }
    }
}

fn is_simple_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[E]) -> fmt::Result {
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// Expression syntax, without the surrounding brackets.
impl fmt::Display for LanguageExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            E::String(text) => write!(f, "'{}'", text.replace('\'', "''")),
            E::Int(value) => write!(f, "{value}"),
            E::Bool(true) => f.write_str("true()"),
            E::Bool(false) => f.write_str("false()"),
            E::Null => f.write_str("null()"),
            E::Array(items) => {
                f.write_str("createArray(")?;
                write_args(f, items)?;
                f.write_str(")")
            }
            E::Object(properties) => {
                f.write_str("createObject(")?;
                for (idx, (key, value)) in properties.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}, {value}", E::String(key.clone()))?;
                }
                f.write_str(")")
            }
            E::Call { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            E::Property { base, name } if is_simple_name(name) => write!(f, "{base}.{name}"),
            E::Property { base, name } => write!(f, "{base}[{}]", E::String(name.clone())),
            E::Index { base, index } => write!(f, "{base}[{index}]"),
        }
    }
}
