// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Template emission for Cirrus.
//!
//! [`TemplateEmitter`] lowers an error-free [`SemanticModel`] to a JSON
//! deployment template:
//!
//! - literal arithmetic, comparisons, logic and string interpolation are
//!   folded;
//! - variables are inlined at every use and the `variables` map stays
//!   empty;
//! - for-expressions become resource, property and output `copy` loops;
//! - references between resources and modules become `dependsOn`, and
//!   resources are listed dependencies first, ties in declaration order;
//! - modules become nested deployments carrying their own template.
//!
//! [`SemanticModel`]: cirrus_resolve::SemanticModel

mod emitter;
mod error;
pub mod expression;

pub use emitter::{EmitOptions, EmitResult, EmitStatus, TemplateEmitter, TEMPLATE_SCHEMA};
pub use error::EmitError;
pub use expression::LanguageExpression;
