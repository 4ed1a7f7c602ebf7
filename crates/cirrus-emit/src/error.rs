use cirrus_ast::TextSpan;
use thiserror::Error;

/// Internal invariant violation while lowering an error-free model.
///
/// User mistakes are diagnostics and stop emission before lowering starts,
/// so any of these is a compiler defect.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("unexpected syntax at {span:?} in an error-free model")]
    UnexpectedSyntax { span: TextSpan },

    #[error("'{name}' has no binding in the semantic model")]
    Unbound { name: String },

    #[error("variable '{name}' is inlined into its own value")]
    RecursiveVariable { name: String },

    #[error("module '{name}' has no bound target model")]
    MissingModuleModel { name: String },

    #[error("module '{name}' parameters do not lower to an object literal")]
    DynamicModuleParameters { name: String },

    #[error("module '{name}' does not supply required parameters: {}", params.join(", "))]
    MissingModuleParameters { name: String, params: Vec<String> },

    #[error("resource dependencies form a cycle: {}", names.join(", "))]
    DependencyCycle { names: Vec<String> },
}
