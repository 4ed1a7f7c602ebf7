//! Semantic model to deployment template.

mod dependencies;
mod lower;
mod template;

use crate::error::EmitError;
use cirrus_ast::{Diagnostic, DiagnosticLevel, SyntaxKind};
use cirrus_resolve::SemanticModel;
use serde_json::Value;
use tracing::{debug, instrument};

pub use template::TEMPLATE_SCHEMA;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// `contentVersion` of emitted templates.
    pub content_version: String,
    /// Treat warnings as errors when deciding the status.
    pub warnings_as_errors: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            content_version: "1.0.0.0".to_string(),
            warnings_as_errors: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    Succeeded,
    SucceededWithWarnings,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitResult {
    pub status: EmitStatus,
    /// Diagnostics of the emitted file, after warning promotion.
    pub diagnostics: Vec<Diagnostic>,
    /// Present unless the status is `Failed`.
    pub template: Option<Value>,
}

impl EmitResult {
    pub fn is_success(&self) -> bool {
        self.status != EmitStatus::Failed
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateEmitter {
    options: EmitOptions,
}

impl TemplateEmitter {
    pub fn new(options: EmitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Emit the template for `model`.
    ///
    /// Any error diagnostic in the model, or in a module it deploys, fails
    /// emission without producing a template. `Err` is reserved for
    /// internal invariant violations.
    #[instrument(skip_all, fields(uri = %model.uri()))]
    pub fn emit(&self, model: &SemanticModel) -> Result<EmitResult, EmitError> {
        let mut diagnostics = model.diagnostics().to_vec();
        if self.options.warnings_as_errors {
            for diagnostic in &mut diagnostics {
                if diagnostic.level == DiagnosticLevel::Warning {
                    diagnostic.level = DiagnosticLevel::Error;
                }
            }
        }

        let has_errors = diagnostics.iter().any(Diagnostic::is_error);
        if has_errors || modules_have_errors(model) {
            debug!(diagnostics = diagnostics.len(), "emission skipped");
            return Ok(EmitResult {
                status: EmitStatus::Failed,
                diagnostics,
                template: None,
            });
        }

        let template = template::build_template(model, &self.options)?;
        let status = if diagnostics
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Warning)
        {
            EmitStatus::SucceededWithWarnings
        } else {
            EmitStatus::Succeeded
        };
        debug!(
            resources = template["resources"].as_array().map_or(0, Vec::len),
            ?status,
            "emitted template"
        );
        Ok(EmitResult {
            status,
            diagnostics,
            template: Some(template),
        })
    }
}

/// Whether any module deployed by `model`, at any depth, has errors.
fn modules_have_errors(model: &SemanticModel) -> bool {
    let tree = model.tree();
    tree.declarations().into_iter().any(|decl| {
        if !matches!(tree.kind(decl), SyntaxKind::Module { .. }) {
            return false;
        }
        match model.module_model(decl) {
            Some(target) => target.has_errors() || modules_have_errors(target),
            // Unresolved modules already carry an error on `model`.
            None => false,
        }
    })
}
