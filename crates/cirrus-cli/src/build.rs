//! `cirrus build`.

use crate::BuildArgs;
use anyhow::{Context, Result};
use cirrus_ast::FileUri;
use cirrus_compiler::{CirrusConfig, Compilation};
use cirrus_emit::{EmitStatus, TemplateEmitter};
use cirrus_resolve::StaticCatalog;
use cirrus_workspace::{FileSystemResolver, Workspace};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Result of compiling one input file.
struct FileOutcome {
    status: EmitStatus,
    /// Rendered diagnostics of every file in the graph.
    diagnostics: Vec<String>,
    template: Option<String>,
}

/// Compile every input. Returns `false` if any input failed.
pub fn run(args: &BuildArgs) -> Result<bool> {
    let config = match &args.config {
        Some(path) => CirrusConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CirrusConfig::discover(Path::new("."))
            .context("failed to load ./cirrus.yaml")?,
    };
    let catalog = config
        .load_catalog()
        .context("failed to load resource type catalog")?;
    let emitter = TemplateEmitter::new(config.emit_options());
    let pretty = config.emit.pretty;

    let outcomes: Vec<_> = args
        .files
        .par_iter()
        .map(|path| compile_file(path, &catalog, &emitter, pretty))
        .collect();

    let mut succeeded = true;
    for (path, outcome) in args.files.iter().zip(outcomes) {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}: {:#}", path.display(), e);
                succeeded = false;
                continue;
            }
        };
        for line in &outcome.diagnostics {
            eprintln!("{line}");
        }
        let Some(template) = outcome.template else {
            error!("{}: compilation failed", path.display());
            succeeded = false;
            continue;
        };

        if args.stdout {
            println!("{template}");
        } else {
            let output = output_path(path);
            std::fs::write(&output, format!("{template}\n"))
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(status = ?outcome.status, "wrote {}", output.display());
        }
    }
    Ok(succeeded)
}

/// `dir/main.cirrus` → `dir/main.json`
fn output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

fn compile_file(
    path: &Path,
    catalog: &StaticCatalog,
    emitter: &TemplateEmitter,
    pretty: bool,
) -> Result<FileOutcome> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let uri = FileUri::from_file_path(&absolute)
        .with_context(|| format!("invalid path {}", absolute.display()))?;
    debug!(uri = %uri, "compiling");

    let compilation = Compilation::build(&FileSystemResolver, &Workspace::new(), catalog, &uri)?;
    let emitted = compilation.emit(emitter)?;

    let mut diagnostics = Vec::new();
    for (file, model) in compilation.models() {
        // The entry file's diagnostics come from emission, after promotion.
        let file_diagnostics = if file == compilation.entry() {
            emitted.diagnostics.as_slice()
        } else {
            model.diagnostics()
        };
        let display = file
            .to_file_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| file.to_string());
        for diagnostic in file_diagnostics {
            let (line, column) = model.tree().position_at(diagnostic.span.start);
            diagnostics.push(format!(
                "{}:{}:{}: {}",
                display,
                line + 1,
                column + 1,
                diagnostic
            ));
        }
    }

    let template = match &emitted.template {
        Some(template) if pretty => Some(serde_json::to_string_pretty(template)?),
        Some(template) => Some(serde_json::to_string(template)?),
        None => None,
    };
    Ok(FileOutcome {
        status: emitted.status,
        diagnostics,
        template,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("infra/main.cirrus")),
            PathBuf::from("infra/main.json")
        );
    }
}
