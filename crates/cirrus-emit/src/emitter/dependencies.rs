//! `dependsOn` discovery and deployment ordering.

use super::template::Deployment;
use crate::error::EmitError;
use cirrus_ast::{NodeId, SyntaxKind};
use cirrus_resolve::{SemanticModel, SymbolId, SymbolKind};
use indexmap::IndexSet;
use std::collections::{BTreeSet, HashMap};

/// Resources and modules the declaration `id` depends on, directly or
/// through variables and `existing` resources, in first-mention order.
pub(crate) fn collect_dependencies(model: &SemanticModel, id: SymbolId) -> Vec<SymbolId> {
    let mut out = IndexSet::new();
    let mut visited = IndexSet::new();
    visited.insert(id);
    if let Some(value) = declaration_value(model, model.symbol_by_id(id).declaration) {
        visit(model, value, &mut visited, &mut out);
    }
    out.shift_remove(&id);
    out.into_iter().collect()
}

fn declaration_value(model: &SemanticModel, decl: NodeId) -> Option<NodeId> {
    match model.tree().kind(decl) {
        SyntaxKind::Variable { value, .. }
        | SyntaxKind::Resource { value, .. }
        | SyntaxKind::Module { value, .. } => Some(*value),
        _ => None,
    }
}

fn visit(
    model: &SemanticModel,
    node: NodeId,
    visited: &mut IndexSet<SymbolId>,
    out: &mut IndexSet<SymbolId>,
) {
    let mut referenced = Vec::new();
    model.tree().arena().walk(node, &mut |child, kind| {
        if matches!(kind, SyntaxKind::VariableAccess { .. }) {
            if let Some(symbol) = model.symbol_of(child) {
                referenced.push(symbol.id);
            }
        }
    });

    for id in referenced {
        let symbol = model.symbol_by_id(id);
        let existing = matches!(
            model.tree().kind(symbol.declaration),
            SyntaxKind::Resource {
                existing: Some(_),
                ..
            }
        );
        match symbol.kind {
            SymbolKind::Resource | SymbolKind::Module if !existing => {
                out.insert(id);
            }
            // An existing resource is not deployed; depend on whatever its
            // name depends on instead.
            SymbolKind::Resource | SymbolKind::Variable => {
                if visited.insert(id) {
                    if let Some(value) = declaration_value(model, symbol.declaration) {
                        visit(model, value, visited, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Kahn's algorithm over `deployments`; among ready entries the earliest
/// declared goes first.
pub(crate) fn deployment_order(deployments: &[Deployment]) -> Result<Vec<usize>, EmitError> {
    let index: HashMap<SymbolId, usize> = deployments
        .iter()
        .enumerate()
        .map(|(idx, deployment)| (deployment.symbol, idx))
        .collect();

    let mut in_degree = vec![0usize; deployments.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); deployments.len()];
    for (idx, deployment) in deployments.iter().enumerate() {
        for dep in &deployment.dependencies {
            if let Some(&dep_idx) = index.get(dep) {
                in_degree[idx] += 1;
                dependents[dep_idx].push(idx);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..deployments.len())
        .filter(|idx| in_degree[*idx] == 0)
        .collect();
    let mut order = Vec::with_capacity(deployments.len());
    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for dependent in &dependents[idx] {
            in_degree[*dependent] -= 1;
            if in_degree[*dependent] == 0 {
                ready.insert(*dependent);
            }
        }
    }

    if order.len() != deployments.len() {
        let names = (0..deployments.len())
            .filter(|idx| in_degree[*idx] > 0)
            .map(|idx| deployments[idx].name.clone())
            .collect();
        return Err(EmitError::DependencyCycle { names });
    }
    Ok(order)
}
