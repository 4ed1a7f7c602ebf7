//! Value-dependency cycle detection.
//!
//! A declaration depends on every file-scope value it mentions: variables,
//! parameters, resources and modules (loop locals shadow, outputs are not
//! values). Strongly connected groups of this graph, and declarations that
//! mention themselves, are cycles.

use super::Binder;
use crate::symbols::SymbolId;
use cirrus_ast::{DiagnosticCode, Element, NodeId, SyntaxArena, SyntaxKind};
use std::collections::{HashMap, HashSet, VecDeque};

impl<'a> Binder<'a> {
    pub(super) fn detect_value_cycles(&mut self) {
        let graph = self.dependency_graph();
        let order: Vec<SymbolId> = self.declarations.iter().map(|(_, id)| *id).collect();

        for component in strongly_connected(&order, &graph) {
            let first = component[0];
            let self_loop = graph.get(&first).is_some_and(|deps| deps.contains(&first));
            if component.len() == 1 && !self_loop {
                continue;
            }

            let members: HashSet<SymbolId> = component.iter().copied().collect();
            let chain = shortest_cycle(first, &graph, &members);
            let rendered = chain
                .iter()
                .chain(std::iter::once(&first))
                .map(|id| self.symbol(*id).name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            let name = self.symbol(first).name.clone();
            let span = self.symbol(first).name_span;
            self.error(
                DiagnosticCode::ValueCycle,
                span,
                format!("the value of '{name}' depends on itself: {rendered}"),
            );
            self.in_cycle.extend(members);
        }
    }

    /// Edges from each declaration to the values it mentions.
    fn dependency_graph(&self) -> HashMap<SymbolId, Vec<SymbolId>> {
        let mut graph = HashMap::new();
        for (decl, id) in &self.declarations {
            let mut names = Vec::new();
            for root in value_roots(self.tree.kind(*decl)) {
                collect_references(self.arena(), root, &mut Vec::new(), &mut names);
            }
            let mut deps: Vec<SymbolId> = Vec::new();
            for name in names {
                let Some(target) = self.scope.get(&name).copied() else {
                    continue;
                };
                if self.symbol(target).kind.is_value() && !deps.contains(&target) {
                    deps.push(target);
                }
            }
            graph.insert(*id, deps);
        }
        graph
    }
}

/// Value subtrees of a declaration. Outputs cannot be referenced, so their
/// values never take part in a cycle.
fn value_roots(kind: &SyntaxKind) -> Vec<NodeId> {
    match kind {
        SyntaxKind::Parameter {
            default: Some(default),
            ..
        } => vec![*default],
        SyntaxKind::Variable { value, .. }
        | SyntaxKind::Resource { value, .. }
        | SyntaxKind::Module { value, .. } => vec![*value],
        _ => Vec::new(),
    }
}

/// Names of file-scope symbols mentioned under `node`, in source order.
fn collect_references(
    arena: &SyntaxArena,
    node: NodeId,
    locals: &mut Vec<String>,
    out: &mut Vec<String>,
) {
    match arena.kind(node) {
        SyntaxKind::VariableAccess { name } => {
            if let Some(name) = arena.identifier_name(*name) {
                if !locals.iter().any(|local| local == name) {
                    out.push(name.to_string());
                }
            }
        }
        SyntaxKind::ForExpression {
            variables,
            source,
            body,
            ..
        } => {
            collect_references(arena, *source, locals, out);
            let depth = locals.len();
            arena.walk(*variables, &mut |_, kind| {
                if let SyntaxKind::LoopVariable { name, .. } = kind {
                    locals.push(name.clone());
                }
            });
            collect_references(arena, *body, locals, out);
            locals.truncate(depth);
        }
        kind => {
            for child in kind.children() {
                if let Element::Node(child) = child {
                    collect_references(arena, child, locals, out);
                }
            }
        }
    }
}

/// Tarjan's algorithm. Components come out in order of their first member
/// in `order`; members are sorted the same way.
fn strongly_connected(
    order: &[SymbolId],
    graph: &HashMap<SymbolId, Vec<SymbolId>>,
) -> Vec<Vec<SymbolId>> {
    struct State<'g> {
        graph: &'g HashMap<SymbolId, Vec<SymbolId>>,
        index: HashMap<SymbolId, usize>,
        low: HashMap<SymbolId, usize>,
        stack: Vec<SymbolId>,
        on_stack: HashSet<SymbolId>,
        next: usize,
        components: Vec<Vec<SymbolId>>,
    }

    fn visit(state: &mut State<'_>, node: SymbolId) {
        state.index.insert(node, state.next);
        state.low.insert(node, state.next);
        state.next += 1;
        state.stack.push(node);
        state.on_stack.insert(node);

        let deps = state.graph.get(&node).cloned().unwrap_or_default();
        for dep in deps {
            if !state.index.contains_key(&dep) {
                visit(state, dep);
                let low = state.low[&node].min(state.low[&dep]);
                state.low.insert(node, low);
            } else if state.on_stack.contains(&dep) {
                let low = state.low[&node].min(state.index[&dep]);
                state.low.insert(node, low);
            }
        }

        if state.low[&node] == state.index[&node] {
            let mut component = Vec::new();
            while let Some(member) = state.stack.pop() {
                state.on_stack.remove(&member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            state.components.push(component);
        }
    }

    let mut state = State {
        graph,
        index: HashMap::new(),
        low: HashMap::new(),
        stack: Vec::new(),
        on_stack: HashSet::new(),
        next: 0,
        components: Vec::new(),
    };
    for node in order {
        if !state.index.contains_key(node) {
            visit(&mut state, *node);
        }
    }

    let position: HashMap<SymbolId, usize> =
        order.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
    let rank = |id: &SymbolId| position.get(id).copied().unwrap_or(usize::MAX);
    let mut components = state.components;
    for component in &mut components {
        component.sort_by_key(rank);
    }
    components.sort_by_key(|component| rank(&component[0]));
    components
}

/// Shortest path from `start` back to itself inside `members`, excluding
/// the final return to `start`.
fn shortest_cycle(
    start: SymbolId,
    graph: &HashMap<SymbolId, Vec<SymbolId>>,
    members: &HashSet<SymbolId>,
) -> Vec<SymbolId> {
    let mut previous: HashMap<SymbolId, SymbolId> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for dep in graph.get(&node).into_iter().flatten() {
            if *dep == start {
                let mut chain = vec![node];
                let mut current = node;
                while let Some(prev) = previous.get(&current) {
                    chain.push(*prev);
                    current = *prev;
                }
                chain.reverse();
                return chain;
            }
            if members.contains(dep) && !previous.contains_key(dep) && *dep != start {
                previous.insert(*dep, node);
                queue.push_back(*dep);
            }
        }
    }
    vec![start]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(list: &[(u32, &[u32])]) -> HashMap<SymbolId, Vec<SymbolId>> {
        list.iter()
            .map(|(from, to)| (SymbolId(*from), to.iter().map(|id| SymbolId(*id)).collect()))
            .collect()
    }

    #[test]
    fn test_components_in_declaration_order() {
        let graph = edges(&[(0, &[1]), (1, &[0]), (2, &[]), (3, &[3])]);
        let order: Vec<_> = (0..4).map(SymbolId).collect();
        let components = strongly_connected(&order, &graph);
        assert_eq!(
            components,
            vec![
                vec![SymbolId(0), SymbolId(1)],
                vec![SymbolId(2)],
                vec![SymbolId(3)],
            ]
        );
    }

    #[test]
    fn test_shortest_cycle() {
        // 0 -> 1 -> 2 -> 0 and 0 -> 2
        let graph = edges(&[(0, &[1, 2]), (1, &[2]), (2, &[0])]);
        let members: HashSet<_> = (0..3).map(SymbolId).collect();
        assert_eq!(
            shortest_cycle(SymbolId(0), &graph, &members),
            vec![SymbolId(0), SymbolId(2)]
        );
    }

    #[test]
    fn test_self_loop() {
        let graph = edges(&[(0, &[0])]);
        let members: HashSet<_> = [SymbolId(0)].into_iter().collect();
        assert_eq!(shortest_cycle(SymbolId(0), &graph, &members), vec![SymbolId(0)]);
    }
}
