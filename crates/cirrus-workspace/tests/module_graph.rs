//! Module graph construction: discovery, cycles and missing files.

use cirrus_ast::{DiagnosticCode, FileUri};
use cirrus_workspace::{
    FileSystemResolver, GraphError, InMemoryFileResolver, ModuleFailure, ModuleGraph,
    ModuleGraphBuilder, Workspace,
};

fn uri(name: &str) -> FileUri {
    FileUri::parse(&format!("inmemory:///{name}")).unwrap()
}

fn build(files: &[(&str, &str)], entry: &str) -> ModuleGraph {
    let resolver =
        InMemoryFileResolver::with_files(files.iter().map(|(name, text)| (uri(name), *text)));
    ModuleGraphBuilder::build(&resolver, &Workspace::new(), &uri(entry)).unwrap()
}

fn module_decl(graph: &ModuleGraph, file: &str, index: usize) -> cirrus_ast::NodeId {
    graph.tree(&uri(file)).unwrap().module_references()[index].declaration
}

#[test]
fn test_discovers_files_depth_first() {
    let graph = build(
        &[
            ("main.cirrus", "module a './a.cirrus' = {}\nmodule b './b.cirrus' = {}\n"),
            ("a.cirrus", "module c './c.cirrus' = {}\n"),
            ("b.cirrus", "module c './c.cirrus' = {}\n"),
            ("c.cirrus", "var x = 1\n"),
        ],
        "main.cirrus",
    );

    let files: Vec<_> = graph.trees().map(|(uri, _)| uri.file_name().to_string()).collect();
    assert_eq!(files, vec!["main.cirrus", "a.cirrus", "c.cirrus", "b.cirrus"]);
    assert_eq!(graph.references(&uri("b.cirrus")).len(), 1);
    assert_eq!(graph.failures().count(), 0);

    let order: Vec<_> = graph
        .dependency_order()
        .iter()
        .map(|uri| uri.file_name().to_string())
        .collect();
    assert_eq!(order, vec!["c.cirrus", "a.cirrus", "b.cirrus", "main.cirrus"]);
}

#[test]
fn test_cycle_reported_on_every_participant() {
    let graph = build(
        &[
            ("a.cirrus", "module b './b.cirrus' = {}\n"),
            ("b.cirrus", "module c './c.cirrus' = {}\n"),
            ("c.cirrus", "module a './a.cirrus' = {}\n"),
        ],
        "a.cirrus",
    );

    let chain = vec![uri("a.cirrus"), uri("b.cirrus"), uri("c.cirrus")];
    for file in ["a.cirrus", "b.cirrus", "c.cirrus"] {
        let decl = module_decl(&graph, file, 0);
        assert_eq!(
            graph.failure(&uri(file), decl),
            Some(&ModuleFailure::Cycle {
                chain: chain.clone()
            }),
            "{file}"
        );
        assert_eq!(graph.module_target(&uri(file), decl), None);

        let diagnostics = graph.diagnostics(&uri(file));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ModuleCycle);
    }

    // The closing edge is never added.
    assert!(graph.references(&uri("c.cirrus")).is_empty());
    assert_eq!(graph.dependency_order().len(), 3);
}

#[test]
fn test_acyclic_variant_has_no_failures() {
    let graph = build(
        &[
            ("a.cirrus", "module b './b.cirrus' = {}\n"),
            ("b.cirrus", "module c './c.cirrus' = {}\n"),
            ("c.cirrus", "var leaf = true\n"),
        ],
        "a.cirrus",
    );
    assert_eq!(graph.failures().count(), 0);
    let decl = module_decl(&graph, "a.cirrus", 0);
    assert_eq!(graph.module_target(&uri("a.cirrus"), decl), Some(&uri("b.cirrus")));
}

#[test]
fn test_self_reference_is_a_cycle() {
    let graph = build(&[("a.cirrus", "module me './a.cirrus' = {}\n")], "a.cirrus");
    let decl = module_decl(&graph, "a.cirrus", 0);
    assert_eq!(
        graph.failure(&uri("a.cirrus"), decl),
        Some(&ModuleFailure::Cycle {
            chain: vec![uri("a.cirrus")]
        })
    );
}

#[test]
fn test_missing_module_only_affects_its_declaration() {
    let graph = build(
        &[
            (
                "main.cirrus",
                "module gone './gone.cirrus' = {}\nmodule ok './ok.cirrus' = {}\n",
            ),
            ("ok.cirrus", "var x = 1\n"),
        ],
        "main.cirrus",
    );

    let main = uri("main.cirrus");
    let gone = module_decl(&graph, "main.cirrus", 0);
    let ok = module_decl(&graph, "main.cirrus", 1);
    assert!(matches!(
        graph.failure(&main, gone),
        Some(ModuleFailure::NotFound { uri: missing, .. }) if *missing == uri("gone.cirrus")
    ));
    assert_eq!(graph.module_target(&main, ok), Some(&uri("ok.cirrus")));
    assert!(graph.mentions(&uri("gone.cirrus")));
    assert!(!graph.contains(&uri("gone.cirrus")));

    let diagnostics = graph.diagnostics(&main);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::ModuleNotFound);
    // Reported on the path literal.
    let tree = graph.tree(&main).unwrap();
    assert_eq!(diagnostics[0].span.slice(tree.text()), "'./gone.cirrus'");
}

#[test]
fn test_invalid_and_interpolated_paths() {
    let graph = build(
        &[(
            "main.cirrus",
            "param p string\nmodule a '/abs.cirrus' = {}\nmodule b '${p}.cirrus' = {}\n",
        )],
        "main.cirrus",
    );
    let codes: Vec<_> = graph
        .diagnostics(&uri("main.cirrus"))
        .into_iter()
        .map(|diag| diag.code)
        .collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::InvalidModulePath, DiagnosticCode::InvalidModulePath]
    );
}

#[test]
fn test_workspace_text_wins_over_resolver() {
    let resolver = InMemoryFileResolver::with_files([
        (uri("main.cirrus"), "module m './m.cirrus' = {}\n"),
        (uri("m.cirrus"), "var stale = 1\n"),
    ]);
    let mut workspace = Workspace::new();
    workspace.upsert_text(uri("m.cirrus"), "var fresh = 1\n");

    let graph = ModuleGraphBuilder::build(&resolver, &workspace, &uri("main.cirrus")).unwrap();
    assert_eq!(graph.tree(&uri("m.cirrus")).unwrap().text(), "var fresh = 1\n");
}

#[test]
fn test_missing_entry_is_an_error() {
    let resolver = InMemoryFileResolver::new();
    let result = ModuleGraphBuilder::build(&resolver, &Workspace::new(), &uri("main.cirrus"));
    assert!(matches!(result, Err(GraphError::EntryNotFound { .. })));
}

#[test]
fn test_file_system_modules() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("mods")).unwrap();
    std::fs::write(
        dir.path().join("main.cirrus"),
        "module s 'mods/storage.cirrus' = {}\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("mods/storage.cirrus"), "param name string\n").unwrap();

    let entry = FileUri::from_file_path(&dir.path().join("main.cirrus")).unwrap();
    let graph = ModuleGraphBuilder::build(&FileSystemResolver, &Workspace::new(), &entry).unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.dependency_order().last(), Some(&entry));
}
