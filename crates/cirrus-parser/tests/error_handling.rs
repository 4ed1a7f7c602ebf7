//! Error handling tests for the Cirrus parser.
//!
//! This suite verifies that the parser:
//! - Never fails and never loses a byte of input (totality, losslessness)
//! - Reports errors at the right location with stable codes
//! - Recovers at line and container boundaries so later declarations parse
//! - Reports only the first failure within one declaration

use cirrus_ast::{DiagnosticCode, FileUri, SyntaxKind, TextSpan};
use cirrus_parser::SourceTree;

fn parse(source: &str) -> SourceTree {
    let uri = FileUri::parse("inmemory:///main.cirrus").unwrap();
    SourceTree::parse(uri, source)
}

fn codes(tree: &SourceTree) -> Vec<DiagnosticCode> {
    tree.diagnostics().iter().map(|d| d.code).collect()
}

/// Names of the declarations that parsed with a name.
fn names(tree: &SourceTree) -> Vec<String> {
    tree.declarations()
        .into_iter()
        .filter_map(|decl| {
            let name = tree.kind(decl).declaration_name()?;
            tree.arena().identifier_name(name).map(str::to_string)
        })
        .collect()
}

// =============================================================================
// Totality
// =============================================================================

#[test]
fn test_every_input_round_trips() {
    let sources = [
        "",
        "\n",
        "\r\n\r\n",
        "param",
        "param a",
        "var a =",
        "resource r 'A/b@1' = {",
        "resource r 'A/b@1' = { name: 'x'\n  props: {\n",
        "module m './m.cirrus' = [for",
        "output o string = a ? b",
        "var x = ((((",
        "var x = ]]]))}}}",
        "@description('d')",
        "@@@@",
        "var s = 'a${b'",
        "var s = 'a${",
        "var a = [\n1\n2,3\n",
        "}\n{\n)\n(",
        "var a = f(1,,2)",
        "var a = x.",
        "var a = x[",
        "param p string = 99999999999999999999",
        "\u{1F600} var",
        "var a = '''unterminated",
        "/* open comment",
        "resource r 'A/b@1' existing = if (true) { name: 'n' }",
        "var a = [for (i, j) in range(0, 3): {\n  v: i\n}]",
    ];
    for source in sources {
        let tree = parse(source);
        assert_eq!(tree.reconstruct(), source, "round trip for {source:?}");
        assert!(matches!(tree.kind(tree.root()), SyntaxKind::Program { .. }));
        assert_eq!(tree.span(tree.root()).end as usize, source.len());
    }
}

#[test]
fn test_truncated_prefixes_round_trip() {
    let source = "@description('the name')\nparam name string = 'x${y}z'\nvar list = [for (item, i) in items: {\n  n: item.name\n  i: i * 2\n}]\nresource r 'A.B/c@2020-01-01' = if (!empty(name)) {\n  name: name\n  properties: { v: list[0] }\n}\noutput o int = length(list)\n";
    for end in 0..=source.len() {
        if !source.is_char_boundary(end) {
            continue;
        }
        let prefix = &source[..end];
        assert_eq!(parse(prefix).reconstruct(), prefix, "prefix of length {end}");
    }
}

#[test]
fn test_valid_file_has_no_diagnostics() {
    let tree = parse(
        "// header\n@secure()\n@description('admin password')\nparam pwd string\n\nparam count int = 2\nvar names = [for i in range(0, count): 'vm-${i}']\nresource vms 'Microsoft.Compute/virtualMachines@2020-06-01' = [for name in names: {\n  name: name\n  location: resourceGroup().location\n  properties: {\n    enabled: true, size: null\n  }\n}]\nmodule store './storage.cirrus' = {\n  name: 'store'\n  params: {\n    prefix: names[0]\n  }\n}\noutput ids array = [for (n, i) in names: {\n  index: i\n}]\n",
    );
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(names(&tree), vec!["pwd", "count", "names", "vms", "store", "ids"]);
}

// =============================================================================
// Locality and recovery
// =============================================================================

#[test]
fn test_error_is_local_to_its_line() {
    let tree = parse("var a = 1 +\nvar b = 2\nvar c = * 3\nvar d = 4\n");
    assert_eq!(
        codes(&tree),
        vec![DiagnosticCode::UnexpectedToken, DiagnosticCode::UnexpectedToken]
    );
    assert_eq!(names(&tree), vec!["a", "b", "c", "d"]);
    // The first error points at the line break after `+`.
    assert_eq!(tree.diagnostics()[0].span, TextSpan::new(11, 12));
}

#[test]
fn test_only_first_failure_per_declaration() {
    let tree = parse("var = = =\nresource r = {\n  a: 1 +\n  b: * 2\n}\n");
    assert_eq!(tree.diagnostics().len(), 2, "{:?}", tree.diagnostics());
    assert_eq!(names(&tree), vec!["r"]);
}

#[test]
fn test_bad_property_keeps_siblings() {
    let tree = parse("resource r 'A/b@1' = {\n  a: 1 +\n  b: 2\n}\n");
    assert_eq!(tree.diagnostics().len(), 1);
    let decl = tree.declarations()[0];
    let SyntaxKind::Resource { value, .. } = tree.kind(decl) else {
        panic!("expected resource");
    };
    let properties: Vec<_> = tree
        .arena()
        .child_nodes(*value)
        .into_iter()
        .filter(|n| matches!(tree.kind(*n), SyntaxKind::ObjectProperty { .. }))
        .collect();
    assert_eq!(properties.len(), 2);
}

#[test]
fn test_garbage_line_expects_declaration() {
    let tree = parse("hello world\nvar a = 1\n");
    assert_eq!(codes(&tree), vec![DiagnosticCode::ExpectedDeclaration]);
    assert_eq!(names(&tree), vec!["a"]);
}

#[test]
fn test_trailing_tokens_expect_new_line() {
    let tree = parse("var a = 1 2\n");
    assert_eq!(codes(&tree), vec![DiagnosticCode::ExpectedNewLine]);
}

#[test]
fn test_unterminated_object_stops_at_next_declaration() {
    let tree = parse("resource r 'A/b@1' = {\n  name: 'x'\nvar after = 1\n");
    assert_eq!(codes(&tree), vec![DiagnosticCode::UnterminatedContainer]);
    assert_eq!(names(&tree), vec!["r", "after"]);
}

#[test]
fn test_unterminated_call_at_eof() {
    let tree = parse("var a = f(1, 2");
    assert_eq!(codes(&tree), vec![DiagnosticCode::UnterminatedContainer]);
}

#[test]
fn test_missing_assignment_keeps_value() {
    let tree = parse("var a 1\n");
    assert_eq!(codes(&tree), vec![DiagnosticCode::UnexpectedToken]);
    let decl = tree.declarations()[0];
    let SyntaxKind::Variable { value, .. } = tree.kind(decl) else {
        panic!("expected variable");
    };
    assert!(matches!(
        tree.kind(*value),
        SyntaxKind::IntegerLiteral { value: 1, .. }
    ));
}

#[test]
fn test_dangling_decorator() {
    let tree = parse("@description('x')\n\nvar a = 1\n@secure()\n");
    assert_eq!(names(&tree), vec!["a"]);
    assert_eq!(codes(&tree), vec![DiagnosticCode::ExpectedDeclaration]);
}

#[test]
fn test_lexical_and_syntax_diagnostics_are_merged_and_sorted() {
    let tree = parse("var a = 'open\nvar b = ~\n");
    let codes = codes(&tree);
    assert_eq!(codes[0], DiagnosticCode::UnterminatedString);
    assert!(codes.contains(&DiagnosticCode::UnrecognizedCharacter));
    let spans: Vec<_> = tree.diagnostics().iter().map(|d| d.span).collect();
    let mut sorted = spans.clone();
    sorted.sort();
    assert_eq!(spans, sorted);
}

#[test]
fn test_integer_out_of_range() {
    let tree = parse("var a = 99999999999999999999\n");
    assert_eq!(codes(&tree), vec![DiagnosticCode::IntegerOutOfRange]);
}

#[test]
fn test_invalid_escape() {
    let tree = parse("var a = 'x\\qy'\n");
    assert_eq!(codes(&tree), vec![DiagnosticCode::InvalidEscape]);
    assert_eq!(tree.diagnostics()[0].span, TextSpan::new(10, 12));
}

// =============================================================================
// Nesting depth
// =============================================================================

#[test]
fn test_deep_parentheses_are_rejected_not_overflowed() {
    let source = format!("var x = {}1\nvar y = 2\n", "(".repeat(50_000));
    let tree = parse(&source);
    assert_eq!(tree.reconstruct(), source);
    assert_eq!(codes(&tree), vec![DiagnosticCode::UnexpectedToken]);
    assert!(tree.diagnostics()[0].message.contains("nested"));
    assert_eq!(names(&tree), vec!["x", "y"]);
}

#[test]
fn test_deep_operator_chains_are_rejected() {
    let sources = [
        format!("var x = {}1\n", "!".repeat(50_000)),
        format!("var x = {}0\n", "true ? 1 : ".repeat(50_000)),
        format!("var x = {}\n", "[".repeat(50_000)),
        format!("var x = {}\n", "{ a: ".repeat(50_000)),
        format!("var x = 1{}\n", " + 1".repeat(50_000)),
        format!("var x = a{}\n", ".b".repeat(50_000)),
        format!("var x = a{}\n", "[0]".repeat(50_000)),
    ];
    for source in &sources {
        let tree = parse(source);
        assert_eq!(tree.reconstruct(), *source);
        assert!(
            tree.diagnostics()
                .iter()
                .any(|d| d.code == DiagnosticCode::UnexpectedToken && d.message.contains("nested")),
            "{:?}",
            &tree.diagnostics()[..tree.diagnostics().len().min(3)]
        );
    }
}

#[test]
fn test_moderate_nesting_is_accepted() {
    let source = format!(
        "var x = {}1{}\nvar y = [[[[[[[[[[1]]]]]]]]]]\nvar z = 1{}\nvar w = a{}\n",
        "(".repeat(40),
        ")".repeat(40),
        " + 1".repeat(60),
        ".b".repeat(60)
    );
    let tree = parse(&source);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(names(&tree), vec!["x", "y", "z", "w"]);
}
