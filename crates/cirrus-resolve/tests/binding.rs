//! Binder and type checker behaviour over whole files.

use cirrus_ast::{DiagnosticCode, DiagnosticLevel, FileUri, SyntaxKind, TextSpan};
use cirrus_resolve::{
    bind, PropertySchema, ResourceSchema, SchemaKind, SemanticModel, StaticCatalog, SymbolKind,
    TypeSymbol,
};
use cirrus_workspace::{InMemoryFileResolver, ModuleGraphBuilder, Workspace};
use std::sync::Arc;

fn uri(name: &str) -> FileUri {
    FileUri::parse(&format!("inmemory:///{name}")).unwrap()
}

fn storage_catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_type(
            "Microsoft.Storage/storageAccounts@2019-06-01",
            ResourceSchema::new()
                .strict()
                .with_property("location", PropertySchema::new(SchemaKind::String).required())
                .with_property("kind", PropertySchema::new(SchemaKind::String))
                .with_property(
                    "sku",
                    PropertySchema::new(SchemaKind::Object)
                        .strict()
                        .with_property("name", PropertySchema::new(SchemaKind::String).required()),
                )
                .with_property("properties", PropertySchema::new(SchemaKind::Object)),
        )
        .unwrap()
}

fn bind_files(files: &[(&str, &str)], catalog: &StaticCatalog) -> Arc<SemanticModel> {
    let resolver =
        InMemoryFileResolver::with_files(files.iter().map(|(name, text)| (uri(name), *text)));
    let entry = uri(files[0].0);
    let graph = ModuleGraphBuilder::build(&resolver, &Workspace::new(), &entry).unwrap();
    bind(&graph, catalog).entry
}

fn model(text: &str) -> Arc<SemanticModel> {
    bind_files(&[("main.cirrus", text)], &storage_catalog())
}

fn codes(model: &SemanticModel) -> Vec<DiagnosticCode> {
    model.diagnostics().iter().map(|diag| diag.code).collect()
}

fn value_type(model: &SemanticModel, name: &str) -> TypeSymbol {
    let decl = model.symbol(name).unwrap().declaration;
    let value = match model.tree().kind(decl) {
        SyntaxKind::Variable { value, .. } | SyntaxKind::Output { value, .. } => *value,
        other => panic!("not a value declaration: {other:?}"),
    };
    model.type_of(value).cloned().unwrap()
}

#[test]
fn test_type_error_is_isolated() {
    let model = crate::model("var x = 1 + 'a'\nvar y = 2 + 2\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::TypeMismatch]);
    assert_eq!(model.diagnostics()[0].span, TextSpan::new(8, 15));
    assert_eq!(model.symbol("x").unwrap().ty, TypeSymbol::Error);
    assert_eq!(model.symbol("y").unwrap().ty, TypeSymbol::Int);
    assert_eq!(value_type(&model, "y"), TypeSymbol::Int);
}

#[test]
fn test_undefined_symbol() {
    let model = crate::model("var a = b\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UndefinedSymbol]);
    assert_eq!(model.diagnostics()[0].span, TextSpan::new(8, 9));
    assert!(model.has_errors());
}

#[test]
fn test_error_operand_does_not_cascade() {
    let model = crate::model("var a = b + 1\nvar c = a * 2\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UndefinedSymbol]);
}

#[test]
fn test_declaration_order_does_not_matter() {
    let model = crate::model("var a = b\nvar b = 'x'\n");
    assert!(codes(&model).is_empty());
    assert_eq!(model.symbol("a").unwrap().ty, TypeSymbol::String);
}

#[test]
fn test_duplicates_reported_on_every_declaration() {
    let model = crate::model("var a = 1\nvar a = 2\nvar b = a\n");
    assert_eq!(
        codes(&model),
        vec![DiagnosticCode::DuplicateSymbol, DiagnosticCode::DuplicateSymbol]
    );
}

#[test]
fn test_value_cycle_reported_once() {
    let model = crate::model("var a = b\nvar b = a\nvar c = a\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::ValueCycle]);
    assert!(model.diagnostics()[0].message.ends_with("a -> b -> a"));
    assert_eq!(model.symbol("a").unwrap().ty, TypeSymbol::Error);
    assert_eq!(model.symbol("b").unwrap().ty, TypeSymbol::Error);
}

#[test]
fn test_self_reference_cycle() {
    let model = crate::model("var a = a\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::ValueCycle]);
    assert!(model.diagnostics()[0].message.ends_with("a -> a"));
}

#[test]
fn test_loop_locals_are_scoped() {
    let model = crate::model(
        "var x = 'outer'\noutput o array = [for (x, i) in range(0, 3): x + i]\noutput p string = x\n",
    );
    assert!(codes(&model).is_empty(), "{:?}", model.diagnostics());
    assert_eq!(value_type(&model, "o"), TypeSymbol::array(TypeSymbol::Int));

    let locals: Vec<_> = model.symbols_of_kind(SymbolKind::LoopLocal).collect();
    assert_eq!(locals.len(), 2);
    assert_eq!(locals[0].ty, TypeSymbol::Int);
}

#[test]
fn test_for_expression_positions() {
    let model = crate::model("var v = [for i in range(0, 2): i]\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::ForExpressionNotAllowed]);

    let model = crate::model("output o array = [for s in 'abc': s]\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidLoopSource]);
}

#[test]
fn test_resource_loop_is_a_collection() {
    let model = crate::model(
        "param names array\nresource r 'Test.Rp/things@2020-01-01' = [for (n, i) in names: {\n  name: '${n}-${i}'\n}]\noutput first string = r[0].id\n",
    );
    assert_eq!(codes(&model), vec![DiagnosticCode::UnknownResourceType]);
    assert_eq!(model.diagnostics()[0].level, DiagnosticLevel::Warning);
    assert!(matches!(
        &model.symbol("r").unwrap().ty,
        TypeSymbol::Array(element) if matches!(**element, TypeSymbol::Resource(_))
    ));
}

#[test]
fn test_resource_body_against_schema() {
    let model = crate::model(
        "resource sa 'Microsoft.Storage/storageAccounts@2019-06-01' = {\n  name: 'store'\n  id: 'x'\n  kind: 1\n  color: 'red'\n}\n",
    );
    assert_eq!(
        codes(&model),
        vec![
            DiagnosticCode::MissingRequiredProperty,
            DiagnosticCode::ReadOnlyProperty,
            DiagnosticCode::TypeMismatch,
            DiagnosticCode::UnknownProperty,
        ]
    );
    assert!(model.diagnostics()[0].message.contains("'location'"));
}

#[test]
fn test_nested_schema_and_property_loop() {
    let model = crate::model(
        "param count int\nresource sa 'Microsoft.Storage/storageAccounts@2019-06-01' = {\n  name: 'store'\n  location: resourceGroup().location\n  sku: {\n    tier: 'x'\n  }\n  properties: {\n    rules: [for i in range(0, count): {\n      index: i\n    }]\n  }\n}\noutput id string = sa.id\n",
    );
    // `sku` is strict: `tier` is unknown and `name` is missing.
    assert_eq!(
        codes(&model),
        vec![
            DiagnosticCode::MissingRequiredProperty,
            DiagnosticCode::UnknownProperty,
        ]
    );
}

#[test]
fn test_property_loop_needs_a_nested_object() {
    let model = crate::model(
        "resource r 'Test.Rp/things@2020-01-01' = {\n  name: 'x'\n  tags: [for i in range(0, 2): i]\n  properties: {\n    items: [for i in range(0, 2): i]\n  }\n}\n",
    );
    assert_eq!(
        codes(&model),
        vec![
            DiagnosticCode::UnknownResourceType,
            DiagnosticCode::ForExpressionNotAllowed,
        ]
    );
}

#[test]
fn test_collection_must_be_indexed() {
    let model = crate::model(
        "resource r 'Test.Rp/things@2020-01-01' = [for i in range(0, 2): {\n  name: 'x${i}'\n}]\noutput all array = r\noutput one string = r[1].name\n",
    );
    assert_eq!(
        codes(&model),
        vec![
            DiagnosticCode::UnknownResourceType,
            DiagnosticCode::CollectionNotIndexed,
        ]
    );
}

#[test]
fn test_invalid_and_unknown_resource_types() {
    let model = crate::model("resource r 'nope' = {\n  name: 'x'\n}\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidResourceType]);

    let model = crate::model("param p string\nresource r 'A.B/${p}@1' = {\n  name: 'x'\n}\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::StringLiteralRequired]);
}

#[test]
fn test_conditional_resource() {
    let model = crate::model("param deploy bool\nresource r 'A.B/c@1' = if (deploy) {\n  name: 'x'\n}\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UnknownResourceType]);

    let model = crate::model("resource r 'A.B/c@1' = if ('yes') {\n  name: 'x'\n}\n");
    assert_eq!(
        codes(&model),
        vec![DiagnosticCode::UnknownResourceType, DiagnosticCode::TypeMismatch]
    );
}

#[test]
fn test_function_checks() {
    let model = crate::model("var a = foo()\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UnknownFunction]);

    let model = crate::model("var a = toLower(1)\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::ArgumentType]);

    let model = crate::model("var a = substring('abc')\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::ArgumentCount]);

    let model = crate::model("var a = length([1, 2])\nvar b = first(split('a,b', ','))\n");
    assert!(codes(&model).is_empty());
    assert_eq!(model.symbol("a").unwrap().ty, TypeSymbol::Int);
    assert_eq!(model.symbol("b").unwrap().ty, TypeSymbol::String);
}

#[test]
fn test_property_and_index_access() {
    let model = crate::model("var o = {\n  a: 1\n}\nvar b = o.c\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UnknownProperty]);

    let model = crate::model("var n = 1\nvar p = n.x\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::PropertyAccessOnNonObject]);

    let model = crate::model("var arr = [\n  1\n]\nvar q = arr['x']\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidIndex]);

    let model = crate::model("var o = {\n  a: 'x'\n}\nvar v = o['a']\n");
    assert!(codes(&model).is_empty());
    assert_eq!(model.symbol("v").unwrap().ty, TypeSymbol::String);
}

#[test]
fn test_duplicate_object_property() {
    let model = crate::model("var o = {\n  a: 1\n  a: 2\n}\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::DuplicateProperty]);
}

#[test]
fn test_decorators() {
    let model = crate::model("@minValue(1)\n@description('size')\nparam size int\nvar v = size\n");
    assert!(codes(&model).is_empty());

    let model = crate::model("@secure()\nparam p int\nvar v = p\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidDecorator]);

    let model = crate::model("@minValue(1)\nvar v = 1\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidDecorator]);

    let model = crate::model("@allowed([\n  'a'\n  1\n])\nparam p string\nvar v = p\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::TypeMismatch]);

    let model = crate::model("@shiny()\nparam p string\nvar v = p\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidDecorator]);
}

#[test]
fn test_unused_parameter_warning() {
    let model = crate::model("param p string\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UnusedParameter]);
    assert!(!model.has_errors());
}

#[test]
fn test_invalid_type_name() {
    let model = crate::model("param p float\nvar v = p\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::InvalidTypeName]);
}

#[test]
fn test_outputs_cannot_be_referenced() {
    let model = crate::model("output o int = 1\nvar v = o\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::UndefinedSymbol]);
}

#[test]
fn test_default_must_match_type() {
    let model = crate::model("param p int = 'x'\nvar v = p\n");
    assert_eq!(codes(&model), vec![DiagnosticCode::TypeMismatch]);
}

const MODULE: &str = "param size int\nparam label string = 'x'\noutput count int = size\noutput tag string = label\n";

#[test]
fn test_module_params_and_outputs() {
    let model = bind_files(
        &[
            (
                "main.cirrus",
                "module m './m.cirrus' = {\n  name: 'm'\n  params: {\n    size: 3\n  }\n}\noutput o int = m.outputs.count\n",
            ),
            ("m.cirrus", MODULE),
        ],
        &StaticCatalog::new(),
    );
    assert!(codes(&model).is_empty(), "{:?}", model.diagnostics());
    let decl = model.symbol("m").unwrap().declaration;
    assert_eq!(model.module_model(decl).unwrap().uri(), &uri("m.cirrus"));
}

#[test]
fn test_module_param_errors() {
    let model = bind_files(
        &[
            (
                "main.cirrus",
                "module m './m.cirrus' = {\n  name: 'm'\n  params: {\n    size: 'big'\n    extra: 1\n  }\n}\noutput o string = m.outputs.missing\n",
            ),
            ("m.cirrus", MODULE),
        ],
        &StaticCatalog::new(),
    );
    assert_eq!(
        codes(&model),
        vec![
            DiagnosticCode::TypeMismatch,
            DiagnosticCode::UnknownProperty,
            DiagnosticCode::UnknownProperty,
        ]
    );

    let model = bind_files(
        &[
            ("main.cirrus", "module m './m.cirrus' = {\n  name: 'm'\n}\n"),
            ("m.cirrus", MODULE),
        ],
        &StaticCatalog::new(),
    );
    assert_eq!(codes(&model), vec![DiagnosticCode::MissingRequiredProperty]);
}

#[test]
fn test_missing_module_is_local_to_its_declaration() {
    let model = bind_files(
        &[(
            "main.cirrus",
            "module m './gone.cirrus' = {\n  name: 'm'\n}\nvar ok = 1 + 1\noutput o int = ok\n",
        )],
        &StaticCatalog::new(),
    );
    assert_eq!(codes(&model), vec![DiagnosticCode::ModuleNotFound]);
    assert_eq!(model.symbol("ok").unwrap().ty, TypeSymbol::Int);
    assert_eq!(model.symbol("m").unwrap().ty, TypeSymbol::Error);
}

const THING: &str = "'Test.Rp/things@2020-01-01'";

#[test]
fn test_resource_body_must_be_object_literal() {
    let bodies = [
        "p",
        "if (true) p",
        "[for i in range(0, 2): p]",
        "union(p, {})",
    ];
    for body in bodies {
        let text = format!("param p object\nresource r {THING} = {body}\n");
        let model = bind_files(&[("main.cirrus", &text)], &StaticCatalog::new());
        let codes = codes(&model);
        assert!(
            codes.contains(&DiagnosticCode::ObjectLiteralRequired),
            "{body}: {codes:?}"
        );
        // The body is still typed, so the parameter counts as used.
        assert!(!codes.contains(&DiagnosticCode::UnusedParameter), "{body}: {codes:?}");
        assert!(model.has_errors());
    }

    let model = bind_files(
        &[("main.cirrus", &format!("resource r {THING} = [for i in range(0, 2): if (i > 0) {{\n  name: 'r${{i}}'\n}}]\n"))],
        &StaticCatalog::new(),
    );
    assert!(!codes(&model).contains(&DiagnosticCode::ObjectLiteralRequired));
}

#[test]
fn test_module_body_must_be_object_literal() {
    let model = bind_files(
        &[
            (
                "main.cirrus",
                "var body = {\n  name: 'm'\n  params: {\n    size: 1\n  }\n}\nmodule m './m.cirrus' = body\n",
            ),
            ("m.cirrus", MODULE),
        ],
        &StaticCatalog::new(),
    );
    assert_eq!(codes(&model), vec![DiagnosticCode::ObjectLiteralRequired]);
    let span = model.diagnostics()[0].span;
    assert_eq!(&model.tree().text()[span.start as usize..span.end as usize], "body");
}

#[test]
fn test_module_params_from_a_variable_need_required_params() {
    let bind_params = |params: &str| {
        let main = format!(
            "var ps = {params}\nmodule m './m.cirrus' = {{\n  name: 'm'\n  params: ps\n}}\n"
        );
        let model = bind_files(&[("main.cirrus", &main), ("m.cirrus", MODULE)], &StaticCatalog::new());
        codes(&model)
    };
    assert_eq!(bind_params("{\n  label: 'y'\n}"), vec![DiagnosticCode::TypeMismatch]);
    assert_eq!(bind_params("{}"), vec![DiagnosticCode::TypeMismatch]);
    assert!(bind_params("{\n  size: 2\n}").is_empty());
}
