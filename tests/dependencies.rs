use vel::symtab::SymbolKind;

mod common;
use common::analyzed;

#[test]
fn foreign_imports_are_not_dependencies() {
    let (_dir, workspace, path) = analyzed(
        &[
            ("main.vel", "import vel from util;\nimport py from os.path;\nx = 1\n"),
            ("util.vel", "y = 2\n"),
        ],
        "main.vel",
    );

    let deps = workspace
        .dependencies(&path, false)
        .unwrap_or_else(|| panic!("analysis should make dependencies queryable"));
    assert_eq!(deps.len(), 1, "only the vel-tagged import counts: {deps:?}");
    assert_eq!(deps[0].target, "util");
    assert_eq!(deps[0].tag, "vel");
    assert!(deps[0].resolved.is_some(), "util.vel exists and must resolve");
}

#[test]
fn unresolvable_dependency_is_listed_without_a_path() {
    let (_dir, workspace, path) =
        analyzed(&[("main.vel", "import vel from ghost;\n")], "main.vel");

    let deps = workspace
        .dependencies(&path, false)
        .unwrap_or_else(|| panic!("analysis should make dependencies queryable"));
    assert_eq!(deps.len(), 1);
    assert!(deps[0].resolved.is_none());

    let diags = workspace
        .diagnostics(&path)
        .unwrap_or_else(|| panic!("analysis should cache diagnostics"));
    assert!(
        diags.iter().any(|diag| diag.message.contains("ghost")),
        "missing target must produce a warning: {diags:?}"
    );
}

#[test]
fn deep_walk_crosses_module_boundaries_and_contains_the_shallow_set() {
    let (_dir, workspace, path) = analyzed(
        &[
            ("main.vel", "import vel from a;\nx = 1\n"),
            ("a.vel", "import vel from b;\n"),
            ("b.vel", "z = 3\n"),
        ],
        "main.vel",
    );

    let shallow = workspace
        .dependencies(&path, false)
        .unwrap_or_else(|| panic!("shallow query failed"));
    let deep = workspace
        .dependencies(&path, true)
        .unwrap_or_else(|| panic!("deep query failed"));

    assert_eq!(shallow.len(), 1);
    assert_eq!(deep.len(), 2);
    assert!(
        shallow.iter().all(|dep| deep.contains(dep)),
        "every shallow dependency must appear in the deep set"
    );

    let transitive = deep
        .iter()
        .find(|dep| dep.target == "b")
        .unwrap_or_else(|| panic!("deep walk should reach a's import of b"));
    assert!(transitive.origin.ends_with("a.vel"));
}

#[test]
fn import_cycles_terminate_the_deep_walk() {
    let (_dir, workspace, path) = analyzed(
        &[
            ("main.vel", "import vel from other;\n"),
            ("other.vel", "import vel from main;\n"),
        ],
        "main.vel",
    );

    let deep = workspace
        .dependencies(&path, true)
        .unwrap_or_else(|| panic!("deep query failed"));
    assert_eq!(deep.len(), 2, "each edge once, then the walk stops: {deep:?}");
}

#[test]
fn symbols_cover_variables_blocks_and_imported_modules() {
    let (_dir, workspace, path) = analyzed(
        &[
            ("main.vel", "import vel from util;\nx = 1\ndef setup {\n  y = 2\n}\n"),
            ("util.vel", "z = 3\n"),
        ],
        "main.vel",
    );

    let symbols = workspace
        .symbols(&path)
        .unwrap_or_else(|| panic!("symbol query failed"));
    let kind_of = |name: &str| {
        symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.kind)
    };
    assert_eq!(kind_of("x"), Some(SymbolKind::Variable));
    assert_eq!(kind_of("setup"), Some(SymbolKind::Block));
    assert_eq!(kind_of("util"), Some(SymbolKind::Module));
    assert_eq!(kind_of("y"), Some(SymbolKind::Variable), "nested scopes flatten");
}

#[test]
fn definitions_record_every_site_of_a_redefined_name() {
    let (_dir, workspace, path) =
        analyzed(&[("main.vel", "x = 1\nx = 2\n")], "main.vel");

    let symbols = workspace
        .symbols(&path)
        .unwrap_or_else(|| panic!("symbol query failed"));
    let x = symbols
        .iter()
        .find(|symbol| symbol.name == "x")
        .unwrap_or_else(|| panic!("x should be defined"));
    assert_eq!(x.defn.len(), 2);

    let definitions = workspace
        .definitions(&path)
        .unwrap_or_else(|| panic!("definition query failed"));
    assert_eq!(definitions.len(), 2);
    assert!(definitions.iter().all(|site| site.path.ends_with("main.vel")));
    assert_eq!(definitions[0].span.start_line, 0);
    assert_eq!(definitions[1].span.start_line, 1);
}
