//! End-to-end expansion scenarios.

mod common;

use std::fs;

use common::{resolver_at, write_package, Counting, Fixed};
use makros::{Expander, MakroError, MakrosConfig, PluginRegistry, Resolver};

#[test]
fn imported_macro_replaces_its_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = PluginRegistry::new();
    registry.register_builtin("greet", Fixed(r#"print("hi")"#));
    let mut resolver = resolver_at(dir.path(), registry);

    let output = Expander::new(&mut resolver)
        .expand_str("greet.mpy", "macro import greet\ngreet\n")
        .unwrap();

    assert_eq!(output, "# Macro imported: greet\n\nprint(\"hi\")\n");
    assert!(!output.lines().any(|line| line.trim() == "greet"));
}

#[test]
fn indented_invocation_indents_every_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = PluginRegistry::new();
    registry.register_builtin("pair", Fixed("a\nb"));
    let mut resolver = resolver_at(dir.path(), registry);

    let source = "macro import pair\ndef f():\n    pair\n";
    let output = Expander::new(&mut resolver)
        .expand_str("pair.mpy", source)
        .unwrap();

    assert_eq!(
        output,
        "# Macro imported: pair\ndef f():\n\n    a\n    b\n"
    );
    assert!(output.contains("    a\n"));
    assert!(output.contains("    b\n"));
}

#[test]
fn unknown_package_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("main.mpy");
    fs::write(&source, "macro import unknownpkg.foo\nx = 1\n").unwrap();

    let mut resolver = resolver_at(dir.path(), PluginRegistry::with_std());
    let err = Expander::new(&mut resolver)
        .translate_file(&source)
        .unwrap_err();

    match err {
        MakroError::Resolution { reference, .. } => assert_eq!(reference, "unknownpkg.foo"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!dir.path().join("main.py").exists());
}

#[test]
fn unchanged_bootstrap_file_is_not_expanded_again() {
    let dir = tempfile::tempdir().unwrap();
    let package = write_package(dir.path(), "tools", &["noop"], &["helpers.mpy"]);
    fs::write(package.join("helpers.mpy"), "macro import count\ncount\n").unwrap();
    let source = dir.path().join("main.mpy");
    fs::write(&source, "macro import tools.noop\nx = 1\n").unwrap();

    let counter = Counting::default();
    let config = MakrosConfig {
        hash_record: Some(dir.path().join("hashes.json")),
        ..MakrosConfig::default()
    };
    let run = || {
        let mut registry = PluginRegistry::new();
        registry.register_builtin("count", counter.clone());
        registry.register_package("tools", "noop", Fixed("pass"));
        let mut resolver = Resolver::new(config.clone(), registry);
        Expander::new(&mut resolver).translate_file(&source).unwrap();
        resolver.save_hashes().unwrap();
    };

    run();
    assert_eq!(counter.count(), 1);
    assert_eq!(
        fs::read_to_string(package.join("helpers.py")).unwrap(),
        "# Macro imported: count\n\ncounted = True\n"
    );

    run();
    assert_eq!(counter.count(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("main.py")).unwrap(),
        "# Macro imported: tools.noop\nx = 1\n"
    );
}

#[test]
fn changed_bootstrap_file_is_expanded_again() {
    let dir = tempfile::tempdir().unwrap();
    let package = write_package(dir.path(), "tools", &["noop"], &["helpers.mpy"]);
    let helpers = package.join("helpers.mpy");
    fs::write(&helpers, "macro import count\ncount\n").unwrap();

    let counter = Counting::default();
    let config = MakrosConfig {
        hash_record: Some(dir.path().join("hashes.json")),
        ..MakrosConfig::default()
    };
    let run = || {
        let mut registry = PluginRegistry::new();
        registry.register_builtin("count", counter.clone());
        registry.register_package("tools", "noop", Fixed("pass"));
        let mut resolver = Resolver::new(config.clone(), registry);
        resolver.set_search_root(dir.path());
        resolver.resolve("tools.noop").unwrap();
    };

    run();
    fs::write(&helpers, "macro import count\ncount\ncount\n").unwrap();
    run();
    assert_eq!(counter.count(), 3);
}

#[test]
fn bootstrap_runs_once_per_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let package = write_package(dir.path(), "tools", &["a", "b"], &["helpers.mpy"]);
    fs::write(package.join("helpers.mpy"), "macro import count\ncount\n").unwrap();

    let counter = Counting::default();
    let mut registry = PluginRegistry::new();
    registry.register_builtin("count", counter.clone());
    registry.register_package("tools", "a", Fixed("a"));
    registry.register_package("tools", "b", Fixed("b"));
    let mut resolver = resolver_at(dir.path(), registry);

    resolver.resolve("tools.a").unwrap();
    // The folder is already bootstrapped, so edits are not picked up.
    fs::write(package.join("helpers.mpy"), "macro import count\ncount\n\n").unwrap();
    resolver.resolve("tools.b").unwrap();

    assert_eq!(counter.count(), 1);
    assert!(resolver.is_bootstrapped(&package));
}

#[test]
fn macro_parsers_share_the_host_cursor() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "calls", &["call"], &[]);
    let mut registry = PluginRegistry::new();
    registry.register_package("calls", "call", common::Call);
    let mut resolver = resolver_at(dir.path(), registry);

    let source = "macro import calls.call\nfor i in x:\n    call setup\n    y = i\n";
    let output = Expander::new(&mut resolver)
        .expand_str("calls.mpy", source)
        .unwrap();

    assert_eq!(
        output,
        "# Macro imported: calls.call\nfor i in x:\n\n    setup()\n    y = i\n"
    );
}

#[test]
fn malformed_invocation_reports_position() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "calls", &["call"], &[]);
    let mut registry = PluginRegistry::new();
    registry.register_package("calls", "call", common::Call);
    let mut resolver = resolver_at(dir.path(), registry);

    let err = Expander::new(&mut resolver)
        .expand_str("calls.mpy", "macro import calls.call\n\ncall 42\n")
        .unwrap_err();

    match err {
        MakroError::TokenSyntax {
            message,
            found,
            line,
            ..
        } => {
            assert_eq!(message, "Expected the name of a function, found '42'");
            assert_eq!(found, "42");
            assert_eq!(line, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
}
