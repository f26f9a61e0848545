//! # Makros Test Fixtures
//!
//! Small macro implementations and on-disk package builders shared by the
//! integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use makros::{Macro, MakrosConfig, PluginRegistry, Resolver, TokenKind, TokenMatcher, TokenStream};

/// Translates to a fixed text and consumes nothing.
pub struct Fixed(pub &'static str);

impl Macro for Fixed {
    type Ast = ();

    fn parse(&self, _tokens: &mut TokenStream) -> makros::Result<()> {
        Ok(())
    }

    fn translate(&self, _ast: &()) -> String {
        self.0.to_string()
    }
}

/// `call name`: consumes one name and emits a call to it.
pub struct Call;

impl Macro for Call {
    type Ast = String;

    fn parse(&self, tokens: &mut TokenStream) -> makros::Result<String> {
        let name = tokens.consume(
            &TokenMatcher::new().kind(TokenKind::Name),
            "Expected the name of a function",
        )?;
        Ok(name.text)
    }

    fn translate(&self, ast: &String) -> String {
        format!("{ast}()")
    }
}

/// Counts how many times it is parsed.
#[derive(Clone, Default)]
pub struct Counting(pub Arc<AtomicUsize>);

impl Counting {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Macro for Counting {
    type Ast = ();

    fn parse(&self, _tokens: &mut TokenStream) -> makros::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn translate(&self, _ast: &()) -> String {
        "counted = True".to_string()
    }
}

/// Writes a package directory `root/name` with a manifest declaring
/// `keywords` (each implemented by `<keyword>.py`) and `bootstrap` files.
pub fn write_package(root: &Path, name: &str, keywords: &[&str], bootstrap: &[&str]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let macros: Vec<serde_json::Value> = keywords
        .iter()
        .map(|keyword| {
            fs::write(dir.join(format!("{keyword}.py")), "").unwrap();
            serde_json::json!({
                "name": keyword,
                "keyword": keyword,
                "description": format!("the {keyword} macro"),
                "file": format!("{keyword}.py"),
            })
        })
        .collect();
    let manifest = serde_json::json!({
        "name": name,
        "package": name,
        "description": "test package",
        "bootstrap": bootstrap,
        "macros": macros,
    });
    fs::write(dir.join("macros.json"), manifest.to_string()).unwrap();
    dir
}

/// A resolver searching from `root` with the given registry.
pub fn resolver_at(root: &Path, registry: PluginRegistry) -> Resolver {
    let mut resolver = Resolver::new(MakrosConfig::default(), registry);
    resolver.set_search_root(root);
    resolver
}
