//! The host expansion engine.
//!
//! One [`Expander`] pass walks a file's [`TokenStream`] left to right:
//!
//! - `Indent`/`Dedent` tokens grow and shrink the current indentation prefix.
//! - The reserved import keyword starts an import directive, which resolves a
//!   macro and makes its trigger keyword available for the rest of the file.
//! - An available trigger keyword hands the shared stream to that macro's
//!   parser, then splices the translation into the output at the current
//!   indentation.
//! - Every other physical line is copied through verbatim, exactly once.
//!
//! A pass either returns the whole output or fails; file writes go through a
//! temporary sibling so a failed pass never leaves partial output on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::errors::{MakroError, Result};
use crate::macros::{ImportDirective, MacroDefinition, Resolver};
use crate::syntax::{LineTable, Token, TokenKind, TokenStream};

// ============================================================================
// INTERRUPTION
// ============================================================================

/// Cooperative cancellation flag, polled once per token.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        match self.is_triggered() {
            true => Err(MakroError::Interrupted),
            false => Ok(()),
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Output accumulator plus the last physical line copied into it.
#[derive(Debug, Default)]
struct ExpansionOutput {
    text: String,
    last_emitted: usize,
}

impl ExpansionOutput {
    /// Copies source lines up to and including `line` that were not emitted
    /// yet.
    fn emit_through(&mut self, lines: &LineTable, line: usize) {
        if line > self.last_emitted {
            self.text.push_str(&lines.lines_between(self.last_emitted + 1, line));
            self.last_emitted = line;
        }
    }

    /// Marks lines up to `line` as handled without copying them.
    fn skip_through(&mut self, line: usize) {
        self.last_emitted = self.last_emitted.max(line);
    }
}

// ============================================================================
// EXPANDER
// ============================================================================

/// A single expansion pass bound to a resolver.
///
/// Per-pass state (available macros, indentation, output) is reset at the
/// start of every expansion, so one `Expander` can translate several files in
/// sequence.
pub struct Expander<'r> {
    resolver: &'r mut Resolver,
    available: Vec<MacroDefinition>,
    indentation: String,
    output: ExpansionOutput,
}

impl<'r> Expander<'r> {
    pub fn new(resolver: &'r mut Resolver) -> Self {
        Self {
            resolver,
            available: Vec::new(),
            indentation: String::new(),
            output: ExpansionOutput::default(),
        }
    }

    /// Keywords made available by import directives in the current pass.
    pub fn available_keywords(&self) -> impl Iterator<Item = &str> {
        self.available.iter().map(|def| def.keyword.as_str())
    }

    /// Expands an already-built token stream and returns the output text.
    pub fn expand_tokens(&mut self, tokens: &mut TokenStream) -> Result<String> {
        self.available.clear();
        self.indentation.clear();
        self.output = ExpansionOutput::default();

        let interrupt = self.resolver.interrupt().clone();
        let import_keyword = self.resolver.config().import_keyword.clone();

        while !tokens.is_at_end() {
            interrupt.check()?;
            let start = tokens.cursor();
            let token = tokens.advance();

            match token.kind {
                TokenKind::Indent => {
                    self.indentation.push_str(&token.text);
                    continue;
                }
                TokenKind::Dedent => {
                    let keep = self.indentation.len().saturating_sub(token.text.len());
                    self.indentation.truncate(keep);
                }
                TokenKind::Name if token.text == import_keyword => {
                    self.import(&token, start, tokens)?;
                    continue;
                }
                TokenKind::Name => {
                    if let Some(definition) = self.trigger(&token.text) {
                        self.expand_macro(&definition, &token, start, tokens)?;
                        continue;
                    }
                }
                _ => {}
            }

            if !matches!(token.kind, TokenKind::Dedent | TokenKind::Newline) {
                self.output.emit_through(tokens.lines(), token.end.line);
            }
        }

        // Trailing blank and comment-only lines.
        self.output.emit_through(tokens.lines(), tokens.lines().len());
        Ok(std::mem::take(&mut self.output.text))
    }

    /// Expands `text`. `name` labels diagnostics.
    pub fn expand_str(&mut self, name: &str, text: &str) -> Result<String> {
        let mut tokens = TokenStream::from_source(name, text)?;
        self.expand_tokens(&mut tokens)
    }

    /// Expands the file at `path`. Local packages are searched for from the
    /// file's directory while the pass runs.
    pub fn expand_file(&mut self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path).map_err(|e| MakroError::io(path, e))?;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let previous = self.resolver.search_root().to_path_buf();
        self.resolver.set_search_root(parent);
        let result = self.expand_str(&path.display().to_string(), &text);
        self.resolver.set_search_root(previous);
        result
    }

    /// Expands `path` and writes the output next to it with the output
    /// extension. Returns the written path.
    pub fn translate_file(&mut self, path: &Path) -> Result<PathBuf> {
        let output = self.expand_file(path)?;
        let target = self.resolver.config().output_path(path);
        if target == path {
            return Err(MakroError::internal(format!(
                "refusing to overwrite the source file {}",
                path.display()
            )));
        }
        write_atomically(&target, &output)?;
        info!(source = %path.display(), output = %target.display(), "translated");
        Ok(target)
    }

    /// Translates every macro-source file below `dir`, in sorted order, each
    /// with a fresh pass.
    pub fn translate_folder(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                MakroError::io(&path, e.into())
            })?;
            if entry.file_type().is_file() && self.resolver.config().is_macro_source(entry.path()) {
                sources.push(entry.into_path());
            }
        }

        debug!(dir = %dir.display(), files = sources.len(), "translating folder");
        sources
            .iter()
            .map(|source| self.translate_file(source))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Directives and macros
    // ------------------------------------------------------------------------

    fn trigger(&self, keyword: &str) -> Option<MacroDefinition> {
        self.available
            .iter()
            .find(|def| def.keyword == keyword)
            .cloned()
    }

    fn import(&mut self, keyword: &Token, start: usize, tokens: &mut TokenStream) -> Result<()> {
        self.output
            .emit_through(tokens.lines(), keyword.start.line.saturating_sub(1));

        let directive = ImportDirective::parse(tokens)?;
        let reference = directive.reference();
        let definition = self.resolver.resolve(&reference)?;
        debug!(reference = %reference, line = keyword.start.line, "imported macro");
        self.available.push(definition);

        self.output.text.push_str(&directive.comment());
        self.output
            .skip_through(last_consumed_line(tokens, start));
        Ok(())
    }

    fn expand_macro(
        &mut self,
        definition: &MacroDefinition,
        trigger: &Token,
        start: usize,
        tokens: &mut TokenStream,
    ) -> Result<()> {
        self.output
            .emit_through(tokens.lines(), trigger.start.line.saturating_sub(1));

        let plugin = &definition.plugin;
        let ast = plugin.parse(tokens)?;
        plugin.lint(&ast)?;
        let translated = plugin.translate(&ast)?;

        let lines: Vec<String> = translated
            .split('\n')
            .map(|line| match line.is_empty() {
                true => String::new(),
                false => format!("{}{line}", self.indentation),
            })
            .collect();
        debug!(
            trigger = %definition.keyword,
            line = trigger.start.line,
            output_lines = lines.len(),
            "expanded macro"
        );

        self.output.text.push('\n');
        self.output.text.push_str(&lines.join("\n"));
        self.output.text.push('\n');
        self.output
            .skip_through(last_consumed_line(tokens, start));
        trace!(consumed = tokens.cursor() - start, "macro consumed tokens");
        Ok(())
    }
}

/// Last physical line covered by tokens consumed since `start`. `Dedent`
/// tokens sit on the following line and do not count.
fn last_consumed_line(tokens: &TokenStream, start: usize) -> usize {
    tokens
        .tokens_between(start, tokens.cursor())
        .iter()
        .filter(|token| !token.is(TokenKind::Dedent))
        .map(|token| token.end.line)
        .max()
        .unwrap_or(0)
}

fn write_atomically(target: &Path, contents: &str) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temporary = target.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&temporary, contents).map_err(|e| MakroError::io(&temporary, e))?;
    fs::rename(&temporary, target).map_err(|e| {
        let _ = fs::remove_file(&temporary);
        MakroError::io(target, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MakrosConfig;
    use crate::macros::{Macro, PluginRegistry};
    use crate::syntax::TokenMatcher;

    fn resolver() -> Resolver {
        Resolver::new(MakrosConfig::default(), PluginRegistry::with_std())
    }

    #[test]
    fn macro_free_source_is_unchanged() {
        let source = "import os\n\n\ndef f(x):\n    # note\n    return (x +\n            1)\n\nprint(f(1))  # done\n";
        let mut resolver = resolver();
        let output = Expander::new(&mut resolver).expand_str("t.mpy", source).unwrap();
        assert_eq!(output, source);
    }

    #[test]
    fn source_without_trailing_newline() {
        let mut resolver = resolver();
        let output = Expander::new(&mut resolver).expand_str("t.mpy", "x = 1").unwrap();
        assert_eq!(output, "x = 1");
    }

    #[test]
    fn builtin_hello() {
        let mut resolver = resolver();
        let output = Expander::new(&mut resolver)
            .expand_str("t.mpy", "macro import hello\nhello\nx = 1\n")
            .unwrap();
        assert_eq!(
            output,
            "# Macro imported: hello\n\nprint(\"Hello World\")\nx = 1\n"
        );
    }

    struct Block;

    impl Macro for Block {
        type Ast = ();

        fn parse(&self, _tokens: &mut TokenStream) -> Result<()> {
            Ok(())
        }

        fn translate(&self, _ast: &()) -> String {
            "a\n\nb".to_string()
        }
    }

    #[test]
    fn nested_indentation_and_dedent() {
        let mut registry = PluginRegistry::new();
        registry.register_builtin("block", Block);
        let mut resolver = Resolver::new(MakrosConfig::default(), registry);
        let source = "macro import block\nif x:\n  if y:\n    block\n  z = 1\nw = 2\n";
        let output = Expander::new(&mut resolver).expand_str("t.mpy", source).unwrap();
        assert_eq!(
            output,
            "# Macro imported: block\nif x:\n  if y:\n\n    a\n\n    b\n  z = 1\nw = 2\n"
        );
    }

    #[test]
    fn untriggered_keywords_are_plain_names() {
        let mut resolver = resolver();
        let source = "hello = 1\n";
        let output = Expander::new(&mut resolver).expand_str("t.mpy", source).unwrap();
        assert_eq!(output, source);
    }

    #[test]
    fn interrupt_aborts_the_pass() {
        let interrupt = Interrupt::new();
        let mut resolver = resolver().with_interrupt(interrupt.clone());
        interrupt.trigger();
        let err = Expander::new(&mut resolver)
            .expand_str("t.mpy", "x = 1\n")
            .unwrap_err();
        assert!(err.is_interrupt());
        interrupt.reset();
        assert!(Expander::new(&mut resolver).expand_str("t.mpy", "x = 1\n").is_ok());
    }

    #[test]
    fn translate_file_writes_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.mpy");
        fs::write(&source, "macro import hello\nhello\n").unwrap();
        let mut resolver = resolver();
        let written = Expander::new(&mut resolver).translate_file(&source).unwrap();
        assert_eq!(written, dir.path().join("prog.py"));
        assert_eq!(
            fs::read_to_string(&written).unwrap(),
            "# Macro imported: hello\n\nprint(\"Hello World\")\n"
        );
        assert!(!dir.path().join(".prog.py.tmp").exists());
    }

    #[test]
    fn failed_pass_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bad.mpy");
        fs::write(&source, "macro import nope\n").unwrap();
        let mut resolver = resolver();
        assert!(Expander::new(&mut resolver).translate_file(&source).is_err());
        assert!(!dir.path().join("bad.py").exists());
    }

    #[test]
    fn translate_folder_is_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.mpy"), "b = 1\n").unwrap();
        fs::write(dir.path().join("a.mpy"), "a = 1\n").unwrap();
        fs::write(dir.path().join("sub/c.mpy"), "c = 1\n").unwrap();
        fs::write(dir.path().join("ignored.txt"), "").unwrap();

        let mut resolver = resolver();
        let written = Expander::new(&mut resolver)
            .translate_folder(dir.path())
            .unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("a.py"),
                dir.path().join("b.py"),
                dir.path().join("sub/c.py"),
            ]
        );
    }

    #[test]
    fn expand_tokens_drives_a_borrowed_stream() {
        let mut tokens =
            TokenStream::from_source("t.mpy", "macro import hello\nif x:\n    hello\n").unwrap();
        let mut resolver = resolver();
        let output = Expander::new(&mut resolver)
            .expand_tokens(&mut tokens)
            .unwrap();
        assert_eq!(
            output,
            "# Macro imported: hello\nif x:\n\n    print(\"Hello World\")\n"
        );
        assert!(tokens.is_at_end());
        assert_eq!(tokens.cursor(), tokens.len() - 1);
    }

    struct NoEmpty;

    impl Macro for NoEmpty {
        type Ast = String;

        fn parse(&self, tokens: &mut TokenStream) -> Result<String> {
            let name = TokenMatcher::new().kind(TokenKind::Name);
            let name = tokens.consume(&name, "Expected a name")?;
            Ok(name.text)
        }

        fn lint(&self, ast: &String) -> Result<()> {
            match ast.as_str() {
                "empty" => Err(MakroError::lint("require", "name must not be 'empty'")),
                _ => Ok(()),
            }
        }

        fn translate(&self, ast: &String) -> String {
            format!("assert {ast}")
        }
    }

    #[test]
    fn lint_failure_aborts_the_pass() {
        let mut registry = PluginRegistry::new();
        registry.register_builtin("require", NoEmpty);
        let mut resolver = Resolver::new(MakrosConfig::default(), registry);
        let mut expander = Expander::new(&mut resolver);

        let ok = expander
            .expand_str("t.mpy", "macro import require\nrequire ready\n")
            .unwrap();
        assert_eq!(ok, "# Macro imported: require\n\nassert ready\n");

        let err = expander
            .expand_str("t.mpy", "macro import require\nrequire empty\nx = 1\n")
            .unwrap_err();
        match err {
            MakroError::Lint { keyword, message } => {
                assert_eq!(keyword, "require");
                assert!(message.contains("empty"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn imports_are_file_scoped() {
        let mut resolver = resolver();
        let mut expander = Expander::new(&mut resolver);
        expander.expand_str("a.mpy", "macro import hello\n").unwrap();
        assert_eq!(expander.available_keywords().collect::<Vec<_>>(), vec!["hello"]);
        let output = expander.expand_str("b.mpy", "hello\n").unwrap();
        assert_eq!(output, "hello\n");
    }
}
