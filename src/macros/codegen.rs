//! Small helpers for translators that emit Python-style host code.

/// Default indentation unit for generated blocks.
pub const INDENT_UNIT: &str = "    ";

/// Prefixes every line of `text` with `unit`. Blank lines stay blank.
pub fn indent(text: &str, unit: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{unit}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Joins top-level statements, one per line.
pub fn program<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `def name(args):` followed by the indented body.
pub fn create_func(name: &str, args: &str, body: &str) -> String {
    format!("def {name}({args}):\n{}\n", indent(body, INDENT_UNIT))
}

/// `class Name(Base):` followed by the indented body.
pub fn create_class(name: &str, body: &str, extends: Option<&str>) -> String {
    let bases = extends.map(|base| format!("({base})")).unwrap_or_default();
    format!("\nclass {name}{bases}:\n{}\n", indent(body, INDENT_UNIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb", "  "), "  a\n\n  b");
    }

    #[test]
    fn functions_and_classes() {
        assert_eq!(
            create_func("f", "x", "return x"),
            "def f(x):\n    return x\n"
        );
        assert_eq!(
            create_class("A", "pass", Some("Base")),
            "\nclass A(Base):\n    pass\n"
        );
        assert_eq!(create_class("B", "pass", None), "\nclass B:\n    pass\n");
    }

    #[test]
    fn program_joins_statements() {
        assert_eq!(program(&["a = 1", "b = 2"]), "a = 1\nb = 2");
    }
}
