//! Go parsing on top of tree-sitter

use crate::package::{DiagnosticKind, GoFile, PackageDiagnostic};
use arborium::tree_sitter::{Node, Parser, Tree};
use std::path::{Path, PathBuf};

/// Parse Go source code into a syntax tree.
pub fn parse_go(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_go::language().into())
        .expect("Failed to load Go grammar");
    parser.parse(source, None)
}

/// Parse one file of a package, returning the file and its syntax errors.
///
/// Returns `None` for the file only if tree-sitter gave up entirely, in which
/// case a single diagnostic describes the failure.
pub fn parse_file(
    path: impl Into<PathBuf>,
    source: String,
) -> (Option<GoFile>, Vec<PackageDiagnostic>) {
    let path = path.into();
    let Some(tree) = parse_go(&source) else {
        let diag = PackageDiagnostic::new(
            path.display().to_string(),
            "could not parse file",
            DiagnosticKind::Parse,
        );
        return (None, vec![diag]);
    };

    let diagnostics = syntax_errors(&path, &source, &tree);
    (Some(GoFile { path, source, tree }), diagnostics)
}

/// Collect one diagnostic per `ERROR` or missing node, in source order.
pub fn syntax_errors(path: &Path, source: &str, tree: &Tree) -> Vec<PackageDiagnostic> {
    let mut diagnostics = Vec::new();
    let root = tree.root_node();
    if root.has_error() {
        collect_errors(path, source, root, &mut diagnostics);
    }
    diagnostics
}

fn collect_errors(path: &Path, source: &str, node: Node, out: &mut Vec<PackageDiagnostic>) {
    if node.is_error() {
        let text = source[node.byte_range()]
            .split_whitespace()
            .next()
            .unwrap_or("EOF");
        out.push(PackageDiagnostic::new(
            position(path, node),
            format!("syntax error: unexpected {text}"),
            DiagnosticKind::Parse,
        ));
        return;
    }
    if node.is_missing() {
        out.push(PackageDiagnostic::new(
            position(path, node),
            format!("syntax error: missing {}", node.kind()),
            DiagnosticKind::Parse,
        ));
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(path, source, child, out);
    }
}

/// `file:line:col`, 1-indexed like the Go toolchain prints it
fn position(path: &Path, node: Node) -> String {
    let pos = node.start_position();
    format!("{}:{}:{}", path.display(), pos.row + 1, pos.column + 1)
}

/// Whether `name` is exported, i.e. starts with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}
