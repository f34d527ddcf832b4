//! Package documentation view used for synopses
//!
//! A synopsis is the first sentence of a doc comment rendered as a single
//! line of plain text, the way `go doc` prints one-line summaries.

use crate::package::Package;
use crate::syntax::is_exported;
use std::collections::{HashMap, HashSet};

/// Comments starting with one of these are never summaries.
const ILLEGAL_PREFIXES: &[&str] = &["copyright", "all rights", "author"];

/// Standard library packages with single-element import paths. Doc links
/// may name them without the file importing them.
const STD_PACKAGES: &[&str] = &[
    "bufio", "bytes", "cmp", "context", "crypto", "embed", "encoding", "errors", "expvar", "flag",
    "fmt", "hash", "html", "image", "io", "iter", "log", "maps", "math", "mime", "net", "os",
    "path", "plugin", "reflect", "regexp", "runtime", "slices", "sort", "strconv", "strings",
    "structs", "sync", "syscall", "testing", "time", "unicode", "unique", "unsafe",
];

/// Failure to derive the documentation view of a package.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocError {
    #[error("{file}: package {found}; expected package {expected}")]
    PackageMismatch {
        file: String,
        found: String,
        expected: String,
    },
}

/// Exported names declared by a package and the packages its files import,
/// used to resolve doc links such as `[Widget]` or `[json.Marshal]`.
#[derive(Debug, Clone, Default)]
pub struct DocPackage {
    pub name: String,
    pub import_path: String,
    symbols: HashSet<String>,
    imports: HashMap<String, String>,
}

impl DocPackage {
    /// Build the documentation view of a loaded package.
    ///
    /// Fails when files disagree on the package name (`_test` packages
    /// excepted).
    pub fn from_package(pkg: &Package) -> Result<Self, DocError> {
        let mut doc = DocPackage {
            name: pkg.name.clone(),
            import_path: pkg.import_path.clone(),
            ..Default::default()
        };

        for file in &pkg.files {
            let Some(name) = file.package_name() else {
                continue;
            };
            if name.ends_with("_test") {
                continue;
            }
            if doc.name.is_empty() {
                doc.name = name.to_string();
            } else if doc.name != name {
                return Err(DocError::PackageMismatch {
                    file: file.path.display().to_string(),
                    found: name.to_string(),
                    expected: doc.name.clone(),
                });
            }

            let root = file.tree.root_node();
            let mut cursor = root.walk();
            for decl in root.children(&mut cursor) {
                match decl.kind() {
                    "import_declaration" => doc.collect_imports(&file.source, decl),
                    "function_declaration" => {
                        if let Some(name) = decl.child_by_field_name("name") {
                            doc.add_symbol(&file.source[name.byte_range()]);
                        }
                    }
                    "method_declaration" => doc.collect_method(&file.source, decl),
                    "type_declaration" | "const_declaration" | "var_declaration" => {
                        doc.collect_specs(&file.source, decl)
                    }
                    _ => {}
                }
            }
        }

        Ok(doc)
    }

    /// Whether `name` (`Ident` or `Type.Method`) is declared by the package
    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    fn add_symbol(&mut self, name: &str) {
        if is_exported(name) {
            self.symbols.insert(name.to_string());
        }
    }

    fn collect_imports(&mut self, source: &str, node: arborium::tree_sitter::Node) {
        if node.kind() == "import_spec" {
            let Some(path) = node.child_by_field_name("path") else {
                return;
            };
            let path = source[path.byte_range()].trim_matches(|c| c == '"' || c == '`');
            let name = match node.child_by_field_name("name") {
                Some(alias) => source[alias.byte_range()].to_string(),
                None => path.rsplit('/').next().unwrap_or(path).to_string(),
            };
            if name != "_" && name != "." {
                self.imports.insert(name, path.to_string());
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_imports(source, child);
        }
    }

    fn collect_method(&mut self, source: &str, node: arborium::tree_sitter::Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let Some(receiver) = node.child_by_field_name("receiver") else {
            return;
        };
        // The receiver type is the last type identifier in `(r *T[K])`
        let text = &source[receiver.byte_range()];
        let recv = text
            .trim_matches(|c| c == '(' || c == ')')
            .split('[')
            .next()
            .unwrap_or("")
            .split_whitespace()
            .last()
            .unwrap_or("")
            .trim_start_matches('*');
        let name = &source[name.byte_range()];
        if is_exported(recv) && is_exported(name) {
            self.symbols.insert(format!("{recv}.{name}"));
        }
    }

    fn collect_specs(&mut self, source: &str, node: arborium::tree_sitter::Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "type_spec" | "type_alias" | "const_spec" | "var_spec" => {
                    let mut names = child.walk();
                    for name in child.children_by_field_name("name", &mut names) {
                        self.add_symbol(&source[name.byte_range()]);
                    }
                }
                // `var ( ... )` wraps its specs in a list node
                "var_spec_list" => self.collect_specs(source, child),
                _ => {}
            }
        }
    }

    /// Whether `pkg` names a package: a full import path, an import of one
    /// of the files, the package itself or a standard library package.
    fn lookup_package(&self, pkg: &str) -> bool {
        if pkg.contains('/') {
            return is_import_path(pkg);
        }
        self.imports.contains_key(pkg)
            || (!self.name.is_empty() && self.name == pkg)
            || STD_PACKAGES.contains(&pkg)
    }

    /// The first sentence of `text` as a single line of plain text.
    ///
    /// Returns an empty string when the comment does not start with a
    /// paragraph (code block, list, heading) or looks like a copyright notice.
    pub fn synopsis(&self, text: &str) -> String {
        let text = first_sentence(text);

        let lower = text.to_lowercase();
        if ILLEGAL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return String::new();
        }

        let Some(paragraph) = first_paragraph(text) else {
            return String::new();
        };

        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let line = words.join(" ");
        let line = line.replace("``", "\u{201c}").replace("''", "\u{201d}");
        self.resolve_doc_links(&line)
    }

    /// Replace resolvable `[Name]`, `[Type.Method]`, `[pkg.Name]`,
    /// `[import/path.Name]` and `[*pkg.Name]` links by their text; anything
    /// else is left alone.
    fn resolve_doc_links(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut rest = line;

        while let Some(open) = rest.find('[') {
            let (before, after) = rest.split_at(open);
            out.push_str(before);

            let Some(close) = after.find(']') else {
                out.push_str(after);
                return out;
            };
            let inner = &after[1..close];
            let tail = &after[close + 1..];

            let prev_ok = out.chars().last().is_none_or(is_link_boundary);
            let next_ok = tail.chars().next().is_none_or(is_link_boundary);

            if prev_ok && next_ok && self.is_doc_link(inner) {
                out.push_str(inner);
            } else {
                out.push_str(&after[..=close]);
            }
            rest = tail;
        }

        out.push_str(rest);
        out
    }

    fn is_doc_link(&self, target: &str) -> bool {
        let target = target.strip_prefix('*').unwrap_or(target);
        let Some((qualifier, name)) = split_doc_name(target) else {
            return false;
        };
        let Some(qualifier) = qualifier else {
            return self.has_symbol(name);
        };

        match split_doc_name(qualifier) {
            // `Type.Method`, or `pkg.Name` for a package without a slash
            Some((None, recv)) => {
                self.has_symbol(&format!("{recv}.{name}"))
                    || (self.lookup_package(recv) && is_exported(name))
            }
            // `pkg.Type.Method`
            Some((Some(pkg), _)) => self.lookup_package(pkg) && is_exported(name),
            // `example.com/pkg.Name`: the qualifier is an import path
            None => self.lookup_package(qualifier) && is_exported(name),
        }
    }
}

/// Split `a.b.Name` at its last dot. `None` when the part after the dot is
/// not an identifier.
fn split_doc_name(text: &str) -> Option<(Option<&str>, &str)> {
    match text.rsplit_once('.') {
        Some((before, name)) => is_ident(name).then_some((Some(before), name)),
        None => is_ident(text).then_some((None, text)),
    }
}

/// Characters allowed right before `[` or right after `]` of a doc link
fn is_link_boundary(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n' || is_punct(c)
}

/// Unicode punctuation (categories `P*`). Symbols such as `+`, `=` or `$`
/// are not punctuation.
fn is_punct(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation()
            && !matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~');
    }
    matches!(
        c,
        '\u{a1}' | '\u{a7}' | '\u{ab}' | '\u{b6}' | '\u{b7}' | '\u{bb}' | '\u{bf}'
            | '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{2043}'
            | '\u{2045}'..='\u{2051}'
            | '\u{2053}'..='\u{205e}'
            | '\u{3001}'..='\u{3003}'
            | '\u{3008}'..='\u{3011}'
            | '\u{ff01}'..='\u{ff0f}'
    )
}

/// Whether `path` is a well-formed import path: slash-separated elements
/// of letters, digits and `-._~`, none empty or starting or ending with a dot.
fn is_import_path(path: &str) -> bool {
    !path.starts_with('-')
        && path.split('/').all(|elem| {
            !elem.is_empty()
                && !elem.starts_with('.')
                && !elem.ends_with('.')
                && elem
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(is_word_char)
}

/// The text up to and including the first period followed by white space,
/// unless the period follows a single upper-case letter (as in "U.S.").
/// Full-width periods end a sentence on their own.
pub fn first_sentence(s: &str) -> &str {
    let (mut ppp, mut pp, mut p) = (' ', ' ', ' ');
    for (i, q) in s.char_indices() {
        let q = if matches!(q, '\n' | '\r' | '\t') { ' ' } else { q };
        if q == ' ' && p == '.' && (!pp.is_uppercase() || ppp.is_uppercase()) {
            return &s[..i];
        }
        if p == '\u{3002}' || p == '\u{ff0e}' {
            return &s[..i];
        }
        (ppp, pp, p) = (pp, p, q);
    }
    s
}

/// The leading paragraph of a doc comment, or `None` when the comment starts
/// with something else: a code block or list (indented line) or a heading.
fn first_paragraph(text: &str) -> Option<String> {
    let mut lines = text.lines().skip_while(|l| l.trim().is_empty()).peekable();
    let first = *lines.peek()?;
    if first.starts_with([' ', '\t']) {
        return None;
    }

    let paragraph: Vec<&str> = lines
        .take_while(|l| !l.trim().is_empty() && !l.starts_with([' ', '\t']))
        .collect();

    if paragraph.len() == 1 && is_heading(paragraph[0]) {
        return None;
    }
    Some(paragraph.join("\n"))
}

fn is_heading(line: &str) -> bool {
    line.strip_prefix("# ")
        .is_some_and(|title| !title.trim().is_empty())
}
