//! Doc comment harvesting
//!
//! The harvester walks every node of every file of a package, depth-first
//! and preorder, and reacts to three kinds of declaration nodes:
//!
//! - general declarations (`type`, `var`, `const`, `import`): their doc
//!   comment is remembered for the next type spec that has none of its own;
//! - type specs: exported types set the active type and get an entry,
//!   unexported ones clear it;
//! - fields (struct fields and interface methods): recorded under the active
//!   type when both the field and the type are exported.

use crate::comments::{CommentIndex, group_text};
use crate::doc::DocPackage;
use crate::error::{Error, Result};
use crate::loader::PackageLoader;
use crate::package::{GoFile, PackageError};
use crate::syntax::is_exported;
use arborium::tree_sitter::Node;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Qualified symbol name (`<import-path>.<Type>[.<Field>]`) to comment text.
///
/// Ordered so that generated output is deterministic.
pub type CommentMap = BTreeMap<String, String>;

/// Paths that name sets of packages rather than a package.
const RESERVED_PATHS: &[&str] = &["main", "all", "std", "cmd", "tool"];

/// How much of a type's doc comment is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentMode {
    /// Only the first sentence, on one line
    #[default]
    Synopsis,
    /// The whole comment, trimmed
    Full,
}

impl From<bool> for CommentMode {
    /// `true` selects [`CommentMode::Full`]
    fn from(full_comment: bool) -> Self {
        if full_comment {
            CommentMode::Full
        } else {
            CommentMode::Synopsis
        }
    }
}

/// Reject paths that would make the key space unbounded.
pub fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(Error::InvalidArgument("package path is empty".to_string()));
    }
    if RESERVED_PATHS.contains(&path) {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "path cannot be a reserved name",
        });
    }
    if path.contains("...") {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "path cannot contain wildcards",
        });
    }
    Ok(())
}

/// Harvests doc comments of packages provided by a [`PackageLoader`].
#[derive(Debug, Clone)]
pub struct Harvester<L> {
    loader: L,
}

impl<L: PackageLoader> Harvester<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Add the comments of the package at `path` to `comments`.
    ///
    /// Existing entries are kept unless the package produces the same key,
    /// in which case the new text wins. Nothing is inserted when the package
    /// fails to load.
    pub fn harvest(
        &self,
        comments: &mut CommentMap,
        path: &str,
        mode: CommentMode,
    ) -> Result<()> {
        validate_path(path)?;

        let pkg = self.loader.load(path)?;
        if let Some(err) = PackageError::from_package(&pkg) {
            return Err(Error::PackageLoad(err));
        }

        let doc = match mode {
            CommentMode::Synopsis => Some(DocPackage::from_package(&pkg)?),
            CommentMode::Full => None,
        };

        let before = comments.len();
        let mut cx = Context {
            import_path: &pkg.import_path,
            doc: doc.as_ref(),
            comments: &mut *comments,
        };
        for file in &pkg.files {
            debug!("walking {}", file.path.display());
            cx.walk_file(file);
        }

        info!(
            "harvested {} ({} files, {} new entries)",
            pkg.import_path,
            pkg.files.len(),
            comments.len() - before
        );
        Ok(())
    }

    /// Harvest several packages in order, stopping at the first failure.
    ///
    /// Entries from packages harvested before the failure stay in `comments`.
    pub fn harvest_all<I, S>(
        &self,
        comments: &mut CommentMap,
        paths: I,
        mode: CommentMode,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.harvest(comments, path.as_ref(), mode)?;
        }
        Ok(())
    }
}

/// The declaration nodes the walk reacts to
enum Decl<'t> {
    /// `type`, `var`, `const` or `import` declaration
    General(Node<'t>),
    /// `type_spec` or `type_alias`
    TypeSpec(Node<'t>),
    /// Struct field or interface method
    Field(Node<'t>),
}

impl<'t> Decl<'t> {
    fn classify(node: Node<'t>) -> Option<Self> {
        match node.kind() {
            "type_declaration" | "var_declaration" | "const_declaration" | "import_declaration" => {
                Some(Decl::General(node))
            }
            "type_spec" | "type_alias" => Some(Decl::TypeSpec(node)),
            "field_declaration" | "method_elem" | "method_spec" => Some(Decl::Field(node)),
            _ => None,
        }
    }
}

/// Attribution state carried through the walk of one file
#[derive(Debug, Default)]
struct WalkState {
    /// The exported type whose fields are being recorded
    type_name: Option<String>,
    /// Doc of the last general declaration, for the next uncommented spec
    pending_doc: String,
}

struct Context<'a> {
    import_path: &'a str,
    doc: Option<&'a DocPackage>,
    comments: &'a mut CommentMap,
}

impl Context<'_> {
    fn walk_file(&mut self, file: &GoFile) {
        let index = CommentIndex::new(&file.source, &file.tree);
        let mut state = WalkState::default();
        self.walk(&file.source, &index, file.tree.root_node(), &mut state);
    }

    fn walk(&mut self, source: &str, index: &CommentIndex, node: Node, state: &mut WalkState) {
        match Decl::classify(node) {
            Some(Decl::General(decl)) => {
                state.pending_doc = group_text(index.lead_comment(decl));
            }
            Some(Decl::TypeSpec(spec)) => self.visit_type_spec(source, index, spec, state),
            Some(Decl::Field(field)) => self.visit_field(source, index, field, state),
            None => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(source, index, child, state);
        }
    }

    fn visit_type_spec(
        &mut self,
        source: &str,
        index: &CommentIndex,
        spec: Node,
        state: &mut WalkState,
    ) {
        let Some(name) = spec.child_by_field_name("name") else {
            return;
        };
        let name = &source[name.byte_range()];
        if !is_exported(name) {
            state.type_name = None;
            return;
        }
        state.type_name = Some(name.to_string());

        // Only specs inside `type ( ... )` carry a doc comment of their own
        let mut text = if in_group(spec) {
            group_text(index.lead_comment(spec))
        } else {
            String::new()
        };
        if text.is_empty() && !state.pending_doc.is_empty() {
            text = std::mem::take(&mut state.pending_doc);
        }

        let text = match self.doc {
            Some(doc) => doc.synopsis(&text),
            None => text.trim().to_string(),
        };
        if !text.is_empty() {
            self.comments.insert(format!("{}.{}", self.import_path, name), text);
        }
    }

    fn visit_field(&mut self, source: &str, index: &CommentIndex, field: Node, state: &WalkState) {
        let mut text = group_text(index.lead_comment(field));
        if text.is_empty() {
            text = group_text(index.line_comment(field));
        }
        let text = text.trim();

        let Some(type_name) = &state.type_name else {
            return;
        };
        if text.is_empty() {
            return;
        }

        let mut cursor = field.walk();
        for name in field.children_by_field_name("name", &mut cursor) {
            let name = &source[name.byte_range()];
            if is_exported(name) {
                self.comments.insert(
                    format!("{}.{}.{}", self.import_path, type_name, name),
                    text.to_string(),
                );
            }
        }
    }
}

/// Whether a type spec sits inside a parenthesised `type ( ... )` group
fn in_group(spec: Node) -> bool {
    let Some(parent) = spec.parent() else {
        return false;
    };
    let mut cursor = parent.walk();
    parent.children(&mut cursor).any(|c| c.kind() == "(")
}
