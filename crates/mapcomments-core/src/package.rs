//! Loaded Go packages and the aggregate error reported for broken ones

use arborium::tree_sitter::Tree;
use std::fmt;
use std::path::PathBuf;

/// A Go package as returned by a [`PackageLoader`](crate::PackageLoader).
///
/// Only names, files and syntax trees are populated: nothing is type-checked.
#[derive(Debug)]
pub struct Package {
    /// Package name from the `package` clause (may be empty if loading failed)
    pub name: String,
    /// Import path of the package, used as the prefix of every harvested key
    pub import_path: String,
    /// Directory the package lives in, if known
    pub dir: Option<PathBuf>,
    /// Parsed source files, in load order
    pub files: Vec<GoFile>,
    /// Diagnostics discovered while listing and parsing the package
    pub errors: Vec<PackageDiagnostic>,
    /// Failure to resolve the enclosing module
    pub module_error: Option<ModuleError>,
}

impl Package {
    /// Create an empty package for the given import path
    pub fn new(import_path: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            import_path: import_path.into(),
            dir: None,
            files: Vec::new(),
            errors: Vec::new(),
            module_error: None,
        }
    }

    /// Whether the loader reported anything that prevents harvesting
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.module_error.is_some()
    }
}

/// A parsed Go source file
pub struct GoFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

impl GoFile {
    /// The name declared by the file's `package` clause
    pub fn package_name(&self) -> Option<&str> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let clause = root
            .children(&mut cursor)
            .find(|c| c.kind() == "package_clause")?;
        let mut cursor = clause.walk();
        let ident = clause
            .children(&mut cursor)
            .find(|c| c.kind() == "package_identifier")?;
        Some(&self.source[ident.byte_range()])
    }
}

impl fmt::Debug for GoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoFile")
            .field("path", &self.path)
            .field("len", &self.source.len())
            .finish()
    }
}

/// Where a [`PackageDiagnostic`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The package could not be listed (missing, no Go files, ...)
    List,
    /// A source file has a syntax error
    Parse,
    /// Anything else
    Unknown,
}

/// A single problem found while loading a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDiagnostic {
    /// `file:line:col`, or empty when the problem has no position
    pub pos: String,
    pub msg: String,
    pub kind: DiagnosticKind,
}

impl PackageDiagnostic {
    pub fn new(pos: impl Into<String>, msg: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            pos: pos.into(),
            msg: msg.into(),
            kind,
        }
    }

    /// A diagnostic without a source position
    pub fn unpositioned(msg: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self::new("", msg, kind)
    }
}

impl fmt::Display for PackageDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pos.is_empty() {
            f.write_str(&self.msg)
        } else {
            write!(f, "{}: {}", self.pos, self.msg)
        }
    }
}

impl std::error::Error for PackageDiagnostic {}

/// The enclosing module could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleError {
    pub err: String,
}

impl ModuleError {
    pub fn new(err: impl Into<String>) -> Self {
        Self { err: err.into() }
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.err)
    }
}

/// Every diagnostic of a package that failed to load, plus its module error.
///
/// The message lists each diagnostic on its own line in discovery order,
/// followed by the module error. [`PackageError::errors`] gives access to the
/// individual diagnostics; the module error only shows up in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageError {
    errors: Vec<PackageDiagnostic>,
    module_error: Option<ModuleError>,
}

impl PackageError {
    /// Returns `None` for a package that loaded cleanly.
    pub fn from_package(pkg: &Package) -> Option<Self> {
        Self::new(pkg.errors.clone(), pkg.module_error.clone())
    }

    /// Returns `None` when there is nothing to report.
    pub fn new(errors: Vec<PackageDiagnostic>, module_error: Option<ModuleError>) -> Option<Self> {
        if errors.is_empty() && module_error.is_none() {
            return None;
        }
        Some(Self {
            errors,
            module_error,
        })
    }

    /// The constituent diagnostics, excluding the module error
    pub fn errors(&self) -> &[PackageDiagnostic] {
        &self.errors
    }

    pub fn module_error(&self) -> Option<&ModuleError> {
        self.module_error.as_ref()
    }

    /// Diagnostics of one kind, e.g. only syntax errors
    pub fn errors_of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &PackageDiagnostic> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self
            .errors
            .iter()
            .map(ToString::to_string)
            .chain(self.module_error.iter().map(|e| e.err.clone()));

        for (i, message) in messages.enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&message)?;
        }
        Ok(())
    }
}

impl std::error::Error for PackageError {}
