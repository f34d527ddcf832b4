//! Package loaders
//!
//! A loader turns a package path into a [`Package`]: its import path, its
//! parsed files and whatever went wrong along the way. Problems with the
//! package itself (it does not exist, a file has a syntax error, the module
//! cannot be resolved) are reported inside the package; [`LoadError`] is
//! reserved for the loader failing to do its job at all.

use crate::package::{DiagnosticKind, ModuleError, Package, PackageDiagnostic};
use crate::syntax::parse_file;
use facet::Facet;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// The loader could not produce a package at all.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("failed to decode `go list` output: {0}")]
    Decode(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a package path to its parsed files.
pub trait PackageLoader {
    fn load(&self, path: &str) -> Result<Package, LoadError>;
}

impl<L: PackageLoader + ?Sized> PackageLoader for &L {
    fn load(&self, path: &str) -> Result<Package, LoadError> {
        (**self).load(path)
    }
}

impl<L: PackageLoader + ?Sized> PackageLoader for Box<L> {
    fn load(&self, path: &str) -> Result<Package, LoadError> {
        (**self).load(path)
    }
}

/// Read and parse `files`, recording syntax errors on the package.
fn add_files(pkg: &mut Package, files: impl IntoIterator<Item = PathBuf>) -> Result<(), LoadError> {
    for path in files {
        let source = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        })?;
        add_source(pkg, path, source);
    }
    Ok(())
}

fn add_source(pkg: &mut Package, path: PathBuf, source: String) {
    debug!("parsing {}", path.display());
    let (file, diagnostics) = parse_file(path, source);
    pkg.errors.extend(diagnostics);
    if let Some(file) = file {
        if pkg.name.is_empty() {
            if let Some(name) = file.package_name() {
                pkg.name = name.to_string();
            }
        }
        pkg.files.push(file);
    }
}

/// Loads packages through `go list -e -json`, so module resolution and build
/// constraints behave exactly like the Go toolchain.
#[derive(Debug, Clone)]
pub struct GoListLoader {
    go: PathBuf,
    dir: Option<PathBuf>,
}

impl Default for GoListLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GoListLoader {
    /// Use the `go` binary found on `PATH`, run in the current directory
    pub fn new() -> Self {
        Self {
            go: PathBuf::from("go"),
            dir: None,
        }
    }

    /// Use a specific `go` binary
    pub fn go(mut self, go: impl Into<PathBuf>) -> Self {
        self.go = go.into();
        self
    }

    /// Directory to run `go list` in (selects the main module)
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Facet)]
struct ListedPackage {
    #[facet(rename = "Dir", default)]
    dir: String,
    #[facet(rename = "ImportPath", default)]
    import_path: String,
    #[facet(rename = "Name", default)]
    name: String,
    #[facet(rename = "GoFiles", default)]
    go_files: Vec<String>,
    #[facet(rename = "CgoFiles", default)]
    cgo_files: Vec<String>,
    #[facet(rename = "Error", default)]
    error: Option<ListedError>,
    #[facet(rename = "Module", default)]
    module: Option<ListedModule>,
}

#[derive(Debug, Facet)]
struct ListedError {
    #[facet(rename = "Pos", default)]
    pos: String,
    #[facet(rename = "Err", default)]
    err: String,
}

#[derive(Debug, Facet)]
struct ListedModule {
    #[facet(rename = "Path", default)]
    path: String,
    #[facet(rename = "Error", default)]
    error: Option<ListedModuleError>,
}

#[derive(Debug, Facet)]
struct ListedModuleError {
    #[facet(rename = "Err", default)]
    err: String,
}

impl PackageLoader for GoListLoader {
    fn load(&self, path: &str) -> Result<Package, LoadError> {
        let program = self.go.display().to_string();
        let mut cmd = Command::new(&self.go);
        cmd.args(["list", "-e", "-json", "--", path]);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        debug!("running {} list -e -json -- {}", program, path);
        let output = cmd.output().map_err(|source| LoadError::Spawn {
            program: program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(LoadError::Command {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let listed = decode_listed(&stdout)?;
        package_from_listing(listed, self.dir.as_deref())
    }
}

fn decode_listed(json: &str) -> Result<ListedPackage, LoadError> {
    facet_json::from_str::<ListedPackage>(json.trim()).map_err(|e| LoadError::Decode(e.to_string()))
}

fn package_from_listing(listed: ListedPackage, cwd: Option<&Path>) -> Result<Package, LoadError> {
    let mut pkg = Package::new(listed.import_path);
    pkg.name = listed.name;

    if let Some(module) = listed.module {
        debug!("package {} belongs to module {}", pkg.import_path, module.path);
        pkg.module_error = module.error.map(|e| ModuleError::new(e.err));
    }

    if !listed.dir.is_empty() {
        let dir = match cwd {
            Some(cwd) => cwd.join(&listed.dir),
            None => PathBuf::from(&listed.dir),
        };
        let files = listed
            .go_files
            .iter()
            .chain(&listed.cgo_files)
            .map(|f| dir.join(f))
            .collect::<Vec<_>>();
        pkg.dir = Some(dir);
        add_files(&mut pkg, files)?;
    }

    if let Some(error) = listed.error {
        // `go list` reports the first syntax error too; keep ours, which are complete
        let parse_reported = pkg.errors.iter().any(|e| e.kind == DiagnosticKind::Parse);
        if !(parse_reported && !error.pos.is_empty()) {
            pkg.errors.insert(
                0,
                PackageDiagnostic::new(error.pos, error.err.trim_end(), DiagnosticKind::List),
            );
        }
    }

    Ok(pkg)
}

const NO_GO_MOD: &str = "go.mod file not found in current directory or any parent directory";

/// Loads packages straight from disk, resolving import paths against the
/// nearest `go.mod`. Does not need the Go toolchain, but ignores build
/// constraints.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    /// Resolve relative paths and the main module from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PackageLoader for DirLoader {
    fn load(&self, path: &str) -> Result<Package, LoadError> {
        let is_dir_path = path == "."
            || path == ".."
            || path.starts_with("./")
            || path.starts_with("../")
            || Path::new(path).is_absolute();

        let (dir, import_path, module_error) = if is_dir_path {
            let dir = normalize(&self.root.join(path));
            match find_module(&dir) {
                Some((module_dir, module_path)) => {
                    let import_path = import_path_in_module(&module_path, &module_dir, &dir)
                        .unwrap_or_else(|| path.to_string());
                    (dir, import_path, None)
                }
                None => (dir, path.to_string(), Some(ModuleError::new(NO_GO_MOD))),
            }
        } else {
            let Some((module_dir, module_path)) = find_module(&normalize(&self.root)) else {
                let mut pkg = Package::new(path);
                pkg.module_error = Some(ModuleError::new(NO_GO_MOD));
                return Ok(pkg);
            };
            let rest = if path == module_path {
                Some("")
            } else {
                path.strip_prefix(&module_path)
                    .and_then(|r| r.strip_prefix('/'))
            };
            let Some(rest) = rest else {
                let mut pkg = Package::new(path);
                pkg.errors.push(PackageDiagnostic::unpositioned(
                    format!("package {path} is not in the main module ({module_path})"),
                    DiagnosticKind::List,
                ));
                return Ok(pkg);
            };
            (module_dir.join(rest), path.to_string(), None)
        };

        debug!("loading {} from {}", import_path, dir.display());
        let mut pkg = Package::new(import_path);
        pkg.module_error = module_error;

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                pkg.errors.push(PackageDiagnostic::unpositioned(
                    format!("cannot find package {:?} in {}: {}", path, dir.display(), e),
                    DiagnosticKind::List,
                ));
                return Ok(pkg);
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && is_package_file(p))
            .collect();
        files.sort();

        if files.is_empty() {
            pkg.errors.push(PackageDiagnostic::unpositioned(
                format!("no Go files in {}", dir.display()),
                DiagnosticKind::List,
            ));
        }

        add_files(&mut pkg, files)?;
        pkg.dir = Some(dir);
        Ok(pkg)
    }
}

/// `*.go`, but not tests and not files the go tool ignores (`_x.go`, `.x.go`)
fn is_package_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('_')
        && !name.starts_with('.')
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Walk up from `dir` to the nearest `go.mod` and return its directory and
/// module path.
fn find_module(dir: &Path) -> Option<(PathBuf, String)> {
    dir.ancestors().find_map(|candidate| {
        let contents = std::fs::read_to_string(candidate.join("go.mod")).ok()?;
        let module = parse_module_path(&contents)?;
        Some((candidate.to_path_buf(), module))
    })
}

/// The path of the `module` directive of a go.mod file
fn parse_module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with([' ', '\t']) {
            return None;
        }
        let path = rest.trim().trim_matches(|c| c == '"' || c == '`');
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn import_path_in_module(module_path: &str, module_dir: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(module_dir).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        Some(module_path.to_string())
    } else {
        Some(format!("{}/{}", module_path, parts.join("/")))
    }
}

/// Packages held in memory (useful for testing, or when sources come from
/// somewhere other than a file system).
#[derive(Debug, Clone, Default)]
pub struct MemoryPackages {
    packages: BTreeMap<String, Vec<(String, String)>>,
}

impl MemoryPackages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the package with the given import path
    pub fn add(
        mut self,
        import_path: impl Into<String>,
        file_name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        self.packages
            .entry(import_path.into())
            .or_default()
            .push((file_name.into(), source.into()));
        self
    }
}

impl PackageLoader for MemoryPackages {
    fn load(&self, path: &str) -> Result<Package, LoadError> {
        let mut pkg = Package::new(path);
        let Some(files) = self.packages.get(path) else {
            pkg.errors.push(PackageDiagnostic::unpositioned(
                format!("cannot find package {path:?}"),
                DiagnosticKind::List,
            ));
            return Ok(pkg);
        };

        for (name, source) in files {
            add_source(&mut pkg, PathBuf::from(name), source.clone());
        }
        Ok(pkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_parse_module_path() {
        assert_eq!(
            parse_module_path("// comment\nmodule example.com/m // trailing\n\ngo 1.22\n"),
            Some("example.com/m".to_string())
        );
        assert_eq!(
            parse_module_path("module \"example.com/quoted\"\n"),
            Some("example.com/quoted".to_string())
        );
        assert_eq!(parse_module_path("go 1.22\n"), None);
        assert_eq!(parse_module_path("modulefoo\n"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/./c/../d")), PathBuf::from("/a/b/d"));
    }

    #[test]
    fn test_dir_loader_relative_path() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "go.mod", "module example.com/m\n\ngo 1.22\n");
        write(temp.path(), "widgets/widget.go", "package widgets\n\ntype Widget struct{}\n");
        write(temp.path(), "widgets/widget_test.go", "package widgets\n");
        write(temp.path(), "widgets/_ignored.go", "package nope\n");

        let pkg = DirLoader::new(temp.path()).load("./widgets").unwrap();
        assert!(!pkg.has_errors(), "{:?}", pkg.errors);
        assert_eq!(pkg.import_path, "example.com/m/widgets");
        assert_eq!(pkg.name, "widgets");
        assert_eq!(pkg.files.len(), 1);
    }

    #[test]
    fn test_dir_loader_import_path() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "go.mod", "module example.com/m\n");
        write(temp.path(), "a/b/b.go", "package b\n");

        let pkg = DirLoader::new(temp.path()).load("example.com/m/a/b").unwrap();
        assert!(!pkg.has_errors(), "{:?}", pkg.errors);
        assert_eq!(pkg.import_path, "example.com/m/a/b");
        assert_eq!(pkg.files.len(), 1);

        let outside = DirLoader::new(temp.path()).load("example.com/other").unwrap();
        assert_eq!(outside.errors.len(), 1);
        assert_eq!(outside.errors[0].kind, DiagnosticKind::List);
    }

    #[test]
    fn test_dir_loader_without_module() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "p/p.go", "package p\n");

        let pkg = DirLoader::new(temp.path()).load("./p").unwrap();
        assert!(pkg.module_error.is_some());
        assert!(pkg.has_errors());
    }

    #[test]
    fn test_dir_loader_empty_dir() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "go.mod", "module example.com/m\n");
        std::fs::create_dir_all(temp.path().join("empty")).unwrap();

        let pkg = DirLoader::new(temp.path()).load("./empty").unwrap();
        assert_eq!(pkg.errors.len(), 1);
        assert!(pkg.errors[0].msg.starts_with("no Go files in"));
    }

    #[test]
    fn test_memory_packages() {
        let loader = MemoryPackages::new().add("example.com/p", "p.go", "package p\n");

        let pkg = loader.load("example.com/p").unwrap();
        assert!(!pkg.has_errors());
        assert_eq!(pkg.name, "p");

        let missing = loader.load("example.com/q").unwrap();
        assert_eq!(missing.errors[0].to_string(), "cannot find package \"example.com/q\"");
    }

    #[test]
    fn test_decode_go_list_output() {
        let json = indoc! {r#"
            {
            	"Dir": "/nonexistent/widgets",
            	"ImportPath": "example.com/m/widgets",
            	"Name": "widgets",
            	"Module": {
            		"Path": "example.com/m",
            		"Main": true,
            		"Dir": "/nonexistent",
            		"GoMod": "/nonexistent/go.mod",
            		"GoVersion": "1.22"
            	},
            	"Match": ["./widgets"],
            	"Stale": true
            }
        "#};
        let listed = decode_listed(json).unwrap();
        assert_eq!(listed.import_path, "example.com/m/widgets");
        assert_eq!(listed.name, "widgets");
        assert!(listed.go_files.is_empty());
        assert!(listed.error.is_none());

        let pkg = package_from_listing(listed, None).unwrap();
        assert!(!pkg.has_errors());
        assert_eq!(pkg.dir, Some(PathBuf::from("/nonexistent/widgets")));
    }

    #[test]
    fn test_go_list_errors_become_diagnostics() {
        let json = indoc! {r#"
            {
            	"ImportPath": "example.com/missing",
            	"Match": ["example.com/missing"],
            	"Incomplete": true,
            	"Error": {
            		"ImportStack": [],
            		"Pos": "",
            		"Err": "no required module provides package example.com/missing\n"
            	},
            	"Module": {
            		"Path": "example.com/m",
            		"Error": {"Err": "module lookup disabled"}
            	}
            }
        "#};
        let pkg = package_from_listing(decode_listed(json).unwrap(), None).unwrap();
        assert_eq!(pkg.errors.len(), 1);
        assert_eq!(pkg.errors[0].kind, DiagnosticKind::List);
        assert_eq!(
            pkg.errors[0].msg,
            "no required module provides package example.com/missing"
        );
        assert_eq!(
            pkg.module_error.as_ref().map(|m| m.err.as_str()),
            Some("module lookup disabled")
        );
    }

    #[test]
    fn test_go_list_syntax_error_defers_to_parser() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "broken.go", "package broken\n\ntype Broken struct {\n");

        let json = indoc! {r#"
            {
            	"Dir": ".",
            	"ImportPath": "example.com/broken",
            	"Name": "broken",
            	"GoFiles": ["broken.go"],
            	"Error": {
            		"Pos": "broken.go:4:1",
            		"Err": "expected '}', found 'EOF'"
            	}
            }
        "#};
        let pkg = package_from_listing(decode_listed(json).unwrap(), Some(temp.path())).unwrap();
        assert!(!pkg.errors.is_empty());
        assert!(
            pkg.errors.iter().all(|e| e.kind == DiagnosticKind::Parse),
            "{:?}",
            pkg.errors
        );
    }

    #[test]
    fn test_go_list_positioned_error_without_parse_errors() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a.go", "package a\n\nimport \"example.com/a\"\n");

        let json = indoc! {r#"
            {
            	"Dir": ".",
            	"ImportPath": "example.com/a",
            	"Name": "a",
            	"GoFiles": ["a.go"],
            	"Error": {
            		"Pos": "a.go:3:8",
            		"Err": "import cycle not allowed"
            	}
            }
        "#};
        let pkg = package_from_listing(decode_listed(json).unwrap(), Some(temp.path())).unwrap();
        assert_eq!(pkg.errors.len(), 1);
        assert_eq!(pkg.errors[0].kind, DiagnosticKind::List);
        assert_eq!(pkg.errors[0].to_string(), "a.go:3:8: import cycle not allowed");
    }
}
