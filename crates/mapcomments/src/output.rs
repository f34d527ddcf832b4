//! Where the generated file goes

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Destination of the generated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl From<&str> for Output {
    /// `-` is stdout, anything else a file path
    fn from(s: &str) -> Self {
        match s {
            "-" => Output::Stdout,
            path => Output::File(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => f.write_str("<stdout>"),
            Output::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Output {
    /// Write `contents` in one go.
    ///
    /// Files are written to a temporary sibling and renamed over the target,
    /// so readers see either the old file or the complete new one.
    pub fn write(&self, contents: &str) -> io::Result<()> {
        match self {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(contents.as_bytes())?;
                stdout.flush()
            }
            Output::File(path) => write_atomic(path, contents),
        }
    }
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        assert_eq!(Output::from("-"), Output::Stdout);
        assert_eq!(
            Output::from("gen/commentmap_gen.go"),
            Output::File(PathBuf::from("gen/commentmap_gen.go"))
        );
    }

    #[test]
    fn test_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commentmap_gen.go");
        std::fs::write(&path, "old").unwrap();

        let output = Output::File(path.clone());
        output.write("package main\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "package main\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.go");
        Output::File(path.clone()).write("package main\n").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.go");
        assert!(Output::File(path.clone()).write("package main\n").is_err());
        assert!(!path.exists());
    }
}
