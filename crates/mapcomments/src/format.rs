//! Formatting of generated Go source

use mapcomments_core::PackageDiagnostic;
use mapcomments_core::syntax::{parse_go, syntax_errors};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The source is not valid Go.
    #[error("generated source does not parse:\n{0}")]
    Syntax(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} produced invalid UTF-8")]
    Utf8 { program: String },
}

/// Turns rendered source into its final form, or rejects it.
pub trait SourceFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

impl<F: SourceFormatter + ?Sized> SourceFormatter for &F {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        (**self).format(source)
    }
}

impl<F: SourceFormatter + ?Sized> SourceFormatter for Box<F> {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        (**self).format(source)
    }
}

/// Pipes the source through `gofmt`.
#[derive(Debug, Clone)]
pub struct Gofmt {
    program: PathBuf,
}

impl Default for Gofmt {
    fn default() -> Self {
        Self::new()
    }
}

impl Gofmt {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("gofmt"),
        }
    }

    /// Use a specific `gofmt` binary instead of the one on `PATH`.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl SourceFormatter for Gofmt {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let spawn_err = |source| FormatError::Spawn {
            program: self.program_name(),
            source,
        };

        debug!(program = %self.program.display(), "formatting generated source");
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // gofmt reads all of stdin before writing anything
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).map_err(spawn_err)?;
        }
        let out = child.wait_with_output().map_err(spawn_err)?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(FormatError::Syntax(
                stderr.trim_end().replace("<standard input>", "generated"),
            ));
        }

        String::from_utf8(out.stdout).map_err(|_| FormatError::Utf8 {
            program: self.program_name(),
        })
    }
}

/// Rejects source that tree-sitter cannot parse, without reformatting it.
///
/// Used when no Go toolchain is around. Output differs from `gofmt` only in
/// whitespace alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxCheck;

impl SourceFormatter for SyntaxCheck {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let tree = parse_go(source)
            .ok_or_else(|| FormatError::Syntax("could not parse generated source".into()))?;

        let errors = syntax_errors(Path::new("generated"), source, &tree);
        if !errors.is_empty() {
            let joined: Vec<String> = errors.iter().map(PackageDiagnostic::to_string).collect();
            return Err(FormatError::Syntax(joined.join("\n")));
        }

        let mut formatted = source.trim_end().to_string();
        formatted.push('\n');
        Ok(formatted)
    }
}
