//! mapcomments - Generate a Go map from doc comments of exported types and fields
//!
//! Harvests the doc comments of one or more Go packages with
//! [`mapcomments_core`], renders them as
//! `var CommentMap = map[string]string{...}` and writes the result, formatted,
//! to a file or stdout. The generated map is typically fed to JSON schema
//! reflection to fill in descriptions.

pub mod config;
pub mod format;
pub mod output;
pub mod render;

pub use config::{Args, ConfigError, FormatterKind, LoaderKind};
pub use format::{FormatError, Gofmt, SourceFormatter, SyntaxCheck};
pub use output::Output;
pub use render::{go_quote, render_comment_map};

use mapcomments_core::{CommentMap, CommentMode, Harvester, PackageLoader};
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything one run of the generator needs
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Package paths, harvested in order
    pub packages: Vec<String>,
    /// Package clause of the generated file
    pub package: String,
    pub output: Output,
    pub mode: CommentMode,
    /// Prepend the MPL-2.0 license notice
    pub mpl2: bool,
    pub loader: LoaderKind,
    pub formatter: FormatterKind,
    /// Directory relative package paths are resolved from (default: the
    /// working directory)
    pub dir: Option<PathBuf>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            package: config::DEFAULT_PACKAGE.to_string(),
            output: Output::File(PathBuf::from(config::DEFAULT_OUTPUT)),
            mode: CommentMode::default(),
            mpl2: false,
            loader: LoaderKind::default(),
            formatter: FormatterKind::default(),
            dir: None,
        }
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub packages: usize,
    pub entries: usize,
    pub output: Output,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Harvest(#[from] mapcomments_core::Error),

    #[error("failed to render comment map: {0}")]
    Render(#[from] minijinja::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("failed to {action}: {source}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },
}

/// Harvest, render, format and write, with the loader and formatter picked
/// by `options`.
pub fn generate(options: &GenerateOptions) -> Result<GenerateReport, GenerateError> {
    let dir = match &options.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|source| GenerateError::Io {
            action: "determine the working directory".to_string(),
            source,
        })?,
    };
    debug!(
        loader = ?options.loader,
        formatter = ?options.formatter,
        dir = %dir.display(),
        "generating comment map"
    );

    generate_with(
        options,
        options.loader.loader(&dir),
        options.formatter.formatter(),
    )
}

/// Like [`generate`], with an explicit loader and formatter.
///
/// The output is only touched once every package has been harvested and
/// the source has been formatted, so a failed run leaves it as it was.
pub fn generate_with<L, F>(
    options: &GenerateOptions,
    loader: L,
    formatter: F,
) -> Result<GenerateReport, GenerateError>
where
    L: PackageLoader,
    F: SourceFormatter,
{
    let mut comments = CommentMap::new();
    Harvester::new(loader).harvest_all(&mut comments, &options.packages, options.mode)?;

    let source = render_comment_map(&options.package, &comments, options.mpl2)?;
    let source = formatter.format(&source)?;

    options
        .output
        .write(&source)
        .map_err(|source| GenerateError::Io {
            action: format!("write {}", options.output),
            source,
        })?;
    info!("wrote {} entries to {}", comments.len(), options.output);

    Ok(GenerateReport {
        packages: options.packages.len(),
        entries: comments.len(),
        output: options.output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use mapcomments_core::MemoryPackages;

    fn packages() -> MemoryPackages {
        MemoryPackages::new()
            .add(
                "example.com/app/config",
                "config.go",
                indoc! {r#"
                    package config

                    // Config holds the settings. It is loaded at startup.
                    type Config struct {
                        // Listen is the address to bind.
                        Listen string `json:"listen"`
                        Debug  bool   // Debug enables verbose logs.
                    }
                "#},
            )
            .add(
                "example.com/app/broken",
                "broken.go",
                "package broken\n\ntype Broken struct {\n",
            )
    }

    fn options(dir: &std::path::Path, packages: &[&str]) -> GenerateOptions {
        GenerateOptions {
            packages: packages.iter().map(|p| p.to_string()).collect(),
            output: Output::File(dir.join("commentmap_gen.go")),
            formatter: FormatterKind::Check,
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn test_generate_writes_sorted_map() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), &["example.com/app/config"]);

        let report = generate_with(&options, packages(), SyntaxCheck).unwrap();
        assert_eq!(report.entries, 3);
        assert_eq!(report.packages, 1);

        let written = std::fs::read_to_string(dir.path().join("commentmap_gen.go")).unwrap();
        assert_eq!(
            written,
            indoc! {r#"
                // Code generated by mapcomments. DO NOT EDIT.

                package main

                var CommentMap = map[string]string{
                	"example.com/app/config.Config": "Config holds the settings.",
                	"example.com/app/config.Config.Debug": "Debug enables verbose logs.",
                	"example.com/app/config.Config.Listen": "Listen is the address to bind.",
                }
            "#}
        );
    }

    #[test]
    fn test_failed_harvest_leaves_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("commentmap_gen.go");
        std::fs::write(&target, "previous").unwrap();

        let options = options(dir.path(), &["example.com/app/config", "example.com/app/broken"]);
        let err = generate_with(&options, packages(), SyntaxCheck).unwrap_err();

        assert!(matches!(err, GenerateError::Harvest(_)));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "previous");
    }

    #[test]
    fn test_failed_format_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path(), &["example.com/app/config"]);
        options.package = "not a name".to_string();

        let err = generate_with(&options, packages(), SyntaxCheck).unwrap_err();
        assert!(matches!(err, GenerateError::Format(FormatError::Syntax(_))));
        assert!(!dir.path().join("commentmap_gen.go").exists());
    }

    #[test]
    fn test_reserved_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), &["std"]);

        let err = generate_with(&options, packages(), SyntaxCheck).unwrap_err();
        assert_eq!(err.to_string(), "invalid path \"std\": path cannot be a reserved name");
    }
}
