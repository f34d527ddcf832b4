//! Command line configuration

use crate::format::{Gofmt, SourceFormatter, SyntaxCheck};
use crate::output::Output;
use crate::GenerateOptions;
use figue as args;
use mapcomments_core::{CommentMode, DirLoader, GoListLoader, PackageLoader};
use std::path::{Path, PathBuf};

pub const DEFAULT_PACKAGE: &str = "main";
pub const DEFAULT_OUTPUT: &str = "commentmap_gen.go";

/// Generate a Go map from doc comments of exported types and fields
#[derive(Debug, facet::Facet)]
pub struct Args {
    /// Go packages to read (import paths or ./relative directories)
    #[facet(args::positional)]
    pub packages: Vec<String>,

    /// Package name of the generated file (default: main)
    #[facet(args::named, args::short = 'P', default)]
    pub package: Option<String>,

    /// Output file, `-` for stdout (default: commentmap_gen.go)
    #[facet(args::named, args::short = 'W', default)]
    pub output: Option<String>,

    /// Record whole type comments instead of their first sentence
    #[facet(args::named, default)]
    pub with_full_comment: bool,

    /// Start the generated file with the MPL-2.0 license notice
    #[facet(args::named, default)]
    pub mpl2: bool,

    /// Package loader: go, dir (default: go)
    #[facet(args::named, default)]
    pub loader: Option<String>,

    /// Formatter for the generated file: gofmt, check (default: gofmt)
    #[facet(args::named, default)]
    pub formatter: Option<String>,

    /// Log what is being loaded and walked
    #[facet(args::named, args::short = 'v', default)]
    pub verbose: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no packages given. Usage: mapcomments [OPTIONS] <PACKAGES>...")]
    NoPackages,

    #[error("unknown loader `{0}` (expected `go` or `dir`)")]
    UnknownLoader(String),

    #[error("unknown formatter `{0}` (expected `gofmt` or `check`)")]
    UnknownFormatter(String),
}

/// How packages are found and parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderKind {
    /// `go list`, honouring build constraints and the module graph
    #[default]
    Go,
    /// The main module on disk, no toolchain needed
    Dir,
}

impl LoaderKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "go" | "golist" => Some(Self::Go),
            "dir" => Some(Self::Dir),
            _ => None,
        }
    }

    /// A loader resolving relative paths from `dir`
    pub fn loader(self, dir: &Path) -> Box<dyn PackageLoader> {
        match self {
            Self::Go => Box::new(GoListLoader::new().dir(dir)),
            Self::Dir => Box::new(DirLoader::new(dir)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterKind {
    #[default]
    Gofmt,
    Check,
}

impl FormatterKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gofmt" => Some(Self::Gofmt),
            "check" | "none" => Some(Self::Check),
            _ => None,
        }
    }

    pub fn formatter(self) -> Box<dyn SourceFormatter> {
        match self {
            Self::Gofmt => Box::new(Gofmt::new()),
            Self::Check => Box::new(SyntaxCheck),
        }
    }
}

impl TryFrom<Args> for GenerateOptions {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.packages.is_empty() {
            return Err(ConfigError::NoPackages);
        }

        let loader = match args.loader.as_deref() {
            None => LoaderKind::default(),
            Some(s) => LoaderKind::from_str(s).ok_or_else(|| ConfigError::UnknownLoader(s.into()))?,
        };
        let formatter = match args.formatter.as_deref() {
            None => FormatterKind::default(),
            Some(s) => {
                FormatterKind::from_str(s).ok_or_else(|| ConfigError::UnknownFormatter(s.into()))?
            }
        };
        let output = match args.output.as_deref() {
            Some(s) => Output::from(s),
            None => Output::File(PathBuf::from(DEFAULT_OUTPUT)),
        };

        Ok(GenerateOptions {
            packages: args.packages,
            package: args.package.unwrap_or_else(|| DEFAULT_PACKAGE.to_string()),
            output,
            mode: CommentMode::from(args.with_full_comment),
            mpl2: args.mpl2,
            loader,
            formatter,
            dir: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(packages: &[&str]) -> Args {
        Args {
            packages: packages.iter().map(|p| p.to_string()).collect(),
            package: None,
            output: None,
            with_full_comment: false,
            mpl2: false,
            loader: None,
            formatter: None,
            verbose: false,
        }
    }

    #[test]
    fn test_defaults() {
        let options = GenerateOptions::try_from(args(&["./schema"])).unwrap();
        assert_eq!(options.packages, vec!["./schema".to_string()]);
        assert_eq!(options.package, "main");
        assert_eq!(options.output, Output::File(PathBuf::from("commentmap_gen.go")));
        assert_eq!(options.mode, CommentMode::Synopsis);
        assert_eq!(options.loader, LoaderKind::Go);
        assert_eq!(options.formatter, FormatterKind::Gofmt);
        assert!(!options.mpl2);
    }

    #[test]
    fn test_overrides() {
        let mut a = args(&["example.com/a", "example.com/b"]);
        a.package = Some("schema".into());
        a.output = Some("-".into());
        a.with_full_comment = true;
        a.mpl2 = true;
        a.loader = Some("DIR".into());
        a.formatter = Some("check".into());

        let options = GenerateOptions::try_from(a).unwrap();
        assert_eq!(options.package, "schema");
        assert_eq!(options.output, Output::Stdout);
        assert_eq!(options.mode, CommentMode::Full);
        assert_eq!(options.loader, LoaderKind::Dir);
        assert_eq!(options.formatter, FormatterKind::Check);
        assert!(options.mpl2);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            GenerateOptions::try_from(args(&[])),
            Err(ConfigError::NoPackages)
        ));

        let mut a = args(&["./x"]);
        a.loader = Some("bazel".into());
        assert!(matches!(
            GenerateOptions::try_from(a),
            Err(ConfigError::UnknownLoader(l)) if l == "bazel"
        ));

        let mut a = args(&["./x"]);
        a.formatter = Some("prettier".into());
        assert!(matches!(
            GenerateOptions::try_from(a),
            Err(ConfigError::UnknownFormatter(_))
        ));
    }
}
