//! mapcomments-core - Harvest doc comments of exported Go types and fields
//!
//! This crate provides the building blocks for:
//! - Loading Go packages as syntax trees (through `go list`, straight from
//!   disk, or from memory)
//! - Attaching comments to the declarations they document, following the
//!   rules of the Go parser
//! - Collecting the comments of exported types and their exported fields into
//!   a [`CommentMap`] keyed by qualified name
//!
//! # Keys
//!
//! - `<import-path>.<Type>` for types
//! - `<import-path>.<Type>.<Field>` for struct fields and interface methods
//!
//! Type entries hold the synopsis (first sentence) of the doc comment unless
//! [`CommentMode::Full`] is requested; field entries always hold the full
//! comment.
//!
//! # Example
//!
//! ```
//! use mapcomments_core::{CommentMap, CommentMode, Harvester, MemoryPackages};
//!
//! let loader = MemoryPackages::new().add(
//!     "example.com/p",
//!     "widget.go",
//!     r#"package p
//!
//! // Widget represents a thing. It has more detail here.
//! type Widget struct {
//!     // Name is the label.
//!     Name string
//!     secret int
//! }
//! "#,
//! );
//!
//! let mut comments = CommentMap::new();
//! Harvester::new(loader)
//!     .harvest(&mut comments, "example.com/p", CommentMode::Synopsis)
//!     .unwrap();
//!
//! assert_eq!(comments["example.com/p.Widget"], "Widget represents a thing.");
//! assert_eq!(comments["example.com/p.Widget.Name"], "Name is the label.");
//! assert_eq!(comments.len(), 2);
//! ```

mod comments;
mod doc;
mod error;
mod harvest;
mod loader;
mod package;
pub mod syntax;

pub use comments::{CommentGroup, CommentIndex, group_text};
pub use doc::{DocError, DocPackage, first_sentence};
pub use error::{Error, Result};
pub use harvest::{CommentMap, CommentMode, Harvester, validate_path};
pub use loader::{DirLoader, GoListLoader, LoadError, MemoryPackages, PackageLoader};
pub use package::{
    DiagnosticKind, GoFile, ModuleError, Package, PackageDiagnostic, PackageError,
};
