use crate::doc::DocError;
use crate::loader::LoadError;
use crate::package::PackageError;

/// Errors returned by [`Harvester::harvest`](crate::Harvester::harvest).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller precondition was violated
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The package path is a reserved name or a wildcard pattern
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The package loaded with syntax or module errors
    #[error(transparent)]
    PackageLoad(#[from] PackageError),

    /// The loader itself could not run
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The documentation view of the package could not be built
    #[error(transparent)]
    Doc(#[from] DocError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
