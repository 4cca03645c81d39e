//! Error kinds introduced by the layers, and predicates that recognize them (as well
//! as the not-found kind coming from backends) anywhere in an `anyhow` chain.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Errors owned by this crate.
///
/// Everything else (host I/O failures, in-memory store failures) travels as
/// [`io::Error`] inside `anyhow::Error`, usually with context naming the operation.
#[derive(Error, Debug)]
pub enum FsError {
    /// A path-bearing operation was rejected. Used by the base directory layer for
    /// paths escaping the base (with a not-found source) and by tree copy.
    #[error("{op} {path}: {source}")]
    Path {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The path was already created or written through the same unique layer.
    #[error("trying to write {0} more than once")]
    NonUnique(String),

    /// The operation is disabled by the layer that received it.
    #[error("stdout print: open_file not supported")]
    NotSupported,

    /// Two failures reported together, e.g. a failed write and its failed cleanup.
    #[error("{first}; {second}")]
    Joined {
        first: anyhow::Error,
        second: anyhow::Error,
    },
}

impl FsError {
    pub(crate) fn not_found(op: &'static str, path: &str) -> Self {
        FsError::Path {
            op,
            path: path.to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        }
    }

    pub(crate) fn join(first: anyhow::Error, second: anyhow::Error) -> anyhow::Error {
        FsError::Joined { first, second }.into()
    }
}

/// Returns true if any cause of `err` satisfies `pred`, looking into both halves of
/// [`FsError::Joined`].
fn any_cause(err: &anyhow::Error, pred: &dyn Fn(&(dyn StdError + 'static)) -> bool) -> bool {
    err.chain().any(|cause| {
        if let Some(FsError::Joined { first, second }) = cause.downcast_ref::<FsError>() {
            return any_cause(first, pred) || any_cause(second, pred);
        }
        pred(cause)
    })
}

/// Returns the first [`io::ErrorKind`] found in the chain of `err`.
pub fn io_kind(err: &anyhow::Error) -> Option<io::ErrorKind> {
    for cause in err.chain() {
        if let Some(FsError::Joined { first, second }) = cause.downcast_ref::<FsError>() {
            return io_kind(first).or_else(|| io_kind(second));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
    }
    None
}

/// Returns true if `err` reports a missing path (including paths rejected by the
/// base directory layer).
pub fn is_not_found(err: &anyhow::Error) -> bool {
    any_cause(err, &|cause: &(dyn StdError + 'static)| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
    })
}

/// Returns true if `err` is a uniqueness violation.
pub fn is_non_unique(err: &anyhow::Error) -> bool {
    any_cause(err, &|cause: &(dyn StdError + 'static)| {
        matches!(cause.downcast_ref::<FsError>(), Some(FsError::NonUnique(_)))
    })
}

/// Returns true if `err` comes from an operation a layer refuses, like `open_file`
/// under the stdout print layer.
pub fn is_not_supported(err: &anyhow::Error) -> bool {
    any_cause(err, &|cause: &(dyn StdError + 'static)| {
        matches!(cause.downcast_ref::<FsError>(), Some(FsError::NotSupported))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_not_found_through_context() {
        let err = anyhow::Error::from(io::Error::from(io::ErrorKind::NotFound))
            .context("open 'x.txt'");
        assert!(is_not_found(&err));
        assert_eq!(io_kind(&err), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_not_found_path_error() {
        let err: anyhow::Error = FsError::not_found("open", "../x").into();
        assert!(is_not_found(&err));
        assert_eq!(err.to_string(), "open ../x: entity not found");
    }

    #[test]
    fn test_joined_keeps_both_kinds() {
        let write_err = anyhow::Error::from(io::Error::from(io::ErrorKind::InvalidInput));
        let cleanup_err: anyhow::Error = FsError::NonUnique("a.tmp".into()).into();
        let err = FsError::join(write_err, cleanup_err);

        assert!(is_non_unique(&err));
        assert!(!is_not_found(&err));
        assert_eq!(io_kind(&err), Some(io::ErrorKind::InvalidInput));
    }

    #[test]
    fn test_plain_errors_have_no_kind() {
        let err = anyhow!("boom");
        assert!(!is_not_found(&err));
        assert!(!is_non_unique(&err));
        assert!(!is_not_supported(&err));
        assert_eq!(io_kind(&err), None);

        let err: anyhow::Error = FsError::NotSupported.into();
        let err = err.context("write");
        assert!(is_not_supported(&err));
    }
}
