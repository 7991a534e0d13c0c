//! Error surface of the splice engine.

use thiserror::Error;

/// Errors produced by merge and unmerge operations.
///
/// Unmerging a target that was never merged into, or a source with no logged
/// entries, is deliberately not an error; see `SurfaceArena::unmerge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A merge-order hint pointed past the end of the destination collection.
    #[error("insertion index {index} out of bounds for a collection of length {len}")]
    InvalidIndex { index: usize, len: usize },

    /// A surface handle did not resolve.
    #[error("surface handle is stale")]
    MissingSurface,

    /// A node handle did not resolve, or a control was missing from the
    /// collection it was expected in.
    #[error("node handle is stale")]
    MissingNode,

    /// Source and target surfaces have different structural shapes.
    #[error("source and target surfaces have different shapes")]
    ShapeMismatch,

    /// A surface cannot be merged into itself.
    #[error("surface cannot be merged into itself")]
    SelfMerge,

    /// The source still has live entries in this target's provenance log.
    #[error("source surface is already merged into this target")]
    AlreadyMerged,

    /// A data-context override was supplied for a hierarchical merge.
    #[error("context overrides are only supported on flat surfaces")]
    ContextOverrideUnsupported,
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
