//! Error types for binder-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::item::ItemId;

/// Result type alias for binder operations
pub type Result<T> = std::result::Result<T, BinderError>;

/// Main error type for binder operations.
///
/// Structural errors are raised before any record is touched, so an `Err`
/// always means the tree is exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinderError {
    /// The operation references an unknown item
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// The requested parent does not exist, or the edit would form a cycle
    #[error("Invalid parent {parent} for item {item}")]
    InvalidParent { item: ItemId, parent: ItemId },

    /// Attempt to move, delete, split, or merge away a protected root item
    #[error("Illegal operation on root item: {0}")]
    IllegalRootOperation(ItemId),

    /// The item is not attached to the tree, so it has no siblings to work with
    #[error("Item is not attached to the tree: {0}")]
    Detached(ItemId),

    /// A custom metadata value does not match its registered field
    #[error("Invalid metadata for field '{field}': {message}")]
    InvalidMetadata { field: String, message: String },

    /// A snapshot could not be loaded
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The binder configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that reject a persisted snapshot outright.
///
/// Recoverable inconsistencies are repaired instead and listed in a
/// [`LoadReport`](crate::snapshot::LoadReport).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// A root id has no record
    #[error("Root item missing from snapshot: {0}")]
    MissingRoot(ItemId),

    /// No root of the Trash kind
    #[error("Snapshot has no trash root")]
    MissingTrash,

    /// A root record claims a parent
    #[error("Root item {0} has a parent")]
    RootHasParent(ItemId),

    /// Snapshot written by an incompatible version
    #[error("Unsupported snapshot version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    /// Snapshot JSON could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BinderError {
    fn from(err: serde_json::Error) -> Self {
        BinderError::Snapshot(SnapshotError::from(err))
    }
}
