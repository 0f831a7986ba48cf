//! Error types for the editor

use crate::executor::ExecutorError;
use crate::mutations::MutationError;
use crate::persistence::PersistenceError;
use screenkit_stream::StreamError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Action failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("No document loaded")]
    NoDocument,

    #[error("A save is already in flight")]
    SaveInProgress,

    #[error("Document has not been saved yet")]
    NotSaved,

    #[error("Publishing is blocked by {errors} validation error(s)")]
    PublishBlocked { errors: usize },

    #[error("Resolve the pending conflict first")]
    ConflictPending,

    #[error("No merge candidate is available")]
    NoMergeCandidate,

    #[error("No action executor configured")]
    NoExecutor,
}
