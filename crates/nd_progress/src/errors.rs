use thiserror::Error;

/// Errors that can occur when consuming progress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// The job ended without sending a terminal event.
    #[error("progress channel closed before the job finished")]
    ChannelClosed,

    /// The job was cancelled before all items completed.
    #[error("job cancelled after {completed}/{total} items")]
    Cancelled { completed: usize, total: usize },
}
