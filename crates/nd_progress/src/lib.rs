//! Progress reporting and cancellation shared by long-running jobs.
//!
//! A job owns a [`JobTracker`] and pushes a [`ProgressEvent`] after every
//! completed item. Consumers read them from a [`ProgressStream`]; a job built
//! with [`ProgressSender::disabled`] reports to nobody. Cancellation is a
//! [`CancellationToken`] the job checks between items.

pub mod channel;
pub mod errors;
pub mod events;
pub mod tracker;

pub use channel::{progress_channel, ProgressSender, ProgressStream};
pub use errors::ProgressError;
pub use events::{ProgressEvent, ProgressStage};
pub use tokio_util::sync::CancellationToken;
pub use tracker::{JobStatisticsReport, JobTracker};
