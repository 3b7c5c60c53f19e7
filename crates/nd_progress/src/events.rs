use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Started,
    Item,
    Cancelled,
    Finished,
}

impl ProgressStage {
    /// No further events follow a terminal stage.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStage::Cancelled | ProgressStage::Finished)
    }
}

/// One progress update. `completed` only counts finished items, never
/// started ones, and never decreases within a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub completed: usize,
    pub total: usize,
    /// Item this update is about (for example an article id), if any.
    pub subject: Option<String>,
    pub status: String,
}

impl ProgressEvent {
    /// Completed share in `[0, 1]`. An empty job counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}
