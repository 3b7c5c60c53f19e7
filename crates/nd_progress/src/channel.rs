use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::errors::ProgressError;
use crate::events::{ProgressEvent, ProgressStage};

/// Create a connected sender/stream pair.
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx: Some(tx) }, ProgressStream { rx })
}

/// Sending half. Sends never block and never fail: a dropped stream or a
/// disabled sender just discards the update.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSender {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("progress receiver dropped, discarding update");
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false)
    }
}

/// Receiving half. Ends once every sender is dropped.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressStream {
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Drain updates until a terminal event arrives, calling `on_event` for
    /// each one including the terminal event.
    pub async fn wait_finished<F>(mut self, mut on_event: F) -> Result<ProgressEvent, ProgressError>
    where
        F: FnMut(&ProgressEvent),
    {
        while let Some(event) = self.rx.recv().await {
            on_event(&event);
            match event.stage {
                ProgressStage::Finished => return Ok(event),
                ProgressStage::Cancelled => {
                    return Err(ProgressError::Cancelled {
                        completed: event.completed,
                        total: event.total,
                    })
                }
                ProgressStage::Started | ProgressStage::Item => {}
            }
        }
        Err(ProgressError::ChannelClosed)
    }
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn event(stage: ProgressStage, completed: usize) -> ProgressEvent {
        ProgressEvent {
            stage,
            completed,
            total: 2,
            subject: None,
            status: format!("{:?}", stage),
        }
    }

    #[tokio::test]
    async fn test_disabled_sender_discards() {
        let sender = ProgressSender::disabled();
        assert!(!sender.is_enabled());
        sender.send(event(ProgressStage::Item, 1));
    }

    #[tokio::test]
    async fn test_send_after_stream_dropped_is_ignored() {
        let (sender, stream) = progress_channel();
        assert!(sender.is_enabled());
        drop(stream);
        assert!(!sender.is_enabled());
        sender.send(event(ProgressStage::Item, 1));
    }

    #[tokio::test]
    async fn test_stream_yields_in_order() {
        let (sender, stream) = progress_channel();
        sender.send(event(ProgressStage::Started, 0));
        sender.send(event(ProgressStage::Item, 1));
        sender.send(event(ProgressStage::Finished, 2));
        drop(sender);

        let stages: Vec<_> = stream.map(|e| e.stage).collect().await;
        assert_eq!(
            stages,
            vec![ProgressStage::Started, ProgressStage::Item, ProgressStage::Finished]
        );
    }

    #[tokio::test]
    async fn test_wait_finished_reports_cancellation() {
        let (sender, stream) = progress_channel();
        sender.send(event(ProgressStage::Item, 1));
        sender.send(event(ProgressStage::Cancelled, 1));

        let mut seen = 0;
        let result = stream.wait_finished(|_| seen += 1).await;
        assert_eq!(result, Err(ProgressError::Cancelled { completed: 1, total: 2 }));
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn test_wait_finished_without_terminal_event() {
        let (sender, stream) = progress_channel();
        sender.send(event(ProgressStage::Item, 1));
        drop(sender);
        assert_eq!(stream.wait_finished(|_| {}).await, Err(ProgressError::ChannelClosed));
    }
}
