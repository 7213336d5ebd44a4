use super::{Command, ComputedLayerReceiver, LayerPipeline, StatusTransition};
use crate::error::PipelineError;
use crate::model::ComputedLayer;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Reply = oneshot::Sender<Result<(), PipelineError>>;

enum Message {
    Command(Command, Option<Reply>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Runs a [`LayerPipeline`] on its own task.
///
/// Commands are queued and applied strictly in submission order, one at a
/// time. Fire-and-forget commands that fail are logged.
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<Message>,
    output: ComputedLayerReceiver,
    events: broadcast::Sender<StatusTransition>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    /// Spawns the pipeline task. Must be called within a tokio runtime.
    pub fn spawn(pipeline: LayerPipeline) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = pipeline.subscribe();
        let events = pipeline.event_sender();
        let task = tokio::spawn(run(pipeline, rx));
        Self {
            tx,
            output,
            events,
            task,
        }
    }

    /// Queues a command without waiting for it.
    pub fn send(&self, command: Command) -> Result<(), PipelineError> {
        self.tx
            .send(Message::Command(command, None))
            .map_err(|_| PipelineError::Closed)
    }

    /// Queues a command and waits for its result.
    pub async fn apply(&self, command: Command) -> Result<(), PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Command(command, Some(reply)))
            .map_err(|_| PipelineError::Closed)?;
        rx.await.map_err(|_| PipelineError::Closed)?
    }

    /// Waits until every command submitted so far has been applied, then
    /// returns the computed value.
    pub async fn settled(&self) -> Result<Option<Arc<ComputedLayer>>, PipelineError> {
        let (done, rx) = oneshot::channel();
        self.tx
            .send(Message::Flush(done))
            .map_err(|_| PipelineError::Closed)?;
        rx.await.map_err(|_| PipelineError::Closed)?;
        Ok(self.current())
    }

    /// The last published value, without waiting.
    pub fn current(&self) -> Option<Arc<ComputedLayer>> {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> ComputedLayerReceiver {
        self.output.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<StatusTransition> {
        self.events.subscribe()
    }

    /// Stops the task after the queued commands have been applied.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "pipeline task ended abnormally");
        }
    }
}

async fn run(mut pipeline: LayerPipeline, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Command(command, reply) => {
                let name = command.name();
                let result = pipeline.apply(command).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            warn!(command = name, error = %e, "pipeline command failed");
                        }
                    }
                }
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
            Message::Shutdown => break,
        }
    }
    debug!("pipeline task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FeatureCache;
    use crate::fetch::FetcherRegistry;
    use crate::model::{LayerStatus, SimpleLayer};
    use crate::style::StyleEvaluator;
    use layerkit_expression::{Defines, ExpressionCache};

    fn handle() -> PipelineHandle {
        let cache = Arc::new(FeatureCache::new(Arc::new(FetcherRegistry::new())));
        let evaluator = StyleEvaluator::new(Arc::new(ExpressionCache::new()), Defines::new());
        PipelineHandle::spawn(LayerPipeline::new(cache, evaluator))
    }

    #[tokio::test]
    async fn test_settled_observes_queued_commands() {
        let handle = handle();
        handle
            .send(Command::SetLayer(Some(SimpleLayer::new("a").into())))
            .unwrap();
        let computed = handle.settled().await.unwrap().unwrap();
        assert_eq!(computed.id, "a");
        assert_eq!(computed.status, LayerStatus::Ready);

        handle.send(Command::SetLayer(None)).unwrap();
        assert!(handle.settled().await.unwrap().is_none());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_apply_returns_command_errors() {
        let handle = handle();
        let err = handle
            .apply(Command::DeleteFeatures(vec!["x".into()]))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::NoData);
        handle.shutdown().await;
    }
}
