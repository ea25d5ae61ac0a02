use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, Instrument};

/// Fire-and-forget submission of named background work.
pub trait TaskQueue: Send + Sync {
    fn submit(&self, task_name: &str, args: Value) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, args: Value) -> anyhow::Result<()>;
}

/// Runs each submitted task on its own tokio task; the submitter never waits.
#[derive(Default)]
pub struct TokioTaskQueue {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TokioTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task_name: &str, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(task_name.to_string(), handler);
    }
}

impl TaskQueue for TokioTaskQueue {
    fn submit(&self, task_name: &str, args: Value) -> anyhow::Result<()> {
        let handler = self
            .handlers
            .get(task_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown task {task_name}"))?;

        let span = tracing::info_span!("task", name = %task_name);
        let name = task_name.to_string();
        tokio::spawn(
            async move {
                debug!(%args, "task started");
                if let Err(e) = handler.run(args).await {
                    error!(error = %e, task = %name, "task failed");
                }
            }
            .instrument(span),
        );
        Ok(())
    }
}
