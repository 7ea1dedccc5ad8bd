//! HTTP task dispatcher
//!
//! Delivers queued check tasks to the daemon's own check endpoint, the way
//! a hosted task queue would: one POST per attempt, the payload as body,
//! the task identity and attempt counter as headers.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use verifly_core::traits::{Task, TaskDispatcher};
use verifly_core::{Error, Result};

/// Header carrying the unique task name
pub const TASK_NAME_HEADER: &str = "X-Verifly-Task-Name";

/// Header carrying the number of previous attempts
pub const TASK_RETRY_COUNT_HEADER: &str = "X-Verifly-Task-Retry-Count";

/// Dispatches tasks by HTTP POST to `<target><task.path>`
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    target: String,
    client: reqwest::Client,
}

impl HttpDispatcher {
    /// Create a dispatcher posting to `target` (scheme, host and port)
    pub fn new(target: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            target: target.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url_for(&self, task: &Task) -> String {
        format!("{}{}", self.target, task.path)
    }
}

#[async_trait]
impl TaskDispatcher for HttpDispatcher {
    async fn dispatch(&self, task: &Task) -> Result<u16> {
        let url = self.url_for(task);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TASK_NAME_HEADER, &task.name)
            .header(TASK_RETRY_COUNT_HEADER, task.retry_count.to_string())
            .body(task.payload.clone())
            .send()
            .await
            .map_err(|e| Error::http(format!("Task delivery to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        debug!("Task {} delivered to {} ({})", task.name, url, status);

        Ok(status)
    }
}
