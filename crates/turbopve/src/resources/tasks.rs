//! Task endpoints

use crate::{
    client::Client,
    error::Result,
    types::{LogLine, Task, TaskListParams, TaskStatus, Upid, WaitOptions},
};
use http::Method;
use tracing::{debug, info};

/// Server-side tasks identified by [`Upid`].
#[derive(Debug, Clone)]
pub struct Tasks {
    pub(crate) client: Client,
}

impl Tasks {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Recent tasks across the cluster.
    pub async fn list(&self, params: &TaskListParams) -> Result<Vec<Task>> {
        self.client
            .request(Method::GET, "cluster/tasks")
            .params(params)
            .send()
            .await
    }

    /// Current status of a task.
    #[tracing::instrument(skip(self), fields(upid = %upid))]
    pub async fn status(&self, upid: &Upid) -> Result<TaskStatus> {
        let node = upid.node()?;
        self.client
            .request_segments(
                Method::GET,
                ["nodes", node.as_str(), "tasks", upid.as_str(), "status"],
            )
            .send()
            .await
    }

    /// Log lines `start..start + limit`.
    #[tracing::instrument(skip(self), fields(upid = %upid))]
    pub async fn log(&self, upid: &Upid, start: u32, limit: u32) -> Result<Vec<LogLine>> {
        let node = upid.node()?;
        self.client
            .request_segments(
                Method::GET,
                ["nodes", node.as_str(), "tasks", upid.as_str(), "log"],
            )
            .param("start", start)
            .param("limit", limit)
            .send()
            .await
    }

    /// Stop a running task.
    #[tracing::instrument(skip(self), fields(upid = %upid))]
    pub async fn stop(&self, upid: &Upid) -> Result<()> {
        let node = upid.node()?;
        self.client
            .request_segments(
                Method::DELETE,
                ["nodes", node.as_str(), "tasks", upid.as_str()],
            )
            .send()
            .await
    }

    /// Poll until the task stops.
    ///
    /// The wait honours the client context and `options.timeout`, whichever
    /// expires first.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`](crate::Error::Cancelled) when the deadline passes
    /// or the context is cancelled before the task stops.
    #[tracing::instrument(skip(self, options), fields(upid = %upid))]
    pub async fn wait(&self, upid: &Upid, options: &WaitOptions) -> Result<TaskStatus> {
        let mut ctx = self.client.context().clone();
        if let Some(timeout) = options.timeout {
            ctx = ctx.with_timeout(timeout);
        }
        let tasks = Tasks::new(self.client.with_context(ctx.clone()));

        loop {
            let status = tasks.status(upid).await?;
            if !status.is_running() {
                info!(
                    exitstatus = status.exitstatus.as_deref().unwrap_or(""),
                    "Task finished"
                );
                return Ok(status);
            }
            debug!(poll_interval = ?options.poll_interval, "Task still running");
            ctx.sleep(options.poll_interval).await?;
        }
    }
}
