//! Storage endpoints

use crate::{
    client::Client,
    error::{Error, Result},
    types::{
        RrdPoint, Storage as StorageDefinition, StorageContent, StorageListParams, StorageStatus,
        Timeframe, Upid,
    },
};
use bytes::Bytes;
use http::Method;

/// Storage pools and their content.
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) client: Client,
}

impl Storage {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Storage definitions.
    pub async fn list(&self, params: &StorageListParams) -> Result<Vec<StorageDefinition>> {
        self.client
            .request(Method::GET, "storage")
            .params(params)
            .send()
            .await
    }

    /// One storage definition, looked up by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no storage has that id.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<StorageDefinition> {
        self.list(&StorageListParams::default())
            .await?
            .into_iter()
            .find(|s| s.storage == name)
            .ok_or_else(|| Error::NotFound(format!("storage '{name}'")))
    }

    /// Volumes on `storage`, optionally only of one content type.
    #[tracing::instrument(skip(self))]
    pub async fn content(
        &self,
        node: &str,
        storage: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<StorageContent>> {
        self.client
            .request_segments(Method::GET, ["nodes", node, "storage", storage, "content"])
            .param_opt("content", content_type)
            .send()
            .await
    }

    /// Volumes whose content type is exactly `content_type`, filtered
    /// locally.
    pub async fn content_by_type(
        &self,
        node: &str,
        storage: &str,
        content_type: &str,
    ) -> Result<Vec<StorageContent>> {
        let mut content = self.content(node, storage, None).await?;
        content.retain(|item| item.content == content_type);
        Ok(content)
    }

    /// Usage of `storage` on `node`.
    #[tracing::instrument(skip(self))]
    pub async fn status(&self, node: &str, storage: &str) -> Result<StorageStatus> {
        self.client
            .request_segments(Method::GET, ["nodes", node, "storage", storage, "status"])
            .send()
            .await
    }

    /// Round-robin statistics for `timeframe`.
    #[tracing::instrument(skip(self))]
    pub async fn rrd_data(
        &self,
        node: &str,
        storage: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<RrdPoint>> {
        self.client
            .request_segments(Method::GET, ["nodes", node, "storage", storage, "rrddata"])
            .param("timeframe", timeframe)
            .send()
            .await
    }

    /// Delete a volume. Returns the task id when deletion runs as a task.
    #[tracing::instrument(skip(self))]
    pub async fn delete_content(
        &self,
        node: &str,
        storage: &str,
        volume: &str,
    ) -> Result<Option<Upid>> {
        self.client
            .request_segments(
                Method::DELETE,
                ["nodes", node, "storage", storage, "content", volume],
            )
            .send()
            .await
    }

    /// Download a single file out of a backup, verbatim.
    #[tracing::instrument(skip(self))]
    pub async fn file_restore_download(
        &self,
        node: &str,
        storage: &str,
        volume: &str,
        filepath: &str,
    ) -> Result<Bytes> {
        self.client
            .request_segments(
                Method::GET,
                ["nodes", node, "storage", storage, "file-restore", "download"],
            )
            .param("volume", volume)
            .param("filepath", filepath)
            .send_raw()
            .await
    }
}
