//! Cluster endpoints

use crate::{
    client::Client,
    error::Result,
    types::{ClusterResource, ClusterStatus, IndexEntry, Task},
};
use http::Method;

/// Cluster-wide status, resources and tasks.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub(crate) client: Client,
}

impl Cluster {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sub-paths below `cluster`.
    pub async fn index(&self) -> Result<Vec<IndexEntry>> {
        self.client.request(Method::GET, "cluster").send().await
    }

    /// Cluster and member node status.
    pub async fn status(&self) -> Result<Vec<ClusterStatus>> {
        self.client.request(Method::GET, "cluster/status").send().await
    }

    /// Status entries of the member nodes.
    pub async fn nodes(&self) -> Result<Vec<ClusterStatus>> {
        let mut entries = self.status().await?;
        entries.retain(ClusterStatus::is_node);
        Ok(entries)
    }

    /// All resources, or only those of `kind` (`vm`, `storage`, `node`,
    /// `sdn`) when given.
    pub async fn resources(&self, kind: Option<&str>) -> Result<Vec<ClusterResource>> {
        self.client
            .request(Method::GET, "cluster/resources")
            .param_opt("type", kind)
            .send()
            .await
    }

    /// Resources whose `type` is exactly `kind` (e.g. `qemu`), filtered
    /// locally.
    pub async fn resources_by_type(&self, kind: &str) -> Result<Vec<ClusterResource>> {
        let mut resources = self.resources(None).await?;
        resources.retain(|r| r.kind == kind);
        Ok(resources)
    }

    /// Recent tasks across the cluster.
    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.client.request(Method::GET, "cluster/tasks").send().await
    }
}
