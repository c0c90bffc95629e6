//! Node endpoints

use super::guests::Guests;
use crate::{
    client::Client,
    error::{Error, Result},
    types::{
        ConfigMap, GuestSummary, LogLine, NetstatEntry, Node, NodeStatus, RrdPoint,
        StorageStatus, Subscription, Task, TaskListParams, Timeframe, Upid, Version, VmKind,
        VncTicket, VzdumpParams,
    },
};
use http::Method;

/// Node-level operations.
#[derive(Debug, Clone)]
pub struct Nodes {
    pub(crate) client: Client,
}

impl Nodes {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// All cluster members.
    pub async fn list(&self) -> Result<Vec<Node>> {
        self.client.request(Method::GET, "nodes").send().await
    }

    /// One entry of [`list`](Self::list), looked up by name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no node has that name.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Node> {
        self.list()
            .await?
            .into_iter()
            .find(|node| node.node == name)
            .ok_or_else(|| Error::NotFound(format!("node '{name}'")))
    }

    /// Runtime status.
    #[tracing::instrument(skip(self))]
    pub async fn status(&self, name: &str) -> Result<NodeStatus> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "status"])
            .send()
            .await
    }

    /// PVE version running on the node.
    #[tracing::instrument(skip(self))]
    pub async fn version(&self, name: &str) -> Result<Version> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "version"])
            .send()
            .await
    }

    /// Node configuration.
    #[tracing::instrument(skip(self))]
    pub async fn config(&self, name: &str) -> Result<ConfigMap> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "config"])
            .send()
            .await
    }

    /// Subscription state.
    #[tracing::instrument(skip(self))]
    pub async fn subscription(&self, name: &str) -> Result<Subscription> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "subscription"])
            .send()
            .await
    }

    /// The last `lines` lines of the system log.
    #[tracing::instrument(skip(self))]
    pub async fn syslog(&self, name: &str, lines: u32) -> Result<Vec<LogLine>> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "syslog"])
            .param("limit", lines)
            .send()
            .await
    }

    /// Round-robin statistics for `timeframe`.
    #[tracing::instrument(skip(self))]
    pub async fn rrd_data(&self, name: &str, timeframe: Timeframe) -> Result<Vec<RrdPoint>> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "rrddata"])
            .param("timeframe", timeframe)
            .send()
            .await
    }

    /// Tasks that ran on the node.
    #[tracing::instrument(skip(self))]
    pub async fn tasks(&self, name: &str, params: &TaskListParams) -> Result<Vec<Task>> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "tasks"])
            .params(params)
            .send()
            .await
    }

    /// Reboot the node.
    #[tracing::instrument(skip(self))]
    pub async fn reboot(&self, name: &str) -> Result<()> {
        self.power_command(name, "reboot").await
    }

    /// Shut the node down.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self, name: &str) -> Result<()> {
        self.power_command(name, "shutdown").await
    }

    async fn power_command(&self, name: &str, command: &str) -> Result<()> {
        self.client
            .request_segments(Method::POST, ["nodes", name, "status"])
            .param("command", command)
            .send()
            .await
    }

    /// Storage status as seen from the node.
    #[tracing::instrument(skip(self))]
    pub async fn storage(&self, name: &str) -> Result<Vec<StorageStatus>> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "storage"])
            .send()
            .await
    }

    /// QEMU VMs on the node.
    pub async fn qemu_vms(&self, name: &str) -> Result<Vec<GuestSummary>> {
        Guests::new(self.client.clone(), VmKind::Qemu).list(name).await
    }

    /// LXC containers on the node.
    pub async fn lxc_containers(&self, name: &str) -> Result<Vec<GuestSummary>> {
        Guests::new(self.client.clone(), VmKind::Lxc).list(name).await
    }

    /// VMs and containers on the node, fetched concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn vms(&self, name: &str) -> Result<Vec<GuestSummary>> {
        let (mut vms, containers) =
            futures::try_join!(self.qemu_vms(name), self.lxc_containers(name))?;
        vms.extend(containers);
        Ok(vms)
    }

    /// Per-interface network counters of the node's guests.
    #[tracing::instrument(skip(self))]
    pub async fn netstat(&self, name: &str) -> Result<Vec<NetstatEntry>> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "netstat"])
            .send()
            .await
    }

    /// Open a VNC shell on the node.
    #[tracing::instrument(skip(self))]
    pub async fn vnc_shell(&self, name: &str) -> Result<VncTicket> {
        self.client
            .request_segments(Method::POST, ["nodes", name, "vncshell"])
            .send()
            .await
    }

    /// Start a backup job.
    #[tracing::instrument(skip(self))]
    pub async fn vzdump(&self, name: &str, params: &VzdumpParams) -> Result<Upid> {
        self.client
            .request_segments(Method::POST, ["nodes", name, "vzdump"])
            .params(params)
            .send()
            .await
    }

    /// Guest configuration stored inside a backup archive.
    #[tracing::instrument(skip(self))]
    pub async fn extract_vzdump_config(&self, name: &str, volume: &str) -> Result<String> {
        self.client
            .request_segments(Method::GET, ["nodes", name, "vzdump", "extractconfig"])
            .param("volume", volume)
            .send()
            .await
    }
}
