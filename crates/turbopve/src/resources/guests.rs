//! Node-scoped QEMU VM and LXC container endpoints
//!
//! Both guest types share most of their API below
//! `nodes/{node}/{qemu|lxc}/{vmid}`; [`Guests`] implements the common part
//! for either kind and [`Qemu`] / [`Lxc`] add what only one of them has.

use crate::{
    client::Client,
    error::Result,
    http::RequestBuilder,
    types::{
        AgentInfo, CloneParams, ConfigMap, FilesystemInfo, GuestExec, GuestExecStatus,
        GuestStatus, GuestSummary, LxcInterface, MigrateParams, NetworkInterface, PendingChange,
        Snapshot, SnapshotParams, Upid, VmKind, VncProxyParams, VncTicket,
    },
};
use http::Method;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Operations common to QEMU VMs and LXC containers.
#[derive(Debug, Clone)]
pub struct Guests {
    pub(crate) client: Client,
    kind: VmKind,
}

impl Guests {
    pub(crate) fn new(client: Client, kind: VmKind) -> Self {
        Self { client, kind }
    }

    /// Guest type these operations address.
    pub fn kind(&self) -> VmKind {
        self.kind
    }

    fn guest_request(&self, method: Method, node: &str, vmid: u32, tail: &[&str]) -> RequestBuilder {
        let vmid = vmid.to_string();
        let mut segments = vec!["nodes", node, self.kind.as_str(), vmid.as_str()];
        segments.extend_from_slice(tail);
        self.client.request_segments(method, segments)
    }

    async fn status_command(&self, node: &str, vmid: u32, command: &str) -> Result<Upid> {
        self.guest_request(Method::POST, node, vmid, &["status", command])
            .send()
            .await
    }

    /// Guests of this kind on `node`.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn list(&self, node: &str) -> Result<Vec<GuestSummary>> {
        let mut guests: Vec<GuestSummary> = self
            .client
            .request_segments(Method::GET, ["nodes", node, self.kind.as_str()])
            .send()
            .await?;
        for guest in &mut guests {
            guest.kind.get_or_insert(self.kind);
        }
        Ok(guests)
    }

    /// Current runtime status.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn status(&self, node: &str, vmid: u32) -> Result<GuestStatus> {
        self.guest_request(Method::GET, node, vmid, &["status", "current"])
            .send()
            .await
    }

    /// Current configuration.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn config(&self, node: &str, vmid: u32) -> Result<ConfigMap> {
        self.guest_request(Method::GET, node, vmid, &["config"])
            .send()
            .await
    }

    /// Change configuration keys. `config` must serialize to an object.
    #[tracing::instrument(skip(self, config), fields(kind = %self.kind))]
    pub async fn update_config<C>(&self, node: &str, vmid: u32, config: &C) -> Result<()>
    where
        C: Serialize + ?Sized,
    {
        self.guest_request(Method::PUT, node, vmid, &["config"])
            .params(config)
            .send()
            .await
    }

    /// Start the guest.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn start(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "start").await
    }

    /// Stop the guest immediately.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn stop(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "stop").await
    }

    /// Ask the guest OS to shut down.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn shutdown(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "shutdown").await
    }

    /// Ask the guest OS to reboot.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn reboot(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "reboot").await
    }

    /// Suspend the guest.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn suspend(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "suspend").await
    }

    /// Resume a suspended guest.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn resume(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "resume").await
    }

    /// Destroy the guest and its disks.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.guest_request(Method::DELETE, node, vmid, &[])
            .send()
            .await
    }

    /// Migrate the guest to another node.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn migrate(&self, node: &str, vmid: u32, params: &MigrateParams) -> Result<Upid> {
        self.guest_request(Method::POST, node, vmid, &["migrate"])
            .params(params)
            .send()
            .await
    }

    /// Clone the guest.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn clone_guest(&self, node: &str, vmid: u32, params: &CloneParams) -> Result<Upid> {
        self.guest_request(Method::POST, node, vmid, &["clone"])
            .params(params)
            .send()
            .await
    }

    /// Grow a disk. `size` is absolute (`32G`) or relative (`+8G`).
    ///
    /// Returns the task id when the server runs the resize as a task.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn resize_disk(
        &self,
        node: &str,
        vmid: u32,
        disk: &str,
        size: &str,
    ) -> Result<Option<Upid>> {
        self.guest_request(Method::PUT, node, vmid, &["resize"])
            .param("disk", disk)
            .param("size", size)
            .send()
            .await
    }

    /// Snapshots, including the `current` pseudo snapshot.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn snapshots(&self, node: &str, vmid: u32) -> Result<Vec<Snapshot>> {
        self.guest_request(Method::GET, node, vmid, &["snapshot"])
            .send()
            .await
    }

    /// Take a snapshot.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn create_snapshot(
        &self,
        node: &str,
        vmid: u32,
        params: &SnapshotParams,
    ) -> Result<Upid> {
        self.guest_request(Method::POST, node, vmid, &["snapshot"])
            .params(params)
            .send()
            .await
    }

    /// Delete a snapshot.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete_snapshot(&self, node: &str, vmid: u32, snapname: &str) -> Result<Upid> {
        self.guest_request(Method::DELETE, node, vmid, &["snapshot", snapname])
            .send()
            .await
    }

    /// Roll the guest back to a snapshot.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn rollback_snapshot(&self, node: &str, vmid: u32, snapname: &str) -> Result<Upid> {
        self.guest_request(Method::POST, node, vmid, &["snapshot", snapname, "rollback"])
            .send()
            .await
    }

    /// Open a VNC proxy to the guest console.
    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn vnc_proxy(
        &self,
        node: &str,
        vmid: u32,
        params: &VncProxyParams,
    ) -> Result<VncTicket> {
        self.guest_request(Method::POST, node, vmid, &["vncproxy"])
            .params(params)
            .send()
            .await
    }
}

/// Guest agent replies wrap their payload in `result`.
#[derive(Deserialize)]
struct AgentReply<T> {
    result: T,
}

/// QEMU virtual machines.
#[derive(Debug, Clone)]
pub struct Qemu {
    pub(crate) guests: Guests,
}

impl Deref for Qemu {
    type Target = Guests;

    fn deref(&self) -> &Guests {
        &self.guests
    }
}

impl Qemu {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            guests: Guests::new(client, VmKind::Qemu),
        }
    }

    /// Hard reset, like pressing the reset button.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, node: &str, vmid: u32) -> Result<Upid> {
        self.status_command(node, vmid, "reset").await
    }

    /// Run a QEMU human monitor command and return its output.
    #[tracing::instrument(skip(self))]
    pub async fn monitor(&self, node: &str, vmid: u32, command: &str) -> Result<String> {
        self.guest_request(Method::POST, node, vmid, &["monitor"])
            .param("command", command)
            .send()
            .await
    }

    /// Guest agent version and supported commands.
    #[tracing::instrument(skip(self))]
    pub async fn agent_info(&self, node: &str, vmid: u32) -> Result<AgentInfo> {
        let reply: AgentReply<AgentInfo> = self
            .guest_request(Method::GET, node, vmid, &["agent", "info"])
            .send()
            .await?;
        Ok(reply.result)
    }

    /// Network interfaces as seen by the guest agent.
    #[tracing::instrument(skip(self))]
    pub async fn agent_network_interfaces(
        &self,
        node: &str,
        vmid: u32,
    ) -> Result<Vec<NetworkInterface>> {
        let reply: AgentReply<Vec<NetworkInterface>> = self
            .guest_request(Method::GET, node, vmid, &["agent", "network-get-interfaces"])
            .send()
            .await?;
        Ok(reply.result)
    }

    /// Mounted filesystems as seen by the guest agent.
    #[tracing::instrument(skip(self))]
    pub async fn agent_fsinfo(&self, node: &str, vmid: u32) -> Result<Vec<FilesystemInfo>> {
        let reply: AgentReply<Vec<FilesystemInfo>> = self
            .guest_request(Method::GET, node, vmid, &["agent", "get-fsinfo"])
            .send()
            .await?;
        Ok(reply.result)
    }

    /// Start a command inside the guest. `command[0]` is the program.
    #[tracing::instrument(skip(self))]
    pub async fn agent_exec(&self, node: &str, vmid: u32, command: &[&str]) -> Result<GuestExec> {
        self.guest_request(Method::POST, node, vmid, &["agent", "exec"])
            .param("command", command)
            .send()
            .await
    }

    /// State and output of a command started with [`agent_exec`](Self::agent_exec).
    #[tracing::instrument(skip(self))]
    pub async fn agent_exec_status(
        &self,
        node: &str,
        vmid: u32,
        pid: u32,
    ) -> Result<GuestExecStatus> {
        self.guest_request(Method::GET, node, vmid, &["agent", "exec-status"])
            .param("pid", pid)
            .send()
            .await
    }
}

/// LXC containers.
#[derive(Debug, Clone)]
pub struct Lxc {
    pub(crate) guests: Guests,
}

impl Deref for Lxc {
    type Target = Guests;

    fn deref(&self) -> &Guests {
        &self.guests
    }
}

impl Lxc {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            guests: Guests::new(client, VmKind::Lxc),
        }
    }

    /// Network interfaces of a running container.
    #[tracing::instrument(skip(self))]
    pub async fn interfaces(&self, node: &str, vmid: u32) -> Result<Vec<LxcInterface>> {
        self.guest_request(Method::GET, node, vmid, &["interfaces"])
            .send()
            .await
    }

    /// Open a terminal proxy to the container console.
    #[tracing::instrument(skip(self))]
    pub async fn termproxy(&self, node: &str, vmid: u32) -> Result<VncTicket> {
        self.guest_request(Method::POST, node, vmid, &["termproxy"])
            .send()
            .await
    }

    /// Configuration changes that take effect at the next start.
    #[tracing::instrument(skip(self))]
    pub async fn pending(&self, node: &str, vmid: u32) -> Result<Vec<PendingChange>> {
        self.guest_request(Method::GET, node, vmid, &["pending"])
            .send()
            .await
    }
}
