//! Cluster-wide guest operations addressed by VMID alone
//!
//! Each call first locates the guest through `cluster/resources`, then
//! forwards to the node-scoped [`Guests`] endpoint for its kind.

use super::{
    cluster::Cluster,
    guests::{Guests, Lxc, Qemu},
};
use crate::{
    client::Client,
    error::{Error, Result},
    types::{
        CloneParams, ClusterResource, ConfigMap, FilesystemInfo, GuestExec, GuestExecStatus, GuestStatus,
        MigrateParams, NetworkInterface, Snapshot, SnapshotParams, Upid, VmDetails, VmKind,
        VmListParams, VmLocation, VncProxyParams, VncTicket,
    },
};
use serde::Serialize;
use tracing::debug;

/// Guest operations that resolve the owning node automatically.
#[derive(Debug, Clone)]
pub struct Vms {
    pub(crate) client: Client,
}

impl Vms {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    fn guests(&self, location: &VmLocation) -> Guests {
        Guests::new(self.client.clone(), location.kind)
    }

    fn qemu(&self, location: &VmLocation, operation: &str) -> Result<Qemu> {
        match location.kind {
            VmKind::Qemu => Ok(Qemu::new(self.client.clone())),
            VmKind::Lxc => Err(Error::Unsupported(format!(
                "{operation} is not available for LXC container {}",
                location.vmid
            ))),
        }
    }

    /// Guests across the cluster matching `params`.
    pub async fn list(&self, params: &VmListParams) -> Result<Vec<ClusterResource>> {
        let mut resources = Cluster::new(self.client.clone())
            .resources(Some("vm"))
            .await?;
        resources.retain(|resource| params.matches(resource));
        Ok(resources)
    }

    /// Node and kind of guest `vmid`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no guest has that id.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, vmid: u32) -> Result<VmLocation> {
        let resources = Cluster::new(self.client.clone())
            .resources(Some("vm"))
            .await?;
        let location = resources
            .into_iter()
            .find_map(|resource| {
                let kind = resource.vm_kind()?;
                if resource.vmid != Some(vmid) {
                    return None;
                }
                Some(VmLocation {
                    vmid,
                    node: resource.node?,
                    kind,
                })
            })
            .ok_or_else(|| Error::NotFound(format!("VM {vmid}")))?;
        debug!(vmid, node = %location.node, kind = %location.kind, "Located guest");
        Ok(location)
    }

    /// Cluster resource entry of `vmid` merged with its current status.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, vmid: u32) -> Result<VmDetails> {
        let resources = Cluster::new(self.client.clone())
            .resources(Some("vm"))
            .await?;
        let resource = resources
            .into_iter()
            .find(|resource| resource.is_guest() && resource.vmid == Some(vmid))
            .ok_or_else(|| Error::NotFound(format!("VM {vmid}")))?;
        let location = match (resource.vm_kind(), resource.node.clone()) {
            (Some(kind), Some(node)) => VmLocation { vmid, node, kind },
            _ => return Err(Error::NotFound(format!("VM {vmid}"))),
        };
        let status = self
            .guests(&location)
            .status(&location.node, vmid)
            .await?;
        Ok(VmDetails {
            location,
            resource,
            status,
        })
    }

    /// Current status.
    pub async fn status(&self, vmid: u32) -> Result<GuestStatus> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).status(&loc.node, vmid).await
    }

    /// Start the guest.
    pub async fn start(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).start(&loc.node, vmid).await
    }

    /// Stop the guest immediately.
    pub async fn stop(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).stop(&loc.node, vmid).await
    }

    /// Shut the guest down cleanly.
    pub async fn shutdown(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).shutdown(&loc.node, vmid).await
    }

    /// Reboot the guest.
    pub async fn reboot(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).reboot(&loc.node, vmid).await
    }

    /// Suspend the guest.
    pub async fn suspend(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).suspend(&loc.node, vmid).await
    }

    /// Resume a suspended guest.
    pub async fn resume(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).resume(&loc.node, vmid).await
    }

    /// Destroy the guest and its disks.
    pub async fn delete(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).delete(&loc.node, vmid).await
    }

    /// Current configuration.
    pub async fn config(&self, vmid: u32) -> Result<ConfigMap> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).config(&loc.node, vmid).await
    }

    /// Change configuration keys.
    pub async fn update_config<C>(&self, vmid: u32, config: &C) -> Result<()>
    where
        C: Serialize + ?Sized,
    {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).update_config(&loc.node, vmid, config).await
    }

    /// Snapshots of the guest.
    pub async fn snapshots(&self, vmid: u32) -> Result<Vec<Snapshot>> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).snapshots(&loc.node, vmid).await
    }

    /// Take a snapshot.
    pub async fn create_snapshot(&self, vmid: u32, params: &SnapshotParams) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc)
            .create_snapshot(&loc.node, vmid, params)
            .await
    }

    /// Delete a snapshot.
    pub async fn delete_snapshot(&self, vmid: u32, snapname: &str) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc)
            .delete_snapshot(&loc.node, vmid, snapname)
            .await
    }

    /// Roll back to a snapshot.
    pub async fn rollback_snapshot(&self, vmid: u32, snapname: &str) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc)
            .rollback_snapshot(&loc.node, vmid, snapname)
            .await
    }

    /// Clone the guest.
    pub async fn clone_guest(&self, vmid: u32, params: &CloneParams) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).clone_guest(&loc.node, vmid, params).await
    }

    /// Grow a disk.
    pub async fn resize_disk(&self, vmid: u32, disk: &str, size: &str) -> Result<Option<Upid>> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc)
            .resize_disk(&loc.node, vmid, disk, size)
            .await
    }

    /// Move the guest to another node.
    pub async fn migrate(&self, vmid: u32, params: &MigrateParams) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).migrate(&loc.node, vmid, params).await
    }

    /// Open a VNC proxy to the guest console.
    pub async fn vnc_proxy(&self, vmid: u32, params: &VncProxyParams) -> Result<VncTicket> {
        let loc = self.locate(vmid).await?;
        self.guests(&loc).vnc_proxy(&loc.node, vmid, params).await
    }

    /// Network interfaces: from the guest agent for QEMU VMs, from the
    /// container runtime for LXC.
    pub async fn network_interfaces(&self, vmid: u32) -> Result<Vec<NetworkInterface>> {
        let loc = self.locate(vmid).await?;
        match loc.kind {
            VmKind::Qemu => {
                Qemu::new(self.client.clone())
                    .agent_network_interfaces(&loc.node, vmid)
                    .await
            }
            VmKind::Lxc => {
                let interfaces = Lxc::new(self.client.clone())
                    .interfaces(&loc.node, vmid)
                    .await?;
                Ok(interfaces.into_iter().map(Into::into).collect())
            }
        }
    }

    /// Mounted filesystems (QEMU only).
    pub async fn filesystem_info(&self, vmid: u32) -> Result<Vec<FilesystemInfo>> {
        let loc = self.locate(vmid).await?;
        self.qemu(&loc, "filesystem_info")?
            .agent_fsinfo(&loc.node, vmid)
            .await
    }

    /// Hard reset (QEMU only).
    pub async fn reset(&self, vmid: u32) -> Result<Upid> {
        let loc = self.locate(vmid).await?;
        self.qemu(&loc, "reset")?.reset(&loc.node, vmid).await
    }

    /// Start a command inside the guest (QEMU only).
    pub async fn guest_exec(&self, vmid: u32, command: &[&str]) -> Result<GuestExec> {
        let loc = self.locate(vmid).await?;
        self.qemu(&loc, "guest_exec")?
            .agent_exec(&loc.node, vmid, command)
            .await
    }

    /// Result of a command started with [`guest_exec`](Self::guest_exec)
    /// (QEMU only).
    pub async fn guest_exec_status(&self, vmid: u32, pid: u32) -> Result<GuestExecStatus> {
        let loc = self.locate(vmid).await?;
        self.qemu(&loc, "guest_exec_status")?
            .agent_exec_status(&loc.node, vmid, pid)
            .await
    }
}
