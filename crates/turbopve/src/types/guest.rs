//! QEMU VM and LXC container records

use super::{ClusterResource, VmKind, lenient, pve_bool};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Entry of a node's `qemu` or `lxc` list.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestSummary {
    /// Guest id
    #[serde(deserialize_with = "lenient::number")]
    pub vmid: u32,
    /// Guest name or hostname
    #[serde(default)]
    pub name: Option<String>,
    /// `running`, `stopped`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// Guest type; the `qemu` list leaves it out, list helpers fill it in
    #[serde(default, rename = "type")]
    pub kind: Option<VmKind>,
    /// CPU usage
    #[serde(default)]
    pub cpu: Option<f64>,
    /// Configured CPUs
    #[serde(default)]
    pub cpus: Option<f64>,
    /// Used memory in bytes
    #[serde(default)]
    pub mem: Option<u64>,
    /// Memory size in bytes
    #[serde(default)]
    pub maxmem: Option<u64>,
    /// Disk size in bytes
    #[serde(default)]
    pub maxdisk: Option<u64>,
    /// Uptime in seconds
    #[serde(default)]
    pub uptime: Option<u64>,
    /// Guest is a template
    #[serde(default, with = "pve_bool::option")]
    pub template: Option<bool>,
    /// Semicolon-separated tags
    #[serde(default)]
    pub tags: Option<String>,
}

/// Current runtime status of a guest.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestStatus {
    /// Guest id
    #[serde(default, deserialize_with = "lenient::option")]
    pub vmid: Option<u32>,
    /// Guest name
    #[serde(default)]
    pub name: Option<String>,
    /// `running` or `stopped`
    pub status: String,
    /// Finer QEMU state, e.g. `paused`
    #[serde(default)]
    pub qmpstatus: Option<String>,
    /// Lock held on the guest (`backup`, `migrate`, ...)
    #[serde(default)]
    pub lock: Option<String>,
    /// CPU usage
    #[serde(default)]
    pub cpu: Option<f64>,
    /// Configured CPUs
    #[serde(default)]
    pub cpus: Option<f64>,
    /// Used memory in bytes
    #[serde(default)]
    pub mem: Option<u64>,
    /// Memory size in bytes
    #[serde(default)]
    pub maxmem: Option<u64>,
    /// Used disk in bytes
    #[serde(default)]
    pub disk: Option<u64>,
    /// Disk size in bytes
    #[serde(default)]
    pub maxdisk: Option<u64>,
    /// Bytes read from disk
    #[serde(default)]
    pub diskread: Option<u64>,
    /// Bytes written to disk
    #[serde(default)]
    pub diskwrite: Option<u64>,
    /// Bytes received
    #[serde(default)]
    pub netin: Option<u64>,
    /// Bytes sent
    #[serde(default)]
    pub netout: Option<u64>,
    /// Uptime in seconds
    #[serde(default)]
    pub uptime: Option<u64>,
    /// Process id on the host
    #[serde(default, deserialize_with = "lenient::option")]
    pub pid: Option<u32>,
    /// Guest agent is enabled (QEMU)
    #[serde(default, with = "pve_bool::option")]
    pub agent: Option<bool>,
    /// Guest is a template
    #[serde(default, with = "pve_bool::option")]
    pub template: Option<bool>,
}

impl GuestStatus {
    /// Whether the guest is running.
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Where a guest lives, as found through the cluster resource list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmLocation {
    /// Guest id
    pub vmid: u32,
    /// Node hosting the guest
    pub node: String,
    /// Guest type
    pub kind: VmKind,
}

/// Cluster resource entry merged with the current status.
#[derive(Debug, Clone)]
pub struct VmDetails {
    /// Location of the guest
    pub location: VmLocation,
    /// Cluster-wide resource entry
    pub resource: ClusterResource,
    /// Node-reported runtime status
    pub status: GuestStatus,
}

/// A guest snapshot. The pseudo snapshot `current` marks the live state.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Snapshot name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time, seconds since the epoch
    #[serde(default)]
    pub snaptime: Option<i64>,
    /// Parent snapshot
    #[serde(default)]
    pub parent: Option<String>,
    /// RAM state was included (QEMU)
    #[serde(default, with = "pve_bool::option")]
    pub vmstate: Option<bool>,
}

impl Snapshot {
    /// Whether this is the `current` pseudo snapshot.
    pub fn is_current(&self) -> bool {
        self.name == "current"
    }
}

/// Pending configuration change of a container.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingChange {
    /// Config key
    pub key: String,
    /// Active value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Value applied at next start
    #[serde(default)]
    pub pending: Option<serde_json::Value>,
    /// Key is scheduled for deletion
    #[serde(default, with = "pve_bool::option")]
    pub delete: Option<bool>,
}

/// Parameters for migrating a guest to another node.
#[derive(Debug, Clone, Serialize, Builder)]
#[builder(setter(into, strip_option), build_fn(error = "crate::error::Error"))]
pub struct MigrateParams {
    /// Target node
    pub target: String,

    /// Live migration (QEMU)
    #[builder(default)]
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,

    /// Migrate even with local resources attached (QEMU)
    #[builder(default)]
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,

    /// CIDR of the migration network
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_network: Option<String>,

    /// Bandwidth limit in KiB/s
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bwlimit: Option<u64>,

    /// Storage mapping on the target
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targetstorage: Option<String>,

    /// Also migrate local disks (QEMU)
    #[builder(default)]
    #[serde(
        rename = "with-local-disks",
        with = "pve_bool::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub with_local_disks: Option<bool>,

    /// Restart migration (LXC)
    #[builder(default)]
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,

    /// Shutdown timeout for restart migration in seconds (LXC)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl MigrateParams {
    /// Create a new builder.
    pub fn builder() -> MigrateParamsBuilder {
        MigrateParamsBuilder::default()
    }
}

/// Parameters for cloning a guest.
#[derive(Debug, Clone, Serialize, Builder)]
#[builder(setter(into, strip_option), build_fn(error = "crate::error::Error"))]
pub struct CloneParams {
    /// Id of the new guest
    pub newid: u32,

    /// Name of the new VM (QEMU)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Hostname of the new container (LXC)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Description of the new guest
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Full copy instead of a linked clone
    #[builder(default)]
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub full: Option<bool>,

    /// Target node
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Target storage for full clones
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    /// Add the new guest to this pool
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,

    /// Clone from this snapshot
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapname: Option<String>,
}

impl CloneParams {
    /// Create a new builder.
    pub fn builder() -> CloneParamsBuilder {
        CloneParamsBuilder::default()
    }
}

/// Parameters for creating a snapshot.
#[derive(Debug, Clone, Serialize, Builder)]
#[builder(setter(into, strip_option), build_fn(error = "crate::error::Error"))]
pub struct SnapshotParams {
    /// Snapshot name
    pub snapname: String,

    /// Description
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Include RAM state (QEMU)
    #[builder(default)]
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub vmstate: Option<bool>,
}

impl SnapshotParams {
    /// Create a new builder.
    pub fn builder() -> SnapshotParamsBuilder {
        SnapshotParamsBuilder::default()
    }
}

/// Parameters for opening a VNC proxy.
#[derive(Debug, Clone, Default, Serialize, Builder)]
#[builder(
    default,
    setter(into, strip_option),
    build_fn(error = "crate::error::Error")
)]
pub struct VncProxyParams {
    /// Prepare for a websocket upgrade
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub websocket: Option<bool>,

    /// Generate a one-time password (QEMU)
    #[serde(
        rename = "generate-password",
        with = "pve_bool::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub generate_password: Option<bool>,
}

impl VncProxyParams {
    /// Create a new builder.
    pub fn builder() -> VncProxyParamsBuilder {
        VncProxyParamsBuilder::default()
    }
}

/// Client-side filters for the cluster-wide guest list.
#[derive(Debug, Clone, Default, Builder)]
#[builder(
    default,
    setter(into, strip_option),
    build_fn(error = "crate::error::Error")
)]
pub struct VmListParams {
    /// Only guests on this node
    pub node: Option<String>,
    /// Only this guest type
    pub kind: Option<VmKind>,
    /// Only guests in this state, e.g. `running`
    pub status: Option<String>,
    /// Include templates (default: yes)
    pub templates: Option<bool>,
}

impl VmListParams {
    /// Create a new builder.
    pub fn builder() -> VmListParamsBuilder {
        VmListParamsBuilder::default()
    }

    /// Whether `resource` passes the filters.
    pub fn matches(&self, resource: &ClusterResource) -> bool {
        let Some(kind) = resource.vm_kind() else {
            return false;
        };
        if self.kind.is_some_and(|k| k != kind) {
            return false;
        }
        if let Some(node) = &self.node
            && resource.node.as_deref() != Some(node.as_str())
        {
            return false;
        }
        if let Some(status) = &self.status
            && resource.status.as_deref() != Some(status.as_str())
        {
            return false;
        }
        if self.templates == Some(false) && resource.template == Some(true) {
            return false;
        }
        true
    }
}

/// QEMU guest agent information.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentInfo {
    /// Agent version
    #[serde(default)]
    pub version: Option<String>,
    /// Commands the agent understands
    #[serde(default)]
    pub supported_commands: Vec<AgentCommand>,
}

impl AgentInfo {
    /// Whether `name` is supported and enabled.
    pub fn supports(&self, name: &str) -> bool {
        self.supported_commands
            .iter()
            .any(|c| c.name == name && c.enabled)
    }
}

/// A guest agent command.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentCommand {
    /// Command name
    pub name: String,
    /// Command is enabled
    #[serde(default)]
    pub enabled: bool,
    /// Command replies on success
    #[serde(default, rename = "success-response")]
    pub success_response: bool,
}

/// Network interface as reported inside the guest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkInterface {
    /// Interface name
    pub name: String,
    /// MAC address
    #[serde(default, rename = "hardware-address")]
    pub hardware_address: Option<String>,
    /// Assigned addresses
    #[serde(default, rename = "ip-addresses")]
    pub ip_addresses: Vec<IpAddress>,
}

/// An address of a [`NetworkInterface`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IpAddress {
    /// Address without prefix
    #[serde(rename = "ip-address")]
    pub ip_address: String,
    /// `ipv4` or `ipv6`
    #[serde(rename = "ip-address-type")]
    pub ip_address_type: String,
    /// Prefix length
    #[serde(default)]
    pub prefix: Option<u8>,
}

/// Network interface of a container (`lxc/{vmid}/interfaces`).
#[derive(Debug, Clone, Deserialize)]
pub struct LxcInterface {
    /// Interface name
    pub name: String,
    /// MAC address
    #[serde(default)]
    pub hwaddr: Option<String>,
    /// IPv4 address in CIDR notation
    #[serde(default)]
    pub inet: Option<String>,
    /// IPv6 address in CIDR notation
    #[serde(default)]
    pub inet6: Option<String>,
}

impl From<LxcInterface> for NetworkInterface {
    fn from(iface: LxcInterface) -> Self {
        let ip_addresses = [(iface.inet, "ipv4"), (iface.inet6, "ipv6")]
            .into_iter()
            .filter_map(|(cidr, family)| cidr.map(|c| split_cidr(&c, family)))
            .collect();

        Self {
            name: iface.name,
            hardware_address: iface.hwaddr,
            ip_addresses,
        }
    }
}

fn split_cidr(cidr: &str, family: &str) -> IpAddress {
    let (address, prefix) = match cidr.split_once('/') {
        Some((address, prefix)) => (address, prefix.parse().ok()),
        None => (cidr, None),
    };
    IpAddress {
        ip_address: address.to_string(),
        ip_address_type: family.to_string(),
        prefix,
    }
}

/// Mounted filesystem as reported by the guest agent.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesystemInfo {
    /// Device name
    pub name: String,
    /// Mount point
    pub mountpoint: String,
    /// Filesystem type
    #[serde(rename = "type")]
    pub kind: String,
    /// Size in bytes
    #[serde(default, rename = "total-bytes")]
    pub total_bytes: Option<u64>,
    /// Used bytes
    #[serde(default, rename = "used-bytes")]
    pub used_bytes: Option<u64>,
}

/// Handle of a command started through the guest agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GuestExec {
    /// Process id inside the guest
    pub pid: u32,
}

/// State of a command started through the guest agent.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestExecStatus {
    /// The process has finished
    #[serde(with = "pve_bool")]
    pub exited: bool,
    /// Exit code, once finished
    #[serde(default)]
    pub exitcode: Option<i32>,
    /// Terminating signal, if any
    #[serde(default)]
    pub signal: Option<i32>,
    /// Captured stdout
    #[serde(default, rename = "out-data")]
    pub out_data: Option<String>,
    /// Captured stderr
    #[serde(default, rename = "err-data")]
    pub err_data: Option<String>,
    /// Stdout was truncated
    #[serde(default, rename = "out-truncated", with = "pve_bool::option")]
    pub out_truncated: Option<bool>,
}
