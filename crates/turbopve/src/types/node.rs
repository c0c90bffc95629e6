//! Node records

use super::{lenient, pve_bool};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Entry of the node list.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    /// Node name
    pub node: String,
    /// `online`, `offline` or `unknown`
    #[serde(default)]
    pub status: Option<String>,
    /// CPU usage (fraction of `maxcpu`)
    #[serde(default)]
    pub cpu: Option<f64>,
    /// Available CPUs
    #[serde(default)]
    pub maxcpu: Option<u32>,
    /// Used memory in bytes
    #[serde(default)]
    pub mem: Option<u64>,
    /// Memory size in bytes
    #[serde(default)]
    pub maxmem: Option<u64>,
    /// Used root disk in bytes
    #[serde(default)]
    pub disk: Option<u64>,
    /// Root disk size in bytes
    #[serde(default)]
    pub maxdisk: Option<u64>,
    /// Uptime in seconds
    #[serde(default)]
    pub uptime: Option<u64>,
    /// Subscription level
    #[serde(default)]
    pub level: Option<String>,
    /// TLS certificate fingerprint
    #[serde(default)]
    pub ssl_fingerprint: Option<String>,
}

impl Node {
    /// Whether the node reports itself online.
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("online")
    }
}

/// Used/free/total triple reported for memory, swap and the root disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UsageStats {
    /// Total bytes
    #[serde(default)]
    pub total: u64,
    /// Used bytes
    #[serde(default)]
    pub used: u64,
    /// Free bytes
    #[serde(default)]
    pub free: u64,
}

/// CPU model summary.
#[derive(Debug, Clone, Deserialize)]
pub struct CpuInfo {
    /// Model name
    #[serde(default)]
    pub model: Option<String>,
    /// Logical CPUs
    #[serde(default)]
    pub cpus: Option<u32>,
    /// Sockets
    #[serde(default)]
    pub sockets: Option<u32>,
    /// Cores per socket
    #[serde(default)]
    pub cores: Option<u32>,
}

/// Runtime status of a node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    /// CPU usage
    #[serde(default)]
    pub cpu: Option<f64>,
    /// IO wait fraction
    #[serde(default)]
    pub wait: Option<f64>,
    /// Uptime in seconds
    #[serde(default)]
    pub uptime: Option<u64>,
    /// 1/5/15 minute load averages
    #[serde(default)]
    pub loadavg: Vec<String>,
    /// Kernel version string
    #[serde(default)]
    pub kversion: Option<String>,
    /// PVE manager version string
    #[serde(default)]
    pub pveversion: Option<String>,
    /// CPU details
    #[serde(default)]
    pub cpuinfo: Option<CpuInfo>,
    /// Memory usage
    #[serde(default)]
    pub memory: Option<UsageStats>,
    /// Swap usage
    #[serde(default)]
    pub swap: Option<UsageStats>,
    /// Root filesystem usage
    #[serde(default)]
    pub rootfs: Option<UsageStats>,
}

/// Subscription state of a node.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// `active`, `notfound`, `invalid`, ...
    pub status: String,
    /// Subscription level
    #[serde(default)]
    pub level: Option<String>,
    /// Product name
    #[serde(default)]
    pub productname: Option<String>,
    /// Next due date
    #[serde(default)]
    pub nextduedate: Option<String>,
    /// Server id bound to the key
    #[serde(default)]
    pub serverid: Option<String>,
    /// Last check, seconds since the epoch
    #[serde(default)]
    pub checktime: Option<i64>,
    /// Human-readable status message
    #[serde(default)]
    pub message: Option<String>,
}

/// Network counters of one guest interface.
#[derive(Debug, Clone, Deserialize)]
pub struct NetstatEntry {
    /// Guest id
    #[serde(deserialize_with = "lenient::number")]
    pub vmid: u32,
    /// Host-side device, e.g. `tap100i0`
    pub dev: String,
    /// Received bytes
    #[serde(default, rename = "in", deserialize_with = "lenient::option")]
    pub bytes_in: Option<u64>,
    /// Sent bytes
    #[serde(default, rename = "out", deserialize_with = "lenient::option")]
    pub bytes_out: Option<u64>,
}

/// Console ticket from `vncshell`, `vncproxy` or `termproxy`.
#[derive(Clone, Deserialize)]
pub struct VncTicket {
    /// One-time ticket for the websocket
    pub ticket: String,
    /// Proxy port
    #[serde(deserialize_with = "lenient::number")]
    pub port: u16,
    /// User the console runs as
    #[serde(default)]
    pub user: Option<String>,
    /// Task backing the console session
    #[serde(default)]
    pub upid: Option<super::Upid>,
    /// Server certificate (PEM)
    #[serde(default)]
    pub cert: Option<String>,
    /// VNC password, when one was generated
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for VncTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VncTicket")
            .field("ticket", &"[REDACTED]")
            .field("port", &self.port)
            .field("user", &self.user)
            .field("upid", &self.upid)
            .finish_non_exhaustive()
    }
}

/// `vzdump` backup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    /// Live snapshot
    Snapshot,
    /// Suspend the guest during the backup
    Suspend,
    /// Stop the guest during the backup
    Stop,
}

/// Parameters for a `vzdump` backup job.
#[derive(Debug, Clone, Default, Serialize, Builder)]
#[builder(
    default,
    setter(into, strip_option),
    build_fn(error = "crate::error::Error")
)]
pub struct VzdumpParams {
    /// Guest ids, comma-separated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmid: Option<String>,

    /// Back up every guest on the node
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,

    /// Backup mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<BackupMode>,

    /// Target storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    /// `0`, `gzip`, `lzo` or `zstd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<String>,

    /// Prune older backups according to the storage settings
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,

    /// Notification address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailto: Option<String>,

    /// `always` or `failure`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailnotification: Option<String>,

    /// Notes template for the backup
    #[serde(rename = "notes-template", skip_serializing_if = "Option::is_none")]
    pub notes_template: Option<String>,

    /// Mark the backup as protected
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,

    /// Retention settings, e.g. `keep-last=3`
    #[serde(rename = "prune-backups", skip_serializing_if = "Option::is_none")]
    pub prune_backups: Option<String>,

    /// Bandwidth limit in KiB/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bwlimit: Option<u64>,

    /// Back up the members of this pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,

    /// Zstd threads (`0` = half the cores)
    #[serde(rename = "zstd", skip_serializing_if = "Option::is_none")]
    pub zstd_threads: Option<u32>,
}

impl VzdumpParams {
    /// Create a new builder.
    pub fn builder() -> VzdumpParamsBuilder {
        VzdumpParamsBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_status_nested() {
        let status: NodeStatus = serde_json::from_value(json!({
            "cpu": 0.031,
            "uptime": 86400,
            "loadavg": ["0.10", "0.20", "0.30"],
            "memory": {"total": 1024, "used": 512, "free": 512},
            "cpuinfo": {"model": "AMD EPYC", "cpus": 16, "sockets": 1, "cores": 8, "mhz": "2400.000"},
            "pveversion": "pve-manager/8.2.4"
        }))
        .unwrap();

        assert_eq!(status.memory.unwrap().used, 512);
        assert_eq!(status.cpuinfo.unwrap().cpus, Some(16));
        assert_eq!(status.loadavg.len(), 3);
        assert!(status.swap.is_none());
    }

    #[test]
    fn test_netstat_string_counters() {
        let entries: Vec<NetstatEntry> = serde_json::from_value(json!([
            {"vmid": "100", "dev": "tap100i0", "in": "1024", "out": "2048"}
        ]))
        .unwrap();
        assert_eq!(entries[0].vmid, 100);
        assert_eq!(entries[0].bytes_in, Some(1024));
        assert_eq!(entries[0].bytes_out, Some(2048));
    }

    #[test]
    fn test_vnc_ticket_debug_redacts() {
        let ticket: VncTicket = serde_json::from_value(json!({
            "ticket": "PVEVNC:SECRET",
            "port": "5900",
            "user": "root@pam"
        }))
        .unwrap();
        assert_eq!(ticket.port, 5900);
        assert!(!format!("{ticket:?}").contains("SECRET"));
    }

    #[test]
    fn test_vzdump_params() {
        let params = VzdumpParams::builder()
            .vmid("100,101")
            .mode(BackupMode::Snapshot)
            .storage("backup")
            .compress("zstd")
            .notes_template("{{guestname}}")
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "vmid": "100,101",
                "mode": "snapshot",
                "storage": "backup",
                "compress": "zstd",
                "notes-template": "{{guestname}}"
            })
        );
    }
}
