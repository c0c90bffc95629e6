//! Cluster and task records

use super::{Upid, VmKind, lenient, pve_bool};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Entry of a directory-style index endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexEntry {
    /// Sub-path name
    #[serde(alias = "subdir")]
    pub name: String,
}

/// One entry of `cluster/status`: the cluster itself or a member node.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterStatus {
    /// `cluster` or `node`
    #[serde(rename = "type")]
    pub kind: String,
    /// Cluster or node name
    pub name: String,
    /// Entry id, e.g. `node/pve1`
    #[serde(default)]
    pub id: Option<String>,
    /// Node address
    #[serde(default)]
    pub ip: Option<String>,
    /// Node is online
    #[serde(default, with = "pve_bool::option")]
    pub online: Option<bool>,
    /// Node is the one that answered the request
    #[serde(default, with = "pve_bool::option")]
    pub local: Option<bool>,
    /// Corosync node id
    #[serde(default)]
    pub nodeid: Option<u32>,
    /// Subscription level
    #[serde(default)]
    pub level: Option<String>,
    /// Cluster has quorum
    #[serde(default, with = "pve_bool::option")]
    pub quorate: Option<bool>,
    /// Number of member nodes
    #[serde(default)]
    pub nodes: Option<u32>,
}

impl ClusterStatus {
    /// Whether this entry describes a node.
    pub fn is_node(&self) -> bool {
        self.kind == "node"
    }
}

/// One entry of `cluster/resources`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterResource {
    /// Resource id, e.g. `qemu/100` or `storage/pve1/local`
    pub id: String,
    /// `qemu`, `lxc`, `node`, `storage`, `pool`, `sdn`
    #[serde(rename = "type")]
    pub kind: String,
    /// Owning node
    #[serde(default)]
    pub node: Option<String>,
    /// Guest id
    #[serde(default, deserialize_with = "lenient::option")]
    pub vmid: Option<u32>,
    /// Guest name
    #[serde(default)]
    pub name: Option<String>,
    /// Runtime status
    #[serde(default)]
    pub status: Option<String>,
    /// CPU usage (fraction of `maxcpu`)
    #[serde(default)]
    pub cpu: Option<f64>,
    /// Available CPUs
    #[serde(default)]
    pub maxcpu: Option<f64>,
    /// Used memory in bytes
    #[serde(default)]
    pub mem: Option<u64>,
    /// Memory size in bytes
    #[serde(default)]
    pub maxmem: Option<u64>,
    /// Used disk space in bytes
    #[serde(default)]
    pub disk: Option<u64>,
    /// Disk size in bytes
    #[serde(default)]
    pub maxdisk: Option<u64>,
    /// Uptime in seconds
    #[serde(default)]
    pub uptime: Option<u64>,
    /// Guest is a template
    #[serde(default, with = "pve_bool::option")]
    pub template: Option<bool>,
    /// Storage id
    #[serde(default)]
    pub storage: Option<String>,
    /// Storage plugin type
    #[serde(default)]
    pub plugintype: Option<String>,
    /// Allowed storage content types
    #[serde(default)]
    pub content: Option<String>,
    /// Storage is shared between nodes
    #[serde(default, with = "pve_bool::option")]
    pub shared: Option<bool>,
    /// Resource pool
    #[serde(default)]
    pub pool: Option<String>,
    /// Semicolon-separated tags
    #[serde(default)]
    pub tags: Option<String>,
    /// HA state
    #[serde(default)]
    pub hastate: Option<String>,
}

impl ClusterResource {
    /// Guest type, for `qemu` and `lxc` entries.
    pub fn vm_kind(&self) -> Option<VmKind> {
        self.kind.parse().ok()
    }

    /// Whether the entry is a guest.
    pub fn is_guest(&self) -> bool {
        self.vm_kind().is_some()
    }
}

/// A task list entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    /// Task id
    pub upid: Upid,
    /// Node the task ran on
    #[serde(default)]
    pub node: Option<String>,
    /// Task type, e.g. `vzdump`
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Task object id
    #[serde(default)]
    pub id: Option<String>,
    /// Initiating user
    #[serde(default)]
    pub user: Option<String>,
    /// Final status (`OK` or an error), absent while running
    #[serde(default)]
    pub status: Option<String>,
    /// Start, seconds since the epoch
    #[serde(default)]
    pub starttime: Option<i64>,
    /// End, seconds since the epoch
    #[serde(default)]
    pub endtime: Option<i64>,
}

/// Status of a single task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    /// `running` or `stopped`
    pub status: String,
    /// Exit status once stopped: `OK`, `WARNINGS: n`, or an error message
    #[serde(default)]
    pub exitstatus: Option<String>,
    /// Task id
    #[serde(default)]
    pub upid: Option<Upid>,
    /// Node the task runs on
    #[serde(default)]
    pub node: Option<String>,
    /// Worker process id
    #[serde(default)]
    pub pid: Option<u32>,
    /// Task type
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Task object id
    #[serde(default)]
    pub id: Option<String>,
    /// Initiating user
    #[serde(default)]
    pub user: Option<String>,
    /// Start, seconds since the epoch
    #[serde(default)]
    pub starttime: Option<i64>,
}

impl TaskStatus {
    /// The task has not finished.
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }

    /// The task finished without error (warnings count as success).
    pub fn is_ok(&self) -> bool {
        !self.is_running()
            && self
                .exitstatus
                .as_deref()
                .is_some_and(|s| s == "OK" || s.starts_with("WARNINGS"))
    }
}

/// One numbered log line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogLine {
    /// Line number
    pub n: u64,
    /// Text
    pub t: String,
}

/// Filters for task listings.
#[derive(Debug, Clone, Default, Serialize, Builder)]
#[builder(
    default,
    setter(into, strip_option),
    build_fn(error = "crate::error::Error")
)]
pub struct TaskListParams {
    /// Offset into the list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,

    /// Maximum number of entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Only tasks of this user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userfilter: Option<String>,

    /// Only tasks of this type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typefilter: Option<String>,

    /// Only tasks for this guest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmid: Option<u32>,

    /// `archive`, `active` or `all`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Only tasks started after this time (epoch seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,

    /// Only tasks started before this time (epoch seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,

    /// Only failed tasks
    #[serde(
        with = "pve_bool::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub errors: Option<bool>,
}

impl TaskListParams {
    /// Create a new builder.
    pub fn builder() -> TaskListParamsBuilder {
        TaskListParamsBuilder::default()
    }
}

/// Polling behaviour of [`Tasks::wait`](crate::resources::Tasks::wait).
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(error = "crate::error::Error"))]
pub struct WaitOptions {
    /// Delay between status polls
    #[builder(default = "Duration::from_secs(1)")]
    pub poll_interval: Duration,

    /// Give up after this long; `None` waits as long as the client context
    /// allows
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

impl WaitOptions {
    /// Create a new builder.
    pub fn builder() -> WaitOptionsBuilder {
        WaitOptionsBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cluster_resource_guest_detection() {
        let resources: Vec<ClusterResource> = serde_json::from_value(json!([
            {"id": "qemu/100", "type": "qemu", "node": "pve1", "vmid": 100, "name": "web", "status": "running", "template": 0},
            {"id": "lxc/200", "type": "lxc", "node": "pve2", "vmid": "200", "status": "stopped"},
            {"id": "storage/pve1/local", "type": "storage", "node": "pve1", "storage": "local", "shared": 0}
        ]))
        .unwrap();

        assert_eq!(resources[0].vm_kind(), Some(VmKind::Qemu));
        assert_eq!(resources[1].vm_kind(), Some(VmKind::Lxc));
        assert_eq!(resources[1].vmid, Some(200));
        assert!(!resources[2].is_guest());
        assert_eq!(resources[2].shared, Some(false));
    }

    #[test]
    fn test_task_status() {
        let running: TaskStatus =
            serde_json::from_value(json!({"status": "running", "pid": 1234})).unwrap();
        assert!(running.is_running());
        assert!(!running.is_ok());

        let done: TaskStatus =
            serde_json::from_value(json!({"status": "stopped", "exitstatus": "OK"})).unwrap();
        assert!(done.is_ok());

        let warned: TaskStatus =
            serde_json::from_value(json!({"status": "stopped", "exitstatus": "WARNINGS: 2"}))
                .unwrap();
        assert!(warned.is_ok());

        let failed: TaskStatus = serde_json::from_value(
            json!({"status": "stopped", "exitstatus": "command 'qm start' failed"}),
        )
        .unwrap();
        assert!(!failed.is_ok());
    }

    #[test]
    fn test_task_list_params() {
        let params = TaskListParams::builder()
            .limit(50u32)
            .typefilter("vzdump")
            .errors(true)
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"limit": 50, "typefilter": "vzdump", "errors": 1})
        );
        assert_eq!(
            serde_json::to_value(TaskListParams::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_wait_options_defaults() {
        let options = WaitOptions::builder().build().unwrap();
        assert_eq!(options.poll_interval, Duration::from_secs(1));
        assert_eq!(options.timeout, None);

        let options = WaitOptions::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }
}
