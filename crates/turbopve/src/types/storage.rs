//! Storage records

use super::{lenient, pve_bool};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// A storage definition from the cluster-wide `storage` list.
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// Storage id
    pub storage: String,
    /// Plugin type, e.g. `dir`, `lvmthin`, `zfspool`, `pbs`
    #[serde(rename = "type")]
    pub kind: String,
    /// Comma-separated content types
    #[serde(default)]
    pub content: Option<String>,
    /// Shared between nodes
    #[serde(default, with = "pve_bool::option")]
    pub shared: Option<bool>,
    /// Storage is disabled
    #[serde(default, with = "pve_bool::option")]
    pub disable: Option<bool>,
    /// Nodes the storage is restricted to
    #[serde(default)]
    pub nodes: Option<String>,
    /// Filesystem path (directory based storages)
    #[serde(default)]
    pub path: Option<String>,
    /// Backing pool (ZFS, Ceph)
    #[serde(default)]
    pub pool: Option<String>,
    /// Configuration digest
    #[serde(default)]
    pub digest: Option<String>,
}

impl Storage {
    /// Whether the storage accepts `content_type`.
    pub fn supports(&self, content_type: &str) -> bool {
        self.content
            .as_deref()
            .is_some_and(|c| c.split(',').any(|t| t.trim() == content_type))
    }
}

/// Status of a storage as seen from one node.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageStatus {
    /// Storage id
    #[serde(default)]
    pub storage: Option<String>,
    /// Plugin type
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Comma-separated content types
    #[serde(default)]
    pub content: Option<String>,
    /// Storage is active on this node
    #[serde(default, with = "pve_bool::option")]
    pub active: Option<bool>,
    /// Storage is enabled
    #[serde(default, with = "pve_bool::option")]
    pub enabled: Option<bool>,
    /// Shared between nodes
    #[serde(default, with = "pve_bool::option")]
    pub shared: Option<bool>,
    /// Size in bytes
    #[serde(default)]
    pub total: Option<u64>,
    /// Used bytes
    #[serde(default)]
    pub used: Option<u64>,
    /// Available bytes
    #[serde(default)]
    pub avail: Option<u64>,
}

impl StorageStatus {
    /// Used fraction of the total size, if known.
    pub fn usage(&self) -> Option<f64> {
        match (self.used, self.total) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64),
            _ => None,
        }
    }
}

/// A volume stored on a storage.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageContent {
    /// Volume id, e.g. `local:backup/vzdump-qemu-100.vma.zst`
    pub volid: String,
    /// Content type: `images`, `rootdir`, `iso`, `vztmpl`, `backup`, ...
    pub content: String,
    /// File format
    #[serde(default)]
    pub format: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Used bytes (thin volumes)
    #[serde(default)]
    pub used: Option<u64>,
    /// Owning guest
    #[serde(default, deserialize_with = "lenient::option")]
    pub vmid: Option<u32>,
    /// Creation time, seconds since the epoch
    #[serde(default)]
    pub ctime: Option<i64>,
    /// Notes (backups)
    #[serde(default)]
    pub notes: Option<String>,
    /// Protected against pruning
    #[serde(default, with = "pve_bool::option")]
    pub protected: Option<bool>,
    /// Base volume of a linked clone
    #[serde(default)]
    pub parent: Option<String>,
}

/// Filters for the storage list.
#[derive(Debug, Clone, Default, Serialize, Builder)]
#[builder(
    default,
    setter(into, strip_option),
    build_fn(error = "crate::error::Error")
)]
pub struct StorageListParams {
    /// Only storages of this plugin type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl StorageListParams {
    /// Create a new builder.
    pub fn builder() -> StorageListParamsBuilder {
        StorageListParamsBuilder::default()
    }
}
