//! Version and package records

use serde::Deserialize;

/// API server version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    /// Full version, e.g. `8.2.4`
    pub version: String,
    /// Release, e.g. `8.2`
    pub release: String,
    /// Source repository id
    #[serde(default)]
    pub repoid: Option<String>,
    /// Default console viewer
    #[serde(default)]
    pub console: Option<String>,
}

impl Version {
    /// Major version number, when the version string starts with one.
    pub fn major(&self) -> Option<u32> {
        self.version.split('.').next()?.parse().ok()
    }
}

/// A pending package update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AptUpdate {
    /// Package name
    pub package: String,
    /// Candidate version
    pub version: String,
    /// Installed version
    #[serde(default)]
    pub old_version: Option<String>,
    /// Short description
    #[serde(default)]
    pub title: Option<String>,
    /// Package priority
    #[serde(default)]
    pub priority: Option<String>,
    /// Archive section
    #[serde(default)]
    pub section: Option<String>,
    /// Repository origin
    #[serde(default)]
    pub origin: Option<String>,
}

/// Installed version of a PVE-related package.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageVersion {
    /// Package name
    pub package: String,
    /// Installed or candidate version
    #[serde(default)]
    pub version: Option<String>,
    /// Previously installed version
    #[serde(default)]
    pub old_version: Option<String>,
    /// dpkg state, e.g. `Installed`
    #[serde(default)]
    pub current_state: Option<String>,
    /// Running kernel (only on the kernel entry)
    #[serde(default)]
    pub running_kernel: Option<String>,
    /// Short description
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_major() {
        let version: Version = serde_json::from_value(json!({
            "version": "8.2.4", "release": "8.2", "repoid": "faa83925c9641325"
        }))
        .unwrap();
        assert_eq!(version.major(), Some(8));
    }

    #[test]
    fn test_apt_update_pascal_case() {
        let updates: Vec<AptUpdate> = serde_json::from_value(json!([{
            "Package": "pve-manager",
            "Version": "8.2.5",
            "OldVersion": "8.2.4",
            "Title": "Proxmox Virtual Environment Management Tools",
            "Priority": "optional"
        }]))
        .unwrap();
        assert_eq!(updates[0].package, "pve-manager");
        assert_eq!(updates[0].old_version.as_deref(), Some("8.2.4"));
    }
}
