//! Version and package endpoints

use crate::{
    client::Client,
    error::Result,
    types::{AptUpdate, PackageVersion, Version as VersionInfo},
};
use http::Method;

/// Version and package information.
#[derive(Debug, Clone)]
pub struct Version {
    pub(crate) client: Client,
}

impl Version {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Version of the API server.
    pub async fn get(&self) -> Result<VersionInfo> {
        self.client.request(Method::GET, "version").send().await
    }

    /// Package updates available on `node` (from the last `apt update`).
    #[tracing::instrument(skip(self))]
    pub async fn apt_updates(&self, node: &str) -> Result<Vec<AptUpdate>> {
        self.client
            .request_segments(Method::GET, ["nodes", node, "apt", "update"])
            .send()
            .await
    }

    /// Installed versions of PVE-related packages on `node`.
    #[tracing::instrument(skip(self))]
    pub async fn apt_versions(&self, node: &str) -> Result<Vec<PackageVersion>> {
        self.client
            .request_segments(Method::GET, ["nodes", node, "apt", "versions"])
            .send()
            .await
    }

    /// Changelog of `package` as plain text.
    #[tracing::instrument(skip(self))]
    pub async fn changelog(&self, node: &str, package: &str) -> Result<String> {
        self.client
            .request_segments(Method::GET, ["nodes", node, "apt", "changelog"])
            .param("name", package)
            .send()
            .await
    }
}
