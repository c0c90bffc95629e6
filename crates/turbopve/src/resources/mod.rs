//! API resource endpoints
//!
//! One handle per API area. Handles are cheap clones of the client and map
//! method calls to paths and parameters; the shared pipeline does the rest.

pub mod access;
pub mod cluster;
pub mod guests;
pub mod nodes;
pub mod storage;
pub mod tasks;
pub mod version;
pub mod vms;

pub use access::Access;
pub use cluster::Cluster;
pub use guests::{Guests, Lxc, Qemu};
pub use nodes::Nodes;
pub use storage::Storage;
pub use tasks::Tasks;
pub use version::Version;
pub use vms::Vms;

use crate::client::Client;

/// Common surface of every resource handle.
pub trait Resource {
    /// The client, with its context, that this handle sends through.
    fn client(&self) -> &Client;
}

macro_rules! impl_resource {
    ($($name:ident => $($field:ident).+),+ $(,)?) => {
        $(
            impl Resource for $name {
                fn client(&self) -> &Client {
                    &self.$($field).+
                }
            }
        )+
    };
}

impl_resource!(
    Access => client,
    Cluster => client,
    Guests => client,
    Qemu => guests.client,
    Lxc => guests.client,
    Nodes => client,
    Storage => client,
    Tasks => client,
    Version => client,
    Vms => client,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use std::time::Duration;

    fn client() -> Client {
        Client::builder()
            .base_url("https://pve.example.com:8006")
            .auth(AuthConfig::token("root@pam", "ci", "secret"))
            .build()
            .expect("client")
    }

    fn handle_url<R: Resource>(handle: &R) -> String {
        handle.client().base_url().to_string()
    }

    #[test]
    fn test_every_handle_shares_client() {
        let client = client();
        let expected = client.base_url().to_string();
        let urls = [
            handle_url(&client.access()),
            handle_url(&client.cluster()),
            handle_url(&client.nodes()),
            handle_url(&client.qemu()),
            handle_url(&client.lxc()),
            handle_url(&client.vms()),
            handle_url(&client.storage()),
            handle_url(&client.tasks()),
            handle_url(&client.version()),
        ];
        for url in urls {
            assert_eq!(url, expected);
        }
    }

    #[test]
    fn test_guest_handles_keep_client_context() {
        let scoped = client().with_timeout(Duration::from_secs(5));
        let deadline = scoped.context().deadline();
        assert!(deadline.is_some());
        assert_eq!(scoped.qemu().client().context().deadline(), deadline);
        assert_eq!(scoped.lxc().client().context().deadline(), deadline);
    }
}
