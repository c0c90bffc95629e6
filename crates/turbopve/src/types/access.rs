//! Access control records

use super::pve_bool;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a password login.
#[derive(Clone)]
pub struct Ticket {
    /// Session ticket, sent back as the `PVEAuthCookie` cookie
    pub ticket: String,
    /// Token required on state-changing requests
    pub csrf_prevention_token: Option<String>,
    /// Authenticated user as reported by the server
    pub username: String,
    /// Cluster name, when the node is clustered
    pub cluster_name: Option<String>,
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("ticket", &"[REDACTED]")
            .field(
                "csrf_prevention_token",
                &self.csrf_prevention_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("username", &self.username)
            .field("cluster_name", &self.cluster_name)
            .finish()
    }
}

/// Privileges per ACL path: `path -> privilege -> granted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub BTreeMap<String, BTreeMap<String, u8>>);

impl Permissions {
    /// Whether `privilege` is granted on exactly `path`.
    pub fn has(&self, path: &str, privilege: &str) -> bool {
        self.0
            .get(path)
            .and_then(|privs| privs.get(privilege))
            .is_some_and(|granted| *granted != 0)
    }

    /// ACL paths with at least one privilege.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// A user account.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// `name@realm`
    #[serde(default)]
    pub userid: String,
    /// E-mail address
    #[serde(default)]
    pub email: Option<String>,
    /// Given name
    #[serde(default)]
    pub firstname: Option<String>,
    /// Family name
    #[serde(default)]
    pub lastname: Option<String>,
    /// Free-form comment
    #[serde(default)]
    pub comment: Option<String>,
    /// Whether the account can log in
    #[serde(default, with = "pve_bool::option")]
    pub enable: Option<bool>,
    /// Account expiry, seconds since the epoch (`0` = never)
    #[serde(default)]
    pub expire: Option<i64>,
    /// Realm type, e.g. `pam` or `pve`
    #[serde(default, rename = "realm-type")]
    pub realm_type: Option<String>,
}

/// A role and its privileges.
#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    /// Role name
    pub roleid: String,
    /// Comma-separated privilege list
    #[serde(default)]
    pub privs: Option<String>,
    /// Built-in role that cannot be modified
    #[serde(default, with = "pve_bool::option")]
    pub special: Option<bool>,
}

impl Role {
    /// Individual privileges.
    pub fn privileges(&self) -> Vec<&str> {
        self.privs
            .as_deref()
            .map(|p| p.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Parameters for creating a user.
#[derive(Clone, Serialize, Builder)]
#[builder(setter(into, strip_option), build_fn(error = "crate::error::Error"))]
pub struct CreateUserParams {
    /// `name@realm`
    pub userid: String,

    /// Initial password (only for the `pve` realm)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// E-mail address
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Given name
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,

    /// Family name
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,

    /// Free-form comment
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Whether the account can log in
    #[builder(default)]
    #[serde(with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    /// Account expiry, seconds since the epoch
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,

    /// Comma-separated group list
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<String>,
}

impl CreateUserParams {
    /// Create a new builder.
    pub fn builder() -> CreateUserParamsBuilder {
        CreateUserParamsBuilder::default()
    }
}

impl std::fmt::Debug for CreateUserParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserParams")
            .field("userid", &self.userid)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email)
            .field("enable", &self.enable)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_ticket_debug_redacts() {
        let ticket = Ticket {
            ticket: "PVE:root@pam:SECRET".into(),
            csrf_prevention_token: Some("CSRF".into()),
            username: "root@pam".into(),
            cluster_name: None,
        };
        let debug = format!("{ticket:?}");
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("CSRF\""));
        assert!(debug.contains("root@pam"));
    }

    #[test]
    fn test_permissions() {
        let perms: Permissions = serde_json::from_value(json!({
            "/": {"Sys.Audit": 1},
            "/vms/100": {"VM.PowerMgmt": 1, "VM.Console": 0}
        }))
        .unwrap();

        assert!(perms.has("/", "Sys.Audit"));
        assert!(perms.has("/vms/100", "VM.PowerMgmt"));
        assert!(!perms.has("/vms/100", "VM.Console"));
        assert!(!perms.has("/storage", "Datastore.Audit"));
        assert_eq!(perms.paths().collect::<Vec<_>>(), vec!["/", "/vms/100"]);
    }

    #[test]
    fn test_role_privileges() {
        let role: Role = serde_json::from_value(json!({
            "roleid": "PVEAuditor",
            "privs": "Sys.Audit,VM.Audit, Datastore.Audit",
            "special": 1
        }))
        .unwrap();
        assert_eq!(role.privileges(), vec!["Sys.Audit", "VM.Audit", "Datastore.Audit"]);
        assert_eq!(role.special, Some(true));
    }

    #[test]
    fn test_create_user_params() {
        let params = CreateUserParams::builder()
            .userid("alice@pve")
            .email("alice@example.com")
            .enable(true)
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"userid": "alice@pve", "email": "alice@example.com", "enable": 1})
        );
    }

    #[test]
    fn test_create_user_params_debug_redacts_password() {
        let params = CreateUserParams::builder()
            .userid("bob@pve")
            .password("hunter2")
            .build()
            .unwrap();
        let debug = format!("{params:?}");
        assert!(debug.contains("bob@pve"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_create_user_params_requires_userid() {
        let result = CreateUserParams::builder().email("x@example.com").build();
        match result {
            Err(Error::InvalidRequest(msg)) => assert!(msg.contains("userid")),
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
    }
}
