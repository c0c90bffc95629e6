//! Typed records for Proxmox VE API payloads
//!
//! Responses are decoded leniently: PVE omits fields freely, encodes
//! booleans as `0`/`1` and returns some numbers as strings, so most fields
//! are optional and go through the helpers in [`pve_bool`] and [`lenient`].

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use access::*;
pub use cluster::*;
pub use guest::*;
pub use node::*;
pub use storage::*;
pub use version::*;

pub mod access;
pub mod cluster;
pub mod guest;
pub mod node;
pub mod storage;
pub mod version;

/// Free-form configuration object (`key -> value`).
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// One sample of round-robin statistics.
pub type RrdPoint = serde_json::Map<String, serde_json::Value>;

/// PVE booleans: `0`/`1` on the wire, also accepted as `true`/`false` or
/// `"0"`/`"1"` when decoding.
pub mod pve_bool {
    use serde::de::{self, Deserializer, Unexpected};
    use serde::{Deserialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    fn interpret<E: de::Error>(raw: Raw) -> Result<bool, E> {
        match raw {
            Raw::Bool(b) => Ok(b),
            Raw::Int(0) => Ok(false),
            Raw::Int(1) => Ok(true),
            Raw::Int(n) => Err(E::invalid_value(Unexpected::Signed(n), &"0 or 1")),
            Raw::Str(s) => match s.trim() {
                "0" | "false" | "" => Ok(false),
                "1" | "true" => Ok(true),
                other => Err(E::invalid_value(Unexpected::Str(other), &"0 or 1")),
            },
        }
    }

    /// Serialize as `0` or `1`.
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    /// Deserialize from a bool, an integer or a numeric string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        interpret(Raw::deserialize(deserializer)?)
    }

    /// The same encoding for optional fields.
    pub mod option {
        use super::Raw;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize `Some` as `0`/`1`; `None` as null (skip it with
        /// `skip_serializing_if`).
        pub fn serialize<S: Serializer>(
            value: &Option<bool>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(b) => serializer.serialize_u8(u8::from(*b)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize an optional PVE boolean.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<bool>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(super::interpret)
                .transpose()
        }
    }
}

/// Numbers that PVE sometimes sends as strings (`"vmid": "100"`).
pub mod lenient {
    use serde::de::{DeserializeOwned, Deserializer, Error};
    use serde::Deserialize;
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Str(String),
    }

    fn interpret<T, E>(raw: Raw<T>) -> Result<T, E>
    where
        T: FromStr,
        T::Err: Display,
        E: Error,
    {
        match raw {
            Raw::Value(value) => Ok(value),
            Raw::Str(s) => s.trim().parse().map_err(|e| E::custom(format!("{s:?}: {e}"))),
        }
    }

    /// Deserialize a number given either natively or as a string.
    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + FromStr,
        T::Err: Display,
    {
        interpret(Raw::<T>::deserialize(deserializer)?)
    }

    /// Optional variant of [`number`].
    pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + FromStr,
        T::Err: Display,
    {
        Option::<Raw<T>>::deserialize(deserializer)?
            .map(interpret)
            .transpose()
    }
}

/// Guest type, also the path segment below `nodes/{node}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmKind {
    /// QEMU/KVM virtual machine
    Qemu,
    /// LXC container
    Lxc,
}

impl VmKind {
    /// Path segment and `type` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            VmKind::Qemu => "qemu",
            VmKind::Lxc => "lxc",
        }
    }
}

impl fmt::Display for VmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VmKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "qemu" => Ok(VmKind::Qemu),
            "lxc" => Ok(VmKind::Lxc),
            other => Err(Error::InvalidRequest(format!("unknown guest type '{other}'"))),
        }
    }
}

/// RRD time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Last hour
    Hour,
    /// Last day
    Day,
    /// Last week
    Week,
    /// Last month
    Month,
    /// Last year
    Year,
}

/// Identifier of a server-side task, as returned by every operation that
/// starts a job.
///
/// Format: `UPID:{node}:{pid}:{pstart}:{starttime}:{type}:{id}:{user}:` with
/// the numeric fields in hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Upid(String);

impl Upid {
    /// Wrap a UPID string without validating it.
    pub fn new(upid: impl Into<String>) -> Self {
        Self(upid.into())
    }

    /// The raw UPID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the UPID into its fields.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] when the string is not a well-formed UPID.
    pub fn parse(&self) -> Result<UpidInfo> {
        let malformed = || Error::InvalidRequest(format!("malformed UPID {:?}", self.0));

        let body = self
            .0
            .strip_prefix("UPID:")
            .and_then(|rest| rest.strip_suffix(':'))
            .ok_or_else(malformed)?;
        let fields: Vec<&str> = body.split(':').collect();
        let [node, pid, pstart, start_time, task_type, id, user] = fields.as_slice() else {
            return Err(malformed());
        };
        if node.is_empty() || task_type.is_empty() || user.is_empty() {
            return Err(malformed());
        }

        Ok(UpidInfo {
            node: node.to_string(),
            pid: u32::from_str_radix(pid, 16).map_err(|_| malformed())?,
            pstart: u64::from_str_radix(pstart, 16).map_err(|_| malformed())?,
            start_time: i64::from_str_radix(start_time, 16).map_err(|_| malformed())?,
            task_type: task_type.to_string(),
            id: id.to_string(),
            user: user.to_string(),
        })
    }

    /// Node the task runs on.
    pub fn node(&self) -> Result<String> {
        self.parse().map(|info| info.node)
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UpidInfo> for Upid {
    fn from(info: UpidInfo) -> Self {
        Self(info.to_string())
    }
}

/// Decoded fields of a [`Upid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpidInfo {
    /// Node name
    pub node: String,
    /// Worker process id
    pub pid: u32,
    /// Process start time in clock ticks
    pub pstart: u64,
    /// Task start, seconds since the epoch
    pub start_time: i64,
    /// Task type, e.g. `qmstart`
    pub task_type: String,
    /// Task object id, often the VMID (may be empty)
    pub id: String,
    /// User (or token) that started the task
    pub user: String,
}

impl UpidInfo {
    /// Task start as a timestamp.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_time, 0)
    }
}

impl fmt::Display for UpidInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UPID:{}:{:08X}:{:08X}:{:08X}:{}:{}:{}:",
            self.node, self.pid, self.pstart, self.start_time, self.task_type, self.id, self.user
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Flags {
        #[serde(with = "pve_bool")]
        enabled: bool,
        #[serde(default, with = "pve_bool::option", skip_serializing_if = "Option::is_none")]
        shared: Option<bool>,
        #[serde(default, deserialize_with = "lenient::option")]
        vmid: Option<u32>,
    }

    #[test]
    fn test_pve_bool_accepts_wire_variants() {
        for (raw, expected) in [(json!(1), true), (json!(0), false), (json!(true), true), (json!("1"), true), (json!("0"), false)] {
            let flags: Flags = serde_json::from_value(json!({"enabled": raw})).unwrap();
            assert_eq!(flags.enabled, expected);
        }

        let err = serde_json::from_value::<Flags>(json!({"enabled": 2}));
        assert!(err.is_err());
    }

    #[test]
    fn test_pve_bool_serializes_as_int() {
        let flags = Flags {
            enabled: true,
            shared: Some(false),
            vmid: None,
        };
        let value = serde_json::to_value(&flags).unwrap();
        assert_eq!(value["enabled"], json!(1));
        assert_eq!(value["shared"], json!(0));
    }

    #[test]
    fn test_lenient_number() {
        let flags: Flags = serde_json::from_value(json!({"enabled": 0, "vmid": "100"})).unwrap();
        assert_eq!(flags.vmid, Some(100));

        let flags: Flags = serde_json::from_value(json!({"enabled": 0, "vmid": 101})).unwrap();
        assert_eq!(flags.vmid, Some(101));
        assert_eq!(flags.shared, None);

        assert!(serde_json::from_value::<Flags>(json!({"enabled": 0, "vmid": "abc"})).is_err());
    }

    #[test]
    fn test_vm_kind() {
        assert_eq!(VmKind::Qemu.as_str(), "qemu");
        assert_eq!("lxc".parse::<VmKind>().unwrap(), VmKind::Lxc);
        assert_matches!("openvz".parse::<VmKind>(), Err(Error::InvalidRequest(_)));
        assert_eq!(serde_json::to_value(VmKind::Lxc).unwrap(), json!("lxc"));
    }

    #[test]
    fn test_upid_parse() {
        let upid = Upid::new("UPID:pve1:00001A2B:0001E240:65F1C0DE:qmstart:100:root@pam:");
        let info = upid.parse().unwrap();

        assert_eq!(info.node, "pve1");
        assert_eq!(info.pid, 0x1A2B);
        assert_eq!(info.pstart, 0x1E240);
        assert_eq!(info.start_time, 0x65F1C0DE);
        assert_eq!(info.task_type, "qmstart");
        assert_eq!(info.id, "100");
        assert_eq!(info.user, "root@pam");
        assert_eq!(info.started_at().unwrap().timestamp(), 0x65F1C0DE);
        assert_eq!(Upid::from(info), upid);
    }

    #[test]
    fn test_upid_parse_token_user_and_empty_id() {
        let upid = Upid::new("UPID:pve2:0000BEEF:00000001:65F1C0DE:aptupdate::automation@pve!ci:");
        let info = upid.parse().unwrap();
        assert_eq!(info.id, "");
        assert_eq!(info.user, "automation@pve!ci");
        assert_eq!(upid.node().unwrap(), "pve2");
    }

    #[test]
    fn test_upid_parse_rejects_garbage() {
        for raw in [
            "",
            "UPID:pve1",
            "pve1:00001A2B:0001E240:65F1C0DE:qmstart:100:root@pam:",
            "UPID:pve1:zzzz:0001E240:65F1C0DE:qmstart:100:root@pam:",
            "UPID:pve1:00001A2B:0001E240:65F1C0DE:qmstart:100:root@pam",
        ] {
            assert_matches!(Upid::new(raw).parse(), Err(Error::InvalidRequest(_)), "{raw}");
        }
    }
}
