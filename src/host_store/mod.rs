//! Per-host descriptor storage.
//!
//! Every host owns one small JSON document holding the addresses assigned to it:
//!
//! ```json
//! {
//!     "ipv4": {
//!         "private": { "address": "10.0.0.2", "network": "10.0.0.0/24", "prefixLength": 24 }
//!     },
//!     "ipv6": { "address": "2001:db8:1:2::1a2b", "prefix": "2001:db8:1:2::/64", "prefixLength": 64 }
//! }
//! ```
//!
//! Two implementations of [`HostStore`] are provided, [`file::FileHostStore`] and
//! [`memory::InMemoryHostStore`]. The former keeps one `host.json` per host in a directory tree
//! and is what the allocators run against. The latter holds descriptors in memory.
//!
//! Keys this crate does not know about are kept as-is, so writing a descriptor back never drops
//! data another tool put there.

use crate::error::Error;
use ipnetwork::{Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Component, Path};

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileHostStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryHostStore;

/// Storage of [`HostDescriptor`]s keyed by host name.
#[allow(clippy::module_name_repetitions)]
pub trait HostStore {
    /// Every descriptor in the store, keyed by host name.
    ///
    /// A single unreadable descriptor fails the whole call.
    fn descriptors(&self) -> Result<BTreeMap<String, HostDescriptor>, Error>;

    /// The descriptor of `host`, if it has one.
    fn load(&self, host: &str) -> Result<Option<HostDescriptor>, Error>;

    /// Replace the descriptor of `host`.
    fn save(&mut self, host: &str, descriptor: &HostDescriptor) -> Result<(), Error>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HostDescriptor {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ipv4: BTreeMap<String, Ipv4Assignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6Config>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// An IPv4 address assigned to a host within one named network.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ipv4Assignment {
    pub network: Ipv4Network,
    pub address: Ipv4Addr,
    pub prefix_length: u8,
}

/// The `ipv6` section of a descriptor. `prefix` is provisioned by hand, `address` and
/// `prefix_length` are written by the [IPv6 allocator][crate::allocator::ipv6].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ipv6Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Ipv6Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Ipv6Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u8>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl Ipv4Assignment {
    #[must_use]
    pub fn new(network: Ipv4Network, address: Ipv4Addr) -> Self {
        Self {
            network,
            address,
            prefix_length: network.prefix(),
        }
    }
}

impl fmt::Display for Ipv4Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl HostDescriptor {
    /// The IPv4 address assigned in `network_name`, if any.
    #[must_use]
    pub fn ipv4_address(&self, network_name: &str) -> Option<Ipv4Addr> {
        self.ipv4.get(network_name).map(|a| a.address)
    }

    #[must_use]
    pub fn ipv6_address(&self) -> Option<Ipv6Addr> {
        self.ipv6.as_ref().and_then(|v6| v6.address)
    }

    /// Check the invariants serde can't express on its own. Returns a description of the first
    /// violation found.
    ///
    /// An `ipv6.address` outside `ipv6.prefix` is not a violation. It is what a descriptor looks
    /// like after its prefix was changed, and the [IPv6 allocator][crate::allocator::ipv6]
    /// replaces it.
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (name, assignment) in &self.ipv4 {
            if !assignment.network.contains(assignment.address) {
                return Err(format!(
                    "ipv4.{name}: address {} is not in network {}",
                    assignment.address, assignment.network
                ));
            }
            if assignment.prefix_length != assignment.network.prefix() {
                return Err(format!(
                    "ipv4.{name}: prefixLength {} does not match network {}",
                    assignment.prefix_length, assignment.network
                ));
            }
        }
        Ok(())
    }
}

/// The canonical form of a host name: its path components joined by `/`, so `./web1/` and
/// `web1` name the same host.
#[must_use]
pub fn canonical_host_name(host: impl AsRef<Path>) -> String {
    host.as_ref()
        .components()
        .filter(|c| !matches!(c, Component::CurDir | Component::RootDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields() {
        let raw = json!({
            "hostname": "web1",
            "roles": ["web"],
            "ipv6": { "prefix": "fd00::/64", "interface": "eth0" }
        });
        let descriptor: HostDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert!(descriptor.ipv4.is_empty());
        assert_eq!(descriptor.other["hostname"], json!("web1"));
        assert_eq!(
            descriptor.ipv6.as_ref().unwrap().other["interface"],
            json!("eth0")
        );
        assert_eq!(serde_json::to_value(&descriptor).unwrap(), raw);
    }

    #[test]
    fn ipv4_entries_require_every_field() {
        let raw = json!({ "ipv4": { "private": { "address": "10.0.0.2" } } });
        assert!(serde_json::from_value::<HostDescriptor>(raw).is_err());
    }

    #[test]
    fn validate_rejects_address_outside_network() {
        let raw = json!({ "ipv4": { "private": {
            "network": "10.0.0.0/24", "address": "10.0.1.2", "prefixLength": 24
        } } });
        let descriptor: HostDescriptor = serde_json::from_value(raw).unwrap();
        assert!(descriptor.validate().unwrap_err().contains("ipv4.private"));
    }

    #[test]
    fn validate_rejects_mismatched_prefix_length() {
        let raw = json!({ "ipv4": { "private": {
            "network": "10.0.0.0/24", "address": "10.0.0.2", "prefixLength": 16
        } } });
        let descriptor: HostDescriptor = serde_json::from_value(raw).unwrap();
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn validate_accepts_ipv6_address_from_an_old_prefix() {
        let raw = json!({ "ipv6": { "prefix": "fd01::/64", "address": "fd00::beef" } });
        let descriptor: HostDescriptor = serde_json::from_value(raw).unwrap();
        assert_eq!(descriptor.validate(), Ok(()));
    }

    #[test]
    fn host_names_are_canonical() {
        assert_eq!(canonical_host_name("web1"), "web1");
        assert_eq!(canonical_host_name("./web1/"), "web1");
        assert_eq!(canonical_host_name("db/./primary"), "db/primary");
    }

    #[test]
    fn assignment_displays_as_cidr() {
        let assignment = Ipv4Assignment::new(
            "10.0.0.0/24".parse().unwrap(),
            Ipv4Addr::new(10, 0, 0, 4),
        );
        assert_eq!(assignment.to_string(), "10.0.0.4/24");
        assert_eq!(assignment.prefix_length, 24);
    }
}
