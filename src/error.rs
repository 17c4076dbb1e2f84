//! Error types.

use ipnetwork::{Ipv4Network, Ipv6Network};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Error enumerates the possible hostalloc error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the requested network name has no entry in the
    /// [network registry][crate::registry::NetworkRegistry].
    #[error("network \"{0}\" does not exist in the network registry")]
    UnknownNetwork(String),

    /// Returned when the address picked by the
    /// [IPv4 allocator][crate::allocator::ipv4] is not contained in the block it was picked for.
    ///
    /// This points at a corrupt registry or corrupt host descriptors and is never corrected
    /// automatically.
    #[error("discovered IP {address} not contained in network {network}")]
    OutsideNetwork {
        address: Ipv4Addr,
        network: Ipv4Network,
    },

    /// Returned when the addresses assigned in a block already reach `255.255.255.255`.
    #[error("no address left to allocate in network {0}")]
    NetworkExhausted(Ipv4Network),

    /// Returned when a host descriptor parses as JSON but breaks the descriptor schema, e.g. an
    /// `ipv4` entry whose address lies outside of its own network.
    #[error("invalid host descriptor {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },

    /// Returned when a host descriptor that must already exist is not found.
    #[error("host descriptor {0} does not exist")]
    MissingDescriptor(PathBuf),

    /// Returned when IPv6 allocation is requested for a descriptor without an `ipv6.prefix`.
    #[error("host descriptor has no ipv6.prefix")]
    MissingIpv6Prefix,

    /// Returned when a descriptor lacks an address another tool needs to read, e.g. the
    /// [DNS synchronizer][crate::dns::sync].
    #[error("host descriptor has no {0} address")]
    MissingAddress(String),

    /// Returned when an IPv6 prefix leaves fewer than 16 host bits for the generated identifier.
    #[error("IPv6 prefix {0} is too long, at most a /112 is supported")]
    PrefixTooLong(Ipv6Network),

    /// Returned when a file (host descriptor, registry, config, secrets) can't be read or
    /// written.
    #[error("unable to access {path}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when a file on disk does not contain valid JSON for the expected schema.
    #[error("invalid JSON in {path}")]
    InvalidJSON {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Returned when the [allocation lock][crate::lock::AllocationLock] can't be taken.
    #[error("unable to lock {path}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when a request to the DNS provider fails, including non-2xx responses.
    #[error("DNS API request failed")]
    Http(#[from] reqwest::Error),

    /// Returned when the DNS API token can't be used as an HTTP header value.
    #[error("invalid header value")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    /// Returned when the DNS provider doesn't report a name for the configured zone.
    #[error("unable to find zone name for zone {0}")]
    ZoneNameUnavailable(String),

    /// Returned when a FQDN is not inside the configured zone.
    #[error("{fqdn} does not seem to be within the zone {zone}")]
    NotInZone { fqdn: String, zone: String },

    /// Returned when existing DNS records for a host point at different addresses than the
    /// ones being published.
    #[error("new host has mismatched existing address: {0:?}")]
    AddressMismatch(Vec<String>),

    /// Returned when a host name has more than one distinct address of the same family.
    #[error("unexpected multiple canonical IPs for {fqdn}: {values:?}")]
    AmbiguousAddresses { fqdn: String, values: Vec<String> },
}
