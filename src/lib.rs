//! hostalloc
//!
//! Address allocation for a fleet of hosts described by per-host JSON descriptors.
//!
//! * `allocate-ipv4` hands out the lowest free address of a named IPv4 network from the
//!   [network registry][registry::NetworkRegistry], scanning every
//!   [host descriptor][host_store::HostDescriptor] for addresses already taken.
//! * `allocate-ipv6` draws a random address from the IPv6 prefix provisioned in a host's
//!   descriptor.
//! * `update-dns` publishes the allocated addresses as DNS records through the
//!   [Hetzner DNS API][hetzner-api].
//!
//! Allocations of an installation are serialized by an [exclusive file lock][lock::AllocationLock]
//! so concurrent invocations never hand out the same address.
//!
//! [hetzner-api]: https://dns.hetzner.com/api-docs
//!
#![warn(clippy::pedantic)]

pub mod allocator;
pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod host_store;
pub mod lock;
pub mod registry;

pub use allocator::AllocationPolicy;
pub use config::Config;
pub use host_store::{FileHostStore, HostDescriptor, InMemoryHostStore};
pub use lock::AllocationLock;
pub use registry::NetworkRegistry;
