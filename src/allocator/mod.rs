//! Address allocation.
//!
//! # IPv4
//!
//! [`ipv4::allocate`] hands out the lowest free address of a named network, scanning every host
//! descriptor for addresses already in use. Allocation starts at the gateway slot (the network
//! base + 2) and then fills the first gap in the sorted list of assigned addresses.
//!
//! With a `private` network of `10.0.0.0/24` and hosts holding `10.0.0.2`, `10.0.0.3` and
//! `10.0.0.5`, the next host receives `10.0.0.4`.
//!
//! # IPv6
//!
//! [`ipv6::allocate`] draws a random host identifier in `[2, 65534]` and places it in the low
//! 16 bits of the prefix provisioned in the host's descriptor. No uniqueness check is made
//! against other hosts.
//!
//! # Policy
//!
//! Whether an existing assignment is kept or replaced is an explicit [`AllocationPolicy`].
//! IPv4 defaults to [`AllocationPolicy::AllocateIfAbsent`] and IPv6 to
//! [`AllocationPolicy::AlwaysRegenerate`].
//!
//! Both allocators expect the caller to hold the [`AllocationLock`][crate::lock::AllocationLock]
//! for the whole read-compute-write sequence.

use std::fmt;

pub mod ipv4;
pub mod ipv6;

pub use ipv4::Ipv4Allocation;
pub use ipv6::Ipv6Allocation;

/// What to do when a host already holds an address.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Keep an existing assignment and only allocate when there is none.
    AllocateIfAbsent,
    /// Discard any existing assignment and allocate a new address.
    AlwaysRegenerate,
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllocateIfAbsent => "allocate-if-absent",
            Self::AlwaysRegenerate => "always-regenerate",
        })
    }
}
