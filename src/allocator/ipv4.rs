use crate::allocator::AllocationPolicy;
use crate::error::Error;
use crate::host_store::{canonical_host_name, HostStore, Ipv4Assignment};
use crate::registry::NetworkRegistry;
use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;

/// Offset of the first address handed out in a block. `+0` is the network address and `+1`
/// the provider's gateway.
const GATEWAY_SLOT_OFFSET: u32 = 2;

/// The outcome of an IPv4 allocation. `created` is false when an existing assignment was
/// returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Allocation {
    pub assignment: Ipv4Assignment,
    pub created: bool,
}

impl fmt::Display for Ipv4Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.assignment, f)
    }
}

/// The gateway slot of `network`: the first address the allocator hands out.
#[must_use]
pub fn gateway_slot(network: Ipv4Network) -> Option<Ipv4Addr> {
    u32::from(network.network())
        .checked_add(GATEWAY_SLOT_OFFSET)
        .map(Ipv4Addr::from)
}

/// Pick the next address for `network` given the addresses already assigned in it, sorted
/// ascending.
///
/// The gateway slot is returned whenever the lowest assigned address isn't the gateway slot.
/// Otherwise the address after the first gap wins, and without gaps the address after the
/// highest one. Returns `None` only if that would run past `255.255.255.255`.
///
/// Containment in `network` is *not* checked here, see [`select_address`].
#[must_use]
pub fn next_candidate(network: Ipv4Network, sorted_used: &[Ipv4Addr]) -> Option<Ipv4Addr> {
    let gateway = gateway_slot(network)?;
    let used: Vec<u32> = sorted_used.iter().copied().map(u32::from).collect();

    match used.first() {
        Some(&first) if first == u32::from(gateway) => {}
        _ => return Some(gateway),
    }

    for pair in used.windows(2) {
        if pair[1].saturating_sub(pair[0]) > 1 {
            return Some(Ipv4Addr::from(pair[0] + 1));
        }
    }

    used.last()
        .and_then(|last| last.checked_add(1))
        .map(Ipv4Addr::from)
}

/// Sort `used`, pick the [next candidate][next_candidate] and check it lies within `network`.
///
/// # Errors
///
/// Returns [`Error::OutsideNetwork`] if the candidate is not contained in `network`, and
/// [`Error::NetworkExhausted`] if no candidate exists at all.
pub fn select_address(network: Ipv4Network, used: &[Ipv4Addr]) -> Result<Ipv4Addr, Error> {
    let mut used = used.to_vec();
    used.sort_unstable();
    report_irregular(network, &used);

    let address = next_candidate(network, &used).ok_or(Error::NetworkExhausted(network))?;
    if !network.contains(address) {
        return Err(Error::OutsideNetwork { address, network });
    }
    Ok(address)
}

/// Allocate an address in `network_name` to `host`, or return the one it already holds.
///
/// The chosen address is merged into the host's descriptor, any other content of the
/// descriptor is kept. The caller is expected to hold the
/// [`AllocationLock`][crate::lock::AllocationLock].
///
/// # Errors
///
/// Returns [`Error::UnknownNetwork`] if `network_name` isn't registered, the errors of
/// [`select_address`], and any error of the underlying [`HostStore`].
pub fn allocate<S>(
    store: &mut S,
    registry: &NetworkRegistry,
    host: &str,
    network_name: &str,
    policy: AllocationPolicy,
) -> Result<Ipv4Allocation, Error>
where
    S: HostStore + ?Sized,
{
    let network = registry.network(network_name)?;
    let host = canonical_host_name(host);
    let host = host.as_str();
    let mut descriptor = store.load(host)?.unwrap_or_default();

    if policy == AllocationPolicy::AllocateIfAbsent {
        if let Some(existing) = descriptor.ipv4.get(network_name) {
            tracing::info!("{host} already holds {existing} in \"{network_name}\"");
            return Ok(Ipv4Allocation {
                assignment: *existing,
                created: false,
            });
        }
    }

    let used: Vec<Ipv4Addr> = store
        .descriptors()?
        .iter()
        .filter(|(name, _)| name.as_str() != host)
        .filter_map(|(_, other)| other.ipv4_address(network_name))
        .collect();
    tracing::debug!(
        "{} addresses in use in \"{network_name}\" ({network})",
        used.len()
    );

    let address = select_address(network, &used)?;
    let assignment = Ipv4Assignment::new(network, address);
    descriptor
        .ipv4
        .insert(network_name.to_string(), assignment);
    store.save(host, &descriptor)?;

    tracing::info!("allocated {assignment} in \"{network_name}\" to {host}");
    Ok(Ipv4Allocation {
        assignment,
        created: true,
    })
}

fn report_irregular(network: Ipv4Network, sorted: &[Ipv4Addr]) {
    let first_allocatable = gateway_slot(network).map_or(u32::MAX, u32::from);
    for address in sorted {
        if !network.contains(*address) || u32::from(*address) < first_allocatable {
            tracing::warn!("assigned address {address} is outside the allocatable range of {network}");
        }
    }
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            tracing::warn!("address {} is assigned to more than one host", pair[0]);
        }
    }
}
