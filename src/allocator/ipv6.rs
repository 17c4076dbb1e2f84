use crate::allocator::AllocationPolicy;
use crate::error::Error;
use crate::host_store::HostDescriptor;
use ipnetwork::Ipv6Network;
use rand::Rng;
use std::fmt;
use std::net::Ipv6Addr;
use std::ops::RangeInclusive;

/// Host identifiers drawn for the low 16 bits. The all-zero and all-one values and `::1` are
/// never used.
pub const HOST_ID_RANGE: RangeInclusive<u16> = 2..=65534;

const HOST_ID_BITS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Allocation {
    pub address: Ipv6Addr,
    pub prefix_length: u8,
    pub created: bool,
}

impl fmt::Display for Ipv6Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

/// A random address in `prefix`, with a host identifier from [`HOST_ID_RANGE`] in the low
/// 16 bits.
///
/// # Errors
///
/// Returns [`Error::PrefixTooLong`] for prefixes longer than /112.
pub fn random_address<R>(prefix: Ipv6Network, rng: &mut R) -> Result<Ipv6Addr, Error>
where
    R: Rng + ?Sized,
{
    if prefix.prefix() > 128 - HOST_ID_BITS {
        return Err(Error::PrefixTooLong(prefix));
    }
    let host_id: u16 = rng.gen_range(HOST_ID_RANGE);
    Ok(Ipv6Addr::from(
        u128::from(prefix.network()) | u128::from(host_id),
    ))
}

/// Assign an address from the descriptor's `ipv6.prefix`, updating `ipv6.address` and
/// `ipv6.prefixLength` in place. Nothing else in the descriptor is touched.
///
/// Under [`AllocationPolicy::AllocateIfAbsent`] an existing address inside the prefix is kept.
///
/// # Errors
///
/// Returns [`Error::MissingIpv6Prefix`] if the descriptor has no `ipv6.prefix`, and
/// [`Error::PrefixTooLong`] if the prefix can't hold a host identifier.
pub fn allocate<R>(
    descriptor: &mut HostDescriptor,
    policy: AllocationPolicy,
    rng: &mut R,
) -> Result<Ipv6Allocation, Error>
where
    R: Rng + ?Sized,
{
    let ipv6 = descriptor.ipv6.as_mut().ok_or(Error::MissingIpv6Prefix)?;
    let prefix = ipv6.prefix.ok_or(Error::MissingIpv6Prefix)?;

    if policy == AllocationPolicy::AllocateIfAbsent {
        match ipv6.address {
            Some(existing) if prefix.contains(existing) => {
                tracing::info!("keeping {existing} in {prefix}");
                return Ok(Ipv6Allocation {
                    address: existing,
                    prefix_length: prefix.prefix(),
                    created: false,
                });
            }
            Some(stale) => tracing::warn!("{stale} is not in {prefix}, drawing a new address"),
            None => {}
        }
    }

    let address = random_address(prefix, rng)?;
    ipv6.address = Some(address);
    ipv6.prefix_length = Some(prefix.prefix());
    tracing::info!("generated {address} in {prefix}");

    Ok(Ipv6Allocation {
        address,
        prefix_length: prefix.prefix(),
        created: true,
    })
}
