use crate::allocator::{ipv4, AllocationPolicy, Ipv4Allocation};
use crate::cli::LockArgs;
use crate::host_store::FileHostStore;
use crate::lock::AllocationLock;
use crate::registry::NetworkRegistry;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Allocate the lowest free address of an IPv4 network to a host.
///
/// Prints `<address>/<prefixLength>` on stdout.
#[derive(Parser, Debug)]
#[command(name = "allocate-ipv4", version)]
pub struct Ipv4Command {
    /// Host to allocate for, its descriptor is `<hosts_dir>/<host_name>/host.json`.
    pub host_name: String,
    /// Network in the registry to allocate from.
    pub network_name: String,
    pub hosts_dir: PathBuf,
    /// Network registry, a JSON object mapping network names to CIDR blocks.
    pub networks_json: PathBuf,

    #[arg(long, value_enum, default_value_t = AllocationPolicy::AllocateIfAbsent)]
    pub policy: AllocationPolicy,

    #[command(flatten)]
    pub lock: LockArgs,
}

impl Ipv4Command {
    /// Allocate under the allocation lock, which is released before returning.
    ///
    /// # Errors
    ///
    /// Fails if the lock can't be taken, the registry or a descriptor can't be read, or the
    /// allocator refuses.
    pub fn run(&self) -> Result<Ipv4Allocation> {
        let lock_path = self.lock.lock_path()?;
        let _lock = AllocationLock::acquire(&lock_path)?;

        let registry = NetworkRegistry::try_from_file(&self.networks_json)?;
        if let Err(err) = registry.network(&self.network_name) {
            let known: Vec<&str> = registry.names().collect();
            return Err(anyhow::Error::new(err).context(format!(
                "known networks in {}: {}",
                self.networks_json.display(),
                known.join(", ")
            )));
        }
        let mut store = FileHostStore::new(&self.hosts_dir);
        ipv4::allocate(
            &mut store,
            &registry,
            &self.host_name,
            &self.network_name,
            self.policy,
        )
        .with_context(|| {
            format!(
                "allocating an address of \"{}\" to {}",
                self.network_name, self.host_name
            )
        })
    }
}
