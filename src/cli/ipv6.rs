use crate::allocator::{ipv6, AllocationPolicy, Ipv6Allocation};
use crate::cli::LockArgs;
use crate::error::Error;
use crate::host_store::file::{read_descriptor, write_descriptor};
use crate::lock::AllocationLock;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Assign a random address from the IPv6 prefix provisioned in a host descriptor.
///
/// Prints `<address>/<prefixLength>` on stdout.
#[derive(Parser, Debug)]
#[command(name = "allocate-ipv6", version)]
pub struct Ipv6Command {
    /// Host descriptor holding `ipv6.prefix`.
    pub host_json_path: PathBuf,

    #[arg(long, value_enum, default_value_t = AllocationPolicy::AlwaysRegenerate)]
    pub policy: AllocationPolicy,

    #[command(flatten)]
    pub lock: LockArgs,
}

impl Ipv6Command {
    /// # Errors
    ///
    /// Fails if the lock can't be taken, the descriptor is missing or invalid, or it has no
    /// usable `ipv6.prefix`.
    pub fn run(&self) -> Result<Ipv6Allocation> {
        let lock_path = self.lock.lock_path()?;
        let _lock = AllocationLock::acquire(&lock_path)?;

        let path = &self.host_json_path;
        let mut descriptor =
            read_descriptor(path)?.ok_or_else(|| Error::MissingDescriptor(path.clone()))?;
        let allocation = ipv6::allocate(&mut descriptor, self.policy, &mut rand::thread_rng())
            .with_context(|| format!("allocating an IPv6 address for {}", path.display()))?;
        if allocation.created {
            write_descriptor(path, &descriptor)?;
        }
        Ok(allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipnetwork::Ipv6Network;
    use std::fs;
    use tempfile::TempDir;

    fn command(dir: &TempDir, host_json: &std::path::Path) -> Ipv6Command {
        command_with(dir, host_json, AllocationPolicy::AlwaysRegenerate)
    }

    fn command_with(
        dir: &TempDir,
        host_json: &std::path::Path,
        policy: AllocationPolicy,
    ) -> Ipv6Command {
        Ipv6Command {
            host_json_path: host_json.to_path_buf(),
            policy,
            lock: LockArgs {
                config: None,
                lock_file: Some(dir.path().join("alloc.lock")),
            },
        }
    }

    #[test]
    fn run_updates_only_the_ipv6_address() {
        let dir = TempDir::new().unwrap();
        let host_json = dir.path().join("host.json");
        fs::write(
            &host_json,
            r#"{"ipv6": {"prefix": "2001:db8:1::/64"}, "role": "web"}"#,
        )
        .unwrap();

        let allocation = command(&dir, &host_json).run().unwrap();

        let prefix: Ipv6Network = "2001:db8:1::/64".parse().unwrap();
        assert!(prefix.contains(allocation.address));
        let written = read_descriptor(&host_json).unwrap().unwrap();
        assert_eq!(written.ipv6_address(), Some(allocation.address));
        assert_eq!(written.other["role"], serde_json::json!("web"));
    }

    #[test]
    fn address_from_an_old_prefix_is_replaced_under_both_policies() {
        let prefix: Ipv6Network = "fd01::/64".parse().unwrap();
        for policy in [
            AllocationPolicy::AlwaysRegenerate,
            AllocationPolicy::AllocateIfAbsent,
        ] {
            let dir = TempDir::new().unwrap();
            let host_json = dir.path().join("host.json");
            fs::write(
                &host_json,
                r#"{"ipv6": {"prefix": "fd01::/64", "address": "fd00::beef", "prefixLength": 64}}"#,
            )
            .unwrap();

            let allocation = command_with(&dir, &host_json, policy).run().unwrap();

            assert!(allocation.created, "{policy}");
            assert!(prefix.contains(allocation.address), "{policy}");
            let written = read_descriptor(&host_json).unwrap().unwrap();
            assert_eq!(written.ipv6_address(), Some(allocation.address));
        }
    }

    #[test]
    fn allocate_if_absent_keeps_a_current_address_on_disk() {
        let dir = TempDir::new().unwrap();
        let host_json = dir.path().join("host.json");
        fs::write(
            &host_json,
            r#"{"ipv6": {"prefix": "fd01::/64", "address": "fd01::beef", "prefixLength": 64}}"#,
        )
        .unwrap();
        let before = fs::read(&host_json).unwrap();

        let allocation = command_with(&dir, &host_json, AllocationPolicy::AllocateIfAbsent)
            .run()
            .unwrap();

        assert!(!allocation.created);
        assert_eq!(allocation.to_string(), "fd01::beef/64");
        assert_eq!(fs::read(&host_json).unwrap(), before);
    }

    #[test]
    fn missing_descriptor_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = command(&dir, &dir.path().join("absent.json"))
            .run()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingDescriptor(_))
        ));
    }

    #[test]
    fn missing_prefix_is_an_error() {
        let dir = TempDir::new().unwrap();
        let host_json = dir.path().join("host.json");
        fs::write(&host_json, r#"{"ipv4": {}}"#).unwrap();

        let err = command(&dir, &host_json).run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingIpv6Prefix)
        ));
    }
}
