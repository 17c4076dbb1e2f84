use crate::config::{Config, Secrets};
use crate::dns::{sync, HetznerDns, Record, RecordApi};
use crate::error::Error;
use crate::host_store::file::read_descriptor;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

/// Publish host addresses as DNS records, or remove them.
#[derive(Parser, Debug)]
#[command(name = "update-dns", version)]
pub struct DnsCommand {
    /// Config file, `<root>/hostalloc.json` is used when present.
    #[arg(long, env = "HOSTALLOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// DNS API credentials, defaults to `<root>/secrets.json`.
    #[arg(long, env = "HOSTALLOC_SECRETS")]
    pub secrets: Option<PathBuf>,

    #[command(subcommand)]
    pub action: DnsAction,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DnsAction {
    /// Create the A and AAAA records of a host.
    AddHost {
        fqdn: String,
        public_ipv4: Ipv4Addr,
        public_ipv6: Ipv6Addr,
        /// TTL of created records, defaults to `dns.ttl` of the config.
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Create the A and AAAA records of a host from the addresses in its descriptor.
    SyncHost {
        fqdn: String,
        host_json_path: PathBuf,
        /// Network whose IPv4 address is published.
        #[arg(long, default_value = "public")]
        network: String,
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Delete the records of a host and every record pointing at its addresses.
    DeleteHost { fqdn: String },
}

impl DnsCommand {
    /// # Errors
    ///
    /// Fails if the config or secrets can't be loaded, or the action fails.
    pub async fn run(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let secrets_path = self
            .secrets
            .clone()
            .unwrap_or_else(|| config.secrets_path.clone());
        let secrets = Secrets::try_from_file(&secrets_path)
            .with_context(|| format!("loading DNS credentials from {}", secrets_path.display()))?;
        let api = HetznerDns::new(&config.dns, &secrets.hetzner_dns)?;
        self.action.run(&api, config.dns.ttl).await
    }
}

impl DnsAction {
    /// Run against `api`, creating records with `default_ttl` unless `--ttl` was given.
    ///
    /// # Errors
    ///
    /// Fails with the synchronizer's error, or if a descriptor lacks the addresses to publish.
    pub async fn run<A>(&self, api: &A, default_ttl: u32) -> Result<()>
    where
        A: RecordApi + ?Sized,
    {
        match self {
            Self::AddHost {
                fqdn,
                public_ipv4,
                public_ipv6,
                ttl,
            } => {
                let ttl = ttl.unwrap_or(default_ttl);
                let created = sync::add_host(api, fqdn, *public_ipv4, *public_ipv6, ttl)
                    .await
                    .with_context(|| format!("adding {fqdn}"))?;
                report("Created", &created);
            }
            Self::SyncHost {
                fqdn,
                host_json_path,
                network,
                ttl,
            } => {
                let (ipv4, ipv6) = descriptor_addresses(host_json_path, network)?;
                let ttl = ttl.unwrap_or(default_ttl);
                let created = sync::add_host(api, fqdn, ipv4, ipv6, ttl)
                    .await
                    .with_context(|| format!("syncing {fqdn}"))?;
                report("Created", &created);
            }
            Self::DeleteHost { fqdn } => {
                let deleted = sync::delete_host(api, fqdn)
                    .await
                    .with_context(|| format!("deleting {fqdn}"))?;
                report("Deleted", &deleted);
            }
        }
        Ok(())
    }
}

fn descriptor_addresses(path: &Path, network: &str) -> Result<(Ipv4Addr, Ipv6Addr), Error> {
    let descriptor =
        read_descriptor(path)?.ok_or_else(|| Error::MissingDescriptor(path.to_path_buf()))?;
    let ipv4 = descriptor
        .ipv4_address(network)
        .ok_or_else(|| Error::MissingAddress(format!("ipv4.{network}")))?;
    let ipv6 = descriptor
        .ipv6_address()
        .ok_or_else(|| Error::MissingAddress("ipv6".to_string()))?;
    Ok((ipv4, ipv6))
}

fn report(action: &str, records: &[Record]) {
    if records.is_empty() {
        eprintln!("{action} no records");
    }
    for record in records {
        println!("{action} {record}");
    }
}
