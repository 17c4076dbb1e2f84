//! Command line front ends shared by the `allocate-ipv4`, `allocate-ipv6` and `update-dns`
//! binaries.
//!
//! Results go to stdout, everything else (confirmations, logs, errors) to stderr.

use crate::config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod dns;
pub mod ipv4;
pub mod ipv6;

pub use dns::DnsCommand;
pub use ipv4::Ipv4Command;
pub use ipv6::Ipv6Command;

/// Set up logging to stderr, filtered by `RUST_LOG` (default `hostalloc=warn`).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostalloc=warn".into()),
        )
        .init();
}

/// Options shared by the allocators.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LockArgs {
    /// Config file, `<root>/hostalloc.json` is used when present.
    #[arg(long, env = "HOSTALLOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lock file serializing allocations, shared by every allocator of an installation.
    #[arg(long, env = "HOSTALLOC_LOCK_FILE")]
    pub lock_file: Option<PathBuf>,
}

impl LockArgs {
    /// # Errors
    ///
    /// Returns the error of loading the config file when no lock file was given.
    pub fn lock_path(&self) -> Result<PathBuf, crate::error::Error> {
        match &self.lock_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::load(self.config.as_deref())?.lock_path),
        }
    }
}
