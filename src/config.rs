//! Installation settings and DNS API secrets.
//!
//! Everything is optional. Without a config file the tools use files relative to the
//! installation root: `<root>/.ip-alloc.lock` for the allocation lock and `<root>/secrets.json`
//! for DNS credentials.
//!
//! ```json
//! {
//!   "lock_path": ".ip-alloc.lock",
//!   "secrets_path": "/etc/hostalloc/secrets.json",
//!   "dns": { "endpoint": "https://dns.hetzner.com/api/v1", "timeout": 30, "ttl": 60 }
//! }
//! ```
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::env;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the installation root.
pub const ROOT_ENV: &str = "HOSTALLOC_ROOT";
/// Config file picked up from the installation root when no explicit one is given.
pub const CONFIG_FILE_NAME: &str = "hostalloc.json";
pub const DEFAULT_LOCK_FILE: &str = ".ip-alloc.lock";
pub const DEFAULT_SECRETS_FILE: &str = "secrets.json";
pub const HETZNER_DNS_ENDPOINT: &str = "https://dns.hetzner.com/api/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub lock_path: PathBuf,
    pub secrets_path: PathBuf,
    pub dns: DnsConfig,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DnsConfig {
    pub endpoint: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    /// TTL of records created by `update-dns` unless given on the command line.
    pub ttl: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            endpoint: HETZNER_DNS_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            ttl: 60,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    lock_path: Option<PathBuf>,
    secrets_path: Option<PathBuf>,
    #[serde(default)]
    dns: DnsConfig,
}

impl Config {
    /// The default configuration for an installation rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self::from_file_contents(root.into(), ConfigFile::default())
    }

    /// Load a config file. Relative paths in it are resolved against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileAccess`] if the file can't be read and [`Error::InvalidJSON`] if it
    /// is not a valid config.
    pub fn try_from_file(p: impl AsRef<Path>, root: impl Into<PathBuf>) -> Result<Self, Error> {
        let contents: ConfigFile = read_json(p.as_ref())?;
        tracing::debug!("loaded config from {}", p.as_ref().display());
        Ok(Self::from_file_contents(root.into(), contents))
    }

    /// Load `explicit` if given, else `<root>/hostalloc.json` if it exists, else the defaults.
    ///
    /// # Errors
    ///
    /// See [`Config::try_from_file`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let root = install_root();
        match explicit {
            Some(path) => Self::try_from_file(path, root),
            None => {
                let implicit = root.join(CONFIG_FILE_NAME);
                if implicit.is_file() {
                    Self::try_from_file(implicit, root)
                } else {
                    Ok(Self::for_root(root))
                }
            }
        }
    }

    fn from_file_contents(root: PathBuf, contents: ConfigFile) -> Self {
        let lock_path = root.join(
            contents
                .lock_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE)),
        );
        let secrets_path = root.join(
            contents
                .secrets_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_FILE)),
        );
        Self {
            root,
            lock_path,
            secrets_path,
            dns: contents.dns,
        }
    }
}

/// The installation root: `$HOSTALLOC_ROOT`, else the parent of the directory holding the running
/// executable (binaries are installed to `<root>/bin`), else the working directory.
#[must_use]
pub fn install_root() -> PathBuf {
    if let Some(root) = env::var_os(ROOT_ENV) {
        return PathBuf::from(root);
    }
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Credentials for the DNS provider, kept out of the config file.
///
/// ```json
/// { "hetznerDNS": { "token": "...", "zoneId": "..." } }
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct Secrets {
    #[serde(rename = "hetznerDNS")]
    pub hetzner_dns: HetznerCredentials,
}

#[derive(Deserialize, Clone)]
pub struct HetznerCredentials {
    pub token: String,
    #[serde(rename = "zoneId")]
    pub zone_id: String,
}

impl fmt::Debug for HetznerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HetznerCredentials")
            .field("token", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

impl Secrets {
    /// # Errors
    ///
    /// Returns [`Error::FileAccess`] if the file can't be read and [`Error::InvalidJSON`] if it
    /// lacks the `hetznerDNS` credentials.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        read_json(p.as_ref())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let f = File::open(path).map_err(|source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::InvalidJSON {
        path: path.to_path_buf(),
        source,
    })
}
