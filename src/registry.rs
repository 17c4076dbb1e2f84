//! The shared network registry, mapping network names to IPv4 blocks.
//!
//! ```json
//! { "networks": { "private": "10.0.0.0/24", "public": "203.0.113.0/28" } }
//! ```
use crate::error::Error;
use ipnetwork::Ipv4Network;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, Ipv4Network>,
}

impl NetworkRegistry {
    /// Load the registry from the JSON file at the given path, or return an Error.
    ///
    /// Blocks are normalised to their network address, so `10.0.0.7/24` is held as `10.0.0.0/24`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileAccess`] if the path can't be opened, and [`Error::InvalidJSON`] if
    /// the file isn't a valid registry.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let path = p.as_ref();
        let f = File::open(path).map_err(|source| Error::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let registry: NetworkRegistry =
            serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::InvalidJSON {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            "loaded {} networks from {}",
            registry.networks.len(),
            path.display()
        );
        Ok(registry.normalized())
    }

    /// Look up the block registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNetwork`] if no network of that name is registered.
    pub fn network(&self, name: &str) -> Result<Ipv4Network, Error> {
        self.networks
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownNetwork(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }

    fn normalized(self) -> Self {
        let networks = self
            .networks
            .into_iter()
            .map(|(name, block)| (name, normalize(block)))
            .collect();
        Self { networks }
    }
}

impl FromIterator<(String, Ipv4Network)> for NetworkRegistry {
    fn from_iter<T: IntoIterator<Item = (String, Ipv4Network)>>(iter: T) -> Self {
        Self {
            networks: iter.into_iter().collect(),
        }
        .normalized()
    }
}

fn normalize(block: Ipv4Network) -> Ipv4Network {
    // The prefix came out of a valid network, so rebuilding with it can't fail.
    Ipv4Network::new(block.network(), block.prefix()).unwrap_or(block)
}
