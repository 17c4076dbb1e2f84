use crate::error::Error;
use crate::host_store::{HostDescriptor, HostStore};
use std::collections::BTreeMap;

#[derive(Default, Debug, Clone)]
pub struct InMemoryHostStore {
    hosts: BTreeMap<String, HostDescriptor>,
}

impl InMemoryHostStore {
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>, descriptor: HostDescriptor) -> Self {
        self.hosts.insert(host.into(), descriptor);
        self
    }

    #[must_use]
    pub fn get(&self, host: &str) -> Option<&HostDescriptor> {
        self.hosts.get(host)
    }
}

impl HostStore for InMemoryHostStore {
    fn descriptors(&self) -> Result<BTreeMap<String, HostDescriptor>, Error> {
        Ok(self.hosts.clone())
    }

    fn load(&self, host: &str) -> Result<Option<HostDescriptor>, Error> {
        Ok(self.hosts.get(host).cloned())
    }

    fn save(&mut self, host: &str, descriptor: &HostDescriptor) -> Result<(), Error> {
        self.hosts.insert(host.to_string(), descriptor.clone());
        Ok(())
    }
}
