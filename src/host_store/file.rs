//! A directory-backed implementation of the [`HostStore`][super::HostStore] trait.
//!
//! Descriptors live at `<hosts_dir>/<host_name>/host.json`. The host name is the descriptor's
//! directory relative to `hosts_dir`, so grouping hosts in subdirectories works as expected.
use crate::error::Error;
use crate::host_store::{canonical_host_name, HostDescriptor, HostStore};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// File name every host descriptor is stored under.
pub const DESCRIPTOR_FILE_NAME: &str = "host.json";

/// A file-backed host store. Every call goes to disk, nothing is cached between calls.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileHostStore {
    hosts_dir: PathBuf,
}

impl FileHostStore {
    pub fn new(hosts_dir: impl Into<PathBuf>) -> Self {
        Self {
            hosts_dir: hosts_dir.into(),
        }
    }

    #[must_use]
    pub fn hosts_dir(&self) -> &Path {
        &self.hosts_dir
    }

    /// Where the descriptor of `host` is (or would be) stored.
    #[must_use]
    pub fn descriptor_path(&self, host: &str) -> PathBuf {
        self.hosts_dir.join(host).join(DESCRIPTOR_FILE_NAME)
    }

    fn host_name(&self, descriptor_path: &Path) -> String {
        descriptor_path
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.hosts_dir).ok())
            .map(canonical_host_name)
            .unwrap_or_default()
    }
}

impl HostStore for FileHostStore {
    fn descriptors(&self) -> Result<BTreeMap<String, HostDescriptor>, Error> {
        let mut descriptors = BTreeMap::new();
        if !self.hosts_dir.exists() {
            tracing::debug!("{} does not exist yet", self.hosts_dir.display());
            return Ok(descriptors);
        }

        for entry in WalkDir::new(&self.hosts_dir).sort_by_file_name() {
            let entry = entry.map_err(|err| Error::FileAccess {
                path: err
                    .path()
                    .map_or_else(|| self.hosts_dir.clone(), Path::to_path_buf),
                source: io::Error::from(err),
            })?;
            if !entry.file_type().is_file() || entry.file_name() != DESCRIPTOR_FILE_NAME {
                continue;
            }
            let path = entry.path();
            let descriptor =
                read_descriptor(path)?.ok_or_else(|| Error::MissingDescriptor(path.to_path_buf()))?;
            descriptors.insert(self.host_name(path), descriptor);
        }

        tracing::debug!(
            "scanned {} host descriptors in {}",
            descriptors.len(),
            self.hosts_dir.display()
        );
        Ok(descriptors)
    }

    fn load(&self, host: &str) -> Result<Option<HostDescriptor>, Error> {
        read_descriptor(&self.descriptor_path(host))
    }

    fn save(&mut self, host: &str, descriptor: &HostDescriptor) -> Result<(), Error> {
        write_descriptor(&self.descriptor_path(host), descriptor)
    }
}

/// Read and validate the descriptor at `path`. A missing file is `Ok(None)`.
///
/// # Errors
///
/// Returns [`Error::FileAccess`] if the file exists but can't be read, [`Error::InvalidJSON`] if
/// it isn't a descriptor, and [`Error::InvalidDescriptor`] if its content is inconsistent.
pub fn read_descriptor(path: &Path) -> Result<Option<HostDescriptor>, Error> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::FileAccess {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let descriptor: HostDescriptor =
        serde_json::from_slice(&contents).map_err(|source| Error::InvalidJSON {
            path: path.to_path_buf(),
            source,
        })?;
    descriptor
        .validate()
        .map_err(|reason| Error::InvalidDescriptor {
            path: path.to_path_buf(),
            reason,
        })?;
    Ok(Some(descriptor))
}

/// Write `descriptor` to `path`, creating parent directories as needed.
///
/// Keys are sorted and indented by four spaces so descriptors diff cleanly. The content goes to a
/// temporary file next to `path` which is then renamed over it, readers never see a partial file.
///
/// # Errors
///
/// Returns [`Error::FileAccess`] if the directory or file can't be written.
pub fn write_descriptor(path: &Path, descriptor: &HostDescriptor) -> Result<(), Error> {
    let access = |source| Error::FileAccess {
        path: path.to_path_buf(),
        source,
    };

    let data = to_sorted_json(descriptor).map_err(|source| Error::InvalidJSON {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(access)?;

    let mut output_file = NamedTempFile::new_in(dir).map_err(access)?;
    output_file.write_all(&data).map_err(access)?;
    output_file.flush().map_err(access)?;
    keep_permissions(path, output_file.as_file()).map_err(access)?;
    output_file.as_file().sync_all().map_err(access)?;
    output_file.persist(path).map_err(|err| access(err.error))?;

    tracing::debug!("wrote {}", path.display());
    Ok(())
}

fn to_sorted_json(descriptor: &HostDescriptor) -> Result<Vec<u8>, serde_json::Error> {
    // serde_json::Map is ordered by key, going through a Value sorts every level.
    let value = serde_json::to_value(descriptor)?;
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(unix)]
fn keep_permissions(path: &Path, file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // Temporary files are created 0600, descriptors are meant to be world readable.
    let mode = fs::metadata(path).map_or(0o644, |m| m.permissions().mode());
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn keep_permissions(_path: &Path, _file: &fs::File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_store::Ipv4Assignment;
    use serde_json::json;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    fn assignment(addr: [u8; 4]) -> Ipv4Assignment {
        Ipv4Assignment::new("10.0.0.0/24".parse().unwrap(), Ipv4Addr::from(addr))
    }

    #[test]
    fn missing_descriptor_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileHostStore::new(dir.path());
        assert_eq!(store.load("web1").unwrap(), None);
    }

    #[test]
    fn missing_hosts_dir_has_no_descriptors() {
        let dir = TempDir::new().unwrap();
        let store = FileHostStore::new(dir.path().join("hosts"));
        assert!(store.descriptors().unwrap().is_empty());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let mut store = FileHostStore::new(dir.path().join("hosts"));
        let mut descriptor = HostDescriptor::default();
        descriptor
            .ipv4
            .insert("private".to_string(), assignment([10, 0, 0, 2]));

        store.save("web1", &descriptor).unwrap();

        assert!(dir.path().join("hosts/web1/host.json").is_file());
        assert_eq!(store.load("web1").unwrap(), Some(descriptor));
    }

    #[test]
    fn writes_sorted_keys_with_four_space_indent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("host.json");
        let mut descriptor: HostDescriptor =
            serde_json::from_value(json!({ "zone": "fsn1", "comment": "db" })).unwrap();
        descriptor
            .ipv4
            .insert("private".to_string(), assignment([10, 0, 0, 3]));

        write_descriptor(&path, &descriptor).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let expected = r#"{
    "comment": "db",
    "ipv4": {
        "private": {
            "address": "10.0.0.3",
            "network": "10.0.0.0/24",
            "prefixLength": 24
        }
    },
    "zone": "fsn1"
}
"#;
        assert_eq!(written, expected);
    }

    #[test]
    fn scans_nested_descriptors_by_relative_name() {
        let dir = TempDir::new().unwrap();
        let mut store = FileHostStore::new(dir.path());
        store.save("web1", &HostDescriptor::default()).unwrap();
        store.save("db/primary", &HostDescriptor::default()).unwrap();
        fs::write(dir.path().join("web1/notes.json"), "not a descriptor").unwrap();

        let names: Vec<String> = store.descriptors().unwrap().into_keys().collect();
        assert_eq!(names, vec!["db/primary".to_string(), "web1".to_string()]);
    }

    #[test]
    fn malformed_descriptor_fails_the_scan() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("web1")).unwrap();
        fs::write(dir.path().join("web1/host.json"), "{ not json").unwrap();
        let store = FileHostStore::new(dir.path());

        let err = store.descriptors().unwrap_err();
        assert!(matches!(err, Error::InvalidJSON { .. }));
    }

    #[test]
    fn inconsistent_descriptor_is_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("web1")).unwrap();
        fs::write(
            dir.path().join("web1/host.json"),
            r#"{"ipv4": {"private": {"network": "10.0.0.0/24", "address": "192.168.0.2", "prefixLength": 24}}}"#,
        )
        .unwrap();
        let store = FileHostStore::new(dir.path());

        let err = store.load("web1").unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor { .. }));
    }
}
