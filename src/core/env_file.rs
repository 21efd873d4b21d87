//! Bedrock `.env` descriptor reading.

use crate::error::{Error, Result};
use crate::transport::FileTransfer;
use crate::utils::io;
use std::path::{Path, PathBuf};

pub const ENV_FILE: &str = ".env";
pub const REMOTE_ENV_COPY: &str = ".env-remote";
pub const WP_HOME: &str = "WP_HOME";

/// Flat `KEY=VALUE` file contents, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    entries: Vec<(String, String)>,
}

impl EnvironmentDescriptor {
    pub fn parse(content: &str) -> Self {
        let mut descriptor = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            descriptor.set(key, unquote(value.trim()));
        }

        descriptor
    }

    fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-empty value for `key`, or an [`ErrorCode::EnvReadFailed`](crate::ErrorCode) naming `origin`.
    pub fn require(&self, key: &str, origin: &str) -> Result<String> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            Some(_) => Err(Error::env_read_failed(origin, key, "value is empty")),
            None => Err(Error::env_read_failed(origin, key, "key is missing")),
        }
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn read_descriptor(path: &Path) -> Result<EnvironmentDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::env_read_failed(path.display().to_string(), WP_HOME, e.to_string())
    })?;
    Ok(EnvironmentDescriptor::parse(&content))
}

/// `WP_HOME` from `<local_root>/.env`.
pub fn read_local_home(local_root: &Path) -> Result<String> {
    let path = local_root.join(ENV_FILE);
    read_descriptor(&path)?.require(WP_HOME, &format!("local {}", path.display()))
}

/// Deletes the downloaded copy whichever way reading ends.
struct TempCopy(PathBuf);

impl Drop for TempCopy {
    fn drop(&mut self) {
        let _ = io::remove_file_if_exists(&self.0, "remove remote .env copy");
    }
}

/// `WP_HOME` from `<current_path>/.env` on the stage host.
///
/// The file is fetched to `<local_root>/.env-remote` and removed again after parsing.
pub fn read_remote_home(
    transfer: &(impl FileTransfer + ?Sized),
    current_path: &str,
    local_root: &Path,
) -> Result<String> {
    let remote = format!("{}/{}", current_path.trim_end_matches('/'), ENV_FILE);
    let copy = TempCopy(local_root.join(REMOTE_ENV_COPY));
    let origin = format!("remote {}", remote);

    transfer
        .download(&remote, &copy.0.display().to_string())
        .map_err(|e| Error::env_read_failed(origin.clone(), WP_HOME, e.message.clone()))?;

    read_descriptor(&copy.0)?.require(WP_HOME, &origin)
}
