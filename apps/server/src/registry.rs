use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

/// On-disk shape of the server list file.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    servers: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry file: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid registry format: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered list of server addresses to probe, loaded once at startup.
///
/// Duplicates are kept as distinct probe targets and the order of the file is
/// the order of every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    servers: Vec<String>,
}

impl Registry {
    pub fn from_servers(servers: Vec<String>) -> Self {
        Self { servers }
    }

    /// Load the registry from a JSON file holding `{"servers": [...]}`.
    ///
    /// A missing or malformed file is not fatal: it is logged and an empty
    /// registry is returned, which the sweep reports as its sentinel result.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(registry) => {
                info!(path = %path.display(), servers = registry.len(), "loaded server registry");
                registry
            }
            Err(error) => {
                error!(path = %path.display(), %error, "failed to load server registry");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, RegistryError> {
        let raw = fs::read_to_string(path)?;
        let file: RegistryFile = serde_json::from_str(&raw)?;
        Ok(Self::from_servers(file.servers))
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn loads_servers_in_file_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("servers.json");
        fs::write(&path, r#"{"servers": ["wss://a:50004", "ws://b:50003", "wss://a:50004"]}"#)?;

        let registry = Registry::load(&path);
        assert_eq!(registry.servers(), ["wss://a:50004", "ws://b:50003", "wss://a:50004"]);
        Ok(())
    }

    #[test]
    fn missing_file_yields_empty_registry() {
        let registry = Registry::load(Path::new("/nonexistent/servers.json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn malformed_file_yields_empty_registry() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("servers.json");
        fs::write(&path, r#"{"servers": "not-a-list"}"#)?;

        assert!(Registry::load(&path).is_empty());
        Ok(())
    }
}
