use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::{DEFAULT_CACHE_TTL, DEFAULT_REQUEST_TIMEOUT};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no config path available (set XDG_CONFIG_HOME or HOME)")]
    PathUnavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub listen: Listen,
    pub probe: Probe,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Listen {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Probe {
    /// JSON file holding the server list under a `servers` key.
    pub registry_path: path::PathBuf,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Probe {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/chainwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::PathUnavailable);
    };

    Ok(path.join("chainwatch/config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: Listen { bind: "0.0.0.0".into(), port: 3000 },
            probe: Probe {
                registry_path: "servers-electrumx.json".into(),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
                cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            },
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Listen")?;
        write_1(f, "Bind Address", &self.listen.bind)?;
        write_1(f, "Port", &self.listen.port)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Registry Path", &self.probe.registry_path.display())?;
        write_1(f, "Request Timeout (s)", &self.probe.request_timeout_secs)?;
        write_1(f, "Cache TTL (s)", &self.probe.cache_ttl_secs)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/chainwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::Read)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Write)?;
        }

        fs::write(path, config_str).map_err(Error::Write)
    }
}
