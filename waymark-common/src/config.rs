//! Configuration loading and data folder resolution
//!
//! Every setting resolves through the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`WAYMARK_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default bind address for the web service
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";

const DEFAULT_VENUE_API_URL: &str = "https://api.foursquare.com/v2";
const DEFAULT_VENUE_API_VERSION: &str = "20160822";

/// TOML configuration file contents (all fields optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub bind_address: Option<String>,
    pub locations_url: Option<String>,
    #[serde(default)]
    pub venue: VenueToml,
}

/// Venue API section of the TOML config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueToml {
    pub api_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_version: Option<String>,
}

/// Command-line overrides (highest-priority configuration tier)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_folder: Option<String>,
    pub config_file: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub locations_url: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub locations_url: String,
    pub venue: VenueConfig,
}

/// Resolved venue API access parameters
#[derive(Debug, Clone)]
pub struct VenueConfig {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_version: String,
}

impl Config {
    /// Resolve the full configuration from all four tiers
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let toml_config = load_toml_config(overrides.config_file.as_deref())?;

        let root_folder = resolve_value(
            overrides.root_folder.clone(),
            "WAYMARK_ROOT_FOLDER",
            toml_config.root_folder.clone(),
        )
        .map(PathBuf::from)
        .unwrap_or_else(default_root_folder);

        let bind_address = resolve_value(
            overrides.bind_address.clone(),
            "WAYMARK_BIND_ADDRESS",
            toml_config.bind_address.clone(),
        )
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let locations_url = resolve_value(
            overrides.locations_url.clone(),
            "WAYMARK_LOCATIONS_URL",
            toml_config.locations_url.clone(),
        )
        .ok_or_else(|| {
            Error::Config(
                "Location feed URL not configured. Please configure using one of:\n\
                 1. Command line: --locations-url https://example.com/data/app.json\n\
                 2. Environment: WAYMARK_LOCATIONS_URL=https://example.com/data/app.json\n\
                 3. TOML config: locations_url = \"https://example.com/data/app.json\""
                    .to_string(),
            )
        })?;

        let venue = VenueConfig {
            api_url: resolve_value(None, "WAYMARK_VENUE_API_URL", toml_config.venue.api_url.clone())
                .unwrap_or_else(|| DEFAULT_VENUE_API_URL.to_string()),
            client_id: resolve_value(None, "WAYMARK_VENUE_CLIENT_ID", toml_config.venue.client_id.clone())
                .unwrap_or_default(),
            client_secret: resolve_value(
                None,
                "WAYMARK_VENUE_CLIENT_SECRET",
                toml_config.venue.client_secret.clone(),
            )
            .unwrap_or_default(),
            api_version: resolve_value(
                None,
                "WAYMARK_VENUE_API_VERSION",
                toml_config.venue.api_version.clone(),
            )
            .unwrap_or_else(|| DEFAULT_VENUE_API_VERSION.to_string()),
        };

        if venue.client_id.is_empty() || venue.client_secret.is_empty() {
            warn!("Venue API credentials not configured; enrichment loads will fail until set");
        }

        Ok(Self {
            root_folder,
            bind_address,
            locations_url,
            venue,
        })
    }

    /// Path of the service database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("waymark.db")
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Apply the CLI → env → TOML priority to one setting
fn resolve_value(cli: Option<String>, env_var: &str, toml: Option<String>) -> Option<String> {
    if let Some(value) = cli {
        return Some(value);
    }
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml
}

/// Load the TOML config file
///
/// An explicitly given path must exist and parse. The default path is
/// optional; a malformed file there degrades to defaults with a warning.
fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
        return toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)));
    }

    let Some(path) = default_config_path() else {
        return Ok(TomlConfig::default());
    };
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                Ok(TomlConfig::default())
            }
        },
        Err(e) => {
            warn!("Ignoring unreadable config file {}: {}", path.display(), e);
            Ok(TomlConfig::default())
        }
    }
}

/// Default configuration file path for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("waymark").join("config.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("waymark"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/waymark"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("waymark"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/waymark"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("waymark"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\waymark"))
    } else {
        PathBuf::from("./waymark_data")
    }
}
