//! Configuration management
//!
//! Settings live in a `settings.json` in the data directory:
//! ```json
//! {
//!   "server": { "port": 3000, "defaultPageLimit": 50 },
//!   "importProfiles": { "profiles": { ... } }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;

fn default_port() -> u16 {
    3000
}

fn default_page_limit() -> i64 {
    50
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    import_profiles: ImportProfilesContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_page_limit")]
    default_page_limit: i64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            default_page_limit: default_page_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportProfilesContainer {
    #[serde(default)]
    profiles: HashMap<String, ImportProfile>,
}

/// Finbook configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub default_page_limit: i64,
    pub import_profiles: HashMap<String, ImportProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            default_page_limit: default_page_limit(),
            import_profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// The port can be overridden via FINBOOK_PORT (for CI/testing).
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let port = std::env::var("FINBOOK_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(raw.server.port);

        Ok(Self {
            port,
            default_page_limit: raw.server.default_page_limit,
            import_profiles: raw.import_profiles.profiles,
        })
    }

    /// Save config to the data directory
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let settings = SettingsFile {
            server: ServerSettings {
                port: self.port,
                default_page_limit: self.default_page_limit,
            },
            import_profiles: ImportProfilesContainer {
                profiles: self.import_profiles.clone(),
            },
        };

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

/// Saved CSV import profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProfile {
    pub column_mappings: ColumnMappings,
}

/// Column mappings from CSV headers to transaction fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMappings {
    pub date: String,
    pub reference: String,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Optional running-balance column
    #[serde(default)]
    pub balance: Option<String>,
}

impl Default for ColumnMappings {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            reference: "Reference".to_string(),
            amount: "Amount".to_string(),
            description: Some("Description".to_string()),
            balance: None,
        }
    }
}
