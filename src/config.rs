//! Chef configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file at all) produces
//! the stock OpenStax channel configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::license::LicenseTable;
use crate::paths::ChefPaths;

/// Channel-level metadata for the channel root node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelInfo {
    pub source_domain: String,
    pub source_id: String,
    pub title: String,
    pub language: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}

impl Default for ChannelInfo {
    fn default() -> Self {
        Self {
            source_domain: "openstax.org".into(),
            source_id: "open-stax".into(),
            title: "Open Stax".into(),
            language: "en".into(),
            thumbnail: Some(
                "https://pbs.twimg.com/profile_images/461533721493897216/Q-kxGJ-b_400x400.png"
                    .into(),
            ),
            description: None,
        }
    }
}

/// HTTP fetch behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay before retry `n` is `n * backoff_ms`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_retries() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Top-level chef configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChefConfig {
    /// Catalog API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Cache directory for PDFs, thumbnails and chapters.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// JSON page-index override file.
    #[serde(default = "default_page_index_file")]
    pub page_index_file: PathBuf,
    /// Directory holding hand-converted cover assets.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default = "default_copyright_holder")]
    pub copyright_holder: String,
    #[serde(default)]
    pub channel: ChannelInfo,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Extra catalog license names, mapped to license kind strings.
    #[serde(default)]
    pub licenses: HashMap<String, String>,
}

fn default_base_url() -> String {
    "https://openstax.org/api".into()
}
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}
fn default_page_index_file() -> PathBuf {
    PathBuf::from("pages.json")
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_copyright_holder() -> String {
    "Rice University".into()
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_dir: default_download_dir(),
            page_index_file: default_page_index_file(),
            assets_dir: default_assets_dir(),
            copyright_holder: default_copyright_holder(),
            channel: ChannelInfo::default(),
            fetch: FetchConfig::default(),
            licenses: HashMap::new(),
        }
    }
}

impl ChefConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            crate::paths::create_dir(parent)?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Filesystem layout rooted at `download_dir`.
    pub fn paths(&self) -> ChefPaths {
        ChefPaths::new(self.download_dir.clone())
    }

    /// License table with the configured extra entries.
    pub fn license_table(&self) -> ConfigResult<LicenseTable> {
        LicenseTable::with_extra(&self.licenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::LicenseKind;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ChefConfig::from_toml("", Path::new("chef.toml")).unwrap();
        assert_eq!(config, ChefConfig::default());
        assert_eq!(config.channel.source_id, "open-stax");
        assert_eq!(config.fetch.retries, 3);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml = r#"
            base_url = "http://localhost:8000/api"

            [fetch]
            retries = 0

            [licenses]
            "Creative Commons Attribution-ShareAlike License" = "CC BY-SA"
        "#;
        let config = ChefConfig::from_toml(toml, Path::new("chef.toml")).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.fetch.retries, 0);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.copyright_holder, "Rice University");

        let table = config.license_table().unwrap();
        assert_eq!(
            table.lookup("Creative Commons Attribution-ShareAlike License"),
            Some(LicenseKind::CcBySa)
        );
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf").join("chef.toml");
        let mut config = ChefConfig::default();
        config.copyright_holder = "Example University".into();
        config.save(&path).unwrap();

        let loaded = ChefConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = ChefConfig::from_toml("base_url = [", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
