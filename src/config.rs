//! Index configuration document.
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/deacheck",
//!   "update_interval_secs": 86400,
//!   "timeout_secs": 30,
//!   "sources": [
//!     { "name": "dea", "url": "https://example.com/dea.json" },
//!     { "name": "wildcard", "path": "/etc/deacheck/wildcard.json" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "http")]
use std::time::Duration;

use serde::Deserialize;

use crate::error::{IndexError, Result};
use crate::index::Index;
use crate::loader::FileLoader;
#[cfg(feature = "http")]
use crate::loader::{AutoLoader, HttpLoader};

/// One declared source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    /// Download URL
    #[serde(default)]
    pub url: Option<String>,
    /// Local JSON file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub sources: Vec<SourceConfig>,
    /// Cache directory for downloaded lists
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub update_interval_secs: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl IndexConfig {
    /// Parse a JSON configuration document
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| IndexError::ConfigError(format!("invalid configuration: {}", e)))
    }

    /// Read and parse a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            IndexError::ConfigError(format!(
                "failed to read configuration file \"{}\": {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.name.as_str())
    }

    /// Create an index declaring every configured source
    pub fn build_index(&self) -> Result<Index> {
        Index::new(self.source_names())
    }

    /// File loader for the sources that have a `path`
    pub fn file_loader(&self) -> FileLoader {
        self.sources
            .iter()
            .filter_map(|s| s.path.as_ref().map(|p| (s.name.as_str(), p)))
            .fold(FileLoader::new(), |loader, (name, path)| {
                loader.with_source(name, path)
            })
    }

    /// HTTP loader for the sources that have a `url`. Sources that also have a
    /// `path` keep the downloaded body there.
    #[cfg(feature = "http")]
    pub fn http_loader(&self) -> HttpLoader {
        let mut loader = HttpLoader::new();
        if let Some(timeout) = self.timeout_secs {
            loader = loader.with_timeout(Duration::from_secs(timeout));
        }
        for source in &self.sources {
            if let Some(ref url) = source.url {
                loader = loader.with_source(source.name.as_str(), url.as_str());
                if let Some(ref path) = source.path {
                    loader = loader.with_save_path(source.name.as_str(), path);
                }
            }
        }
        loader
    }

    /// Auto loader for the sources that have a `url`, caching in `data_dir`
    #[cfg(feature = "http")]
    pub fn auto_loader(&self) -> AutoLoader {
        let mut loader = AutoLoader::new();
        if let Some(ref dir) = self.data_dir {
            loader = loader.with_data_dir(dir);
        }
        if let Some(secs) = self.update_interval_secs {
            loader = loader.with_update_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.timeout_secs {
            loader = loader.with_timeout(Duration::from_secs(secs));
        }
        for source in &self.sources {
            if let Some(ref url) = source.url {
                loader = loader.with_source(source.name.as_str(), url.as_str());
            }
        }
        loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "data_dir": "/var/lib/deacheck",
        "update_interval_secs": 3600,
        "timeout_secs": 10,
        "sources": [
            { "name": "dea", "url": "https://example.com/dea.json" },
            { "name": "wildcard", "path": "/etc/deacheck/wildcard.json" }
        ]
    }"#;

    #[test]
    fn test_parse_config() {
        let config = IndexConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/deacheck")));
        assert_eq!(config.update_interval_secs, Some(3600));
        assert_eq!(
            config.sources[0].url.as_deref(),
            Some("https://example.com/dea.json")
        );
        assert_eq!(config.sources[1].url, None);
    }

    #[test]
    fn test_build_index() {
        let config = IndexConfig::from_json_str(CONFIG).unwrap();
        let index = config.build_index().unwrap();
        assert!(index.contains_source("dea"));
        assert!(index.contains_source("wildcard"));
        assert!(!index.contains_source("other"));
    }

    #[test]
    fn test_no_sources_is_config_error() {
        let config = IndexConfig::from_json_str(r#"{ "sources": [] }"#).unwrap();
        assert!(matches!(
            config.build_index(),
            Err(IndexError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        for text in [
            "",
            r#"{ "sources": [ { "url": "https://example.com" } ] }"#,
            r#"{ "sources": [], "unknown": 1 }"#,
        ] {
            let err = IndexConfig::from_json_str(text).unwrap_err();
            assert!(matches!(err, IndexError::ConfigError(_)), "{:?}", text);
        }
    }

    #[test]
    fn test_file_loader_from_config() {
        let config = IndexConfig::from_json_str(CONFIG).unwrap();
        let loader = config.file_loader();
        assert_eq!(
            loader.path("wildcard"),
            Some(Path::new("/etc/deacheck/wildcard.json"))
        );
        assert_eq!(loader.path("dea"), None);
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_loaders_from_config() {
        let config = IndexConfig::from_json_str(CONFIG).unwrap();

        let http = config.http_loader();
        assert_eq!(http.url("dea"), Some("https://example.com/dea.json"));
        assert_eq!(http.url("wildcard"), None);
        assert_eq!(http.timeout(), Duration::from_secs(10));

        let auto = config.auto_loader();
        assert_eq!(auto.update_interval, Duration::from_secs(3600));
        assert_eq!(
            auto.file_path("dea"),
            PathBuf::from("/var/lib/deacheck/dea.json")
        );
        assert!(auto.urls.contains_key("dea"));
        assert!(!auto.urls.contains_key("wildcard"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = IndexConfig::from_file("/nonexistent/deacheck.json").unwrap_err();
        assert!(matches!(err, IndexError::ConfigError(_)));
    }
}
