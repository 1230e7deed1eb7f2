use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IndexError, Result, SourceDataErrorKind};
use crate::index::Index;

use super::json::update_from_json;
use super::SourceLoader;

/// Open the JSON file at `path` and replace `source` with its contents.
pub fn update_from_file(index: &Index, source: &str, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();

    if !index.contains_source(source) {
        return Err(IndexError::UnknownSource(source.to_string()));
    }

    let file = File::open(path).map_err(|e| {
        IndexError::source_data(
            SourceDataErrorKind::Io,
            format!(
                "couldn't read data for \"{}\" from file \"{}\": {}",
                source,
                path.display(),
                e
            ),
        )
    })?;

    let count = update_from_json(index, source, BufReader::new(file))?;
    debug!(source, path = %path.display(), count, "loaded source from file");
    Ok(count)
}

/// File-based loader, one JSON file per source
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    paths: HashMap<String, PathBuf>,
}

impl FileLoader {
    /// Create a new FileLoader
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file path of a source
    pub fn with_source(mut self, source: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.paths.insert(source.into(), path.as_ref().to_path_buf());
        self
    }

    /// Configured file path of a source
    pub fn path(&self, source: &str) -> Option<&Path> {
        self.paths.get(source).map(PathBuf::as_path)
    }
}

impl SourceLoader for FileLoader {
    fn load(&self, index: &Index, source: &str) -> Result<usize> {
        let path = self.path(source).ok_or_else(|| {
            IndexError::ConfigError(format!("no file configured for source \"{}\"", source))
        })?;
        update_from_file(index, source, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_loader_builder() {
        let loader = FileLoader::new()
            .with_source("dea", "/tmp/dea.json")
            .with_source("wildcard", "/tmp/wildcard.json");

        assert_eq!(loader.path("dea"), Some(Path::new("/tmp/dea.json")));
        assert_eq!(loader.path("other"), None);
    }

    #[test]
    fn test_update_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"["example.com", "redsift.io"]"#).unwrap();

        let index = Index::new(["dea"]).unwrap();
        let count = FileLoader::new()
            .with_source("dea", file.path())
            .load(&index, "dea")
            .unwrap();

        assert_eq!(count, 2);
        assert!(index.has_domain("dea", "redsift.io"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::new(["dea"]).unwrap();
        index.replace_from_iter("dea", ["example.com"]).unwrap();

        let err = update_from_file(&index, "dea", dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.source_data_kind(), Some(SourceDataErrorKind::Io));
        assert!(index.has_domain("dea", "example.com"));
    }

    #[test]
    fn test_unconfigured_source_is_config_error() {
        let index = Index::new(["dea"]).unwrap();
        let err = FileLoader::new().load(&index, "dea").unwrap_err();
        assert!(matches!(err, IndexError::ConfigError(_)));
    }

    #[test]
    fn test_undeclared_source_checked_before_open() {
        let index = Index::new(["dea"]).unwrap();
        let err = update_from_file(&index, "wildcard", "/nonexistent/wildcard.json").unwrap_err();
        assert!(matches!(err, IndexError::UnknownSource(_)));
    }
}
