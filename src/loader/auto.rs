use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "async")]
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, warn};
use ureq::Agent;

use crate::error::{IndexError, Result};
use crate::index::Index;

use super::file::update_from_file;
use super::http::{build_agent, download_and_update, DEFAULT_HTTP_TIMEOUT};
use super::SourceLoader;

/// Default update interval: 1 day
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Auto loader with download support and an on-disk cache.
///
/// Each source is cached at `<data_dir>/<source>.json`. A cached file that is
/// missing, empty or older than the update interval is downloaded again; when
/// that download fails, the cached file is used if there is one. The cached
/// file is left stale in that case, so every later load retries the download
/// until one succeeds.
///
/// Source names become file names: a name that is empty or contains `/`, `\`
/// or `..` is rejected with [`IndexError::ConfigError`].
pub struct AutoLoader {
    pub data_dir: Option<PathBuf>,
    pub urls: HashMap<String, String>,
    pub update_interval: Duration,
    timeout: Duration,
    agent: Agent,
    // One load at a time, so a source never has two writers through this loader
    load_lock: Mutex<()>,
}

impl AutoLoader {
    /// Create a new AutoLoader
    pub fn new() -> Self {
        Self {
            data_dir: None,
            urls: HashMap::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            timeout: DEFAULT_HTTP_TIMEOUT,
            agent: build_agent(DEFAULT_HTTP_TIMEOUT),
            load_lock: Mutex::new(()),
        }
    }

    /// Set data directory
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the download URL of a source
    pub fn with_source(mut self, source: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(source.into(), url.into());
        self
    }

    /// Set update interval for checking file freshness
    /// Default is 1 day (DEFAULT_UPDATE_INTERVAL)
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set the download timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = build_agent(timeout);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cache file of a source
    pub fn file_path(&self, source: &str) -> PathBuf {
        let filename = format!("{}.json", source);
        match self.data_dir {
            Some(ref dir) => dir.join(filename),
            None => PathBuf::from(filename),
        }
    }

    /// Check if file needs download
    fn should_download(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(meta) => {
                if meta.len() == 0 {
                    return true;
                }
                match meta.modified() {
                    Ok(mtime) => SystemTime::now()
                        .duration_since(mtime)
                        .map(|d| d > self.update_interval)
                        .unwrap_or(true),
                    Err(_) => true,
                }
            }
            Err(_) => true,
        }
    }

    /// Load every configured source, in name order.
    ///
    /// A failing source does not stop the others; the first error is returned
    /// once all have been attempted.
    pub fn refresh(&self, index: &Index) -> Result<()> {
        let mut sources: Vec<&str> = self.urls.keys().map(String::as_str).collect();
        sources.sort_unstable();

        let mut first_err = None;
        for source in sources {
            if let Err(e) = self.load(index, source) {
                warn!(source, error = %e, "couldn't refresh source");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for AutoLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoLoader")
            .field("data_dir", &self.data_dir)
            .field("urls", &self.urls)
            .field("update_interval", &self.update_interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for AutoLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceLoader for AutoLoader {
    fn load(&self, index: &Index, source: &str) -> Result<usize> {
        let url = self.urls.get(source).ok_or_else(|| {
            IndexError::ConfigError(format!("no URL configured for source \"{}\"", source))
        })?;

        check_file_name(source)?;

        let _lock = self.load_lock.lock();
        let path = self.file_path(source);

        if self.should_download(&path) {
            debug!(source, path = %path.display(), "cached file needs download/update");
            match download_and_update(&self.agent, index, source, url, Some(&path)) {
                Ok(count) => return Ok(count),
                Err(e @ IndexError::UnknownSource(_)) => return Err(e),
                Err(e) if path.exists() => {
                    warn!(source, error = %e, "download failed, using existing file");
                }
                Err(e) => return Err(e),
            }
        }

        update_from_file(index, source, &path)
    }
}

/// Source names must stay inside `data_dir` once turned into `<source>.json`.
fn check_file_name(source: &str) -> Result<()> {
    if source.is_empty() || source.contains(&['/', '\\'][..]) || source.contains("..") {
        return Err(IndexError::ConfigError(format!(
            "source name \"{}\" can't be used as a cache file name",
            source
        )));
    }
    Ok(())
}

/// Run [`AutoLoader::refresh`] every `period` on a blocking task, starting
/// immediately. Errors are logged; the loop runs until the handle is aborted.
#[cfg(feature = "async")]
pub fn spawn_refresh(
    loader: Arc<AutoLoader>,
    index: Arc<Index>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let loader = Arc::clone(&loader);
            let index = Arc::clone(&index);
            match tokio::task::spawn_blocking(move || loader.refresh(&index)).await {
                Ok(Ok(())) => debug!("scheduled refresh completed"),
                Ok(Err(e)) => warn!(error = %e, "scheduled refresh failed"),
                Err(e) => warn!(error = %e, "refresh task did not complete"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceDataErrorKind;

    const UNREACHABLE: &str = "http://127.0.0.1:1/dea.json";

    #[test]
    fn test_auto_loader_builder_pattern() {
        let loader = AutoLoader::new()
            .with_data_dir("/tmp/test")
            .with_source("dea", "http://example.com/dea.json")
            .with_update_interval(Duration::from_secs(3600))
            .with_timeout(Duration::from_secs(5));

        assert_eq!(loader.data_dir, Some(PathBuf::from("/tmp/test")));
        assert_eq!(loader.update_interval, Duration::from_secs(3600));
        assert_eq!(loader.timeout(), Duration::from_secs(5));
        assert_eq!(loader.file_path("dea"), PathBuf::from("/tmp/test/dea.json"));
    }

    #[test]
    fn test_file_path_without_data_dir() {
        let loader = AutoLoader::new();
        assert_eq!(loader.file_path("dea"), PathBuf::from("dea.json"));
    }

    #[test]
    fn test_should_download() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AutoLoader::new().with_data_dir(dir.path());
        let path = loader.file_path("dea");

        assert!(loader.should_download(&path), "missing file");

        fs::write(&path, "").unwrap();
        assert!(loader.should_download(&path), "empty file");

        fs::write(&path, r#"["example.com"]"#).unwrap();
        assert!(!loader.should_download(&path), "fresh file");

        let stale = AutoLoader::new().with_update_interval(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        assert!(stale.should_download(&path), "stale file");
    }

    #[test]
    fn test_fresh_file_is_loaded_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AutoLoader::new()
            .with_data_dir(dir.path())
            .with_source("dea", UNREACHABLE);
        fs::write(loader.file_path("dea"), r#"["example.com"]"#).unwrap();

        let index = Index::new(["dea"]).unwrap();
        assert_eq!(loader.load(&index, "dea").unwrap(), 1);
        assert!(index.has_domain("dea", "example.com"));
    }

    #[test]
    fn test_failed_download_falls_back_to_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AutoLoader::new()
            .with_data_dir(dir.path())
            .with_source("dea", UNREACHABLE)
            .with_update_interval(Duration::ZERO)
            .with_timeout(Duration::from_secs(2));
        fs::write(loader.file_path("dea"), r#"["example.com"]"#).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let index = Index::new(["dea"]).unwrap();
        assert_eq!(loader.load(&index, "dea").unwrap(), 1);
        assert!(index.has_domain("dea", "example.com"));
    }

    #[test]
    fn test_stale_cache_is_retried_after_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AutoLoader::new()
            .with_data_dir(dir.path())
            .with_source("dea", UNREACHABLE)
            .with_update_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(2));
        let path = loader.file_path("dea");
        fs::write(&path, r#"["example.com"]"#).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let index = Index::new(["dea"]).unwrap();
        loader.load(&index, "dea").unwrap();

        assert!(loader.should_download(&path), "fallback must not refresh the cache");
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"["example.com"]"#);
    }

    #[test]
    fn test_unsafe_source_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let names = ["", "/tmp/owned", "../escape", "a/b", "a\\b", "..", "x..y"];
        let mut loader = AutoLoader::new().with_data_dir(&data_dir);
        for name in names {
            loader = loader.with_source(name, UNREACHABLE);
        }

        let index = Index::new(names).unwrap();
        for name in names {
            let err = loader.load(&index, name).unwrap_err();
            assert!(matches!(err, IndexError::ConfigError(_)), "{:?} gave {:?}", name, err);
        }
        assert!(!data_dir.exists());
        assert!(!dir.path().join("escape.json").exists());
    }

    #[test]
    fn test_debug_skips_agent() {
        let loader = AutoLoader::new().with_source("dea", UNREACHABLE);
        let out = format!("{:?}", loader);
        assert!(out.starts_with("AutoLoader"));
        assert!(out.contains(UNREACHABLE));
        assert!(!out.contains("agent"));
    }

    #[test]
    fn test_failed_download_without_cache_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AutoLoader::new()
            .with_data_dir(dir.path())
            .with_source("dea", UNREACHABLE)
            .with_timeout(Duration::from_secs(2));

        let index = Index::new(["dea"]).unwrap();
        let err = loader.load(&index, "dea").unwrap_err();
        assert_eq!(err.source_data_kind(), Some(SourceDataErrorKind::Transport));
    }

    #[test]
    fn test_refresh_attempts_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AutoLoader::new()
            .with_data_dir(dir.path())
            .with_source("dea", UNREACHABLE)
            .with_source("wildcard", UNREACHABLE)
            .with_timeout(Duration::from_secs(2));
        // only "wildcard" has a usable cache
        fs::write(loader.file_path("wildcard"), r#"["redsift.io"]"#).unwrap();

        let index = Index::new(["dea", "wildcard"]).unwrap();
        let err = loader.refresh(&index).unwrap_err();

        assert_eq!(err.source_data_kind(), Some(SourceDataErrorKind::Transport));
        assert!(index.has_domain("wildcard", "redsift.io"));
    }
}
