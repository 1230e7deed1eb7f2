use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};
use ureq::Agent;

use crate::error::{IndexError, Result, SourceDataErrorKind};
use crate::index::Index;

use super::json::decode_domains;
use super::SourceLoader;

/// Default timeout for a whole download
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP loader: GETs a JSON array per source, optionally keeping a copy of the
/// downloaded body on disk.
pub struct HttpLoader {
    urls: HashMap<String, String>,
    save_paths: HashMap<String, PathBuf>,
    timeout: Duration,
    agent: Agent,
}

impl HttpLoader {
    /// Create a new HttpLoader
    pub fn new() -> Self {
        Self {
            urls: HashMap::new(),
            save_paths: HashMap::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            agent: build_agent(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Set the download URL of a source
    pub fn with_source(mut self, source: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(source.into(), url.into());
        self
    }

    /// Keep the downloaded body of a source at `path`
    pub fn with_save_path(mut self, source: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.save_paths
            .insert(source.into(), path.as_ref().to_path_buf());
        self
    }

    /// Set the download timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = build_agent(timeout);
        self
    }

    /// Configured download URL of a source
    pub fn url(&self, source: &str) -> Option<&str> {
        self.urls.get(source).map(String::as_str)
    }

    /// Configured save path of a source
    pub fn save_path(&self, source: &str) -> Option<&Path> {
        self.save_paths.get(source).map(PathBuf::as_path)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for HttpLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLoader")
            .field("urls", &self.urls)
            .field("save_paths", &self.save_paths)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceLoader for HttpLoader {
    fn load(&self, index: &Index, source: &str) -> Result<usize> {
        let url = self.url(source).ok_or_else(|| {
            IndexError::ConfigError(format!("no URL configured for source \"{}\"", source))
        })?;
        download_and_update(&self.agent, index, source, url, self.save_path(source))
    }
}

pub(crate) fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// GET `url` and replace `source` with the body. With `save_path`, the body
/// is also written to that file, which is only replaced if the body decoded.
pub(crate) fn download_and_update(
    agent: &Agent,
    index: &Index,
    source: &str,
    url: &str,
    save_path: Option<&Path>,
) -> Result<usize> {
    if !index.contains_source(source) {
        return Err(IndexError::UnknownSource(source.to_string()));
    }

    let response = agent.get(url).call().map_err(|e| {
        IndexError::source_data(
            SourceDataErrorKind::Transport,
            format!("couldn't download data for \"{}\" from \"{}\": {}", source, url, e),
        )
    })?;
    let body = BufReader::new(response.into_body().into_reader());

    let count = match save_path {
        Some(path) => save_and_update(index, source, body, path)?,
        None => index.rebuild(source, |builder| {
            decode_domains(builder, source, body, SourceDataErrorKind::Transport)
        })?,
    };

    debug!(source, url, count, "loaded source from URL");
    Ok(count)
}

/// Decode `reader` into `source` while copying it to `path`.
///
/// The copy goes to `<path>.tmp` and is renamed over `path` before the new
/// list is published. On any failure the temporary file is removed and both
/// the previous file and the previous list stay as they were.
pub(crate) fn save_and_update<R: Read>(
    index: &Index,
    source: &str,
    reader: R,
    path: &Path,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = tmp_path(path);

    let count = index.rebuild(source, |builder| {
        let file = File::create(&tmp_path)?;
        let mut tee = TeeReader::new(reader, BufWriter::new(file));

        let saved = decode_domains(builder, source, &mut tee, SourceDataErrorKind::Transport)
            .and_then(|()| tee.finish().map_err(IndexError::from))
            .and_then(|()| fs::rename(&tmp_path, path).map_err(IndexError::from));

        if saved.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        saved
    })?;

    info!(source, path = %path.display(), count, "saved source snapshot");
    Ok(count)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Reader that writes everything it reads to `writer`.
struct TeeReader<R, W: Write> {
    reader: R,
    writer: BufWriter<W>,
}

impl<R: Read> TeeReader<R, File> {
    fn new(reader: R, writer: BufWriter<File>) -> Self {
        Self { reader, writer }
    }

    /// Flush and sync the copy to disk.
    fn finish(self) -> io::Result<()> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl<R: Read, W: Write> Read for TeeReader<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.writer.write_all(&buf[..n])?;
        Ok(n)
    }
}
