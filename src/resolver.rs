use crate::config::Remote;
use crate::error::{Result, TikaError};
use crate::util::{basename, looks_like_url};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, info, warn};
use url::Url;

/// A request target that passed validation.
pub enum ResolvedFile {
    Local(PathBuf),
    Remote(Url),
    /// Remote file fetched to a temp path; the file is removed on drop.
    Downloaded { url: Url, path: TempPath },
}

impl ResolvedFile {
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            ResolvedFile::Local(p) => Some(p.as_path()),
            ResolvedFile::Downloaded { path, .. } => Some(&**path),
            ResolvedFile::Remote(_) => None,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match self {
            ResolvedFile::Remote(url) | ResolvedFile::Downloaded { url, .. } => Some(url),
            ResolvedFile::Local(_) => None,
        }
    }

    pub fn display_target(&self) -> String {
        match self {
            ResolvedFile::Local(p) => p.display().to_string(),
            ResolvedFile::Downloaded { path, .. } => path.display().to_string(),
            ResolvedFile::Remote(url) => url.to_string(),
        }
    }
}

impl fmt::Debug for ResolvedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedFile::Local(p) => f.debug_tuple("Local").field(p).finish(),
            ResolvedFile::Remote(u) => f.debug_tuple("Remote").field(&u.as_str()).finish(),
            ResolvedFile::Downloaded { url, path } => f
                .debug_struct("Downloaded")
                .field("url", &url.as_str())
                .field("path", &path.to_path_buf())
                .finish(),
        }
    }
}

pub struct FileResolver {
    http: HttpClient,
}

impl FileResolver {
    pub fn new(remote: &Remote) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if remote.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(remote.timeout_seconds));
        }
        let http = builder
            .build()
            .map_err(|e| TikaError::Configuration(format!("building HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Checks that `file` exists (local) or answers 200 (remote), downloading
    /// remote files when `download` is set.
    pub fn resolve(&self, file: &str, download: bool) -> Result<ResolvedFile> {
        if !looks_like_url(file) {
            let path = PathBuf::from(file);
            if !path.is_file() {
                return Err(TikaError::NotFound {
                    path: file.to_string(),
                });
            }
            return Ok(ResolvedFile::Local(path));
        }

        let url = Url::parse(file.trim()).map_err(|e| TikaError::NotFoundRemote {
            url: file.to_string(),
            reason: format!("invalid URL: {e}"),
        })?;
        self.probe(&url)?;
        if download {
            let path = self.download(&url)?;
            return Ok(ResolvedFile::Downloaded { url, path });
        }
        Ok(ResolvedFile::Remote(url))
    }

    fn probe(&self, url: &Url) -> Result<()> {
        debug!("probe remote {}", url);
        let resp = self
            .http
            .head(url.clone())
            .send()
            .map_err(|e| TikaError::NotFoundRemote {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if resp.status() != StatusCode::OK {
            return Err(TikaError::NotFoundRemote {
                url: url.to_string(),
                reason: format!("status {}", resp.status().as_u16()),
            });
        }
        Ok(())
    }

    fn download(&self, url: &Url) -> Result<TempPath> {
        let download_err = |reason: String| TikaError::Download {
            url: url.to_string(),
            reason,
        };
        let mut resp = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(download_err(format!("status {}", resp.status().as_u16())));
        }

        // keep the extension so the engine's type detection has a hint
        let name = basename(url.as_str());
        let suffix = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new()
            .prefix("tika-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| TikaError::io(std::env::temp_dir().display().to_string(), e))?;
        let bytes = resp
            .copy_to(tmp.as_file_mut())
            .map_err(|e| download_err(e.to_string()))?;
        tmp.as_file_mut()
            .flush()
            .map_err(|e| TikaError::io(tmp.path().display().to_string(), e))?;
        if bytes == 0 {
            warn!("downloaded empty file from {}", url);
        }
        info!("downloaded {} ({} bytes) to {}", url, bytes, tmp.path().display());
        Ok(tmp.into_temp_path())
    }
}
