use crate::cache::{CachedResponse, ResponseCache};
use crate::config::Config;
use crate::error::{Result, TikaError};
use crate::metadata::{self, Metadata};
use crate::request::{RecursiveFormat, RequestKind};
use crate::resolver::{FileResolver, ResolvedFile};
use crate::response::{self, MimeTypeInfo};
use crate::sink::{SinkMode, StreamSink};
use crate::transport::{ProcessTransport, ServiceTransport, Transport, TransportRequest};
use crate::versions;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type ProcessClient = Client<ProcessTransport>;
pub type ServiceClient = Client<ServiceTransport>;
/// Client whose transport was chosen at runtime from the configured target.
pub type AnyClient = Client<Box<dyn Transport>>;

pub struct Client<T: Transport> {
    transport: T,
    resolver: FileResolver,
    cache: ResponseCache,
    encoding: Option<String>,
    retries: u32,
    download_remote: bool,
    sink: Option<StreamSink>,
    checked: bool,
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport.name())
            .field("encoding", &self.encoding)
            .field("retries", &self.retries)
            .field("download_remote", &self.download_remote)
            .field("sink", &self.sink)
            .field("cached", &self.cache.len())
            .field("checked", &self.checked)
            .finish()
    }
}

enum Fetched {
    Cached(CachedResponse),
    Raw(String),
}

impl AnyClient {
    /// Picks the transport from the target's shape: a `.jar` path runs the
    /// engine as a process, anything else is a server host.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let transport: Box<dyn Transport> = if cfg.is_process_target() {
            Box::new(ProcessTransport::new(
                Path::new(cfg.client.target.trim()),
                &cfg.process,
                cfg.client.chunk_size,
            )?)
        } else {
            Box::new(ServiceTransport::new(
                &cfg.client.target,
                Some(cfg.client.port),
                &cfg.service,
            )?)
        };
        info!("tika client using {} transport", transport.name());
        Client::with_transport(transport, cfg)
    }

    pub fn make(target: &str, port: Option<u16>) -> Result<Self> {
        let mut cfg = Config::default();
        cfg.client.target = target.to_string();
        if let Some(port) = port {
            cfg.client.port = port;
        }
        Self::from_config(&cfg)
    }
}

impl ProcessClient {
    pub fn process(jar: &Path, cfg: &Config) -> Result<Self> {
        let transport = ProcessTransport::new(jar, &cfg.process, cfg.client.chunk_size)?;
        Client::with_transport(transport, cfg)
    }

    pub fn set_java(&mut self, java: &str) -> Result<&mut Self> {
        self.transport.set_java(java)?;
        Ok(self)
    }

    pub fn set_java_args(&mut self, args: Vec<String>) -> &mut Self {
        self.transport.set_java_args(args);
        self
    }

    pub fn set_env_vars(&mut self, env: BTreeMap<String, String>) -> &mut Self {
        self.transport.set_env(env);
        self
    }
}

impl ServiceClient {
    pub fn service(host: &str, port: Option<u16>, cfg: &Config) -> Result<Self> {
        let transport = ServiceTransport::new(host, port, &cfg.service)?;
        Client::with_transport(transport, cfg)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.transport.set_header(name, value)?;
        Ok(self)
    }

    pub fn set_ocr_languages(&mut self, languages: Vec<String>) -> Result<&mut Self> {
        self.transport.set_ocr_languages(languages)?;
        Ok(self)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T, cfg: &Config) -> Result<Self> {
        let mut client = Self {
            transport,
            resolver: FileResolver::new(&cfg.remote)?,
            cache: ResponseCache::new(),
            encoding: None,
            retries: 1,
            download_remote: cfg.client.download_remote,
            sink: None,
            checked: false,
        };
        client.set_retries(cfg.client.retries)?;
        if let Some(enc) = cfg.client.encoding.as_deref() {
            client.set_encoding(enc)?;
        }
        if cfg.client.check_version {
            client.check()?;
        }
        Ok(client)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn download_remote(&self) -> bool {
        self.download_remote
    }

    pub fn chunk_size(&self) -> Option<usize> {
        self.transport.chunk_size()
    }

    pub fn has_callback(&self) -> bool {
        self.sink.is_some()
    }

    pub fn set_encoding(&mut self, encoding: &str) -> Result<&mut Self> {
        let encoding = encoding.trim();
        if encoding.is_empty() {
            return Err(TikaError::InvalidArgument("encoding must not be empty".into()));
        }
        self.encoding = Some(encoding.to_string());
        Ok(self)
    }

    pub fn set_callback<F>(&mut self, callback: F, append: bool) -> &mut Self
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        self.sink = Some(StreamSink::new(callback, SinkMode::from_append(append)));
        self
    }

    pub fn clear_callback(&mut self) -> &mut Self {
        self.sink = None;
        self
    }

    pub fn set_chunk_size(&mut self, size: usize) -> Result<&mut Self> {
        self.transport.set_chunk_size(size)?;
        Ok(self)
    }

    pub fn set_download_remote(&mut self, download: bool) -> &mut Self {
        self.download_remote = download;
        self
    }

    /// Maximum attempts per request, counting the first one.
    pub fn set_retries(&mut self, retries: u32) -> Result<&mut Self> {
        if retries == 0 {
            return Err(TikaError::InvalidArgument("retries must be at least 1".into()));
        }
        self.retries = retries;
        Ok(self)
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<&mut Self> {
        self.transport.set_timeout(timeout)?;
        Ok(self)
    }

    /// Verifies once that the engine runs a supported version.
    pub fn check(&mut self) -> Result<()> {
        if self.checked {
            return Ok(());
        }
        let version = versions::normalize_version(&self.version()?);
        if !versions::is_version_supported(&version)? {
            return Err(TikaError::VersionUnsupported(version));
        }
        debug!("engine version {} is supported", version);
        self.checked = true;
        Ok(())
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn supported_versions() -> Result<&'static [String]> {
        versions::supported_versions()
    }

    pub fn is_version_supported(version: &str) -> Result<bool> {
        versions::is_version_supported(version)
    }

    /// Capability kinds resolve to `None`.
    pub fn check_request(&self, kind: RequestKind, file: Option<&str>) -> Result<Option<ResolvedFile>> {
        if kind.is_capability() {
            return Ok(None);
        }
        let file = file
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| TikaError::InvalidArgument(format!("request '{kind}' requires a file")))?;
        self.resolver
            .resolve(file, self.download_remote)
            .map(Some)
    }

    pub fn metadata(&mut self, file: &str) -> Result<Metadata> {
        let kind = RequestKind::Metadata;
        let value = match self.fetch(kind, Some(file))? {
            Fetched::Cached(CachedResponse::Json(value)) => value,
            Fetched::Cached(CachedResponse::Text(raw)) | Fetched::Raw(raw) => {
                response::parse_json(&raw, file)?
            }
        };
        let meta = Metadata::from_value(value.clone(), file)?;
        self.cache.store(file, kind, CachedResponse::Json(value));
        Ok(meta)
    }

    pub fn recursive_metadata(&mut self, file: &str, format: &str) -> Result<IndexMap<String, Metadata>> {
        let format = RecursiveFormat::parse_optional(format)?;
        let kind = RequestKind::RecursiveMetadata(format);
        let raw = self.fetch_raw(kind, Some(file))?;
        let items = response::expect_array(response::parse_json(&raw, file)?, file)?;
        metadata::recursive_from_items(items, file)
    }

    pub fn language(&mut self, file: &str) -> Result<String> {
        self.single_value(RequestKind::Language, file)
    }

    pub fn mime(&mut self, file: &str) -> Result<String> {
        self.single_value(RequestKind::Mime, file)
    }

    pub fn html(&mut self, file: &str) -> Result<String> {
        self.fetch_raw(RequestKind::Html, Some(file))
    }

    pub fn html_with<F>(&mut self, file: &str, callback: F, append: bool) -> Result<String>
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        self.set_callback(callback, append);
        self.html(file)
    }

    pub fn text(&mut self, file: &str) -> Result<String> {
        self.fetch_raw(RequestKind::Text, Some(file))
    }

    pub fn text_with<F>(&mut self, file: &str, callback: F, append: bool) -> Result<String>
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        self.set_callback(callback, append);
        self.text(file)
    }

    pub fn main_text(&mut self, file: &str) -> Result<String> {
        self.fetch_raw(RequestKind::MainText, Some(file))
    }

    pub fn main_text_with<F>(&mut self, file: &str, callback: F, append: bool) -> Result<String>
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        self.set_callback(callback, append);
        self.main_text(file)
    }

    pub fn version(&mut self) -> Result<String> {
        Ok(self.fetch_raw(RequestKind::Version, None)?.trim().to_string())
    }

    pub fn available_detectors(&mut self) -> Result<Vec<String>> {
        let raw = self.fetch_raw(RequestKind::Detectors, None)?;
        response::decode_components(&raw, self.transport.listing_format(), "detectors")
    }

    pub fn available_parsers(&mut self) -> Result<Vec<String>> {
        let raw = self.fetch_raw(RequestKind::Parsers, None)?;
        response::decode_components(&raw, self.transport.listing_format(), "parsers")
    }

    pub fn supported_mime_types(&mut self) -> Result<IndexMap<String, MimeTypeInfo>> {
        let raw = self.fetch_raw(RequestKind::MimeTypes, None)?;
        response::decode_mime_types(&raw, self.transport.listing_format())
    }

    pub fn is_mime_type_supported(&mut self, mime: &str) -> Result<bool> {
        let mime = mime.trim().to_ascii_lowercase();
        Ok(self
            .supported_mime_types()?
            .iter()
            .any(|(name, info)| *name == mime || info.aliases.iter().any(|a| *a == mime)))
    }

    fn single_value(&mut self, kind: RequestKind, file: &str) -> Result<String> {
        let value = match self.fetch(kind, Some(file))? {
            Fetched::Cached(CachedResponse::Text(raw)) | Fetched::Raw(raw) => raw.trim().to_string(),
            Fetched::Cached(CachedResponse::Json(value)) => value.to_string(),
        };
        self.cache.store(file, kind, CachedResponse::Text(value.clone()));
        Ok(value)
    }

    fn fetch_raw(&mut self, kind: RequestKind, file: Option<&str>) -> Result<String> {
        match self.fetch(kind, file)? {
            Fetched::Raw(raw) | Fetched::Cached(CachedResponse::Text(raw)) => Ok(raw),
            Fetched::Cached(CachedResponse::Json(value)) => Ok(value.to_string()),
        }
    }

    fn fetch(&mut self, kind: RequestKind, file: Option<&str>) -> Result<Fetched> {
        let resolved = self.check_request(kind, file)?;
        if let Some(file) = file.filter(|_| kind.is_cacheable()) {
            if let Some(hit) = self.cache.get(file, kind) {
                debug!("cache hit kind={} file={}", kind, file);
                return Ok(Fetched::Cached(hit.clone()));
            }
        }
        let raw = self.execute(kind, resolved.as_ref())?;
        if let Some(ResolvedFile::Downloaded { path, .. }) = &resolved {
            debug!("removing downloaded temp file {}", path.display());
        }
        Ok(Fetched::Raw(raw))
    }

    fn execute(&mut self, kind: RequestKind, file: Option<&ResolvedFile>) -> Result<String> {
        let attempts = self.retries.max(1);
        let mut attempt = 1;
        loop {
            let req = TransportRequest {
                kind,
                file,
                encoding: self.encoding.as_deref(),
            };
            let sink = match self.sink.as_mut() {
                Some(s) if kind.is_streamable() => {
                    s.reset();
                    Some(s)
                }
                _ => None,
            };
            debug!(
                "{} request kind={} attempt {}/{}",
                self.transport.name(),
                kind,
                attempt,
                attempts
            );
            match self.transport.execute(&req, sink) {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!("kind={} attempt {} failed, retrying: {}", kind, attempt, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
