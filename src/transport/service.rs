use super::{Transport, TransportRequest};
use crate::config::Service;
use crate::error::{Result, TikaError};
use crate::request::RequestKind;
use crate::resolver::ResolvedFile;
use crate::response::ListingFormat;
use crate::sink::StreamSink;
use reqwest::blocking::{Body, Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_CHARSET};
use reqwest::{Method, StatusCode};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_PORT: u16 = 9998;
const READ_BUFFER: usize = 64 * 1024;

/// Talks to a running `tika-server` over HTTP.
pub struct ServiceTransport {
    base: Url,
    cfg: Service,
    timeout: Option<Duration>,
    http: HttpClient,
}

impl ServiceTransport {
    /// `host` may be a bare host name or a URL; `port` overrides any port in it.
    pub fn new(host: &str, port: Option<u16>, cfg: &Service) -> Result<Self> {
        let base = base_url(host, port)?;
        let timeout = (cfg.timeout_seconds > 0).then(|| Duration::from_secs(cfg.timeout_seconds));
        let http = build_http(cfg, timeout)?;
        let transport = Self {
            base,
            cfg: cfg.clone(),
            timeout,
            http,
        };
        transport.check()?;
        Ok(transport)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TikaError::InvalidArgument(format!("header name {name:?}: {e}")))?;
        HeaderValue::from_str(value)
            .map_err(|e| TikaError::InvalidArgument(format!("header value for {name}: {e}")))?;
        self.cfg.headers.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.cfg.headers
    }

    pub fn set_ocr_languages(&mut self, languages: Vec<String>) -> Result<()> {
        if languages.iter().any(|l| l.trim().is_empty()) {
            return Err(TikaError::InvalidArgument("empty OCR language".into()));
        }
        self.cfg.ocr_languages = languages;
        Ok(())
    }

    fn endpoint(&self, kind: RequestKind) -> (Method, &'static str, &'static str) {
        match kind {
            RequestKind::Metadata => (Method::PUT, "meta", "application/json"),
            RequestKind::RecursiveMetadata(_) => (Method::PUT, kind.as_str(), "application/json"),
            RequestKind::Language => (Method::PUT, "language/stream", "text/plain"),
            RequestKind::Mime => (Method::PUT, "detect/stream", "text/plain"),
            RequestKind::Html => (Method::PUT, "tika", "text/html"),
            RequestKind::Text => (Method::PUT, "tika", "text/plain"),
            RequestKind::MainText => (Method::PUT, "tika/main", "text/plain"),
            RequestKind::Version => (Method::GET, "version", "text/plain"),
            RequestKind::Detectors => (Method::GET, "detectors", "application/json"),
            RequestKind::MimeTypes => (Method::GET, "mime-types", "application/json"),
            RequestKind::Parsers => (Method::GET, "parsers", "application/json"),
        }
    }

    /// Default headers, then configured headers on top.
    pub fn request_headers(&self, req: &TransportRequest<'_>) -> Result<HeaderMap> {
        let (_, _, accept) = self.endpoint(req.kind);
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(enc) = req.encoding {
            headers.insert(ACCEPT_CHARSET, header_value(enc)?);
        }
        if !self.cfg.ocr_languages.is_empty() {
            headers.insert(
                HeaderName::from_static("x-tika-ocrlanguage"),
                header_value(&self.cfg.ocr_languages.join("+"))?,
            );
        }
        if let Some(ResolvedFile::Remote(url)) = req.file {
            headers.insert(HeaderName::from_static("fileurl"), header_value(url.as_str())?);
        }
        for (k, v) in &self.cfg.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| TikaError::Configuration(format!("header name {k:?}: {e}")))?;
            headers.insert(name, header_value(v)?);
        }
        Ok(headers)
    }

    fn send(&self, req: &TransportRequest<'_>) -> Result<Response> {
        let (method, path, _) = self.endpoint(req.kind);
        let url = self
            .base
            .join(path)
            .map_err(|e| TikaError::Configuration(format!("building URL for {path}: {e}")))?;
        debug!("tika-server {} {}", method, url);

        let mut builder = self
            .http
            .request(method.clone(), url)
            .headers(self.request_headers(req)?);
        if method == Method::PUT {
            let file = req.require_file()?;
            builder = match file.local_path() {
                Some(path) => {
                    let f = File::open(path)
                        .map_err(|e| TikaError::io(path.display().to_string(), e))?;
                    builder.body(Body::from(f))
                }
                // referenced by the fileUrl header
                None => builder.body(Vec::new()),
            };
        }

        builder.send().map_err(classify)
    }
}

impl Transport for ServiceTransport {
    fn name(&self) -> &'static str {
        "service"
    }

    fn execute(&self, req: &TransportRequest<'_>, sink: Option<&mut StreamSink>) -> Result<String> {
        let mut resp = self.send(req)?;
        let status = resp.status();
        debug!("tika-server answered {}", status);
        check_status(status, req)?;
        if status == StatusCode::NO_CONTENT {
            return Ok(match sink {
                Some(s) => s.finish(),
                None => String::new(),
            });
        }

        match sink {
            Some(s) => {
                let mut buf = vec![0u8; READ_BUFFER];
                loop {
                    let n = resp.read(&mut buf).map_err(|e| read_error(status, e))?;
                    if n == 0 {
                        break;
                    }
                    s.push_bytes(&buf[..n]);
                }
                Ok(s.finish())
            }
            None => {
                let mut bytes = Vec::new();
                resp.read_to_end(&mut bytes)
                    .map_err(|e| read_error(status, e))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    fn check(&self) -> Result<()> {
        if self.base.host_str().is_none() {
            return Err(TikaError::Configuration(format!(
                "tika-server URL has no host: {}",
                self.base
            )));
        }
        Ok(())
    }

    fn listing_format(&self) -> ListingFormat {
        ListingFormat::Json
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self.http = build_http(&self.cfg, self.timeout)?;
        Ok(())
    }
}

fn base_url(host: &str, port: Option<u16>) -> Result<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(TikaError::InvalidArgument("tika-server host is empty".into()));
    }
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let mut url = Url::parse(&raw)
        .map_err(|e| TikaError::InvalidArgument(format!("tika-server host {host:?}: {e}")))?;
    let port = port.or(url.port()).unwrap_or(DEFAULT_PORT);
    url.set_port(Some(port))
        .map_err(|_| TikaError::InvalidArgument(format!("cannot set port on {url}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn build_http(cfg: &Service, timeout: Option<Duration>) -> Result<HttpClient> {
    let mut builder = HttpClient::builder()
        .danger_accept_invalid_certs(!cfg.verify_ssl)
        .timeout(timeout);
    if cfg.connect_timeout_seconds > 0 {
        builder = builder.connect_timeout(Duration::from_secs(cfg.connect_timeout_seconds));
    }
    if let Some(proxy) = cfg.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| TikaError::Configuration(format!("proxy {proxy:?}: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| TikaError::Configuration(format!("building HTTP client: {e}")))
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|e| TikaError::InvalidArgument(format!("header value {raw:?}: {e}")))
}

fn classify(e: reqwest::Error) -> TikaError {
    if e.is_connect() || e.is_timeout() {
        TikaError::transient("tika-server unreachable", e)
    } else {
        TikaError::TransportFatal {
            status: e.status().map(|s| i32::from(s.as_u16())),
            message: e.to_string(),
        }
    }
}

fn read_error(status: StatusCode, e: std::io::Error) -> TikaError {
    if e.kind() == std::io::ErrorKind::TimedOut {
        TikaError::transient("reading tika-server response timed out", e)
    } else {
        TikaError::TransportFatal {
            status: Some(i32::from(status.as_u16())),
            message: format!("reading tika-server response: {e}"),
        }
    }
}

fn check_status(status: StatusCode, req: &TransportRequest<'_>) -> Result<()> {
    if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
        return Ok(());
    }
    let target = req
        .file
        .map(|f| f.display_target())
        .unwrap_or_else(|| req.kind.to_string());
    let reason = match status {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported media type",
        StatusCode::UNPROCESSABLE_ENTITY => "unprocessable document",
        StatusCode::INTERNAL_SERVER_ERROR => "error while processing document",
        StatusCode::NOT_FOUND => "endpoint not found",
        _ => "unexpected status",
    };
    Err(TikaError::TransportFatal {
        status: Some(i32::from(status.as_u16())),
        message: format!("{reason} for {target} ({} {})", req.kind, status.as_u16()),
    })
}
