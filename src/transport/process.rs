use super::{Transport, TransportRequest};
use crate::config::Process;
use crate::error::{Result, TikaError};
use crate::request::{RecursiveFormat, RequestKind};
use crate::response::ListingFormat;
use crate::sink::StreamSink;
use crate::util::expand_tilde;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Runs `tika-app.jar` once per request and reads its standard output.
pub struct ProcessTransport {
    jar: PathBuf,
    java: PathBuf,
    java_args: Vec<String>,
    extra_args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
    chunk_size: usize,
}

impl ProcessTransport {
    pub fn new(jar: &Path, cfg: &Process, chunk_size: usize) -> Result<Self> {
        let transport = Self {
            jar: jar.to_path_buf(),
            java: resolve_java(&cfg.java),
            java_args: cfg.java_args.clone(),
            extra_args: cfg.extra_args.clone(),
            env: cfg.env.clone(),
            timeout: (cfg.timeout_seconds > 0).then(|| Duration::from_secs(cfg.timeout_seconds)),
            chunk_size: if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size },
        };
        transport.check()?;
        Ok(transport)
    }

    pub fn jar(&self) -> &Path {
        &self.jar
    }

    pub fn java(&self) -> &Path {
        &self.java
    }

    pub fn set_java(&mut self, java: &str) -> Result<()> {
        if java.trim().is_empty() {
            return Err(TikaError::InvalidArgument("java executable is empty".into()));
        }
        self.java = resolve_java(java);
        Ok(())
    }

    pub fn set_java_args(&mut self, args: Vec<String>) {
        self.java_args = args;
    }

    pub fn set_env(&mut self, env: BTreeMap<String, String>) {
        self.env = env;
    }

    /// Full argument list for one request, after the java executable.
    pub fn arguments(&self, req: &TransportRequest<'_>) -> Result<Vec<String>> {
        let mut args = self.java_args.clone();
        args.push("-jar".into());
        args.push(self.jar.display().to_string());

        let flags: &[&str] = match req.kind {
            RequestKind::Metadata => &["--metadata", "--json"],
            RequestKind::RecursiveMetadata(Some(RecursiveFormat::Text)) => {
                &["--text", "--jsonRecursive"]
            }
            RequestKind::RecursiveMetadata(Some(RecursiveFormat::Html)) => {
                &["--html", "--jsonRecursive"]
            }
            RequestKind::RecursiveMetadata(Some(RecursiveFormat::Ignore)) => {
                &["--metadata", "--jsonRecursive"]
            }
            // the app has no bare recursive mode
            RequestKind::RecursiveMetadata(None) => {
                return Err(TikaError::UnknownRequestType(req.kind.to_string()));
            }
            RequestKind::Language => &["--language"],
            RequestKind::Mime => &["--detect"],
            RequestKind::Html => &["--html"],
            RequestKind::Text => &["--text"],
            RequestKind::MainText => &["--text-main"],
            RequestKind::Version => &["--version"],
            RequestKind::Detectors => &["--list-detectors"],
            RequestKind::MimeTypes => &["--list-supported-types"],
            RequestKind::Parsers => &["--list-parsers"],
        };
        args.extend(flags.iter().map(|f| f.to_string()));

        if let Some(enc) = req.encoding {
            args.push(format!("--encoding={enc}"));
        }
        args.extend(self.extra_args.iter().cloned());

        if !req.kind.is_capability() {
            args.push(req.require_file()?.display_target());
        }
        Ok(args)
    }

    fn run(&self, args: Vec<String>, sink: Option<&mut StreamSink>) -> Result<String> {
        debug!(
            "tika-app run {} {:?} timeout={:?}",
            self.java.display(),
            args,
            self.timeout
        );
        let mut cmd = Command::new(&self.java);
        cmd.args(&args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|e| {
            TikaError::transient(format!("launching {}", self.java.display()), e)
        })?;

        let stderr_reader = child.stderr.take();
        let stderr_thread = std::thread::spawn(move || -> Vec<u8> {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr_reader {
                // a broken stderr pipe only loses diagnostics
                let _ = err.read_to_end(&mut buf);
            }
            buf
        });

        // Stdout is read on its own thread so the timeout still fires while
        // the engine is silent.
        let (tx, rx) = mpsc::channel::<std::io::Result<Vec<u8>>>();
        let stdout_reader = child.stdout.take();
        let chunk_size = self.chunk_size;
        let stdout_thread: JoinHandle<()> = std::thread::spawn(move || {
            let Some(mut out) = stdout_reader else {
                return;
            };
            loop {
                let mut buf = vec![0u8; chunk_size];
                match read_chunk(&mut out, &mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        buf.truncate(n);
                        if tx.send(Ok(buf)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        let started = Instant::now();
        let mut collected = Vec::new();
        let mut sink = sink;
        let mut read_error = None;
        loop {
            let next = match self.timeout {
                Some(limit) => {
                    let remaining = limit.saturating_sub(started.elapsed());
                    rx.recv_timeout(remaining)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok(Ok(bytes)) => match sink.as_deref_mut() {
                    Some(s) => s.push_bytes(&bytes),
                    None => collected.extend_from_slice(&bytes),
                },
                Ok(Err(e)) => {
                    read_error = Some(e);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.kill_after_timeout(&mut child, stdout_thread, stderr_thread));
                }
            }
        }

        // stdout may close before the process exits
        let Some(status) = self.wait_within(&mut child, started)? else {
            return Err(self.kill_after_timeout(&mut child, stdout_thread, stderr_thread));
        };
        let _ = stdout_thread.join();
        let stderr = join_stderr(stderr_thread);
        debug!("tika-app exited with {}", status);

        check_status(status, &stderr)?;
        if let Some(e) = read_error {
            return Err(TikaError::TransportFatal {
                status: status.code(),
                message: format!("reading tika-app output: {e}"),
            });
        }

        Ok(match sink {
            Some(s) => s.finish(),
            None => String::from_utf8_lossy(&collected).into_owned(),
        })
    }

    /// Waits for exit within what is left of the timeout; `None` once it is spent.
    fn wait_within(&self, child: &mut Child, started: Instant) -> Result<Option<ExitStatus>> {
        let Some(limit) = self.timeout else {
            return child.wait().map(Some).map_err(wait_error);
        };
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(Some(status));
            }
            if started.elapsed() >= limit {
                return Ok(None);
            }
            std::thread::sleep(WAIT_POLL);
        }
    }

    fn kill_after_timeout(
        &self,
        child: &mut Child,
        stdout_thread: JoinHandle<()>,
        stderr_thread: JoinHandle<Vec<u8>>,
    ) -> TikaError {
        let limit = self.timeout.unwrap_or_default();
        warn!("tika-app timed out after {:?}; killing", limit);
        let _ = child.kill();
        let _ = child.wait();
        let _ = stdout_thread.join();
        let stderr = join_stderr(stderr_thread);
        TikaError::TransportFatal {
            status: None,
            message: format!(
                "tika-app exceeded timeout ({:?}); stderr: {}",
                limit,
                stderr.trim()
            ),
        }
    }
}

impl Transport for ProcessTransport {
    fn name(&self) -> &'static str {
        "process"
    }

    fn execute(&self, req: &TransportRequest<'_>, sink: Option<&mut StreamSink>) -> Result<String> {
        let args = self.arguments(req)?;
        self.run(args, sink)
    }

    fn check(&self) -> Result<()> {
        if !self.jar.is_file() {
            return Err(TikaError::Configuration(format!(
                "tika-app jar not found: {}",
                self.jar.display()
            )));
        }
        Ok(())
    }

    fn listing_format(&self) -> ListingFormat {
        ListingFormat::Text
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.timeout = timeout.filter(|t| !t.is_zero());
        Ok(())
    }

    fn chunk_size(&self) -> Option<usize> {
        Some(self.chunk_size)
    }

    fn set_chunk_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(TikaError::InvalidArgument("chunk size must be positive".into()));
        }
        self.chunk_size = size;
        Ok(())
    }
}

/// Fills `buf` as far as the stream allows, so callbacks see whole chunks.
fn read_chunk(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn wait_error(e: std::io::Error) -> TikaError {
    TikaError::TransportFatal {
        status: None,
        message: format!("waiting for tika-app: {e}"),
    }
}

fn join_stderr(handle: JoinHandle<Vec<u8>>) -> String {
    handle
        .join()
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_else(|_| "stderr reader thread panicked".to_string())
}

fn check_status(status: ExitStatus, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let stderr = stderr.trim();
    let message = if stderr.is_empty() {
        format!("tika-app exited with {status}")
    } else {
        format!("tika-app exited with {status}: {stderr}")
    };
    Err(TikaError::TransportFatal {
        status: status.code(),
        message,
    })
}

fn resolve_java(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(home) = std::env::var("JAVA_HOME") {
            let p = PathBuf::from(home).join("bin").join("java");
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("java");
    }
    expand_tilde(raw)
}
