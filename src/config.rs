use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: Client,
    #[serde(default)]
    pub process: Process,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// True when `client.target` names a tika-app jar rather than a server.
    pub fn is_process_target(&self) -> bool {
        self.client
            .target
            .trim()
            .to_ascii_lowercase()
            .ends_with(".jar")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    /// Path to `tika-app.jar`, or a server host (`localhost`,
    /// `http://tika.internal`).
    pub target: String,
    pub port: u16,
    /// Maximum attempts per request, including the first.
    pub retries: u32,
    pub encoding: Option<String>,
    pub download_remote: bool,
    pub chunk_size: usize,
    /// Verify the engine version against the supported list on construction.
    pub check_version: bool,
}
impl Default for Client {
    fn default() -> Self {
        Self {
            target: "localhost".into(),
            port: 9998,
            retries: 3,
            encoding: None,
            download_remote: false,
            chunk_size: 1024 * 1024,
            check_version: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    pub java: String,
    pub java_args: Vec<String>,
    pub extra_args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// 0 disables the kill timeout.
    pub timeout_seconds: u64,
}
impl Default for Process {
    fn default() -> Self {
        Self {
            java: "java".into(),
            java_args: Vec::new(),
            extra_args: Vec::new(),
            env: BTreeMap::new(),
            timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub headers: BTreeMap<String, String>,
    pub proxy: Option<String>,
    pub verify_ssl: bool,
    pub ocr_languages: Vec<String>,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
            headers: BTreeMap::new(),
            proxy: None,
            verify_ssl: true,
            ocr_languages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Remote {
    /// Applies to both the reachability probe and downloads; 0 disables it.
    pub timeout_seconds: u64,
}
impl Default for Remote {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
