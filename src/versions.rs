//! Engine versions this client is known to work with.

use crate::error::{Result, TikaError};
use std::sync::OnceLock;

const DESCRIPTOR: &str = include_str!("../supported-versions");

/// Supported versions in descriptor order, read once per process.
pub fn supported_versions() -> Result<&'static [String]> {
    static VERSIONS: OnceLock<Vec<String>> = OnceLock::new();
    let versions = VERSIONS.get_or_init(|| parse_descriptor(DESCRIPTOR));
    if versions.is_empty() {
        return Err(TikaError::Configuration(
            "supported versions descriptor is empty".to_string(),
        ));
    }
    Ok(versions)
}

pub fn is_version_supported(version: &str) -> Result<bool> {
    let version = normalize_version(version);
    Ok(supported_versions()?.iter().any(|v| *v == version))
}

pub fn parse_descriptor(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Strips the product prefix the engine puts in front of its version
/// (`Apache Tika 2.9.2` → `2.9.2`).
pub fn normalize_version(raw: &str) -> String {
    let raw = raw.trim();
    raw.rsplit(char::is_whitespace)
        .next()
        .unwrap_or(raw)
        .to_string()
}
