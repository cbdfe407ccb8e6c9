use crate::request::RequestKind;
use crate::util::sha256_hex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum CachedResponse {
    Text(String),
    Json(serde_json::Value),
}

/// Entries never expire; non-cacheable kinds are ignored.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(file: &str, kind: RequestKind) -> String {
        format!("{}:{}", sha256_hex(file.as_bytes()), kind.as_str())
    }

    pub fn get(&self, file: &str, kind: RequestKind) -> Option<&CachedResponse> {
        if !kind.is_cacheable() {
            return None;
        }
        self.entries.get(&Self::key(file, kind))
    }

    pub fn store(&mut self, file: &str, kind: RequestKind, response: CachedResponse) {
        if !kind.is_cacheable() {
            return;
        }
        let key = Self::key(file, kind);
        debug!("cache store kind={} key={}", kind, key);
        self.entries.entry(key).or_insert(response);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
