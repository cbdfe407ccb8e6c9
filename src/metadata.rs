use crate::error::{Result, TikaError};
use crate::response::expect_object;
use crate::util::basename;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const EMBEDDED_DEPTH: &str = "X-TIKA:embedded_depth";
pub const EMBEDDED_RESOURCE_PATH: &str = "X-TIKA:embedded_resource_path";
pub const CONTENT: &str = "X-TIKA:content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetadataKind {
    Document,
    Image,
}

/// One document's properties plus its content-type discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    file: String,
    mime: String,
    kind: MetadataKind,
    properties: Map<String, Value>,
}

impl Metadata {
    pub fn from_value(value: Value, file: &str) -> Result<Self> {
        let properties = expect_object(value, file)?;
        Ok(Self::from_properties(properties, file))
    }

    pub fn from_properties(properties: Map<String, Value>, file: &str) -> Self {
        let mime = first_str(properties.get(CONTENT_TYPE))
            .map(|raw| raw.split(';').next().unwrap_or(raw).trim().to_ascii_lowercase())
            .unwrap_or_default();
        let kind = if mime.starts_with("image/") {
            MetadataKind::Image
        } else {
            MetadataKind::Document
        };
        Self {
            file: file.to_string(),
            mime,
            kind,
            properties,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// MIME type without parameters, lowercased. Empty when the engine
    /// reported none.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn kind(&self) -> MetadataKind {
        self.kind
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn values(&self, key: &str) -> Vec<String> {
        match self.properties.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(v) => scalar_to_string(v).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn title(&self) -> Option<String> {
        self.first_of(&["dc:title", "title", "pdf:docinfo:title"])
    }

    pub fn author(&self) -> Option<String> {
        self.first_of(&["dc:creator", "meta:author", "Author", "pdf:docinfo:creator"])
    }

    pub fn keywords(&self) -> Vec<String> {
        for key in ["meta:keyword", "Keywords", "pdf:docinfo:keywords", "dc:subject"] {
            let values = self.values(key);
            if !values.is_empty() {
                return values
                    .iter()
                    .flat_map(|v| v.split([',', ';']))
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
        }
        Vec::new()
    }

    pub fn language(&self) -> Option<String> {
        self.first_of(&["dc:language", "language", "Content-Language"])
    }

    pub fn content(&self) -> Option<String> {
        self.first_of(&[CONTENT])
    }

    pub fn created(&self) -> Option<OffsetDateTime> {
        self.date_of(&["dcterms:created", "meta:creation-date", "Creation-Date"])
    }

    pub fn updated(&self) -> Option<OffsetDateTime> {
        self.date_of(&["dcterms:modified", "meta:save-date", "Last-Modified"])
    }

    pub fn pages(&self) -> Option<u32> {
        self.first_of(&["xmpTPg:NPages", "meta:page-count"])
            .and_then(|v| v.trim().parse().ok())
    }

    /// Width and height in pixels, for images only.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if self.kind != MetadataKind::Image {
            return None;
        }
        let px = |keys: &[&str]| {
            self.first_of(keys).and_then(|v| {
                v.split_whitespace()
                    .next()
                    .and_then(|n| n.parse::<u32>().ok())
            })
        };
        let width = px(&["tiff:ImageWidth", "Image Width", "width"])?;
        let height = px(&["tiff:ImageLength", "Image Height", "height"])?;
        Some((width, height))
    }

    /// Nesting depth inside the top-level document (0 for the document itself).
    pub fn embedded_depth(&self) -> u32 {
        self.first_of(&[EMBEDDED_DEPTH])
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn embedded_resource_path(&self) -> Option<String> {
        self.first_of(&[EMBEDDED_RESOURCE_PATH])
    }

    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|k| self.values(k).into_iter().find(|v| !v.trim().is_empty()))
    }

    fn date_of(&self, keys: &[&str]) -> Option<OffsetDateTime> {
        keys.iter().find_map(|k| {
            self.values(k)
                .into_iter()
                .find_map(|v| OffsetDateTime::parse(v.trim(), &Rfc3339).ok())
        })
    }
}

fn first_str(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Colliding names get a `#n` suffix.
pub fn recursive_from_items(items: Vec<Value>, file: &str) -> Result<IndexMap<String, Metadata>> {
    let base = basename(file);
    let mut out = IndexMap::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(properties) = item else {
            return Err(TikaError::format(
                file,
                format!("recursive metadata item {i} is not an object"),
            ));
        };
        let meta = Metadata::from_properties(properties, file);
        let mut name = match meta.embedded_resource_path() {
            Some(path) if meta.embedded_depth() > 0 => format!("{base}{path}"),
            _ => base.clone(),
        };
        if out.contains_key(&name) {
            let mut n = 2;
            while out.contains_key(&format!("{name}#{n}")) {
                n += 1;
            }
            name = format!("{name}#{n}");
        }
        out.insert(name, meta);
    }
    Ok(out)
}
