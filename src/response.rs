use crate::error::{Result, TikaError};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeTypeInfo {
    pub aliases: Vec<String>,
    pub supertype: Option<String>,
    pub parser: Option<String>,
}

pub fn parse_json(raw: &str, file: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(TikaError::EmptyResponse {
            file: file.to_string(),
        });
    }
    serde_json::from_str(raw).map_err(|e| {
        TikaError::format(
            file,
            format!(
                "malformed JSON ({:?} at line {} column {}): {}",
                e.classify(),
                e.line(),
                e.column(),
                e
            ),
        )
    })
}

pub fn expect_object(value: Value, file: &str) -> Result<serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TikaError::format(
            file,
            format!("expected a JSON object, got {}", json_type(&other)),
        )),
    }
}

pub fn expect_array(value: Value, file: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(TikaError::format(
            file,
            format!("expected a JSON array, got {}", json_type(&other)),
        )),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Flattens a detector/parser listing into component names, parents first.
pub fn decode_components(raw: &str, format: ListingFormat, what: &str) -> Result<Vec<String>> {
    match format {
        ListingFormat::Json => {
            let value = parse_json(raw, what)?;
            let mut names = Vec::new();
            collect_component_names(&value, &mut names);
            if names.is_empty() {
                return Err(TikaError::format(what, "no component names in listing"));
            }
            Ok(names)
        }
        ListingFormat::Text => {
            if raw.trim().is_empty() {
                return Err(TikaError::EmptyResponse {
                    file: what.to_string(),
                });
            }
            Ok(raw
                .lines()
                .filter_map(|line| {
                    component_line_re()
                        .captures(line)
                        .map(|caps| caps[1].to_string())
                })
                .collect())
        }
    }
}

fn collect_component_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("name") {
                out.push(name.clone());
            }
            if let Some(children) = map.get("children") {
                collect_component_names(children, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_component_names(item, out);
            }
        }
        _ => {}
    }
}

fn component_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][\w.$]*)(?:\s+\([^)]*\))?:?\s*$")
            .expect("valid component regex")
    })
}

pub fn decode_mime_types(raw: &str, format: ListingFormat) -> Result<IndexMap<String, MimeTypeInfo>> {
    const WHAT: &str = "mime-types";
    match format {
        ListingFormat::Json => {
            let map = expect_object(parse_json(raw, WHAT)?, WHAT)?;
            Ok(map
                .into_iter()
                .map(|(mime, info)| {
                    let aliases = match info.get("alias") {
                        Some(Value::Array(items)) => items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                        Some(Value::String(s)) => vec![s.clone()],
                        _ => Vec::new(),
                    };
                    let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
                    let entry = MimeTypeInfo {
                        aliases,
                        supertype: text("supertype"),
                        parser: text("parser"),
                    };
                    (mime, entry)
                })
                .collect())
        }
        ListingFormat::Text => {
            if raw.trim().is_empty() {
                return Err(TikaError::EmptyResponse {
                    file: WHAT.to_string(),
                });
            }
            let mut out: IndexMap<String, MimeTypeInfo> = IndexMap::new();
            let mut current: Option<String> = None;
            for line in raw.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let indented = line.starts_with(char::is_whitespace);
                if !indented {
                    let mime = line.trim().to_string();
                    out.entry(mime.clone()).or_default();
                    current = Some(mime);
                    continue;
                }
                let Some(mime) = current.as_ref() else {
                    return Err(TikaError::format(WHAT, format!("attribute before any type: {line}")));
                };
                let Some((key, value)) = line.trim().split_once(':') else {
                    continue;
                };
                let value = value.trim().to_string();
                let entry = out.entry(mime.clone()).or_default();
                match key.trim() {
                    "alias" => entry.aliases.push(value),
                    "supertype" => entry.supertype = Some(value),
                    "parser" => entry.parser = Some(value),
                    _ => {}
                }
            }
            Ok(out)
        }
    }
}
