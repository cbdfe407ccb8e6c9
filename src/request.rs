use crate::error::{Result, TikaError};
use std::fmt;
use std::str::FromStr;

/// Content rendering requested alongside recursive metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecursiveFormat {
    Text,
    Html,
    Ignore,
}

impl RecursiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecursiveFormat::Text => "text",
            RecursiveFormat::Html => "html",
            RecursiveFormat::Ignore => "ignore",
        }
    }

    /// `"none"` means no format suffix and maps to `None`. Matching is exact.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>> {
        match raw {
            "none" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl FromStr for RecursiveFormat {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(RecursiveFormat::Text),
            "html" => Ok(RecursiveFormat::Html),
            "ignore" => Ok(RecursiveFormat::Ignore),
            other => Err(TikaError::InvalidArgument(format!(
                "unknown recursive metadata format: {other:?} (expected text, html, ignore or none)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Metadata,
    RecursiveMetadata(Option<RecursiveFormat>),
    Language,
    Mime,
    Html,
    Text,
    MainText,
    Version,
    Detectors,
    MimeTypes,
    Parsers,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Metadata => "meta",
            RequestKind::RecursiveMetadata(None) => "rmeta",
            RequestKind::RecursiveMetadata(Some(RecursiveFormat::Text)) => "rmeta/text",
            RequestKind::RecursiveMetadata(Some(RecursiveFormat::Html)) => "rmeta/html",
            RequestKind::RecursiveMetadata(Some(RecursiveFormat::Ignore)) => "rmeta/ignore",
            RequestKind::Language => "lang",
            RequestKind::Mime => "mime",
            RequestKind::Html => "html",
            RequestKind::Text => "text",
            RequestKind::MainText => "text-main",
            RequestKind::Version => "version",
            RequestKind::Detectors => "detectors",
            RequestKind::MimeTypes => "mime-types",
            RequestKind::Parsers => "parsers",
        }
    }

    /// Kinds that describe the engine itself and take no file.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            RequestKind::Version
                | RequestKind::Detectors
                | RequestKind::MimeTypes
                | RequestKind::Parsers
        )
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self, RequestKind::Language | RequestKind::Metadata)
    }

    /// Kinds whose body may be delivered through a stream sink.
    pub fn is_streamable(&self) -> bool {
        matches!(
            self,
            RequestKind::Html | RequestKind::Text | RequestKind::MainText
        )
    }

    pub fn expects_json(&self) -> bool {
        matches!(
            self,
            RequestKind::Metadata | RequestKind::RecursiveMetadata(_)
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s {
            "meta" => RequestKind::Metadata,
            "rmeta" => RequestKind::RecursiveMetadata(None),
            "lang" => RequestKind::Language,
            "mime" => RequestKind::Mime,
            "html" => RequestKind::Html,
            "text" => RequestKind::Text,
            "text-main" => RequestKind::MainText,
            "version" => RequestKind::Version,
            "detectors" => RequestKind::Detectors,
            "mime-types" => RequestKind::MimeTypes,
            "parsers" => RequestKind::Parsers,
            other => match other.strip_prefix("rmeta/") {
                Some(format) => RequestKind::RecursiveMetadata(Some(
                    format
                        .parse::<RecursiveFormat>()
                        .map_err(|_| TikaError::UnknownRequestType(other.to_string()))?,
                )),
                None => return Err(TikaError::UnknownRequestType(other.to_string())),
            },
        };
        Ok(kind)
    }
}

