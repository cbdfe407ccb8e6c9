pub mod process;
pub mod service;

use crate::error::{Result, TikaError};
use crate::request::RequestKind;
use crate::resolver::ResolvedFile;
use crate::response::ListingFormat;
use crate::sink::StreamSink;
use std::time::Duration;

pub use process::ProcessTransport;
pub use service::ServiceTransport;

/// One request as handed to a transport.
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    pub kind: RequestKind,
    pub file: Option<&'a ResolvedFile>,
    pub encoding: Option<&'a str>,
}

impl TransportRequest<'_> {
    /// `file` for kinds that need one, or the error a transport should raise.
    pub fn require_file(&self) -> Result<&ResolvedFile> {
        self.file.ok_or_else(|| {
            TikaError::InvalidArgument(format!("request '{}' requires a file", self.kind))
        })
    }
}

/// With a sink, the body is pushed into it and the sink's text is returned.
pub trait Transport {
    fn name(&self) -> &'static str;

    fn execute(&self, req: &TransportRequest<'_>, sink: Option<&mut StreamSink>) -> Result<String>;

    fn check(&self) -> Result<()>;

    fn listing_format(&self) -> ListingFormat;

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    fn chunk_size(&self) -> Option<usize> {
        None
    }

    fn set_chunk_size(&mut self, _size: usize) -> Result<()> {
        Err(TikaError::Unsupported(format!(
            "chunk size cannot be set on the {} transport",
            self.name()
        )))
    }
}

impl Transport for Box<dyn Transport> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&self, req: &TransportRequest<'_>, sink: Option<&mut StreamSink>) -> Result<String> {
        (**self).execute(req, sink)
    }

    fn check(&self) -> Result<()> {
        (**self).check()
    }

    fn listing_format(&self) -> ListingFormat {
        (**self).listing_format()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_timeout(timeout)
    }

    fn chunk_size(&self) -> Option<usize> {
        (**self).chunk_size()
    }

    fn set_chunk_size(&mut self, size: usize) -> Result<()> {
        (**self).set_chunk_size(size)
    }
}
