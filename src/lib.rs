pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod metadata;
pub mod request;
pub mod resolver;
pub mod response;
pub mod sink;
pub mod transport;
pub mod util;
pub mod versions;

pub use client::{AnyClient, Client, ProcessClient, ServiceClient};
pub use error::{ErrorCode, Result, TikaError};
pub use metadata::{Metadata, MetadataKind};
pub use request::{RecursiveFormat, RequestKind};
