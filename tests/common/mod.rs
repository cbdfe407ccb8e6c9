#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tika_client::config::Config;
use tika_client::request::RequestKind;
use tika_client::response::ListingFormat;
use tika_client::sink::StreamSink;
use tika_client::transport::{Transport, TransportRequest};
use tika_client::{Client, TikaError};

pub enum Step {
    Body(String),
    Chunks(Vec<&'static str>),
    Transient,
    Fatal,
}

/// Transport that replays scripted steps and counts invocations.
pub struct ScriptedTransport {
    pub calls: Rc<Cell<usize>>,
    pub kinds: Rc<RefCell<Vec<RequestKind>>>,
    steps: RefCell<VecDeque<Step>>,
    fallback: String,
}

impl ScriptedTransport {
    pub fn always(body: &str) -> Self {
        Self {
            calls: Rc::new(Cell::new(0)),
            kinds: Rc::new(RefCell::new(Vec::new())),
            steps: RefCell::new(VecDeque::new()),
            fallback: body.to_string(),
        }
    }

    pub fn then(self, step: Step) -> Self {
        self.steps.borrow_mut().push_back(step);
        self
    }
}

impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn execute(
        &self,
        req: &TransportRequest<'_>,
        sink: Option<&mut StreamSink>,
    ) -> tika_client::Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.kinds.borrow_mut().push(req.kind);
        let step = self
            .steps
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Step::Body(self.fallback.clone()));
        match step {
            Step::Body(body) => match sink {
                Some(s) => {
                    s.push(&body);
                    Ok(s.finish())
                }
                None => Ok(body),
            },
            Step::Chunks(chunks) => match sink {
                Some(s) => {
                    for c in chunks {
                        s.push_bytes(c.as_bytes());
                    }
                    Ok(s.finish())
                }
                None => Ok(chunks.concat()),
            },
            Step::Transient => Err(TikaError::TransportTransient {
                message: "connection refused".into(),
                source: None,
            }),
            Step::Fatal => Err(TikaError::TransportFatal {
                status: Some(422),
                message: "unprocessable document".into(),
            }),
        }
    }

    fn check(&self) -> tika_client::Result<()> {
        Ok(())
    }

    fn listing_format(&self) -> ListingFormat {
        ListingFormat::Json
    }

    fn set_timeout(&mut self, _timeout: Option<Duration>) -> tika_client::Result<()> {
        Ok(())
    }
}

pub fn scripted_client(transport: ScriptedTransport) -> Client<ScriptedTransport> {
    Client::with_transport(transport, &Config::default()).unwrap()
}

pub fn temp_doc(contents: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .prefix("doc-")
        .suffix(".txt")
        .tempfile()
        .unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

pub fn path_str(f: &NamedTempFile) -> String {
    f.path().display().to_string()
}
