mod common;

use common::{path_str, scripted_client, temp_doc, ScriptedTransport, Step};
use std::sync::{Arc, Mutex};
use tika_client::config::Service;
use tika_client::transport::ServiceTransport;
use tika_client::{Client, ErrorCode, RequestKind, TikaError};

const META: &str = r#"{"Content-Type":"application/pdf","dc:title":"Report","xmpTPg:NPages":"3"}"#;

#[test]
fn metadata_is_cached_per_file() {
    let doc = temp_doc("hello");
    let transport = ScriptedTransport::always(META);
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);

    let first = client.metadata(&path_str(&doc)).unwrap();
    let second = client.metadata(&path_str(&doc)).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.title().as_deref(), Some("Report"));
    assert_eq!(first.pages(), Some(3));
    assert_eq!(calls.get(), 1);
    assert_eq!(client.cache().len(), 1);
}

#[test]
fn language_is_cached_separately_from_metadata() {
    let doc = temp_doc("bonjour");
    let transport = ScriptedTransport::always(META).then(Step::Body("fr\n".into()));
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);
    let file = path_str(&doc);

    assert_eq!(client.language(&file).unwrap(), "fr");
    assert_eq!(client.language(&file).unwrap(), "fr");
    assert_eq!(calls.get(), 1);

    client.metadata(&file).unwrap();
    client.metadata(&file).unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn text_requests_always_reach_the_transport() {
    let doc = temp_doc("body");
    let transport = ScriptedTransport::always("extracted text");
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);
    let file = path_str(&doc);

    for _ in 0..3 {
        assert_eq!(client.text(&file).unwrap(), "extracted text");
    }
    client.html(&file).unwrap();
    client.main_text(&file).unwrap();
    client.mime(&file).unwrap();
    client.mime(&file).unwrap();
    assert_eq!(calls.get(), 7);
    assert!(client.cache().is_empty());
}

#[test]
fn invalid_recursive_format_never_calls_transport() {
    let doc = temp_doc("x");
    let transport = ScriptedTransport::always("[]");
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);

    for format in ["xml", "", " text ", "NONE", "Text"] {
        let err = client.recursive_metadata(&path_str(&doc), format).unwrap_err();
        assert!(
            matches!(err, TikaError::InvalidArgument(_)),
            "format {format:?} gave {err:?}"
        );
    }
    assert_eq!(calls.get(), 0);
}

#[test]
fn recursive_format_selects_request_kind() {
    let doc = temp_doc("x");
    let transport = ScriptedTransport::always(r#"[{"Content-Type":"text/plain"}]"#);
    let kinds = transport.kinds.clone();
    let mut client = scripted_client(transport);
    let file = path_str(&doc);

    client.recursive_metadata(&file, "text").unwrap();
    client.recursive_metadata(&file, "none").unwrap();
    assert_eq!(
        kinds.borrow().iter().map(|k| k.as_str()).collect::<Vec<_>>(),
        vec!["rmeta/text", "rmeta"]
    );
}

#[test]
fn recursive_response_must_be_an_array() {
    let doc = temp_doc("x");
    let mut client = scripted_client(ScriptedTransport::always(META));
    let err = client.recursive_metadata(&path_str(&doc), "ignore").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ResponseFormat);
}

#[test]
fn metadata_response_must_be_an_object() {
    let doc = temp_doc("x");
    let file = path_str(&doc);
    let mut client = scripted_client(ScriptedTransport::always("[1, 2]"));
    let err = client.metadata(&file).unwrap_err();
    match err {
        TikaError::ResponseFormat { file: f, .. } => assert_eq!(f, file),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.cache().is_empty());
}

#[test]
fn empty_and_malformed_json_are_distinguished() {
    let doc = temp_doc("x");
    let file = path_str(&doc);

    let mut client = scripted_client(ScriptedTransport::always("  \n"));
    assert_eq!(client.metadata(&file).unwrap_err().code(), ErrorCode::EmptyResponse);

    let mut client = scripted_client(ScriptedTransport::always("not json"));
    assert_eq!(client.metadata(&file).unwrap_err().code(), ErrorCode::ResponseFormat);
}

#[test]
fn transient_failures_are_retried_up_to_the_limit() {
    let doc = temp_doc("x");
    let file = path_str(&doc);

    let transport = ScriptedTransport::always("done")
        .then(Step::Transient)
        .then(Step::Transient);
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);
    client.set_retries(3).unwrap();
    assert_eq!(client.text(&file).unwrap(), "done");
    assert_eq!(calls.get(), 3);

    let transport = ScriptedTransport::always("done")
        .then(Step::Transient)
        .then(Step::Transient);
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);
    client.set_retries(2).unwrap();
    let err = client.text(&file).unwrap_err();
    assert!(err.is_transient());
    assert_eq!(calls.get(), 2);
}

#[test]
fn fatal_failures_are_not_retried() {
    let doc = temp_doc("x");
    let transport = ScriptedTransport::always("done").then(Step::Fatal);
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);

    let err = client.text(&path_str(&doc)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TransportFatal);
    assert_eq!(calls.get(), 1);
}

#[test]
fn missing_local_file_fails_before_transport() {
    let transport = ScriptedTransport::always(META);
    let calls = transport.calls.clone();
    let mut client = scripted_client(transport);

    let err = client.metadata("/definitely/not/here.pdf").unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_ne!(ErrorCode::NotFound, ErrorCode::NotFoundRemote);
    assert_eq!(calls.get(), 0);
}

#[test]
fn capability_requests_skip_file_validation() {
    let transport = ScriptedTransport::always("Apache Tika 2.9.2\n");
    let kinds = transport.kinds.clone();
    let mut client = scripted_client(transport);

    assert_eq!(client.version().unwrap(), "Apache Tika 2.9.2");
    assert!(client.check_request(RequestKind::Detectors, None).unwrap().is_none());
    client.check().unwrap();
    assert!(client.is_checked());
    // a second check does not ask again
    client.check().unwrap();
    assert_eq!(kinds.borrow().len(), 2);
}

#[test]
fn unsupported_engine_version_is_rejected() {
    let mut client = scripted_client(ScriptedTransport::always("Apache Tika 0.9"));
    let err = client.check().unwrap_err();
    assert!(matches!(err, TikaError::VersionUnsupported(v) if v == "0.9"));
}

#[test]
fn callback_appends_chunks() {
    let doc = temp_doc("x");
    let transport = ScriptedTransport::always("")
        .then(Step::Chunks(vec!["alpha ", "beta ", "gamma"]));
    let mut client = scripted_client(transport);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_cb = seen.clone();
    let text = client
        .text_with(
            &path_str(&doc),
            move |chunk| {
                seen_in_cb.lock().unwrap().push(chunk.to_string());
                chunk.to_uppercase()
            },
            true,
        )
        .unwrap();

    assert_eq!(text, "ALPHA BETA GAMMA");
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert!(client.has_callback());
}

#[test]
fn callback_replace_mode_keeps_last_result() {
    let doc = temp_doc("x");
    let transport = ScriptedTransport::always("")
        .then(Step::Chunks(vec!["one", "two", "three"]));
    let mut client = scripted_client(transport);

    let text = client
        .html_with(&path_str(&doc), |chunk| format!("<{chunk}>"), false)
        .unwrap();
    assert_eq!(text, "<three>");
}

#[test]
fn callback_is_not_used_for_metadata() {
    let doc = temp_doc("x");
    let mut client = scripted_client(ScriptedTransport::always(META));
    client.set_callback(|_| "swallowed".to_string(), true);
    let meta = client.metadata(&path_str(&doc)).unwrap();
    assert_eq!(meta.mime(), "application/pdf");
}

#[test]
fn setters_validate_arguments() {
    let mut client = scripted_client(ScriptedTransport::always(""));
    assert!(matches!(
        client.set_encoding("  ").unwrap_err(),
        TikaError::InvalidArgument(_)
    ));
    client.set_encoding("ISO-8859-1").unwrap();
    assert_eq!(client.encoding(), Some("ISO-8859-1"));
    assert!(client.set_retries(0).is_err());
    client.set_download_remote(true);
    assert!(client.download_remote());
}

#[test]
fn encoding_is_passed_to_the_transport() {
    struct Probe;
    impl tika_client::transport::Transport for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }
        fn execute(
            &self,
            req: &tika_client::transport::TransportRequest<'_>,
            _sink: Option<&mut tika_client::sink::StreamSink>,
        ) -> tika_client::Result<String> {
            Ok(req.encoding.unwrap_or("none").to_string())
        }
        fn check(&self) -> tika_client::Result<()> {
            Ok(())
        }
        fn listing_format(&self) -> tika_client::response::ListingFormat {
            tika_client::response::ListingFormat::Text
        }
        fn set_timeout(&mut self, _: Option<std::time::Duration>) -> tika_client::Result<()> {
            Ok(())
        }
    }

    let mut client = Client::with_transport(Probe, &Default::default()).unwrap();
    assert_eq!(client.version().unwrap(), "none");
    client.set_encoding("UTF-16").unwrap();
    assert_eq!(client.version().unwrap(), "UTF-16");
}

#[test]
fn chunk_size_is_unsupported_on_the_service_variant() {
    let transport = ServiceTransport::new("localhost", Some(9998), &Service::default()).unwrap();
    let mut client = Client::with_transport(transport, &Default::default()).unwrap();
    for size in [0, 1, 4096, usize::MAX] {
        let err = client.set_chunk_size(size).unwrap_err();
        assert!(matches!(err, TikaError::Unsupported(_)));
    }
    assert_eq!(client.chunk_size(), None);
}
