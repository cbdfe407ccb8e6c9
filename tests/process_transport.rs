#![cfg(unix)]

mod common;

use common::{path_str, temp_doc};
use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tika_client::config::{Config, Process};
use tika_client::request::RequestKind;
use tika_client::transport::{ProcessTransport, TransportRequest};
use tika_client::{AnyClient, ErrorCode, ProcessClient, TikaError};

// Stands in for `java -jar tika-app.jar`; the last argument is the file.
const FAKE_JAVA: &str = r#"#!/bin/sh
for a in "$@"; do last="$a"; done
case " $* " in
  *" --version "*) echo "Apache Tika 2.9.2" ;;
  *" --metadata --json "*) printf '{"Content-Type":"text/plain","dc:title":"Fake"}' ;;
  *" --metadata --jsonRecursive "*) printf '[{"Content-Type":"application/zip"},{"X-TIKA:embedded_depth":"1","X-TIKA:embedded_resource_path":"/inner.txt"}]' ;;
  *" --text "*) cat "$last" ;;
  *" --language "*) echo en ;;
  *" --list-parsers "*) printf 'org.apache.tika.parser.DefaultParser (Composite Parser):\n    org.apache.tika.parser.txt.TXTParser\n' ;;
  *" --detect "*) echo "detector exploded" >&2; exit 3 ;;
  *" --html "*) [ -n "$TIKA_RUNS" ] && echo run >> "$TIKA_RUNS"; exec sleep 5 ;;
  *" --text-main "*) printf 'partial'; exec 1>&-; exec sleep 5 ;;
  *) echo "unexpected: $*" >&2; exit 64 ;;
esac
"#;

struct Fixture {
    _dir: TempDir,
    jar: PathBuf,
    cfg: Config,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("tika-app.jar");
    std::fs::write(&jar, b"not really a jar").unwrap();

    let java = dir.path().join("fake-java");
    std::fs::write(&java, FAKE_JAVA).unwrap();
    std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut cfg = Config::default();
    cfg.client.target = jar.display().to_string();
    cfg.process.java = java.display().to_string();
    Fixture {
        _dir: dir,
        jar,
        cfg,
    }
}

fn client(fx: &Fixture) -> ProcessClient {
    ProcessClient::process(&fx.jar, &fx.cfg).unwrap()
}

#[test]
fn jar_target_builds_a_process_client() {
    let fx = fixture();
    let mut client = AnyClient::from_config(&fx.cfg).unwrap();
    assert_eq!(client.version().unwrap(), "Apache Tika 2.9.2");
    client.check().unwrap();
    assert_eq!(client.chunk_size(), Some(1024 * 1024));
}

#[test]
fn missing_jar_is_a_configuration_error() {
    let err = ProcessTransport::new(Path::new("/nowhere/tika-app.jar"), &Process::default(), 0)
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::Configuration);
}

#[test]
fn metadata_and_language_come_from_stdout() {
    let fx = fixture();
    let doc = temp_doc("hello");
    let mut client = client(&fx);

    let meta = client.metadata(&path_str(&doc)).unwrap();
    assert_eq!(meta.title().as_deref(), Some("Fake"));
    assert_eq!(client.language(&path_str(&doc)).unwrap(), "en");
}

#[test]
fn recursive_metadata_ignore_maps_to_json_recursive() {
    let fx = fixture();
    let doc = temp_doc("zip");
    let mut client = client(&fx);

    let map = client.recursive_metadata(&path_str(&doc), "ignore").unwrap();
    let base = doc.path().file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(map.len(), 2);
    assert!(map.contains_key(&format!("{base}/inner.txt")));
}

#[test]
fn bare_recursive_kind_is_unknown_to_the_app() {
    let fx = fixture();
    let doc = temp_doc("zip");
    let mut client = client(&fx);

    let err = client.recursive_metadata(&path_str(&doc), "none").unwrap_err();
    assert!(matches!(err, TikaError::UnknownRequestType(ref k) if k == "rmeta"));
}

#[test]
fn text_is_delivered_in_chunks_of_the_configured_size() {
    let fx = fixture();
    let doc = temp_doc("abcdefghij");
    let mut client = client(&fx);
    client.set_chunk_size(4).unwrap();

    let text = client
        .text_with(&path_str(&doc), |chunk| format!("[{chunk}]"), true)
        .unwrap();
    assert_eq!(text, "[abcd][efgh][ij]");

    let last = client
        .text_with(&path_str(&doc), |chunk| chunk.to_string(), false)
        .unwrap();
    assert_eq!(last, "ij");

    client.clear_callback();
    assert_eq!(client.text(&path_str(&doc)).unwrap(), "abcdefghij");
}

#[test]
fn multibyte_characters_survive_chunk_boundaries() {
    let fx = fixture();
    let doc = temp_doc("żółw");
    let mut client = client(&fx);
    client.set_chunk_size(3).unwrap();

    let text = client
        .text_with(&path_str(&doc), |chunk| chunk.to_string(), true)
        .unwrap();
    assert_eq!(text, "żółw");
}

#[test]
fn non_zero_exit_carries_stderr() {
    let fx = fixture();
    let doc = temp_doc("x");
    let mut client = client(&fx);

    match client.mime(&path_str(&doc)).unwrap_err() {
        TikaError::TransportFatal { status, message } => {
            assert_eq!(status, Some(3));
            assert!(message.contains("detector exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn launch_failure_is_transient() {
    let fx = fixture();
    let doc = temp_doc("x");
    let mut client = client(&fx);
    client.set_java("/nonexistent/bin/java").unwrap();
    client.set_retries(2).unwrap();

    let err = client.text(&path_str(&doc)).unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn slow_engine_is_killed_once_and_not_retried() {
    let fx = fixture();
    let doc = temp_doc("x");
    let runs = fx._dir.path().join("runs.log");
    let mut client = client(&fx);
    client.set_env_vars(BTreeMap::from([(
        "TIKA_RUNS".to_string(),
        runs.display().to_string(),
    )]));
    client.set_retries(3).unwrap();
    client.set_timeout(Some(Duration::from_millis(300))).unwrap();

    let err = client.html(&path_str(&doc)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TransportFatal);
    assert!(!err.is_transient());
    assert!(err.to_string().contains("timeout"));
    assert_eq!(std::fs::read_to_string(&runs).unwrap().lines().count(), 1);
}

#[test]
fn engine_that_closes_stdout_but_keeps_running_is_killed() {
    let fx = fixture();
    let doc = temp_doc("x");
    let mut client = client(&fx);
    client.set_timeout(Some(Duration::from_millis(300))).unwrap();

    let started = Instant::now();
    let err = client.main_text(&path_str(&doc)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TransportFatal);
    assert!(err.to_string().contains("timeout"));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn text_listings_are_decoded() {
    let fx = fixture();
    let mut client = client(&fx);
    assert_eq!(
        client.available_parsers().unwrap(),
        vec![
            "org.apache.tika.parser.DefaultParser",
            "org.apache.tika.parser.txt.TXTParser",
        ]
    );
}

#[test]
fn arguments_follow_the_request() {
    let fx = fixture();
    let doc = temp_doc("x");
    let transport = ProcessTransport::new(&fx.jar, &fx.cfg.process, 0).unwrap();
    let client = client(&fx);
    let resolved = client
        .check_request(RequestKind::MainText, Some(&path_str(&doc)))
        .unwrap();

    let args = transport
        .arguments(&TransportRequest {
            kind: RequestKind::MainText,
            file: resolved.as_ref(),
            encoding: Some("UTF-8"),
        })
        .unwrap();
    assert_eq!(args[0], "-jar");
    assert!(args.contains(&"--text-main".to_string()));
    assert!(args.contains(&"--encoding=UTF-8".to_string()));
    assert_eq!(args.last().unwrap(), &path_str(&doc));

    let args = transport
        .arguments(&TransportRequest {
            kind: RequestKind::Version,
            file: None,
            encoding: None,
        })
        .unwrap();
    assert_eq!(args.last().unwrap(), "--version");
}
