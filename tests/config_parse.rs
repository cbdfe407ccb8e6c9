use tika_client::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../tika-client.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.client.retries >= 1);
    assert_eq!(cfg.client.port, 9998);
    assert!(!cfg.is_process_target());
    assert_eq!(cfg.process.java_args, vec!["-Xmx1g".to_string()]);
}

#[test]
fn jar_target_selects_process_transport() {
    let cfg: Config = toml::from_str("[client]\ntarget = \"/opt/tika/tika-app-2.9.2.JAR\"\n").unwrap();
    assert!(cfg.is_process_target());
    // untouched sections keep their defaults
    assert_eq!(cfg.client.retries, 3);
    assert_eq!(cfg.service.timeout_seconds, 30);
}
