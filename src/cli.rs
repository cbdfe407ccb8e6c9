use crate::{client::AnyClient, config::Config, util::ensure_dir};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "tika-client")]
#[command(about = "Query Apache Tika through tika-app or tika-server")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./tika-client.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Jar path or server host; overrides `client.target`.
    #[arg(long)]
    pub target: Option<String>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the engine runs a supported version.
    Check {},
    Version {},
    Meta {
        file: String,
    },
    Rmeta {
        file: String,
        /// text, html, ignore or none
        #[arg(long, default_value = "ignore")]
        format: String,
    },
    Lang {
        file: String,
    },
    Mime {
        file: String,
    },
    Text {
        file: String,
        /// Main content only (boilerplate removed).
        #[arg(long)]
        main: bool,
        /// Print chunks as they arrive instead of at the end.
        #[arg(long)]
        stream: bool,
    },
    Html {
        file: String,
    },
    Detectors {},
    Parsers {},
    MimeTypes {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let mut cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(target) = &args.target {
        cfg.client.target = target.clone();
    }
    let _guard = init_logging(&args, &cfg)?;

    let mut client = AnyClient::from_config(&cfg)
        .with_context(|| format!("connecting to {}", cfg.client.target))?;
    info!("target={} retries={}", cfg.client.target, client.retries());

    match &args.cmd {
        Command::Check {} => {
            client.check()?;
            print_json(&serde_json::json!({ "status": "ok" }))
        }
        Command::Version {} => {
            println!("{}", client.version()?);
            Ok(())
        }
        Command::Meta { file } => print_json(&client.metadata(file)?),
        Command::Rmeta { file, format } => print_json(&client.recursive_metadata(file, format)?),
        Command::Lang { file } => {
            println!("{}", client.language(file)?);
            Ok(())
        }
        Command::Mime { file } => {
            println!("{}", client.mime(file)?);
            Ok(())
        }
        Command::Text { file, main, stream } => {
            if *stream {
                client.set_callback(
                    |chunk| {
                        let mut out = std::io::stdout().lock();
                        let _ = out.write_all(chunk.as_bytes());
                        let _ = out.flush();
                        String::new()
                    },
                    true,
                );
            }
            let text = if *main {
                client.main_text(file)?
            } else {
                client.text(file)?
            };
            if !*stream {
                println!("{text}");
            }
            Ok(())
        }
        Command::Html { file } => {
            println!("{}", client.html(file)?);
            Ok(())
        }
        Command::Detectors {} => print_json(&client.available_detectors()?),
        Command::Parsers {} => print_json(&client.available_parsers()?),
        Command::MimeTypes {} => print_json(&client.supported_mime_types()?),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("tika-client.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let file_path = resolve_log_path(cfg);
    let (file_layer, guard) = if let Some(path) = file_path.as_deref() {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("tika-client.log"))
}
