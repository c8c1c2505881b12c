//! CLI command implementations
//!
//! Argument parsing and the command handlers used by `src/main.rs`, kept in
//! the library so they can be tested without spawning the binary.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    batch,
    config::ServeConfig,
    demo,
    error::{PreverError, Result},
    registry::{PipelineRegistry, VerticalStatus},
    schema::Vertical,
    validate::RawRecord,
};


/// Prever - tabular inference server for crop, diabetes and liver predictions
#[derive(Debug, Parser)]
#[command(name = "prever")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    ///
    /// Examples:
    ///   prever serve --demo
    ///   prever serve --config prever.toml --port 9000
    Serve {
        /// TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Artifact directory (overrides config)
        #[arg(long, value_name = "DIR")]
        artifacts: Option<PathBuf>,

        /// Serve the built-in reference bundles instead of reading artifacts
        #[arg(long, conflicts_with = "artifacts")]
        demo: bool,
    },
    /// Load and validate every bundle in an artifact directory
    Check {
        /// Artifact directory
        #[arg(long, value_name = "DIR")]
        artifacts: PathBuf,

        /// Verticals to check (default: all)
        #[arg(long, value_delimiter = ',')]
        verticals: Vec<Vertical>,
    },
    /// Run one record or a CSV file through a vertical and print the JSON body
    ///
    /// Examples:
    ///   prever predict crop --demo --field Nitrogen=90 --field Phosphorus=42 ...
    ///   prever predict diabetes --artifacts ./artifacts --csv panel.csv
    Predict {
        /// Vertical name (crop, diabetes, liver)
        #[arg(value_name = "VERTICAL")]
        vertical: Vertical,

        /// Artifact directory
        #[arg(long, value_name = "DIR", required_unless_present = "demo")]
        artifacts: Option<PathBuf>,

        /// Use the built-in reference bundle
        #[arg(long, conflicts_with = "artifacts")]
        demo: bool,

        /// Field as KEY=VALUE (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// CSV file with a header row
        #[arg(long, value_name = "FILE", conflicts_with = "fields")]
        csv: Option<PathBuf>,
    },
    /// Write the reference bundles to a directory
    ExportDemo {
        /// Destination directory (created if missing)
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Show version info
    Info,
}

/// Parse a `KEY=VALUE` argument
///
/// # Errors
///
/// Returns a message if there is no `=` or the key is empty.
pub fn parse_field(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        },
        _ => Err(format!("expected KEY=VALUE, got '{arg}'")),
    }
}

/// Main CLI entrypoint
///
/// # Errors
///
/// Propagates the failing command's error; the binary turns it into a
/// non-zero exit.
#[cfg(feature = "server")]
pub async fn entrypoint(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            artifacts,
            demo,
        } => {
            let config = serve_config(config.as_deref(), host, port, artifacts)?;
            crate::logging::init(&config.log_filter)?;
            server_commands::serve(config, demo).await
        },
        command => {
            crate::logging::init("warn")?;
            run_command(command)
        },
    }
}

/// Run any command other than `serve`
///
/// # Errors
///
/// Returns the command's error. `serve` is rejected with
/// `InvalidConfiguration` because it needs an async runtime.
pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { .. } => Err(PreverError::InvalidConfiguration(
            "serve must be started through the async entrypoint".to_string(),
        )),
        Commands::Check {
            artifacts,
            verticals,
        } => {
            let verticals = if verticals.is_empty() {
                Vertical::ALL.to_vec()
            } else {
                verticals
            };
            let statuses = check_artifacts(&artifacts, &verticals)?;
            for status in &statuses {
                println!("{}", format_status(status));
            }
            Ok(())
        },
        Commands::Predict {
            vertical,
            artifacts,
            demo,
            fields,
            csv,
        } => {
            let source = if demo {
                BundleSource::Demo
            } else {
                BundleSource::Dir(artifacts.unwrap_or_else(|| PathBuf::from("artifacts")))
            };
            let input = match csv {
                Some(path) => PredictInput::Csv(path),
                None => PredictInput::Fields(fields),
            };
            println!("{}", predict_json(vertical, &source, &input)?);
            Ok(())
        },
        Commands::ExportDemo { dir } => {
            for path in demo::export(&dir)? {
                println!("{}", path.display());
            }
            Ok(())
        },
        Commands::Info => {
            print_info();
            Ok(())
        },
    }
}

/// Build the serve configuration: file (or defaults) then flag overrides
///
/// # Errors
///
/// Returns the config file's load error or `InvalidConfiguration` if the
/// merged values are unusable.
pub fn serve_config(
    path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    artifacts: Option<PathBuf>,
) -> Result<ServeConfig> {
    let mut config = match path {
        Some(path) => ServeConfig::from_file(path)?,
        None => ServeConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = artifacts {
        config.artifacts_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

// ============================================================================
// check
// ============================================================================

/// Load every bundle for `verticals` from `dir`
///
/// # Errors
///
/// Returns `VerticalUnavailable` for the first vertical that failed to load.
pub fn check_artifacts(dir: &Path, verticals: &[Vertical]) -> Result<Vec<VerticalStatus>> {
    let registry = PipelineRegistry::load(dir, verticals);
    let statuses = registry.status();
    if let Some(failed) = statuses.iter().find(|s| !s.loaded) {
        for status in &statuses {
            eprintln!("{}", format_status(status));
        }
        return Err(PreverError::VerticalUnavailable {
            vertical: failed.vertical.to_string(),
            reason: failed.reason.clone().unwrap_or_default(),
        });
    }
    Ok(statuses)
}

fn format_status(status: &VerticalStatus) -> String {
    match &status.reason {
        None => format!("{:<9} ok", status.vertical.as_str()),
        Some(reason) => format!("{:<9} FAILED: {reason}", status.vertical.as_str()),
    }
}

// ============================================================================
// predict
// ============================================================================

/// Where `predict` gets its pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    /// Built-in reference bundle
    Demo,
    /// `<dir>/<vertical>.json`
    Dir(PathBuf),
}

/// What `predict` runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictInput {
    /// One record from `KEY=VALUE` pairs
    Fields(Vec<(String, String)>),
    /// Every row of a CSV file
    Csv(PathBuf),
}

/// Run `input` through the `vertical` pipeline and render the response body
///
/// A record that fails validation or prediction still renders; only a
/// missing bundle, unreadable file or rejected CSV is an error.
///
/// # Errors
///
/// Returns `VerticalUnavailable` if the bundle does not load, `IoError` for
/// an unreadable CSV and `FormatError` if the CSV is rejected as a whole.
pub fn predict_json(vertical: Vertical, source: &BundleSource, input: &PredictInput) -> Result<String> {
    let registry = match source {
        BundleSource::Demo => PipelineRegistry::demo(&[vertical]),
        BundleSource::Dir(dir) => PipelineRegistry::load(dir, &[vertical]),
    };
    let pipeline = registry.get(vertical)?;

    let body = match input {
        PredictInput::Fields(fields) => {
            let record: RawRecord = fields.iter().cloned().collect();
            serde_json::to_string_pretty(&pipeline.run(&record))?
        },
        PredictInput::Csv(path) => {
            let bytes = fs::read(path).map_err(|e| PreverError::io(path, &e))?;
            let report = batch::run_csv(&pipeline, &bytes, ServeConfig::default().max_batch_rows)
                .map_err(|e| PreverError::FormatError {
                    reason: e.to_string(),
                })?;
            info!(rows = report.total_rows(), failed = report.failed(), "Batch complete");
            serde_json::to_string_pretty(&report)?
        },
    };
    Ok(body)
}

// ============================================================================
// info
// ============================================================================

/// Print version and vertical summary
pub fn print_info() {
    println!("{}", info_text());
}

fn info_text() -> String {
    let mut text = format!(
        "Prever v{}\nTabular inference server\n\nVerticals:\n",
        crate::VERSION
    );
    for vertical in Vertical::ALL {
        let schema = crate::schema::schema_for(vertical);
        text.push_str(&format!(
            "  - {:<9} {} fields -> {} ({} labels)\n",
            vertical.as_str(),
            schema.fields.len(),
            schema.response_key,
            schema.labels.len(),
        ));
    }
    text
}

// ============================================================================
// serve
// ============================================================================

#[cfg(feature = "server")]
mod server_commands {
    use super::*;
    use tracing::warn;

    use crate::api::{create_router, AppState};

    /// Start the HTTP server and run until it stops
    pub(super) async fn serve(config: ServeConfig, demo: bool) -> Result<()> {
        let addr = config.socket_addr()?;
        let registry = if demo {
            info!("Serving reference bundles (demo mode)");
            PipelineRegistry::demo(&config.verticals)
        } else {
            info!(dir = %config.artifacts_dir.display(), "Loading artifacts");
            PipelineRegistry::load(&config.artifacts_dir, &config.verticals)
        };
        if !registry.all_loaded() {
            warn!(
                loaded = registry.loaded_count(),
                configured = registry.len(),
                "Starting with unavailable verticals"
            );
        }

        let app = create_router(AppState::new(registry, config));

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            PreverError::ServerError {
                operation: "bind".to_string(),
                reason: format!("Failed to bind {addr}: {e}"),
            }
        })?;
        info!(%addr, "Server listening");

        axum::serve(listener, app).await.map_err(|e| PreverError::ServerError {
            operation: "serve".to_string(),
            reason: format!("Server error: {e}"),
        })?;

        Ok(())
    }
}
