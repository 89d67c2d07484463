//! `georoute` command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use georoute_core::{BatchRequest, Coordinates, LocalEstimator, RouteQuery, RouteResult};
use georoute_runtime::{
    BatchOrchestrator, BatchResponse, CircuitState, RuntimeConfig, BUILTIN_PROVIDERS,
};

mod table;

#[derive(Parser, Debug)]
#[command(name = "georoute", version, about = "Rank destinations by driving distance")]
struct Cli {
    /// Runtime configuration file (YAML)
    #[arg(long, global = true, value_name = "path")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and rank a batch request (JSON or YAML)
    Resolve {
        /// Path to the batch request
        #[arg(value_name = "path")]
        request: PathBuf,

        /// Reset provider health before resolving
        #[arg(long)]
        force_fresh: bool,

        /// Override the request's concurrency cap
        #[arg(long, value_name = "n")]
        concurrency: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Print provider health to stderr when done
        #[arg(long)]
        health: bool,
    },

    /// Resolve one origin/destination pair through the provider cascade
    Route {
        /// Origin as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        origin: Coordinates,

        /// Destination as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        destination: Coordinates,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Offline estimate, no provider calls
    Estimate {
        #[arg(long, allow_hyphen_values = true)]
        origin: Coordinates,

        #[arg(long, allow_hyphen_values = true)]
        destination: Coordinates,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// List providers in cascade order
    Providers {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProviderRow {
    name: &'static str,
    accuracy: u8,
    rate_limit_per_minute: u32,
    timeout_ms: u64,
    key_env: Option<&'static str>,
    configured: bool,
    enabled: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("georoute=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Resolve {
            request,
            force_fresh,
            concurrency,
            format,
            health,
        } => {
            let mut batch = BatchRequest::from_file(&request)
                .with_context(|| format!("reading request {}", request.display()))?;
            if force_fresh {
                batch.force_fresh_cache = true;
            }
            if let Some(cap) = concurrency {
                batch.concurrency_cap = Some(cap);
            }

            let orchestrator = BatchOrchestrator::from_config(&config)?;
            let response = orchestrator.resolve_batch(&batch).await;
            print_batch(&response, format)?;

            if health {
                let snapshot = orchestrator.health_snapshot();
                let open = snapshot
                    .iter()
                    .filter(|entry| entry.state != CircuitState::Closed)
                    .count();
                tracing::info!(providers = snapshot.len(), open, "Provider health after batch");
                eprint!("{}", table::health(&snapshot));
            }
        }

        Command::Route {
            origin,
            destination,
            format,
        } => {
            let orchestrator = BatchOrchestrator::from_config(&config)?;
            let result = orchestrator
                .resolve_one(&RouteQuery::new(origin, destination))
                .await;
            print_route(&result, format)?;
        }

        Command::Estimate {
            origin,
            destination,
            format,
        } => {
            let result = LocalEstimator::resolve(&RouteQuery::new(origin, destination));
            print_route(&result, format)?;
        }

        Command::Providers { format } => {
            let rows = provider_rows(&config);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Table => print!("{}", table::providers(&rows)),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig> {
    let Some(path) = path else {
        tracing::debug!("No config file given, using defaults");
        return Ok(RuntimeConfig::default());
    };

    let config = RuntimeConfig::from_file(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        disabled = config.providers.disabled.len(),
        overrides = config.providers.overrides.len(),
        attempt_log = config.attempt_log.is_some(),
        "Loaded runtime configuration"
    );
    Ok(config)
}

fn provider_rows(config: &RuntimeConfig) -> Vec<ProviderRow> {
    BUILTIN_PROVIDERS
        .iter()
        .map(|builtin| {
            let over = config.providers.overrides.get(builtin.name);
            ProviderRow {
                name: builtin.name,
                accuracy: builtin.accuracy,
                rate_limit_per_minute: over
                    .and_then(|o| o.rate_limit_per_minute)
                    .unwrap_or(builtin.rate_limit_per_minute),
                timeout_ms: over
                    .and_then(|o| o.timeout)
                    .unwrap_or(builtin.timeout)
                    .as_millis() as u64,
                key_env: builtin.key_env,
                configured: builtin.is_configured(),
                enabled: !config.providers.disabled.iter().any(|d| d == builtin.name),
            }
        })
        .collect()
}

fn print_batch(response: &BatchResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Table => print!("{}", table::batch(response)),
    }
    Ok(())
}

fn print_route(result: &RouteResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Table => print!("{}", table::route(result)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "georoute",
            "estimate",
            "--origin",
            "-23.5505,-46.6333",
            "--destination",
            "-23.5618,-46.6565",
        ])
        .unwrap();

        match cli.command {
            Command::Estimate { origin, .. } => {
                assert_eq!(origin.lat, -23.5505);
                assert_eq!(origin.lng, -46.6333);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let result = Cli::try_parse_from([
            "georoute",
            "route",
            "--origin",
            "95,0",
            "--destination",
            "0,0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_load_config_reads_file_and_reports_missing() {
        let path = std::env::temp_dir().join(format!("georoute-cli-{}.yaml", std::process::id()));
        std::fs::write(&path, "batch:\n  default_concurrency: 2\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.batch.default_concurrency, 2);
        let _ = std::fs::remove_file(&path);

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("loading config"));
    }

    #[test]
    fn test_provider_rows_apply_config() {
        let config = RuntimeConfig::from_yaml(
            "providers:\n  disabled: [here]\n  overrides:\n    osrm:\n      rate_limit_per_minute: 5\n",
        )
        .unwrap();
        let rows = provider_rows(&config);

        let here = rows.iter().find(|r| r.name == "here").unwrap();
        assert!(!here.enabled);

        let osrm = rows.iter().find(|r| r.name == "osrm").unwrap();
        assert_eq!(osrm.rate_limit_per_minute, 5);
        assert!(osrm.configured);
        assert!(osrm.key_env.is_none());
    }
}
