//! `blueprint-infra` command line.
//!
//! Exit codes: 0 on success, 1 when the configuration fails validation, 2 for
//! every other error.

use anyhow::{Context, Result};
use blueprint_infra_config::{Config, ConfigError};
use blueprint_infra_stack::{compose, DeploymentManifest, StackError};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{debug, info};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_INVALID_CONFIG: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "blueprint-infra")]
#[command(version)]
#[command(about = "Validate deploy configuration and synthesize the least-privilege deployment manifest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, reporting every violation
    Validate(ConfigArgs),

    /// Validate, compose the stack and write the deployment manifest as JSON
    Synth {
        #[command(flatten)]
        config: ConfigArgs,

        /// Write the manifest here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Pretty-print the manifest
        #[arg(long)]
        pretty: bool,
    },

    /// Print the JSON schema of the deployment manifest
    Schema,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file (TOML); environment variables take precedence over its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Validate(args) => {
            let Some(config) = load_config(args.config.as_deref())? else {
                return Ok(ExitCode::from(EXIT_INVALID_CONFIG));
            };
            debug!("{:?}", config);
            eprintln!("Configuration is valid");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Synth {
            config,
            output,
            pretty,
        } => {
            let Some(config) = load_config(config.config.as_deref())? else {
                return Ok(ExitCode::from(EXIT_INVALID_CONFIG));
            };
            let manifest = compose(&config).map_err(|err| {
                let context = compose_failure_context(&err);
                anyhow::Error::new(err).context(context)
            })?;
            write_manifest(&manifest, output.as_deref(), pretty)?;
            print_summary(&manifest);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(DeploymentManifest);
            let json = serde_json::to_string_pretty(&schema)
                .context("Failed to serialize manifest schema")?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Design errors mean the stack itself is wrong, not the operator's input.
fn compose_failure_context(err: &StackError) -> &'static str {
    if err.is_fatal_design_error() {
        "Refusing to deploy: the stack would emit an out-of-order or over-broad resource"
    } else {
        "Failed to compose the stack"
    }
}

/// Load and validate the configuration.
///
/// Validation failures are reported here and yield `None`; read and parse
/// failures propagate as errors.
fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    match blueprint_infra_config::load(path) {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::Invalid(errors)) => {
            let missing = errors.iter().filter(|e| e.is_missing()).count();
            eprintln!(
                "Configuration is invalid ({} error(s), {} missing):",
                errors.len(),
                missing
            );
            for error in &errors {
                eprintln!("  {error}");
            }
            Ok(None)
        }
        Err(err) => Err(err).context("Failed to load configuration"),
    }
}

fn write_manifest(manifest: &DeploymentManifest, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(manifest)
    } else {
        serde_json::to_string(manifest)
    }
    .context("Failed to serialize manifest")?;

    match output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
            info!("Wrote manifest to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write manifest to stdout")?;
        }
    }
    Ok(())
}

fn print_summary(manifest: &DeploymentManifest) {
    let outputs = &manifest.outputs;
    eprintln!(
        "Synthesized {} with {} resources",
        manifest.stack_name,
        manifest.resources.len()
    );
    eprintln!("  bucket:        {}", outputs.bucket_name);
    eprintln!("  distribution:  {}", outputs.distribution_id);
    eprintln!("  deploy role:   {}", outputs.deploy_role_arn);
    eprintln!("  site:          {}", outputs.site_url);
}
