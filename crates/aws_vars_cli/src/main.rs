use std::io::{self, Write};
use std::path::PathBuf;

use aws_vars_cli::commands::{build_resolver, paths_cmd, resolve_cmd};
use aws_vars_cli::config::AppConfig;
use aws_vars_cli::errors::Error;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Environment variable holding the log filter directives.
const LOG_ENV_VAR: &str = "AWS_VARS_LOG";

/// aws-vars: resolve Ansible host variables stored in AWS Parameter Store
#[derive(Parser, Debug)]
#[command(name = "aws-vars")]
#[command(about = "Resolve Ansible host variables stored in AWS Parameter Store", long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to ./aws-vars.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log resolution decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve and print the remote variables of a host
    Resolve(resolve_cmd::ResolveArgs),

    /// Print the lookup paths of a host, most generic first
    Paths(paths_cmd::PathsArgs),

    /// Show the CLI version
    Version,
}

fn env_filter(verbose: bool) -> EnvFilter {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ if verbose => EnvFilter::new("warn,aws_vars_core=debug,aws_client=debug,aws_vars_cli=debug"),
        _ => EnvFilter::new("warn"),
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let working_dir = std::env::current_dir().map_err(Error::ReadInput)?;
    let load_config =
        || AppConfig::load_or_default(cli.config.as_deref(), &working_dir);
    let env = |name: &str| std::env::var(name).ok();

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Commands::Resolve(args) => {
            let resolver = build_resolver(&load_config()?, env)?;
            resolve_cmd::execute(args, &resolver, io::stdin().lock(), &mut stdout).await
        }
        Commands::Paths(args) => {
            let resolver = build_resolver(&load_config()?, env)?;
            paths_cmd::execute(args, &resolver, io::stdin().lock(), &mut stdout).await
        }
        Commands::Version => {
            writeln!(
                stdout,
                "aws-vars version {}",
                option_env!("AWS_VARS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            )
            .map_err(Error::WriteOutput)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter(cli.verbose))
        .init();

    if let Err(e) = run(&cli).await {
        error!("Error: {e}");
        std::process::exit(1);
    }
}
