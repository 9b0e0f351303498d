//! `aws-vars resolve`: print the remote variables of one host.
//!
//! ```bash
//! ansible-inventory --host mysql-1 | aws-vars resolve --host mysql-1
//! aws-vars resolve --host localhost --vars host_vars.json --report --format pretty
//! ```

use std::io::{Read, Write};

use aws_vars_core::HostVarsResolver;
use clap::Args;
use tracing::instrument;

use crate::commands::{write_json, HostArgs, OutputFormat};
use crate::errors::Error;

#[cfg(test)]
#[path = "resolve_cmd_tests.rs"]
mod tests;

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub host: HostArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Print tags, paths and conflicts along with the merged values
    #[arg(long)]
    pub report: bool,
}

/// Resolves the host and writes the result to `out`.
///
/// Remote failures are logged by the resolver and do not fail the command;
/// the output then holds whatever could be fetched.
#[instrument(skip_all, fields(host = %args.host.host))]
pub async fn execute(
    args: &ResolveArgs,
    resolver: &HostVarsResolver,
    stdin: impl Read,
    out: &mut impl Write,
) -> Result<(), Error> {
    let host = args.host.host_context(stdin)?;

    if args.report {
        let resolution = resolver.resolve_with_report(&host).await;
        write_json(out, &resolution, args.format)
    } else {
        let values = resolver.resolve(&host).await;
        write_json(out, &values, args.format)
    }
}
