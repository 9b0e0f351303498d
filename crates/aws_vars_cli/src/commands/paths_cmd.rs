//! `aws-vars paths`: print the lookup paths of a host, most generic first.

use std::io::{Read, Write};

use aws_vars_core::HostVarsResolver;
use clap::Args;

use crate::commands::HostArgs;
use crate::errors::Error;

#[cfg(test)]
#[path = "paths_cmd_tests.rs"]
mod tests;

#[derive(Args, Debug, Clone)]
pub struct PathsArgs {
    #[command(flatten)]
    pub host: HostArgs,
}

pub async fn execute(
    args: &PathsArgs,
    resolver: &HostVarsResolver,
    stdin: impl Read,
    out: &mut impl Write,
) -> Result<(), Error> {
    let host = args.host.host_context(stdin)?;

    for path in resolver.construct_paths(&host).await {
        writeln!(out, "{path}").map_err(Error::WriteOutput)?;
    }

    Ok(())
}
