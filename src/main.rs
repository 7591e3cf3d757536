mod client;
mod config;
mod error;
mod logging;
mod maps;
mod operations;
mod output;
mod prompt;

use crate::client::ZabbixClient;
use crate::error::ZbxError;
use crate::operations::{Invocation, OperationArgs};
use crate::prompt::LinePrompt;
use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use std::io;
use std::process;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "zbxctl",
    version,
    about = "CLI for the Zabbix JSON-RPC API",
    after_help = "Operations: host_get_search, host_get_gid, maintenance_create, map_create, map_delete, map_update, item_get_search, history_get"
)]
struct Cli {
    #[arg(
        short = 'd',
        value_name = "ALIAS",
        help = "Zabbix server alias from the config file"
    )]
    server: String,

    #[arg(
        short = 'm',
        value_name = "OPERATION",
        help = "Operation to run, or the raw API method when --file is given"
    )]
    method: String,

    #[command(flatten)]
    args: OperationArgs,

    #[arg(
        short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity (RUST_LOG overrides)"
    )]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("[Fail] {err:#}");
        process::exit(1);
    }

    if let Err(err) = run(cli) {
        report(&err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Everything that can be checked locally is checked before any prompt
    // or network traffic.
    let invocation = Invocation::from_args(&cli.method, &cli.args)?;
    debug!(?invocation, "validated arguments");

    let cwd = std::env::current_dir().context("reading current directory")?;
    let server = config::resolve(&cwd, &cli.server)?;
    let password = prompt::read_password()?;

    let mut client =
        ZabbixClient::login(&server.address, &server.protocol, &server.username, &password)?;
    info!(server = %cli.server, address = %server.address, "session opened");

    let mut prompt = LinePrompt::terminal();
    let mut stdout = io::stdout();
    invocation.execute(&mut client, &mut prompt, &mut stdout)?;
    debug!(requests = client.next_request_id() - 1, "session finished");
    Ok(())
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ZbxError>() {
        Some(ZbxError::Api { envelope, .. }) => {
            if let Ok(rendered) = output::to_pretty_string(envelope) {
                eprintln!("{rendered}");
            }
        }
        _ if shows_usage(err) => {
            eprintln!("{}", Cli::command().render_usage());
        }
        _ => {}
    }
    eprintln!("[Fail] {err:#}");
}

/// Usage only helps when the command line itself was wrong.
fn shows_usage(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ZbxError>(), Some(ZbxError::Argument(_)))
}
