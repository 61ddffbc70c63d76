mod audit;
mod batch;
mod cli;
mod config;
mod driver;
mod error;
mod github;
mod invoker;
mod menu;
mod output;
mod scanner;
mod types;

use anyhow::Result;
use audit::{AuditReport, REPORT_FILE};
use clap::Parser;
use cli::{Args, Command};
use colored::Colorize;
use config::BatchConfig;
use driver::Context;
use github::PullRequestApi;
use invoker::SystemRunner;
use log::warn;
use types::Operation;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let command = match args.command {
        None | Some(Command::Menu) => return menu::run(args.json),
        Some(command) => command,
    };

    if command.needs_confirmation()
        && !menu::confirm("Discard all uncommitted changes except package files?")?
    {
        println!("Aborted.");
        return Ok(());
    }

    let config = command.into_config(menu::prompt_token)?;
    execute(&config, args.json)
}

/// Run one validated batch and print its results
pub fn execute(config: &BatchConfig, json: bool) -> Result<()> {
    let client = match &config.pull_requests {
        Some(settings) => Some(settings.client()?),
        None => None,
    };
    let ctx = Context {
        runner: &SystemRunner,
        pulls: client.as_ref().map(|c| c as &dyn PullRequestApi),
    };

    if !json {
        output::print_header(config.operation.name(), &config.parent);
    }

    let report = batch::run_batch(&ctx, &config.parent, &config.operation, |outcome| {
        if !json {
            output::print_outcome(outcome);
            println!();
        }
    })?;

    if json {
        output::print_json(&report);
    } else {
        output::print_summary(&report);
        output::print_pull_request_links(&report);
    }

    if config.operation == Operation::DependencyAudit {
        let audit = AuditReport::from_outcomes(&report.outcomes);
        if audit.is_empty() {
            if !json {
                println!("\nNo usable data collected from any projects.");
            }
            return Ok(());
        }
        if !json {
            output::print_audit_table(&audit);
        }

        // Best effort: a failed write does not fail the batch
        let path = config.parent.join(REPORT_FILE);
        match audit.write(&path) {
            Ok(()) => {
                if !json {
                    println!("\nDetailed report saved to: {}", path.display());
                }
            }
            Err(e) => {
                warn!("{:#}", e);
                eprintln!("{}: {:#}", "Error saving report file".red(), e);
            }
        }
    }

    Ok(())
}
