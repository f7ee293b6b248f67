//! CLI for the resilient HTTP caller.

mod commands;
mod events;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rhc_core::config;
use rhc_core::telemetry::{Tee, TracingSink};
use rhc_core::Client;
use std::sync::Arc;

use commands::{run_config, run_policy, run_request};
use events::JsonLinesSink;

/// Top-level CLI for rhc.
#[derive(Debug, Parser)]
#[command(name = "rhc")]
#[command(about = "rhc: HTTP requests with throttling-aware retries", long_about = None)]
pub struct Cli {
    /// Print every retry event as a JSON line on stderr.
    #[arg(long, global = true)]
    pub events: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// GET a URL and print the body of a 2xx response.
    Get {
        /// HTTP/HTTPS URL.
        url: String,
    },

    /// Send a request with any supported method.
    Request {
        /// GET, HEAD, OPTIONS, TRACE, PUT, DELETE, POST or PATCH.
        method: String,
        /// HTTP/HTTPS URL.
        url: String,
        /// Extra header as "Name: value". Repeatable.
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,
        /// Request body.
        #[arg(short = 'd', long = "data", value_name = "DATA")]
        data: Option<String>,
    },

    /// Show which retry policy a method gets.
    Policy {
        method: String,
    },

    /// Show the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get { url } => {
                let client = build_client(&cfg, cli.events)?;
                run_request(&client, "GET", &url, &[], None).await?;
            }
            CliCommand::Request {
                method,
                url,
                headers,
                data,
            } => {
                let client = build_client(&cfg, cli.events)?;
                run_request(&client, &method, &url, &headers, data).await?;
            }
            CliCommand::Policy { method } => run_policy(&cfg, &method)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

fn build_client(cfg: &config::RhcConfig, events: bool) -> Result<Client> {
    let client = Client::from_config(cfg)?;
    if events {
        Ok(client.with_telemetry(Arc::new(Tee(TracingSink, JsonLinesSink))))
    } else {
        Ok(client)
    }
}

#[cfg(test)]
mod tests;
