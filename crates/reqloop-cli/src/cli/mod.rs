//! CLI for the reqloop request executor.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reqloop_core::config;
use reqloop_core::Method;
use std::path::PathBuf;

use commands::{run_backoff, run_config, run_send, SendOptions};

/// Top-level CLI for reqloop.
#[derive(Debug, Parser)]
#[command(name = "reqloop")]
#[command(about = "reqloop: send HTTP requests with signing, retry and redirect following", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request and print the response.
    Send {
        /// HTTP method (GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS).
        method: Method,

        /// Absolute http/https URL.
        url: String,

        /// Extra request header; repeatable.
        #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Query parameter; repeatable.
        #[arg(short = 'q', long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,

        /// Request body given inline.
        #[arg(long, conflicts_with = "data_file")]
        data: Option<String>,

        /// Request body read from a file (replayable on retry).
        #[arg(long, value_name = "PATH")]
        data_file: Option<PathBuf>,

        /// Override max_retries from the config file.
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Print response headers before the body.
        #[arg(short = 'i', long)]
        include: bool,
    },

    /// Show the config file path and effective settings.
    Config,

    /// Print the backoff schedule for consecutive failures.
    Backoff {
        /// Schedule after throttling (HTTP 429) instead of transport or server errors.
        #[arg(long)]
        throttled: bool,
        /// Number of retries to show.
        #[arg(long, default_value = "5", value_name = "N")]
        attempts: u32,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Send {
                method,
                url,
                headers,
                query,
                data,
                data_file,
                retries,
                include,
            } => {
                let opts = SendOptions {
                    method,
                    url,
                    headers,
                    query,
                    data,
                    data_file,
                    retries,
                    include,
                };
                run_send(&cfg, opts).await?;
            }
            CliCommand::Config => run_config(&cfg).await?,
            CliCommand::Backoff {
                throttled,
                attempts,
            } => run_backoff(&cfg, throttled, attempts).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
