#![forbid(unsafe_code)]

use std::process::exit;

use clap::{ArgAction, Parser};
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use crate::commands::Subcommand;

#[derive(Parser)]
#[clap(version, author, about)]
struct Opt {
    /// Increase the level of verbosity. Can be used multiple times.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Use JSON output for log messages
    #[clap(short, long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Subcommand,
}

impl Opt {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "slug_emulator=debug,slug_cli=debug,info",
            2 => "slug_emulator=trace,slug_cli=trace,info",
            3 => "slug_emulator=trace,slug_cli=trace,debug",
            4..=u8::MAX => "trace",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // Parse log level from env
        EnvFilter::try_from_default_env()
            // or infer from args
            .or_else(|_| EnvFilter::try_new(self.log_filter()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn main() {
    // First, parse the arguments
    let opt = Opt::parse();

    // Then, setup the tracing formatter for logging and instrumentation.
    // Diagnostics go to stderr: the emulated program owns stdout.
    let registry = tracing_subscriber::Registry::default().with(opt.filter_layer());

    if opt.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        registry.with(json_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    }

    // And run the command
    let res = opt.command.exec();
    if let Err(e) = res {
        error!("{:#}", e);
        exit(1);
    }
}
