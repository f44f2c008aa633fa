use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{Controller, DismissingPrompter, HttpSentimentApi, SubmitForm, VersionSource};
use tokio::{runtime::Runtime, sync::broadcast::error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;

use config::load_settings;
use terminal::{
    describe_event, describe_page, parse_line, PendingRelays, ReplCommand, StdinPrompter, HELP,
};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "sentiment-cli", about = "Classify comments and send feedback to a sentiment service")]
struct Args {
    /// Service root, e.g. http://127.0.0.1:5000
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    require_ticker: bool,
    #[arg(long)]
    show_confidence: bool,
    /// Read the app version from /version/appversion instead of /version.
    #[arg(long)]
    split_version: bool,
    #[arg(long)]
    no_model_version: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the app and model versions.
    Versions,
    /// Classify one comment and print the result.
    Classify {
        text: String,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Interactive session with feedback, corrections and flags.
    Repl,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if args.require_ticker {
        settings.require_ticker = true;
    }
    if args.show_confidence {
        settings.show_confidence = true;
    }
    if args.split_version {
        settings.version_source = VersionSource::Split;
    }
    if args.no_model_version {
        settings.fetch_model_version = false;
    }
    info!(base_url = %settings.base_url, "starting sentiment client");

    let runtime = Runtime::new().context("failed to build tokio runtime")?;
    let api = Arc::new(
        HttpSentimentApi::new(&settings.base_url)
            .with_context(|| format!("invalid base url '{}'", settings.base_url))?,
    );

    match args.command.unwrap_or(Command::Repl) {
        Command::Versions => {
            let controller = Controller::new(
                api,
                Arc::new(DismissingPrompter),
                settings.controller_options(),
            );
            runtime.block_on(controller.initialize());
            print_page(&runtime, &controller);
        }
        Command::Classify { text, ticker } => {
            let controller = Controller::new(
                api,
                Arc::new(DismissingPrompter),
                settings.controller_options(),
            );
            runtime.block_on(async {
                controller.initialize().await;
                controller.submit(SubmitForm { text, ticker }).await;
            });
            print_page(&runtime, &controller);
        }
        Command::Repl => {
            let controller =
                Controller::new(api, Arc::new(StdinPrompter), settings.controller_options());
            run_repl(&runtime, &controller)?;
        }
    }

    Ok(())
}

fn print_page(runtime: &Runtime, controller: &Arc<Controller>) {
    let state = runtime.block_on(controller.snapshot());
    for line in describe_page(&state) {
        println!("{line}");
    }
}

fn run_repl(runtime: &Runtime, controller: &Arc<Controller>) -> Result<()> {
    let mut events = controller.subscribe_events();
    runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    runtime.block_on(controller.initialize());
    println!("{HELP}");

    let mut ticker: Option<String> = None;
    let mut pending = PendingRelays::default();
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read stdin")?
            == 0
        {
            break;
        }

        match parse_line(&line) {
            ReplCommand::Submit(text) => {
                runtime.block_on(controller.submit(SubmitForm {
                    text,
                    ticker: ticker.clone(),
                }));
            }
            ReplCommand::SetTicker(value) => ticker = value,
            ReplCommand::Act(action) => {
                pending.track(runtime.block_on(controller.dispatch(action)));
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => println!("Unknown command {command}; try /help"),
        }
    }

    if !pending.is_empty() {
        info!(in_flight = pending.len(), "waiting for relays before exit");
    }
    runtime.block_on(pending.drain());
    Ok(())
}
