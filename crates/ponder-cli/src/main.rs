//! ponder - terminal client for reasoning-agent backends

mod commands;
mod config;
mod ui;
mod utils;

use anyhow::Context;
use clap::Parser;
use ponder_core::{ChatSession, SendOutcome, SessionEvent};
use ponder_proto::{DEFAULT_BASE_URL, Endpoint, TransportKind};
use std::io::{IsTerminal, Write};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// ponder - watch a reasoning agent think
#[derive(Parser, Debug)]
#[command(name = "ponder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (default: http://localhost:5001)
    #[arg(long)]
    url: Option<String>,

    /// Transport: stream, push or oneshot
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Send a single message, print the trace and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// In line mode, print session events as JSON lines
    #[arg(long)]
    json: bool,

    /// Check that the backend is reachable and exit
    #[arg(long)]
    check: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Settings resolved from flags and the config file
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Endpoint,
    pub transport: TransportKind,
    pub timeout: Option<Duration>,
}

fn init_logging(verbose: bool, cfg: &config::Config, to_file: bool) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let directive = if verbose {
        "ponder=debug".to_string()
    } else if let Some(filter) = &cfg.log_filter {
        filter.clone()
    } else {
        return Ok(());
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if to_file {
        let path = config::Config::log_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn resolve_settings(args: &Args, cfg: &config::Config) -> anyhow::Result<Settings> {
    let base_url = args
        .url
        .clone()
        .or(cfg.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let endpoint = Endpoint::new(&base_url)?;

    let transport = match args.transport {
        Some(kind) => kind,
        None => cfg.transport_kind()?.unwrap_or_default(),
    };

    Ok(Settings {
        endpoint,
        transport,
        timeout: cfg.request_timeout_secs.map(Duration::from_secs),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    let use_tui = args.command.is_none()
        && !args.check
        && !args.no_tui
        && !args.json
        && cfg.tui.unwrap_or(true)
        && std::io::stdout().is_terminal();

    init_logging(args.verbose, &cfg, use_tui)?;

    let settings = resolve_settings(&args, &cfg)?;
    tracing::debug!("Using {:?}", settings);

    let transport = ponder_proto::connect(settings.transport, settings.endpoint.clone());
    let mut session = ChatSession::new(transport);

    if args.check {
        return match session.check_health().await {
            Ok(()) => {
                println!(
                    "Backend at {} is healthy ({} transport)",
                    settings.endpoint, settings.transport
                );
                Ok(())
            }
            Err(ponder_core::Error::Proto(e)) => {
                eprintln!("{}", e.remediation(settings.endpoint.base()));
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Health check failed: {}", e);
                std::process::exit(1);
            }
        };
    }

    if let Some(command) = &args.command {
        let ok = run_command(&mut session, command, &settings, args.json).await?;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    if use_tui {
        ui::run_tui(&mut session, &settings).await
    } else {
        run_interactive(&mut session, &settings, args.json).await
    }
}

/// Print session events as they arrive; signals `done` after each terminal event
fn spawn_printer(
    mut receiver: broadcast::Receiver<SessionEvent>,
    json: bool,
) -> (tokio::task::JoinHandle<()>, mpsc::UnboundedReceiver<()>) {
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Printer lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize event: {}", e),
                }
            } else if let Some(text) = utils::format_update(&event) {
                println!("{}", text);
            }
            let _ = std::io::stdout().flush();

            if event.is_terminal() {
                let _ = done_tx.send(());
            }
        }
    });
    (handle, done_rx)
}

/// Send one turn, letting Ctrl+C cancel it
async fn send_interruptible(
    session: &mut ChatSession,
    text: &str,
    settings: &Settings,
) -> ponder_core::Result<SendOutcome> {
    let handle = session.handle();
    let send = utils::send_with_timeout(session, text, settings.timeout);
    tokio::pin!(send);

    loop {
        tokio::select! {
            result = &mut send => return result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[cancelling]");
                handle.cancel();
            }
        }
    }
}

/// Send a single message; returns whether the turn committed without error
async fn run_command(
    session: &mut ChatSession,
    command: &str,
    settings: &Settings,
    json: bool,
) -> anyhow::Result<bool> {
    if !json {
        println!("ponder> {}", command);
    }

    let (printer, mut done) = spawn_printer(session.subscribe(), json);
    let outcome = send_interruptible(session, command, settings).await?;
    done.recv().await;
    printer.abort();

    Ok(match outcome {
        SendOutcome::Committed(index) => !session.conversation().turns()[index].is_error,
        SendOutcome::Cancelled => false,
    })
}

async fn run_interactive(
    session: &mut ChatSession,
    settings: &Settings,
    json: bool,
) -> anyhow::Result<()> {
    use std::io;

    if io::stderr().is_terminal() {
        eprintln!("ponder ({} via {})", settings.endpoint, settings.transport);
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    let (printer, mut done) = spawn_printer(session.subscribe(), json);

    loop {
        if !json {
            print!("> ");
            io::stdout().flush()?;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input, session.conversation_mut()) {
            match result {
                commands::CommandResult::Message(msg)
                | commands::CommandResult::TraceChanged(msg) => println!("{}", msg),
                commands::CommandResult::Error(msg) => eprintln!("{}", msg),
                commands::CommandResult::Clear => println!("Cleared conversation."),
                commands::CommandResult::CheckHealth => match session.check_health().await {
                    Ok(()) => println!("Backend at {} is healthy.", settings.endpoint),
                    Err(ponder_core::Error::Proto(e)) => {
                        eprintln!("{}", e.remediation(settings.endpoint.base()))
                    }
                    Err(e) => eprintln!("{}", e),
                },
                commands::CommandResult::Exit => break,
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        match send_interruptible(session, input, settings).await {
            Ok(_) => {
                done.recv().await;
            }
            Err(e) => eprintln!("Error: {}", e),
        }
        if !json {
            println!();
        }
    }

    printer.abort();
    Ok(())
}
