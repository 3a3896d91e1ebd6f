mod client;
mod config;
mod dispatch;
mod link;
mod protocol;
mod session;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;

use crate::client::{BookClient, ReadOutcome, send_reset_beacon};
use crate::config::{BookwireConfig, FileConfig, RenderConfig, ServerEndpoint};
use crate::link::ClientError;
use crate::protocol::ReadingForm;
use crate::session::SessionStore;
use teletype::TerminalSurface;

#[derive(Parser)]
#[command(name = "bookwire")]
#[command(about = "Streaming teletype client for the book construction service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Custom data directory (defaults to ~/.bookwire)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Server host override
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port override
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one construction request and type out the result
    Read(ReadArgs),

    /// Tell the server to discard this client's construction state
    Reset,
}

#[derive(Parser)]
struct ReadArgs {
    /// Book number used to seed the construction
    #[arg(long)]
    book: String,

    /// Number of words to construct
    #[arg(long)]
    words: String,

    /// Order of approximation (0-4)
    #[arg(long)]
    order: String,

    /// Override the per-character typing delay in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = BookwireConfig::new(cli.data_dir.clone())?;
    let file_config: FileConfig = config::load_config(&config.data_dir)
        .extract()
        .context("invalid configuration")?;

    let mut endpoint = ServerEndpoint::from_file(&file_config.server);
    if let Some(host) = cli.host {
        endpoint.host = host;
    }
    if let Some(port) = cli.port {
        endpoint.port = port;
    }
    let render = RenderConfig::from_file(&file_config.render);

    match cli.command {
        None => interactive_command(&config, &endpoint, &render).await,
        Some(Commands::Read(args)) => read_command(&config, &endpoint, &render, args).await,
        Some(Commands::Reset) => reset_command(&config, &endpoint).await,
    }
}

fn init_logging(debug: bool) {
    // Typed text owns stdout; all diagnostics go to stderr.
    let default_directive = if debug {
        "bookwire=debug,teletype=debug,info"
    } else {
        "bookwire=warn,teletype=warn,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Bare `bookwire`: prompt for a reading form, type the result out, repeat.
async fn interactive_command(
    config: &BookwireConfig,
    endpoint: &ServerEndpoint,
    render: &RenderConfig,
) -> Result<()> {
    let surface = Arc::new(TerminalSurface::new());
    let store = SessionStore::new(config.session_path());
    let mut client = BookClient::new(endpoint.clone(), surface, store, render.pace);

    let mut sig_rx = spawn_stop_listener();
    let mut lines = spawn_stdin_reader();

    eprintln!(
        "[bookwire: server {} | Ctrl-C stops a read, Ctrl-D quits]",
        endpoint.ws_url()
    );

    loop {
        let Some(form) = prompt_form(&mut lines, &mut sig_rx).await else {
            break;
        };
        match client.submit(form, &mut sig_rx).await {
            Ok(ReadOutcome::Finished) => eprintln!("\n[bookwire: construction finished]"),
            Ok(ReadOutcome::Stopped) => eprintln!("\n[bookwire: stopped]"),
            Ok(ReadOutcome::Closed) => eprintln!("\n[bookwire: connection closed]"),
            Err(ClientError::Unreachable) => {
                eprintln!("[bookwire: no server at {}]", endpoint.ws_url());
            }
            Err(e) => {
                client.shutdown().await;
                return Err(e.into());
            }
        }
    }

    client.shutdown().await;
    eprintln!("\n[bookwire: exited]");
    Ok(())
}

/// One-shot `bookwire read --book 7 --words 120 --order 2`.
async fn read_command(
    config: &BookwireConfig,
    endpoint: &ServerEndpoint,
    render: &RenderConfig,
    args: ReadArgs,
) -> Result<()> {
    let pace = match args.delay_ms {
        Some(ms) => Duration::from_millis(ms),
        None => render.pace,
    };
    let surface = Arc::new(TerminalSurface::new());
    let store = SessionStore::new(config.session_path());
    let mut client = BookClient::new(endpoint.clone(), surface, store, pace);
    let mut sig_rx = spawn_stop_listener();

    let form = ReadingForm {
        book: args.book,
        words: args.words,
        order: args.order,
    };
    let outcome = client.submit(form, &mut sig_rx).await;
    client.shutdown().await;

    match outcome? {
        ReadOutcome::Finished => eprintln!("\n[bookwire: construction finished]"),
        ReadOutcome::Stopped => eprintln!("\n[bookwire: stopped]"),
        ReadOutcome::Closed => eprintln!("\n[bookwire: connection closed before finishing]"),
    }
    Ok(())
}

/// `bookwire reset`: fire the cleanup notification now and forget the
/// stored session identifier.
async fn reset_command(config: &BookwireConfig, endpoint: &ServerEndpoint) -> Result<()> {
    let store = SessionStore::new(config.session_path());
    let session_id = store.load();
    send_reset_beacon(endpoint, session_id.as_deref()).await;
    store.clear();
    eprintln!("[bookwire: reset notification sent]");
    Ok(())
}

/// Forward Ctrl-C presses as stop events. Installing the handler keeps the
/// default abort behavior from killing us before the cleanup notification.
fn spawn_stop_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Read stdin lines on a detached thread. `None` signals end of input.
/// The thread parks in `read_line`, so nothing the runtime waits on may
/// live there; it simply dies with the process.
fn spawn_stdin_reader() -> mpsc::Receiver<Option<String>> {
    let (tx, rx) = mpsc::channel::<Option<String>>(4);
    std::thread::spawn(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        let mut handle = stdin.lock();
        loop {
            let mut line = String::new();
            match handle.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    let _ = tx.blocking_send(None);
                    break;
                }
                Ok(_) => {
                    if tx.blocking_send(Some(line)).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// What one interactive prompt produced.
enum Prompt {
    Line(String),
    Interrupted,
    Eof,
}

/// Collect one reading form. Ctrl-C abandons the half-entered form and
/// starts over from the first field; `None` means end of input.
async fn prompt_form(
    lines: &mut mpsc::Receiver<Option<String>>,
    sig_rx: &mut mpsc::Receiver<()>,
) -> Option<ReadingForm> {
    'form: loop {
        let mut form = ReadingForm {
            book: String::new(),
            words: String::new(),
            order: String::new(),
        };
        for (label, slot) in [
            ("book number", &mut form.book),
            ("words to construct", &mut form.words),
            ("order of approximation (0-4)", &mut form.order),
        ] {
            match prompt_field(label, lines, sig_rx).await {
                Prompt::Line(value) => *slot = value,
                Prompt::Interrupted => {
                    eprintln!("\n[bookwire: form cleared]");
                    continue 'form;
                }
                Prompt::Eof => return None,
            }
        }
        return Some(form);
    }
}

async fn prompt_field(
    label: &str,
    lines: &mut mpsc::Receiver<Option<String>>,
    sig_rx: &mut mpsc::Receiver<()>,
) -> Prompt {
    eprint!("{label}: ");
    tokio::select! {
        line = lines.recv() => match line {
            Some(Some(line)) => Prompt::Line(line.trim().to_string()),
            // End of input, or the reader thread is gone.
            _ => Prompt::Eof,
        },
        Some(()) = sig_rx.recv() => Prompt::Interrupted,
    }
}
