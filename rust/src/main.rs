//! credseal command-line entry point. Only command output goes to stdout;
//! diagnostics and logs go to stderr.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credseal::capture::{capture, emit, CaptureRequest};
use credseal::config::FileConfig;
use credseal::crypto::sealing::Identity;
use credseal::environment::ProcessEnvironment;
use credseal::reveal::{render, reveal, RevealFormat};
use credseal::session::{hold, shutdown_signal, HoldMode, HoldPolicy};
use credseal::Error;

const LOG_ENV: &str = "CREDSEAL_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "credseal",
    version,
    about = "Seal CI runtime credentials to an age recipient"
)]
struct Cli {
    #[arg(long, global = true, env = "CREDSEAL_CONFIG", help = "JSON config file")]
    config: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (overridden by CREDSEAL_LOG)"
    )]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal the runtime credentials, print them, then hold the session open.
    Capture {
        #[arg(long, env = "AGE_PUBLIC_KEY", hide_env_values = true)]
        recipient: Option<String>,
        #[arg(long, value_enum)]
        hold: Option<HoldMode>,
        #[arg(long, help = "Seconds to hold before exiting (implies --hold timeout)")]
        hold_seconds: Option<u64>,
    },
    /// Open a sealed line with an identity file.
    Reveal {
        #[arg(short, long, env = "CREDSEAL_IDENTITY")]
        identity: PathBuf,
        #[arg(long, value_enum, default_value_t = RevealFormat::Json)]
        format: RevealFormat,
        #[arg(help = "Sealed text; read from stdin when absent or '-'")]
        sealed: Option<String>,
    },
    /// Generate an identity file and print its public key.
    Keygen {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::MissingRecipient(name)) => {
            eprintln!("The {name} secret must be present.");
            eprintln!("You can generate one with `credseal keygen -o key.txt`.");
        }
        _ => eprintln!("error: {err:#}"),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Capture {
            recipient,
            hold: hold_mode,
            hold_seconds,
        } => {
            let file_config = load_file_config(cli.config.as_deref())?;
            let request = CaptureRequest::resolve(recipient, file_config.as_ref());
            let policy = resolve_hold(hold_mode, hold_seconds, file_config.as_ref())?;

            let sealed = capture(&ProcessEnvironment, &request)?;
            // Handlers are registered before the line goes out.
            let shutdown = shutdown_signal();
            emit(&mut io::stdout().lock(), &sealed)?;

            tracing::info!(?policy, "holding session open");
            let outcome = hold(policy, shutdown).await;
            tracing::info!(?outcome, "session released");
        }
        Commands::Reveal {
            identity,
            format,
            sealed,
        } => {
            let identity = Identity::from_file(&identity)?;
            let sealed_text = match sealed.as_deref() {
                None | Some("-") => {
                    let mut buffer = String::new();
                    io::stdin()
                        .read_to_string(&mut buffer)
                        .context("reading sealed text from stdin")?;
                    buffer
                }
                Some(text) => text.to_string(),
            };

            let credentials = reveal(&identity, &sealed_text)?;
            let names = load_file_config(cli.config.as_deref())?
                .map(|c| c.variables)
                .unwrap_or_default();
            let rendered = render(&credentials, format, &names)?;

            let mut out = io::stdout().lock();
            out.write_all(rendered.as_bytes())
                .and_then(|_| out.flush())
                .context("writing revealed credentials")?;
        }
        Commands::Keygen { output } => {
            let identity = Identity::generate();
            match output {
                Some(path) => identity.write_new_file(&path)?,
                None => {
                    let mut out = io::stdout().lock();
                    out.write_all(identity.to_file_contents().as_bytes())
                        .and_then(|_| out.flush())
                        .context("writing identity")?;
                }
            }
            eprintln!("Public key: {}", identity.public_key());
        }
    }

    Ok(())
}

fn load_file_config(path: Option<&Path>) -> anyhow::Result<Option<FileConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let config = FileConfig::load(path, &ProcessEnvironment)
        .with_context(|| format!("loading config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

/// Flag > config file > hold forever. `--hold-seconds` alone means timeout.
fn resolve_hold(
    mode: Option<HoldMode>,
    seconds: Option<u64>,
    file: Option<&FileConfig>,
) -> anyhow::Result<HoldPolicy> {
    let mode = match (mode, seconds) {
        (None, None) => return Ok(file.and_then(|f| f.hold).unwrap_or_default()),
        (None, Some(_)) => HoldMode::Timeout,
        (Some(mode), _) => mode,
    };
    HoldPolicy::from_mode(mode, seconds)
        .map_err(|reason| anyhow::anyhow!("invalid hold settings: {reason}"))
}
