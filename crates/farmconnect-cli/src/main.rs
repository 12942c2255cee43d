//! FarmConnect CLI - drives the session lifecycle from a terminal.
//!
//! Each invocation is a cold start: the stored refresh token is the only
//! thing carried between runs, exactly as on the phone.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use farmconnect_core::config::{CredentialBackend, APP_NAME};
use farmconnect_core::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file prefix inside the data directory
const LOG_FILE_PREFIX: &str = "farmconnect.log";

#[derive(Parser)]
#[command(name = "farmconnect", version, about = "FarmConnect session tool")]
struct Cli {
    /// Where to keep the refresh token (overrides config)
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Keyring,
    EncryptedFile,
    Memory,
}

impl From<Backend> for CredentialBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Keyring => CredentialBackend::Keyring,
            Backend::EncryptedFile => CredentialBackend::EncryptedFile,
            Backend::Memory => CredentialBackend::Memory,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Renew the stored session, as the app does on launch
    Start,
    /// Log in with a one-time code sent by SMS
    Login {
        /// 10-digit mobile number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// telugu, hindi or english
        #[arg(long)]
        language: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        district: String,
        #[arg(long)]
        mandal: Option<String>,
        #[arg(long)]
        village: Option<String>,
    },
    /// Show the signed-in farmer's profile
    Whoami {
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Invalidate the session and forget the stored token
    Logout,
}

/// Initialize the tracing subscriber for logging.
/// Stderr gets warnings by default; the daily log file gets everything
/// the filter allows. `RUST_LOG` controls both.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_dir = dirs::data_local_dir().map(|dir| dir.join(APP_NAME).join("logs"));
    let _guard = init_tracing(log_dir.as_deref());
    info!("FarmConnect CLI starting");

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(backend) = cli.backend {
        config.credential_backend = backend.into();
    }

    let result = match cli.command {
        Command::Start => commands::start(&config).await,
        Command::Login { phone } => commands::login(&mut config, phone).await,
        Command::Register {
            name,
            phone,
            language,
            state,
            district,
            mandal,
            village,
        } => {
            let details = commands::RegisterArgs {
                name,
                phone,
                language,
                state,
                district,
                mandal,
                village,
            };
            commands::register(&mut config, details).await
        }
        Command::Whoami { json } => commands::whoami(&config, json).await,
        Command::Logout => commands::logout(&config).await,
    };

    info!("FarmConnect CLI finished");
    result
}
