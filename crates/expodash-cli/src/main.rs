//! expodash - terminal dashboard for exhibition organizers.
//!
//! One-shot subcommands for scripting, plus an interactive shell that
//! keeps the session alive while the organizer is typing and logs out
//! after the configured idle time.

mod display;
mod shell;

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use expodash_core::auth::KeyValueStore;
use expodash_core::models::{NewOrganizer, EXHIBIT_TAGS};
use expodash_core::{ApiClient, Config, CredentialStore, Notifier, SessionManager};

#[derive(Parser)]
#[command(name = "expodash", version, about = "Exhibition organizer dashboard")]
struct Cli {
    /// Base URL of the main backend
    #[arg(long, env = "EXPODASH_API_URL")]
    api_url: Option<String>,

    /// Base URL of the alerts backend
    #[arg(long, env = "EXPODASH_ALERTS_URL")]
    alerts_url: Option<String>,

    /// Inactivity timeout in seconds
    #[arg(long, env = "EXPODASH_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "EXPODASH_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an organizer account
    Register,
    /// Show whether a session is stored
    Status,
    /// Clear the stored session
    Logout,
    /// List organizers
    Organizers,
    /// List alerts
    Alerts,
    /// Broadcast an alert
    SendAlert { text: String },
    /// List buildings with exhibits carrying a tag
    Buildings { tag: String },
    /// Interactive dashboard (default)
    Shell,
}

/// Prints notices on their own line so they stand out from the prompt.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("\n*** {} ***", message);
    }
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or_else(|| OsStr::new("expodash.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(ref url) = cli.alerts_url {
        config.alerts_base_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.session.timeout_seconds = secs;
    }
    config.validate()?;
    Ok(config)
}

/// A fresh session manager over the shared credential backend.
pub fn new_session(config: &Config, store: Arc<dyn KeyValueStore>) -> SessionManager {
    SessionManager::new(
        config.session.clone(),
        CredentialStore::new(store),
        Arc::new(TerminalNotifier),
    )
}

pub fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

pub fn prompt_line(label: &str) -> Result<String> {
    use std::io::Write;
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());
    info!("expodash starting");

    let mut config = load_config(&cli)?;
    let store = config.open_store()?;
    let session = new_session(&config, store.clone());
    let client = ApiClient::new(&config, session.clone())?;

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run(&config, store, &client).await?,
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            let password = prompt_password()?;
            match client.login(&email, &password).await {
                Ok(record) => {
                    println!("Logged in as {}", record.user.email);
                    config.last_email = Some(email);
                    config.save()?;
                }
                Err(e) => eprintln!("{}", e.user_message()),
            }
        }
        Command::Register => register(&client).await?,
        Command::Status => match session.credentials().load() {
            Some(record) => {
                println!("Logged in as {}", record.user.email);
                if let Some(id) = record.organizer_id() {
                    println!("Organizer ID: {}", id);
                }
            }
            None => println!("Not logged in"),
        },
        Command::Logout => {
            session.handle_logout();
            println!("Logged out");
        }
        Command::Organizers => match client.list_organizers().await {
            Ok(organizers) => display::print_organizers(&organizers),
            Err(e) => eprintln!("{}", e.user_message()),
        },
        Command::Alerts => match client.list_alerts().await {
            Ok(alerts) => display::print_alerts(&alerts),
            Err(e) => eprintln!("{}", e.user_message()),
        },
        Command::SendAlert { text } => match client.send_alert(&text).await {
            Ok(()) => println!("Alert sent successfully!"),
            Err(e) => eprintln!("{}", e.user_message()),
        },
        Command::Buildings { tag } => {
            if !EXHIBIT_TAGS.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                eprintln!("Unknown tag. Known tags: {}", EXHIBIT_TAGS.join(", "));
            } else {
                match client.buildings_by_tag(&tag).await {
                    Ok(buildings) => display::print_buildings(&tag, &buildings),
                    Err(e) => eprintln!("{}", e.user_message()),
                }
            }
        }
    }

    info!("expodash shutting down");
    Ok(())
}

pub async fn register(client: &ApiClient) -> Result<()> {
    let organizer = NewOrganizer {
        fname: prompt_line("First name: ")?,
        lname: prompt_line("Last name: ")?,
        email: prompt_line("Email: ")?,
        contact_no: prompt_line("Contact no: ")?,
        password: prompt_password()?,
    };
    match client.register(&organizer).await {
        Ok(()) => println!("Registered. You can now log in."),
        Err(e) => eprintln!("{}", e.user_message()),
    }
    Ok(())
}
