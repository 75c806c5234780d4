//! edugrades CLI - login to Edupage, print grades, or serve them as JSON.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use edugrades::api::{EdupageClient, PortalClient, ResolveError};
use edugrades::auth::{
    default_sealer, CredentialBundle, SealedStore, SessionResolver, SessionStore,
};
use edugrades::config::{self, Config};
use edugrades::{output, server};

#[derive(Parser)]
#[command(name = "edugrades", about = "Fetch Edupage grades without re-entering credentials on every run")]
struct Cli {
    /// Override the sealed credential file path
    #[arg(long, global = true, value_name = "FILE")]
    creds_file: Option<PathBuf>,

    /// Override the session file path
    #[arg(long, global = true, value_name = "FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive login; optionally persist the session and credentials
    Login {
        /// Do not save session cookies to disk
        #[arg(long)]
        no_save: bool,

        /// Overwrite any existing saved session without asking
        #[arg(long)]
        refresh_session: bool,

        /// Also seal the credentials to disk for future logins
        #[arg(long)]
        save_creds: bool,
    },

    /// Print grades grouped by subject
    Grades,

    /// Serve grades over HTTP as JSON
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,
    },

    /// Remove the saved session and sealed credentials
    Clear,
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to override (e.g. RUST_LOG=debug).
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edugrades=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::new(cli.creds_file, cli.session_file);

    match cli.command {
        Command::Login {
            no_save,
            refresh_session,
            save_creds,
        } => cmd_login(&cfg, no_save, refresh_session, save_creds).await,
        Command::Grades => cmd_grades(&cfg).await,
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
            server::serve(addr, cfg).await
        }
        Command::Clear => cmd_clear(&cfg),
    }
}

fn prompt_with_default(prompt: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", prompt, d),
        None => print!("{}: ", prompt),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(default.unwrap_or("").to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [Y/n]: ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "" | "y" | "yes"))
}

async fn cmd_login(
    cfg: &Config,
    no_save: bool,
    refresh_session: bool,
    save_creds: bool,
) -> Result<()> {
    println!("Edupage login");
    println!("Credentials are sent to Edupage for authentication; only the resulting");
    println!("session tokens are written to disk unless --save-creds is given.");
    println!();

    // Env values become prompt defaults so Enter reuses them
    let default_user = std::env::var(config::ENV_USER).ok();
    let default_sub = std::env::var(config::ENV_SUBDOMAIN).ok();

    let user = prompt_with_default("Edupage username (or e-mail)", default_user.as_deref())?;
    let pass = rpassword::prompt_password("Password: ")?;
    let subdomain = prompt_with_default(
        "Edupage subdomain (the part before .edupage.org)",
        default_sub.as_deref(),
    )?;

    let bundle = CredentialBundle { user, pass, subdomain };
    if !bundle.is_complete() {
        bail!("Username, password and subdomain are all required to login");
    }

    let client = EdupageClient::new();
    let handle = match client.login(&bundle).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Login failed: {}", e);
            return Err(e.into());
        }
    };
    println!("Logged in successfully.");

    if no_save {
        println!("Skipping session save because --no-save was provided.");
    } else {
        let sessions = SessionStore::new(cfg.session_path.clone());
        let overwrite = if sessions.path().exists() && !refresh_session {
            confirm("A saved session exists. Refresh/overwrite it now?")?
        } else {
            true
        };

        if !overwrite {
            println!("Keeping existing session on disk. Use --refresh-session to overwrite it.");
        } else if sessions.save(&handle) {
            println!("Session saved to {}", sessions.path().display());
        } else {
            println!("Could not save session (no cookies to persist).");
        }
    }

    if save_creds {
        let creds = SealedStore::new(cfg.creds_path.clone(), default_sealer());
        if creds.save(&bundle) {
            println!(
                "Credentials sealed to {} (readable only by this OS account).",
                creds.path().display()
            );
        } else {
            println!("Could not seal credentials; they were not saved.");
        }
    }

    println!();
    println!("Session files contain short-lived tokens; keep them private and out of version control.");
    Ok(())
}

async fn cmd_grades(cfg: &Config) -> Result<()> {
    let client = EdupageClient::new();
    let sessions = SessionStore::new(cfg.session_path.clone());
    let creds = SealedStore::new(cfg.creds_path.clone(), default_sealer());
    let resolver = SessionResolver::new(&client, &sessions, &creds);

    let handle = match resolver.resolve().await {
        Ok(handle) => handle,
        Err(ResolveError::IncompleteCredentials) => bail!("{}", no_session_help()),
        Err(ResolveError::Login(e)) => bail!(
            "Login failed: {}\nRun `edugrades login` to refresh the session or verify credentials.",
            e
        ),
    };

    let grades = client
        .fetch_grades(&handle)
        .await
        .context("Failed to fetch grades using the resolved session")?;
    output::print_grades(&grades);
    Ok(())
}

/// Guidance shown when neither a saved session nor credentials exist.
fn no_session_help() -> String {
    format!(
        "No saved session and no credentials found.\n\
         Set {}, {} and {} environment variables,\n\
         or run `edugrades login` to create a session first.",
        config::ENV_USER,
        config::ENV_PASS,
        config::ENV_SUBDOMAIN
    )
}

fn cmd_clear(cfg: &Config) -> Result<()> {
    SessionStore::new(cfg.session_path.clone()).clear();
    SealedStore::new(cfg.creds_path.clone(), default_sealer()).clear();
    println!(
        "Removed {} and {} (if they existed).",
        cfg.session_path.display(),
        cfg.creds_path.display()
    );
    Ok(())
}
