//! apiforge CLI
//!
//! Command-line interface for authorizing vendor APIs and calling them with
//! stored credentials.
//!
//! # Usage
//!
//! ```bash
//! # Print the URL that starts the OAuth flow
//! apiforge auth-uri sharepoint
//!
//! # Exchange the code from the redirect and store the credential
//! apiforge exchange sharepoint <code>
//!
//! # Call the API with a stored credential
//! apiforge get <id> /me
//!
//! # List stored credentials
//! apiforge credentials list --vendor sharepoint
//! ```

use anyhow::{Context, Result};
use apiforge_cli::{App, CliConfig, load_config};
use apiforge_core::{CredentialId, CredentialRecord};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "apiforge")]
#[command(about = "Authorize vendor APIs and call them with stored credentials")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL for a vendor
    AuthUri {
        /// Vendor ID (e.g., sharepoint, slack, attentive)
        vendor: String,

        /// CSRF state to embed (random if not configured)
        #[arg(short, long)]
        state: Option<String>,
    },

    /// Exchange an authorization code and store the credential
    Exchange {
        /// Vendor ID
        vendor: String,

        /// Code from the redirect
        code: String,
    },

    /// Refresh a stored OAuth credential
    Refresh {
        /// Credential ID
        id: String,
    },

    /// Store a Terminus API key
    AddKey {
        /// API key
        api_key: String,
    },

    /// GET a resource path with a stored credential
    Get {
        /// Credential ID
        id: String,

        /// Path relative to the vendor base URL (e.g., /me)
        #[arg(default_value = "")]
        path: String,

        /// Absolute URL of a next page returned by a previous call
        #[arg(long)]
        next_page_url: Option<String>,
    },

    /// Manage stored credentials
    Credentials {
        #[command(subcommand)]
        command: CredentialCommands,
    },
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// List stored credentials
    List {
        /// Filter by vendor ID
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Show a stored credential (secrets redacted)
    Show {
        /// Credential ID
        id: String,
    },

    /// Delete a stored credential
    Delete {
        /// Credential ID
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    let app = App::new(config)?;

    match cli.command {
        Commands::AuthUri { vendor, state } => {
            println!("{}", app.authorization_uri(&vendor, state)?);
        }
        Commands::Exchange { vendor, code } => {
            let id = app.exchange(&vendor, &code).await?;
            println!("Stored {} credential {}", vendor, id);
        }
        Commands::Refresh { id } => {
            let credential = app.refresh(&CredentialId::new(id.clone())).await?;
            match credential.expires_at() {
                Some(at) => println!("Refreshed {} (expires {})", id, at.to_rfc3339()),
                None => println!("Refreshed {}", id),
            }
        }
        Commands::AddKey { api_key } => {
            let id = app.add_key(&api_key).await?;
            println!("Stored terminus credential {}", id);
        }
        Commands::Get {
            id,
            path,
            next_page_url,
        } => {
            let value = app.get(&CredentialId::new(id), &path, next_page_url).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Credentials { command } => run_credentials(&app, command).await?,
    }

    Ok(())
}

fn init_logging(config: &CliConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_credentials(app: &App, command: CredentialCommands) -> Result<()> {
    match command {
        CredentialCommands::List { vendor } => {
            let records = app.list(vendor.as_deref()).await?;
            if records.is_empty() {
                println!("No credentials stored in {:?}", app.config().credentials_path());
                return Ok(());
            }
            for (id, record) in records {
                println!("{}  {:<10}  {}", id, record.vendor().as_str(), summary(&record));
            }
        }
        CredentialCommands::Show { id } => {
            let id = CredentialId::new(id);
            let record = app.show(&id).await?;
            print_record(&id, &record);
        }
        CredentialCommands::Delete { id, force } => {
            let id = CredentialId::new(id);
            if !force && !confirm(&format!("Delete credential {}?", id))? {
                println!("Aborted");
                return Ok(());
            }
            app.delete(&id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn summary(record: &CredentialRecord) -> String {
    match record.oauth() {
        Some(credential) => match credential.expires_at() {
            Some(at) if credential.is_expired() => format!("expired {}", at.to_rfc3339()),
            Some(at) => format!("expires {}", at.to_rfc3339()),
            None => "no expiry".to_string(),
        },
        None => "api key".to_string(),
    }
}

fn print_record(id: &CredentialId, record: &CredentialRecord) {
    println!("ID:         {}", id);
    println!("Vendor:     {}", record.vendor());
    println!("Type:       {}", record.discriminator());
    println!("Encrypted:  {}", record.encrypted_fields().join(", "));

    if let Some(credential) = record.oauth() {
        println!("Token type: {}", credential.token_type);
        println!("Access:     {}", credential.access_token);
        println!(
            "Refresh:    {}",
            if credential.refresh_token.is_some() { "yes" } else { "no" }
        );
        if let Some(scope) = &credential.scope {
            println!("Scope:      {}", scope);
        }
        println!("Obtained:   {}", credential.obtained_at.to_rfc3339());
        println!("Status:     {}", summary(record));
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
