use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use landable::api::{self, AppState};
use landable::auth::Credentials;
use landable::config::LandableConfig;
use landable::db::Database;
use landable::models::CreateAuthorInput;

#[derive(Parser)]
#[command(name = "landable")]
#[command(about = "Template publishing and revision history over a JSON API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Issue an access token, registering the author first if needed
    IssueToken {
        /// Author username
        username: String,

        /// Email used when the author does not exist yet
        #[arg(long)]
        email: Option<String>,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "landable=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &LandableConfig) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(config: LandableConfig, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting Landable server on {}:{}", host, port);

    let db = open_database(&config)?;
    let namespace = config.api_namespace.clone();
    let app = api::create_router(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    tracing::info!(
        "Landable API listening on http://{}:{}{}",
        host,
        port,
        namespace
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn issue_token(
    config: &LandableConfig,
    username: String,
    email: Option<String>,
    first_name: String,
    last_name: String,
) -> anyhow::Result<()> {
    let db = open_database(config)?;

    let author = match db.get_author_by_username(&username)? {
        Some(author) => author,
        None => {
            let email = email.context("--email is required to register a new author")?;
            let author = db.create_author(CreateAuthorInput {
                username,
                email,
                first_name,
                last_name,
            })?;
            tracing::info!(author = %author.username, "registered author");
            author
        }
    };

    let token = db.create_access_token(author.id, Utc::now() + config.token_ttl)?;
    tracing::info!(author = %author.username, expires_at = %token.expires_at, "issued access token");

    println!("token:      {}", token.id);
    println!("expires at: {}", token.expires_at.to_rfc3339());
    println!(
        "header:     Authorization: {}",
        Credentials::header_value(&author.username, &token.id.to_string())
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = LandableConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { port, host }) => serve(config, &host, port).await?,
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Database is up to date");
        }
        Some(Commands::IssueToken {
            username,
            email,
            first_name,
            last_name,
        }) => issue_token(&config, username, email, first_name, last_name)?,
        None => serve(config, "127.0.0.1", 3000).await?,
    }

    Ok(())
}
