mod config;
mod import;
mod libraries;
mod server;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gametaverns", about = "GameTaverns CLI - manage board-game libraries")]
struct Cli {
    /// Server base URL (overrides the config file)
    #[arg(long, env = "GAMETAVERNS_URL", global = true)]
    server: Option<String>,

    /// API key (overrides the config file)
    #[arg(long, env = "GAMETAVERNS_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is reachable
    Health,

    /// Show the account behind the configured API key
    Whoami,

    /// Create an account and print its API key
    Register {
        display_name: String,

        /// Write the new key to the config file
        #[arg(long)]
        save: bool,
    },

    /// Import a user's logged plays from BoardGameGeek into a library
    ImportPlays {
        /// Library slug
        library: String,

        /// BoardGameGeek username
        bgg_username: String,

        /// Overwrite plays that were imported before
        #[arg(long)]
        update_existing: bool,

        /// Print the raw import report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse libraries
    Libraries {
        #[command(subcommand)]
        action: LibrariesAction,
    },

    /// Show or set configuration
    Config {
        /// Persist the server URL
        #[arg(long = "set-server")]
        set_server: Option<String>,

        /// Persist the API key
        #[arg(long = "set-api-key")]
        set_api_key: Option<String>,
    },
}

#[derive(Subcommand)]
enum LibrariesAction {
    /// List public libraries, or your own with --mine
    List {
        #[arg(long)]
        mine: bool,

        #[arg(long)]
        json: bool,
    },
    /// Show a library's games and recent plays
    Show {
        slug: String,

        /// Number of recent plays to show
        #[arg(long, default_value_t = 10)]
        recent: u32,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config()?.with_overrides(cli.server, cli.api_key);
    match cli.command {
        Commands::Health => server::run_health(&cfg).await,
        Commands::Whoami => server::run_whoami(&cfg).await,
        Commands::Register { display_name, save } => {
            server::run_register(&cfg, &display_name, save).await
        }
        Commands::ImportPlays {
            library,
            bgg_username,
            update_existing,
            json,
        } => import::run_import(&cfg, &library, &bgg_username, update_existing, json).await,
        Commands::Libraries { action } => match action {
            LibrariesAction::List { mine, json } => libraries::run_list(&cfg, mine, json).await,
            LibrariesAction::Show { slug, recent } => {
                libraries::run_show(&cfg, &slug, recent).await
            }
        },
        Commands::Config {
            set_server: None,
            set_api_key: None,
        } => config::show_config(&config::load_config()?),
        Commands::Config {
            set_server,
            set_api_key,
        } => config::set_config(set_server, set_api_key),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
