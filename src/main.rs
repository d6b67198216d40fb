mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cli::settings::SettingsChange;
use timewarp::config::TimewarpConfig;
use timewarp::era::Era;
use timewarp::provider::Provider;

#[derive(Parser)]
#[command(
    name = "timewarp",
    version,
    about = "Location- and era-aware story relay"
)]
struct Cli {
    /// Config file (defaults to ~/.timewarp/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP relay (edge info + story streaming)
    Serve,
    /// Stream a story about a place in a historical era
    Story {
        /// Place name; resolved from the edge/device chain when omitted
        location: Option<String>,
        /// Era id or display name (e.g. `ancient`, `帝国时代`)
        #[arg(long, short, default_value = "imperial")]
        era: Era,
        /// Save the finished story as a time capsule
        #[arg(long)]
        save: bool,
    },
    /// Ask a question about a place and era
    Ask {
        question: String,
        #[arg(long, short)]
        location: Option<String>,
        #[arg(long, short, default_value = "imperial")]
        era: Era,
    },
    /// Resolve the current location
    Locate {
        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage saved time capsules
    Capsules {
        #[command(subcommand)]
        action: CapsuleAction,
    },
    /// Show or change generation settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// List the historical eras
    Eras,
    /// List the selectable models per provider
    Models,
}

#[derive(Subcommand)]
enum CapsuleAction {
    /// List capsules, newest first
    List,
    /// Print one capsule
    Show { id: String },
    /// Delete a capsule
    Remove { id: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    SetProvider {
        provider: Provider,
    },
    /// Store an API key; omit KEY to clear it
    SetKey {
        provider: Provider,
        key: Option<String>,
    },
    /// Select a model; omit MODEL to use the provider default
    SetModel {
        model: Option<String>,
    },
    /// 0.0 - 1.0, clamped
    SetTemperature {
        value: f32,
    },
    /// 500 - 4000, clamped
    SetMaxTokens {
        value: u32,
    },
    SetStream {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TimewarpConfig::load_from(path)?,
        None => TimewarpConfig::load()?,
    };

    // Log to stderr so story text on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => timewarp::server::serve(config).await?,
        Command::Story {
            location,
            era,
            save,
        } => cli::story::story(&config, location, era, save).await?,
        Command::Ask {
            question,
            location,
            era,
        } => cli::story::ask(&config, location, era, &question).await?,
        Command::Locate { json } => cli::locate::locate(&config, json).await?,
        Command::Capsules { action } => match action {
            CapsuleAction::List => cli::capsules::list(&config).await?,
            CapsuleAction::Show { id } => cli::capsules::show(&config, id).await?,
            CapsuleAction::Remove { id } => cli::capsules::remove(&config, id).await?,
        },
        Command::Settings { action } => {
            let change = match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => None,
                SettingsAction::SetProvider { provider } => Some(SettingsChange::Provider(provider)),
                SettingsAction::SetKey { provider, key } => Some(SettingsChange::Key(provider, key)),
                SettingsAction::SetModel { model } => Some(SettingsChange::Model(model)),
                SettingsAction::SetTemperature { value } => Some(SettingsChange::Temperature(value)),
                SettingsAction::SetMaxTokens { value } => Some(SettingsChange::MaxTokens(value)),
                SettingsAction::SetStream { enabled } => Some(SettingsChange::Stream(enabled)),
            };
            match change {
                Some(change) => cli::settings::update(&config, change)?,
                None => cli::settings::show(&config)?,
            }
        }
        Command::Eras => cli::catalog::eras(),
        Command::Models => cli::catalog::models(),
    }

    Ok(())
}
