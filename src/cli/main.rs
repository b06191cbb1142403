use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use event_assistant::config::Config;
use event_assistant::models::Event;
use event_assistant::search::{EventSearchStore, InitOutcome, TermPolicy};
use serde_json::json;

#[derive(Parser)]
#[command(name = "event-assistant-cli")]
#[command(about = "Query conference events in the document store", long_about = None)]
struct Cli {
    /// Database server URL (overrides configuration)
    #[arg(short, long, env = "EVENT_ASSISTANT_URL")]
    url: Option<String>,

    /// Database name (overrides configuration)
    #[arg(short, long)]
    database: Option<String>,

    /// Pass search terms to the query parser unescaped
    #[arg(long)]
    raw_terms: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the search index definitions if missing
    Init,

    /// Events by topic (name, description, track, tags)
    Topic {
        term: String,

        #[arg(short, long, default_value = "10")]
        max: i64,
    },

    /// Events by speaker
    Speaker {
        term: String,

        #[arg(short, long, default_value = "10")]
        max: i64,
    },

    /// Suggested events
    Suggested {
        #[arg(short, long, default_value = "10")]
        max: i64,
    },

    /// Music events by topic or artist
    MusicTopic {
        term: String,

        #[arg(short, long, default_value = "10")]
        max: i64,
    },

    /// Music events by artist
    MusicArtist {
        term: String,

        #[arg(short, long, default_value = "10")]
        max: i64,
    },

    /// Fetch events by id
    Get {
        #[arg(value_name = "EVENT_ID", required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(url) = cli.url {
        config.store.url = url;
    }
    if let Some(database) = cli.database {
        config.store.database = database;
    }
    if cli.raw_terms {
        config.store.term_policy = TermPolicy::Raw;
    }

    let store = EventSearchStore::from_config(&config.store)
        .await
        .context("failed to configure event store")?;

    let events = match cli.command {
        Commands::Init => {
            let status = match store.initialize().await {
                InitOutcome::Created => "created",
                InitOutcome::AlreadyExists => "already_exists",
                InitOutcome::Failed(e) => bail!("index provisioning failed: {}", e),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "design_document": store.design_id(),
                    "status": status,
                }))?
            );
            return Ok(());
        }
        Commands::Topic { term, max } => store.find_events_by_topic(&term, max).await?,
        Commands::Speaker { term, max } => store.find_events_by_speaker(&term, max).await?,
        Commands::Suggested { max } => store.find_suggested_events(max).await?,
        Commands::MusicTopic { term, max } => store.find_music_events_by_topic(&term, max).await?,
        Commands::MusicArtist { term, max } => store.find_music_events_by_artist(&term, max).await?,
        Commands::Get { ids } => store.get_events_for_ids(&ids).await?,
    };

    print_events(&events)
}

fn print_events(events: &[Event]) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "count": events.len(),
            "events": events,
        }))?
    );
    Ok(())
}
