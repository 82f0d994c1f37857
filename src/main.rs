//! Binary entry point for memory-lane.
//!
//! This binary provides the CLI interface over the memory collection.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use memory_lane::config::MemoryLaneConfig;
use memory_lane::embedding::{EmbeddingCache, GatewayEmbedder, LlmEmbedder};
use memory_lane::io::{backup_file_name, export_json, import_into};
use memory_lane::llm::{AnthropicClient, LlmHttpConfig};
use memory_lane::models::{SearchMode, parse_tag_list};
use memory_lane::observability::{self, InitOptions};
use memory_lane::retrieval::BrowseQuery;
use memory_lane::services::gift_question;
use memory_lane::storage::{ClientState, FileKeyValueStore};
use memory_lane::{
    Category, ChatMessage, ChatRole, ChatService, Embedder, GiftIdeaService, LlmProvider,
    MemoryId, MemoryRecord, MemoryStore, SearchSession,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Memory Lane - keep small notes about someone special and ask about them.
#[derive(Parser)]
#[command(name = "memory-lane")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MEMORY_LANE_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Save a memory.
    Add {
        /// The memory text.
        text: String,

        /// Category: gifts, travel, food, activities, favorites, memories, other.
        #[arg(short, long, default_value = "other")]
        category: String,

        /// Tags (comma-separated).
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Edit a memory.
    Edit {
        /// Memory ID.
        id: String,

        /// New text.
        #[arg(long)]
        text: Option<String>,

        /// New category.
        #[arg(short, long)]
        category: Option<String>,

        /// New tags (comma-separated), replacing the old ones.
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Delete a memory.
    Delete {
        /// Memory ID.
        id: String,
    },

    /// Browse memories, newest first.
    List {
        /// Search term.
        #[arg(short, long)]
        search: Option<String>,

        /// Only this category.
        #[arg(short, long)]
        category: Option<String>,

        /// Rank by meaning instead of matching words.
        #[arg(long)]
        semantic: bool,
    },

    /// Ask a question about the stored memories.
    Ask {
        /// The question.
        message: String,

        /// Retrieve memories semantically.
        #[arg(long)]
        semantic: bool,
    },

    /// Suggest gifts based on the stored memories.
    GiftIdeas {
        /// Occasion, e.g. "birthday".
        #[arg(short, long)]
        occasion: String,

        /// Budget, free text.
        #[arg(short, long)]
        budget: Option<String>,

        /// When the gift is needed.
        #[arg(short, long)]
        timeframe: Option<String>,
    },

    /// Show the current conversation.
    History,

    /// Start a fresh conversation.
    NewChat,

    /// Export all memories as JSON.
    Export {
        /// Output file (defaults to a dated backup name).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all memories with the contents of a JSON export.
    Import {
        /// File to import.
        file: PathBuf,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(
        &config.logging,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration, then applies environment overrides.
fn load_config(path: Option<&std::path::Path>) -> Result<MemoryLaneConfig> {
    let config = match path {
        Some(path) => MemoryLaneConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MemoryLaneConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}

/// Wired-up application state.
struct App {
    state: ClientState,
    store: MemoryStore,
    router: Arc<dyn LlmProvider>,
    generator: Arc<dyn LlmProvider>,
}

impl App {
    fn open(config: &MemoryLaneConfig) -> Result<Self> {
        let backend = FileKeyValueStore::open(&config.data_dir)?;
        let state = ClientState::new(Arc::new(backend));

        let default_router = AnthropicClient::DEFAULT_ROUTER_MODEL;
        let router: Arc<dyn LlmProvider> = Arc::new(anthropic_client(
            config,
            config.llm.router_model.as_deref().unwrap_or(default_router),
        ));
        let generator: Arc<dyn LlmProvider> = Arc::new(anthropic_client(
            config,
            config
                .llm
                .model
                .as_deref()
                .unwrap_or(AnthropicClient::DEFAULT_MODEL),
        ));

        let embedder: Arc<dyn Embedder> = match config.embedding.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => Arc::new(
                GatewayEmbedder::new(endpoint)
                    .with_http_config(LlmHttpConfig::from_config(&config.llm)),
            ),
            _ => Arc::new(LlmEmbedder::new(router.clone())),
        };
        tracing::debug!(embedder = embedder.name(), "Embedder selected");

        let cache = EmbeddingCache::new(embedder).with_batch_size(config.embedding.batch_size);
        let store = MemoryStore::with_cache(cache).with_records(state.load_memories()?);

        Ok(Self {
            state,
            store,
            router,
            generator,
        })
    }

    fn save(&self) -> Result<()> {
        self.state.save_memories(&self.store.snapshot())?;
        Ok(())
    }
}

fn anthropic_client(config: &MemoryLaneConfig, model: &str) -> AnthropicClient {
    let mut client = AnthropicClient::new()
        .with_model(model)
        .with_http_config(LlmHttpConfig::from_config(&config.llm));
    if let Some(key) = config.llm.api_key.clone() {
        client = client.with_secret_key(key);
    }
    if let Some(base_url) = config.llm.base_url.as_deref()
        && !base_url.trim().is_empty()
    {
        client = client.with_endpoint(base_url);
    }
    client
}

/// Runs the selected command.
fn run_command(command: Commands, config: &MemoryLaneConfig) -> Result<()> {
    let app = App::open(config)?;

    match command {
        Commands::Add {
            text,
            category,
            tags,
        } => cmd_add(&app, text, &category, tags.as_deref()),
        Commands::Edit {
            id,
            text,
            category,
            tags,
        } => cmd_edit(&app, &id, text, category.as_deref(), tags.as_deref()),
        Commands::Delete { id } => cmd_delete(&app, &id),
        Commands::List {
            search,
            category,
            semantic,
        } => cmd_list(&app, search, category.as_deref(), semantic),
        Commands::Ask { message, semantic } => {
            cmd_ask(&app, config, &message, semantic || config.retrieval.semantic)
        },
        Commands::GiftIdeas {
            occasion,
            budget,
            timeframe,
        } => cmd_gift_ideas(
            &app,
            config,
            &occasion,
            budget.as_deref(),
            timeframe.as_deref(),
        ),
        Commands::History => cmd_history(&app),
        Commands::NewChat => {
            app.state.clear_history()?;
            println!("Started a new conversation.");
            Ok(())
        },
        Commands::Export { output } => cmd_export(&app, output),
        Commands::Import { file } => cmd_import(&app, &file),
    }
}

fn parse_category(s: &str) -> Result<Category> {
    Category::parse(s).with_context(|| format!("unknown category: {s}"))
}

/// Add command.
fn cmd_add(app: &App, text: String, category: &str, tags: Option<&str>) -> Result<()> {
    if text.trim().is_empty() {
        bail!("memory text is required");
    }
    let record = MemoryRecord::new(
        parse_category(category)?,
        text.trim(),
        tags.map(parse_tag_list).unwrap_or_default(),
    );
    let id = app.store.add(record);

    // Best effort; semantic search computes it lazily otherwise.
    if let Err(e) = app.store.ensure_embeddings(std::slice::from_ref(&id)) {
        tracing::warn!(memory_id = %id, error = %e, "Could not embed new memory");
    }
    app.save()?;

    println!("Memory saved: {id}");
    Ok(())
}

/// Edit command.
fn cmd_edit(
    app: &App,
    id: &str,
    text: Option<String>,
    category: Option<&str>,
    tags: Option<&str>,
) -> Result<()> {
    let id = MemoryId::new(id);
    let current = app
        .store
        .get(&id)
        .with_context(|| format!("memory not found: {id}"))?;

    let category = category.map(parse_category).transpose()?.unwrap_or(current.category);
    let text = text.unwrap_or(current.text);
    if text.trim().is_empty() {
        bail!("memory text is required");
    }
    let tags = tags.map_or(current.tags, parse_tag_list);

    app.store.update(&id, category, text.trim(), tags)?;
    app.save()?;

    println!("Memory updated: {id}");
    Ok(())
}

/// Delete command.
fn cmd_delete(app: &App, id: &str) -> Result<()> {
    let id = MemoryId::new(id);
    if !app.store.delete(&id) {
        bail!("memory not found: {id}");
    }
    app.save()?;
    println!("Memory deleted: {id}");
    Ok(())
}

/// List command.
fn cmd_list(app: &App, search: Option<String>, category: Option<&str>, semantic: bool) -> Result<()> {
    let query = BrowseQuery::new(search.unwrap_or_default())
        .with_category(category.map(parse_category).transpose()?);

    let session = SearchSession::new(app.store.clone());
    let results = session.search(&query, SearchMode::from_semantic_flag(semantic));
    if let Some(advisory) = session.advisory() {
        eprintln!("{advisory}");
    }
    if semantic {
        // Keep vectors computed for this search.
        app.save()?;
    }

    if results.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    for memory in &results {
        println!("[{}] {} ({})", memory.category, memory.id, memory.created_at);
        println!("  {}", memory.text);
        if !memory.tags.is_empty() {
            println!("  #{}", memory.tags.join(" #"));
        }
    }
    Ok(())
}

/// Ask command.
fn cmd_ask(app: &App, config: &MemoryLaneConfig, message: &str, semantic: bool) -> Result<()> {
    if message.trim().is_empty() {
        bail!("message is required");
    }

    let mut history = app.state.load_history()?;
    let prior = history.clone();
    history.push(ChatMessage::user(message.trim()));
    app.state.save_history(&history)?;

    let chat = ChatService::new(
        app.router.clone(),
        app.generator.clone(),
        app.store.clone(),
        &config.retrieval,
    )
    .with_classification_timeout(Duration::from_millis(
        config.routing.classification_timeout_ms,
    ));

    let turn = chat.ask(message.trim(), &prior, semantic)?;
    for advisory in &turn.advisories {
        eprintln!("note: {advisory}");
    }
    tracing::info!(
        intent = %turn.intent,
        mode = ?turn.mode,
        retrieved = turn.retrieved,
        "Question answered"
    );

    println!("{}", turn.reply.content);
    history.push(turn.reply);
    app.state.save_history(&history)?;
    if semantic {
        app.save()?;
    }
    Ok(())
}

/// Gift ideas command.
fn cmd_gift_ideas(
    app: &App,
    config: &MemoryLaneConfig,
    occasion: &str,
    budget: Option<&str>,
    timeframe: Option<&str>,
) -> Result<()> {
    if occasion.trim().is_empty() {
        bail!("occasion is required");
    }
    let service = GiftIdeaService::new(app.generator.clone(), app.store.clone())
        .with_candidate_limit(config.gifts.candidate_limit);
    let ideas = service.generate(&gift_question(occasion, budget, timeframe))?;

    if ideas.ideas.is_empty() {
        println!("No gift ideas were suggested.");
    }
    for (i, idea) in ideas.ideas.iter().enumerate() {
        println!("{}. {}", i + 1, idea.title);
        if !idea.why.is_empty() {
            println!("   {}", idea.why);
        }
        let effort = idea.effort.map(|e| e.as_str()).unwrap_or_default();
        if !idea.price_range.is_empty() || !effort.is_empty() {
            println!("   price: {}  effort: {}", idea.price_range, effort);
        }
    }
    if !ideas.follow_ups.is_empty() {
        println!();
        println!("To sharpen these:");
        for question in &ideas.follow_ups {
            println!("  - {question}");
        }
    }
    Ok(())
}

/// History command.
fn cmd_history(app: &App) -> Result<()> {
    let history = app.state.load_history()?;
    if history.is_empty() {
        println!("No conversation yet.");
    }
    for message in &history {
        let speaker = match message.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "memory lane",
            ChatRole::System => "system",
        };
        println!("{speaker}: {}", message.content);
    }
    Ok(())
}

/// Export command.
fn cmd_export(app: &App, output: Option<PathBuf>) -> Result<()> {
    let path =
        output.unwrap_or_else(|| PathBuf::from(backup_file_name(chrono::Utc::now().date_naive())));
    let json = export_json(&app.store.snapshot())?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("Exported {} memories to {}", app.store.len(), path.display());
    Ok(())
}

/// Import command.
fn cmd_import(app: &App, file: &std::path::Path) -> Result<()> {
    let payload =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let count = import_into(&app.store, &payload)?;
    app.save()?;
    println!("Imported {count} memories.");
    Ok(())
}
