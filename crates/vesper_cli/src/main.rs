use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vesper_content::{ContentPicker, SqliteContentStore};
use vesper_core::{
    ChannelResolver, ContentStore, InboundMessage, ItemOrigin, MoodStore, OutputChannel,
    ToneClassifier, VesperConfig, VesperError,
};
use vesper_expression::{spawn_rule, spawn_silence_monitor, Dispatcher, InboundRouter};
use vesper_mood::{FileMoodStore, MoodHandle, SilenceMonitor};
use vesper_reasoning::providers::create_client;
use vesper_reasoning::{
    CompletionParams, KeywordToneClassifier, LlmClient, LlmToneClassifier, Responder,
};

#[derive(Parser, Debug)]
#[command(name = "vesper", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "vesper.toml", env = "VESPER_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduled rules, the silence monitor and the chat loop (default)
    Run,
    /// Pick one message from a category and print it
    Pick { category: String },
    /// Add a hand-written message to a category
    Seed { category: String, text: String },
    /// Print the mood record, category counts and recent dispatches
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json);

    let config = VesperConfig::load_or_default(&args.config)?;
    config.validate()?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Pick { category } => pick(&config, &category).await,
        Command::Seed { category, text } => seed(&config, &category, &text).await,
        Command::Status => status(&config).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stderr keeps `pick` output clean for scripting
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn timeout_of(config: &VesperConfig) -> Duration {
    Duration::from_secs(config.llm.timeout_secs)
}

async fn open_store(config: &VesperConfig) -> Result<Arc<SqliteContentStore>> {
    info!("Opening content store at {}...", config.storage.db_path);
    Ok(Arc::new(SqliteContentStore::new(&config.storage.db_path).await?))
}

fn content_picker(
    config: &VesperConfig,
    store: Arc<SqliteContentStore>,
    llm: Arc<dyn LlmClient>,
) -> ContentPicker {
    ContentPicker::new(
        store,
        llm,
        CompletionParams {
            max_tokens: config.llm.content_max_tokens,
            temperature: config.llm.content_temperature,
        },
        timeout_of(config),
    )
}

fn tone_classifier(config: &VesperConfig, llm: Arc<dyn LlmClient>) -> Result<Arc<dyn ToneClassifier>> {
    match config.llm.classifier.as_str() {
        "llm" => Ok(Arc::new(LlmToneClassifier::new(llm, timeout_of(config)))),
        "keyword" => Ok(Arc::new(KeywordToneClassifier::new())),
        other => anyhow::bail!("Unknown classifier '{}' (expected \"llm\" or \"keyword\")", other),
    }
}

/// Channels a disabled build never resolves.
#[cfg(not(feature = "onebot"))]
struct NoChannel;

#[cfg(not(feature = "onebot"))]
impl ChannelResolver for NoChannel {
    fn resolve(&self) -> Option<Arc<dyn OutputChannel>> {
        None
    }
}

type Inbound = Option<mpsc::Receiver<InboundMessage>>;

#[cfg(feature = "onebot")]
fn connect_chat(config: &VesperConfig) -> Result<(Arc<dyn ChannelResolver>, Inbound)> {
    use vesper_onebot::{OneBotClient, OneBotResolver};
    match &config.onebot {
        Some(onebot) => {
            let (client, inbound) = OneBotClient::connect(onebot)?;
            if onebot.group_id.is_none() {
                warn!("onebot.group_id is not set; nothing will be posted or answered");
            }
            Ok((
                Arc::new(OneBotResolver::new(Some(client), onebot.group_id)),
                Some(inbound),
            ))
        }
        None => Ok((Arc::new(OneBotResolver::unresolved()), None)),
    }
}

#[cfg(not(feature = "onebot"))]
fn connect_chat(_config: &VesperConfig) -> Result<(Arc<dyn ChannelResolver>, Inbound)> {
    Ok((Arc::new(NoChannel), None))
}

// ============================================================================
// Commands
// ============================================================================

async fn run(config: VesperConfig) -> Result<()> {
    info!("Initializing Vesper...");
    let tz = config.schedule.tz()?;
    let timeout = timeout_of(&config);

    let store = open_store(&config).await?;
    info!("Loading mood from {}...", config.storage.mood_path);
    let mood = Arc::new(
        MoodHandle::open(Arc::new(FileMoodStore::new(&config.storage.mood_path))).await?,
    );

    info!("Using {} model {}", config.llm.provider, config.llm.model);
    let llm = create_client(&config.llm)?;
    let picker = Arc::new(content_picker(&config, store.clone(), llm.clone()));
    let responder = Arc::new(Responder::new(
        llm.clone(),
        tone_classifier(&config, llm.clone())?,
        mood.clone(),
        CompletionParams {
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        },
        timeout,
        tz,
    ));

    let (resolver, inbound) = connect_chat(&config)?;
    if resolver.resolve().is_none() {
        warn!("No output channel configured; scheduled posts will be skipped");
    }

    let dispatcher = Arc::new(Dispatcher::new(
        resolver.clone(),
        picker.clone(),
        store.clone(),
        mood.clone(),
        timeout,
    ));

    let tick = Duration::from_secs(config.schedule.tick_interval_secs);
    let mut tasks: Vec<JoinHandle<()>> = config
        .schedule
        .rules
        .iter()
        .map(|rule| spawn_rule(rule.clone(), tz, tick, dispatcher.clone()))
        .collect();
    tasks.push(spawn_silence_monitor(
        SilenceMonitor::new(),
        mood.clone(),
        dispatcher,
        Duration::from_secs(config.schedule.silence_check_secs),
    ));
    if let Some(inbound) = inbound {
        let router = Arc::new(InboundRouter::new(picker, responder, mood));
        tasks.push(spawn_inbound(inbound, router, resolver));
    }

    info!(rules = config.schedule.rules.len(), timezone = %tz, "Vesper online");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    for task in tasks {
        task.abort();
    }
    Ok(())
}

fn spawn_inbound(
    mut inbound: mpsc::Receiver<InboundMessage>,
    router: Arc<InboundRouter>,
    resolver: Arc<dyn ChannelResolver>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = inbound.recv().await {
            if message.body.trim().is_empty() {
                continue;
            }
            info!(author = %message.author, source = %message.source, "Inbound message");
            let router = router.clone();
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let reply = router.handle(&message.body).await;
                match resolver.resolve() {
                    Some(channel) => {
                        if let Err(e) = channel.send(&reply).await {
                            error!("Failed to send reply: {:#}", e);
                        }
                    }
                    None => warn!("{}, reply dropped", VesperError::ChannelUnresolved),
                }
            });
        }
        warn!("Inbound stream closed");
    })
}

async fn pick(config: &VesperConfig, category: &str) -> Result<()> {
    let store = open_store(config).await?;
    let llm = create_client(&config.llm)?;
    let picker = content_picker(config, store, llm);
    println!("{}", picker.pick(category).await);
    Ok(())
}

async fn seed(config: &VesperConfig, category: &str, text: &str) -> Result<()> {
    if category.trim().is_empty() || text.trim().is_empty() {
        anyhow::bail!("Category and text must both be non-empty");
    }
    let store = open_store(config).await?;
    store.append_item(category, text.trim(), ItemOrigin::Seed).await?;
    println!("Seeded 1 item into {}", category.trim());
    Ok(())
}

async fn status(config: &VesperConfig) -> Result<()> {
    let state = FileMoodStore::new(&config.storage.mood_path).load().await?;
    println!("{}", serde_json::to_string_pretty(&state)?);

    let store = open_store(config).await?;
    let stats = store.category_stats().await?;
    if stats.is_empty() {
        println!("No content yet.");
    }
    for s in stats {
        println!("{}: {} items, {} unused", s.category, s.items, s.unused);
    }
    for d in store.recent_dispatches(5).await? {
        println!(
            "{} {} [{}] {:?}",
            d.timestamp.format("%Y-%m-%d %H:%M UTC"),
            d.rule,
            d.mode,
            d.status
        );
    }
    Ok(())
}
