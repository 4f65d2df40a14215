//! Chat transcript capture CLI
//!
//! Works on saved provider pages: extract a conversation, merge it into the
//! local history store, push it to the backend, or preview a prompt fill
//! from inline content or the prompt library.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use convo_capture::{
    builtin_registry, extract_conversation, extract_page, fill_for_descriptor, render_template,
    template_variables_from, Conversation, DescriptorStore, FileStore, HistoryApiClient, HistoryBackend,
    KeyValueStore, LibraryItemKind, Page, ProviderRegistry, StrategyRegistry, SyncConfig, SyncOutcome, SyncService,
    TemplateVariable,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "capture")]
#[command(about = "Capture AI chat transcripts from provider pages")]
#[command(version)]
struct Cli {
    /// Use the built-in provider descriptors without contacting the backend
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PageArgs {
    /// Saved HTML of the provider page
    #[arg(long)]
    html: PathBuf,

    /// URL the page was loaded from
    #[arg(long)]
    url: String,

    /// Provider id to use instead of matching the URL
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the conversation and print it as JSON
    Extract {
        #[command(flatten)]
        page: PageArgs,

        /// Wait before extracting; defaults to CAPTURE_AUTO_EXTRACT_DELAY_SECS
        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,
    },

    /// Extract and merge into the local store; push when auto sync is on
    Capture {
        #[command(flatten)]
        page: PageArgs,

        /// Overrides CAPTURE_AUTO_EXTRACT_DELAY_SECS
        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,
    },

    /// Extract, merge into the local store and push to the backend
    Sync {
        #[command(flatten)]
        page: PageArgs,

        #[arg(long, value_name = "SECS")]
        delay: Option<u64>,
    },

    /// Push every stored conversation to the backend
    SyncAll,

    /// List provider descriptors
    Providers {
        /// Fetch from the backend even if the cached version matches
        #[arg(long)]
        refresh: bool,
    },

    /// List saved prompts and templates, newest first
    Library {
        /// Items fetched per collection
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Render a prompt template and write it into the page's input
    Fill {
        #[command(flatten)]
        page: PageArgs,

        /// Template content; `{{ name }}` placeholders are replaced
        #[arg(long, conflicts_with = "item", required_unless_present = "item")]
        content: Option<String>,

        /// Prompt library item whose latest version is the template
        #[arg(long, value_name = "ID")]
        item: Option<String>,

        /// Library collection of `--item`
        #[arg(long = "type", value_enum, default_value_t = ItemType::Prompt, requires = "item")]
        item_type: ItemType,

        /// Template value (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Default used when a variable has no value (repeatable)
        #[arg(long = "default", value_name = "NAME=VALUE", value_parser = parse_key_val)]
        defaults: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ItemType {
    Prompt,
    Template,
}

impl From<ItemType> for LibraryItemKind {
    fn from(value: ItemType) -> Self {
        match value {
            ItemType::Prompt => LibraryItemKind::Prompt,
            ItemType::Template => LibraryItemKind::Template,
        }
    }
}

type HttpBackend = Arc<HistoryApiClient>;
type LocalStore = Arc<FileStore>;

struct App {
    config: Config,
    store: LocalStore,
    backend: HttpBackend,
    offline: bool,
}

impl App {
    fn new(config: Config, offline: bool) -> Result<Self> {
        let backend = HistoryApiClient::new(config.sync.api_url.clone())
            .with_context(|| format!("Invalid API URL {}", config.sync.api_url))?;
        Ok(Self {
            store: Arc::new(FileStore::new(config.store_path.clone())),
            backend: Arc::new(backend),
            config,
            offline,
        })
    }

    fn descriptor_store(&self) -> DescriptorStore<LocalStore, HttpBackend> {
        DescriptorStore::new(self.store.clone(), self.backend.clone(), StrategyRegistry::with_builtins())
            .with_refresh_interval(self.config.sync.provider_refresh())
    }

    fn sync_service(&self) -> SyncService<LocalStore, HttpBackend> {
        SyncService::new(self.store.clone(), self.backend.clone(), self.config.sync.clone())
    }

    async fn registry(&self) -> ProviderRegistry {
        if self.offline {
            return builtin_registry(&StrategyRegistry::with_builtins());
        }
        let resolved = self.descriptor_store().descriptors().await;
        info!(
            source = %resolved.source,
            version = ?resolved.version,
            providers = resolved.registry.len(),
            "Loaded provider descriptors"
        );
        resolved.registry
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    // JSON output goes to stdout; logs stay on stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,convo_capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env()?;
    let app = App::new(config, cli.offline)?;

    match cli.command {
        Commands::Extract { page, delay } => {
            wait(effective_delay(delay, &app.config.sync)).await;
            let registry = app.registry().await;
            let loaded = load_page(&page).await?;
            let conversation = extract(&registry, &loaded, page.provider.as_deref())?;
            print_json(&serde_json::to_value(&conversation)?)?;
        }
        Commands::Capture { page, delay } => {
            wait(effective_delay(delay, &app.config.sync)).await;
            let registry = app.registry().await;
            let loaded = load_page(&page).await?;
            let sync = app.sync_service();
            let (conversation, outcome) = capture_page(&sync, &registry, &loaded, page.provider.as_deref()).await?;
            print_json(&outcome_json(&conversation, &outcome))?;
            if sync.config().auto_sync && !outcome.synced {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Sync { page, delay } => {
            wait(effective_delay(delay, &app.config.sync)).await;
            let registry = app.registry().await;
            let loaded = load_page(&page).await?;
            let conversation = extract(&registry, &loaded, page.provider.as_deref())?;
            let outcome = app.sync_service().save_and_sync(&conversation).await?;
            print_json(&outcome_json(&conversation, &outcome))?;
            if !outcome.synced {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::SyncAll => {
            let report = app.sync_service().sync_all().await?;
            print_json(&json!({ "pushed": report.pushed, "failed": report.failed }))?;
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Providers { refresh } => {
            let resolved = if app.offline {
                None
            } else if refresh {
                Some(app.descriptor_store().refresh(true).await)
            } else {
                Some(app.descriptor_store().descriptors().await)
            };
            let (registry, version, source) = match resolved {
                Some(r) => (r.registry, r.version, r.source.to_string()),
                None => (
                    builtin_registry(&StrategyRegistry::with_builtins()),
                    Some(convo_capture::providers::BUILTIN_VERSION.to_string()),
                    "builtin".to_string(),
                ),
            };
            let providers: Vec<_> = registry
                .iter()
                .map(|d| json!({ "id": d.id, "urlPatterns": d.url_patterns }))
                .collect();
            print_json(&json!({ "version": version, "source": source, "providers": providers }))?;
        }
        Commands::Library { limit } => {
            if app.offline {
                return Err(anyhow!("The prompt library needs the backend; drop --offline"));
            }
            let items = app.backend.list_library(limit).await?;
            info!(count = items.len(), "Loaded prompt library");
            print_json(&serde_json::to_value(&items)?)?;
        }
        Commands::Fill {
            page,
            content,
            item,
            item_type,
            vars,
            defaults,
        } => {
            let (content, base_variables) = match item {
                Some(id) => {
                    if app.offline {
                        return Err(anyhow!("--item needs the backend; drop --offline"));
                    }
                    let detail = app.backend.get_item_detail(&id, item_type.into()).await?;
                    info!(id = %id, title = detail.item.display_name(), "Loaded library item");
                    (detail.content, template_variables_from(&detail.variables))
                }
                None => (content.unwrap_or_default(), Vec::new()),
            };

            let registry = app.registry().await;
            let mut loaded = load_page(&page).await?;
            let descriptor = match page.provider.as_deref() {
                Some(id) => registry.get(id).ok_or_else(|| anyhow!("Unknown provider {id}"))?,
                None => registry
                    .resolve(loaded.url())
                    .ok_or_else(|| anyhow!("No provider matches {}", loaded.url()))?,
            };

            let (variables, values) = template_inputs(base_variables, vars, defaults);
            let rendered = render_template(&content, &variables, &values);
            let handle = fill_for_descriptor(&mut loaded, &descriptor, &rendered)?;
            let value = loaded
                .element_at(handle.ordinal)
                .map(|element| loaded.value_of(&element))
                .unwrap_or_default();

            print_json(&json!({
                "provider": descriptor.id,
                "selector": handle.selector,
                "kind": handle.kind,
                "value": value,
                "events": loaded.input_events(),
            }))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// An explicit `--delay` wins over the configured auto extraction delay.
fn effective_delay(delay: Option<u64>, config: &SyncConfig) -> Duration {
    delay.map(Duration::from_secs).unwrap_or_else(|| config.auto_extract_delay())
}

async fn wait(delay: Duration) {
    if !delay.is_zero() {
        info!(secs = delay.as_secs(), "Waiting before extraction");
        tokio::time::sleep(delay).await;
    }
}

async fn load_page(args: &PageArgs) -> Result<Page> {
    let html = tokio::fs::read_to_string(&args.html)
        .await
        .with_context(|| format!("Failed to read {}", args.html.display()))?;
    Ok(Page::parse(args.url.clone(), &html))
}

fn extract(registry: &ProviderRegistry, page: &Page, provider: Option<&str>) -> Result<Conversation> {
    match provider {
        Some(id) => {
            let descriptor = registry.get(id).ok_or_else(|| anyhow!("Unknown provider {id}"))?;
            Ok(extract_conversation(&descriptor, page)?)
        }
        None => Ok(extract_page(registry, page)?),
    }
}

/// Extract, then save through the service's auto sync setting.
async fn capture_page<S: KeyValueStore, B: HistoryBackend>(
    sync: &SyncService<S, B>,
    registry: &ProviderRegistry,
    page: &Page,
    provider: Option<&str>,
) -> Result<(Conversation, SyncOutcome)> {
    let conversation = extract(registry, page, provider)?;
    let outcome = sync.capture(&conversation).await?;
    Ok((conversation, outcome))
}

fn outcome_json(conversation: &Conversation, outcome: &SyncOutcome) -> serde_json::Value {
    json!({
        "provider": conversation.provider,
        "conversationId": conversation.conversation_id,
        "saved": outcome.saved,
        "synced": outcome.synced,
        "messageCount": outcome.message_count,
    })
}

/// Declared variables (first-seen order) and their values.
///
/// `--default` overrides a library default; `--var` names not declared
/// anywhere are added.
fn template_inputs(
    base: Vec<TemplateVariable>,
    vars: Vec<(String, String)>,
    defaults: Vec<(String, String)>,
) -> (Vec<TemplateVariable>, HashMap<String, String>) {
    let mut variables = base;
    for (name, default) in &defaults {
        match variables.iter_mut().find(|v| &v.name == name) {
            Some(existing) => existing.default = Some(default.clone()),
            None => variables.push(TemplateVariable::new(name.clone()).with_default(default.clone())),
        }
    }
    for (name, _) in &vars {
        if !variables.iter().any(|v| &v.name == name) {
            variables.push(TemplateVariable::new(name.clone()));
        }
    }
    (variables, vars.into_iter().collect())
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in `{s}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
