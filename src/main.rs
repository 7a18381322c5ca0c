//! eArcheo cache CLI
//!
//! Entry point for the `earcheo-cache` command-line tool.

use clap::{Parser, Subcommand};
use earcheo_cache::config::{self, EffectiveConfig, Settings, PROJECT_CONFIG_PATH};
use earcheo_cache::explain::{describe_matcher, ExplainOutput};
use earcheo_cache::logging::init_logging;
use earcheo_cache::router::{CacheRouter, Event, FetchOutcome, MessageOutcome, Outcome, WorkerState};
use earcheo_cache::{CacheStorage, Classifier, ControlMessage, DiskStorage, ReqwestFetcher, Request};
use serde::Serialize;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "earcheo-cache")]
#[command(about = "Tile and asset cache router for the eArcheo map client", version)]
struct Cli {
    /// Cache directory (default: cache.dir from config, else the platform cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Path to project config file (default: .earcheo/cache.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain how a request URL would be routed
    Explain {
        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,

        /// Page origin to judge the request against
        #[arg(long)]
        origin: Option<String>,

        /// Absolute request URL
        url: String,
    },

    /// Verify the configuration
    Verify,

    /// Print the effective configuration with provenance
    Config,

    /// Route one request through the cache
    Fetch {
        /// Absolute request URL
        url: String,

        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Warm the asset cache with the warm-up list
    Install {
        #[arg(long)]
        json: bool,
    },

    /// Delete stale cache generations
    Activate {
        #[arg(long)]
        json: bool,
    },

    /// Delete every cache store
    Clear {
        #[arg(long)]
        json: bool,
    },

    /// List cache stores
    Stores {
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context {
        cache_dir: cli.cache_dir,
        config: cli.config,
    };

    match cli.command {
        Commands::Explain { human, origin, url } => run_explain(&ctx, human, origin, &url),
        Commands::Verify => run_verify(&ctx),
        Commands::Config => run_config(&ctx),
        Commands::Fetch { url, method, json } => run_fetch(&ctx, &url, &method, json),
        Commands::Install { json } => {
            run_event(&ctx, WorkerState::Parsed, Event::Install, json);
        }
        Commands::Activate { json } => {
            run_event(&ctx, WorkerState::Installed, Event::Activate, json);
        }
        Commands::Clear { json } => {
            run_event(&ctx, WorkerState::Active, Event::Message(ControlMessage::ClearCache), json);
        }
        Commands::Stores { json } => run_stores(&ctx, json),
    }
}

/// Global options shared by every subcommand
struct Context {
    cache_dir: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl Context {
    fn effective_config(&self, overrides: Option<serde_json::Value>) -> Result<EffectiveConfig, String> {
        let host = config::default_host_config_path();
        let project = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_PATH));

        if let Some(ref explicit) = self.config {
            if !explicit.exists() {
                return Err(format!("config file not found: {}", explicit.display()));
            }
        }

        EffectiveConfig::build(host.as_deref(), Some(&project), overrides).map_err(|e| e.to_string())
    }

    fn settings(&self) -> Settings {
        let result = self.effective_config(None).and_then(|c| c.settings().map_err(|e| e.to_string()));
        match result {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                process::exit(1);
            }
        }
    }

    fn cache_dir(&self, settings: &Settings) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| settings.cache_dir.clone())
            .unwrap_or_else(config::default_cache_dir)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn router_at(ctx: &Context, state: WorkerState) -> CacheRouter<DiskStorage, ReqwestFetcher> {
    let settings = ctx.settings();
    let storage = DiskStorage::new(ctx.cache_dir(&settings));

    let fetcher = match ReqwestFetcher::new(&settings.network) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error creating HTTP client: {}", e);
            process::exit(1);
        }
    };

    match CacheRouter::with_state(settings.router, storage, fetcher, state) {
        Ok(router) => router,
        Err(e) => {
            eprintln!("Error creating router: {}", e);
            process::exit(1);
        }
    }
}

fn run_explain(ctx: &Context, human: bool, origin: Option<String>, url: &str) {
    let overrides = origin.map(|o| serde_json::json!({ "origin": o }));
    let settings = match ctx
        .effective_config(overrides)
        .and_then(|c| c.settings().map_err(|e| e.to_string()))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    let page_origin = match settings.router.page_origin() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    let classifier = Classifier::new(page_origin, settings.router.routes.clone());
    let explanation = ExplainOutput::from_classification(url, &classifier.classify(url), &settings.router);

    if human {
        println!("{}", explanation.to_human());
    } else {
        print_json(&explanation);
    }
}

fn run_verify(ctx: &Context) {
    let effective = match ctx.effective_config(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };
    let settings = match effective.settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    println!("Configuration valid");
    for source in &effective.sources {
        match source.path {
            Some(ref path) => println!("  Source: {:?} ({})", source.origin, path),
            None => println!("  Source: {:?}", source.origin),
        }
    }
    println!();

    let router = &settings.router;
    println!("  Origin: {}", router.origin.origin().ascii_serialization());
    println!("  Asset cache: {}", router.asset_version_tag);
    println!("  Tile cache: {}", router.tile_version_tag);
    println!("  Warm-up: {}", router.warmup.join(", "));
    println!("  Allowed hosts: {}", router.routes.allowed_hosts.join(", "));
    println!("  Rules:");
    for rule in &router.routes.rules {
        println!("    {} -> {}", describe_matcher(&rule.matcher), rule.policy);
    }
    println!("    otherwise -> {}", router.routes.fallback);
    println!("  Cache dir: {}", ctx.cache_dir(&settings).display());
    println!("  Network timeout: {}s", settings.network.timeout.as_secs());
}

fn run_config(ctx: &Context) {
    match ctx.effective_config(None) {
        Ok(c) => print_json(&c),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn run_fetch(ctx: &Context, url: &str, method: &str, json: bool) {
    let router = router_at(ctx, WorkerState::Active);
    let request = Request::new(method, url);

    let outcome = match runtime().block_on(router.on_fetch(&request)) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Fetch failed: {}", e);
            process::exit(1);
        }
    };

    if json {
        print_json(&outcome);
    } else {
        match &outcome {
            FetchOutcome::Passthrough { classification } => {
                println!(
                    "passthrough ({}, {})",
                    classification.policy,
                    classification.reason.to_code()
                );
            }
            FetchOutcome::Respond {
                response,
                source,
                policy,
            } => {
                println!(
                    "{} {} from {} ({}, {} bytes)",
                    response.status,
                    response.status_text,
                    source,
                    policy,
                    response.body.len()
                );
            }
            FetchOutcome::Unavailable { policy } => {
                println!("unavailable ({}): offline and not cached", policy);
            }
        }
    }

    if matches!(outcome, FetchOutcome::Unavailable { .. }) {
        process::exit(1);
    }
}

fn run_event(ctx: &Context, state: WorkerState, event: Event, json: bool) {
    let router = router_at(ctx, state);

    let outcome = match runtime().block_on(router.handle(event)) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if json {
        print_json(&outcome);
        return;
    }

    match outcome {
        Outcome::Installed(report) => {
            println!("Installed into '{}':", report.tag);
            for url in &report.cached {
                println!("  {}", url);
            }
        }
        Outcome::Activated(report) => {
            println!("Activated ({} stores scanned)", report.gc.scanned);
            for tag in &report.gc.deleted {
                println!("  deleted  {}", tag);
            }
            for tag in &report.gc.retained {
                println!("  kept     {}", tag);
            }
            for error in &report.gc.errors {
                println!("  error    {}", error);
            }
        }
        Outcome::Message(MessageOutcome::Cleared { gc }) => {
            println!("Cleared {} stores", gc.deleted.len());
            for error in &gc.errors {
                println!("  error    {}", error);
            }
        }
        Outcome::Message(MessageOutcome::Ignored) => println!("Message ignored"),
        Outcome::Fetched(_) => {}
    }
}

#[derive(Serialize)]
struct StoreRow {
    tag: String,
    entries: usize,
    body_bytes: u64,
    current: bool,
}

fn run_stores(ctx: &Context, json: bool) {
    let settings = ctx.settings();
    let storage = DiskStorage::new(ctx.cache_dir(&settings));
    let current = settings.router.current_tags();

    let rows: Result<Vec<StoreRow>, _> = runtime().block_on(async {
        let mut rows = Vec::new();
        for tag in storage.keys().await? {
            let stats = storage.stats(&tag).await?;
            rows.push(StoreRow {
                current: current.contains(&tag.as_str()),
                tag,
                entries: stats.entries,
                body_bytes: stats.body_bytes,
            });
        }
        Ok::<_, earcheo_cache::StoreError>(rows)
    });

    let rows = match rows {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading cache: {}", e);
            process::exit(1);
        }
    };

    if json {
        print_json(&rows);
        return;
    }

    if rows.is_empty() {
        println!("No cache stores in {}", storage.root().display());
        return;
    }

    println!("Cache stores in {} ({} total):\n", storage.root().display(), rows.len());
    for row in &rows {
        let marker = if row.current { "current" } else { "stale" };
        println!("  {:<28} {:>6} entries {:>10} bytes  {}", row.tag, row.entries, row.body_bytes, marker);
    }
}
