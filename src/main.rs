//! Photo fetcher command line
//!
//! Downloads each given source (a `tg:<file_id>` reference or an HTTP/HTTPS
//! URL) into the configured photo directory and prints the saved paths.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use photo_fetcher::Config;
use photo_fetcher::photo::{
    FetchOutcome, FileResolver, NoPlatformResolver, PhotoClient, PhotoFetcher, ReqwestClientFactory,
    TelegramFileResolver,
};
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "photo-fetcher")]
#[command(about = "Fetch photos from Telegram file references or HTTP(S) URLs")]
#[command(version)]
struct Args {
    /// Photo sources: `tg:<file_id>` or an HTTP(S) URL
    #[arg(required_unless_present = "print_config")]
    sources: Vec<String>,

    /// Configuration file path
    #[arg(short, long, default_value = photo_fetcher::config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Photo directory (overrides config)
    #[arg(long)]
    photo_dir: Option<PathBuf>,

    /// Maximum photo size in megabytes (overrides config)
    #[arg(long)]
    max_size_mb: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    init_logging(args.verbose);

    let mut config = Config::load(&args.config).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {}: {}", args.config, e);
        Config::from_env().unwrap_or_else(|e| {
            tracing::warn!("Ignoring environment overrides: {}", e);
            Config::default()
        })
    });

    if let Some(dir) = args.photo_dir {
        config.photo_dir = dir;
    }
    if let Some(size) = args.max_size_mb {
        config.max_photo_size_mb = size;
    }
    config.validate()?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let fetch_config = config.fetch_config();
    let resolver: Arc<dyn FileResolver> = match config.telegram_bot_token.as_deref() {
        Some(token) if config.has_telegram_token() => Arc::new(
            TelegramFileResolver::new(
                token,
                config.telegram_api_base.as_str(),
                config.request_timeout(),
            )?
            .with_max_bytes(fetch_config.max_photo_bytes()),
        ),
        _ => {
            tracing::debug!("No Telegram bot token configured, tg: sources will fail");
            Arc::new(NoPlatformResolver)
        }
    };

    let fetcher = Arc::new(PhotoFetcher::new(fetch_config));

    let outcomes = if args.sources.len() == 1 {
        // Single fetch: let the fetcher own (and close) its client
        let outcome = fetcher
            .fetch(&args.sources[0], resolver.as_ref(), None)
            .await;
        vec![(args.sources[0].clone(), outcome)]
    } else {
        fetch_all(fetcher, resolver, &args.sources, &config).await?
    };

    let mut missing = 0;
    for (source, outcome) in outcomes {
        match outcome {
            FetchOutcome::Saved(path) => println!("{}", path.display()),
            FetchOutcome::NotFound => {
                missing += 1;
                println!("not found: {}", source);
            }
        }
    }

    if missing > 0 {
        tracing::warn!("{} of {} photos could not be fetched", missing, args.sources.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Fetch several sources concurrently, sharing one borrowed client
async fn fetch_all(
    fetcher: Arc<PhotoFetcher>,
    resolver: Arc<dyn FileResolver>,
    sources: &[String],
    config: &Config,
) -> anyhow::Result<Vec<(String, FetchOutcome)>> {
    let client = Arc::new(ReqwestClientFactory::build_client(config.request_timeout())?);

    let mut tasks = JoinSet::new();
    for (index, source) in sources.iter().cloned().enumerate() {
        let fetcher = fetcher.clone();
        let resolver = resolver.clone();
        let client = client.clone();
        tasks.spawn(async move {
            let borrowed: &dyn PhotoClient = client.as_ref();
            let outcome = fetcher
                .fetch(&source, resolver.as_ref(), Some(borrowed))
                .await;
            (index, source, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(sources.len());
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined?);
    }

    // Report in command line order
    outcomes.sort_by_key(|(index, _, _)| *index);
    Ok(outcomes
        .into_iter()
        .map(|(_, source, outcome)| (source, outcome))
        .collect())
}

/// Initialize tracing/logging
///
/// Default level is "warn"; use --verbose for "debug".
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("photo_fetcher={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
