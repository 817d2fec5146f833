use std::sync::Arc;
use std::thread;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use feedwatch::cli::{Cli, Commands};
use feedwatch::config::Config;
use feedwatch::domain::Notification;
use feedwatch::errors::{FeedwatchError, FeedwatchResult};
use feedwatch::fetch::HttpFeedFetcher;
use feedwatch::notify::{GotifyNotifier, Notifier};
use feedwatch::services::PollService;
use feedwatch::storage::{FeedStateRepository, FileStateStore};

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feedwatch=info,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run() -> FeedwatchResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the state repository over the file-backed store
    let store = FileStateStore::new(&config.state_path);
    let repository = Arc::new(FeedStateRepository::new(store));

    match cli.command {
        Commands::Add { url } => cmd_add(&url, &repository),
        Commands::Remove { id } => cmd_remove(id, &repository),
        Commands::List => cmd_list(&repository),
        Commands::Token { token } => cmd_token(token.as_deref(), &repository),
        Commands::Run { dry_run } => cmd_run(repository, &config, dry_run),
        Commands::Watch => cmd_watch(repository, &config),
    }
}

fn cmd_add(url: &str, repository: &FeedStateRepository<FileStateStore>) -> FeedwatchResult<()> {
    let record = repository.add_feed(url)?;

    println!("Feed added successfully!");
    println!("  Id: {}", record.id);
    println!("  URL: {}", record.url);

    Ok(())
}

fn cmd_remove(id: u64, repository: &FeedStateRepository<FileStateStore>) -> FeedwatchResult<()> {
    match repository.feed(id)? {
        Some(record) => {
            repository.remove_feed(id)?;
            println!("Removed: {}", record.url);
            Ok(())
        }
        None => Err(FeedwatchError::FeedNotFound(id)),
    }
}

fn cmd_list(repository: &FeedStateRepository<FileStateStore>) -> FeedwatchResult<()> {
    let feeds = repository.feeds()?;

    if feeds.is_empty() {
        println!("No feeds configured.");
        return Ok(());
    }

    println!("Configured feeds:\n");
    for (id, record) in feeds {
        println!("  {}. {}", id, record.url);
        match record.last_seen {
            Some(last_seen) => println!("     Last item: {}", last_seen.to_rfc3339()),
            None => println!("     Last item: never"),
        }
        println!();
    }

    Ok(())
}

fn cmd_token(
    token: Option<&str>,
    repository: &FeedStateRepository<FileStateStore>,
) -> FeedwatchResult<()> {
    match token {
        Some(token) => {
            repository.save_client_token(token)?;
            println!("Client token saved.");
        }
        None => {
            let token = repository.client_token()?;
            if token.is_empty() {
                println!("No client token set. Run `feedwatch token <token>` to set one.");
            } else {
                println!("{}", token);
            }
        }
    }

    Ok(())
}

fn cmd_run(
    repository: Arc<FeedStateRepository<FileStateStore>>,
    config: &Config,
    dry_run: bool,
) -> FeedwatchResult<()> {
    if repository.feeds()?.is_empty() {
        println!("No feeds configured.");
        return Ok(());
    }

    println!("Fetching feeds...\n");
    let fetcher = HttpFeedFetcher::new(config.fetch_timeout);

    let summary = if dry_run {
        PollService::new(repository, fetcher, DryRunNotifier).check_feeds()?
    } else {
        let notifier = gotify_notifier(&repository, config)?;
        PollService::new(repository, fetcher, notifier).check_feeds()?
    };

    if dry_run {
        println!(
            "Dry run complete. Would notify {} items ({} feeds polled, {} skipped).",
            summary.notifications_sent, summary.feeds_polled, summary.feeds_skipped
        );
    } else {
        println!(
            "Notified {} items ({} feeds polled, {} skipped).",
            summary.notifications_sent, summary.feeds_polled, summary.feeds_skipped
        );
    }

    Ok(())
}

fn cmd_watch(
    repository: Arc<FeedStateRepository<FileStateStore>>,
    config: &Config,
) -> FeedwatchResult<()> {
    let fetcher = HttpFeedFetcher::new(config.fetch_timeout);
    let notifier = gotify_notifier(&repository, config)?;
    let service = PollService::new(repository, fetcher, notifier);

    println!(
        "Watching feeds every {} seconds. Press Ctrl-C to stop.",
        config.poll_interval.as_secs()
    );

    // One eager cycle on startup, then the fixed interval.
    loop {
        if let Err(e) = service.check_feeds() {
            tracing::error!(error = %e, "poll cycle failed");
        }
        thread::sleep(config.poll_interval);
    }
}

fn gotify_notifier(
    repository: &FeedStateRepository<FileStateStore>,
    config: &Config,
) -> FeedwatchResult<GotifyNotifier> {
    let token = repository.client_token()?;
    if token.is_empty() {
        return Err(FeedwatchError::Config(
            "no client token set; run `feedwatch token <token>` first".to_string(),
        ));
    }

    Ok(GotifyNotifier::new(
        &config.gotify_url,
        &token,
        config.fetch_timeout,
    ))
}

/// Prints what would be sent instead of pushing it.
struct DryRunNotifier;

impl Notifier for DryRunNotifier {
    fn send(&self, notification: &Notification) -> FeedwatchResult<()> {
        println!("  [DRY RUN] {}: {}", notification.title, notification.message);
        Ok(())
    }
}
