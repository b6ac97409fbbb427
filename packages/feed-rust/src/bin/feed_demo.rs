//! Seeds an in-memory store and pages through it the way the requests page
//! does, printing each page and a summary of the loaded window.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use bloodlink_core::RecordFilter;
use bloodlink_feed::feed::{urgent_preview, PREVIEW_FETCH_LIMIT, PREVIEW_TAKE};
use bloodlink_feed::seed::{seed_random, seed_samples};
use bloodlink_feed::telemetry::{init_tracing, LogFormat};
use bloodlink_feed::{FeedConfig, FeedController, FetchOutcome, FilterPolicy, MemoryRecordStore};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "feed-demo", about = "Page through a seeded blood request feed")]
struct Args {
    /// Collection to seed and read.
    #[arg(long, env = "BLOODLINK_COLLECTION", default_value = "bloodRequests")]
    collection: String,

    /// Records per page.
    #[arg(long, env = "BLOODLINK_PAGE_SIZE", default_value_t = 10)]
    page_size: usize,

    /// Feed filter: `open` or `all`.
    #[arg(long, env = "BLOODLINK_FILTER", default_value = "open")]
    filter: RecordFilter,

    /// Evaluate the filter in the store instead of on the loaded window.
    #[arg(long, env = "BLOODLINK_STORE_FILTER")]
    store_filter: bool,

    /// Synthetic requests to add on top of the six samples.
    #[arg(long, env = "BLOODLINK_SEED_COUNT", default_value_t = 40)]
    seed_count: usize,

    /// RNG seed for synthetic data.
    #[arg(long, env = "BLOODLINK_RNG_SEED", default_value_t = 42)]
    rng_seed: u64,

    /// Stop after this many pages even if more exist.
    #[arg(long)]
    pages: Option<usize>,

    /// Per-fetch timeout in milliseconds.
    #[arg(long, env = "BLOODLINK_FETCH_TIMEOUT_MS")]
    fetch_timeout_ms: Option<u64>,

    /// Print the final window summary as JSON.
    #[arg(long)]
    json: bool,

    #[arg(long, env = "BLOODLINK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Serialize)]
struct Report<'a> {
    pages: usize,
    loaded: usize,
    visible: usize,
    exhausted: bool,
    summary: &'a bloodlink_core::WindowSummary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let store = Arc::new(MemoryRecordStore::new());
    let samples = seed_samples(&store, &args.collection);
    let mut rng = StdRng::seed_from_u64(args.rng_seed);
    let seeded = seed_random(&store, &args.collection, args.seed_count, &mut rng);
    tracing::info!(samples, synthetic = seeded.len(), "store seeded");

    let preview = urgent_preview(
        store.as_ref(),
        &args.collection,
        PREVIEW_FETCH_LIMIT,
        PREVIEW_TAKE,
    )
    .await
    .context("loading urgent preview")?;
    println!("Urgent requests:");
    for request in &preview {
        println!(
            "  {:<4} {:<22} {} ({})",
            request.blood_group, request.name, request.city, request.hospital
        );
    }

    let config = FeedConfig {
        collection: args.collection.clone(),
        page_size: args.page_size,
        filter_policy: if args.store_filter {
            FilterPolicy::PreferStore
        } else {
            FilterPolicy::ClientSide
        },
        fetch_timeout: args.fetch_timeout_ms.map(Duration::from_millis),
        ..FeedConfig::default()
    };
    let controller =
        FeedController::new(store.clone(), config).context("invalid feed configuration")?;

    let mut pages = 0;
    let mut outcome = controller.load_initial(args.filter).await;
    loop {
        match &outcome {
            FetchOutcome::Loaded { appended, exhausted, .. } => {
                pages += 1;
                println!("Page {pages}: {appended} records (exhausted: {exhausted})");
            }
            FetchOutcome::Failed(err) => anyhow::bail!("feed fetch failed: {err}"),
            FetchOutcome::Skipped | FetchOutcome::Stale => break,
        }
        if !controller.has_more() || args.pages.is_some_and(|limit| pages >= limit) {
            break;
        }
        outcome = controller.load_more().await;
    }

    let snapshot = controller.snapshot();
    println!("\nVisible ({}):", args.filter);
    for request in snapshot.visible() {
        println!(
            "  {:<4} {:<9} {:<22} {}, {}",
            request.blood_group,
            request.status.as_str(),
            request.name,
            request.city,
            request.state
        );
    }

    let summary = snapshot.summary(store.now_millis());
    let report = Report {
        pages,
        loaded: snapshot.items().len(),
        visible: snapshot.visible().count(),
        exhausted: snapshot.is_exhausted(),
        summary: &summary,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "\n{} pages, {} loaded, {} visible, {} open, {} pressing, {} in the last 24h",
            report.pages,
            report.loaded,
            report.visible,
            summary.open,
            summary.pressing,
            summary.recent
        );
    }
    Ok(())
}

