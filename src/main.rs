use anyhow::{Context, Result};
use bananas::{
    config::Config,
    dashboard,
    dates::{format_file_name, most_recent_weekday},
    fetch::{urls, HttpFetcher},
    loader::{self, LoadSource},
    table::PriceTable,
};
use chrono::Local;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bananas=info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::load().context("loading configuration")?;

    // ─── 3) work out this week's file ────────────────────────────────
    let today = Local::now().date_naive();
    let published = most_recent_weekday(today, &config.publish_weekday)?;
    let file_name = format_file_name(published);
    info!(%today, %published, file = %file_name, "expected dataset");

    let fetcher = HttpFetcher::with_timeout(Duration::from_secs(config.fetch_timeout_secs))
        .context("building HTTP client")?;

    // ─── 4) fetch remote, or fall back to the bundled copy ───────────
    let discovered = if config.discover_link {
        match urls::discover_csv_url(fetcher.client(), &config.landing_page).await {
            Ok(url) => Some(url),
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(%error, "link discovery failed, using computed file name");
                None
            }
        }
    } else {
        None
    };
    let loaded = match discovered {
        Some(url) => loader::load_url(&fetcher, url, &config.local_fallback).await?,
        None => {
            loader::load(
                &fetcher,
                &config.url_root,
                &file_name,
                &config.local_fallback,
            )
            .await?
        }
    };
    if let LoadSource::Local(path) = &loaded.source {
        warn!(path = %path.display(), "serving bundled snapshot, data may be stale");
    }

    // ─── 5) validate + sort ──────────────────────────────────────────
    let table = PriceTable::from_batch(&loaded.batch).context("validating banana prices")?;
    match table.date_bounds() {
        Some((first, last)) => info!(
            rows = table.len(),
            origins = table.origins().len(),
            %first,
            %last,
            "price table ready"
        ),
        None => warn!("price table is empty"),
    }

    // ─── 6) serve ────────────────────────────────────────────────────
    let addr = SocketAddr::new(config.bind, config.port);
    info!("dashboard on http://{}", addr);
    info!("health check: http://{}/health", addr);
    warp::serve(dashboard::routes(Arc::new(table)))
        .run(addr)
        .await;

    Ok(())
}
