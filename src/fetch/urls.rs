// src/fetch/urls.rs
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::FetchError;

pub const LANDING_PAGE: &str = "https://www.gov.uk/government/statistical-data-sets/banana-prices";

static DOWNLOAD_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.download").expect("static selector"));
static GOVUK_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.govuk-link[href]").expect("static selector"));
static CSV_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https://assets\.publishing\.service\.gov\.uk/government/uploads/system/uploads/attachment_data/file/.*\.csv$",
    )
    .expect("static regex")
});

/// `url_root` and `file_name` are concatenated verbatim, so the root
/// must carry its own trailing slash.
pub fn remote_csv_url(url_root: &str, file_name: &str) -> Result<Url, FetchError> {
    let input = format!("{}{}", url_root, file_name);
    Url::parse(&input).map_err(|source| FetchError::Url { input, source })
}

/// Pull the CSV download link out of the landing page HTML.
///
/// The page must contain exactly one `span.download`, holding exactly one
/// `a.govuk-link` that points at a CSV attachment. Anything else means the
/// page layout changed and the link cannot be trusted.
pub fn extract_csv_link(html: &str) -> Result<Url> {
    let doc = Html::parse_document(html);

    let spans: Vec<_> = doc.select(&DOWNLOAD_SPAN).collect();
    if spans.len() != 1 {
        bail!("expected 1 span.download on landing page, got {}", spans.len());
    }

    let links: Vec<&str> = spans[0]
        .select(&GOVUK_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| CSV_HREF.is_match(href))
        .collect();
    if links.len() != 1 {
        bail!(
            "expected 1 CSV attachment link in span.download, got {}",
            links.len()
        );
    }

    let url = Url::parse(links[0]).with_context(|| format!("parsing link {}", links[0]))?;
    debug!(%url, "found CSV link");
    Ok(url)
}

/// Scrape the landing page for the current dataset's download URL.
pub async fn discover_csv_url(client: &Client, landing_page: &str) -> Result<Url> {
    let html = client
        .get(landing_page)
        .send()
        .await
        .with_context(|| format!("GET {}", landing_page))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", landing_page))?
        .text()
        .await
        .with_context(|| format!("reading body from {}", landing_page))?;

    let url = extract_csv_link(&html).with_context(|| format!("scraping {}", landing_page))?;
    info!(%url, "discovered dataset link");
    Ok(url)
}
