// src/loader.rs

use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use crate::fetch::{urls, Fetch, FetchError};
use crate::process::{self, decode::decode_text, ParseError};

pub const DATE_COLUMN: &str = "Date";

/// Where a loaded table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Remote(Url),
    Local(PathBuf),
}

#[derive(Debug)]
pub struct Loaded {
    pub source: LoadSource,
    pub batch: RecordBatch,
}

/// Why the remote attempt was abandoned. Only ever logged.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed remote CSV: {0}")]
    Parse(#[from] ParseError),
}

/// The local fallback failed; nothing is left to try.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading local fallback {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing local fallback {path}: {source}")]
    LocalParse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Fetch `url_root + file_name`, or fall back to `local_fallback`.
///
/// Any remote failure (bad URL, transport, HTTP status, malformed CSV)
/// is logged and triggers exactly one read of the local file. Only a
/// local failure is returned as an error.
#[instrument(level = "info", skip(fetcher, local_fallback), fields(local = %local_fallback.display()))]
pub async fn load<F>(
    fetcher: &F,
    url_root: &str,
    file_name: &str,
    local_fallback: &Path,
) -> Result<Loaded, LoadError>
where
    F: Fetch + ?Sized,
{
    let remote = urls::remote_csv_url(url_root, file_name).map_err(RemoteError::from);
    load_with_fallback(fetcher, remote, local_fallback).await
}

/// Same as [`load`] for an already resolved URL, e.g. one discovered on
/// the landing page.
#[instrument(level = "info", skip(fetcher, url, local_fallback), fields(url = %url, local = %local_fallback.display()))]
pub async fn load_url<F>(fetcher: &F, url: Url, local_fallback: &Path) -> Result<Loaded, LoadError>
where
    F: Fetch + ?Sized,
{
    load_with_fallback(fetcher, Ok(url), local_fallback).await
}

async fn load_with_fallback<F>(
    fetcher: &F,
    remote: Result<Url, RemoteError>,
    local_fallback: &Path,
) -> Result<Loaded, LoadError>
where
    F: Fetch + ?Sized,
{
    let attempt = match remote {
        Ok(url) => try_remote(fetcher, url).await,
        Err(e) => Err(e),
    };

    match attempt {
        Ok(loaded) => Ok(loaded),
        Err(e) => {
            warn!(
                error = %e,
                local = %local_fallback.display(),
                "remote CSV unavailable, falling back to local copy"
            );
            load_local(local_fallback).await
        }
    }
}

async fn try_remote<F>(fetcher: &F, url: Url) -> Result<Loaded, RemoteError>
where
    F: Fetch + ?Sized,
{
    info!(%url, "attempting remote CSV");
    let bytes = fetcher.fetch(&url).await?;
    let batch = process::parse_csv(&decode_text(&bytes), DATE_COLUMN)?;
    info!(%url, rows = batch.num_rows(), "loaded remote CSV");
    Ok(Loaded {
        source: LoadSource::Remote(url),
        batch,
    })
}

/// Read and parse the bundled snapshot.
pub async fn load_local(path: &Path) -> Result<Loaded, LoadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LoadError::LocalRead {
            path: path.to_path_buf(),
            source,
        })?;
    let batch = process::parse_csv(&decode_text(&bytes), DATE_COLUMN).map_err(|source| {
        LoadError::LocalParse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(path = %path.display(), rows = batch.num_rows(), "loaded local CSV");
    Ok(Loaded {
        source: LoadSource::Local(path.to_path_buf()),
        batch,
    })
}
