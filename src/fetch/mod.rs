// src/fetch/mod.rs

pub mod urls;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const USER_AGENT: &str = concat!("bananas/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {input:?}: {source}")]
    Url {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("GET {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET {url} returned {status}")]
    Status { url: Url, status: StatusCode },
}

/// The retrieval step of the loader. `HttpFetcher` in production,
/// stubs in tests.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client with a whole-request timeout; without one a stalled
    /// server would hold up startup indefinitely.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        async move {
            debug!(%url, "GET");
            let transport = |source| FetchError::Transport {
                url: url.clone(),
                source,
            };
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(transport)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.clone(),
                    status,
                });
            }

            let bytes = resp.bytes().await.map_err(transport)?;
            debug!(%url, bytes = bytes.len(), "downloaded");
            Ok(bytes.to_vec())
        }
        .boxed()
    }
}
