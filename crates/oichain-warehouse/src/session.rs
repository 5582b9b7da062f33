use crate::api::{Fetch, FetchError};
use crate::config::Config;
use async_trait::async_trait;
use oichain_util::{RawResponse, Util};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER, USER_AGENT,
};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, trace, warn};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Cookie-bearing session against the provider
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The provider refuses data requests from clients that have not first visited its root page;
/// the cookies it sets there are kept in the client's cookie store and sent with every later
/// request.
///
/// Tokens are never refreshed: if the provider starts rejecting them mid-run, every later
/// fetch fails the same way until the process restarts.
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    warmup: Duration,
}

impl Session {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .default_headers(Self::headers(config)?)
            .cookie_store(true)
            .gzip(true)
            .deflate(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            warmup: config.warmup,
        })
    }

    /// The fixed header set sent with every request.
    pub fn headers(config: &Config) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,hi;q=0.8"),
        );
        headers.insert(REFERER, HeaderValue::from_str(&config.base_url)?);
        Ok(headers)
    }
}

#[async_trait]
impl Fetch for Session {
    async fn bootstrap(&self) -> Result<(), FetchError> {
        debug!("Bootstrapping session against {}", self.base_url);
        let response = self.client.get_raw(&self.base_url).await?;
        if response.status != StatusCode::OK {
            warn!(
                "Session bootstrap returned status code {}; data requests may be refused",
                response.status
            );
        } else {
            trace!("Session cookies captured from {}", self.base_url);
        }

        // let the session settle before the first data request
        tokio::time::sleep(self.warmup).await;
        Ok(())
    }

    async fn fetch(&self, endpoint: &str) -> Result<RawResponse, FetchError> {
        let response = self.client.get_raw(endpoint).await?;
        Ok(response)
    }
}
