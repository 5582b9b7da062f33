use async_trait::async_trait;
use oichain_util::RawResponse;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a symbol was not saved in a polling round.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection failure, timeout, or a body that could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to fetch data, status code: {0}")]
    Status(StatusCode),

    /// A 200 whose body is not an option chain; the shape of the response changed, or the
    /// provider served a block page.
    #[error("failed to parse the response as an option chain: {source}")]
    MalformedPayload {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to save snapshot: {0:#}")]
    Store(anyhow::Error),
}

/// Transport to the option chain provider.
///
/// [`Session`] is the real one; the polling loop only knows this trait.
///
/// [`Session`]: crate::session::Session
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Obtain whatever continuity tokens the provider hands out before it serves data.
    async fn bootstrap(&self) -> Result<(), FetchError>;

    /// GET `endpoint`; any status is `Ok`, only transport failures are `Err`.
    async fn fetch(&self, endpoint: &str) -> Result<RawResponse, FetchError>;
}
