use reqwest::{Client, StatusCode};
use std::future::Future;
use tracing::trace;

/// Status and body of a GET request, untouched.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body as text, for diagnostics; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait ClientUtilExt {
    fn get_raw(&self, url: &str) -> impl Future<Output = reqwest::Result<RawResponse>> + Send;
}

/// Add-on methods for [`reqwest::Client`].
///
/// [`reqwest::Client`]: https://docs.rs/reqwest/latest/reqwest/struct.Client.html
impl ClientUtilExt for Client {
    /// GET request `url`, returning the status code and the full body, whatever the status.
    ///
    /// Only transport failures (connection, timeout, body decoding) are errors; a non-200
    /// status is left to the caller to classify.
    async fn get_raw(&self, url: &str) -> reqwest::Result<RawResponse> {
        let response = self.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        trace!("GET {url} -> {status} ({} bytes)", body.len());
        Ok(RawResponse { status, body })
    }
}
