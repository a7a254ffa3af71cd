//! Network sources for wallpaper image bytes
//!
//! The cache talks to the network only through [`ImageSource`]. Production code
//! uses [`HttpSource`], a thin wrapper over a reqwest client; tests plug in
//! sources that count requests or fail on demand.

use std::future::Future;

use reqwest::Client;
use tracing::debug;
use url::Url;

/// Boxed error returned by image sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can fetch the raw bytes behind an image URL
pub trait ImageSource: Send + Sync + 'static {
    /// Fetch the body behind `url`
    ///
    /// Any error returned here is reported to callers as a network error.
    /// A body that arrives is handed to the decoder whatever it contains.
    fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, BoxError>> + Send;
}

/// Image source that issues one HTTP GET per request
///
/// Only transport failures are errors. Error statuses still return their
/// body, which the cache then fails to decode unless it is an image.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSource {
    /// Create a new HttpSource with default client settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a new HttpSource with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ImageSource for HttpSource {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, BoxError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Image request returned error status");
        }
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
