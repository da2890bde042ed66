use std::future::Future;

use bytes::Bytes;

use super::tap::BoxStream;
use crate::error::Result;

/// Asynchronous HTTP client abstraction.
///
/// The minimal surface the HTTP endpoint needs. Implementations handle their
/// own redirects and timeouts and must map non-success statuses to errors.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync + 'static {
    /// Open a streaming GET and return the response body.
    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<BoxStream<'static, Result<Bytes>>>> + Send;

    /// Query the Content-Length header without downloading the body.
    ///
    /// `Ok(None)` when the header is absent or the body is chunked.
    fn head(&self, url: &str) -> impl Future<Output = Result<Option<u64>>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;

    use super::*;
    use crate::error::Error;

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Self { Self::default() }

        pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
    }

    impl HttpClient for ReqwestClient {
        async fn stream(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<BoxStream<'static, Result<Bytes>>> {
            let mut request = self.client.get(url);
            for (key, value) in headers {
                request = request.header(key, value);
            }

            let response = request.send().await?.error_for_status()?;
            let stream = response.bytes_stream().map(|chunk| chunk.map_err(Error::from));
            Ok(Box::pin(stream))
        }

        async fn head(&self, url: &str) -> Result<Option<u64>> {
            let response = self.client.head(url).send().await?.error_for_status()?;
            let content_length = response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            Ok(content_length)
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
