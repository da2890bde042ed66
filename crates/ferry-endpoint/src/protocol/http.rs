//! HTTP/HTTPS endpoint. Source only: the resource always resolves to the
//! session URI and refuses to build sinks.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::data::{Credential, Protocol, Selection, Stat};
use crate::effects::{Drain, HttpClient, Resource, Session, StreamTap, Tap};
use crate::error::{Error, Result};

pub struct HttpSession<C> {
    uri:         Url,
    client:      Arc<C>,
    headers:     Vec<(String, String)>,
    initialized: bool,
}

impl<C: HttpClient> HttpSession<C> {
    /// An OAuth credential is forwarded as a bearer token; anything else is ignored.
    pub fn new(uri: Url, client: Arc<C>, credential: Credential) -> Self {
        let headers = match credential {
            Credential::OAuth { token } => vec![("Authorization".to_string(), format!("Bearer {token}"))],
            _ => Vec::new(),
        };
        Self {
            uri,
            client,
            headers,
            initialized: false,
        }
    }
}

#[async_trait]
impl<C: HttpClient> Session for HttpSession<C> {
    fn protocol(&self) -> Protocol { Protocol::Http }

    fn uri(&self) -> &Url { &self.uri }

    async fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    async fn select(&self, _selection: &Selection) -> Result<Arc<dyn Resource>> {
        if !self.initialized {
            return Err(Error::NotInitialized(Protocol::Http));
        }
        Ok(Arc::new(HttpResource {
            url:     self.uri.clone(),
            display: self.uri.to_string(),
            client:  Arc::clone(&self.client),
            headers: self.headers.clone(),
        }))
    }
}

pub struct HttpResource<C> {
    url:     Url,
    display: String,
    client:  Arc<C>,
    headers: Vec<(String, String)>,
}

#[async_trait]
impl<C: HttpClient> Resource for HttpResource<C> {
    fn protocol(&self) -> Protocol { Protocol::Http }

    fn path(&self) -> &str { &self.display }

    fn is_writable(&self) -> bool { false }

    fn child(&self, relative: &str) -> Result<Arc<dyn Resource>> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let url = base.join(relative)?;
        Ok(Arc::new(HttpResource {
            display: url.to_string(),
            url,
            client: Arc::clone(&self.client),
            headers: self.headers.clone(),
        }))
    }

    async fn stat(&self) -> Result<Stat> {
        let size = self
            .client
            .head(self.url.as_str())
            .await?
            .ok_or_else(|| Error::InvalidResponse(format!("{} has no Content-Length", self.url)))?;
        let name = self
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or_else(|| self.url.host_str().unwrap_or_default())
            .to_string();
        Ok(Stat::file(name, size))
    }

    async fn tap(&self) -> Result<Box<dyn Tap>> {
        let body = self
            .client
            .stream(self.url.as_str(), &self.headers)
            .await
            .map_err(|e| Error::tap(&self.display, e))?;
        Ok(Box::new(StreamTap::new(body)))
    }

    async fn sink(&self) -> Result<Box<dyn Drain>> { Err(Error::ReadOnly(Protocol::Http)) }

    async fn sink_for(&self, _stat: &Stat) -> Result<Box<dyn Drain>> { Err(Error::ReadOnly(Protocol::Http)) }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::{StreamExt, stream};

    use super::*;
    use crate::effects::BoxStream;

    struct FixedClient {
        body: Bytes,
    }

    impl HttpClient for FixedClient {
        async fn stream(
            &self,
            _url: &str,
            headers: &[(String, String)],
        ) -> Result<BoxStream<'static, Result<Bytes>>> {
            assert!(headers.iter().any(|(k, _)| k == "Authorization"));
            let chunks: Vec<Result<Bytes>> = self
                .body
                .chunks(700)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(stream::iter(chunks).boxed())
        }

        async fn head(&self, _url: &str) -> Result<Option<u64>> { Ok(Some(self.body.len() as u64)) }
    }

    async fn resource() -> Arc<dyn Resource> {
        let client = Arc::new(FixedClient {
            body: Bytes::from(vec![9u8; 2500]),
        });
        let uri = Url::parse("https://example.org/data/file.bin").unwrap();
        let mut session = HttpSession::new(uri, client, Credential::oauth("t"));
        session.initialize().await.unwrap();
        session
            .select(&Selection::path("/ignored").id("ignored"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_select_ignores_hints() {
        let resource = resource().await;
        assert_eq!(resource.path(), "https://example.org/data/file.bin");
        assert!(!resource.is_writable());
    }

    #[tokio::test]
    async fn test_stat_uses_content_length() {
        let stat = resource().await.stat().await.unwrap();
        assert_eq!(stat, Stat::file("file.bin", 2500));
    }

    #[tokio::test]
    async fn test_tap_rechunks_body() {
        let tap = resource().await.tap().await.unwrap();
        let lengths: Vec<usize> = tap.open(1024).map(|s| s.unwrap().len()).collect().await;
        assert_eq!(lengths, [1024, 1024, 452]);
    }

    #[tokio::test]
    async fn test_sink_is_read_only() {
        let resource = resource().await;
        assert!(matches!(resource.sink().await, Err(Error::ReadOnly(Protocol::Http))));
    }
}
