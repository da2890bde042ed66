//! Scheme-based session construction.

use url::Url;

use crate::data::{Credential, Protocol};
use crate::effects::Session;
use crate::error::{Error, Result};
use crate::protocol::{LocalSession, MemorySession, MemoryStore};

/// Opens sessions for URIs by their scheme.
///
/// Every `memory://` URI opened through one registry shares the same
/// [`MemoryStore`].
#[derive(Clone, Default)]
pub struct EndpointRegistry {
    memory: MemoryStore,
    #[cfg(feature = "reqwest")]
    http:   crate::effects::ReqwestClient,
}

impl EndpointRegistry {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_memory_store(mut self, store: MemoryStore) -> Self {
        self.memory = store;
        self
    }

    pub fn memory_store(&self) -> &MemoryStore { &self.memory }

    /// Protocols this build can open.
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut protocols = vec![Protocol::File, Protocol::Memory];
        if cfg!(feature = "reqwest") {
            protocols.extend([Protocol::Http, Protocol::Dropbox, Protocol::GridFtp]);
        }
        protocols
    }

    /// Build an uninitialized session for `uri`.
    pub fn connect(&self, uri: &str, credential: Credential) -> Result<Box<dyn Session>> {
        let url = Url::parse(uri)?;
        let protocol = Protocol::from_scheme(url.scheme())
            .filter(|p| self.protocols().contains(p))
            .ok_or_else(|| Error::UnsupportedScheme(url.scheme().to_string()))?;

        let session: Box<dyn Session> = match protocol {
            Protocol::File => Box::new(LocalSession::new(url, credential)?),
            Protocol::Memory => Box::new(MemorySession::new(url, self.memory.clone(), credential)),
            #[cfg(feature = "reqwest")]
            Protocol::Http => Box::new(crate::protocol::HttpSession::new(
                url,
                std::sync::Arc::new(self.http.clone()),
                credential,
            )),
            #[cfg(feature = "reqwest")]
            Protocol::Dropbox => Box::new(crate::protocol::DropboxSession::new(url, credential)),
            #[cfg(feature = "reqwest")]
            Protocol::GridFtp => Box::new(crate::protocol::GridFtpSession::new(url, credential)),
            #[cfg(not(feature = "reqwest"))]
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };
        Ok(session)
    }

    /// Connect and initialize in one step.
    pub async fn open(&self, uri: &str, credential: Credential) -> Result<Box<dyn Session>> {
        let mut session = self.connect(uri, credential)?;
        session.initialize().await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Selection;

    #[test]
    fn test_unknown_scheme() {
        let registry = EndpointRegistry::new();
        assert!(matches!(
            registry.connect("ftp://host/x", Credential::None),
            Err(Error::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_invalid_uri() {
        let registry = EndpointRegistry::new();
        assert!(matches!(
            registry.connect("not a uri", Credential::None),
            Err(Error::InvalidUri(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_sessions_share_store() {
        let registry = EndpointRegistry::new();
        registry.memory_store().insert("shared/f", vec![1u8, 2, 3]);

        let session = registry.open("memory:///shared", Credential::None).await.unwrap();
        assert_eq!(session.protocol(), Protocol::Memory);
        let stat = session.select(&Selection::root()).await.unwrap().stat().await.unwrap();
        assert_eq!(stat.size, 3);
    }

    #[cfg(feature = "reqwest")]
    #[tokio::test]
    async fn test_dropbox_requires_oauth() {
        let registry = EndpointRegistry::new();
        let err = registry.open("dropbox:///x", Credential::None).await.err().unwrap();
        assert!(matches!(err, Error::AuthenticationRequired { expected: "oauth", .. }));
    }
}
