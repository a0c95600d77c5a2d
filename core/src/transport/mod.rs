//! The transport contract and the factory that picks a backend.
//!
//! # Design
//! Every backend performs one blocking POST per call and hands back only the
//! response payload. The backend is chosen once, when the factory boxes it;
//! callers only ever see `dyn Transport`.
//!
//! `post` takes `&mut self`: an instance holds at most one live handle and
//! its connect / send / disconnect cycle is not reentrant.

pub mod socket;

#[cfg(feature = "streams")]
pub mod stream;

#[cfg(feature = "curl")]
pub mod curl;

use crate::config::{Backend, TransportConfig};
use crate::error::TransportError;

pub use socket::SocketTransport;

#[cfg(feature = "streams")]
pub use stream::StreamTransport;

#[cfg(feature = "curl")]
pub use self::curl::CurlTransport;

/// A strategy for performing one HTTP POST exchange.
pub trait Transport {
    /// Which implementation this is.
    fn backend(&self) -> Backend;

    /// POST `body` to `path` and return the response payload.
    ///
    /// `body` must already be form-encoded. A non-empty `subdomain_key`
    /// addresses the request to `{key}.{host}`; a key that is not a single
    /// host name label fails with a communication error before anything is
    /// sent.
    fn post(
        &mut self,
        path: &str,
        body: &str,
        subdomain_key: Option<&str>,
    ) -> Result<String, TransportError>;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("backend", &self.backend()).finish()
    }
}

impl Backend {
    /// Construct the transport for this backend.
    pub fn build(self, config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
        config.validate()?;
        tracing::debug!(
            backend = %self,
            host = %config.host,
            port = config.port,
            "building transport"
        );
        match self {
            Backend::Sockets => Ok(Box::new(SocketTransport::new(config.clone()))),
            Backend::Streams => build_stream(config),
            Backend::Curl => build_curl(config),
        }
    }
}

/// Look up a backend by name and construct it.
pub fn factory(name: &str, config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    name.parse::<Backend>()?.build(config)
}

#[cfg(feature = "streams")]
fn build_stream(config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    Ok(Box::new(StreamTransport::new(config.clone())?))
}

#[cfg(not(feature = "streams"))]
fn build_stream(_config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    Err(TransportError::configuration(
        "the streams transport is not enabled in this build and may not be used",
    ))
}

#[cfg(feature = "curl")]
fn build_curl(config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    Ok(Box::new(CurlTransport::new(config.clone())?))
}

#[cfg(not(feature = "curl"))]
fn build_curl(_config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    Err(TransportError::configuration(
        "the curl transport is not enabled in this build and may not be used",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TransportConfig {
        TransportConfig::new("example.test", 80, "X/1.0")
    }

    #[test]
    fn factory_builds_sockets() {
        let transport = factory("sockets", &config()).unwrap();
        assert_eq!(transport.backend(), Backend::Sockets);
    }

    #[cfg(feature = "streams")]
    #[test]
    fn factory_builds_streams() {
        let transport = factory("streams", &config()).unwrap();
        assert_eq!(transport.backend(), Backend::Streams);
    }

    #[cfg(not(feature = "streams"))]
    #[test]
    fn factory_reports_disabled_streams() {
        assert!(factory("streams", &config()).unwrap_err().is_configuration());
    }

    #[cfg(feature = "curl")]
    #[test]
    fn factory_builds_curl() {
        let transport = factory("curl", &config()).unwrap();
        assert_eq!(transport.backend(), Backend::Curl);
    }

    #[cfg(not(feature = "curl"))]
    #[test]
    fn factory_reports_disabled_curl() {
        assert!(factory("curl", &config()).unwrap_err().is_configuration());
    }

    #[test]
    fn factory_rejects_unknown_name() {
        for name in ["", "Sockets", "http", "fsockopen"] {
            let err = factory(name, &config()).unwrap_err();
            assert!(err.is_configuration(), "{name}: {err}");
        }
    }

    #[test]
    fn factory_validates_configuration() {
        let bad = TransportConfig::new("example.test", 0, "X/1.0");
        assert!(factory("sockets", &bad).unwrap_err().is_configuration());
    }

    #[test]
    fn construction_does_not_connect() {
        // Nothing listens on this name; building must still succeed.
        let unreachable = TransportConfig::new("unreachable.invalid", 80, "X/1.0");
        assert!(factory("sockets", &unreachable).is_ok());
    }

    #[test]
    fn boxed_transport_debug_names_backend() {
        let transport = factory("sockets", &config()).unwrap();
        assert_eq!(format!("{transport:?}"), "Transport { backend: Sockets }");
    }
}
