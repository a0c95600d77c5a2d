//! libcurl-backed transport.
//!
//! # Design
//! The easy handle lives in an `Option`; `Some` means connected. `connect`
//! sets the options that hold for every request (POST, port, user agent and
//! a collecting write handler), `post` adds the URL and body, and the handle
//! is always released before `post` returns. `Drop` releases it as well.

use ::curl::easy::{Easy2, Handler, List, WriteError};
use tracing::debug;

use crate::config::{Backend, TransportConfig};
use crate::error::TransportError;
use crate::http;
use crate::transport::Transport;

/// Write handler that keeps the transferred body instead of printing it.
#[derive(Debug, Default)]
pub struct Collector(Vec<u8>);

impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.0.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Delegates the whole exchange to libcurl.
pub struct CurlTransport {
    config: TransportConfig,
    handle: Option<Easy2<Collector>>,
}

impl std::fmt::Debug for CurlTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurlTransport")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl CurlTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let version = ::curl::Version::get();
        if !version.protocols().any(|p| p == "http") {
            return Err(TransportError::configuration(format!(
                "libcurl {} was built without HTTP support; the curl transport may not be used",
                version.version()
            )));
        }
        Ok(Self { config, handle: None })
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Initialise the easy handle unless one is already held.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let mut handle = Easy2::new(Collector::default());
        handle.post(true).map_err(curl_error)?;
        handle.port(self.config.port).map_err(curl_error)?;
        handle.useragent(&self.config.user_agent).map_err(curl_error)?;
        let mut headers = List::new();
        headers
            .append(&format!("Content-Type: {}", http::FORM_CONTENT_TYPE))
            .map_err(curl_error)?;
        handle.http_headers(headers).map_err(curl_error)?;
        debug!(port = self.config.port, "initialised curl handle");
        self.handle = Some(handle);
        Ok(())
    }

    /// Release the easy handle. Safe to call any number of times.
    pub fn disconnect(&mut self) {
        if self.handle.take().is_some() {
            debug!("released curl handle");
        }
    }

    /// URL for `path`, addressed to the effective host. The port is carried
    /// by the handle's port option, not the URL.
    pub fn url_for(&self, path: &str, subdomain_key: Option<&str>) -> String {
        let host = http::effective_host(&self.config.host, subdomain_key);
        http::request_url(&host, None, path)
    }

    fn perform(
        &mut self,
        path: &str,
        body: &str,
        subdomain_key: Option<&str>,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.url_for(path, subdomain_key);
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| TransportError::communication("curl handle is not initialised"))?;

        if http::is_absolute_url(path) {
            // Let the scheme of an absolute URL pick its own port.
            handle.port(0).map_err(curl_error)?;
        }
        handle.url(&url).map_err(curl_error)?;
        handle.post_fields_copy(body.as_bytes()).map_err(curl_error)?;
        debug!(%url, content_length = http::content_length(body), "sending POST");

        handle.perform().map_err(|e| {
            TransportError::communication_with_code(
                format!("error getting response from API server: {e}"),
                i64::from(e.code()),
            )
        })?;
        Ok(std::mem::take(&mut handle.get_mut().0))
    }
}

impl Transport for CurlTransport {
    fn backend(&self) -> Backend {
        Backend::Curl
    }

    fn post(
        &mut self,
        path: &str,
        body: &str,
        subdomain_key: Option<&str>,
    ) -> Result<String, TransportError> {
        http::validate_path(path)?;
        http::validate_subdomain_key(subdomain_key)?;
        self.connect()?;
        let outcome = self.perform(path, body, subdomain_key);
        self.disconnect();
        http::body_to_string(outcome?)
    }
}

impl Drop for CurlTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn curl_error(err: ::curl::Error) -> TransportError {
    TransportError::communication_with_code(
        format!("error configuring curl handle: {err}"),
        i64::from(err.code()),
    )
}
