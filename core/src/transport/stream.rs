//! URL-fetch transport backed by a reusable `ureq::Agent`.
//!
//! The agent is built once per instance with its POST-wide settings; each
//! call only adds headers and the body. There is no connect or disconnect
//! step: the agent owns the TCP lifecycle, and with an idle pool of zero it
//! closes each connection when the response has been read.

use tracing::debug;

use crate::config::{Backend, TransportConfig};
use crate::error::TransportError;
use crate::http;
use crate::transport::Transport;

/// Delegates framing to `ureq`.
pub struct StreamTransport {
    config: TransportConfig,
    agent: ureq::Agent,
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StreamTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let agent = ureq::Agent::config_builder()
            // Status codes are for the caller to interpret.
            .http_status_as_error(false)
            .max_redirects(0)
            .max_idle_connections(0)
            .build()
            .new_agent();
        Ok(Self { config, agent })
    }

    /// URL the request is sent to. The port appears only when it is not 80.
    pub fn url_for(&self, path: &str) -> String {
        let port = (!self.config.is_default_port()).then_some(self.config.port);
        http::request_url(&self.config.host, port, path)
    }
}

impl Transport for StreamTransport {
    fn backend(&self) -> Backend {
        Backend::Streams
    }

    fn post(
        &mut self,
        path: &str,
        body: &str,
        subdomain_key: Option<&str>,
    ) -> Result<String, TransportError> {
        http::validate_path(path)?;
        http::validate_subdomain_key(subdomain_key)?;
        let url = self.url_for(path);
        debug!(%url, content_length = http::content_length(body), "sending POST");

        let mut request = self
            .agent
            .post(&url)
            .header("User-Agent", self.config.user_agent.as_str());
        // An absolute URL names its own authority; ureq derives Host from it.
        if !http::is_absolute_url(path) {
            let host = http::effective_host(&self.config.host, subdomain_key);
            request = request.header("Host", host.as_ref());
        }
        let mut response = request
            .content_type(http::FORM_CONTENT_TYPE)
            .send(body.as_bytes())
            .map_err(stream_error)?;

        debug!(status = response.status().as_u16(), "response received");
        response.body_mut().read_to_string().map_err(stream_error)
    }
}

fn stream_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Io(io) => TransportError::from_io("error reading HTTP stream", &io),
        other => TransportError::communication(format!("error reading HTTP stream: {other}")),
    }
}
