//! Reader API client built on a `Transport`.
//!
//! # Design
//! The client owns the credentials and the cached auth and API tokens. Each
//! operation builds a path and a form-encoded body, calls `post`, and reads
//! the reply itself; the transport never interprets a body.

use tracing::debug;

use crate::config::{Backend, TransportConfig, CLIENT_NAME, CLIENT_VERSION};
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{form_encode, AuthTokens, Credentials, LoginReply};

pub const CLIENT_LOGIN_PATH: &str = "/accounts/ClientLogin";
pub const TOKEN_PATH: &str = "/reader/api/0/token";
pub const SUBSCRIPTION_EDIT_PATH: &str = "/reader/api/0/subscription/edit?client=unlfeeds";

/// Client for the subscription and token endpoints of the Reader API.
#[derive(Debug)]
pub struct ReaderClient {
    credentials: Credentials,
    transport: Box<dyn Transport>,
    api_key: Option<String>,
    auth: Option<AuthTokens>,
    token: Option<String>,
}

impl ReaderClient {
    /// Client for the default API server using `backend`.
    pub fn new(credentials: Credentials, backend: Backend) -> Result<Self, ApiError> {
        Self::with_config(credentials, &TransportConfig::default(), backend)
    }

    pub fn with_config(
        credentials: Credentials,
        config: &TransportConfig,
        backend: Backend,
    ) -> Result<Self, ApiError> {
        Ok(Self::with_transport(credentials, backend.build(config)?))
    }

    pub fn with_transport(credentials: Credentials, transport: Box<dyn Transport>) -> Self {
        Self {
            credentials,
            transport,
            api_key: None,
            auth: None,
            token: None,
        }
    }

    /// Route token requests to the `{key}.{host}` subdomain.
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string()).filter(|k| !k.is_empty());
        self
    }

    /// Replace the transport. Cached tokens are kept.
    pub fn set_backend(
        &mut self,
        backend: Backend,
        config: &TransportConfig,
    ) -> Result<(), ApiError> {
        self.transport = backend.build(config)?;
        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.transport.backend()
    }

    pub fn auth(&self) -> Option<&AuthTokens> {
        self.auth.as_ref()
    }

    /// Run the ClientLogin exchange and cache the returned tokens.
    pub fn login(&mut self) -> Result<&AuthTokens, ApiError> {
        let source = format!("{CLIENT_NAME}{CLIENT_VERSION}");
        let body = form_encode(&[
            ("accountType", "GOOGLE"),
            ("Email", self.credentials.username.as_str()),
            ("Passwd", self.credentials.password.as_str()),
            ("source", source.as_str()),
            ("service", "xapi"),
        ]);
        debug!(username = %self.credentials.username, "logging in");
        let reply = self.transport.post(CLIENT_LOGIN_PATH, &body, None)?;
        match LoginReply::parse(&reply) {
            LoginReply::Granted(tokens) => Ok(&*self.auth.insert(tokens)),
            LoginReply::Denied(reason) => Err(ApiError::AuthenticationFailed(
                reason.unwrap_or_else(|| "no Auth value in ClientLogin reply".to_string()),
            )),
        }
    }

    /// Fetch a fresh API token and cache it.
    pub fn get_token(&mut self) -> Result<String, ApiError> {
        let path = format!("{TOKEN_PATH}?client={CLIENT_NAME}");
        let reply = self.transport.post(&path, "", self.api_key.as_deref())?;
        let token = reply.trim();
        if token.is_empty() {
            return Err(ApiError::UnexpectedResponse("empty token".to_string()));
        }
        self.token = Some(token.to_string());
        Ok(token.to_string())
    }

    /// Subscribe the account to the feed at `feed_url`.
    pub fn subscribe(&mut self, feed_url: &str) -> Result<(), ApiError> {
        let token = match self.token.clone() {
            Some(token) => token,
            None => self.get_token()?,
        };
        let stream = format!("feed/{feed_url}");
        let body = form_encode(&[
            ("s", stream.as_str()),
            ("ac", "subscribe"),
            ("T", token.as_str()),
        ]);
        let reply = self.transport.post(SUBSCRIPTION_EDIT_PATH, &body, None)?;
        if reply.trim() == "OK" {
            Ok(())
        } else {
            // Tokens expire; the next call fetches a new one.
            self.token = None;
            Err(ApiError::UnexpectedResponse(reply))
        }
    }
}
