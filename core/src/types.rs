//! Request and response values for the Reader API client.
//!
//! # Design
//! The transport only ever sees a path and an already-encoded body, so form
//! encoding and reply parsing live here with the client that needs them.

use std::collections::HashMap;
use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in form values: ASCII alphanumerics and `-._~`.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Account credentials for ClientLogin.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Values returned by a successful ClientLogin exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub sid: Option<String>,
    pub lsid: Option<String>,
    pub auth: String,
}

/// Outcome of parsing a ClientLogin reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    Granted(AuthTokens),
    /// No `Auth` line; holds the `Error` value if the server sent one.
    Denied(Option<String>),
}

impl LoginReply {
    /// Parse the `key=value` lines of a ClientLogin reply.
    pub fn parse(body: &str) -> Self {
        let mut fields: HashMap<&str, &str> = body
            .lines()
            .filter_map(|line| line.trim().split_once('='))
            .collect();
        match fields.remove("Auth").filter(|v| !v.is_empty()) {
            Some(auth) => LoginReply::Granted(AuthTokens {
                sid: fields.remove("SID").map(str::to_string),
                lsid: fields.remove("LSID").map(str::to_string),
                auth: auth.to_string(),
            }),
            None => LoginReply::Denied(fields.remove("Error").map(str::to_string)),
        }
    }
}

/// Encode `pairs` as an `application/x-www-form-urlencoded` body.
pub fn form_encode(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, FORM_VALUE),
                utf8_percent_encode(value, FORM_VALUE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
