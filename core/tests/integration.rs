//! Reader API round trips through every library-backed transport.
//!
//! # Design
//! Starts the stub Reader server on a random port, then drives the full
//! login / token / subscribe sequence through `ReaderClient` for the
//! `streams` and `curl` backends. The socket backend reads until the server
//! closes the connection, which a keep-alive HTTP server never does, so it is
//! covered against the raw stubs in `socket.rs` instead.

use reader_core::{factory, ApiError, Backend, Credentials, ReaderClient, TransportConfig};

/// Start the stub server in a background thread and return its state handle
/// and port.
fn start_server() -> (mock_server::Db, u16) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = std_listener.local_addr().unwrap().port();
    std_listener.set_nonblocking(true).unwrap();

    let db = mock_server::Db::default();
    let server_db = db.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, server_db).await
        })
        .unwrap();
    });

    (db, port)
}

fn account() -> Credentials {
    Credentials::new(mock_server::ACCOUNT_EMAIL, mock_server::ACCOUNT_PASSWORD)
}

fn config(port: u16) -> TransportConfig {
    TransportConfig::new("127.0.0.1", port, "ReaderCoreTests/1.0")
}

fn subscriptions(db: &mock_server::Db) -> Vec<String> {
    db.blocking_read().subscriptions.clone()
}

fn hosts(db: &mock_server::Db) -> Vec<String> {
    db.blocking_read().hosts.clone()
}

fn full_session(backend: Backend) {
    let (db, port) = start_server();
    let mut client = ReaderClient::with_config(account(), &config(port), backend).unwrap();
    assert_eq!(client.backend(), backend);

    // Step 1: login.
    let auth = client.login().unwrap().auth.clone();
    assert_eq!(auth.len(), 32);
    assert!(db.blocking_read().auth_tokens.contains(&auth));

    // Step 2: token.
    let token = client.get_token().unwrap();
    assert!(db.blocking_read().api_tokens.contains(&token));

    // Step 3: subscribe with the cached token.
    client.subscribe("http://example.test/rss?a=1&b=2").unwrap();
    assert_eq!(
        subscriptions(&db),
        vec!["feed/http://example.test/rss?a=1&b=2".to_string()]
    );
}

#[test]
fn streams_session() {
    full_session(Backend::Streams);
}

#[test]
fn curl_session() {
    full_session(Backend::Curl);
}

#[test]
fn bad_credentials_fail_authentication() {
    let (_db, port) = start_server();
    for backend in [Backend::Streams, Backend::Curl] {
        let creds = Credentials::new(mock_server::ACCOUNT_EMAIL, "wrong");
        let mut client = ReaderClient::with_config(creds, &config(port), backend).unwrap();
        match client.login().unwrap_err() {
            ApiError::AuthenticationFailed(reason) => {
                assert_eq!(reason, "BadAuthentication", "{backend}")
            }
            other => panic!("{backend}: unexpected error {other}"),
        }
    }
}

#[test]
fn streams_send_subdomain_in_host_header() {
    let (db, port) = start_server();
    let client = ReaderClient::with_config(account(), &config(port), Backend::Streams).unwrap();
    let mut client = client.with_api_key("abc");
    client.get_token().unwrap();
    assert_eq!(hosts(&db), vec!["abc.127.0.0.1".to_string()]);
}

#[test]
fn streams_without_key_send_configured_host() {
    let (db, port) = start_server();
    let mut client = ReaderClient::with_config(account(), &config(port), Backend::Streams).unwrap();
    client.get_token().unwrap();
    assert_eq!(hosts(&db), vec!["127.0.0.1".to_string()]);
}

#[test]
fn streams_absolute_url_keeps_its_own_authority() {
    let (db, port) = start_server();
    let config = TransportConfig::new("reader.invalid", 80, "X/1.0");
    let mut transport = factory("streams", &config).unwrap();
    let url = format!("http://127.0.0.1:{port}/reader/api/0/token?client=x");
    assert!(!transport.post(&url, "", None).unwrap().is_empty());
    assert_eq!(hosts(&db), vec![format!("127.0.0.1:{port}")]);
}

#[test]
fn curl_sends_configured_host_and_port() {
    let (db, port) = start_server();
    let mut client = ReaderClient::with_config(account(), &config(port), Backend::Curl).unwrap();
    client.get_token().unwrap();
    assert_eq!(hosts(&db), vec![format!("127.0.0.1:{port}")]);
}

#[test]
fn switching_backend_keeps_session() {
    let (db, port) = start_server();
    let mut client = ReaderClient::with_config(account(), &config(port), Backend::Streams).unwrap();
    client.get_token().unwrap();

    client.set_backend(Backend::Curl, &config(port)).unwrap();
    assert_eq!(client.backend(), Backend::Curl);
    client.subscribe("http://example.test/atom").unwrap();

    // The token from the first backend was reused.
    assert_eq!(db.blocking_read().api_tokens.len(), 1);
    assert_eq!(subscriptions(&db).len(), 1);
}
