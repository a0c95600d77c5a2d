//! Raw TCP transport with hand-built HTTP/1.1 framing.
//!
//! # Design
//! The connection is an `Option<TcpStream>`: `Some` is the connected state,
//! so the state flag and the handle can never disagree. `post` connects
//! lazily, sends the framed request, reads until the server closes the
//! stream, and always leaves the transport disconnected. `Drop` runs the same
//! disconnect, which is a no-op once the stream is gone.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use tracing::{debug, trace};

use crate::config::{Backend, TransportConfig};
use crate::error::TransportError;
use crate::http;
use crate::transport::Transport;

const CHUNK_SIZE: usize = 4096;

/// Speaks HTTP/1.1 directly over `std::net::TcpStream`.
#[derive(Debug)]
pub struct SocketTransport {
    config: TransportConfig,
    connection: Option<TcpStream>,
}

impl SocketTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the TCP connection unless one is already held.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.connection.is_some() {
            return Ok(());
        }
        debug!(host = %self.config.host, port = self.config.port, "opening TCP connection");
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .map_err(|e| TransportError::from_io("unable to connect to API server", &e))?;
        self.connection = Some(stream);
        Ok(())
    }

    /// Read and discard whatever the server still has to send, then close.
    /// Safe to call any number of times.
    pub fn disconnect(&mut self) {
        let Some(mut stream) = self.connection.take() else {
            return;
        };
        let mut scratch = [0u8; CHUNK_SIZE];
        let mut discarded = 0usize;
        loop {
            match stream.read(&mut scratch) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        // The peer may already have reset the connection.
        let _ = stream.shutdown(Shutdown::Both);
        debug!(host = %self.config.host, discarded, "closed TCP connection");
    }

    /// Drop the stream without draining it. Used after a failed exchange,
    /// where the peer may never send end-of-stream.
    fn abandon(&mut self) {
        if let Some(stream) = self.connection.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(host = %self.config.host, "abandoned TCP connection");
        }
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let stream = self
            .connection
            .as_mut()
            .ok_or_else(|| TransportError::communication("not connected to API server"))?;

        stream
            .write_all(request)
            .map_err(|e| TransportError::from_io("unable to send request to API server", &e))?;
        stream
            .flush()
            .map_err(|e| TransportError::from_io("unable to send request to API server", &e))?;

        let mut response = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    trace!(bytes = n, "read response chunk");
                    response.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TransportError::from_io(
                        "error reading response from API server",
                        &e,
                    ))
                }
            }
        }
        Ok(response)
    }
}

impl Transport for SocketTransport {
    fn backend(&self) -> Backend {
        Backend::Sockets
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

        let host = http::effective_host(&self.config.host, subdomain_key);
        let request = http::encode_post_request(path, &host, &self.config.user_agent, body);
        debug!(%host, path, content_length = http::content_length(body), "sending POST");

        let payload = match self.exchange(&request) {
            Ok(raw) => http::split_response(&raw).map(<[u8]>::to_vec),
            Err(e) => Err(e),
        };
        match payload {
            Ok(payload) => {
                self.disconnect();
                http::body_to_string(payload)
            }
            Err(e) => {
                self.abandon();
                Err(e)
            }
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// One-shot server: reads the full request, writes `reply`, closes.
    fn serve_once(reply: &'static [u8]) -> (u16, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !request_complete(&received) {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            stream.write_all(reply).unwrap();
            received
        });
        (port, handle)
    }

    fn request_complete(received: &[u8]) -> bool {
        let head_end = http::split_response(received).map(|rest| received.len() - rest.len());
        let Ok(head_end) = head_end else {
            return false;
        };
        let head = String::from_utf8_lossy(&received[..head_end]);
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        received.len() - head_end >= length
    }

    fn transport(port: u16) -> SocketTransport {
        SocketTransport::new(TransportConfig::new("127.0.0.1", port, "X/1.0"))
    }

    #[test]
    fn post_returns_payload_only() {
        let (port, server) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length:5\r\n\r\nhello");
        let mut t = transport(port);
        assert_eq!(t.post("/reader/api/0/token", "a=1&b=2", None).unwrap(), "hello");
        assert!(!t.is_connected());

        let request = String::from_utf8(server.join().unwrap()).unwrap();
        assert!(request.starts_with("POST /reader/api/0/token HTTP/1.1\r\nHost: 127.0.0.1\r\n"));
        assert!(request.ends_with("\r\n\r\na=1&b=2"));
    }

    #[test]
    fn subdomain_key_goes_into_host_header() {
        let (port, server) = serve_once(b"HTTP/1.1 200 OK\r\n\r\nok");
        let mut t = transport(port);
        t.post("/x", "", Some("abc")).unwrap();
        let request = String::from_utf8(server.join().unwrap()).unwrap();
        assert!(request.contains("\r\nHost: abc.127.0.0.1\r\n"));
    }

    #[test]
    fn missing_separator_is_an_error() {
        let (port, server) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nhello");
        let mut t = transport(port);
        let err = t.post("/x", "a=1", None).unwrap_err();
        assert_eq!(err.to_string(), "invalid response returned by API server");
        assert!(!t.is_connected());
        server.join().unwrap();
    }

    #[test]
    fn connect_failure_carries_os_code() {
        // Bind then drop to get a port with nothing listening.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let mut t = transport(port);
        let err = t.post("/x", "", None).unwrap_err();
        assert!(err.to_string().starts_with("unable to connect to API server"));
        assert!(err.code().is_some());
        assert!(!t.is_connected());
    }

    #[test]
    fn connect_is_idempotent_and_disconnect_is_repeatable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut t = transport(port);

        t.connect().unwrap();
        let first = t.connection.as_ref().unwrap().local_addr().unwrap();
        t.connect().unwrap();
        let second = t.connection.as_ref().unwrap().local_addr().unwrap();
        assert_eq!(first, second);

        // Exactly one handshake reached the backlog.
        listener.set_nonblocking(true).unwrap();
        let (accepted, peer) = listener.accept().unwrap();
        assert_eq!(peer, first);
        assert_eq!(listener.accept().unwrap_err().kind(), ErrorKind::WouldBlock);
        drop(accepted);

        t.disconnect();
        assert!(!t.is_connected());
        t.disconnect();
        assert!(!t.is_connected());
    }

    #[test]
    fn malformed_subdomain_key_is_rejected_before_connecting() {
        let mut t = transport(9);
        let err = t.post("/x", "", Some("abc\r\nX-Injected: 1\r\nY")).unwrap_err();
        assert!(err.is_communication());
        assert!(!t.is_connected());
    }

    #[test]
    fn empty_path_is_rejected_before_connecting() {
        let mut t = transport(9);
        assert!(t.post("", "a=1", None).unwrap_err().is_communication());
        assert!(!t.is_connected());
    }
}
