//! Single-connection TCP stubs for exercising HTTP framing byte by byte.
//!
//! Unlike the axum app these never speak HTTP properly: they answer with
//! exactly the bytes they are given, or hang up at a chosen point, and then
//! close the socket so a reader waiting for end-of-stream can finish.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener};
use std::thread::{self, JoinHandle};

/// What the stub does with its one connection.
#[derive(Debug, Clone)]
pub enum Script {
    /// Read the whole request, write these bytes, close.
    Reply(Vec<u8>),
    /// Read at most this many bytes of the request, then close with the
    /// rest unread.
    HangUpAfter(usize),
}

#[derive(Debug)]
pub struct RawStub {
    port: u16,
    handle: JoinHandle<io::Result<Vec<u8>>>,
}

impl RawStub {
    pub fn spawn(script: Script) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept()?;
            match script {
                Script::Reply(reply) => {
                    let request = read_request(&mut stream)?;
                    stream.write_all(&reply)?;
                    stream.flush()?;
                    let _ = stream.shutdown(Shutdown::Both);
                    Ok(request)
                }
                Script::HangUpAfter(limit) => {
                    let mut request = vec![0u8; limit];
                    let mut filled = 0;
                    while filled < limit {
                        let n = stream.read(&mut request[filled..])?;
                        if n == 0 {
                            break;
                        }
                        filled += n;
                    }
                    request.truncate(filled);
                    drop(stream);
                    Ok(request)
                }
            }
        });
        Ok(Self { port, handle })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the stub to finish and return the bytes it received.
    pub fn received(self) -> io::Result<Vec<u8>> {
        self.handle
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stub thread panicked"))?
    }
}

/// Read a request head plus as many body bytes as its `Content-Length` says.
fn read_request(stream: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        if let Some(head_end) = find_head_end(&received) {
            let length = content_length(&received[..head_end]);
            if received.len() >= head_end + length {
                return Ok(received);
            }
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(received);
        }
        received.extend_from_slice(&buf[..n]);
    }
}

fn find_head_end(received: &[u8]) -> Option<usize> {
    received.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0)
}
