//! Raw HTTP/1.1 client helpers for driving a live server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use critter_server::WebServer;

/// A parsed response.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A persistent client connection.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let writer = stream.try_clone().unwrap();
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    /// Writes raw request bytes.
    pub fn send_raw(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).unwrap();
        self.writer.flush().unwrap();
    }

    /// Sends a bodyless HTTP/1.1 request and reads the response.
    pub fn get(&mut self, method: &str, target: &str) -> RawResponse {
        self.send_raw(&format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n"));
        self.read_response(method == "HEAD")
    }

    /// Reads one response. Bodies are framed by `Content-Length`.
    pub fn read_response(&mut self, head_only: bool) -> RawResponse {
        let mut status_line = String::new();
        self.reader.read_line(&mut status_line).unwrap();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .unwrap_or_else(|| panic!("bad status line {status_line:?}"))
            .parse()
            .unwrap();

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').unwrap();
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let length: usize = if head_only {
            0
        } else {
            headers
                .get("content-length")
                .map_or(0, |v| v.parse().unwrap())
        };
        let mut body = vec![0; length];
        self.reader.read_exact(&mut body).unwrap();

        RawResponse {
            status,
            headers,
            body: String::from_utf8(body).unwrap(),
        }
    }

    /// Reads until the server closes its side. Returns false if the read
    /// timed out or failed first.
    pub fn is_closed_by_peer(&mut self) -> bool {
        let mut buf = [0u8; 256];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return true,
                Ok(_) => continue,
                Err(e) => return e.kind() == std::io::ErrorKind::ConnectionReset,
            }
        }
    }
}

/// Binds an ephemeral loopback port.
pub fn server() -> WebServer {
    WebServer::bind("127.0.0.1:0").unwrap()
}

/// Polls `f` until it returns true or two seconds pass.
pub fn eventually(mut f: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}
