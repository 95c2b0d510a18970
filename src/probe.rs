//! Upstream reachability probe.
//!
//! Answers "does the internet work right now?" with a single bounded
//! HTTPS request. Behind a captive portal the TLS connection to an
//! outside host fails or times out, so any transport-level failure maps
//! to `false`; nothing propagates past the boolean.

use std::time::Duration;

use tracing::debug;

use crate::config;

#[cfg_attr(test, mockall::automock)]
pub trait ReachabilityProbe: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Probes a fixed well-known HTTPS endpoint with a short timeout
pub struct HttpProbe {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_endpoint(config::PROBE_URL, Duration::from_secs(config::PROBE_TIMEOUT_SECS))
    }

    pub fn with_endpoint(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl ReachabilityProbe for HttpProbe {
    fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send() {
            Ok(response) => {
                debug!(status = %response.status(), "reachability probe succeeded");
                true
            }
            Err(err) => {
                debug!(%err, "reachability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn refused_connection_is_unreachable() {
        // Port 1 on loopback refuses immediately; no external traffic.
        let probe =
            HttpProbe::with_endpoint("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(!probe.is_reachable());
    }

    #[test]
    fn local_http_server_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream
                    .write_all(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\n\r\n");
            }
        });

        let probe = HttpProbe::with_endpoint(&format!("http://{addr}"), Duration::from_secs(2))
            .unwrap();
        assert!(probe.is_reachable());
        server.join().unwrap();
    }
}
