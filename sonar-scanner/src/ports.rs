// TCP connect port scanning

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// The well-known ports probed when no explicit list is configured
pub const TOP_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1723, 3306, 3389, 5900,
    8080, 8443,
];

/// Connect-scan a host over a fixed port list.
///
/// Attempts run through a bounded sub-pool of `concurrency` connections per
/// host, so a job probing many targets at once never fans out to
/// `targets * ports` simultaneous sockets.
#[derive(Debug, Clone)]
pub struct PortScanner {
    ports: Vec<u16>,
    connect_timeout: Duration,
    concurrency: usize,
}

impl PortScanner {
    pub fn new() -> Self {
        Self {
            ports: TOP_PORTS.to_vec(),
            connect_timeout: Duration::from_secs(1),
            concurrency: 8,
        }
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Return the open ports of `host`, ascending.
    pub async fn scan(&self, host: &str) -> Vec<u16> {
        let connect_timeout = self.connect_timeout;

        let mut open: Vec<u16> = stream::iter(self.ports.iter().copied())
            .map(|port| async move {
                match timeout(connect_timeout, TcpStream::connect((host, port))).await {
                    Ok(Ok(_stream)) => Some(port),
                    Ok(Err(e)) => {
                        debug!("{}:{} closed: {}", host, port, e);
                        None
                    }
                    Err(_) => {
                        debug!("{}:{} timed out", host, port);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|port| async move { port })
            .collect()
            .await;

        open.sort_unstable();
        open.dedup();
        open
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Grab a port that nothing is listening on
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_finds_open_ports_sorted() {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let first_port = first.local_addr().unwrap().port();
        let second_port = second.local_addr().unwrap().port();
        let closed = closed_port().await;

        let scanner = PortScanner::new()
            .with_ports(vec![second_port, closed, first_port])
            .with_connect_timeout(Duration::from_millis(500));

        let open = scanner.scan("127.0.0.1").await;

        let mut expected = vec![first_port, second_port];
        expected.sort_unstable();
        assert_eq!(open, expected);
    }

    #[tokio::test]
    async fn test_unresolvable_host_has_no_open_ports() {
        let scanner = PortScanner::new()
            .with_ports(vec![80, 443])
            .with_connect_timeout(Duration::from_millis(200));

        assert!(scanner.scan("nonexistent.invalid").await.is_empty());
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let scanner = PortScanner::new().with_concurrency(0);
        assert_eq!(scanner.concurrency, 1);
        assert_eq!(scanner.ports(), TOP_PORTS);
    }
}
