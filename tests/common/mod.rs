//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use service_host::config::AppConfig;
use service_host::resources::{Resource, ResourceError};
use tokio::net::TcpStream;

/// Ordered log of resource calls shared by several recorders.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A resource that records opens and closes, optionally failing to open.
pub struct Recorder {
    name: &'static str,
    journal: Journal,
    fail_open: bool,
}

impl Recorder {
    pub fn new(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            fail_open: false,
        })
    }

        pub fn failing(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            fail_open: true,
        })
    }
}

#[async_trait]
impl Resource for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn open(&self, config: &AppConfig) -> Result<(), ResourceError> {
        self.journal.push(format!("open {}", self.name));
        if self.fail_open {
            return Err(ResourceError::Unavailable {
                resource: self.name,
                reason: format!("{} unreachable", config.mysql.host),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ResourceError> {
        self.journal.push(format!("close {}", self.name));
        Ok(())
    }
}

/// Minimal valid TOML config listening on `port`.
pub fn config_toml(port: u16, shutdown_timeout_secs: u64) -> String {
    format!(
        r#"
[app]
name = "svc"
host = "127.0.0.1"
port = {port}
shutdown_timeout_secs = {shutdown_timeout_secs}

[mysql]
host = "db"
user = "root"
dbname = "app"
max_open = 10

[redis]
host = "cache"
db = 0
"#
    )
}

/// Write `body` as `config.toml` inside `dir`.
pub fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

/// Wait until something accepts connections on `addr`.
pub async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("nothing listening on {addr}");
}

/// Poll `check` until it returns true or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}
