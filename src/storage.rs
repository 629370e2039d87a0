//! Investigation persistence
//!
//! Finished investigations can be written out for later review. Storage
//! failures are logged by the orchestrator but never fail a request.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::types::WalletInvestigation;

#[async_trait]
pub trait InvestigationStore: Send + Sync {
    async fn store(&self, investigation: &WalletInvestigation) -> Result<()>;
}

/// One pretty-printed JSON file per investigation under a base directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, investigation: &WalletInvestigation) -> PathBuf {
        let name = format!(
            "{}_{}_{}.json",
            investigation.chain,
            sanitize(&investigation.address),
            investigation.investigated_at.format("%Y%m%dT%H%M%S")
        );
        self.dir.join(name)
    }
}

/// Keep only filesystem-safe characters from an address
fn sanitize(address: &str) -> String {
    address
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[async_trait]
impl InvestigationStore for JsonFileStore {
    async fn store(&self, investigation: &WalletInvestigation) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(investigation)?;
        tokio::fs::write(self.file_path(investigation), body).await?;
        Ok(())
    }
}

/// In-memory store for tests and ad-hoc batch runs
#[derive(Default)]
pub struct MemoryStore {
    investigations: Mutex<Vec<WalletInvestigation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<WalletInvestigation> {
        self.investigations.lock().await.clone()
    }
}

#[async_trait]
impl InvestigationStore for MemoryStore {
    async fn store(&self, investigation: &WalletInvestigation) -> Result<()> {
        self.investigations.lock().await.push(investigation.clone());
        Ok(())
    }
}
