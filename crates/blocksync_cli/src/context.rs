//! Settings shared by every command.

use blocksync_client::{ClientConfig, RemoteClient, ReqwestClient};
use blocksync_engine::{
    EngineConfig, PullManager, PushManager, PushTarget, QualityGate, SyncStateStore,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Resolved command-line settings.
pub struct Context {
    config: EngineConfig,
    api_key: Option<String>,
}

impl Context {
    /// Builds the engine configuration from global flags.
    pub fn new(
        docs_dir: PathBuf,
        state_file: Option<PathBuf>,
        database_id: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        let target = match database_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => PushTarget::Database(id),
            None => PushTarget::CategoryPages,
        };
        let mut config = EngineConfig::new(docs_dir, target);
        if let Some(state_file) = state_file {
            config = config.with_state_file(state_file);
        }
        debug!(
            docs_dir = %config.docs_dir.display(),
            state_file = %config.state_file.display(),
            target = ?config.target,
            "resolved settings"
        );
        Self { config, api_key }
    }

    /// Disables the push quality gate.
    pub fn without_quality_gate(mut self) -> Self {
        self.config = self.config.with_quality(QualityGate::disabled());
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens the sync state file.
    pub fn open_store(&self) -> CmdResult<SyncStateStore> {
        if !self.config.docs_dir.is_dir() {
            return Err(format!("Docs directory not found: {:?}", self.config.docs_dir).into());
        }
        Ok(SyncStateStore::open(
            &self.config.state_file,
            &self.config.docs_dir,
        )?)
    }

    /// Builds a push and a pull manager sharing one client and store.
    pub fn managers(
        &self,
    ) -> CmdResult<(PushManager<ReqwestClient>, PullManager<ReqwestClient>)> {
        let api_key = self
            .api_key
            .clone()
            .ok_or("Notion API key required (--api-key or NOTION_API_KEY)")?;
        let client = Arc::new(RemoteClient::connect(ClientConfig::new(api_key))?);
        let store = Arc::new(Mutex::new(self.open_store()?));
        let push = PushManager::new(self.config.clone(), client.clone(), store.clone());
        let pull = PullManager::new(self.config.clone(), client, store);
        Ok((push, pull))
    }
}
