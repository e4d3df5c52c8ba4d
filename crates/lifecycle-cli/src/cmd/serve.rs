use crate::settings::load_config;
use lifecycle_core::LifecycleEngine;
use std::path::Path;
use std::sync::Arc;

pub fn run(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    for warning in config.validate() {
        tracing::warn!("config: {}", warning.message);
    }
    let port = port.unwrap_or(config.server.port);
    let engine = Arc::new(LifecycleEngine::from_config(config)?);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(lifecycle_server::serve(engine, port))
}
