use anyhow::Context;
use lifecycle_core::config::{Config, DEFAULT_CONFIG_FILE};
use lifecycle_core::sources::DomainEvent;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Load the engine config.
///
/// An explicit `--config` / `LIFECYCLE_CONFIG` path must exist; the default
/// `./lifecycle.yaml` falls back to built-in defaults when absent.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Config::load(path).context("failed to load config"),
        None => Config::load_or_default(&PathBuf::from(DEFAULT_CONFIG_FILE)).context("failed to load config"),
    }
}

/// Read a domain event from a file, or stdin for `-`.
pub fn read_event(path: &Path) -> anyhow::Result<DomainEvent> {
    let data = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&data).with_context(|| format!("invalid domain event in {}", path.display()))
}
