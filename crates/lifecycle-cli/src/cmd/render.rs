use crate::output::{print_json, print_table};
use crate::settings::{load_config, read_event};
use anyhow::Context;
use lifecycle_core::dispatch::LogGateway;
use lifecycle_core::rendering::StaticEnrichment;
use lifecycle_core::types::RenderTarget;
use lifecycle_core::LifecycleEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct RenderArgs {
    pub event: PathBuf,
    pub card: bool,
    pub timestamp: Option<i64>,
    pub enrichment: Option<PathBuf>,
    pub dispatch: bool,
}

pub fn run(config_path: Option<&Path>, args: RenderArgs, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if args.card {
        config.rendering.target = RenderTarget::Card;
    }

    let mut event = read_event(&args.event)?;
    if args.timestamp.is_some() {
        event.timestamp = args.timestamp;
    }

    let mut engine = if args.dispatch {
        LifecycleEngine::from_config(config)?
    } else {
        LifecycleEngine::new(config, Arc::new(LogGateway))
    };
    if let Some(path) = &args.enrichment {
        let data = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let enrichment: StaticEnrichment =
            serde_json::from_str(&data).with_context(|| format!("invalid enrichment in {}", path.display()))?;
        engine = engine.with_enrichment(Arc::new(enrichment));
    }

    let rt = tokio::runtime::Runtime::new()?;
    if args.dispatch {
        let report = rt.block_on(engine.handle(&event))?;
        if json {
            return print_json(&report);
        }
        print_table(&report.outcomes, report.skipped);
        return Ok(());
    }

    let target = engine.config().rendering.target;
    let report = rt.block_on(engine.render(&event, target))?;
    print_json(&report)
}
