use crate::output::{channel_names, print_json, print_table, TableRow};
use crate::settings::read_event;
use lifecycle_core::lifecycle::{Channel, ThreadIdentity};
use lifecycle_core::types::LifecycleKind;
use lifecycle_core::LifecycleError;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Route {
    thread: ThreadIdentity,
    kind: LifecycleKind,
    channels: Vec<Channel>,
}

impl TableRow for Route {
    const HEADERS: &'static [&'static str] = &["THREAD", "KIND", "CHANNELS"];

    fn cells(&self) -> Vec<String> {
        vec![self.thread.to_string(), self.kind.to_string(), channel_names(&self.channels)]
    }
}

pub fn run(event_path: &Path, json: bool) -> anyhow::Result<()> {
    let event = read_event(event_path)?;
    let timestamp = event.timestamp.unwrap_or_default();

    let mut routes = Vec::new();
    let mut skipped = 0;
    for result in event.lifecycles(timestamp) {
        match result {
            Ok(lifecycle) => routes.push(Route {
                thread: lifecycle.id,
                kind: lifecycle.kind,
                channels: lifecycle.channels,
            }),
            Err(LifecycleError::IncompleteEvent(_)) => skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    if json {
        return print_json(&serde_json::json!({ "routes": routes, "skipped": skipped }));
    }

    print_table(&routes, skipped);
    Ok(())
}
