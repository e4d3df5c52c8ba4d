//! Event → lifecycles → rendered messages → dispatch.

use crate::config::Config;
use crate::dispatch::{DeliveryGateway, DispatchOutcome, HttpGateway, LifecycleDispatcher, LogGateway};
use crate::error::{LifecycleError, Result};
use crate::lifecycle::{Channel, Lifecycle, ThreadIdentity};
use crate::message::{CardMessage, ChatMessage, RenderedMessage};
use crate::pipeline::{RenderOptions, RenderingPipeline};
use crate::preferences::{group_by_preferences, ChannelPreferences, TeamPreferences};
use crate::registry::{default_card_registry, default_chat_registry};
use crate::rendering::Enrichment;
use crate::sources::DomainEvent;
use crate::types::{LifecycleKind, RenderTarget};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One message rendered for a group of channels sharing preferences.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedGroup {
    pub thread: ThreadIdentity,
    pub kind: LifecycleKind,
    pub channels: Vec<Channel>,
    pub timestamp: i64,
    pub message: RenderedMessage,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderReport {
    pub rendered: Vec<RenderedGroup>,
    /// Roots that were incomplete and produced no lifecycle.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub thread: ThreadIdentity,
    pub channels: Vec<Channel>,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HandleReport {
    pub rendered: usize,
    pub skipped: usize,
    pub outcomes: Vec<DispatchRecord>,
}

// ---------------------------------------------------------------------------
// LifecycleEngine
// ---------------------------------------------------------------------------

pub struct LifecycleEngine {
    config: Config,
    chat: RenderingPipeline<ChatMessage>,
    card: RenderingPipeline<CardMessage>,
    dispatcher: LifecycleDispatcher,
}

impl LifecycleEngine {
    pub fn new(config: Config, gateway: Arc<dyn DeliveryGateway>) -> Self {
        let dispatcher = LifecycleDispatcher::new(gateway, config.delivery.ttl.policy());
        Self {
            config,
            chat: RenderingPipeline::new(default_chat_registry()),
            card: RenderingPipeline::new(default_card_registry()),
            dispatcher,
        }
    }

    /// Engine with the gateway named by `delivery.gateway_url`, or one that
    /// only logs when no URL is configured.
    pub fn from_config(config: Config) -> Result<Self> {
        let gateway: Arc<dyn DeliveryGateway> = match &config.delivery.gateway_url {
            Some(url) => Arc::new(HttpGateway::new(url.clone(), config.enrichment.timeout() * 5)?),
            None => Arc::new(LogGateway),
        };
        Ok(Self::new(config, gateway))
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.chat = self.chat.with_enrichment(enrichment.clone());
        self.card = self.card.with_enrichment(enrichment);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the lifecycles of an event. Incomplete roots are counted, not
    /// returned.
    pub fn lifecycles(&self, event: &DomainEvent) -> Result<(Vec<Lifecycle>, usize)> {
        let timestamp = event
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        let mut lifecycles = Vec::new();
        let mut skipped = 0;
        for result in event.lifecycles(timestamp) {
            match result {
                Ok(lifecycle) => lifecycles.push(lifecycle),
                Err(LifecycleError::IncompleteEvent(reason)) => {
                    debug!(kind = %event.subject.kind(), reason = %reason, "skipping incomplete event");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok((lifecycles, skipped))
    }

    /// Render every lifecycle of `event`, one message per preference group.
    pub async fn render(&self, event: &DomainEvent, target: RenderTarget) -> Result<RenderReport> {
        let (lifecycles, skipped) = self.lifecycles(event)?;
        let mut rendered = Vec::new();
        for lifecycle in &lifecycles {
            for (prefs, channels) in preference_groups(lifecycle, &event.preferences) {
                let options = self.options(&prefs, event.auth_token.clone());
                let message = match target {
                    RenderTarget::Chat => self.chat.render(lifecycle, &options).await?,
                    RenderTarget::Card => self.card.render(lifecycle, &options).await?,
                };
                rendered.push(RenderedGroup {
                    thread: lifecycle.id.clone(),
                    kind: lifecycle.kind,
                    channels,
                    timestamp: lifecycle.timestamp,
                    message,
                });
            }
        }
        Ok(RenderReport { rendered, skipped })
    }

    /// Render with the configured target and dispatch every message. The
    /// first delivery failure fails the event.
    pub async fn handle(&self, event: &DomainEvent) -> Result<HandleReport> {
        let report = self.render(event, self.config.rendering.target).await?;
        let mut outcomes = Vec::with_capacity(report.rendered.len());
        for group in &report.rendered {
            let outcome = self
                .dispatcher
                .dispatch(&group.thread, group.kind, &group.message, &group.channels, group.timestamp)
                .await?;
            outcomes.push(DispatchRecord {
                thread: group.thread.clone(),
                channels: group.channels.clone(),
                outcome,
            });
        }
        info!(
            kind = %event.subject.kind(),
            rendered = report.rendered.len(),
            skipped = report.skipped,
            "event handled"
        );
        Ok(HandleReport {
            rendered: report.rendered.len(),
            skipped: report.skipped,
            outcomes,
        })
    }

    fn options(&self, prefs: &ChannelPreferences, auth_token: Option<String>) -> RenderOptions {
        RenderOptions {
            style: prefs.style.unwrap_or(self.config.rendering.style),
            default_branch: self.config.rendering.default_branch.clone(),
            disabled_renderers: prefs.disabled_renderers.clone(),
            disabled_contributors: prefs.disabled_contributors.clone(),
            auth_token,
            contributor_timeout: self.config.enrichment.timeout(),
        }
    }
}

/// A lifecycle without channels still renders once with default settings.
fn preference_groups(lifecycle: &Lifecycle, prefs: &TeamPreferences) -> Vec<(ChannelPreferences, Vec<Channel>)> {
    if lifecycle.channels.is_empty() {
        return vec![(ChannelPreferences::default(), Vec::new())];
    }
    group_by_preferences(&lifecycle.channels, prefs, lifecycle.kind)
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DeliveryMode, DeliveryRequest};
    use crate::model::{Push, RepoChannel};
    use crate::ordering::tests::{goal, push};
    use crate::preferences::{Preference, LIFECYCLE_PREFERENCES};
    use crate::sources::EventSubject;
    use crate::types::{GoalState, RenderingStyle};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<DeliveryRequest>>,
    }

    #[async_trait]
    impl DeliveryGateway for Recording {
        async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn routed_push() -> Push {
        let mut p = push();
        if let Some(repo) = p.repo.as_mut() {
            repo.channels = vec![
                RepoChannel {
                    name: "dev".into(),
                    team_id: "T1".into(),
                },
                RepoChannel {
                    name: "ops".into(),
                    team_id: "T1".into(),
                },
            ];
        }
        p.goals = vec![goal("deploy", "g1", 2, GoalState::WaitingForApproval)];
        p
    }

    fn event(pushes: Vec<Push>, preferences: TeamPreferences) -> DomainEvent {
        DomainEvent {
            subject: EventSubject::Push { pushes },
            preferences,
            auth_token: None,
            timestamp: Some(1_700_000_000_000),
        }
    }

    #[tokio::test]
    async fn handle_delivers_once_per_thread() {
        let gateway = Arc::new(Recording::default());
        let engine = LifecycleEngine::new(Config::default(), gateway.clone());
        let ev = event(vec![routed_push()], TeamPreferences::new());

        let report = engine.handle(&ev).await.unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.outcomes[0].outcome, DispatchOutcome::Delivered { mode: DeliveryMode::Post });
        assert_eq!(report.outcomes[0].channels.len(), 2);

        let again = engine.handle(&ev).await.unwrap();
        assert_eq!(again.outcomes[0].outcome, DispatchOutcome::Unchanged);
        assert_eq!(gateway.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn incomplete_pushes_are_skipped() {
        let engine = LifecycleEngine::new(Config::default(), Arc::new(Recording::default()));
        let mut empty = push();
        empty.commits.clear();
        let report = engine.handle(&event(vec![empty], TeamPreferences::new())).await.unwrap();
        assert_eq!(report.rendered, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn channels_split_by_preferences() {
        let mut prefs = TeamPreferences::new();
        prefs.insert(
            "T1".into(),
            vec![Preference::new(
                LIFECYCLE_PREFERENCES,
                r#"{"ops": {"push": {"rendering_style": "compact", "contributors": {"approve_goal": false}}}}"#,
            )],
        );
        let engine = LifecycleEngine::new(Config::default(), Arc::new(Recording::default()));
        let report = engine
            .render(&event(vec![routed_push()], prefs), RenderTarget::Chat)
            .await
            .unwrap();

        assert_eq!(report.rendered.len(), 2);
        let (with_approve, without): (Vec<_>, Vec<_>) = report
            .rendered
            .iter()
            .partition(|g| g.message.actions().iter().any(|a| a.text.starts_with("Approve")));
        assert_eq!(with_approve.len(), 1);
        assert_eq!(with_approve[0].channels, vec![Channel::new("dev", "T1")]);
        assert_eq!(without[0].channels, vec![Channel::new("ops", "T1")]);
    }

    #[tokio::test]
    async fn card_target_from_config() {
        let mut config = Config::default();
        config.rendering.target = RenderTarget::Card;
        config.rendering.style = RenderingStyle::Compact;
        let gateway = Arc::new(Recording::default());
        let engine = LifecycleEngine::new(config, gateway.clone());
        engine
            .handle(&event(vec![routed_push()], TeamPreferences::new()))
            .await
            .unwrap();
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].message.target(), RenderTarget::Card);
    }

    #[tokio::test]
    async fn unrouted_lifecycle_renders_but_is_not_dispatched() {
        let gateway = Arc::new(Recording::default());
        let engine = LifecycleEngine::new(Config::default(), gateway.clone());
        let report = engine.handle(&event(vec![push()], TeamPreferences::new())).await.unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.outcomes[0].outcome, DispatchOutcome::NoChannels);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }
}
