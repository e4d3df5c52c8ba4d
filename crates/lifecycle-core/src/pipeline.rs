//! Renders a lifecycle into one message.
//!
//! For every node, in node order, the supporting renderers run in
//! registration order and produce fragments. Then every supporting
//! contributor is asked for actions on each fragment. Contributor calls for a
//! node run concurrently, each bounded by a timeout; their results are
//! attached in registration order regardless of completion order. A failing
//! or slow contributor only loses its own actions.

use crate::error::{LifecycleError, Result};
use crate::lifecycle::Lifecycle;
use crate::message::{Action, Fragment, MessageTarget, RenderedMessage};
use crate::node::LifecycleNode;
use crate::registry::{LifecycleRegistry, Visibility};
use crate::rendering::{ActionContributor, Enrichment, NoEnrichment, RendererContext};
use crate::types::RenderingStyle;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CONTRIBUTOR_TIMEOUT: Duration = Duration::from_millis(2000);

// ---------------------------------------------------------------------------
// RenderOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub style: RenderingStyle,
    /// Used when the repository does not name its default branch.
    pub default_branch: String,
    pub disabled_renderers: BTreeSet<String>,
    pub disabled_contributors: BTreeSet<String>,
    /// Team-scoped token handed to enrichment calls.
    pub auth_token: Option<String>,
    pub contributor_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            style: RenderingStyle::Full,
            default_branch: "master".to_string(),
            disabled_renderers: BTreeSet::new(),
            disabled_contributors: BTreeSet::new(),
            auth_token: None,
            contributor_timeout: DEFAULT_CONTRIBUTOR_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderingPipeline
// ---------------------------------------------------------------------------

pub struct RenderingPipeline<M: MessageTarget> {
    registry: LifecycleRegistry<M>,
    enrichment: Arc<dyn Enrichment>,
}

impl<M: MessageTarget> RenderingPipeline<M> {
    pub fn new(registry: LifecycleRegistry<M>) -> Self {
        Self {
            registry,
            enrichment: Arc::new(NoEnrichment),
        }
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub async fn render(&self, lifecycle: &Lifecycle, options: &RenderOptions) -> Result<RenderedMessage> {
        let contributions = self
            .registry
            .contributions(lifecycle.kind, Visibility::of(lifecycle.is_private()))
            .ok_or_else(|| LifecycleError::UnsupportedLifecycle(lifecycle.kind.to_string()))?;

        let renderers: Vec<_> = contributions
            .renderers
            .iter()
            .filter(|r| !options.disabled_renderers.contains(r.id()))
            .collect();
        let contributors: Vec<&dyn ActionContributor> = contributions
            .contributors
            .iter()
            .filter(|c| !options.disabled_contributors.contains(c.id()))
            .map(|c| c.as_ref())
            .collect();

        let base = RendererContext {
            lifecycle,
            renderer_id: "",
            auth_token: options.auth_token.as_deref(),
            enrichment: self.enrichment.as_ref(),
            style: options.style,
            default_branch: &options.default_branch,
        };

        let mut message = M::begin(lifecycle);
        for node in &lifecycle.nodes {
            let mut fragments: Vec<M::Fragment> = renderers
                .iter()
                .filter(|r| r.supports(node))
                .filter_map(|r| r.render(node, &base.for_renderer(r.id())))
                .collect();

            let supporting: Vec<&dyn ActionContributor> =
                contributors.iter().copied().filter(|c| c.supports(node)).collect();
            if !fragments.is_empty() && !supporting.is_empty() {
                let targets: Vec<String> = fragments.iter().map(|f| f.renderer_id().to_string()).collect();
                let calls = targets.iter().flat_map(|target| {
                    supporting
                        .iter()
                        .map(move |c| contribute(*c, node, base.for_renderer(target), options.contributor_timeout))
                });
                let results = join_all(calls).await;
                for (fragment, actions) in fragments.iter_mut().zip(results.chunks(supporting.len())) {
                    fragment.add_actions(actions.concat());
                }
            }

            for fragment in fragments {
                message.append(fragment);
            }
        }

        debug!(thread = %lifecycle.id, target = %M::TARGET, "rendered lifecycle");
        Ok(message.finish())
    }
}

/// Buttons then menus of one contributor for one fragment. Failures and
/// timeouts yield no actions.
async fn contribute(
    contributor: &dyn ActionContributor,
    node: &LifecycleNode,
    ctx: RendererContext<'_>,
    timeout: Duration,
) -> Vec<Action> {
    let work = async {
        let mut actions = contributor.buttons_for(node, &ctx).await?;
        actions.extend(contributor.menus_for(node, &ctx).await?);
        Ok::<_, LifecycleError>(actions)
    };
    let error = match tokio::time::timeout(timeout, work).await {
        Ok(Ok(actions)) => return actions,
        Ok(Err(e)) => LifecycleError::ContributorFailed {
            contributor: contributor.id().to_string(),
            reason: e.to_string(),
        },
        Err(_) => LifecycleError::ContributorTimedOut {
            contributor: contributor.id().to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        },
    };
    warn!(
        contributor = contributor.id(),
        target = ctx.renderer_id,
        thread = %ctx.lifecycle.id,
        error = %error,
        "omitting contributor actions"
    );
    Vec::new()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ThreadIdentity;
    use crate::message::{Attachment, CardMessage, ChatMessage};
    use crate::ordering::tests::{goal, push};
    use crate::registry::{default_card_registry, default_chat_registry, Contributions};
    use crate::rendering::NodeRenderer;
    use crate::sources::push_lifecycle;
    use crate::types::{GoalState, LifecycleKind};
    use async_trait::async_trait;

    fn approval_lifecycle() -> Lifecycle {
        let mut p = push();
        p.goals = vec![
            goal("build", "g1", 1, GoalState::Success),
            goal("deploy", "g1", 2, GoalState::WaitingForApproval),
        ];
        push_lifecycle(&p, &Default::default(), 1_700_000_000_000).unwrap()
    }

    struct Narrative;

    impl NodeRenderer<ChatMessage> for Narrative {
        fn id(&self) -> &'static str {
            "push"
        }

        fn supports(&self, node: &LifecycleNode) -> bool {
            matches!(node, LifecycleNode::Push(_))
        }

        fn render(&self, _node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Option<Attachment> {
            Some(Attachment::new("push", "narrative"))
        }
    }

    struct Fixed(&'static str, u64);

    #[async_trait]
    impl ActionContributor for Fixed {
        fn id(&self) -> &'static str {
            self.0
        }

        fn supports(&self, _node: &LifecycleNode) -> bool {
            true
        }

        async fn buttons_for(&self, _node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
            tokio::time::sleep(Duration::from_millis(self.1)).await;
            Ok(vec![Action::button(self.0, "Noop")])
        }
    }

    struct Failing;

    #[async_trait]
    impl ActionContributor for Failing {
        fn id(&self) -> &'static str {
            "failing"
        }

        fn supports(&self, _node: &LifecycleNode) -> bool {
            true
        }

        async fn buttons_for(&self, _node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
            Err(LifecycleError::IncompleteEvent("lookup failed".into()))
        }
    }

    fn pipeline(contributions: Contributions<ChatMessage>) -> RenderingPipeline<ChatMessage> {
        RenderingPipeline::new(
            LifecycleRegistry::new()
                .register(LifecycleKind::Push, Visibility::Public, contributions.clone())
                .register(LifecycleKind::Push, Visibility::Private, contributions),
        )
    }

    fn texts(message: &RenderedMessage) -> Vec<String> {
        message.actions().iter().map(|a| a.text.clone()).collect()
    }

    #[tokio::test]
    async fn render_is_deterministic() {
        let lc = approval_lifecycle();
        let pipeline = RenderingPipeline::new(default_chat_registry());
        let options = RenderOptions::default();
        let first = serde_json::to_string(&pipeline.render(&lc, &options).await.unwrap()).unwrap();
        let second = serde_json::to_string(&pipeline.render(&lc, &options).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn approve_action_lands_on_goals_fragment() {
        let lc = approval_lifecycle();
        let message = RenderingPipeline::new(default_chat_registry())
            .render(&lc, &RenderOptions::default())
            .await
            .unwrap();
        let RenderedMessage::Chat(chat) = message else {
            panic!("expected chat message");
        };
        let goals = chat.attachments.iter().find(|a| a.renderer_id == "goals").unwrap();
        let texts: Vec<&str> = goals.actions.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["Approve _deploy_", "Cancel"]);
        let commit = chat.attachments.iter().find(|a| a.renderer_id == "commit").unwrap();
        assert_eq!(commit.actions[0].text, "Tag");
    }

    #[tokio::test]
    async fn failing_contributor_is_isolated() {
        let contributions = Contributions::new()
            .renderer(Narrative)
            .contributor(Fixed("first", 0))
            .contributor(Failing)
            .contributor(Fixed("last", 0));
        let message = pipeline(contributions)
            .render(&approval_lifecycle(), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(message.fragment_count(), 1);
        assert_eq!(texts(&message), vec!["first", "last"]);
    }

    #[tokio::test]
    async fn slow_contributor_times_out() {
        let contributions = Contributions::new()
            .renderer(Narrative)
            .contributor(Fixed("slow", 5_000))
            .contributor(Fixed("fast", 0));
        let options = RenderOptions {
            contributor_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let message = pipeline(contributions)
            .render(&approval_lifecycle(), &options)
            .await
            .unwrap();
        assert_eq!(texts(&message), vec!["fast"]);
    }

    #[tokio::test]
    async fn actions_follow_declaration_not_completion_order() {
        let contributions = Contributions::new()
            .renderer(Narrative)
            .contributor(Fixed("a", 40))
            .contributor(Fixed("b", 0));
        let message = pipeline(contributions)
            .render(&approval_lifecycle(), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(texts(&message), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn disabled_ids_are_skipped() {
        let lc = approval_lifecycle();
        let options = RenderOptions {
            disabled_renderers: ["commit".to_string()].into_iter().collect(),
            disabled_contributors: ["approve_goal".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let message = RenderingPipeline::new(default_chat_registry())
            .render(&lc, &options)
            .await
            .unwrap();
        assert!(texts(&message).iter().all(|t| !t.starts_with("Approve")));
        let RenderedMessage::Chat(chat) = message else {
            panic!("expected chat message");
        };
        assert!(chat.attachments.iter().all(|a| a.renderer_id != "commit"));
    }

    #[tokio::test]
    async fn card_carries_repository_and_timestamp() {
        let lc = approval_lifecycle();
        let message = RenderingPipeline::<CardMessage>::new(default_card_registry())
            .render(&lc, &RenderOptions::default())
            .await
            .unwrap();
        let RenderedMessage::Card(card) = message else {
            panic!("expected card message");
        };
        assert_eq!(card.repository.slug, "acme/widgets");
        assert_eq!(card.ts, 1_700_000_000_000);
        assert_eq!(card.sections[0].renderer_id, "push");
        assert_eq!(lc.id, ThreadIdentity::new("push_lifecycle/acme/widgets/main/abc123"));
    }

    #[tokio::test]
    async fn unregistered_kind_is_an_error() {
        let lc = approval_lifecycle();
        let result = RenderingPipeline::<ChatMessage>::new(LifecycleRegistry::new())
            .render(&lc, &RenderOptions::default())
            .await;
        assert!(matches!(result, Err(LifecycleError::UnsupportedLifecycle(_))));
    }
}
