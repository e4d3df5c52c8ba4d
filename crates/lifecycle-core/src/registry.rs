//! Ordered renderer and contributor lists per lifecycle kind.
//!
//! Registration order is rendering order: renderers run in list order for
//! every node, and contributor actions are concatenated in list order.

use crate::contributors::{issue, pull_request, push, review};
use crate::message::{CardMessage, ChatMessage, MessageTarget};
use crate::rendering::{card, chat, ActionContributor, NodeRenderer};
use crate::types::LifecycleKind;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn of(private: bool) -> Self {
        if private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

// ---------------------------------------------------------------------------
// Contributions
// ---------------------------------------------------------------------------

pub struct Contributions<M: MessageTarget> {
    pub renderers: Vec<Arc<dyn NodeRenderer<M>>>,
    pub contributors: Vec<Arc<dyn ActionContributor>>,
}

impl<M: MessageTarget> Contributions<M> {
    pub fn new() -> Self {
        Self {
            renderers: Vec::new(),
            contributors: Vec::new(),
        }
    }

    pub fn renderer(mut self, renderer: impl NodeRenderer<M> + 'static) -> Self {
        self.renderers.push(Arc::new(renderer));
        self
    }

    pub fn contributor(mut self, contributor: impl ActionContributor + 'static) -> Self {
        self.contributors.push(Arc::new(contributor));
        self
    }

    pub fn renderer_ids(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.id()).collect()
    }

    pub fn contributor_ids(&self) -> Vec<&'static str> {
        self.contributors.iter().map(|c| c.id()).collect()
    }
}

impl<M: MessageTarget> Default for Contributions<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MessageTarget> Clone for Contributions<M> {
    fn clone(&self) -> Self {
        Self {
            renderers: self.renderers.clone(),
            contributors: self.contributors.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleRegistry
// ---------------------------------------------------------------------------

pub struct LifecycleRegistry<M: MessageTarget> {
    entries: BTreeMap<(LifecycleKind, Visibility), Contributions<M>>,
}

impl<M: MessageTarget> LifecycleRegistry<M> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn register(mut self, kind: LifecycleKind, visibility: Visibility, contributions: Contributions<M>) -> Self {
        self.entries.insert((kind, visibility), contributions);
        self
    }

    /// Register for public repositories and the reduced set for private ones.
    pub fn register_both(self, kind: LifecycleKind, public: Contributions<M>, private: Contributions<M>) -> Self {
        self.register(kind, Visibility::Public, public)
            .register(kind, Visibility::Private, private)
    }

    pub fn contributions(&self, kind: LifecycleKind, visibility: Visibility) -> Option<&Contributions<M>> {
        self.entries.get(&(kind, visibility))
    }
}

impl<M: MessageTarget> Default for LifecycleRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MessageTarget> Clone for LifecycleRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn push_contributors<M: MessageTarget>(contributions: Contributions<M>, private: bool) -> Contributions<M> {
    let contributions = if private {
        contributions
    } else {
        contributions
            .contributor(push::TagPushContributor)
            .contributor(push::TagTagContributor)
            .contributor(push::ReleaseContributor)
            .contributor(push::RaisePullRequestContributor)
    };
    contributions
        .contributor(push::ApproveGoalContributor)
        .contributor(push::DisplayGoalContributor)
        .contributor(push::ApplicationContributor)
}

fn issue_contributors<M: MessageTarget>(contributions: Contributions<M>) -> Contributions<M> {
    contributions
        .contributor(issue::CommentContributor)
        .contributor(issue::AssignToMeContributor)
        .contributor(issue::ReopenContributor)
        .contributor(issue::CloseContributor)
}

fn pull_request_contributors<M: MessageTarget>(contributions: Contributions<M>) -> Contributions<M> {
    contributions
        .contributor(pull_request::MergeContributor)
        .contributor(pull_request::CommentContributor)
        .contributor(pull_request::ApproveContributor)
}

pub fn default_chat_registry() -> LifecycleRegistry<ChatMessage> {
    let push_renderers = Contributions::new()
        .renderer(chat::PushRenderer)
        .renderer(chat::CommitRenderer)
        .renderer(chat::GoalSetRenderer)
        .renderer(chat::StatusesRenderer)
        .renderer(chat::WorkflowRenderer)
        .renderer(chat::TagRenderer)
        .renderer(chat::BuildRenderer)
        .renderer(chat::ApplicationRenderer);
    let issue_renderers = Contributions::new()
        .renderer(chat::IssueRenderer)
        .renderer(chat::CommentRenderer);
    let pr_renderers = Contributions::new()
        .renderer(chat::PullRequestRenderer)
        .renderer(chat::BuildRenderer)
        .renderer(chat::StatusRenderer)
        .renderer(chat::ReviewRenderer);
    let review_renderers = Contributions::new().renderer(chat::ReviewRenderer);

    LifecycleRegistry::new()
        .register_both(
            LifecycleKind::Push,
            push_contributors(push_renderers.clone(), false),
            push_contributors(push_renderers, true),
        )
        .register_both(
            LifecycleKind::Issue,
            issue_contributors(issue_renderers.clone()),
            issue_renderers,
        )
        .register_both(
            LifecycleKind::PullRequest,
            pull_request_contributors(pr_renderers.clone()),
            pr_renderers,
        )
        .register_both(
            LifecycleKind::Review,
            review_renderers.clone().contributor(review::CommentContributor),
            review_renderers,
        )
}

pub fn default_card_registry() -> LifecycleRegistry<CardMessage> {
    let push_renderers = Contributions::new()
        .renderer(card::PushCardRenderer)
        .renderer(card::commit())
        .renderer(card::GoalSetCardRenderer)
        .renderer(card::tag())
        .renderer(card::build())
        .renderer(card::application());
    let issue_renderers = Contributions::new().renderer(card::issue());
    let pr_renderers = Contributions::new()
        .renderer(card::pull_request())
        .renderer(card::build())
        .renderer(card::review());
    let review_renderers = Contributions::new().renderer(card::review());

    LifecycleRegistry::new()
        .register_both(
            LifecycleKind::Push,
            push_contributors(push_renderers.clone(), false),
            push_contributors(push_renderers, true),
        )
        .register_both(
            LifecycleKind::Issue,
            issue_contributors(issue_renderers.clone()),
            issue_renderers,
        )
        .register_both(
            LifecycleKind::PullRequest,
            pull_request_contributors(pr_renderers.clone()),
            pr_renderers,
        )
        .register_both(
            LifecycleKind::Review,
            review_renderers.clone().contributor(review::CommentContributor),
            review_renderers,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_push_gets_reduced_contributors() {
        let registry = default_chat_registry();
        let public = registry
            .contributions(LifecycleKind::Push, Visibility::Public)
            .unwrap();
        assert_eq!(
            public.contributor_ids(),
            vec![
                "new_tag",
                "tag",
                "release",
                "raise_pullrequest",
                "approve_goal",
                "display_goals",
                "cf_application"
            ]
        );
        let private = registry
            .contributions(LifecycleKind::Push, Visibility::Private)
            .unwrap();
        assert_eq!(private.contributor_ids(), vec!["approve_goal", "display_goals", "cf_application"]);
        assert_eq!(public.renderer_ids(), private.renderer_ids());
    }

    #[test]
    fn private_issue_has_no_contributors() {
        let registry = default_card_registry();
        let private = registry
            .contributions(LifecycleKind::Issue, Visibility::Private)
            .unwrap();
        assert!(private.contributors.is_empty());
        assert_eq!(private.renderer_ids(), vec!["issue"]);
    }

    #[test]
    fn every_kind_is_registered() {
        let chat = default_chat_registry();
        let card = default_card_registry();
        for kind in LifecycleKind::all() {
            for visibility in [Visibility::Public, Visibility::Private] {
                assert!(chat.contributions(*kind, visibility).is_some());
                assert!(card.contributions(*kind, visibility).is_some());
            }
        }
    }
}
