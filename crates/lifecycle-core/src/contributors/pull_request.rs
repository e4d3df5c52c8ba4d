use super::with_repo;
use crate::error::Result;
use crate::message::{Action, MenuOption};
use crate::model::PullRequest;
use crate::node::LifecycleNode;
use crate::rendering::{ActionContributor, RendererContext};
use async_trait::async_trait;

const MERGE_METHODS: &[(&str, &str)] = &[
    ("Merge commit", "merge"),
    ("Squash and merge", "squash"),
    ("Rebase and merge", "rebase"),
];

fn pull_request_of(node: &LifecycleNode) -> Option<&PullRequest> {
    match node {
        LifecycleNode::PullRequest(pr) => Some(&**pr),
        _ => None,
    }
}

fn pr_action(action: Action, pr: &PullRequest, ctx: &RendererContext<'_>) -> Action {
    with_repo(action, ctx.repo()).param("issue", pr.number.to_string())
}

/// Merge menu for open, mergeable pull requests.
pub struct MergeContributor;

#[async_trait]
impl ActionContributor for MergeContributor {
    fn id(&self) -> &'static str {
        "merge"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        pull_request_of(node).is_some_and(|pr| pr.is_open() && !pr.merged && pr.mergeable != Some(false))
    }

    async fn buttons_for(&self, _node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        Ok(Vec::new())
    }

    async fn menus_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let Some(pr) = pull_request_of(node) else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "pull_request" {
            return Ok(Vec::new());
        }
        let options = MERGE_METHODS
            .iter()
            .map(|(text, value)| MenuOption {
                text: text.to_string(),
                value: value.to_string(),
            })
            .collect();
        Ok(vec![pr_action(Action::menu("Merge", "MergeGitHubPullRequest", options), pr, ctx)
            .param("sha", pr.head().map(|c| c.sha.clone()).unwrap_or_default())])
    }
}

pub struct ApproveContributor;

#[async_trait]
impl ActionContributor for ApproveContributor {
    fn id(&self) -> &'static str {
        "approve"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        pull_request_of(node).is_some_and(PullRequest::is_open)
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        match pull_request_of(node) {
            Some(pr) if ctx.renderer_id == "pull_request" => Ok(vec![pr_action(
                Action::button("Approve", "ApproveGitHubPullRequest"),
                pr,
                ctx,
            )]),
            _ => Ok(Vec::new()),
        }
    }
}

pub struct CommentContributor;

#[async_trait]
impl ActionContributor for CommentContributor {
    fn id(&self) -> &'static str {
        "comment"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        pull_request_of(node).is_some()
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        match pull_request_of(node) {
            Some(pr) if ctx.renderer_id == "pull_request" => Ok(vec![pr_action(
                Action::button("Comment", "CommentGitHubIssue"),
                pr,
                ctx,
            )]),
            _ => Ok(Vec::new()),
        }
    }
}
