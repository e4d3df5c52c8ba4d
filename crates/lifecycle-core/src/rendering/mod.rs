//! Renderer and action-contributor plugin contracts.
//!
//! A renderer turns one node into at most one message fragment. An action
//! contributor adds buttons or menus to the fragments of the nodes it
//! supports. Renderer ids double as rendering targets: contributors receive
//! the id of the fragment they are contributing to and decide per target.

pub mod card;
pub mod chat;
pub mod format;

use crate::error::Result;
use crate::lifecycle::{ContextKind, ContextNode, Lifecycle};
use crate::message::{Action, MessageTarget};
use crate::model::{GoalDisplayState, Repo};
use crate::node::{GoalSet, LifecycleNode};
use crate::types::RenderingStyle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Pull request known for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPullRequest {
    pub number: u64,
    pub state: String,
    #[serde(default)]
    pub commit_shas: Vec<String>,
}

/// Read-only lookups contributors may perform while rendering. Calls are
/// bounded by the pipeline's contributor timeout.
#[async_trait]
pub trait Enrichment: Send + Sync {
    /// Name of the most recent tag of the repository.
    async fn latest_tag(&self, repo: &Repo, auth_token: Option<&str>) -> Result<Option<String>>;

    async fn tag_exists(&self, repo: &Repo, name: &str, auth_token: Option<&str>) -> Result<bool>;

    async fn branch_pull_requests(
        &self,
        repo: &Repo,
        branch: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<BranchPullRequest>>;
}

/// Enrichment that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

#[async_trait]
impl Enrichment for NoEnrichment {
    async fn latest_tag(&self, _repo: &Repo, _auth_token: Option<&str>) -> Result<Option<String>> {
        Ok(None)
    }

    async fn tag_exists(&self, _repo: &Repo, _name: &str, _auth_token: Option<&str>) -> Result<bool> {
        Ok(false)
    }

    async fn branch_pull_requests(
        &self,
        _repo: &Repo,
        _branch: &str,
        _auth_token: Option<&str>,
    ) -> Result<Vec<BranchPullRequest>> {
        Ok(Vec::new())
    }
}

/// Enrichment answered from a fixed snapshot, e.g. one captured alongside an
/// event file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticEnrichment {
    #[serde(default)]
    pub latest_tag: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pull_requests: Vec<BranchPullRequest>,
}

#[async_trait]
impl Enrichment for StaticEnrichment {
    async fn latest_tag(&self, _repo: &Repo, _auth_token: Option<&str>) -> Result<Option<String>> {
        Ok(self.latest_tag.clone())
    }

    async fn tag_exists(&self, _repo: &Repo, name: &str, _auth_token: Option<&str>) -> Result<bool> {
        Ok(self.tags.iter().any(|t| t == name))
    }

    async fn branch_pull_requests(
        &self,
        _repo: &Repo,
        _branch: &str,
        _auth_token: Option<&str>,
    ) -> Result<Vec<BranchPullRequest>> {
        Ok(self.pull_requests.clone())
    }
}

// ---------------------------------------------------------------------------
// RendererContext
// ---------------------------------------------------------------------------

/// Everything a renderer or contributor may consult besides the node itself.
#[derive(Clone, Copy)]
pub struct RendererContext<'a> {
    pub lifecycle: &'a Lifecycle,
    /// Id of the renderer whose fragment is being built or decorated.
    pub renderer_id: &'a str,
    /// Team-scoped token passed through to enrichment calls.
    pub auth_token: Option<&'a str>,
    pub enrichment: &'a dyn Enrichment,
    pub style: RenderingStyle,
    pub default_branch: &'a str,
}

impl<'a> RendererContext<'a> {
    pub fn extract(&self, kind: ContextKind) -> Option<ContextNode<'a>> {
        self.lifecycle.extract(kind)
    }

    pub fn repo(&self) -> &'a Repo {
        self.lifecycle.repo()
    }

    /// Default branch of the repository, falling back to the configured one.
    pub fn repo_default_branch(&self) -> &'a str {
        self.lifecycle.repo().default_branch_or(self.default_branch)
    }

    pub fn for_renderer(self, renderer_id: &'a str) -> Self {
        Self { renderer_id, ..self }
    }

    pub fn is_full(&self) -> bool {
        self.style == RenderingStyle::Full
    }

    /// Only the newest goal set is shown unless the push asks for all of them.
    pub fn shows_goal_set(&self, set: &GoalSet) -> bool {
        let show_all = self
            .lifecycle
            .push()
            .and_then(|p| p.goals_display_state.as_ref())
            .is_some_and(|d| d.state == GoalDisplayState::ShowAll);
        show_all
            || self
                .lifecycle
                .goal_sets()
                .first()
                .is_some_and(|newest| newest.goal_set_id == set.goal_set_id)
    }
}

// ---------------------------------------------------------------------------
// Plugin contracts
// ---------------------------------------------------------------------------

/// Produces the narrative fragment of a node for one message target.
pub trait NodeRenderer<M: MessageTarget>: Send + Sync {
    fn id(&self) -> &'static str;

    fn supports(&self, node: &LifecycleNode) -> bool;

    /// `None` means the renderer contributes nothing for this node.
    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<M::Fragment>;
}

/// Produces interactive actions for the fragments of supported nodes.
#[async_trait]
pub trait ActionContributor: Send + Sync {
    fn id(&self) -> &'static str;

    /// Cheap synchronous filter; only supported nodes reach `buttons_for`.
    fn supports(&self, node: &LifecycleNode) -> bool;

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>>;

    async fn menus_for(&self, _node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        Ok(Vec::new())
    }
}
