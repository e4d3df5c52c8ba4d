use crate::model::{Comment, Issue, PullRequest, Push, Repo, Review};
use crate::node::{Domain, GoalSet, LifecycleNode};
use crate::ordering::group_goal_sets;
use crate::types::LifecycleKind;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ThreadIdentity
// ---------------------------------------------------------------------------

/// Stable key of a logical message thread. Two renders with the same identity
/// describe the same thread and are edited in place, never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadIdentity(String);

impl ThreadIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `push_lifecycle/{owner}/{repo}/{branch}/{sha}`, with `/{count}` appended
    /// when more than one goal set runs for the same sha.
    pub fn for_push(push: &Push) -> Option<Self> {
        let repo = push.repo.as_ref()?;
        let sha = push.after_sha()?;
        let base = format!(
            "{}/{}/{}/{}/{}",
            LifecycleKind::Push.thread_prefix(),
            repo.owner,
            repo.name,
            push.branch,
            sha
        );
        let goal_sets = if push.goal_sets.is_empty() {
            group_goal_sets(&push.goals).len()
        } else {
            push.goal_sets.len()
        };
        if goal_sets > 1 {
            Some(Self(format!("{base}/{goal_sets}")))
        } else {
            Some(Self(base))
        }
    }

    /// `{prefix}/{owner}/{repo}/{number}` for issue, pull request and review
    /// threads.
    pub fn for_numbered(kind: LifecycleKind, repo: &Repo, number: u64) -> Self {
        Self(format!("{}/{}/{}/{}", kind.thread_prefix(), repo.owner, repo.name, number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A routing destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub team_id: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team_id: team_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Context side-table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Repo,
    Push,
    Domains,
    GoalSets,
    Issue,
    Comment,
    PullRequest,
    Review,
}

/// A context node borrowed from the side-table.
#[derive(Debug, Clone, Copy)]
pub enum ContextNode<'a> {
    Repo(&'a Repo),
    Push(&'a Push),
    Domains(&'a [Domain]),
    GoalSets(&'a [GoalSet]),
    Issue(&'a Issue),
    Comment(&'a Comment),
    PullRequest(&'a PullRequest),
    Review(&'a Review),
}

/// Nodes renderers look up by role instead of by position in the node list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextNodes {
    pub repo: Repo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<Push>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<Domain>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub goal_sets: Vec<GoalSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

impl ContextNodes {
    pub fn for_repo(repo: Repo) -> Self {
        Self {
            repo,
            push: None,
            domains: Vec::new(),
            goal_sets: Vec::new(),
            issue: None,
            comment: None,
            pull_request: None,
            review: None,
        }
    }

    pub fn extract(&self, kind: ContextKind) -> Option<ContextNode<'_>> {
        match kind {
            ContextKind::Repo => Some(ContextNode::Repo(&self.repo)),
            ContextKind::Push => self.push.as_ref().map(ContextNode::Push),
            ContextKind::Domains => Some(ContextNode::Domains(&self.domains)),
            ContextKind::GoalSets => Some(ContextNode::GoalSets(&self.goal_sets)),
            ContextKind::Issue => self.issue.as_ref().map(ContextNode::Issue),
            ContextKind::Comment => self.comment.as_ref().map(ContextNode::Comment),
            ContextKind::PullRequest => self.pull_request.as_ref().map(ContextNode::PullRequest),
            ContextKind::Review => self.review.as_ref().map(ContextNode::Review),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Unit of work for one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lifecycle {
    pub id: ThreadIdentity,
    pub kind: LifecycleKind,
    pub nodes: Vec<LifecycleNode>,
    pub context: ContextNodes,
    pub channels: Vec<Channel>,
    /// Epoch milliseconds of the event; the only time-dependent value in a
    /// rendered message.
    pub timestamp: i64,
}

impl Lifecycle {
    pub fn extract(&self, kind: ContextKind) -> Option<ContextNode<'_>> {
        self.context.extract(kind)
    }

    pub fn repo(&self) -> &Repo {
        &self.context.repo
    }

    pub fn push(&self) -> Option<&Push> {
        self.context.push.as_ref()
    }

    pub fn goal_sets(&self) -> &[GoalSet] {
        &self.context.goal_sets
    }

    pub fn is_private(&self) -> bool {
        self.context.repo.private
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
