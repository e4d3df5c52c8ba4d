use crate::model::{App, Build, Comment, Goal, Issue, PullRequest, Push, Repo, Review, Status, Tag, Workflow};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Derived aggregates
// ---------------------------------------------------------------------------

/// Apps of a commit grouped by their `domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub apps: Vec<App>,
}

/// All goals sharing one `goal_set_id`. `ts` is the earliest goal timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSet {
    pub goal_set_id: String,
    pub ts: i64,
    pub goals: Vec<Goal>,
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Repo,
    Push,
    Tag,
    Build,
    Workflow,
    Domain,
    GoalSet,
    Issue,
    PullRequest,
    Comment,
    Review,
    Status,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Repo => "repo",
            NodeKind::Push => "push",
            NodeKind::Tag => "tag",
            NodeKind::Build => "build",
            NodeKind::Workflow => "workflow",
            NodeKind::Domain => "domain",
            NodeKind::GoalSet => "goal_set",
            NodeKind::Issue => "issue",
            NodeKind::PullRequest => "pull_request",
            NodeKind::Comment => "comment",
            NodeKind::Review => "review",
            NodeKind::Status => "status",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LifecycleNode
// ---------------------------------------------------------------------------

/// One entity contributing to a rendered thread. Nodes are snapshots taken
/// when the event was received and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum LifecycleNode {
    Repo(Repo),
    Push(Box<Push>),
    Tag(Tag),
    Build(Build),
    Workflow(Workflow),
    Domain(Domain),
    GoalSet(GoalSet),
    Issue(Issue),
    PullRequest(Box<PullRequest>),
    Comment(Comment),
    Review(Review),
    Status(Status),
}

impl LifecycleNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            LifecycleNode::Repo(_) => NodeKind::Repo,
            LifecycleNode::Push(_) => NodeKind::Push,
            LifecycleNode::Tag(_) => NodeKind::Tag,
            LifecycleNode::Build(_) => NodeKind::Build,
            LifecycleNode::Workflow(_) => NodeKind::Workflow,
            LifecycleNode::Domain(_) => NodeKind::Domain,
            LifecycleNode::GoalSet(_) => NodeKind::GoalSet,
            LifecycleNode::Issue(_) => NodeKind::Issue,
            LifecycleNode::PullRequest(_) => NodeKind::PullRequest,
            LifecycleNode::Comment(_) => NodeKind::Comment,
            LifecycleNode::Review(_) => NodeKind::Review,
            LifecycleNode::Status(_) => NodeKind::Status,
        }
    }

    pub fn as_goal_set(&self) -> Option<&GoalSet> {
        match self {
            LifecycleNode::GoalSet(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_push(&self) -> Option<&Push> {
        match self {
            LifecycleNode::Push(push) => Some(&**push),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            LifecycleNode::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}
