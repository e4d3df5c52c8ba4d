//! Lifecycles from domain events.
//!
//! A domain event is the resolved graph-query result for one subscription
//! notification plus the preference snapshot of the teams involved. Each
//! event yields zero or more lifecycles; incomplete roots are reported as
//! [`LifecycleError::IncompleteEvent`] and never rendered.

use crate::error::{LifecycleError, Result};
use crate::lifecycle::{ContextNodes, Lifecycle, ThreadIdentity};
use crate::model::{Comment, Issue, PullRequest, Push, Repo, Review};
use crate::ordering::{
    extract_domains, group_goal_sets, order_issue_nodes, order_pull_request_nodes, order_push_nodes,
    order_review_nodes,
};
use crate::preferences::TeamPreferences;
use crate::router::{route, RouteTarget};
use crate::types::LifecycleKind;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    #[serde(flatten)]
    pub subject: EventSubject,
    #[serde(default)]
    pub preferences: TeamPreferences,
    /// Opaque team token passed through to enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Epoch milliseconds; the receipt time is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventSubject {
    Push {
        #[serde(default)]
        pushes: Vec<Push>,
    },
    Issue {
        #[serde(default)]
        repo: Option<Repo>,
        #[serde(default)]
        issue: Option<Issue>,
        #[serde(default)]
        comment: Option<Comment>,
    },
    PullRequest {
        #[serde(default)]
        repo: Option<Repo>,
        #[serde(default)]
        pull_request: Option<PullRequest>,
    },
    Review {
        #[serde(default)]
        repo: Option<Repo>,
        #[serde(default)]
        review: Option<Review>,
        #[serde(default)]
        pull_request: Option<PullRequest>,
    },
}

impl EventSubject {
    pub fn kind(&self) -> LifecycleKind {
        match self {
            EventSubject::Push { .. } => LifecycleKind::Push,
            EventSubject::Issue { .. } => LifecycleKind::Issue,
            EventSubject::PullRequest { .. } => LifecycleKind::PullRequest,
            EventSubject::Review { .. } => LifecycleKind::Review,
        }
    }
}

impl DomainEvent {
    /// One entry per root; incomplete roots are errors.
    pub fn lifecycles(&self, timestamp: i64) -> Vec<Result<Lifecycle>> {
        let prefs = &self.preferences;
        match &self.subject {
            EventSubject::Push { pushes } => pushes.iter().map(|p| push_lifecycle(p, prefs, timestamp)).collect(),
            EventSubject::Issue { repo, issue, comment } => {
                vec![issue_lifecycle(repo.as_ref(), issue.as_ref(), comment.as_ref(), prefs, timestamp)]
            }
            EventSubject::PullRequest { repo, pull_request } => {
                vec![pull_request_lifecycle(repo.as_ref(), pull_request.as_ref(), prefs, timestamp)]
            }
            EventSubject::Review {
                repo,
                review,
                pull_request,
            } => vec![review_lifecycle(
                repo.as_ref(),
                review.as_ref(),
                pull_request.as_ref(),
                prefs,
                timestamp,
            )],
        }
    }
}

fn incomplete(what: &str) -> LifecycleError {
    LifecycleError::IncompleteEvent(what.to_string())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn push_lifecycle(push: &Push, prefs: &TeamPreferences, timestamp: i64) -> Result<Lifecycle> {
    let nodes = order_push_nodes(push)
        .ok_or_else(|| incomplete(&format!("push to '{}' lacks repo, terminal commit or commits", push.branch)))?;
    let id = ThreadIdentity::for_push(push).ok_or_else(|| incomplete("push lacks repo or terminal commit"))?;
    let repo = push.repo.clone().ok_or_else(|| incomplete("push lacks repo"))?;

    let channels = route(
        &repo.channels,
        RouteTarget {
            owner: &repo.owner,
            repo: &repo.name,
            branch: Some(&push.branch),
            kind: LifecycleKind::Push,
        },
        prefs,
    );

    let mut context = ContextNodes::for_repo(repo);
    context.domains = extract_domains(push);
    context.goal_sets = group_goal_sets(&push.goals);
    context.push = Some(push.clone());

    Ok(Lifecycle {
        id,
        kind: LifecycleKind::Push,
        nodes,
        context,
        channels,
        timestamp,
    })
}

fn numbered(
    kind: LifecycleKind,
    repo: &Repo,
    number: u64,
    nodes: Vec<crate::node::LifecycleNode>,
    context: ContextNodes,
    prefs: &TeamPreferences,
    timestamp: i64,
) -> Lifecycle {
    let channels = route(
        &repo.channels,
        RouteTarget {
            owner: &repo.owner,
            repo: &repo.name,
            branch: None,
            kind,
        },
        prefs,
    );
    Lifecycle {
        id: ThreadIdentity::for_numbered(kind, repo, number),
        kind,
        nodes,
        context,
        channels,
        timestamp,
    }
}

pub fn issue_lifecycle(
    repo: Option<&Repo>,
    issue: Option<&Issue>,
    comment: Option<&Comment>,
    prefs: &TeamPreferences,
    timestamp: i64,
) -> Result<Lifecycle> {
    let (Some(repo), Some(issue)) = (repo, issue) else {
        return Err(incomplete("issue event lacks repo or issue"));
    };
    let mut context = ContextNodes::for_repo(repo.clone());
    context.issue = Some(issue.clone());
    context.comment = comment.cloned();
    Ok(numbered(
        LifecycleKind::Issue,
        repo,
        issue.number,
        order_issue_nodes(repo, issue, comment),
        context,
        prefs,
        timestamp,
    ))
}

pub fn pull_request_lifecycle(
    repo: Option<&Repo>,
    pr: Option<&PullRequest>,
    prefs: &TeamPreferences,
    timestamp: i64,
) -> Result<Lifecycle> {
    let (Some(repo), Some(pr)) = (repo, pr) else {
        return Err(incomplete("pull request event lacks repo or pull request"));
    };
    let mut context = ContextNodes::for_repo(repo.clone());
    context.pull_request = Some(pr.clone());
    Ok(numbered(
        LifecycleKind::PullRequest,
        repo,
        pr.number,
        order_pull_request_nodes(repo, pr),
        context,
        prefs,
        timestamp,
    ))
}

pub fn review_lifecycle(
    repo: Option<&Repo>,
    review: Option<&Review>,
    pr: Option<&PullRequest>,
    prefs: &TeamPreferences,
    timestamp: i64,
) -> Result<Lifecycle> {
    let (Some(repo), Some(review), Some(pr)) = (repo, review, pr) else {
        return Err(incomplete("review event lacks repo, review or pull request"));
    };
    let mut context = ContextNodes::for_repo(repo.clone());
    context.review = Some(review.clone());
    context.pull_request = Some(pr.clone());
    Ok(numbered(
        LifecycleKind::Review,
        repo,
        pr.number,
        order_review_nodes(repo, review),
        context,
        prefs,
        timestamp,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
