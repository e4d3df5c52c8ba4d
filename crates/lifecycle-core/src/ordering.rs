//! Deterministic node ordering for lifecycle roots.
//!
//! The order produced here is a rendering contract: fragments appear in the
//! final message in node order, so golden outputs depend on it exactly.

use crate::model::{App, Build, Comment, Goal, Issue, PullRequest, Push, Repo, Review, Tag, Workflow};
use crate::node::{Domain, GoalSet, LifecycleNode};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

/// Order the nodes of a push lifecycle.
///
/// Returns `None` when the push is incomplete: no repo, no terminal commit,
/// or no commits at all. Callers must skip rendering in that case.
///
/// Order: repo, push, tags of the terminal commit (by name), builds (newest
/// first), distinct build workflows, domains (by name), goal sets (newest
/// first).
pub fn order_push_nodes(push: &Push) -> Option<Vec<LifecycleNode>> {
    let (Some(repo), Some(after)) = (push.repo.as_ref(), push.after.as_ref()) else {
        debug!(branch = %push.branch, "push is missing repo or terminal commit");
        return None;
    };
    if push.commits.is_empty() {
        debug!(branch = %push.branch, sha = %after.sha, "push has no commits");
        return None;
    }

    let mut nodes = vec![
        LifecycleNode::Repo(repo.clone()),
        LifecycleNode::Push(Box::new(push.clone())),
    ];

    nodes.extend(sort_tags_by_name(&after.tags).into_iter().cloned().map(LifecycleNode::Tag));

    let builds = sort_builds_newest_first(&push.builds);
    nodes.extend(builds.iter().map(|b| LifecycleNode::Build((*b).clone())));
    nodes.extend(distinct_workflows(&builds).into_iter().cloned().map(LifecycleNode::Workflow));

    nodes.extend(extract_domains(push).into_iter().map(LifecycleNode::Domain));
    nodes.extend(group_goal_sets(&push.goals).into_iter().map(LifecycleNode::GoalSet));

    Some(nodes)
}

/// Tags with a name, sorted by name ascending. Nameless tags are dropped.
pub fn sort_tags_by_name(tags: &[Tag]) -> Vec<&Tag> {
    let mut named: Vec<&Tag> = tags.iter().filter(|t| has_name(t)).collect();
    named.sort_by(|a, b| tag_name(a).cmp(tag_name(b)));
    named
}

fn has_name(tag: &Tag) -> bool {
    tag.name.as_deref().is_some_and(|n| !n.is_empty())
}

fn tag_name(tag: &Tag) -> &str {
    tag.name.as_deref().unwrap_or("")
}

/// Builds by timestamp descending. Equal timestamps keep input order.
pub fn sort_builds_newest_first(builds: &[Build]) -> Vec<&Build> {
    let mut sorted: Vec<&Build> = builds.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

/// Workflows of the given builds, deduplicated by id in first-seen order.
pub fn distinct_workflows<'a>(builds: &[&'a Build]) -> Vec<&'a Workflow> {
    let mut seen = HashSet::new();
    builds
        .iter()
        .filter_map(|b| b.workflow.as_ref())
        .filter(|w| seen.insert(w.id.as_str()))
        .collect()
}

/// Apps of all push commits grouped by domain, sorted by domain name.
pub fn extract_domains(push: &Push) -> Vec<Domain> {
    let mut domains: BTreeMap<&str, Vec<App>> = BTreeMap::new();
    for app in push.commits.iter().flat_map(|c| c.apps.iter()) {
        domains.entry(app.domain.as_str()).or_default().push(app.clone());
    }
    domains
        .into_iter()
        .map(|(name, apps)| Domain {
            name: name.to_string(),
            apps,
        })
        .collect()
}

/// Group goals by goal set id. One set per distinct id, with `ts` the
/// earliest goal timestamp, ordered newest first. Sets with equal `ts` keep
/// the order in which their ids were first seen.
pub fn group_goal_sets(goals: &[Goal]) -> Vec<GoalSet> {
    let mut sets: Vec<GoalSet> = Vec::new();
    for goal in goals {
        match sets.iter_mut().find(|s| s.goal_set_id == goal.goal_set_id) {
            Some(set) => {
                set.ts = set.ts.min(goal.ts);
                set.goals.push(goal.clone());
            }
            None => sets.push(GoalSet {
                goal_set_id: goal.goal_set_id.clone(),
                ts: goal.ts,
                goals: vec![goal.clone()],
            }),
        }
    }
    sets.sort_by(|a, b| b.ts.cmp(&a.ts));
    sets
}

/// The current attempt of every goal in a set: for goals sharing a name only
/// the one with the highest timestamp is kept. Sorted by name.
pub fn last_goal_set(goals: &[Goal]) -> Vec<&Goal> {
    let mut latest: BTreeMap<&str, &Goal> = BTreeMap::new();
    for goal in goals {
        latest
            .entry(goal.name.as_str())
            .and_modify(|current| {
                if goal.ts > current.ts {
                    *current = goal;
                }
            })
            .or_insert(goal);
    }
    latest.into_values().collect()
}

// ---------------------------------------------------------------------------
// Issue, pull request, review
// ---------------------------------------------------------------------------

pub fn order_issue_nodes(repo: &Repo, issue: &Issue, comment: Option<&Comment>) -> Vec<LifecycleNode> {
    let mut nodes = vec![LifecycleNode::Repo(repo.clone()), LifecycleNode::Issue(issue.clone())];
    if let Some(comment) = comment {
        nodes.push(LifecycleNode::Comment(comment.clone()));
    }
    nodes
}

/// Order: repo, pull request, builds (newest first), statuses of the head
/// commit (by context), reviews.
pub fn order_pull_request_nodes(repo: &Repo, pr: &PullRequest) -> Vec<LifecycleNode> {
    let mut nodes = vec![
        LifecycleNode::Repo(repo.clone()),
        LifecycleNode::PullRequest(Box::new(pr.clone())),
    ];
    nodes.extend(
        sort_builds_newest_first(&pr.builds)
            .into_iter()
            .cloned()
            .map(LifecycleNode::Build),
    );
    if let Some(head) = pr.head() {
        let mut statuses: Vec<_> = head.statuses.iter().collect();
        statuses.sort_by(|a, b| a.context.cmp(&b.context));
        nodes.extend(statuses.into_iter().cloned().map(LifecycleNode::Status));
    }
    nodes.extend(pr.reviews.iter().cloned().map(LifecycleNode::Review));
    nodes
}

pub fn order_review_nodes(repo: &Repo, review: &Review) -> Vec<LifecycleNode> {
    vec![LifecycleNode::Repo(repo.clone()), LifecycleNode::Review(review.clone())]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Commit, Repo};
    use crate::node::NodeKind;
    use crate::types::{BuildStatus, GoalState};

    pub(crate) fn repo() -> Repo {
        Repo {
            owner: "acme".into(),
            name: "widgets".into(),
            default_branch: Some("main".into()),
            private: false,
            provider: None,
            channels: vec![],
        }
    }

    pub(crate) fn commit(sha: &str) -> Commit {
        Commit {
            sha: sha.into(),
            message: Some("Add widget".into()),
            author: None,
            timestamp: None,
            tags: vec![],
            apps: vec![],
            statuses: vec![],
        }
    }

    pub(crate) fn goal(name: &str, set: &str, ts: i64, state: GoalState) -> Goal {
        Goal {
            id: format!("{set}-{name}-{ts}"),
            name: name.into(),
            goal_set_id: set.into(),
            state,
            ts,
            retry_feasible: None,
            description: None,
            url: None,
            environment: None,
        }
    }

    pub(crate) fn build(name: &str, ts: &str, workflow: Option<&str>) -> Build {
        Build {
            build_id: None,
            name: Some(name.into()),
            status: BuildStatus::Passed,
            timestamp: ts.into(),
            build_url: None,
            provider: None,
            workflow: workflow.map(|id| Workflow {
                id: id.into(),
                name: None,
                provider: None,
            }),
        }
    }

    pub(crate) fn push() -> Push {
        Push {
            branch: "main".into(),
            repo: Some(repo()),
            after: Some(commit("abc123")),
            commits: vec![commit("abc123")],
            builds: vec![],
            goals: vec![],
            goal_sets: vec![],
            goals_display_state: None,
            timestamp: None,
        }
    }

    fn tag(name: Option<&str>) -> Tag {
        Tag {
            name: name.map(String::from),
            description: None,
            timestamp: None,
            release: None,
        }
    }

    fn kinds(nodes: &[LifecycleNode]) -> Vec<NodeKind> {
        nodes.iter().map(LifecycleNode::kind).collect()
    }

    #[test]
    fn push_without_commits_is_incomplete() {
        let mut p = push();
        p.commits.clear();
        assert!(order_push_nodes(&p).is_none());
    }

    #[test]
    fn push_without_repo_is_incomplete() {
        let mut p = push();
        p.repo = None;
        assert!(order_push_nodes(&p).is_none());
    }

    #[test]
    fn goal_sets_grouped_newest_first() {
        let goals = vec![
            goal("build", "g1", 1, GoalState::Success),
            goal("test", "g1", 2, GoalState::Success),
            goal("build", "g2", 3, GoalState::InProcess),
        ];
        let sets = group_goal_sets(&goals);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].goal_set_id, "g2");
        assert_eq!(sets[0].ts, 3);
        assert_eq!(sets[1].goal_set_id, "g1");
        assert_eq!(sets[1].ts, 1);
        assert_eq!(sets[1].goals.len(), 2);
    }

    #[test]
    fn full_push_order() {
        let mut p = push();
        let mut after = commit("abc123");
        after.tags = vec![tag(Some("1.1.0")), tag(None), tag(Some("1.0.0"))];
        after.apps = vec![
            App { state: "started".into(), host: None, domain: "prod".into(), data: None },
            App { state: "started".into(), host: None, domain: "dev".into(), data: None },
        ];
        p.after = Some(after.clone());
        p.commits = vec![after];
        p.builds = vec![
            build("old", "2024-01-01T00:00:00Z", Some("wf1")),
            build("new", "2024-01-02T00:00:00Z", Some("wf1")),
            build("mid", "2024-01-01T12:00:00Z", Some("wf2")),
        ];
        p.goals = vec![goal("build", "g1", 5, GoalState::Success)];

        let nodes = order_push_nodes(&p).unwrap();
        assert_eq!(
            kinds(&nodes),
            vec![
                NodeKind::Repo,
                NodeKind::Push,
                NodeKind::Tag,
                NodeKind::Tag,
                NodeKind::Build,
                NodeKind::Build,
                NodeKind::Build,
                NodeKind::Workflow,
                NodeKind::Workflow,
                NodeKind::Domain,
                NodeKind::Domain,
                NodeKind::GoalSet,
            ]
        );
        assert_eq!(nodes[2].as_tag().unwrap().name.as_deref(), Some("1.0.0"));
        match (&nodes[4], &nodes[6]) {
            (LifecycleNode::Build(first), LifecycleNode::Build(last)) => {
                assert_eq!(first.name.as_deref(), Some("new"));
                assert_eq!(last.name.as_deref(), Some("old"));
            }
            other => panic!("unexpected nodes {other:?}"),
        }
        match (&nodes[7], &nodes[8]) {
            (LifecycleNode::Workflow(a), LifecycleNode::Workflow(b)) => {
                assert_eq!(a.id, "wf1");
                assert_eq!(b.id, "wf2");
            }
            other => panic!("unexpected nodes {other:?}"),
        }
        match &nodes[9] {
            LifecycleNode::Domain(d) => assert_eq!(d.name, "dev"),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn equal_build_timestamps_keep_input_order() {
        let builds = vec![
            build("a", "2024-01-01T00:00:00Z", None),
            build("b", "2024-01-01T00:00:00Z", None),
        ];
        let sorted = sort_builds_newest_first(&builds);
        assert_eq!(sorted[0].name.as_deref(), Some("a"));
        assert_eq!(sorted[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn last_goal_set_keeps_latest_attempt() {
        let goals = vec![
            goal("deploy", "g1", 1, GoalState::Failure),
            goal("build", "g1", 1, GoalState::Success),
            goal("deploy", "g1", 4, GoalState::InProcess),
        ];
        let latest = last_goal_set(&goals);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].name, "build");
        assert_eq!(latest[1].state, GoalState::InProcess);
    }

    #[test]
    fn pull_request_statuses_sorted_by_context() {
        use crate::model::{PullRequest, Status};
        let mut head = commit("def456");
        head.statuses = vec![
            Status { context: "z-lint".into(), state: "success".into(), description: None, target_url: None },
            Status { context: "a-ci".into(), state: "pending".into(), description: None, target_url: None },
        ];
        let pr = PullRequest {
            number: 7,
            title: "Add widget".into(),
            body: None,
            state: "open".into(),
            merged: false,
            mergeable: Some(true),
            branch_name: "feature".into(),
            base_branch_name: "main".into(),
            author: None,
            commits: vec![head],
            builds: vec![],
            reviews: vec![],
            timestamp: None,
        };
        let nodes = order_pull_request_nodes(&repo(), &pr);
        assert_eq!(kinds(&nodes), vec![NodeKind::Repo, NodeKind::PullRequest, NodeKind::Status, NodeKind::Status]);
        match &nodes[2] {
            LifecycleNode::Status(s) => assert_eq!(s.context, "a-ci"),
            other => panic!("unexpected node {other:?}"),
        }
    }
}
