//! Resolved domain event graph.
//!
//! These are snapshots of the graph-query results handed to the engine by the
//! event intake. Field names follow the camelCase wire shape of the query
//! results; every relationship is already resolved, nothing here is fetched
//! lazily.

use crate::types::{BuildStatus, GoalState};
use serde::{Deserialize, Serialize};

const DEFAULT_WEB_URL: &str = "https://github.com";

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A chat channel linked to a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoChannel {
    pub name: String,
    pub team_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub channels: Vec<RepoChannel>,
}

impl Repo {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn default_branch_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.default_branch.as_deref().unwrap_or(fallback)
    }

    /// Web URL of the repository, e.g. `https://github.com/acme/widgets`.
    pub fn url(&self) -> String {
        let base = self
            .provider
            .as_ref()
            .and_then(|p| p.url.as_deref())
            .unwrap_or(DEFAULT_WEB_URL)
            .trim_end_matches('/');
        format!("{base}/{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Commits, tags, apps, statuses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub release: Option<Release>,
}

/// A running application instance reported by a platform (e.g. Cloud Foundry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub state: String,
    #[serde(default)]
    pub host: Option<String>,
    pub domain: String,
    /// JSON-encoded platform payload, kept opaque until a contributor needs it.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub context: String,
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

impl Status {
    pub fn is_success(&self) -> bool {
        self.state == "success"
    }

    pub fn is_pending(&self) -> bool {
        self.state == "pending"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<Person>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub apps: Vec<App>,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        self.sha
            .char_indices()
            .nth(7)
            .map_or(self.sha.as_str(), |(end, _)| &self.sha[..end])
    }

    /// First line of the commit message.
    pub fn title(&self) -> &str {
        self.message
            .as_deref()
            .and_then(|m| m.lines().next())
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Builds and goals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(default)]
    pub build_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub status: BuildStatus,
    /// ISO-8601 timestamp; compared lexically.
    pub timestamp: String,
    #[serde(default)]
    pub build_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub workflow: Option<Workflow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub goal_set_id: String,
    pub state: GoalState,
    /// Epoch milliseconds.
    pub ts: i64,
    #[serde(default)]
    pub retry_feasible: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// Goal-set record as tracked by the delivery machine, independent of the goals
/// reported so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSetRecord {
    pub goal_set_id: String,
    #[serde(default)]
    pub goal_set: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDisplayState {
    ShowCurrent,
    ShowAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalsDisplay {
    pub state: GoalDisplayState,
    #[serde(default)]
    pub format: Option<crate::types::RenderingStyle>,
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Push {
    pub branch: String,
    #[serde(default)]
    pub repo: Option<Repo>,
    /// Terminal commit of the push.
    #[serde(default)]
    pub after: Option<Commit>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub builds: Vec<Build>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub goal_sets: Vec<GoalSetRecord>,
    #[serde(default)]
    pub goals_display_state: Option<GoalsDisplay>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Push {
    pub fn after_sha(&self) -> Option<&str> {
        self.after.as_ref().map(|c| c.sha.as_str())
    }

    /// True if any commit of this push carries a tag.
    pub fn has_tagged_commits(&self) -> bool {
        self.commits.iter().any(|c| !c.tags.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Issues, pull requests, reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub author: Option<Person>,
    #[serde(default)]
    pub assignees: Vec<Person>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub body: String,
    #[serde(default)]
    pub author: Option<Person>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub by: Vec<Person>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub mergeable: Option<bool>,
    pub branch_name: String,
    pub base_branch_name: String,
    #[serde(default)]
    pub author: Option<Person>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub builds: Vec<Build>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    /// Most recent commit on the pull request branch.
    pub fn head(&self) -> Option<&Commit> {
        self.commits.last()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
