//! Destination channels of a lifecycle thread.
//!
//! Routing is a pure function of the repository's linked channels, the branch
//! and the team preferences snapshot. Misconfigured routing never drops a
//! channel: a preference that cannot be parsed routes as if it were unset.

use crate::error::{LifecycleError, Result};
use crate::lifecycle::Channel;
use crate::model::RepoChannel;
use crate::preferences::{channel_preferences, find_preference, TeamPreferences, LIFECYCLE_BRANCHES};
use crate::types::LifecycleKind;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Branch routing rules
// ---------------------------------------------------------------------------

/// One entry of the `lifecycle_branches` preference.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRule {
    /// Pattern matched against the channel name.
    pub name: String,
    #[serde(default)]
    pub repositories: Vec<RepositoryRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRule {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
}

/// Unanchored regular-expression search.
fn matches(pattern: &str, target: &str) -> Result<bool> {
    Ok(Regex::new(pattern)?.is_match(target))
}

fn configured(pattern: &Option<String>) -> Option<&str> {
    pattern.as_deref().filter(|p| !p.is_empty())
}

impl RepositoryRule {
    fn applies_to(&self, owner: &str, repo: &str) -> Result<bool> {
        Ok(matches(&self.owner, owner)? && matches(&self.name, repo)?)
    }

    /// Include if the include pattern matches and the exclude pattern, if
    /// any, does not; without an include pattern, include unless excluded.
    pub fn allows(&self, branch: &str) -> Result<bool> {
        let excluded = match configured(&self.exclude) {
            Some(pattern) => matches(pattern, branch)?,
            None => false,
        };
        match configured(&self.include) {
            Some(pattern) => Ok(matches(pattern, branch)? && !excluded),
            None => Ok(!excluded),
        }
    }
}

/// Parse a `lifecycle_branches` value.
pub fn parse_branch_rules(team_id: &str, value: &str) -> Result<Vec<ChannelRule>> {
    serde_json::from_str(value).map_err(|e| LifecycleError::PreferenceParse {
        team: team_id.to_string(),
        preference: LIFECYCLE_BRANCHES.to_string(),
        reason: e.to_string(),
    })
}

/// Decide whether `channel` receives lifecycles for `owner/repo@branch` under
/// the given rules. The first channel rule whose pattern matches the channel
/// name decides; within it the first repository rule matching owner and name.
/// A matching channel rule without a matching repository rule excludes.
pub fn branch_allows(rules: &[ChannelRule], channel: &str, owner: &str, repo: &str, branch: &str) -> Result<bool> {
    for rule in rules {
        if !matches(&rule.name, channel)? {
            continue;
        }
        for repository in &rule.repositories {
            if repository.applies_to(owner, repo)? {
                return repository.allows(branch);
            }
        }
        return Ok(false);
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// route
// ---------------------------------------------------------------------------

/// What a lifecycle is about, as far as routing is concerned.
#[derive(Debug, Clone, Copy)]
pub struct RouteTarget<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    /// Branch routing only applies when a branch is known.
    pub branch: Option<&'a str>,
    pub kind: LifecycleKind,
}

/// Resolve the destination channels of a thread.
///
/// Channels without a name are ignored and duplicates collapse to the first
/// occurrence. Channels muted through `lifecycle_preferences` are dropped.
pub fn route(channels: &[RepoChannel], target: RouteTarget<'_>, prefs: &TeamPreferences) -> Vec<Channel> {
    let mut routed: Vec<Channel> = Vec::new();
    for linked in channels.iter().filter(|c| !c.name.is_empty()) {
        let channel = Channel::new(&linked.name, &linked.team_id);
        if routed.contains(&channel) {
            continue;
        }
        if !branch_routing_allows(&channel, target, prefs) {
            debug!(channel = %channel.name, branch = ?target.branch, "excluded by branch routing");
            continue;
        }
        if !channel_preferences(prefs, &channel, target.kind).enabled {
            debug!(channel = %channel.name, kind = %target.kind, "lifecycle muted for channel");
            continue;
        }
        routed.push(channel);
    }
    routed
}

fn branch_routing_allows(channel: &Channel, target: RouteTarget<'_>, prefs: &TeamPreferences) -> bool {
    let Some(branch) = target.branch else {
        return true;
    };
    let Some(value) = find_preference(prefs, &channel.team_id, LIFECYCLE_BRANCHES) else {
        return true;
    };
    let decision = parse_branch_rules(&channel.team_id, value)
        .and_then(|rules| branch_allows(&rules, &channel.name, target.owner, target.repo, branch));
    match decision {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!(
                channel = %channel.name,
                team = %channel.team_id,
                error = %e,
                "branch routing preference is corrupt, routing unconditionally"
            );
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
