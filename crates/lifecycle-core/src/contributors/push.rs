use super::{parse_version, release, with_repo, DEFAULT_TAG_MESSAGE};
use crate::error::Result;
use crate::message::{Action, Confirm};
use crate::model::{Goal, GoalDisplayState, Push, Tag};
use crate::node::{GoalSet, LifecycleNode};
use crate::ordering::{last_goal_set, sort_tags_by_name};
use crate::rendering::format::truncate_title;
use crate::rendering::{ActionContributor, RendererContext};
use crate::types::{GoalState, RenderingStyle};
use async_trait::async_trait;
use serde::Deserialize;

fn push_of<'a>(ctx: &RendererContext<'a>) -> Option<&'a Push> {
    ctx.lifecycle.push()
}

fn tag_message(push: &Push) -> String {
    push.after
        .as_ref()
        .and_then(|c| c.message.clone())
        .unwrap_or_else(|| DEFAULT_TAG_MESSAGE.to_string())
}

// ---------------------------------------------------------------------------
// Tagging and releases
// ---------------------------------------------------------------------------

/// Offers a `Tag` button on the default branch when none of the pushed
/// commits is tagged. With a semantic latest tag the button opens the version
/// selection instead.
pub struct TagPushContributor;

#[async_trait]
impl ActionContributor for TagPushContributor {
    fn id(&self) -> &'static str {
        "new_tag"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        node.as_push()
            .is_some_and(|p| p.after.is_some() && !p.has_tagged_commits())
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let Some(push) = node.as_push() else {
            return Ok(Vec::new());
        };
        let Some(after) = push.after.as_ref() else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "commit" || push.branch != ctx.repo_default_branch() {
            return Ok(Vec::new());
        }

        let repo = ctx.repo();
        let tag = with_repo(Action::button("Tag", "CreateGitHubTag"), repo)
            .param("message", tag_message(push))
            .param("sha", after.sha.clone())
            .global();

        if ctx.auth_token.is_some() {
            let latest = ctx.enrichment.latest_tag(repo, ctx.auth_token).await?;
            if let Some(last_tag) = latest.filter(|t| parse_version(t).is_some()) {
                let mut selection = tag;
                selection.command = "CreateGitHubTagSelection".to_string();
                selection.role = None;
                return Ok(vec![selection.param("lastTag", last_tag)]);
            }
        }
        Ok(vec![tag])
    }
}

/// For a prerelease tag like `0.5.32-rc.1` on the default branch, offers to
/// create `0.5.32` when that tag does not exist yet and this is the last tag
/// of the version on the commit.
pub struct TagTagContributor;

impl TagTagContributor {
    fn is_last_tag_of_version(push: &Push, tag: &str, version: &str) -> bool {
        let Some(after) = push.after.as_ref() else {
            return false;
        };
        let names: Vec<&str> = sort_tags_by_name(&after.tags)
            .into_iter()
            .filter_map(|t| t.name.as_deref())
            .filter(|n| parse_version(n).is_some_and(|v| release(&v) == version))
            .collect();
        names.last() == Some(&tag)
    }
}

#[async_trait]
impl ActionContributor for TagTagContributor {
    fn id(&self) -> &'static str {
        "tag"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        node.as_tag().is_some_and(|t| t.release.is_none())
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let (Some(tag), Some(push)) = (node.as_tag(), push_of(ctx)) else {
            return Ok(Vec::new());
        };
        let Some(name) = tag.name.as_deref() else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "tag" || push.branch != ctx.repo_default_branch() {
            return Ok(Vec::new());
        }
        let Some(version) = parse_version(name).map(|v| release(&v)) else {
            return Ok(Vec::new());
        };
        let Some(after) = push.after.as_ref().filter(|_| version != name) else {
            return Ok(Vec::new());
        };

        let repo = ctx.repo();
        if ctx.enrichment.tag_exists(repo, &version, ctx.auth_token).await? {
            return Ok(Vec::new());
        }
        if !Self::is_last_tag_of_version(push, name, &version) {
            return Ok(Vec::new());
        }
        Ok(vec![with_repo(Action::button(format!("Tag {version}"), "CreateGitHubTag"), repo)
            .param("tag", version.clone())
            .param("message", tag_message(push))
            .param("sha", after.sha.clone())
            .global()])
    }
}

/// Offers `Release` for an unreleased tag unless another tag of the push is
/// already released or the tag carries build metadata.
pub struct ReleaseContributor;

impl ReleaseContributor {
    fn release_message(push: &Push, tag: &str) -> String {
        push.commits
            .iter()
            .find(|c| c.message.is_some() && c.tags.iter().any(|t| t.name.as_deref() == Some(tag)))
            .and_then(|c| c.message.as_deref())
            .map(truncate_title)
            .unwrap_or_else(|| "Release created by lifecycle automation".to_string())
    }
}

#[async_trait]
impl ActionContributor for ReleaseContributor {
    fn id(&self) -> &'static str {
        "release"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        node.as_tag().is_some_and(|t| t.release.is_none())
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let (Some(Tag { name: Some(name), .. }), Some(push)) = (node.as_tag(), push_of(ctx)) else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "tag" {
            return Ok(Vec::new());
        }
        let released = push
            .commits
            .iter()
            .any(|c| c.tags.iter().any(|t| t.release.is_some()));
        if released || name.contains('+') {
            return Ok(Vec::new());
        }
        let action = with_repo(Action::button("Release", "CreateGitHubRelease"), ctx.repo())
            .param("tag", name.clone())
            .param("message", Self::release_message(push, name))
            .global()
            .confirm(Confirm::new(
                "Create Release",
                format!("Create release of tag {name}?"),
                "Ok",
                "Cancel",
            ));
        Ok(vec![action])
    }
}

// ---------------------------------------------------------------------------
// Raise PR
// ---------------------------------------------------------------------------

/// Offers `Raise PR` for feature branches unless an open pull request exists
/// for the branch or a pull request already contains the pushed commit.
pub struct RaisePullRequestContributor;

#[async_trait]
impl ActionContributor for RaisePullRequestContributor {
    fn id(&self) -> &'static str {
        "raise_pullrequest"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        let Some(push) = node.as_push() else {
            return false;
        };
        let default_branch = push
            .repo
            .as_ref()
            .and_then(|r| r.default_branch.as_deref())
            .unwrap_or("master");
        push.after.is_some() && push.branch != default_branch && push.branch != "gh-pages"
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let Some(push) = node.as_push() else {
            return Ok(Vec::new());
        };
        let Some(after) = push.after.as_ref() else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "commit" {
            return Ok(Vec::new());
        }

        let repo = ctx.repo();
        let prs = ctx
            .enrichment
            .branch_pull_requests(repo, &push.branch, ctx.auth_token)
            .await?;
        let has_open = prs.iter().any(|pr| pr.state == "open");
        let contains_after = prs.iter().any(|pr| pr.commit_shas.iter().any(|s| *s == after.sha));
        if has_open || contains_after {
            return Ok(Vec::new());
        }

        let message = after.message.as_deref().unwrap_or("");
        let mut lines = message.split('\n');
        let title = lines.next().unwrap_or("").to_string();
        let body: Vec<&str> = lines.collect();
        let body = (!body.is_empty()).then(|| body.join("\n").replace('\r', ""));

        Ok(vec![Action::button("Raise PR", "RaiseGitHubPullRequest")
            .param("org", repo.owner.clone())
            .param("repo", repo.name.clone())
            .param("title", title)
            .param_opt("body", body)
            .param("base", ctx.repo_default_branch())
            .param("head", push.branch.clone())
            .global()])
    }
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

/// Restart, Start, Approve and Cancel buttons for goal sets.
pub struct ApproveGoalContributor;

impl ApproveGoalContributor {
    fn goal_button(label: &str, target: GoalState, goal: &Goal, ctx: &RendererContext<'_>) -> Action {
        let name = goal.name.replace('`', "");
        Action::button(format!("{label} _{name}_"), "UpdateSdmGoalState")
            .param("id", goal.id.clone())
            .param("state", target.as_str())
            .param("owner", ctx.repo().owner.clone())
            .global()
    }

    fn cancel_button(set: &GoalSet) -> Action {
        let short_id: String = set.goal_set_id.chars().take(7).collect();
        Action::button("Cancel", "CancelGoalSets")
            .param("goalSetId", set.goal_set_id.clone())
            .confirm(Confirm::new(
                "Cancel Goal Set",
                format!("Do you really want to cancel goal set {short_id}?"),
                "Yes",
                "No",
            ))
    }
}

#[async_trait]
impl ActionContributor for ApproveGoalContributor {
    fn id(&self) -> &'static str {
        "approve_goal"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        node.as_goal_set()
            .is_some_and(|s| !s.goals.is_empty() && !s.goal_set_id.is_empty())
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let Some(set) = node.as_goal_set() else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "goals" {
            return Ok(Vec::new());
        }

        let goals = last_goal_set(&set.goals);
        let mut buttons = Vec::new();
        buttons.extend(
            goals
                .iter()
                .filter(|g| g.state == GoalState::Failure && g.retry_feasible == Some(true))
                .map(|g| Self::goal_button("Restart", GoalState::Requested, g, ctx)),
        );
        buttons.extend(
            goals
                .iter()
                .filter(|g| g.state == GoalState::WaitingForPreApproval)
                .map(|g| Self::goal_button("Start", GoalState::PreApproved, g, ctx)),
        );
        buttons.extend(
            goals
                .iter()
                .filter(|g| g.state == GoalState::WaitingForApproval)
                .map(|g| Self::goal_button("Approve", GoalState::Approved, g, ctx)),
        );
        if ctx.is_full() && goals.iter().any(|g| g.state.is_in_flight()) {
            buttons.push(Self::cancel_button(set));
        }
        Ok(buttons)
    }
}

/// Toggles between showing the newest goal set and all goal sets.
pub struct DisplayGoalContributor;

impl DisplayGoalContributor {
    fn button(label: String, state: GoalDisplayState, format: RenderingStyle, push: &Push, ctx: &RendererContext<'_>) -> Action {
        let repo = ctx.repo();
        let state = match state {
            GoalDisplayState::ShowCurrent => "show_current",
            GoalDisplayState::ShowAll => "show_all",
        };
        Action::button(label, "UpdateSdmGoalDisplayState")
            .param("state", state)
            .param("format", format.as_str())
            .param("owner", repo.owner.clone())
            .param("name", repo.name.clone())
            .param_opt("providerId", repo.provider.as_ref().and_then(|p| p.provider_id.clone()))
            .param("branch", push.branch.clone())
            .param_opt("sha", push.after_sha())
    }
}

#[async_trait]
impl ActionContributor for DisplayGoalContributor {
    fn id(&self) -> &'static str {
        "display_goals"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        node.as_goal_set()
            .is_some_and(|s| !s.goals.is_empty() && !s.goal_set_id.is_empty())
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let (Some(set), Some(push)) = (node.as_goal_set(), push_of(ctx)) else {
            return Ok(Vec::new());
        };
        let goal_sets = ctx.lifecycle.goal_sets();
        if ctx.renderer_id != "goals" || goal_sets.len() < 2 {
            return Ok(Vec::new());
        }

        let display = push.goals_display_state.as_ref();
        let state = display.map(|d| d.state).unwrap_or(GoalDisplayState::ShowCurrent);
        let format = display.and_then(|d| d.format).unwrap_or(ctx.style);
        let count = goal_sets.len() - 1;
        let noun = if count > 1 { "sets" } else { "set" };
        let is_last = goal_sets.last().is_some_and(|s| s.goal_set_id == set.goal_set_id);

        let action = match state {
            GoalDisplayState::ShowCurrent => Some(Self::button(
                format!("{count} additional goal {noun} \u{02C5}"),
                GoalDisplayState::ShowAll,
                format,
                push,
                ctx,
            )),
            GoalDisplayState::ShowAll if is_last => Some(Self::button(
                format!("{count} additional goal {noun} \u{02C4}"),
                GoalDisplayState::ShowCurrent,
                format,
                push,
                ctx,
            )),
            GoalDisplayState::ShowAll => None,
        };
        Ok(action.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Cloud Foundry applications
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AppData {
    cloudfoundry: Option<String>,
}

#[derive(Deserialize)]
struct VcapApplication {
    application_id: Option<String>,
    application_name: Option<String>,
}

/// Info, Start, Stop and Scale buttons for Cloud Foundry applications.
pub struct ApplicationContributor;

#[async_trait]
impl ActionContributor for ApplicationContributor {
    fn id(&self) -> &'static str {
        "cf_application"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Domain(d) if !d.name.is_empty() && d.apps.iter().any(|a| a.data.is_some()))
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let LifecycleNode::Domain(domain) = node else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "application" {
            return Ok(Vec::new());
        }

        let mut app_id = None;
        let mut started = false;
        for app in &domain.apps {
            let Some(data) = app.data.as_deref() else {
                continue;
            };
            let data: AppData = serde_json::from_str(data)?;
            if let Some(vcap) = data.cloudfoundry.as_deref() {
                let vcap: VcapApplication = serde_json::from_str(vcap)?;
                if vcap.application_name.as_deref().is_some_and(|n| !n.ends_with("-old")) {
                    app_id = vcap.application_id;
                }
            }
            if matches!(app.state.as_str(), "started" | "starting" | "healthy" | "unhealthy") {
                started = true;
            }
        }

        let Some(guid) = app_id else {
            return Ok(Vec::new());
        };
        let mut buttons = vec![Action::button("Info", "CloudFoundryApplicationDetail").param("guid", guid.clone())];
        if started {
            buttons.push(
                Action::button("Stop", "StopCloudFoundryApplication")
                    .param("guid", guid.clone())
                    .confirm(Confirm::new(
                        "Stop Application",
                        "Do you really want to stop application?",
                        "Proceed",
                        "Cancel",
                    )),
            );
        } else {
            buttons.push(Action::button("Start", "StartCloudFoundryApplication").param("guid", guid.clone()));
        }
        buttons.push(Action::button("Scale", "ScaleCloudFoundryApplication").param("guid", guid));
        Ok(buttons)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
