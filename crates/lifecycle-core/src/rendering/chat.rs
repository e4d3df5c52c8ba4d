//! Chat renderers: one attachment per supported node.

use super::format::{bold, build_color, code, escape, goal_set_color, italic, link, plural, status_emoji, truncate_title};
use super::{NodeRenderer, RendererContext};
use crate::message::{Attachment, ChatMessage};
use crate::model::{Commit, Person};
use crate::node::LifecycleNode;
use crate::ordering::last_goal_set;

fn login(person: Option<&Person>) -> &str {
    person.map(|p| p.login.as_str()).unwrap_or("unknown")
}

fn commit_line(repo_url: &str, commit: &Commit) -> String {
    let sha = link(&format!("{repo_url}/commit/{}", commit.sha), commit.short_sha());
    let title = escape(&truncate_title(commit.message.as_deref().unwrap_or("")));
    format!("{} {title} - {}", code(&sha), login(commit.author.as_ref()))
}

// ---------------------------------------------------------------------------
// Push lifecycle
// ---------------------------------------------------------------------------

pub struct PushRenderer;

impl NodeRenderer<ChatMessage> for PushRenderer {
    fn id(&self) -> &'static str {
        "push"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Push(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let push = node.as_push()?;
        let repo = ctx.repo();
        let summary = format!(
            "{} to {}/{}",
            plural(push.commits.len(), "new commit"),
            repo.slug(),
            push.branch
        );
        let mut attachment = Attachment::new(self.id(), summary.clone());
        attachment.author_name = Some(summary);
        attachment.author_link = Some(format!("{}/tree/{}", repo.url(), push.branch));
        Some(attachment)
    }
}

/// Commits of a push. Compact rendering shows only the terminal commit.
pub struct CommitRenderer;

impl NodeRenderer<ChatMessage> for CommitRenderer {
    fn id(&self) -> &'static str {
        "commit"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Push(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let push = node.as_push()?;
        let repo_url = ctx.repo().url();
        let lines: Vec<String> = if ctx.is_full() {
            push.commits.iter().map(|c| commit_line(&repo_url, c)).collect()
        } else {
            push.after.iter().map(|c| commit_line(&repo_url, c)).collect()
        };
        if lines.is_empty() {
            return None;
        }
        let mut attachment = Attachment::new(self.id(), plural(push.commits.len(), "commit"));
        attachment.text = Some(lines.join("\n"));
        Some(attachment)
    }
}

/// Commit statuses of the terminal commit.
pub struct StatusesRenderer;

impl NodeRenderer<ChatMessage> for StatusesRenderer {
    fn id(&self) -> &'static str {
        "statuses"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        node.as_push()
            .and_then(|p| p.after.as_ref())
            .is_some_and(|c| !c.statuses.is_empty())
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let after = node.as_push()?.after.as_ref()?;
        let passed = after.statuses.iter().filter(|s| s.is_success()).count();
        let summary = format!("{passed} of {} checks passed", after.statuses.len());
        let mut lines = vec![summary.clone()];
        if ctx.is_full() {
            let mut statuses: Vec<_> = after.statuses.iter().collect();
            statuses.sort_by(|a, b| a.context.cmp(&b.context));
            lines.extend(statuses.into_iter().map(|s| {
                let name = match s.target_url.as_deref() {
                    Some(url) => link(url, &s.context),
                    None => escape(&s.context),
                };
                format!("{} {name}", status_emoji(&s.state))
            }));
        }
        let mut attachment = Attachment::new(self.id(), summary);
        attachment.text = Some(lines.join("\n"));
        Some(attachment)
    }
}

/// A goal set. Unless the push asks to show all goal sets, only the newest
/// one is rendered.
pub struct GoalSetRenderer;

impl NodeRenderer<ChatMessage> for GoalSetRenderer {
    fn id(&self) -> &'static str {
        "goals"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::GoalSet(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let set = node.as_goal_set()?;
        if !ctx.shows_goal_set(set) {
            return None;
        }

        let goals = last_goal_set(&set.goals);
        let short_id: String = set.goal_set_id.chars().take(7).collect();
        let mut attachment = Attachment::new(self.id(), format!("Goal set {short_id}"));
        attachment.color = Some(goal_set_color(goals.iter().map(|g| &g.state)).to_string());

        let text = if ctx.is_full() {
            goals
                .iter()
                .map(|g| {
                    let name = match g.url.as_deref() {
                        Some(url) => link(url, &g.name),
                        None => escape(&g.name),
                    };
                    let description = g.description.as_deref().map(escape).unwrap_or_default();
                    format!("{} {name} {description}", g.state.emoji()).trim_end().to_string()
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            let done = goals.iter().filter(|g| !g.state.is_in_flight()).count();
            format!("{done} of {} goals completed", goals.len())
        };
        attachment.title = Some(format!("Goals {}", code(&short_id)));
        attachment.text = Some(text);
        Some(attachment)
    }
}

pub struct WorkflowRenderer;

impl NodeRenderer<ChatMessage> for WorkflowRenderer {
    fn id(&self) -> &'static str {
        "workflow"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Workflow(_))
    }

    fn render(&self, node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Workflow(workflow) = node else {
            return None;
        };
        let name = workflow.name.as_deref().unwrap_or(&workflow.id);
        let mut attachment = Attachment::new(self.id(), format!("Workflow {name}"));
        attachment.text = Some(format!("Workflow {}", italic(&escape(name))));
        Some(attachment)
    }
}

pub struct TagRenderer;

impl NodeRenderer<ChatMessage> for TagRenderer {
    fn id(&self) -> &'static str {
        "tag"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Tag(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let tag = node.as_tag()?;
        let name = tag.name.as_deref()?;
        let url = format!("{}/releases/tag/{name}", ctx.repo().url());
        let mut text = format!("Tagged {}", code(&link(&url, name)));
        if let Some(release) = &tag.release {
            text.push_str(&format!(" - released as {}", bold(&escape(&release.name))));
        }
        let mut attachment = Attachment::new(self.id(), format!("Tag {name}"));
        attachment.text = Some(text);
        Some(attachment)
    }
}

/// A CI build. Shared by push and pull request lifecycles.
pub struct BuildRenderer;

impl NodeRenderer<ChatMessage> for BuildRenderer {
    fn id(&self) -> &'static str {
        "build"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Build(_))
    }

    fn render(&self, node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Build(build) = node else {
            return None;
        };
        let name = build.name.as_deref().or(build.build_id.as_deref()).unwrap_or("build");
        let label = match build.build_url.as_deref() {
            Some(url) => link(url, &format!("Build #{name}")),
            None => format!("Build #{}", escape(name)),
        };
        let mut attachment = Attachment::new(self.id(), format!("Build #{name} {}", build.status));
        attachment.text = Some(format!("{label} {}", build.status));
        attachment.color = Some(build_color(build.status).to_string());
        Some(attachment)
    }
}

/// Running applications of one domain.
pub struct ApplicationRenderer;

impl NodeRenderer<ChatMessage> for ApplicationRenderer {
    fn id(&self) -> &'static str {
        "application"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Domain(d) if !d.apps.is_empty())
    }

    fn render(&self, node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Domain(domain) = node else {
            return None;
        };
        let lines: Vec<String> = domain
            .apps
            .iter()
            .map(|a| {
                let host = match a.host.as_deref() {
                    Some(h) => format!("{h}.{}", a.domain),
                    None => a.domain.clone(),
                };
                format!("{} {}", code(&host), a.state)
            })
            .collect();
        let mut attachment = Attachment::new(self.id(), format!("Domain {}", domain.name));
        attachment.title = Some(escape(&domain.name));
        attachment.text = Some(lines.join("\n"));
        Some(attachment)
    }
}

// ---------------------------------------------------------------------------
// Issue, pull request and review lifecycles
// ---------------------------------------------------------------------------

pub struct IssueRenderer;

impl NodeRenderer<ChatMessage> for IssueRenderer {
    fn id(&self) -> &'static str {
        "issue"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Issue(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Issue(issue) = node else {
            return None;
        };
        let title = format!("#{}: {}", issue.number, issue.title);
        let mut attachment = Attachment::new(self.id(), title.clone());
        attachment.author_name = Some(login(issue.author.as_ref()).to_string());
        attachment.title = Some(escape(&title));
        attachment.title_link = Some(format!("{}/issues/{}", ctx.repo().url(), issue.number));
        attachment.color = Some(if issue.is_open() { "#45B254" } else { "#B5B5B5" }.to_string());

        let mut text = Vec::new();
        if ctx.is_full() {
            if let Some(body) = issue.body.as_deref().filter(|b| !b.trim().is_empty()) {
                text.push(escape(body.trim()));
            }
        }
        if !issue.labels.is_empty() {
            let labels: Vec<String> = issue.labels.iter().map(|l| code(&l.name)).collect();
            text.push(labels.join(" "));
        }
        if !issue.assignees.is_empty() {
            let assignees: Vec<&str> = issue.assignees.iter().map(|p| p.login.as_str()).collect();
            text.push(format!("Assigned to {}", assignees.join(", ")));
        }
        if !text.is_empty() {
            attachment.text = Some(text.join("\n"));
        }
        attachment.footer = Some(issue.state.clone());
        Some(attachment)
    }
}

pub struct CommentRenderer;

impl NodeRenderer<ChatMessage> for CommentRenderer {
    fn id(&self) -> &'static str {
        "comment"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Comment(_))
    }

    fn render(&self, node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Comment(comment) = node else {
            return None;
        };
        let author = login(comment.author.as_ref());
        let mut attachment = Attachment::new(self.id(), format!("New comment by {author}"));
        attachment.author_name = Some(author.to_string());
        attachment.text = Some(escape(comment.body.trim()));
        Some(attachment)
    }
}

pub struct PullRequestRenderer;

impl NodeRenderer<ChatMessage> for PullRequestRenderer {
    fn id(&self) -> &'static str {
        "pull_request"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::PullRequest(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::PullRequest(pr) = node else {
            return None;
        };
        let state = if pr.merged { "merged" } else { pr.state.as_str() };
        let title = format!("#{}: {}", pr.number, pr.title);
        let mut attachment = Attachment::new(self.id(), title.clone());
        attachment.author_name = Some(login(pr.author.as_ref()).to_string());
        attachment.title = Some(escape(&title));
        attachment.title_link = Some(format!("{}/pull/{}", ctx.repo().url(), pr.number));
        attachment.color = Some(
            match state {
                "merged" => "#6F42C1",
                "open" => "#45B254",
                _ => "#B5B5B5",
            }
            .to_string(),
        );
        let mut text = vec![format!(
            "{} {} into {}",
            plural(pr.commits.len(), "commit"),
            code(&pr.branch_name),
            code(&pr.base_branch_name)
        )];
        if ctx.is_full() {
            if let Some(body) = pr.body.as_deref().filter(|b| !b.trim().is_empty()) {
                text.push(escape(body.trim()));
            }
        }
        attachment.text = Some(text.join("\n"));
        attachment.footer = Some(state.to_string());
        Some(attachment)
    }
}

/// A single commit status on a pull request head.
pub struct StatusRenderer;

impl NodeRenderer<ChatMessage> for StatusRenderer {
    fn id(&self) -> &'static str {
        "status"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Status(_))
    }

    fn render(&self, node: &LifecycleNode, _ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Status(status) = node else {
            return None;
        };
        let name = match status.target_url.as_deref() {
            Some(url) => link(url, &status.context),
            None => escape(&status.context),
        };
        let mut text = format!("{} {name}", status_emoji(&status.state));
        if let Some(description) = status.description.as_deref() {
            text.push_str(&format!(" {}", italic(&escape(description))));
        }
        let mut attachment = Attachment::new(self.id(), format!("{} {}", status.context, status.state));
        attachment.text = Some(text);
        Some(attachment)
    }
}

pub struct ReviewRenderer;

impl NodeRenderer<ChatMessage> for ReviewRenderer {
    fn id(&self) -> &'static str {
        "review"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Review(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<Attachment> {
        let LifecycleNode::Review(review) = node else {
            return None;
        };
        let by: Vec<&str> = review.by.iter().map(|p| p.login.as_str()).collect();
        let reviewers = if by.is_empty() { "unknown".to_string() } else { by.join(", ") };
        let state = review.state.replace('_', " ");
        let summary = format!("Review {state} by {reviewers}");
        let mut attachment = Attachment::new(self.id(), summary.clone());
        attachment.text = Some(match review.body.as_deref().filter(|b| ctx.is_full() && !b.trim().is_empty()) {
            Some(body) => format!("{summary}\n{}", escape(body.trim())),
            None => summary,
        });
        attachment.title_link = review.html_url.clone();
        attachment.color = Some(
            match review.state.as_str() {
                "approved" => "#45B254",
                "changes_requested" => "#D94649",
                _ => "#B5B5B5",
            }
            .to_string(),
        );
        Some(attachment)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ContextNodes, Lifecycle, ThreadIdentity};
    use crate::node::GoalSet;
    use crate::ordering::tests::{goal, push, repo};
    use crate::rendering::NoEnrichment;
    use crate::types::{GoalState, LifecycleKind, RenderingStyle};

    fn lifecycle(goal_sets: Vec<GoalSet>) -> Lifecycle {
        let mut context = ContextNodes::for_repo(repo());
        context.push = Some(push());
        context.goal_sets = goal_sets;
        Lifecycle {
            id: ThreadIdentity::new("push_lifecycle/acme/widgets/main/abc123"),
            kind: LifecycleKind::Push,
            nodes: vec![],
            context,
            channels: vec![],
            timestamp: 0,
        }
    }

    fn ctx<'a>(lifecycle: &'a Lifecycle, style: RenderingStyle) -> RendererContext<'a> {
        RendererContext {
            lifecycle,
            renderer_id: "",
            auth_token: None,
            enrichment: &NoEnrichment,
            style,
            default_branch: "master",
        }
    }

    #[test]
    fn push_summary() {
        let lc = lifecycle(vec![]);
        let node = LifecycleNode::Push(Box::new(push()));
        let a = PushRenderer.render(&node, &ctx(&lc, RenderingStyle::Full)).unwrap();
        assert_eq!(a.author_name.as_deref(), Some("1 new commit to acme/widgets/main"));
        assert_eq!(a.renderer_id, "push");
    }

    #[test]
    fn only_newest_goal_set_rendered_by_default() {
        let newest = GoalSet {
            goal_set_id: "g2".into(),
            ts: 3,
            goals: vec![goal("build", "g2", 3, GoalState::InProcess)],
        };
        let older = GoalSet {
            goal_set_id: "g1".into(),
            ts: 1,
            goals: vec![goal("build", "g1", 1, GoalState::Success)],
        };
        let lc = lifecycle(vec![newest.clone(), older.clone()]);
        let c = ctx(&lc, RenderingStyle::Full);
        assert!(GoalSetRenderer.render(&LifecycleNode::GoalSet(newest), &c).is_some());
        assert!(GoalSetRenderer.render(&LifecycleNode::GoalSet(older), &c).is_none());
    }

    #[test]
    fn compact_goal_set_summarises() {
        let set = GoalSet {
            goal_set_id: "g1".into(),
            ts: 1,
            goals: vec![
                goal("build", "g1", 1, GoalState::Success),
                goal("deploy", "g1", 2, GoalState::WaitingForApproval),
            ],
        };
        let lc = lifecycle(vec![set.clone()]);
        let a = GoalSetRenderer
            .render(&LifecycleNode::GoalSet(set), &ctx(&lc, RenderingStyle::Compact))
            .unwrap();
        assert_eq!(a.text.as_deref(), Some("1 of 2 goals completed"));
    }
}
