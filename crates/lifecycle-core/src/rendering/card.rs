//! Card renderers.
//!
//! Push and goal-set sections have their own layout. The remaining node kinds
//! reuse the chat narrative and reshape it into a card section.

use super::chat;
use super::{NodeRenderer, RendererContext};
use crate::message::{Attachment, CardMessage, CardSection, ChatMessage};
use crate::node::LifecycleNode;
use crate::ordering::last_goal_set;

fn icon(renderer_id: &str) -> Option<String> {
    let name = match renderer_id {
        "push" | "commit" => "commit",
        "build" => "build",
        "tag" => "tag",
        "goals" => "goals",
        "application" => "cloud",
        "issue" => "issue",
        "pull_request" => "pull-request",
        "review" => "review",
        _ => return None,
    };
    Some(format!("icon:{name}"))
}

// ---------------------------------------------------------------------------
// Dedicated layouts
// ---------------------------------------------------------------------------

pub struct PushCardRenderer;

impl NodeRenderer<CardMessage> for PushCardRenderer {
    fn id(&self) -> &'static str {
        "push"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Push(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<CardSection> {
        let push = node.as_push()?;
        let after = push.after.as_ref()?;
        let author = after.author.as_ref().map(|a| a.login.as_str()).unwrap_or("unknown");
        Some(CardSection {
            renderer_id: self.id().to_string(),
            title: format!("{} pushed to {}", author, push.branch),
            text: Some(after.title().to_string()),
            icon: icon(self.id()),
            link: Some(format!("{}/commit/{}", ctx.repo().url(), after.sha)),
            actions: Vec::new(),
        })
    }
}

pub struct GoalSetCardRenderer;

impl NodeRenderer<CardMessage> for GoalSetCardRenderer {
    fn id(&self) -> &'static str {
        "goals"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::GoalSet(_))
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<CardSection> {
        let set = node.as_goal_set()?;
        if !ctx.shows_goal_set(set) {
            return None;
        }
        let lines: Vec<String> = last_goal_set(&set.goals)
            .into_iter()
            .map(|g| format!("{}: {}", g.name, g.state))
            .collect();
        let short_id: String = set.goal_set_id.chars().take(7).collect();
        Some(CardSection {
            renderer_id: self.id().to_string(),
            title: format!("Goal set {short_id}"),
            text: Some(lines.join("\n")),
            icon: icon(self.id()),
            link: None,
            actions: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Chat-backed sections
// ---------------------------------------------------------------------------

/// Card renderer backed by a chat renderer.
pub struct FromChat<R>(pub R);

fn section(attachment: Attachment) -> CardSection {
    let title = attachment
        .title
        .or(attachment.author_name)
        .unwrap_or_else(|| attachment.fallback.clone());
    CardSection {
        icon: icon(&attachment.renderer_id),
        renderer_id: attachment.renderer_id,
        title,
        text: attachment.text,
        link: attachment.title_link.or(attachment.author_link),
        actions: Vec::new(),
    }
}

impl<R: NodeRenderer<ChatMessage>> NodeRenderer<CardMessage> for FromChat<R> {
    fn id(&self) -> &'static str {
        self.0.id()
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        self.0.supports(node)
    }

    fn render(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Option<CardSection> {
        self.0.render(node, ctx).map(section)
    }
}

pub fn commit() -> FromChat<chat::CommitRenderer> {
    FromChat(chat::CommitRenderer)
}

pub fn build() -> FromChat<chat::BuildRenderer> {
    FromChat(chat::BuildRenderer)
}

pub fn tag() -> FromChat<chat::TagRenderer> {
    FromChat(chat::TagRenderer)
}

pub fn application() -> FromChat<chat::ApplicationRenderer> {
    FromChat(chat::ApplicationRenderer)
}

pub fn issue() -> FromChat<chat::IssueRenderer> {
    FromChat(chat::IssueRenderer)
}

pub fn pull_request() -> FromChat<chat::PullRequestRenderer> {
    FromChat(chat::PullRequestRenderer)
}

pub fn review() -> FromChat<chat::ReviewRenderer> {
    FromChat(chat::ReviewRenderer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ContextNodes, Lifecycle, ThreadIdentity};
    use crate::model::{GoalDisplayState, GoalsDisplay};
    use crate::node::GoalSet;
    use crate::ordering::tests::{goal, push, repo};
    use crate::rendering::NoEnrichment;
    use crate::types::{GoalState, LifecycleKind, RenderingStyle};

    fn goal_set(id: &str, ts: i64, state: GoalState) -> GoalSet {
        GoalSet {
            goal_set_id: id.into(),
            ts,
            goals: vec![goal("build", id, ts, state)],
        }
    }

    fn lifecycle(display: Option<GoalDisplayState>, goal_sets: Vec<GoalSet>) -> Lifecycle {
        let mut p = push();
        p.goals_display_state = display.map(|state| GoalsDisplay { state, format: None });
        let mut context = ContextNodes::for_repo(repo());
        context.push = Some(p);
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

    fn ctx(lifecycle: &Lifecycle) -> RendererContext<'_> {
        RendererContext {
            lifecycle,
            renderer_id: "goals",
            auth_token: None,
            enrichment: &NoEnrichment,
            style: RenderingStyle::Full,
            default_branch: "master",
        }
    }

    #[test]
    fn goal_set_card_follows_display_state() {
        let newest = goal_set("g2", 3, GoalState::InProcess);
        let older = goal_set("g1", 1, GoalState::Success);
        let sets = vec![newest.clone(), older.clone()];

        let lc = lifecycle(None, sets.clone());
        let section = GoalSetCardRenderer
            .render(&LifecycleNode::GoalSet(newest.clone()), &ctx(&lc))
            .unwrap();
        assert_eq!(section.title, "Goal set g2");
        assert!(GoalSetCardRenderer
            .render(&LifecycleNode::GoalSet(older.clone()), &ctx(&lc))
            .is_none());

        let lc = lifecycle(Some(GoalDisplayState::ShowAll), sets);
        assert!(GoalSetCardRenderer
            .render(&LifecycleNode::GoalSet(older), &ctx(&lc))
            .is_some());
    }

    #[test]
    fn section_prefers_title_then_author() {
        let mut a = Attachment::new("issue", "fallback");
        a.author_name = Some("alice".into());
        assert_eq!(section(a.clone()).title, "alice");
        a.title = Some("#1: Bug".into());
        a.title_link = Some("https://github.com/acme/widgets/issues/1".into());
        let s = section(a);
        assert_eq!(s.title, "#1: Bug");
        assert_eq!(s.icon.as_deref(), Some("icon:issue"));
        assert!(s.link.is_some());
    }
}
