use super::with_repo;
use crate::error::Result;
use crate::message::{Action, Confirm};
use crate::model::Issue;
use crate::node::LifecycleNode;
use crate::rendering::{ActionContributor, RendererContext};
use async_trait::async_trait;

fn issue_action(text: &str, command: &str, issue: &Issue, ctx: &RendererContext<'_>) -> Action {
    with_repo(Action::button(text, command), ctx.repo()).param("issue", issue.number.to_string())
}

fn issue_of(node: &LifecycleNode) -> Option<&Issue> {
    match node {
        LifecycleNode::Issue(issue) => Some(issue),
        _ => None,
    }
}

pub struct CommentContributor;

#[async_trait]
impl ActionContributor for CommentContributor {
    fn id(&self) -> &'static str {
        "comment"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        issue_of(node).is_some()
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        match issue_of(node) {
            Some(issue) if ctx.renderer_id == "issue" => {
                Ok(vec![issue_action("Comment", "CommentGitHubIssue", issue, ctx)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

pub struct AssignToMeContributor;

#[async_trait]
impl ActionContributor for AssignToMeContributor {
    fn id(&self) -> &'static str {
        "assign_to_me"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        issue_of(node).is_some_and(Issue::is_open)
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        match issue_of(node) {
            Some(issue) if ctx.renderer_id == "issue" => {
                Ok(vec![issue_action("Assign to me", "AssignToMeGitHubIssue", issue, ctx)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

pub struct CloseContributor;

#[async_trait]
impl ActionContributor for CloseContributor {
    fn id(&self) -> &'static str {
        "close"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        issue_of(node).is_some_and(Issue::is_open)
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        match issue_of(node) {
            Some(issue) if ctx.renderer_id == "issue" => Ok(vec![issue_action("Close", "CloseGitHubIssue", issue, ctx)
                .confirm(Confirm::new(
                    "Close Issue",
                    format!("Do you really want to close issue #{}?", issue.number),
                    "Yes",
                    "No",
                ))]),
            _ => Ok(Vec::new()),
        }
    }
}

pub struct ReopenContributor;

#[async_trait]
impl ActionContributor for ReopenContributor {
    fn id(&self) -> &'static str {
        "reopen"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        issue_of(node).is_some_and(|i| !i.is_open())
    }

    async fn buttons_for(&self, node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        match issue_of(node) {
            Some(issue) if ctx.renderer_id == "issue" => {
                Ok(vec![issue_action("Reopen", "ReopenGitHubIssue", issue, ctx)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ContextNodes, Lifecycle, ThreadIdentity};
    use crate::ordering::tests::repo;
    use crate::rendering::NoEnrichment;
    use crate::types::{LifecycleKind, RenderingStyle};

    fn issue(state: &str) -> Issue {
        Issue {
            number: 7,
            title: "Widget leaks".into(),
            body: None,
            state: state.into(),
            author: None,
            assignees: vec![],
            labels: vec![],
            timestamp: None,
        }
    }

    fn lifecycle() -> Lifecycle {
        Lifecycle {
            id: ThreadIdentity::new("issue_lifecycle/acme/widgets/7"),
            kind: LifecycleKind::Issue,
            nodes: vec![],
            context: ContextNodes::for_repo(repo()),
            channels: vec![],
            timestamp: 0,
        }
    }

    fn ctx<'a>(lc: &'a Lifecycle, renderer_id: &'a str) -> RendererContext<'a> {
        RendererContext {
            lifecycle: lc,
            renderer_id,
            auth_token: None,
            enrichment: &NoEnrichment,
            style: RenderingStyle::Full,
            default_branch: "master",
        }
    }

    #[test]
    fn open_and_closed_issues_get_opposite_buttons() {
        let open = LifecycleNode::Issue(issue("open"));
        let closed = LifecycleNode::Issue(issue("closed"));
        assert!(CloseContributor.supports(&open));
        assert!(AssignToMeContributor.supports(&open));
        assert!(!ReopenContributor.supports(&open));
        assert!(ReopenContributor.supports(&closed));
        assert!(!CloseContributor.supports(&closed));
        assert!(CommentContributor.supports(&closed));
    }

    #[tokio::test]
    async fn close_carries_issue_parameters_and_confirmation() {
        let lc = lifecycle();
        let node = LifecycleNode::Issue(issue("open"));
        let actions = CloseContributor.buttons_for(&node, &ctx(&lc, "issue")).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].command, "CloseGitHubIssue");
        assert_eq!(actions[0].parameters["owner"], "acme");
        assert_eq!(actions[0].parameters["repo"], "widgets");
        assert_eq!(actions[0].parameters["issue"], "7");
        assert!(actions[0].confirm.is_some());

        let other = CloseContributor.buttons_for(&node, &ctx(&lc, "comment")).await.unwrap();
        assert!(other.is_empty());
    }
}
