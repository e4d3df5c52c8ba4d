use super::with_repo;
use crate::error::Result;
use crate::message::Action;
use crate::node::LifecycleNode;
use crate::rendering::{ActionContributor, RendererContext};
use async_trait::async_trait;

/// Reply on the reviewed pull request.
pub struct CommentContributor;

#[async_trait]
impl ActionContributor for CommentContributor {
    fn id(&self) -> &'static str {
        "comment"
    }

    fn supports(&self, node: &LifecycleNode) -> bool {
        matches!(node, LifecycleNode::Review(_))
    }

    async fn buttons_for(&self, _node: &LifecycleNode, ctx: &RendererContext<'_>) -> Result<Vec<Action>> {
        let Some(pr) = ctx.lifecycle.context.pull_request.as_ref() else {
            return Ok(Vec::new());
        };
        if ctx.renderer_id != "review" {
            return Ok(Vec::new());
        }
        Ok(vec![with_repo(Action::button("Comment", "CommentGitHubIssue"), ctx.repo())
            .param("issue", pr.number.to_string())])
    }
}
