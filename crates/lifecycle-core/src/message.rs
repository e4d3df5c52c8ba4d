//! Rendered message model.
//!
//! Two targets exist: a flat chat message made of attachments, and a
//! structured card with a fixed schema. Both are plain data and serialize
//! deterministically (ordered maps only).

use crate::lifecycle::Lifecycle;
use crate::types::RenderTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Button,
    Menu,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    pub title: String,
    pub text: String,
    pub ok_text: String,
    pub dismiss_text: String,
}

impl Confirm {
    pub fn new(title: impl Into<String>, text: impl Into<String>, ok: &str, dismiss: &str) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ok_text: ok.to_string(),
            dismiss_text: dismiss.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub text: String,
    pub value: String,
}

/// An interactive element referencing a chat command by name. The command
/// itself is executed elsewhere; the action only carries its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub text: String,
    pub kind: ActionKind,
    pub command: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirm>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<MenuOption>,
}

impl Action {
    pub fn button(text: impl Into<String>, command: &str) -> Self {
        Self {
            text: text.into(),
            kind: ActionKind::Button,
            command: command.to_string(),
            parameters: BTreeMap::new(),
            role: None,
            confirm: None,
            options: Vec::new(),
        }
    }

    pub fn menu(text: impl Into<String>, command: &str, options: Vec<MenuOption>) -> Self {
        Self {
            kind: ActionKind::Menu,
            options,
            ..Self::button(text, command)
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn param_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn global(mut self) -> Self {
        self.role = Some("global".to_string());
        self
    }

    pub fn confirm(mut self, confirm: Confirm) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Id of the renderer that produced this attachment; contributors target it.
    pub renderer_id: String,
    pub fallback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Attachment {
    pub fn new(renderer_id: &str, fallback: impl Into<String>) -> Self {
        Self {
            renderer_id: renderer_id.to_string(),
            fallback: fallback.into(),
            mrkdwn_in: vec!["text".to_string()],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub attachments: Vec<Attachment>,
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSection {
    pub renderer_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMessage {
    pub card_type: String,
    pub repository: RepositoryRef,
    pub ts: i64,
    pub sections: Vec<CardSection>,
}

// ---------------------------------------------------------------------------
// RenderedMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderedMessage {
    Chat(ChatMessage),
    Card(CardMessage),
}

impl RenderedMessage {
    pub fn target(&self) -> RenderTarget {
        match self {
            RenderedMessage::Chat(_) => RenderTarget::Chat,
            RenderedMessage::Card(_) => RenderTarget::Card,
        }
    }

    /// All actions of the message in fragment order.
    pub fn actions(&self) -> Vec<&Action> {
        match self {
            RenderedMessage::Chat(m) => m.attachments.iter().flat_map(|a| a.actions.iter()).collect(),
            RenderedMessage::Card(m) => m.sections.iter().flat_map(|s| s.actions.iter()).collect(),
        }
    }

    pub fn fragment_count(&self) -> usize {
        match self {
            RenderedMessage::Chat(m) => m.attachments.len(),
            RenderedMessage::Card(m) => m.sections.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fragment / MessageTarget
// ---------------------------------------------------------------------------

/// A piece of a message produced by one renderer for one node.
pub trait Fragment: Send {
    /// Id of the renderer that produced the fragment.
    fn renderer_id(&self) -> &str;
    fn add_actions(&mut self, actions: Vec<Action>);
}

impl Fragment for Attachment {
    fn renderer_id(&self) -> &str {
        &self.renderer_id
    }

    fn add_actions(&mut self, actions: Vec<Action>) {
        self.actions.extend(actions);
    }
}

impl Fragment for CardSection {
    fn renderer_id(&self) -> &str {
        &self.renderer_id
    }

    fn add_actions(&mut self, actions: Vec<Action>) {
        self.actions.extend(actions);
    }
}

/// A message under construction for one render target.
pub trait MessageTarget: Send + Sized + 'static {
    type Fragment: Fragment;

    const TARGET: RenderTarget;

    /// Empty message skeleton for the lifecycle.
    fn begin(lifecycle: &Lifecycle) -> Self;
    fn append(&mut self, fragment: Self::Fragment);
    fn finish(self) -> RenderedMessage;
}

impl MessageTarget for ChatMessage {
    type Fragment = Attachment;

    const TARGET: RenderTarget = RenderTarget::Chat;

    fn begin(_lifecycle: &Lifecycle) -> Self {
        ChatMessage::default()
    }

    fn append(&mut self, fragment: Attachment) {
        self.attachments.push(fragment);
    }

    fn finish(self) -> RenderedMessage {
        RenderedMessage::Chat(self)
    }
}

impl MessageTarget for CardMessage {
    type Fragment = CardSection;

    const TARGET: RenderTarget = RenderTarget::Card;

    fn begin(lifecycle: &Lifecycle) -> Self {
        let repo = lifecycle.repo();
        CardMessage {
            card_type: lifecycle.kind.as_str().to_string(),
            repository: RepositoryRef {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
                slug: repo.slug(),
            },
            ts: lifecycle.timestamp,
            sections: Vec::new(),
        }
    }

    fn append(&mut self, fragment: CardSection) {
        self.sections.push(fragment);
    }

    fn finish(self) -> RenderedMessage {
        RenderedMessage::Card(self)
    }
}
