//! Chat-team preferences.
//!
//! Preferences are owned by the chat platform and arrive as a snapshot with
//! each event: `team id -> [{name, value}]`. Values are strings, some of them
//! JSON documents.

use crate::error::{LifecycleError, Result};
use crate::lifecycle::Channel;
use crate::types::{LifecycleKind, RenderingStyle};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Branch routing rules, see [`crate::router`].
pub const LIFECYCLE_BRANCHES: &str = "lifecycle_branches";

/// Per-channel lifecycle switches: mute, rendering style, disabled
/// renderers and contributors.
pub const LIFECYCLE_PREFERENCES: &str = "lifecycle_preferences";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub name: String,
    pub value: String,
}

impl Preference {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// `team id -> preferences` snapshot.
pub type TeamPreferences = BTreeMap<String, Vec<Preference>>;

/// Value of the named preference for a team, if set.
pub fn find_preference<'a>(prefs: &'a TeamPreferences, team_id: &str, name: &str) -> Option<&'a str> {
    prefs
        .get(team_id)?
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.as_str())
}

// ---------------------------------------------------------------------------
// ChannelPreferences
// ---------------------------------------------------------------------------

/// Effective lifecycle settings for one channel and lifecycle kind.
///
/// Ordered so channels can be grouped by identical settings in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelPreferences {
    pub enabled: bool,
    pub style: Option<RenderingStyle>,
    pub disabled_renderers: BTreeSet<String>,
    pub disabled_contributors: BTreeSet<String>,
}

impl Default for ChannelPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            style: None,
            disabled_renderers: BTreeSet::new(),
            disabled_contributors: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct KindSettings {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    rendering_style: Option<RenderingStyle>,
    #[serde(default)]
    renderers: BTreeMap<String, bool>,
    #[serde(default)]
    contributors: BTreeMap<String, bool>,
}

type LifecycleSettings = BTreeMap<String, BTreeMap<String, KindSettings>>;

fn disabled(switches: BTreeMap<String, bool>) -> BTreeSet<String> {
    switches
        .into_iter()
        .filter(|(_, on)| !on)
        .map(|(id, _)| id)
        .collect()
}

/// Parse the `lifecycle_preferences` value for one channel and kind.
pub fn parse_channel_preferences(
    team_id: &str,
    value: &str,
    channel: &str,
    kind: LifecycleKind,
) -> Result<ChannelPreferences> {
    let mut settings: LifecycleSettings =
        serde_json::from_str(value).map_err(|e| LifecycleError::PreferenceParse {
            team: team_id.to_string(),
            preference: LIFECYCLE_PREFERENCES.to_string(),
            reason: e.to_string(),
        })?;

    let Some(kind_settings) = settings.get_mut(channel).and_then(|k| k.remove(kind.as_str())) else {
        return Ok(ChannelPreferences::default());
    };

    Ok(ChannelPreferences {
        enabled: kind_settings.enabled.unwrap_or(true),
        style: kind_settings.rendering_style,
        disabled_renderers: disabled(kind_settings.renderers),
        disabled_contributors: disabled(kind_settings.contributors),
    })
}

/// Effective preferences of a channel. A malformed preference is logged and
/// treated as unset.
pub fn channel_preferences(prefs: &TeamPreferences, channel: &Channel, kind: LifecycleKind) -> ChannelPreferences {
    let Some(value) = find_preference(prefs, &channel.team_id, LIFECYCLE_PREFERENCES) else {
        return ChannelPreferences::default();
    };
    match parse_channel_preferences(&channel.team_id, value, &channel.name, kind) {
        Ok(p) => p,
        Err(e) => {
            warn!(channel = %channel.name, error = %e, "ignoring lifecycle preferences");
            ChannelPreferences::default()
        }
    }
}

/// Group channels by identical effective preferences. One message is rendered
/// per group.
pub fn group_by_preferences(
    channels: &[Channel],
    prefs: &TeamPreferences,
    kind: LifecycleKind,
) -> BTreeMap<ChannelPreferences, Vec<Channel>> {
    let mut groups: BTreeMap<ChannelPreferences, Vec<Channel>> = BTreeMap::new();
    for channel in channels {
        groups
            .entry(channel_preferences(prefs, channel, kind))
            .or_default()
            .push(channel.clone());
    }
    groups
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
