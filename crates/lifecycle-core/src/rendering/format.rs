//! Chat markup helpers.

use crate::types::{BuildStatus, GoalState};

const MAX_TITLE: usize = 50;

/// Escape the characters chat markup reserves.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn link(url: &str, text: &str) -> String {
    format!("<{url}|{}>", escape(text))
}

pub fn code(text: &str) -> String {
    format!("`{text}`")
}

pub fn bold(text: &str) -> String {
    format!("*{text}*")
}

pub fn italic(text: &str) -> String {
    format!("_{text}_")
}

/// `1 commit`, `2 commits`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// First line of a commit message, shortened to fit one chat line.
pub fn truncate_title(message: &str) -> String {
    let first = message.lines().next().unwrap_or("").trim();
    if first.chars().count() <= MAX_TITLE {
        return first.to_string();
    }
    let cut: String = first.chars().take(MAX_TITLE).collect();
    format!("{}...", cut.trim_end())
}

pub fn build_color(status: BuildStatus) -> &'static str {
    match status {
        BuildStatus::Passed => "#45B254",
        BuildStatus::Failed | BuildStatus::Broken | BuildStatus::Error => "#D94649",
        BuildStatus::Canceled => "#B5B5B5",
        BuildStatus::Started | BuildStatus::Pending => "#2A7D7D",
    }
}

/// Color of a goal set by its most significant state.
pub fn goal_set_color<'a>(states: impl IntoIterator<Item = &'a GoalState>) -> &'static str {
    let states: Vec<&GoalState> = states.into_iter().collect();
    if states.iter().any(|s| **s == GoalState::Failure) {
        "#D94649"
    } else if states.iter().any(|s| s.is_in_flight()) {
        "#2A7D7D"
    } else if states.iter().any(|s| matches!(s, GoalState::Stopped | GoalState::Canceled)) {
        "#B5B5B5"
    } else {
        "#45B254"
    }
}

pub fn status_emoji(state: &str) -> &'static str {
    match state {
        "success" => ":white_check_mark:",
        "pending" => ":large_blue_circle:",
        _ => ":red_circle:",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_titles() {
        let long = "a".repeat(60);
        let title = truncate_title(&format!("{long}\nbody"));
        assert_eq!(title.len(), MAX_TITLE + 3);
        assert!(title.ends_with("..."));
        assert_eq!(truncate_title("Short\nbody"), "Short");
    }

    #[test]
    fn links_escape_text() {
        assert_eq!(link("https://x", "a<b"), "<https://x|a&lt;b>");
        assert_eq!(plural(1, "commit"), "1 commit");
        assert_eq!(plural(3, "commit"), "3 commits");
    }

    #[test]
    fn failure_dominates_goal_set_color() {
        let states = [GoalState::Success, GoalState::Failure, GoalState::InProcess];
        assert_eq!(goal_set_color(states.iter()), "#D94649");
        assert_eq!(goal_set_color([GoalState::Success].iter()), "#45B254");
    }
}
