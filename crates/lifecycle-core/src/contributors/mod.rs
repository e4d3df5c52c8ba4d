//! Action contributors per lifecycle kind.
//!
//! Contributor ids are the keys channels use to switch individual
//! contributors off in `lifecycle_preferences`.

pub mod issue;
pub mod pull_request;
pub mod push;
pub mod review;

use crate::message::Action;
use crate::model::Repo;

/// Default message for tags and releases created from chat.
pub const DEFAULT_TAG_MESSAGE: &str = "Tag created by lifecycle automation";

/// `owner` and `repo` parameters shared by every repository command.
pub(crate) fn with_repo(action: Action, repo: &Repo) -> Action {
    action.param("owner", repo.owner.clone()).param("repo", repo.name.clone())
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Parse a semantic version, tolerating a leading `v`.
pub fn parse_version(text: &str) -> Option<semver::Version> {
    semver::Version::parse(text.strip_prefix('v').unwrap_or(text)).ok()
}

/// `MAJOR.MINOR.PATCH` without prerelease or build qualifiers.
pub fn release(version: &semver::Version) -> String {
    format!("{}.{}.{}", version.major, version.minor, version.patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        let v = parse_version("1.2.3-rc.1+build.5").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.pre.as_str(), "rc.1");
        assert_eq!(v.build.as_str(), "build.5");
        assert_eq!(release(&v), "1.2.3");
        assert_eq!(release(&parse_version("v0.5.32").unwrap()), "0.5.32");
    }

    #[test]
    fn rejects_non_versions() {
        assert!(parse_version("1.2").is_none());
        assert!(parse_version("1.2.3.4").is_none());
        assert!(parse_version("01.2.3").is_none());
        assert!(parse_version("release-1").is_none());
        assert!(parse_version("1.2.3-").is_none());
    }
}
