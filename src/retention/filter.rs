//! Pure election predicates. All time-dependent checks take `now` as a
//! parameter so they stay deterministic under test.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::time::Duration;

use super::policy::RetentionPolicy;
use crate::github::PackageVersion;

/// The package type whose versions carry tags and may reference an
/// OCI image index.
pub const CONTAINER_TYPE: &str = "container";

/// Outcome of the age check for one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeVerdict {
    /// Old enough (or the age filter is disabled).
    Elect,
    /// No update timestamp, so age cannot be established.
    NoTimestamp,
    /// Updated within the age threshold.
    TooNew,
}

/// Whether a version passes the configured name pattern.
///
/// Container versions match on their tags, every other package type on
/// the version name. Matching is case-sensitive substring semantics
/// (`Regex::is_match`); callers wanting a full match must anchor the
/// pattern themselves. No configured pattern matches everything.
pub fn matches_pattern(version: &PackageVersion, policy: &RetentionPolicy) -> bool {
    let Some(pattern) = &policy.version_match else {
        return true;
    };

    if policy.package_type == CONTAINER_TYPE {
        any_tag_matches(version, pattern)
    } else {
        pattern.is_match(&version.name)
    }
}

fn any_tag_matches(version: &PackageVersion, pattern: &Regex) -> bool {
    version.tags().iter().any(|tag| pattern.is_match(tag))
}

/// Whether a pattern-matched version should have its image reference
/// resolved against the registry to discover index children. Only
/// meaningful for versions that already passed [`matches_pattern`].
pub fn should_walk_index(version: &PackageVersion, policy: &RetentionPolicy) -> bool {
    policy.version_match.is_some()
        && policy.package_type == CONTAINER_TYPE
        && !version.tags().is_empty()
}

/// Applies the age threshold. The boundary is inclusive: a version
/// updated exactly `age` ago is elected.
pub fn age_verdict(
    updated_at: Option<DateTime<Utc>>,
    age: Duration,
    now: DateTime<Utc>,
) -> AgeVerdict {
    if age.is_zero() {
        return AgeVerdict::Elect;
    }

    let Some(updated_at) = updated_at else {
        return AgeVerdict::NoTimestamp;
    };

    match now.signed_duration_since(updated_at).to_std() {
        // Updated in the future counts as newer than any threshold.
        Err(_) => AgeVerdict::TooNew,
        Ok(elapsed) if elapsed >= age => AgeVerdict::Elect,
        Ok(_) => AgeVerdict::TooNew,
    }
}
