//! Branch-name rules for mission branches (`type/kebab-slug`).

use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Constraints on generated branch names (`branch_naming` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BranchNamingConfig {
    /// Type used when the proposed type is not in `valid_branch_types`.
    pub default_branch_prefix: String,
    /// Upper bound for the full `type/slug` name.
    pub max_branch_name_length: usize,
    /// Upper bound for the slug part alone.
    pub max_branch_description_length: usize,
    pub valid_branch_types: Vec<String>,
    /// Length of the HEAD sha used as a last-resort collision breaker.
    pub branch_hash_length: usize,
}

impl Default for BranchNamingConfig {
    fn default() -> Self {
        Self {
            default_branch_prefix: "feature".to_string(),
            max_branch_name_length: 60,
            max_branch_description_length: 40,
            valid_branch_types: ["feature", "fix", "polish", "docs", "refactor", "chore"]
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
            branch_hash_length: 8,
        }
    }
}

impl BranchNamingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.valid_branch_types.is_empty() {
            bail!("branch_naming.valid_branch_types must not be empty");
        }
        if !self
            .valid_branch_types
            .iter()
            .any(|t| *t == self.default_branch_prefix)
        {
            bail!(
                "branch_naming.default_branch_prefix '{}' is not one of valid_branch_types",
                self.default_branch_prefix
            );
        }
        if self.max_branch_description_length == 0 {
            bail!("branch_naming.max_branch_description_length must be > 0");
        }
        if self.branch_hash_length < 4 {
            bail!("branch_naming.branch_hash_length must be >= 4");
        }
        let min_len = self.min_branch_name_length();
        if self.max_branch_name_length < min_len {
            bail!(
                "branch_naming.max_branch_name_length must be >= {min_len} \
                 (longest type, one slug char and both collision suffixes)"
            );
        }
        Ok(())
    }

    /// Shortest name limit that still fits `type/x` plus the timestamp and sha suffixes.
    pub fn min_branch_name_length(&self) -> usize {
        let longest_type = self.valid_branch_types.iter().map(String::len).max().unwrap_or(0);
        longest_type + "/x".len() + COLLISION_SUFFIX_LEN + 1 + self.branch_hash_length
    }
}

const COLLISION_SUFFIX_LEN: usize = "-MM-DD-HH-MM-SS".len();

/// Normalize an LLM-proposed branch name to `type/slug`.
///
/// Lowercases, keeps only `[a-z0-9/-]`, forces the type into the allowed set
/// (falling back to `default_branch_prefix`) and applies both length bounds.
/// Returns `None` when no usable slug survives.
pub fn sanitize_branch_name(raw: &str, rules: &BranchNamingConfig) -> Option<String> {
    let filtered: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '/' | '-' => Some(c),
            c if c.is_whitespace() || c == '_' => Some('-'),
            _ => None,
        })
        .collect();

    let (kind, slug_source) = match filtered.split_once('/') {
        Some((kind, rest)) => {
            let kind = collapse_dashes(kind);
            if rules.valid_branch_types.iter().any(|t| *t == kind) {
                (kind, rest.to_string())
            } else {
                (rules.default_branch_prefix.clone(), filtered.clone())
            }
        }
        None => (rules.default_branch_prefix.clone(), filtered.clone()),
    };

    let mut slug = collapse_dashes(&slug_source.replace('/', "-"));
    truncate_trimmed(&mut slug, rules.max_branch_description_length);
    if slug.is_empty() {
        return None;
    }

    let mut name = format!("{kind}/{slug}");
    truncate_trimmed(&mut name, rules.max_branch_name_length);
    match name.split_once('/') {
        Some((_, slug)) if !slug.is_empty() => Some(name),
        _ => None,
    }
}

/// Suffix appended on a branch-name collision: `-MM-DD-HH-MM-SS`.
pub fn collision_suffix(now: NaiveDateTime) -> String {
    now.format("-%m-%d-%H-%M-%S").to_string()
}

/// Append `suffix` to the slug of `type/slug`, shortening only the slug so the
/// result fits `max_len`. `None` when no slug character would survive.
pub fn with_suffix(name: &str, suffix: &str, max_len: usize) -> Option<String> {
    let (kind, slug) = name.split_once('/')?;
    let room = max_len.checked_sub(kind.len() + 1 + suffix.len())?;
    let mut slug = slug.to_string();
    truncate_trimmed(&mut slug, room);
    if slug.is_empty() {
        return None;
    }
    Some(format!("{kind}/{slug}{suffix}"))
}

fn collapse_dashes(input: &str) -> String {
    input
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// Inputs are ASCII by the time they get here, so byte truncation is safe.
fn truncate_trimmed(value: &mut String, max_len: usize) {
    if value.len() > max_len {
        value.truncate(max_len);
    }
    while value.ends_with('-') || value.ends_with('/') {
        value.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rules() -> BranchNamingConfig {
        BranchNamingConfig::default()
    }

    #[test]
    fn keeps_well_formed_names() {
        let name = sanitize_branch_name("refactor/rename-foo-to-bar", &rules());
        assert_eq!(name.as_deref(), Some("refactor/rename-foo-to-bar"));
    }

    #[test]
    fn lowercases_and_strips_invalid_characters() {
        let name = sanitize_branch_name("  Fix/Login Fails_On Empty!Password ", &rules());
        assert_eq!(name.as_deref(), Some("fix/login-fails-on-emptypassword"));
    }

    #[test]
    fn unknown_type_falls_back_to_default_prefix() {
        let name = sanitize_branch_name("hotfix/crash-on-start", &rules());
        assert_eq!(name.as_deref(), Some("feature/hotfix-crash-on-start"));
    }

    #[test]
    fn missing_type_uses_default_prefix() {
        let name = sanitize_branch_name("add widget", &rules());
        assert_eq!(name.as_deref(), Some("feature/add-widget"));
    }

    #[test]
    fn slug_is_bounded_by_description_length() {
        let mut rules = rules();
        rules.max_branch_description_length = 10;
        let name = sanitize_branch_name("docs/explain-the-whole-system", &rules);
        assert_eq!(name.as_deref(), Some("docs/explain-th"));
    }

    #[test]
    fn full_name_is_bounded_and_never_ends_with_dash() {
        let mut rules = rules();
        rules.max_branch_name_length = 14;
        let name = sanitize_branch_name("feature/add-new-widget", &rules).expect("name");
        assert_eq!(name, "feature/add-ne");
        assert!(name.len() <= 14);
    }

    #[test]
    fn empty_slug_is_rejected() {
        assert_eq!(sanitize_branch_name("fix/!!!", &rules()), None);
        assert_eq!(sanitize_branch_name("", &rules()), None);
        assert_eq!(sanitize_branch_name("???", &rules()), None);
    }

    #[test]
    fn collision_suffix_uses_month_day_time() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 7)
            .and_then(|d| d.and_hms_opt(9, 5, 2))
            .expect("date");
        assert_eq!(collision_suffix(now), "-03-07-09-05-02");
    }

    #[test]
    fn with_suffix_shortens_base_to_fit() {
        let out = with_suffix("refactor/rename-foo-to-bar", "-03-07-09-05-02", 30).expect("fits");
        assert_eq!(out, "refactor/rename-03-07-09-05-02");
        assert!(out.len() <= 30);

        let roomy = with_suffix("fix/a", "-01-02-03-04-05", 60).expect("fits");
        assert_eq!(roomy, "fix/a-01-02-03-04-05");
    }

    #[test]
    fn with_suffix_never_cuts_into_the_type() {
        assert_eq!(with_suffix("refactor/rename-foo", "-03-07-09-05-02", 20), None);
        assert_eq!(with_suffix("refactor/rename-foo", "-03-07-09-05-02", 24), None);

        let out = with_suffix("refactor/rename-foo", "-03-07-09-05-02", 25).expect("fits");
        assert_eq!(out, "refactor/r-03-07-09-05-02");
        let (kind, slug) = out.split_once('/').expect("type/slug");
        assert_eq!(kind, "refactor");
        assert!(slug.starts_with('r'));

        assert_eq!(with_suffix("no-type", "-x", 60), None);
    }

    #[test]
    fn rules_require_room_for_collision_suffixes() {
        let mut tight = rules();
        tight.max_branch_name_length = 20;
        let err = tight.validate().expect_err("too short");
        assert!(err.to_string().contains("max_branch_name_length must be >= 34"), "{err}");

        tight.max_branch_name_length = 34;
        assert!(tight.validate().is_ok());

        // Every allowed type keeps its shape through both renames at the minimum length.
        for kind in &tight.valid_branch_types {
            let name = sanitize_branch_name(&format!("{kind}/rename-foo-to-bar"), &tight)
                .expect("name");
            let first = with_suffix(&name, "-03-07-09-05-02", tight.max_branch_name_length)
                .expect("timestamp rename");
            let second = with_suffix(&first, "-abcdef12", tight.max_branch_name_length)
                .expect("sha rename");
            assert!(second.starts_with(&format!("{kind}/r")), "{second}");
            assert!(second.len() <= 34, "{second}");
        }
    }

    #[test]
    fn rules_reject_prefix_outside_allowed_types() {
        assert!(rules().validate().is_ok());
        let mut bad = rules();
        bad.default_branch_prefix = "hotfix".to_string();
        assert!(bad.validate().is_err());
        bad = rules();
        bad.valid_branch_types.clear();
        assert!(bad.validate().is_err());
    }
}
