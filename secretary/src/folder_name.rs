//! Folder-name sanitization and the deterministic fallback.

use std::sync::LazyLock;

use regex::Regex;

const FALLBACK_TITLE_CHARS: usize = 50;
const FALLBACK_PLACEHOLDER: &str = "task";

static NON_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\-]").expect("folder-name regex is valid")
});

/// Lowercase, spaces to `-`, drop everything outside `[\w-]`.
pub fn sanitize_folder_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase().replace(' ', "-");
    NON_NAME_CHARS.replace_all(&lowered, "").into_owned()
}

/// Sanitized title (at most 50 chars, or `task`) plus `-<millis>`.
pub fn fallback_folder_name(title: &str, millis: i64) -> String {
    let sanitized: String = sanitize_folder_name(title)
        .chars()
        .take(FALLBACK_TITLE_CHARS)
        .collect();
    let base = if sanitized.is_empty() {
        FALLBACK_PLACEHOLDER
    } else {
        sanitized.as_str()
    };
    format!("{base}-{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_llm_names() {
        assert_eq!(sanitize_folder_name("Add Widget"), "add-widget");
        assert_eq!(sanitize_folder_name(" fix/login: empty pw! "), "fixlogin-empty-pw");
        assert_eq!(sanitize_folder_name("snake_case_ok"), "snake_case_ok");
        assert_eq!(sanitize_folder_name("../../etc"), "etc");
        assert_eq!(sanitize_folder_name("!!!"), "");
    }

    #[test]
    fn fallback_truncates_title_and_appends_millis() {
        assert_eq!(fallback_folder_name("Fix login", 1_700_000_000_123), "fix-login-1700000000123");

        let long = "a".repeat(80);
        let name = fallback_folder_name(&long, 7);
        assert_eq!(name, format!("{}-7", "a".repeat(50)));

        assert_eq!(fallback_folder_name("???", 42), "task-42");
    }
}
