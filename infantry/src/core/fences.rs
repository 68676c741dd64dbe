//! Markdown code-fence stripping for raw LLM responses.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?```$").expect("fence regex is valid")
});

/// Remove a surrounding ```` ```lang ... ``` ```` fence, if present.
///
/// Text without a fence is returned trimmed and otherwise untouched.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCED_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}
