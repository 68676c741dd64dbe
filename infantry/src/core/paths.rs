//! Repo-relative path normalization.

use std::path::{Component, Path};

/// Normalize a path declared relative to the repository root.
///
/// Strips `./` segments and resolves `..` lexically. Returns `None` for
/// absolute paths, paths that climb above the root, and empty paths.
pub fn normalize_repo_relative(raw: &str) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(raw.trim()).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Append `item` unless an equal entry is already present.
pub fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_relative_paths() {
        assert_eq!(normalize_repo_relative("lib/x.py").as_deref(), Some("lib/x.py"));
        assert_eq!(normalize_repo_relative("./lib//x.py").as_deref(), Some("lib/x.py"));
        assert_eq!(normalize_repo_relative("lib/../src/y.rs").as_deref(), Some("src/y.rs"));
        assert_eq!(normalize_repo_relative("ai-goals/a/").as_deref(), Some("ai-goals/a"));
    }

    #[test]
    fn rejects_paths_leaving_the_repo() {
        assert_eq!(normalize_repo_relative("/etc/passwd"), None);
        assert_eq!(normalize_repo_relative("../outside.txt"), None);
        assert_eq!(normalize_repo_relative("lib/../../x"), None);
        assert_eq!(normalize_repo_relative("."), None);
        assert_eq!(normalize_repo_relative(""), None);
    }

    #[test]
    fn push_unique_keeps_first_occurrence_order() {
        let mut list = vec!["a".to_string()];
        push_unique(&mut list, "b".to_string());
        push_unique(&mut list, "a".to_string());
        assert_eq!(list, ["a", "b"]);
    }
}
