//! Backlog parsing: one `## ` header per task.

use std::fmt;

/// One accepted task: the header text and everything up to the next header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSection {
    pub title: String,
    /// Section body, whitespace-trimmed.
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Non-blank text before the first `## ` header.
    MissingHeader,
    /// Header text equals the configured placeholder title.
    Placeholder,
    /// `## ` with nothing after it.
    MissingTitle,
    /// Header without any description below it.
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::MissingHeader => "text before the first '## ' header",
            SkipReason::Placeholder => "placeholder title",
            SkipReason::MissingTitle => "header without a title",
            SkipReason::Empty => "empty description",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSection {
    pub reason: SkipReason,
    pub title: Option<String>,
    /// 1-based line of the header (or of the first preamble line).
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBacklog {
    pub tasks: Vec<TaskSection>,
    pub skipped: Vec<SkippedSection>,
}

struct RawSection<'a> {
    title: Option<&'a str>,
    line: usize,
    body: Vec<&'a str>,
}

/// Split `contents` into task sections in source order.
pub fn parse_backlog(contents: &str, placeholder_title: &str) -> ParsedBacklog {
    let mut sections: Vec<RawSection<'_>> = Vec::new();
    let mut preamble = RawSection {
        title: None,
        line: 1,
        body: Vec::new(),
    };

    for (idx, line) in contents.lines().enumerate() {
        if let Some(title) = line.strip_prefix("## ") {
            sections.push(RawSection {
                title: Some(title.trim()),
                line: idx + 1,
                body: Vec::new(),
            });
        } else if let Some(current) = sections.last_mut() {
            current.body.push(line);
        } else {
            preamble.body.push(line);
        }
    }

    let mut parsed = ParsedBacklog::default();
    if let Some(offset) = preamble.body.iter().position(|l| !l.trim().is_empty()) {
        parsed.skipped.push(SkippedSection {
            reason: SkipReason::MissingHeader,
            title: None,
            line: preamble.line + offset,
        });
    }

    let placeholder = placeholder_title.trim();
    for section in sections {
        let title = section.title.unwrap_or_default();
        let description = section.body.join("\n").trim().to_string();
        let reason = if title.is_empty() {
            Some(SkipReason::MissingTitle)
        } else if !placeholder.is_empty() && title == placeholder {
            Some(SkipReason::Placeholder)
        } else if description.is_empty() {
            Some(SkipReason::Empty)
        } else {
            None
        };
        match reason {
            Some(reason) => parsed.skipped.push(SkippedSection {
                reason,
                title: (!title.is_empty()).then(|| title.to_string()),
                line: section.line,
            }),
            None => parsed.tasks.push(TaskSection {
                title: title.to_string(),
                description,
            }),
        }
    }
    parsed
}
