//! File-based template rendering for mission reports.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::io::files::write_atomic;

/// HTML escaping for `.html`, `.htm` and `.xml` templates only.
///
/// A trailing `.j2` / `.jinja` / `.jinja2` is ignored when deciding.
pub fn auto_escape_for(name: &str) -> AutoEscape {
    let base = name
        .strip_suffix(".j2")
        .or_else(|| name.strip_suffix(".jinja2"))
        .or_else(|| name.strip_suffix(".jinja"))
        .unwrap_or(name);
    let html = [".html", ".htm", ".xml"]
        .iter()
        .any(|ext| base.to_ascii_lowercase().ends_with(ext));
    if html { AutoEscape::Html } else { AutoEscape::None }
}

/// Render `source` (registered as `name`) with `view`.
pub fn render_str<S: Serialize>(name: &str, source: &str, view: &S) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(auto_escape_for);
    env.add_template(name, source)
        .with_context(|| format!("parse template {name}"))?;
    let template = env.get_template(name)?;
    let rendered = template
        .render(view)
        .with_context(|| format!("render template {name}"))?;
    Ok(rendered)
}

/// Render the template file at `template` with `view` into `output`.
///
/// The output directory is created if needed. Nothing is written unless
/// rendering succeeds.
#[instrument(skip_all, fields(template = %template.display(), output = %output.display()))]
pub fn render_template_file<S: Serialize>(template: &Path, view: &S, output: &Path) -> Result<()> {
    let source = fs::read_to_string(template)
        .with_context(|| format!("read template {}", template.display()))?;
    let name = template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string());
    let rendered = render_str(&name, &source, view)?;
    write_atomic(output, &rendered)?;
    debug!(bytes = rendered.len(), "template rendered");
    Ok(())
}
