//! File-backed body template renderer.
//!
//! Implements [`compliance::TemplateRenderer`] over plain template files in a
//! directory. The supported syntax is the Jinja subset the audit needs:
//!
//! - `{{ variable }}` substitutes `repository` or `filename`;
//! - `{# ... #}` is a comment and renders as nothing;
//! - a single trailing newline is dropped, as Jinja does by default.
//!
//! Block tags (`{% ... %}`), unknown variables, and unterminated tags are
//! rejected when the templates are loaded, so a broken template stops the
//! audit at startup rather than halfway through a scan.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File reads happen once, in [`FileTemplateRenderer::load`].

use std::collections::HashMap;
use std::path::Path;

use compliance::{TemplateContext, TemplateError, TemplateName, TemplateRenderer};
use tracing::debug;

/// Variables every template may reference.
const KNOWN_VARIABLES: [&str; 2] = ["repository", "filename"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A template parsed into literal text and variable references.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(name: &TemplateName, source: &str) -> Result<Self, TemplateError> {
        let source = source.strip_suffix('\n').unwrap_or(source);
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find('{') {
            let (before, tail) = rest.split_at(start);
            let tag_offset = offset + start;
            if tail.starts_with("{{") {
                push_literal(&mut segments, before);
                let close = find_close(tail, "}}").ok_or_else(|| TemplateError::UnterminatedTag {
                    name: name.clone(),
                    offset: tag_offset,
                })?;
                let variable = tail[2..close].trim();
                if !KNOWN_VARIABLES.contains(&variable) {
                    return Err(TemplateError::UnknownVariable {
                        name: name.clone(),
                        variable: variable.to_string(),
                    });
                }
                segments.push(Segment::Variable(variable.to_string()));
                rest = &tail[close + 2..];
                offset = tag_offset + close + 2;
            } else if tail.starts_with("{#") {
                push_literal(&mut segments, before);
                let close = find_close(tail, "#}").ok_or_else(|| TemplateError::UnterminatedTag {
                    name: name.clone(),
                    offset: tag_offset,
                })?;
                rest = &tail[close + 2..];
                offset = tag_offset + close + 2;
            } else if tail.starts_with("{%") {
                return Err(TemplateError::UnsupportedBlock {
                    name: name.clone(),
                    offset: tag_offset,
                });
            } else {
                // A lone brace is literal text.
                push_literal(&mut segments, &rest[..=start]);
                rest = &tail[1..];
                offset = tag_offset + 1;
            }
        }
        push_literal(&mut segments, rest);

        Ok(Self { segments })
    }

    fn render(&self, name: &TemplateName, context: &TemplateContext) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(variable) => {
                    let value =
                        context
                            .lookup(variable)
                            .ok_or_else(|| TemplateError::UnknownVariable {
                                name: name.clone(),
                                variable: variable.clone(),
                            })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Offset of `delimiter` in `tail`, searched past the two-byte opener so that
/// `{#}` does not close itself.
fn find_close(tail: &str, delimiter: &str) -> Option<usize> {
    tail[2..].find(delimiter).map(|close| close + 2)
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Literal(previous)) = segments.last_mut() {
        previous.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_string()));
    }
}

/// Renders templates loaded from a directory.
///
/// Only the templates named at load time are available; rendering any other
/// name fails with [`TemplateError::NotLoaded`].
#[derive(Debug, Clone)]
pub struct FileTemplateRenderer {
    templates: HashMap<TemplateName, Template>,
}

impl FileTemplateRenderer {
    /// Reads and parses every named template from `root`.
    ///
    /// # Errors
    ///
    /// Returns the first [`TemplateError`] encountered: an unreadable file or
    /// a syntax problem in its content.
    pub fn load(root: impl AsRef<Path>, names: &[TemplateName]) -> Result<Self, TemplateError> {
        let root = root.as_ref();
        let mut templates = HashMap::with_capacity(names.len());
        for name in names {
            let path = root.join(name.as_str());
            let source =
                std::fs::read_to_string(&path).map_err(|err| TemplateError::Unreadable {
                    name: name.clone(),
                    message: format!("{}: {err}", path.display()),
                })?;
            let template = Template::parse(name, &source)?;
            debug!(template = %name, path = %path.display(), "loaded template");
            templates.insert(name.clone(), template);
        }
        Ok(Self { templates })
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn render(
        &self,
        template: &TemplateName,
        context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        self.templates
            .get(template)
            .ok_or_else(|| TemplateError::NotLoaded {
                name: template.clone(),
            })?
            .render(template, context)
    }
}
