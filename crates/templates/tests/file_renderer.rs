use std::fs;
use std::path::PathBuf;

use compliance::{TemplateContext, TemplateError, TemplateName, TemplateRenderer};
use templates::FileTemplateRenderer;

fn name(value: &str) -> TemplateName {
    TemplateName::new(value).unwrap()
}

fn context(repository: &str) -> TemplateContext {
    TemplateContext {
        repository: repository.to_string(),
        filename: ".pre-commit-config.yaml".to_string(),
    }
}

#[test]
fn loads_and_renders_templates_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("open.j2"), "Add {{ filename }} to {{ repository }}.\n").unwrap();
    fs::write(dir.path().join("close.j2"), "Fixed in {{ repository }}.\n").unwrap();

    let renderer =
        FileTemplateRenderer::load(dir.path(), &[name("open.j2"), name("close.j2")]).unwrap();

    assert_eq!(
        renderer.render(&name("open.j2"), &context("alpha")).unwrap(),
        "Add .pre-commit-config.yaml to alpha."
    );
    assert_eq!(
        renderer.render(&name("close.j2"), &context("gamma")).unwrap(),
        "Fixed in gamma."
    );
}

#[test]
fn missing_template_file_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileTemplateRenderer::load(dir.path(), &[name("open-issue.j2")]).unwrap_err();
    assert!(matches!(err, TemplateError::Unreadable { name, .. } if name.as_str() == "open-issue.j2"));
}

#[test]
fn syntax_errors_fail_at_load() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.j2"), "{{ organisation }}").unwrap();
    let err = FileTemplateRenderer::load(dir.path(), &[name("bad.j2")]).unwrap_err();
    assert!(matches!(err, TemplateError::UnknownVariable { .. }));
}

#[test]
fn rendering_an_unloaded_template_fails() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = FileTemplateRenderer::load(dir.path(), &[]).unwrap();
    let err = renderer.render(&name("open.j2"), &context("alpha")).unwrap_err();
    assert!(matches!(err, TemplateError::NotLoaded { .. }));
}

#[test]
fn shipped_templates_reference_repository_and_filename() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates");
    let open = name(compliance::DEFAULT_OPEN_TEMPLATE);
    let close = name(compliance::DEFAULT_CLOSE_TEMPLATE);
    let renderer = FileTemplateRenderer::load(&root, &[open.clone(), close.clone()]).unwrap();

    let body = renderer.render(&open, &context("alpha")).unwrap();
    assert!(body.contains("alpha"));
    assert!(body.contains(".pre-commit-config.yaml"));

    let comment = renderer.render(&close, &context("gamma")).unwrap();
    assert!(comment.contains("gamma"));
}
