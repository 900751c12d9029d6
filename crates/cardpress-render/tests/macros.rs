//! Macro expansion against real asset directories.

use std::fs;
use std::path::Path;

use cardpress_render::{AssetResolver, MacroExpander};
use tempfile::TempDir;

const TAP_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 8 8"><path d="M0 0h8v8H0z"/></svg>"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("icons/nested")).unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        Self { dir }
    }

    fn write(&self, rel: &str, content: &[u8]) {
        fs::write(self.dir.path().join(rel), content).unwrap();
    }

    fn output(&self) -> std::path::PathBuf {
        self.dir.path().join("output/default")
    }

    fn expander(&self) -> MacroExpander {
        let root = self.dir.path();
        MacroExpander::new(AssetResolver::new(
            root.join("icons"),
            root.join("images"),
            self.output(),
        ))
    }
}

#[test]
fn svg_icon_is_inlined_with_class() {
    let project = Project::new();
    project.write("icons/tap.svg", TAP_SVG.as_bytes());

    let html = project.expander().parse("{tap}");
    assert!(html.starts_with(r#"<svg class="icon" xmlns="#), "{html}");
    assert!(html.contains("<path"));
}

#[test]
fn missing_assets_fall_back_to_emphasis() {
    let project = Project::new();
    let expander = project.expander();
    assert_eq!(expander.parse("{missing}"), r#"<em class="icon">missing</em>"#);
    assert_eq!(expander.parse("{{missing}}"), r#"<em class="image">missing</em>"#);
}

#[test]
fn raster_images_are_copied_once() {
    let project = Project::new();
    project.write("images/coin.png", b"\x89PNG fake");

    let expander = project.expander();
    let html = expander.parse("{{coin}}");
    assert_eq!(
        html,
        r#"<img class="image" src="image-coin.png" alt="coin" />"#
    );
    let copied = project.output().join("image-coin.png");
    assert_eq!(fs::read(&copied).unwrap(), b"\x89PNG fake");

    // The copy is not refreshed once present.
    project.write("images/coin.png", b"changed");
    let fresh = project.expander();
    fresh.parse("{{coin}}");
    assert_eq!(fs::read(&copied).unwrap(), b"\x89PNG fake");
}

#[test]
fn nested_directories_are_searched_in_sorted_order() {
    let project = Project::new();
    project.write("icons/nested/star.svg", b"<svg id=\"nested\"></svg>");
    project.write("icons/star.png", b"png");

    // `nested` sorts before `star.png`.
    let html = project.expander().parse("{star}");
    assert_eq!(html, r#"<svg class="icon" id="nested"></svg>"#);
}

#[test]
fn stem_match_is_case_sensitive() {
    let project = Project::new();
    project.write("icons/Tap.svg", TAP_SVG.as_bytes());
    assert_eq!(
        project.expander().parse("{tap}"),
        r#"<em class="icon">tap</em>"#
    );
}

#[test]
fn macros_mix_with_markdown() {
    let project = Project::new();
    project.write("icons/tap.svg", b"<svg></svg>");

    let html = project
        .expander()
        .parse("{tap}: Do something *really* **strong**");
    insta::assert_snapshot!(
        html,
        @r#"<svg class="icon"></svg>: Do something <em>really</em> <strong>strong</strong>"#
    );
}

#[test]
fn block_markdown_keeps_paragraphs() {
    let project = Project::new();
    let html = project.expander().parse("first\n\nsecond");
    assert_eq!(html, "<p>first</p>\n<p>second</p>");
}

#[test]
fn raw_html_passes_through() {
    let project = Project::new();
    let html = project.expander().parse(r#"<span class="x">{ hi }</span>"#);
    assert_eq!(html, r#"<span class="x">{ hi }</span>"#);
}

#[test]
fn literal_braces_survive_rendering() {
    let project = Project::new();
    let html = project.expander().parse("costs { 2 } or {}");
    assert_eq!(html, "costs { 2 } or {}");
    assert!(!Path::new(&project.output()).exists());
}

#[test]
fn code_keeps_macro_syntax() {
    let project = Project::new();
    project.write("icons/tap.svg", b"<svg></svg>");
    let expander = project.expander();

    assert_eq!(
        expander.parse("use `{tap}` for {tap}"),
        r#"use <code>{tap}</code> for <svg class="icon"></svg>"#
    );
    assert_eq!(
        expander.parse("```\n{tap} {{coin}}\n```"),
        "<pre><code>{tap} {{coin}}\n</code></pre>"
    );
}

#[test]
fn macros_split_by_markdown_still_expand() {
    let project = Project::new();
    project.write("icons/my_icon.svg", b"<svg></svg>");
    assert_eq!(
        project.expander().parse("a {my_icon} b"),
        r#"a <svg class="icon"></svg> b"#
    );
}
