//! Storage-format HTML to Markdown conversion.
//!
//! The pipeline runs in three stages: [`macros`] rewrites the proprietary
//! macro tags into plain HTML, `htmd` renders that HTML to Markdown, and a
//! whitespace normalization pass tidies the result. [`convert_with_metadata`]
//! additionally prepends a YAML frontmatter block built from page metadata.

mod macros;

pub use macros::title_to_slug;

use chrono::{DateTime, Utc};
use htmd::HtmlToMarkdown;
use wikimirror_shared::{MirrorError, Result};

/// Page metadata rendered into the YAML frontmatter block.
#[derive(Debug, Clone, Default)]
pub struct PageFrontmatter {
    pub title: String,
    pub page_id: String,
    pub space_key: String,
    pub version: i64,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub parent_id: Option<String>,
    pub url: Option<String>,
}

/// Convert storage-format HTML to Markdown.
pub fn convert(storage_html: &str) -> Result<String> {
    let html = macros::preprocess(storage_html);

    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build();
    let markdown = converter
        .convert(&html)
        .map_err(|err| MirrorError::Conversion(err.to_string()))?;

    let out = postprocess(&markdown);
    tracing::debug!(input = storage_html.len(), output = out.len(), "storage body converted");
    Ok(out)
}

/// Convert storage-format HTML to Markdown with a frontmatter header.
pub fn convert_with_metadata(storage_html: &str, meta: &PageFrontmatter) -> Result<String> {
    let body = convert(storage_html)?;
    let frontmatter = build_frontmatter(meta);
    Ok(format!("{frontmatter}\n\n{body}"))
}

/// Render the frontmatter block. Field order is fixed; optional fields are
/// omitted when absent, `version` is always emitted.
fn build_frontmatter(meta: &PageFrontmatter) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: \"{}\"\n", escape_yaml(&meta.title)));
    out.push_str(&format!("confluence_id: \"{}\"\n", meta.page_id));
    out.push_str(&format!("space_key: \"{}\"\n", meta.space_key));
    out.push_str(&format!("version: {}\n", meta.version));
    if let Some(updated_at) = &meta.updated_at {
        out.push_str(&format!("last_updated: \"{}\"\n", updated_at.to_rfc3339()));
    }
    if let Some(author) = &meta.author {
        out.push_str(&format!("author: \"{}\"\n", escape_yaml(author)));
    }
    if let Some(parent_id) = &meta.parent_id {
        out.push_str(&format!("parent_id: \"{parent_id}\"\n"));
    }
    if let Some(url) = &meta.url {
        out.push_str(&format!("url: \"{url}\"\n"));
    }
    out.push_str("---");
    out
}

fn escape_yaml(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Normalize whitespace in rendered Markdown: runs of three or more newlines
/// collapse to two, trailing whitespace is stripped per line, and the output
/// ends with exactly one newline.
fn postprocess(markdown: &str) -> String {
    use std::sync::LazyLock;

    use regex::Regex;

    static EXCESS_NEWLINES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let collapsed = EXCESS_NEWLINES_RE.replace_all(markdown, "\n\n");
    let trimmed: Vec<&str> = collapsed.lines().map(str::trim_end).collect();
    let mut out = trimmed.join("\n");
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> PageFrontmatter {
        PageFrontmatter {
            title: "Getting Started".into(),
            page_id: "12345".into(),
            space_key: "DOCS".into(),
            version: 5,
            updated_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            author: None,
            parent_id: Some("100".into()),
            url: Some("https://example.atlassian.net/wiki/spaces/DOCS/pages/12345".into()),
        }
    }

    #[test]
    fn converts_headings_and_paragraphs() {
        let md = convert("<h1>Title</h1><p>Some <strong>bold</strong> text.</p>").unwrap();
        assert!(md.contains("# Title"));
        assert!(md.contains("**bold**"));
    }

    #[test]
    fn toc_only_page_yields_whitespace_body() {
        let md = convert(r#"<p><ac:structured-macro ac:name="toc"/></p>"#).unwrap();
        assert!(md.trim().is_empty());
    }

    #[test]
    fn code_macro_becomes_fenced_block() {
        let html = concat!(
            r#"<ac:structured-macro ac:name="code">"#,
            r#"<ac:parameter ac:name="language">python</ac:parameter>"#,
            "<ac:plain-text-body><![CDATA[def hello():\n    print(\"hi\")]]></ac:plain-text-body>",
            "</ac:structured-macro>"
        );
        let md = convert(html).unwrap();
        assert!(md.contains("```python"), "got: {md}");
        assert!(md.contains("def hello():"));
        assert!(md.contains("print(\"hi\")"));
    }

    #[test]
    fn emoticons_render_in_markdown() {
        let md = convert(r#"<p>Done <ac:emoticon ac:name="tick" /></p>"#).unwrap();
        assert!(md.contains('✅'));
        let md = convert(r#"<p><ac:emoticon ac:name="unknown-emoji" /></p>"#).unwrap();
        assert!(md.contains(":unknown-emoji:"));
    }

    #[test]
    fn panel_renders_as_blockquote() {
        let html = r#"<ac:structured-macro ac:name="warning"><ac:rich-text-body><p>Careful.</p></ac:rich-text-body></ac:structured-macro>"#;
        let md = convert(html).unwrap();
        assert!(md.contains("**⚠️ Warning:**"), "got: {md}");
        assert!(md.contains("Careful."));
        assert!(md.lines().any(|l| l.starts_with('>')), "got: {md}");
    }

    #[test]
    fn page_link_renders_as_relative_md_link() {
        let html = r#"<p>See <ac:link><ri:page ri:content-title="Getting Started" /></ac:link>.</p>"#;
        let md = convert(html).unwrap();
        assert!(md.contains("[Getting Started](getting-started.md)"), "got: {md}");
    }

    #[test]
    fn frontmatter_field_order_and_values() {
        let fm = build_frontmatter(&meta());
        let lines: Vec<&str> = fm.lines().collect();
        assert_eq!(lines[0], "---");
        assert_eq!(lines[1], "title: \"Getting Started\"");
        assert_eq!(lines[2], "confluence_id: \"12345\"");
        assert_eq!(lines[3], "space_key: \"DOCS\"");
        assert_eq!(lines[4], "version: 5");
        assert!(lines[5].starts_with("last_updated: \"2024-03-01T12:00:00"));
        assert_eq!(lines[6], "parent_id: \"100\"");
        assert!(lines[7].starts_with("url: \""));
        assert_eq!(*lines.last().unwrap(), "---");
    }

    #[test]
    fn frontmatter_escapes_quotes_in_title() {
        let mut m = meta();
        m.title = "Test \"Quoted\" Page".into();
        let fm = build_frontmatter(&m);
        assert!(fm.contains(r#"title: "Test \"Quoted\" Page""#));
    }

    #[test]
    fn frontmatter_version_emitted_when_zero() {
        let m = PageFrontmatter {
            title: "Bare".into(),
            page_id: "1".into(),
            space_key: "X".into(),
            ..Default::default()
        };
        let fm = build_frontmatter(&m);
        assert!(fm.contains("version: 0"));
        assert!(!fm.contains("last_updated"));
        assert!(!fm.contains("author"));
        assert!(!fm.contains("parent_id"));
        assert!(!fm.contains("url:"));
    }

    #[test]
    fn body_follows_closing_delimiter() {
        let md = convert_with_metadata("<p>Hello.</p>", &meta()).unwrap();
        let after = md.split("---\n\n").nth(1).expect("body after frontmatter");
        assert!(after.contains("Hello."));
        assert!(md.starts_with("---\n"));
    }

    #[test]
    fn postprocess_normalizes_whitespace() {
        let out = postprocess("a   \n\n\n\n\nb\n\n\n");
        assert_eq!(out, "a\n\nb\n");
    }

    #[test]
    fn postprocess_ends_with_single_newline() {
        assert_eq!(postprocess("x"), "x\n");
        assert_eq!(postprocess("x\n\n"), "x\n");
    }

    #[test]
    fn full_feature_fixture_converts() {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../../fixtures/storage/feature-page.html"
        );
        let html = std::fs::read_to_string(path).unwrap();
        let md = convert(&html).unwrap();

        assert!(md.contains("# Feature Overview"));
        assert!(!md.contains("ac:structured-macro"));
        assert!(!md.contains("ac:emoticon"));
        assert!(md.contains("```rust"));
        assert!(md.contains('👍'));
        assert!(md.contains("**ℹ️ Info:**"));
        assert!(md.contains("(getting-started.md)"));
        assert!(md.ends_with('\n'));
        assert!(!md.ends_with("\n\n"));
    }
}
