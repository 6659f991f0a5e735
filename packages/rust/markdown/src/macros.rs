//! Rewrite passes for the proprietary storage-format macros.
//!
//! Each pass is a total function over the document string: when the pattern
//! it targets is absent, the input passes through untouched. Macro tags are
//! identified by their exact `ac:name` attribute; CDATA payloads are matched
//! non-greedily between a macro's own open/close boundaries, so passes never
//! overlap. Nested macros of the same kind are not supported.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Run all rewrite passes, in order, producing plain HTML the base renderer
/// can digest.
pub(crate) fn preprocess(html: &str) -> String {
    let html = strip_toc_macros(html);
    let html = replace_emoticons(&html);
    let html = replace_code_macros(&html);
    let html = replace_panel_macros(&html);
    let html = replace_page_links(&html);
    replace_children_macro(&html)
}

// ---------------------------------------------------------------------------
// Pass 1: TOC macros
// ---------------------------------------------------------------------------

static TOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ac:structured-macro\s+ac:name="toc"[^>]*/>"#).expect("valid regex")
});

/// TOC macros are redundant in Markdown output; drop them and collapse the
/// wrapper paragraphs they leave empty.
fn strip_toc_macros(html: &str) -> String {
    let stripped = TOC_RE.replace_all(html, "");
    stripped.replace("<p></p>", "")
}

// ---------------------------------------------------------------------------
// Pass 2: Emoticons
// ---------------------------------------------------------------------------

static EMOTICON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ac:emoticon\s+ac:name="([^"]+)"\s*/>"#).expect("valid regex")
});

fn emoticon_glyph(name: &str) -> Option<&'static str> {
    Some(match name {
        "smile" => "😊",
        "sad" => "😞",
        "cheeky" => "😜",
        "laugh" => "😆",
        "wink" => "😉",
        "thumbs-up" => "👍",
        "thumbs-down" => "👎",
        "tick" => "✅",
        "cross" => "❌",
        "warning" => "⚠️",
        "information" => "ℹ️",
        "tick-box" => "☑️",
        "question" => "❓",
        "light-on" => "💡",
        "light-off" => "🔦",
        "star" => "⭐",
        "heart" => "❤️",
        "plus" => "➕",
        "minus" => "➖",
        "flag" => "🚩",
        _ => return None,
    })
}

/// Known emoticon names become Unicode glyphs; unknown names are kept as a
/// literal `:name:` placeholder rather than dropped.
fn replace_emoticons(html: &str) -> String {
    EMOTICON_RE
        .replace_all(html, |caps: &Captures| {
            let name = &caps[1];
            match emoticon_glyph(name) {
                Some(glyph) => glyph.to_string(),
                None => format!(":{name}:"),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Code macros
// ---------------------------------------------------------------------------

static CODE_MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<ac:structured-macro\s+ac:name="code"[^>]*>(.*?)</ac:structured-macro>"#)
        .expect("valid regex")
});

static CODE_LANG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ac:parameter\s+ac:name="language">([^<]+)</ac:parameter>"#)
        .expect("valid regex")
});

static CODE_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<ac:plain-text-body><!\[CDATA\[(.*?)\]\]></ac:plain-text-body>"#)
        .expect("valid regex")
});

/// Code macros become standard `<pre><code>` blocks. The payload is
/// entity-escaped so the base renderer cannot misread code as markup.
fn replace_code_macros(html: &str) -> String {
    CODE_MACRO_RE
        .replace_all(html, |caps: &Captures| {
            let inner = &caps[1];
            let lang = CODE_LANG_RE.captures(inner).map(|c| c[1].to_string());
            let code = CODE_BODY_RE
                .captures(inner)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let escaped = escape_html(&code);

            match lang {
                Some(lang) => {
                    format!(r#"<pre><code class="language-{lang}">{escaped}</code></pre>"#)
                }
                None => format!("<pre><code>{escaped}</code></pre>"),
            }
        })
        .into_owned()
}

/// Minimal HTML entity escaping for code payloads.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Pass 4: Panel macros
// ---------------------------------------------------------------------------

/// Panel kind → blockquote label.
const PANELS: [(&str, &str); 3] = [
    ("warning", "⚠️ Warning"),
    ("info", "ℹ️ Info"),
    ("note", "📝 Note"),
];

static PANEL_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    PANELS
        .iter()
        .map(|(kind, label)| {
            let pattern = format!(
                r#"(?s)<ac:structured-macro\s+ac:name="{kind}"[^>]*>(.*?)</ac:structured-macro>"#
            );
            (Regex::new(&pattern).expect("valid regex"), *label)
        })
        .collect()
});

static PANEL_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ac:rich-text-body>(.*?)</ac:rich-text-body>").expect("valid regex")
});

/// Warning/info/note panels become labelled blockquotes, body preserved.
fn replace_panel_macros(html: &str) -> String {
    let mut result = html.to_string();
    for (re, label) in PANEL_RES.iter() {
        result = re
            .replace_all(&result, |caps: &Captures| {
                let body = PANEL_BODY_RE
                    .captures(&caps[1])
                    .map(|c| c[1].to_string())
                    .unwrap_or_default();
                format!("<blockquote><p><strong>{label}:</strong> {body}</p></blockquote>")
            })
            .into_owned();
    }
    result
}

// ---------------------------------------------------------------------------
// Pass 5: Internal page links
// ---------------------------------------------------------------------------

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<ac:link>(.*?)</ac:link>").expect("valid regex"));

static LINK_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ri:page\s+ri:content-title="([^"]+)""#).expect("valid regex")
});

static LINK_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ac:plain-text-link-body>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</ac:plain-text-link-body>")
        .expect("valid regex")
});

/// Internal page references become relative `.md` links. Link text defaults
/// to the referenced title; an explicit plain-text body overrides it. A link
/// with no page-title reference is left untouched.
fn replace_page_links(html: &str) -> String {
    LINK_RE
        .replace_all(html, |caps: &Captures| {
            let inner = &caps[1];
            let Some(title_caps) = LINK_TITLE_RE.captures(inner) else {
                return caps[0].to_string();
            };
            let title = title_caps[1].to_string();

            let text = LINK_TEXT_RE
                .captures(inner)
                .map(|c| c[1].to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| title.clone());

            let slug = title_to_slug(&title);
            format!(r#"<a href="{slug}.md">{text}</a>"#)
        })
        .into_owned()
}

/// Lowercase; runs of non `[a-z0-9]` collapse to a single `-`; surrounding
/// dashes trimmed.
pub fn title_to_slug(title: &str) -> String {
    static NON_ALNUM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

    let lowered = title.to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Children macro
// ---------------------------------------------------------------------------

static CHILDREN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ac:structured-macro\s+ac:name="children"[^>]*/>"#).expect("valid regex")
});

/// Rendering the page hierarchy needs context this converter does not have;
/// leave an inert marker for later resolution.
fn replace_children_macro(html: &str) -> String {
    CHILDREN_RE
        .replace_all(html, "<!-- Child pages: (requires hierarchy context) -->")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
