//! HTML to readable text.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

const SKIPPED: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "iframe",
];

const BLOCKS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "form",
    "header",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tr",
    "ul",
];

/// Converts an HTML page into plain text with Markdown-style headings and
/// list items. Runs of blank lines are collapsed into one.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    render(document.root_element(), &mut out);

    let lines: Vec<&str> = out.lines().map(str::trim_end).collect();
    let text = lines.join("\n");
    collapse_blank_lines(text.trim())
}

fn render(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return;
    }

    let heading = heading_level(name);
    if name == "br" {
        out.push('\n');
        return;
    }
    if let Some(level) = heading {
        out.push_str("\n\n");
        out.push_str(&"#".repeat(level));
        out.push(' ');
    } else if name == "li" {
        out.push_str("\n- ");
    } else if BLOCKS.contains(&name) {
        out.push_str("\n\n");
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_words(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    render(child, out);
                }
            }
            _ => {}
        }
    }

    if heading.is_some() || BLOCKS.contains(&name) {
        out.push_str("\n\n");
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Appends `text` with whitespace runs folded into single spaces.
fn push_words(out: &mut String, text: &str) {
    if text.trim().is_empty() {
        if !text.is_empty() && !out.ends_with(char::is_whitespace) && !out.is_empty() {
            out.push(' ');
        }
        return;
    }
    if text.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    out.push_str(&words.join(" "));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn collapse_blank_lines(text: &str) -> String {
    static BLANKS: OnceLock<Option<Regex>> = OnceLock::new();
    match BLANKS.get_or_init(|| Regex::new(r"\n{3,}").ok()) {
        Some(blanks) => blanks.replace_all(text, "\n\n").into_owned(),
        None => text.to_string(),
    }
}

/// Keeps the head and tail halves of `text` around a notice when it is
/// longer than `max_length` characters.
#[must_use]
pub fn truncate(text: &str, max_length: usize) -> String {
    let length = text.chars().count();
    if length <= max_length {
        return text.to_string();
    }
    let half = max_length / 2;
    let head_end = text
        .char_indices()
        .nth(half)
        .map_or(text.len(), |(index, _)| index);
    let tail_start = text
        .char_indices()
        .nth(length - half)
        .map_or(text.len(), |(index, _)| index);
    format!(
        "{}\n..._This content has been truncated to stay below {max_length} characters_...\n{}",
        &text[..head_end],
        &text[tail_start..]
    )
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn renders_readable_text() {
        let html = r#"<html><head><title>t</title><style>p { color: red }</style></head>
<body>
  <h1>Clark   Kent</h1>
  <p>Works at the <a href="/planet">Daily Planet</a>.</p>
  <script>alert("x")</script>



  <ul><li>Reporter</li><li>Hero</li></ul>
</body></html>"#;
        assert_snapshot!(html_to_text(html), @r"
        # Clark Kent

        Works at the Daily Planet.

        - Reporter
        - Hero
        ");
    }

    #[test]
    fn leaves_short_text_alone() {
        assert_eq!(truncate("abcdef", 6), "abcdef");
    }

    #[test]
    fn keeps_head_and_tail() {
        let truncated = truncate("aaaabbbbcccc", 8);
        assert_eq!(
            truncated,
            "aaaa\n..._This content has been truncated to stay below 8 characters_...\ncccc"
        );
        assert!(truncate(&"é".repeat(20), 10).starts_with("ééééé\n"));
    }
}
