//! Markup segmentation
//!
//! Parses a page with `scraper` and flattens its text nodes into segments.
//! Phrasing elements (`b`, `span`, `a`, ...) are embedded markup: their text
//! joins the surrounding run. Every other element is a boundary. Table cells
//! end a segment but stay on their row's line; block elements and line breaks
//! start a new line. Script and style bodies are dropped.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Elements whose text is never visible
const SKIPPED: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Elements that sit inside a run of text instead of ending it
const PHRASING: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "cite", "code", "data", "dfn", "em", "font", "i",
    "kbd", "label", "mark", "nobr", "q", "s", "samp", "small", "span", "strike", "strong", "sub",
    "sup", "time", "tt", "u", "var",
];

/// `<script .../>` opens a raw-text element that would run to the end of the page
static SELF_CLOSING_RAW_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<(script|style)\b([^>]*?)/\s*>").ok());

/// A run of visible text between two boundaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// Segments sharing a line number are cells of one row or one line
    pub line: usize,
    /// Text of a `th` cell
    pub header: bool,
}

/// Split a document into visible text segments, in document order
pub fn segments(markup: &str) -> Vec<Segment> {
    let markup = close_raw_text_elements(markup);
    let document = Html::parse_document(&wrap_stray_rows(&markup));
    let mut walker = Walker::default();
    walker.element(document.root_element());
    walker.flush();
    walker.segments
}

/// Visible text of a document; cells of a row are joined by a space
pub fn plain_text(markup: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<usize> = None;

    for segment in segments(markup) {
        match lines.last_mut() {
            Some(last) if current == Some(segment.line) => {
                last.push(' ');
                last.push_str(&segment.text);
            }
            _ => lines.push(segment.text),
        }
        current = Some(segment.line);
    }

    lines.join("\n")
}

/// Collapse runs of whitespace to a single space and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn close_raw_text_elements(markup: &str) -> Cow<'_, str> {
    match SELF_CLOSING_RAW_TEXT.as_ref() {
        Some(pattern) => pattern.replace_all(markup, "<${1}${2}></${1}>"),
        None => Cow::Borrowed(markup),
    }
}

/// Row fragments outside a table lose their cell tags when parsed as a document
fn wrap_stray_rows(markup: &str) -> Cow<'_, str> {
    let lower = markup.to_ascii_lowercase();
    let has_rows = lower.contains("<tr") || lower.contains("<td") || lower.contains("<th");
    if has_rows && !lower.contains("<table") {
        Cow::Owned(format!("<table>{markup}</table>"))
    } else {
        Cow::Borrowed(markup)
    }
}

#[derive(Debug, Default)]
struct Walker {
    segments: Vec<Segment>,
    buffer: String,
    line: usize,
    header: bool,
}

impl Walker {
    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if SKIPPED.contains(&name) {
            return;
        }
        if PHRASING.contains(&name) {
            self.children(element);
            return;
        }
        if name == "br" {
            self.flush();
            self.line += 1;
            return;
        }

        let is_cell = name == "td" || name == "th";
        self.flush();
        if !is_cell {
            self.line += 1;
        }

        let outer_header = self.header;
        if is_cell {
            self.header = name == "th";
        }
        self.children(element);
        self.flush();
        self.header = outer_header;

        if !is_cell {
            self.line += 1;
        }
    }

    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.element(child_element);
            } else if let Node::Text(text) = child.value() {
                self.buffer.push_str(text);
            }
        }
    }

    /// Emit the buffered text, one segment per non-empty source line
    fn flush(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        let mut first = true;
        for line in buffer.lines() {
            let text = collapse_whitespace(line);
            if text.is_empty() {
                continue;
            }
            if !first {
                self.line += 1;
            }
            first = false;
            self.segments.push(Segment {
                text,
                line: self.line,
                header: self.header,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(markup: &str) -> Vec<String> {
        segments(markup).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_table_cells_become_segments() {
        let html = "<table><tr><td>Owner Name:</td><td> Jane   Doe </td></tr></table>";
        assert_eq!(texts(html), vec!["Owner Name:", "Jane Doe"]);
    }

    #[test]
    fn test_cells_share_their_row_line() {
        let html = "<table><tr><th>Name</th><td>Jane</td></tr><tr><td>Zong</td></tr></table>";
        let segs = segments(html);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].line, segs[1].line);
        assert_ne!(segs[1].line, segs[2].line);
        assert!(segs[0].header);
        assert!(!segs[1].header);
    }

    #[test]
    fn test_phrasing_elements_join_their_text() {
        let html = "<p>Owner Name: <b>Jane</b> <span class=x>Doe</span></p><p>Next</p>";
        assert_eq!(texts(html), vec!["Owner Name: Jane Doe", "Next"]);
    }

    #[test]
    fn test_script_and_style_are_skipped() {
        let html = "<style>td { color: red }</style><p>Hi</p><script>var a = '<b>';</script>Bye";
        assert_eq!(texts(html), vec!["Hi", "Bye"]);
    }

    #[test]
    fn test_self_closing_script_does_not_swallow_page() {
        let html = "<script src=x.js/><p>Owner Name: Jane Doe</p>";
        assert!(texts(html).contains(&"Owner Name: Jane Doe".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(texts("<p>a<!-- Name: hidden -->b</p>"), vec!["ab"]);
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(texts("<p>Tom&nbsp;&amp;&#32;Jerry</p>"), vec!["Tom & Jerry"]);
    }

    #[test]
    fn test_attribute_with_angle_bracket() {
        assert_eq!(texts(r#"<p title="a > b">Name: Ali</p>"#), vec!["Name: Ali"]);
    }

    #[test]
    fn test_stray_rows_keep_cell_boundaries() {
        let html = "<td>Address:</td><td>CNIC:</td>";
        assert_eq!(texts(html), vec!["Address:", "CNIC:"]);
    }

    #[test]
    fn test_plain_text_lines() {
        let text = plain_text("Owner Name: Jane\nCNIC: 1<br>Zong");
        assert_eq!(text, "Owner Name: Jane\nCNIC: 1\nZong");

        let table = plain_text("<table><tr><td>Jazz SIMs</td><td>: 3</td></tr></table>");
        assert_eq!(table, "Jazz SIMs : 3");
    }
}
