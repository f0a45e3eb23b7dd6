//! HTML to markdown conversion for scraped pages.
//!
//! Walks the DOM produced by `html_parser` and emits a compact markdown
//! rendering. Non-content elements (scripts, styles, the document head) are
//! dropped. Input that fails to parse is returned as-is.

use html_parser::{Dom, Element, Node};

/// Convert an HTML document or fragment to markdown.
pub fn html_to_markdown(html: &str) -> String {
    let markdown = match Dom::parse(html) {
        Ok(dom) => {
            let mut writer = Writer::default();
            writer.nodes(&dom.children);
            writer.out
        }
        Err(err) => {
            tracing::debug!(error = %err, "HTML parse failed, returning raw content");
            html.to_string()
        }
    };
    tidy(&markdown)
}

#[derive(Debug, Clone, Copy)]
enum List {
    Unordered,
    Ordered(usize),
}

#[derive(Default)]
struct Writer {
    out: String,
    lists: Vec<List>,
    preformatted: bool,
}

impl Writer {
    fn nested(&self) -> Self {
        Self {
            out: String::new(),
            lists: self.lists.clone(),
            preformatted: self.preformatted,
        }
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Text(text) => self.text(text),
                Node::Element(element) => self.element(element),
                Node::Comment(_) => {}
            }
        }
    }

    fn text(&mut self, raw: &str) {
        let text = decode_entities(raw);
        if self.preformatted {
            self.out.push_str(&text);
            return;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            if !text.is_empty() {
                self.space();
            }
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.space();
        }
        self.out.push_str(&words.join(" "));
        if text.ends_with(char::is_whitespace) {
            self.space();
        }
    }

    fn element(&mut self, element: &Element) {
        let name = element.name.to_ascii_lowercase();
        match name.as_str() {
            "script" | "style" | "head" | "noscript" | "template" | "svg" | "iframe" => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = self.inline(element);
                self.block_break();
                if !text.is_empty() {
                    self.out.push_str(&"#".repeat(level));
                    self.out.push(' ');
                    self.out.push_str(&text);
                }
                self.block_break();
            }
            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav"
            | "aside" | "figure" | "figcaption" | "table" | "form" | "dl" => {
                self.block_break();
                self.nodes(&element.children);
                self.block_break();
            }
            "br" => {
                self.trim_trailing_spaces();
                self.out.push('\n');
            }
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "strong" | "b" => self.wrap(element, "**"),
            "em" | "i" => self.wrap(element, "*"),
            "code" if !self.preformatted => self.wrap(element, "`"),
            "pre" => {
                self.block_break();
                self.out.push_str("```\n");
                self.preformatted = true;
                self.nodes(&element.children);
                self.preformatted = false;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("```");
                self.block_break();
            }
            "a" => {
                let text = self.inline(element);
                match attribute(element, "href") {
                    Some(href) if !text.is_empty() => {
                        self.out.push_str(&format!("[{}]({})", text, href));
                    }
                    _ => self.out.push_str(&text),
                }
            }
            "img" => {
                if let Some(src) = attribute(element, "src") {
                    let alt = attribute(element, "alt").unwrap_or_default();
                    self.out.push_str(&format!("![{}]({})", alt, src));
                }
            }
            "ul" | "ol" => {
                if self.lists.is_empty() {
                    self.block_break();
                }
                self.lists.push(if name == "ul" {
                    List::Unordered
                } else {
                    List::Ordered(1)
                });
                self.nodes(&element.children);
                self.lists.pop();
                if self.lists.is_empty() {
                    self.block_break();
                }
            }
            "li" => self.list_item(element),
            "blockquote" => {
                let mut inner = self.nested();
                inner.nodes(&element.children);
                let quoted = tidy(&inner.out)
                    .lines()
                    .map(|line| format!("> {}", line).trim_end().to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                self.block_break();
                self.out.push_str(&quoted);
                self.block_break();
            }
            "tr" => {
                self.line_start();
                self.nodes(&element.children);
                self.trim_trailing_spaces();
                self.out.push('\n');
            }
            "td" | "th" => {
                self.nodes(&element.children);
                self.trim_trailing_spaces();
                self.out.push_str(" | ");
            }
            _ => self.nodes(&element.children),
        }
    }

    fn list_item(&mut self, element: &Element) {
        self.line_start();
        let depth = self.lists.len().max(1);
        self.out.push_str(&"  ".repeat(depth - 1));

        match self.lists.last_mut() {
            Some(List::Ordered(n)) => {
                self.out.push_str(&format!("{}. ", n));
                *n += 1;
            }
            _ => self.out.push_str("- "),
        }
        self.nodes(&element.children);
    }

    fn wrap(&mut self, element: &Element, marker: &str) {
        let text = self.inline(element);
        if !text.is_empty() {
            self.out.push_str(marker);
            self.out.push_str(&text);
            self.out.push_str(marker);
        }
    }

    fn inline(&self, element: &Element) -> String {
        let mut inner = self.nested();
        inner.nodes(&element.children);
        inner.out.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(trimmed);
    }

    fn line_start(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}

fn attribute(element: &Element, name: &str) -> Option<String> {
    element
        .attributes
        .get(name)
        .and_then(|value| value.as_deref())
        .map(|value| decode_entities(value.trim()))
        .filter(|value| !value.is_empty())
}

/// Trim line ends and collapse runs of blank lines to a single blank line.
fn tidy(markdown: &str) -> String {
    let mut text = markdown
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    text.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let decoded = candidate
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let md = html_to_markdown("<h1>Title</h1><p>First paragraph.</p><h2>Section</h2><p>Second.</p>");
        assert_eq!(md, "# Title\n\nFirst paragraph.\n\n## Section\n\nSecond.");
    }

    #[test]
    fn test_links_and_emphasis() {
        let md = html_to_markdown(
            r#"<p>Read <a href="https://www.rust-lang.org">the <b>Rust</b> site</a> today</p>"#,
        );
        assert!(md.contains("**Rust**"), "{}", md);
        assert!(md.contains("site](https://www.rust-lang.org)"), "{}", md);
        assert!(md.starts_with("Read"), "{}", md);
    }

    #[test]
    fn test_lists() {
        let md = html_to_markdown("<ul><li>one</li><li>two</li></ul><ol><li>first</li><li>second</li></ol>");
        assert!(md.contains("- one\n- two"), "{}", md);
        assert!(md.contains("1. first\n2. second"), "{}", md);
    }

    #[test]
    fn test_drops_scripts_and_head() {
        let md = html_to_markdown(
            "<html><head><title>Ignored</title><style>p { color: red; }</style></head>\
             <body><script>var x = 1;</script><p>Visible</p></body></html>",
        );
        assert_eq!(md, "Visible");
    }

    #[test]
    fn test_preformatted_code_keeps_whitespace() {
        let md = html_to_markdown("<pre><code>fn main() {\n    run();\n}</code></pre>");
        assert!(md.starts_with("```\n"), "{}", md);
        assert!(md.contains("    run();"), "{}", md);
        assert!(md.ends_with("```"), "{}", md);
    }

    #[test]
    fn test_images_and_rules() {
        let md = html_to_markdown(r#"<p><img src="/logo.png" alt="Logo"></p><hr><p>After</p>"#);
        assert!(md.contains("![Logo](/logo.png)"), "{}", md);
        assert!(md.contains("---"), "{}", md);
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(decode_entities("Fish &amp; Chips &lt;3 &#169; &#x41;"), "Fish & Chips <3 © A");
        assert_eq!(decode_entities("AT&T; R&D"), "AT&T; R&D");
    }

    #[test]
    fn test_tidy_collapses_blank_lines() {
        assert_eq!(tidy("a\n\n\n\n\nb  \n"), "a\n\nb");
    }
}
