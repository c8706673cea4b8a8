/// HTML renderer for the document tree
use crate::ast::{Alignment, AutolinkKind, Block, Inline, ListKind, TableRow};
use crate::html::filter_disallowed_tags;
use crate::links::normalize_uri;
use crate::options::Options;
use std::borrow::Cow;

#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    options: Options,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        HtmlRenderer { options }
    }

    pub fn render(&self, block: &Block) -> String {
        let mut writer = HtmlWriter {
            out: String::new(),
            options: &self.options,
        };
        writer.block(block, false);
        writer.out
    }
}

/// Escape `&`, `<`, `>` and `"`; used for text and attribute values alike.
/// Code spans and blocks get `&quot;` too, as cmark renders them.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

struct HtmlWriter<'o> {
    out: String,
    options: &'o Options,
}

impl HtmlWriter<'_> {
    /// Start a new line unless the output already ends one
    fn cr(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn push_escaped(&mut self, s: &str) {
        let escaped = escape_html(s);
        self.out.push_str(&escaped);
    }

    fn void_tag_end(&self) -> &'static str {
        if self.options.xhtml { " />" } else { ">" }
    }

    fn raw_html(&mut self, literal: &str) {
        if self.options.tagfilter {
            let filtered = filter_disallowed_tags(literal);
            self.out.push_str(&filtered);
        } else {
            self.out.push_str(literal);
        }
    }

    fn blocks(&mut self, blocks: &[Block], tight: bool) {
        for block in blocks {
            self.block(block, tight);
        }
    }

    /// `tight` is set for the direct children of an item in a tight list
    fn block(&mut self, block: &Block, tight: bool) {
        match block {
            Block::Document(children) => self.blocks(children, false),
            Block::BlockQuote(children) => {
                self.cr();
                self.push("<blockquote>");
                self.cr();
                self.blocks(children, false);
                self.cr();
                self.push("</blockquote>");
                self.cr();
            }
            Block::List {
                kind,
                tight: list_tight,
                children,
            } => {
                self.cr();
                let close = match kind {
                    ListKind::Bullet(_) => {
                        self.push("<ul>");
                        "</ul>"
                    }
                    ListKind::Ordered { start: 1, .. } => {
                        self.push("<ol>");
                        "</ol>"
                    }
                    ListKind::Ordered { start, .. } => {
                        self.push(&format!("<ol start=\"{}\">", start));
                        "</ol>"
                    }
                };
                self.cr();
                self.blocks(children, *list_tight);
                self.cr();
                self.push(close);
                self.cr();
            }
            Block::ListItem(children) => {
                self.push("<li>");
                self.blocks(children, tight);
                self.push("</li>");
                self.cr();
            }
            Block::Paragraph(inlines) => {
                if tight {
                    self.inlines(inlines);
                } else {
                    self.cr();
                    self.push("<p>");
                    self.inlines(inlines);
                    self.push("</p>");
                    self.cr();
                }
            }
            Block::AtxHeading { level, children } | Block::SetextHeading { level, children } => {
                self.cr();
                self.push(&format!("<h{}>", level));
                self.inlines(children);
                self.push(&format!("</h{}>", level));
                self.cr();
            }
            Block::IndentedCode(literal) => self.code_block("", literal),
            Block::FencedCode { info, literal, .. } => self.code_block(info, literal),
            Block::HtmlBlock { literal, .. } => {
                self.cr();
                self.raw_html(literal);
                self.cr();
            }
            Block::ThematicBreak => {
                self.cr();
                self.push("<hr");
                self.push(self.void_tag_end());
                self.cr();
            }
            Block::Table {
                alignments,
                header,
                rows,
            } => {
                self.cr();
                self.push("<table>\n<thead>\n");
                self.table_row(header, alignments, "th");
                self.push("</thead>\n");
                if !rows.is_empty() {
                    self.push("<tbody>\n");
                    for row in rows {
                        self.table_row(row, alignments, "td");
                    }
                    self.push("</tbody>\n");
                }
                self.push("</table>\n");
            }
        }
    }

    fn code_block(&mut self, info: &str, literal: &str) {
        self.cr();
        // Only the first word of the info string names the language
        match info.split([' ', '\t']).next() {
            Some(language) if !language.is_empty() => {
                self.push("<pre><code class=\"language-");
                self.push_escaped(language);
                self.push("\">");
            }
            _ => self.push("<pre><code>"),
        }
        self.push_escaped(literal);
        self.push("</code></pre>");
        self.cr();
    }

    fn table_row(&mut self, row: &TableRow, alignments: &[Alignment], cell_tag: &str) {
        self.push("<tr>\n");
        for (cell, alignment) in row.cells.iter().zip(alignments) {
            self.push("<");
            self.push(cell_tag);
            match alignment {
                Alignment::None => {}
                Alignment::Left => self.push(" align=\"left\""),
                Alignment::Right => self.push(" align=\"right\""),
                Alignment::Center => self.push(" align=\"center\""),
            }
            self.push(">");
            self.inlines(cell);
            self.push(&format!("</{}>\n", cell_tag));
        }
        self.push("</tr>\n");
    }

    fn inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.inline(inline);
        }
    }

    fn inline(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(text) => self.push_escaped(text),
            Inline::SoftBreak => self.push("\n"),
            Inline::HardBreak => {
                self.push("<br");
                self.push(self.void_tag_end());
                self.push("\n");
            }
            Inline::CodeSpan(code) => {
                self.push("<code>");
                self.push_escaped(code);
                self.push("</code>");
            }
            Inline::RawHtml(html) => self.raw_html(html),
            Inline::Autolink { kind, target } => {
                self.push("<a href=\"");
                if *kind == AutolinkKind::Email {
                    self.push("mailto:");
                }
                self.push_escaped(&normalize_uri(target));
                self.push("\">");
                self.push_escaped(target);
                self.push("</a>");
            }
            Inline::Entity { decoded, .. } => self.push_escaped(decoded),
            Inline::Emphasis { depth, children } => {
                let tag = if *depth >= 2 { "strong" } else { "em" };
                self.push(&format!("<{}>", tag));
                self.inlines(children);
                self.push(&format!("</{}>", tag));
            }
            Inline::Strikethrough(children) => {
                self.push("<del>");
                self.inlines(children);
                self.push("</del>");
            }
            Inline::Link {
                destination,
                title,
                children,
            } => {
                self.push("<a href=\"");
                self.push_escaped(&normalize_uri(destination));
                self.push("\"");
                if let Some(title) = title {
                    self.push(" title=\"");
                    self.push_escaped(title);
                    self.push("\"");
                }
                self.push(">");
                self.inlines(children);
                self.push("</a>");
            }
            Inline::Image {
                destination,
                title,
                children,
            } => {
                self.push("<img src=\"");
                self.push_escaped(&normalize_uri(destination));
                self.push("\" alt=\"");
                let mut alt = String::new();
                plain_text(children, &mut alt);
                self.push_escaped(&alt);
                self.push("\"");
                if let Some(title) = title {
                    self.push(" title=\"");
                    self.push_escaped(title);
                    self.push("\"");
                }
                self.push(self.void_tag_end());
            }
        }
    }
}

/// Flatten inlines to their text for an image's `alt` attribute
fn plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::CodeSpan(text) | Inline::RawHtml(text) => {
                out.push_str(text)
            }
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::Autolink { target, .. } => out.push_str(target),
            Inline::Entity { decoded, .. } => out.push_str(decoded),
            Inline::Emphasis { children, .. }
            | Inline::Strikethrough(children)
            | Inline::Link { children, .. }
            | Inline::Image { children, .. } => plain_text(children, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn render(block: &Block) -> String {
        HtmlRenderer::new().render(block)
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(render(&Block::Document(vec![])), "");
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = Block::Document(vec![Block::Paragraph(vec![text("a < b & \"c\" > d")])]);
        assert_eq!(render(&doc), "<p>a &lt; b &amp; &quot;c&quot; &gt; d</p>\n");
    }

    #[test]
    fn test_tight_and_loose_items() {
        let item = |s: &str| Block::ListItem(vec![Block::Paragraph(vec![text(s)])]);
        let tight = Block::Document(vec![Block::List {
            kind: ListKind::Bullet('-'),
            tight: true,
            children: vec![item("a"), item("b")],
        }]);
        assert_eq!(render(&tight), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");

        let loose = Block::Document(vec![Block::List {
            kind: ListKind::Ordered {
                start: 3,
                delimiter: '.',
            },
            tight: false,
            children: vec![item("a")],
        }]);
        assert_eq!(render(&loose), "<ol start=\"3\">\n<li>\n<p>a</p>\n</li>\n</ol>\n");
    }

    #[test]
    fn test_nested_list_in_tight_item() {
        let doc = Block::Document(vec![Block::List {
            kind: ListKind::Bullet('-'),
            tight: true,
            children: vec![Block::ListItem(vec![
                Block::Paragraph(vec![text("a")]),
                Block::List {
                    kind: ListKind::Bullet('-'),
                    tight: true,
                    children: vec![Block::ListItem(vec![Block::Paragraph(vec![text("b")])])],
                },
            ])],
        }]);
        assert_eq!(
            render(&doc),
            "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_code_block_language_class() {
        let doc = Block::Document(vec![Block::FencedCode {
            info: "rust extra".into(),
            fence_char: '`',
            fence_length: 3,
            literal: "a < b\n".into(),
        }]);
        assert_eq!(
            render(&doc),
            "<pre><code class=\"language-rust\">a &lt; b\n</code></pre>\n"
        );
    }

    #[test]
    fn test_link_and_image_attributes() {
        let doc = Block::Document(vec![Block::Paragraph(vec![
            Inline::Link {
                destination: "/my uri".into(),
                title: Some("t\"".into()),
                children: vec![text("x")],
            },
            Inline::Image {
                destination: "/i.png".into(),
                title: None,
                children: vec![
                    text("foo "),
                    Inline::Emphasis {
                        depth: 2,
                        children: vec![text("bar")],
                    },
                ],
            },
        ])]);
        assert_eq!(
            render(&doc),
            "<p><a href=\"/my%20uri\" title=\"t&quot;\">x</a><img src=\"/i.png\" alt=\"foo bar\" /></p>\n"
        );
    }

    #[test]
    fn test_email_autolink() {
        let doc = Block::Document(vec![Block::Paragraph(vec![Inline::Autolink {
            kind: AutolinkKind::Email,
            target: "foo@bar.example.com".into(),
        }])]);
        assert_eq!(
            render(&doc),
            "<p><a href=\"mailto:foo@bar.example.com\">foo@bar.example.com</a></p>\n"
        );
    }

    #[test]
    fn test_html4_void_tags() {
        let renderer = HtmlRenderer::with_options(Options {
            xhtml: false,
            ..Options::default()
        });
        let doc = Block::Document(vec![
            Block::ThematicBreak,
            Block::Paragraph(vec![text("a"), Inline::HardBreak, text("b")]),
        ]);
        assert_eq!(renderer.render(&doc), "<hr>\n<p>a<br>\nb</p>\n");
    }

    #[test]
    fn test_tagfilter_on_raw_html() {
        let doc = Block::Document(vec![Block::HtmlBlock {
            block_type: 7,
            literal: "<xmp>".into(),
        }]);
        assert_eq!(render(&doc), "<xmp>\n");
        assert_eq!(HtmlRenderer::with_options(Options::gfm()).render(&doc), "&lt;xmp>\n");
    }

    #[test]
    fn test_table_markup() {
        let doc = Block::Document(vec![Block::Table {
            alignments: vec![Alignment::Center, Alignment::None],
            header: TableRow {
                cells: vec![vec![text("a")], vec![text("b")]],
            },
            rows: vec![],
        }]);
        assert_eq!(
            render(&doc),
            "<table>\n<thead>\n<tr>\n<th align=\"center\">a</th>\n<th>b</th>\n</tr>\n</thead>\n</table>\n"
        );
    }
}
