/// A CommonMark and GitHub Flavored Markdown parser with an HTML renderer
pub mod ast;
pub mod emphasis;
pub mod entities;
pub mod error;
pub mod html;
pub mod inline_tree;
pub mod inlines;
pub mod lines;
pub mod links;
pub mod list_item;
pub mod options;
pub mod parser;
pub mod refs;
pub mod renderer;
pub mod table;

pub use ast::{Alignment, AutolinkKind, Block, Inline, ListKind, TableRow};
pub use error::{Error, Result};
pub use options::Options;
pub use parser::Parser;
pub use renderer::HtmlRenderer;

/// Parse markdown text into a `Block::Document` with default options
pub fn parse(markdown: &str) -> Block {
    Parser::new().parse(markdown)
}

pub fn parse_with_options(markdown: &str, options: &Options) -> Block {
    Parser::with_options(options.clone()).parse(markdown)
}

/// Render a parsed document to HTML
pub fn render(document: &Block) -> String {
    HtmlRenderer::new().render(document)
}

pub fn render_with_options(document: &Block, options: &Options) -> String {
    HtmlRenderer::with_options(options.clone()).render(document)
}

/// Parse markdown text and render to HTML
pub fn render_html(markdown: &str) -> String {
    render(&parse(markdown))
}

pub fn render_html_with_options(markdown: &str, options: &Options) -> String {
    render_with_options(&parse_with_options(markdown, options), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input() {
        assert_eq!(render_html(""), "");
    }

    #[test]
    fn test_basic_image() {
        let result = render_html("![foo](/url \"title\")\n");
        assert_eq!(
            result,
            "<p><img src=\"/url\" alt=\"foo\" title=\"title\" /></p>\n"
        );
    }

    #[test]
    fn test_image_without_title() {
        let result = render_html("![bar](/path)\n");
        assert_eq!(result, "<p><img src=\"/path\" alt=\"bar\" /></p>\n");
    }

    #[test]
    fn test_parse_then_render_matches_render_html() {
        let markdown = "# Title\n\n- a\n- b\n\n> quote\n";
        assert_eq!(render(&parse(markdown)), render_html(markdown));
    }

    #[test]
    fn test_commonmark_options_disable_extensions() {
        let options = Options::commonmark();
        assert_eq!(
            render_html_with_options("~~gone~~", &options),
            "<p>~~gone~~</p>\n"
        );
        assert_eq!(render_html("~~gone~~"), "<p><del>gone</del></p>\n");
    }

    #[test]
    fn test_document_roundtrips_through_json() {
        let doc = parse("*a* [b](/c)\n");
        let json = serde_json::to_string(&doc).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }
}
