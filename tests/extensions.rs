use gfmark::{Error, Options, render_html, render_html_with_options};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;

#[test]
fn table_with_inline_content_and_alignment() {
    let markdown = "| *a* | `b` |\n|:--|:-:|\n| [c](/d) | e |\n";
    assert_eq!(
        render_html(markdown),
        "<table>\n<thead>\n<tr>\n<th align=\"left\"><em>a</em></th>\n<th align=\"center\"><code>b</code></th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td align=\"left\"><a href=\"/d\">c</a></td>\n<td align=\"center\">e</td>\n</tr>\n</tbody>\n</table>\n"
    );
}

#[test]
fn table_interrupts_paragraph_after_its_first_lines() {
    assert_eq!(
        render_html("intro\na | b\n--|--\n"),
        "<p>intro</p>\n<table>\n<thead>\n<tr>\n<th>a</th>\n<th>b</th>\n</tr>\n</thead>\n</table>\n"
    );
}

#[test]
fn table_inside_block_quote_ends_with_the_quote() {
    assert_eq!(
        render_html("> a | b\n> --|--\n> 1 | 2\nafter\n"),
        "<blockquote>\n<table>\n<thead>\n<tr>\n<th>a</th>\n<th>b</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>1</td>\n<td>2</td>\n</tr>\n</tbody>\n</table>\n</blockquote>\n<p>after</p>\n"
    );
}

#[rstest]
#[case("~one~ ~~two~~", "<p><del>one</del> <del>two</del></p>\n")]
#[case("~~mismatch~", "<p>~~mismatch~</p>\n")]
#[case("a ~~~three~~~ b", "<p>a ~~~three~~~ b</p>\n")]
#[case("a ~~*b*~~ c", "<p>a <del><em>b</em></del> c</p>\n")]
fn strikethrough(#[case] markdown: &str, #[case] expected: &str) {
    assert_eq!(render_html(markdown), expected);
}

#[test]
fn tagfilter_neuters_disallowed_tags() {
    let markdown = "<strong> <title> <style> <em>\n\n<blockquote>\n  <xmp> is disallowed.  <XMP> is also disallowed.\n</blockquote>\n";
    assert_eq!(
        render_html_with_options(markdown, &Options::gfm()),
        "<p><strong> &lt;title> &lt;style> <em></p>\n<blockquote>\n  &lt;xmp> is disallowed.  &lt;XMP> is also disallowed.\n</blockquote>\n"
    );
}

#[test]
fn tagfilter_is_off_by_default() {
    assert_eq!(render_html("a <xmp>b</xmp>\n"), "<p>a <xmp>b</xmp></p>\n");
}

#[test]
fn html4_output_drops_self_closing_slash() {
    let options = Options {
        xhtml: false,
        ..Options::default()
    };
    assert_eq!(
        render_html_with_options("![i](/i.png)\n\n***\n", &options),
        "<p><img src=\"/i.png\" alt=\"i\"></p>\n<hr>\n"
    );
}

#[test]
fn options_load_from_json() {
    let options = Options::from_json_str(r#"{"tables": false, "max_nesting": 3}"#).unwrap();
    assert!(!options.tables);
    assert!(options.strikethrough);
    assert_eq!(options.max_nesting, 3);

    let path = std::env::temp_dir().join(format!("gfmark-options-{}.json", std::process::id()));
    fs::write(&path, r#"{"tagfilter": true}"#).unwrap();
    let from_file = Options::from_json_file(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(from_file, Options::gfm());
}

#[test]
fn options_reject_unknown_fields_and_missing_files() {
    assert!(matches!(
        Options::from_json_str(r#"{"tabels": true}"#),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        Options::from_json_file("/nonexistent/gfmark.json"),
        Err(Error::Io { .. })
    ));
}
