/// Raw HTML grammar shared by the HTML block recognizer and the inline
/// parser, plus the GFM tag filter applied at render time.
use std::borrow::Cow;

/// Tag names that start an HTML block of type 6
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "base",
    "basefont",
    "blockquote",
    "body",
    "caption",
    "center",
    "col",
    "colgroup",
    "dd",
    "details",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hr",
    "html",
    "iframe",
    "legend",
    "li",
    "link",
    "main",
    "menu",
    "menuitem",
    "nav",
    "noframes",
    "ol",
    "optgroup",
    "option",
    "p",
    "param",
    "section",
    "source",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "title",
    "tr",
    "track",
    "ul",
];

/// Tags whose content is raw text; they start (and end) a type 1 block
const RAW_TEXT_TAGS: &[&str] = &["script", "pre", "style"];

/// Tags neutered by the GFM tagfilter extension
const FILTERED_TAGS: &[&str] = &[
    "title",
    "textarea",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "script",
    "plaintext",
];

fn is_html_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn skip_whitespace(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && is_html_whitespace(s[i]) {
        i += 1;
    }
    i
}

fn starts_with_ignore_case(s: &[u8], prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Tag name: an ASCII letter followed by letters, digits or `-`
fn scan_tag_name(s: &[u8], i: usize) -> Option<usize> {
    if !s.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let mut j = i + 1;
    while j < s.len() && (s[j].is_ascii_alphanumeric() || s[j] == b'-') {
        j += 1;
    }
    Some(j)
}

fn scan_attribute_name(s: &[u8], i: usize) -> Option<usize> {
    let first = *s.get(i)?;
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b':') {
        return None;
    }
    let mut j = i + 1;
    while j < s.len() && (s[j].is_ascii_alphanumeric() || matches!(s[j], b'_' | b'.' | b':' | b'-'))
    {
        j += 1;
    }
    Some(j)
}

fn scan_attribute_value(s: &[u8], i: usize) -> Option<usize> {
    match *s.get(i)? {
        quote @ (b'"' | b'\'') => {
            let close = s[i + 1..].iter().position(|&b| b == quote)?;
            Some(i + 1 + close + 1)
        }
        _ => {
            let mut j = i;
            while j < s.len()
                && s[j] > b' '
                && !matches!(s[j], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            {
                j += 1;
            }
            (j > i).then_some(j)
        }
    }
}

/// Attribute with optional value specification. `i` must sit just after
/// the whitespace that separates it from what came before.
fn scan_attribute(s: &[u8], i: usize) -> Option<usize> {
    let name_end = scan_attribute_name(s, i)?;
    let eq = skip_whitespace(s, name_end);
    if s.get(eq) == Some(&b'=') {
        let value_start = skip_whitespace(s, eq + 1);
        return scan_attribute_value(s, value_start);
    }
    Some(name_end)
}

/// `<name attr="x" ...>` or `<name/>`; returns the byte length
pub fn scan_open_tag(s: &[u8]) -> Option<usize> {
    if s.first() != Some(&b'<') {
        return None;
    }
    let mut i = scan_tag_name(s, 1)?;
    loop {
        let after_space = skip_whitespace(s, i);
        if after_space == i {
            break;
        }
        match scan_attribute(s, after_space) {
            Some(end) => i = end,
            None => {
                i = after_space;
                break;
            }
        }
    }
    if s.get(i) == Some(&b'/') {
        i += 1;
    }
    (s.get(i) == Some(&b'>')).then_some(i + 1)
}

/// `</name >`; returns the byte length
pub fn scan_closing_tag(s: &[u8]) -> Option<usize> {
    if !s.starts_with(b"</") {
        return None;
    }
    let name_end = scan_tag_name(s, 2)?;
    let i = skip_whitespace(s, name_end);
    (s.get(i) == Some(&b'>')).then_some(i + 1)
}

fn scan_comment(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"<!--")?;
    if body.starts_with(b">") || body.starts_with(b"->") {
        return None;
    }
    // The first `--` has to be the start of the terminator
    let dashes = body.windows(2).position(|w| w == b"--")?;
    (body.get(dashes + 2) == Some(&b'>')).then_some(4 + dashes + 3)
}

fn scan_processing_instruction(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"<?")?;
    let end = body.windows(2).position(|w| w == b"?>")?;
    Some(2 + end + 2)
}

fn scan_declaration(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"<!")?;
    let name_len = body.iter().take_while(|b| b.is_ascii_uppercase()).count();
    if name_len == 0 {
        return None;
    }
    let after_name = &body[name_len..];
    let space_len = after_name
        .iter()
        .take_while(|&&b| is_html_whitespace(b))
        .count();
    if space_len == 0 {
        return None;
    }
    let close = after_name[space_len..].iter().position(|&b| b == b'>')?;
    Some(2 + name_len + space_len + close + 1)
}

fn scan_cdata(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"<![CDATA[")?;
    let end = body.windows(3).position(|w| w == b"]]>")?;
    Some(9 + end + 3)
}

/// Any inline raw HTML construct at the start of `s`: open tag, closing
/// tag, comment, processing instruction, declaration or CDATA section.
pub fn scan_raw_html(s: &[u8]) -> Option<usize> {
    match s.get(1)? {
        b'!' => scan_comment(s)
            .or_else(|| scan_cdata(s))
            .or_else(|| scan_declaration(s)),
        b'?' => scan_processing_instruction(s),
        b'/' => scan_closing_tag(s),
        _ => scan_open_tag(s),
    }
}

/// Classify a line (starting at its first non-space character) as the
/// start of an HTML block of type 1-7.
///
/// Type 7 cannot interrupt a paragraph, so it is only considered when
/// `interrupting_paragraph` is false.
pub fn html_block_start(line: &str, interrupting_paragraph: bool) -> Option<u8> {
    let s = line.as_bytes();
    if s.first() != Some(&b'<') {
        return None;
    }

    let name_start = if s.get(1) == Some(&b'/') { 2 } else { 1 };
    let name_len = s[name_start..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let name = line[name_start..name_start + name_len].to_ascii_lowercase();
    let after_name = &s[name_start + name_len..];

    if name_start == 1 && RAW_TEXT_TAGS.contains(&name.as_str()) {
        let ends_name = match after_name.first() {
            None => true,
            Some(&b) => b == b'>' || is_html_whitespace(b),
        };
        if ends_name {
            return Some(1);
        }
    }
    if s.starts_with(b"<!--") {
        return Some(2);
    }
    if s.starts_with(b"<?") {
        return Some(3);
    }
    if s.len() > 2 && s[1] == b'!' && s[2].is_ascii_uppercase() {
        return Some(4);
    }
    if s.starts_with(b"<![CDATA[") {
        return Some(5);
    }
    if name_len > 0 && BLOCK_TAGS.contains(&name.as_str()) {
        let ends_name = match after_name.first() {
            None => true,
            Some(&b'>') => true,
            Some(&b'/') => after_name.get(1) == Some(&b'>'),
            Some(&b) => is_html_whitespace(b),
        };
        if ends_name {
            return Some(6);
        }
    }
    if !interrupting_paragraph {
        let tag_len = scan_open_tag(s).or_else(|| scan_closing_tag(s));
        if let Some(len) = tag_len
            && s[len..].iter().all(|&b| is_html_whitespace(b))
            && !RAW_TEXT_TAGS.contains(&name.as_str())
        {
            return Some(7);
        }
    }

    None
}

/// Whether `line` satisfies the end condition of a type 1-5 block.
/// Types 6 and 7 end at a blank line instead and never match here.
pub fn html_block_end(block_type: u8, line: &str) -> bool {
    match block_type {
        1 => {
            let lower = line.to_ascii_lowercase();
            RAW_TEXT_TAGS
                .iter()
                .any(|tag| lower.contains(&format!("</{}>", tag)))
        }
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}

/// GFM tagfilter: replace the `<` of disallowed open or close tags with
/// `&lt;` so the browser shows them as text.
pub fn filter_disallowed_tags(html: &str) -> Cow<'_, str> {
    let s = html.as_bytes();
    let mut out = String::new();
    let mut copied = 0;

    for (i, _) in html.match_indices('<') {
        let name_start = if s.get(i + 1) == Some(&b'/') { i + 2 } else { i + 1 };
        let filtered = FILTERED_TAGS.iter().any(|tag| {
            starts_with_ignore_case(&s[name_start..], tag)
                && match s.get(name_start + tag.len()) {
                    None => true,
                    Some(&b'>') => true,
                    Some(&b'/') => s.get(name_start + tag.len() + 1) == Some(&b'>'),
                    Some(&b) => is_html_whitespace(b),
                }
        });
        if filtered {
            out.push_str(&html[copied..i]);
            out.push_str("&lt;");
            copied = i + 1;
        }
    }

    if copied == 0 {
        Cow::Borrowed(html)
    } else {
        out.push_str(&html[copied..]);
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_tags() {
        assert_eq!(scan_open_tag(b"<a>"), Some(3));
        assert_eq!(scan_open_tag(b"<bab/>x"), Some(6));
        assert_eq!(
            scan_open_tag(b"<a foo=\"bar\" bam = 'baz <em>\"</em>'\n_boolean zoop:33=zoop:33 />"),
            Some(63)
        );
        assert_eq!(scan_open_tag(b"<33>"), None);
        assert_eq!(scan_open_tag(b"<__>"), None);
        assert_eq!(scan_open_tag(b"<a h*#ref=\"hi\">"), None);
        assert_eq!(scan_open_tag(b"<a href='bar'title=title>"), None);
    }

    #[test]
    fn test_closing_tags() {
        assert_eq!(scan_closing_tag(b"</a >"), Some(5));
        assert_eq!(scan_closing_tag(b"</a href=\"foo\">"), None);
    }

    #[test]
    fn test_comments() {
        assert_eq!(scan_raw_html(b"<!-- a -->"), Some(10));
        assert_eq!(scan_raw_html(b"<!---->"), Some(7));
        assert_eq!(scan_raw_html(b"<!-->"), None);
        assert_eq!(scan_raw_html(b"<!-- a -- b -->"), None);
    }

    #[test]
    fn test_other_constructs() {
        assert_eq!(scan_raw_html(b"<?php echo $a; ?>"), Some(17));
        assert_eq!(scan_raw_html(b"<!ELEMENT br EMPTY>"), Some(19));
        assert_eq!(scan_raw_html(b"<![CDATA[>&<]]>"), Some(15));
    }

    #[test]
    fn test_block_start_types() {
        assert_eq!(html_block_start("<script type=\"x\">", false), Some(1));
        assert_eq!(html_block_start("<PRE>", false), Some(1));
        assert_eq!(html_block_start("<!-- c", false), Some(2));
        assert_eq!(html_block_start("<?php", false), Some(3));
        assert_eq!(html_block_start("<!DOCTYPE html>", false), Some(4));
        assert_eq!(html_block_start("<![CDATA[", false), Some(5));
        assert_eq!(html_block_start("<div", false), Some(6));
        assert_eq!(html_block_start("</TD>", true), Some(6));
        assert_eq!(html_block_start("<a href=\"foo\">", false), Some(7));
        assert_eq!(html_block_start("<a href=\"foo\">", true), None);
        assert_eq!(html_block_start("<a> text", false), None);
        assert_eq!(html_block_start("<divx>", true), None);
    }

    #[test]
    fn test_block_end_conditions() {
        assert!(html_block_end(1, "x</STYLE>y"));
        assert!(html_block_end(2, "--> tail"));
        assert!(!html_block_end(6, ""));
    }

    #[test]
    fn test_tagfilter() {
        assert_eq!(
            filter_disallowed_tags("<strong> <title> <style> <em>"),
            "<strong> &lt;title> &lt;style> <em>"
        );
        assert_eq!(filter_disallowed_tags("</XMP>"), "&lt;/XMP>");
        assert_eq!(filter_disallowed_tags("<titles>"), "<titles>");
    }
}
