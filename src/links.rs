/// Link grammar: destinations, titles, labels and reference definitions
use crate::entities::{is_escapable, unescape_string};
use crate::refs::{LinkReference, normalize_label};

/// Labels may hold at most this many characters between the brackets
pub const MAX_LABEL_CHARS: usize = 999;
/// Nesting limit for balanced parentheses in a bare destination
const MAX_DESTINATION_PARENS: usize = 32;

fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Skip spaces and tabs, with at most one line ending among them
pub fn skip_spnl(s: &str, mut pos: usize) -> usize {
    let bytes = s.as_bytes();
    while pos < bytes.len() && is_space_or_tab(bytes[pos]) {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'\n') {
        pos += 1;
        while pos < bytes.len() && is_space_or_tab(bytes[pos]) {
            pos += 1;
        }
    }
    pos
}

/// Parse a link destination at `pos`, either `<...>` or a bare run with
/// balanced parentheses. Returns the unescaped destination and the end
/// position.
pub fn scan_link_destination(s: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = s.as_bytes();

    if bytes.get(pos) == Some(&b'<') {
        let mut i = pos + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => return Some((unescape_string(&s[pos + 1..i]), i + 1)),
                b'<' | b'\n' => return None,
                b'\\' if bytes.get(i + 1).is_some_and(|&b| b != b'\n') => i += 2,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = pos;
    let mut open_parens = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|&b| is_escapable(b as char)) => i += 2,
            b'(' => {
                open_parens += 1;
                if open_parens > MAX_DESTINATION_PARENS {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if open_parens == 0 {
                    break;
                }
                open_parens -= 1;
                i += 1;
            }
            b if b <= b' ' || b == 0x7f => break,
            _ => i += 1,
        }
    }

    if open_parens != 0 {
        return None;
    }
    // An empty bare destination is only allowed right before `)`
    if i == pos && bytes.get(i) != Some(&b')') {
        return None;
    }
    Some((unescape_string(&s[pos..i]), i))
}

/// Parse a link title delimited by `"`, `'` or parentheses. Returns the
/// unescaped title and the end position.
pub fn scan_link_title(s: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    let close = match bytes.get(pos)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };

    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b if b == close => return Some((unescape_string(&s[pos + 1..i]), i + 1)),
            b'(' if close == b')' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Scan a link label `[...]` at `pos` and return the position after the
/// closing bracket. Unescaped brackets are not allowed inside.
pub fn scan_link_label(s: &str, pos: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.get(pos) != Some(&b'[') {
        return None;
    }

    let mut i = pos + 1;
    let mut chars = 0;
    while i < bytes.len() {
        match bytes[i] {
            b']' => return Some(i + 1),
            b'[' => return None,
            b'\\' if i + 1 < bytes.len() => {
                i += 1;
                i += s[i..].chars().next().map_or(1, char::len_utf8);
            }
            _ => i += s[i..].chars().next().map_or(1, char::len_utf8),
        }
        chars += 1;
        if chars > MAX_LABEL_CHARS {
            return None;
        }
    }
    None
}

/// Try to read one link reference definition from the start of `s`
/// (paragraph content). Returns the raw label, the definition and the
/// number of bytes consumed, including the trailing line ending.
pub fn parse_reference(s: &str) -> Option<(String, LinkReference, usize)> {
    let label_end = scan_link_label(s, 0)?;
    let label = &s[1..label_end - 1];
    if s.as_bytes().get(label_end) != Some(&b':') {
        return None;
    }
    if normalize_label(label).is_empty() {
        return None;
    }

    let dest_start = skip_spnl(s, label_end + 1);
    let (destination, dest_end) = scan_link_destination(s, dest_start)?;
    // `[foo]:` followed by nothing has no destination at all
    if dest_end == dest_start && s.as_bytes().get(dest_start) != Some(&b'<') {
        return None;
    }

    let title_start = skip_spnl(s, dest_end);
    if title_start > dest_end
        && let Some((title, title_end)) = scan_link_title(s, title_start)
        && let Some(end) = line_end(s, title_end)
    {
        let title = (!title.is_empty()).then_some(title);
        return Some((label.to_string(), LinkReference { destination, title }, end));
    }

    // No usable title: the destination itself has to end the line
    let end = line_end(s, dest_end)?;
    Some((
        label.to_string(),
        LinkReference {
            destination,
            title: None,
        },
        end,
    ))
}

/// Position after trailing spaces and the line ending, if nothing else
/// follows `pos` on its line.
fn line_end(s: &str, pos: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = pos;
    while i < bytes.len() && is_space_or_tab(bytes[i]) {
        i += 1;
    }
    match bytes.get(i) {
        None => Some(i),
        Some(b'\n') => Some(i + 1),
        Some(_) => None,
    }
}

/// Percent-encode a destination for use in `href`/`src`. Characters that
/// are safe in a URL are kept, including `%` so existing escapes survive.
pub fn normalize_uri(url: &str) -> String {
    const SAFE: &[u8] = b"-_.+!*'(),%#@?=;:/&$~";
    let mut out = String::with_capacity(url.len());
    for &b in url.as_bytes() {
        if b.is_ascii_alphanumeric() || SAFE.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
