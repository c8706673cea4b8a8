/// Entity and numeric character references, and backslash escapes
use std::collections::HashMap;
use std::sync::OnceLock;

/// Longest named reference in the HTML5 table is 31 characters.
const MAX_ENTITY_NAME: usize = 32;

/// Characters a backslash can escape: exactly the ASCII punctuation set.
pub fn is_escapable(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Try to read an entity or numeric character reference at the start of
/// `text`. Returns the decoded text and the number of bytes consumed.
///
/// Unknown names and malformed references return `None` so the caller can
/// keep the `&` literally.
pub fn parse_entity(text: &str) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }

    if bytes.get(1) == Some(&b'#') {
        let (radix, digits_start, max_digits) = match bytes.get(2) {
            Some(b'x' | b'X') => (16, 3, 6),
            _ => (10, 2, 7),
        };
        let digits = bytes[digits_start.min(bytes.len())..]
            .iter()
            .take_while(|b| {
                if radix == 16 {
                    b.is_ascii_hexdigit()
                } else {
                    b.is_ascii_digit()
                }
            })
            .count();
        if digits == 0 || digits > max_digits {
            return None;
        }
        let end = digits_start + digits;
        if bytes.get(end) != Some(&b';') {
            return None;
        }
        let code_point = u32::from_str_radix(&text[digits_start..end], radix).ok()?;
        // NUL, surrogates and out-of-range values become U+FFFD
        let ch = match code_point {
            0 => '\u{FFFD}',
            value => char::from_u32(value).unwrap_or('\u{FFFD}'),
        };
        return Some((ch.to_string(), end + 1));
    }

    let name_len = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if name_len == 0 || name_len > MAX_ENTITY_NAME || !bytes[1].is_ascii_alphabetic() {
        return None;
    }
    let end = 1 + name_len;
    if bytes.get(end) != Some(&b';') {
        return None;
    }

    let decoded = named_entities().get(&text[..=end])?;
    Some((decoded.to_string(), end + 1))
}

/// The HTML5 named references keyed by their full `&name;` spelling. Legacy
/// forms without the semicolon are left out.
fn named_entities() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        entities::ENTITIES
            .iter()
            .filter(|entity| entity.entity.ends_with(';'))
            .map(|entity| (entity.entity, entity.characters))
            .collect()
    })
}

/// Resolve backslash escapes and entity references, as done for link
/// destinations, titles and info strings.
pub fn unescape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['\\', '&']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with('\\') {
            match tail[1..].chars().next() {
                Some(c) if is_escapable(c) => {
                    out.push(c);
                    rest = &tail[1 + c.len_utf8()..];
                }
                _ => {
                    out.push('\\');
                    rest = &tail[1..];
                }
            }
        } else if let Some((decoded, consumed)) = parse_entity(tail) {
            out.push_str(&decoded);
            rest = &tail[consumed..];
        } else {
            out.push('&');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(text: &str) -> Option<String> {
        parse_entity(text).map(|(decoded, _)| decoded)
    }

    #[test]
    fn test_named_entities() {
        assert_eq!(decode("&nbsp;"), Some("\u{a0}".to_string()));
        assert_eq!(decode("&copy; rest"), Some("©".to_string()));
        assert_eq!(decode("&ClockwiseContourIntegral;"), Some("∲".to_string()));
        assert_eq!(decode("&MadeUpEntity;"), None);
        assert_eq!(decode("&copy"), None);
        assert_eq!(decode("&ampx;"), None);
    }

    #[test]
    fn test_two_code_point_entities() {
        assert_eq!(decode("&ngE;"), Some("\u{2267}\u{338}".to_string()));
        assert_eq!(decode("&nvlt;"), Some("<\u{20d2}".to_string()));
        assert_eq!(decode("&bne;"), Some("=\u{20e5}".to_string()));
        assert_eq!(parse_entity("&ngE; x"), Some(("\u{2267}\u{338}".to_string(), 5)));
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode("&#35;"), Some("#".to_string()));
        assert_eq!(decode("&#X22;"), Some("\"".to_string()));
        assert_eq!(decode("&#0;"), Some("\u{FFFD}".to_string()));
        assert_eq!(decode("&#87654321;"), None);
        assert_eq!(decode("&#abcdef0;"), None);
        assert_eq!(decode("&#;"), None);
    }

    #[test]
    fn test_consumed_length() {
        assert_eq!(parse_entity("&amp;x"), Some(("&".to_string(), 5)));
    }

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string(r"f\*o&ouml;\o"), r"f*oö\o");
        assert_eq!(unescape_string("a & b"), "a & b");
    }
}
