/// List item marker recognition
use crate::ast::ListKind;
use crate::lines::{LineCursor, is_space_or_tab};

/// Ordered list numbers are limited to nine digits
const MAX_ORDERED_DIGITS: usize = 9;

/// What a list item start records about its marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListMarker {
    pub kind: ListKind,
    /// Columns of indentation before the marker
    pub marker_offset: usize,
    /// Marker width plus the spaces that follow it; continuation lines
    /// must be indented at least `marker_offset + padding` columns
    pub padding: usize,
}

impl ListMarker {
    pub fn content_indent(&self) -> usize {
        self.marker_offset + self.padding
    }
}

/// Try to read a list item marker at the cursor. On success the cursor is
/// left at the start of the item's content.
///
/// `interrupts_paragraph` applies the extra rules for a list item that
/// would cut a paragraph short: an ordered list must start at 1 and the
/// item may not be empty.
pub fn parse_list_marker(
    cursor: &mut LineCursor<'_>,
    interrupts_paragraph: bool,
) -> Option<ListMarker> {
    if cursor.indented() {
        return None;
    }

    let rest = cursor.rest_from_nonspace().as_bytes();
    let (kind, marker_len) = match rest.first()? {
        &c @ (b'-' | b'+' | b'*') => (ListKind::Bullet(c as char), 1),
        b'0'..=b'9' => {
            let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > MAX_ORDERED_DIGITS {
                return None;
            }
            let delimiter = match rest.get(digits) {
                Some(&d @ (b'.' | b')')) => d as char,
                _ => return None,
            };
            let start: u32 = std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()?;
            if interrupts_paragraph && start != 1 {
                return None;
            }
            (ListKind::Ordered { start, delimiter }, digits + 1)
        }
        _ => return None,
    };

    let after_marker = &rest[marker_len..];
    if !after_marker.is_empty() && !is_space_or_tab(after_marker.first().copied()) {
        return None;
    }
    if interrupts_paragraph && after_marker.iter().all(|&b| b == b' ' || b == b'\t') {
        return None;
    }

    let marker_offset = cursor.indent;
    cursor.advance_next_nonspace();
    cursor.advance_offset(marker_len, true);

    let spaces_start = cursor.mark();
    let spaces_start_column = cursor.column;
    loop {
        cursor.advance_offset(1, true);
        let next = cursor.byte_at(cursor.offset);
        if cursor.column - spaces_start_column >= 5 || !is_space_or_tab(next) {
            break;
        }
    }
    let blank_item = cursor.byte_at(cursor.offset).is_none();
    let spaces_after_marker = cursor.column - spaces_start_column;

    let padding = if spaces_after_marker >= 5 || spaces_after_marker < 1 || blank_item {
        // Content starts one column after the marker; the rest of the
        // whitespace belongs to the content (e.g. indented code)
        cursor.reset(spaces_start);
        if is_space_or_tab(cursor.byte_at(cursor.offset)) {
            cursor.advance_offset(1, true);
        }
        marker_len + 1
    } else {
        marker_len + spaces_after_marker
    };

    Some(ListMarker {
        kind,
        marker_offset,
        padding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn marker(line: &str) -> Option<ListMarker> {
        parse_list_marker(&mut LineCursor::new(line), false)
    }

    #[test]
    fn test_bullet_padding() {
        let m = marker("-  foo").unwrap();
        assert_eq!(m.kind, ListKind::Bullet('-'));
        assert_eq!(m.padding, 3);
        assert_eq!(marker("  * x").unwrap().content_indent(), 4);
    }

    #[test]
    fn test_ordered_marker() {
        let m = marker("12) foo").unwrap();
        assert_eq!(
            m.kind,
            ListKind::Ordered {
                start: 12,
                delimiter: ')'
            }
        );
        assert_eq!(m.padding, 4);
        assert!(marker("1234567890. x").is_none());
        assert!(marker("-1. x").is_none());
    }

    #[test]
    fn test_marker_needs_following_space() {
        assert!(marker("-foo").is_none());
        assert!(marker("1.foo").is_none());
        assert!(marker("-").is_some());
    }

    #[test]
    fn test_code_after_marker_uses_minimal_padding() {
        let mut cursor = LineCursor::new("-     code");
        let m = parse_list_marker(&mut cursor, false).unwrap();
        assert_eq!(m.padding, 2);
        assert_eq!(cursor.rest(), "    code");
    }

    #[test]
    fn test_paragraph_interruption_rules() {
        let mut cursor = LineCursor::new("2. two");
        assert!(parse_list_marker(&mut cursor, true).is_none());
        let mut cursor = LineCursor::new("* ");
        assert!(parse_list_marker(&mut cursor, true).is_none());
        let mut cursor = LineCursor::new("1. one");
        assert!(parse_list_marker(&mut cursor, true).is_some());
    }

    #[test]
    fn test_indented_marker_is_code() {
        assert!(marker("    - foo").is_none());
    }
}
