/// Line splitting and column tracking under a 4-column tab stop
use std::borrow::Cow;

pub const TAB_STOP: usize = 4;
pub const CODE_INDENT: usize = 4;

/// Split input into logical lines without their terminators.
///
/// LF, CR LF and a lone CR all end a line. A final line ending does not
/// start an extra empty line, so `"a\n"` and `"a"` read the same.
pub fn split_lines(input: &str) -> Vec<Cow<'_, str>> {
    let bytes = input.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(sanitize(&input[start..i]));
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(sanitize(&input[start..i]));
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(sanitize(&input[start..]));
    }

    lines
}

/// U+0000 is replaced by the replacement character
fn sanitize(line: &str) -> Cow<'_, str> {
    if line.contains('\0') {
        Cow::Owned(line.replace('\0', "\u{FFFD}"))
    } else {
        Cow::Borrowed(line)
    }
}

pub fn is_space_or_tab(byte: Option<u8>) -> bool {
    matches!(byte, Some(b' ' | b'\t'))
}

/// Cursor over one line as the block parser consumes container markers.
///
/// `offset` is a byte index, `column` the visual column. When a tab is only
/// partly consumed (e.g. the optional space after `>`), `offset` stays on
/// the tab and `partially_consumed_tab` records that the rest of it still
/// has to be emitted as spaces.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    line: &'a str,
    pub offset: usize,
    pub column: usize,
    pub partially_consumed_tab: bool,
    pub next_nonspace: usize,
    pub next_nonspace_column: usize,
    pub indent: usize,
    pub blank: bool,
}

/// Saved cursor position, used to back out of a speculative advance
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    offset: usize,
    column: usize,
    partially_consumed_tab: bool,
}

impl<'a> LineCursor<'a> {
    pub fn new(line: &'a str) -> Self {
        let mut cursor = LineCursor {
            line,
            offset: 0,
            column: 0,
            partially_consumed_tab: false,
            next_nonspace: 0,
            next_nonspace_column: 0,
            indent: 0,
            blank: false,
        };
        cursor.find_next_nonspace();
        cursor
    }

    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn indented(&self) -> bool {
        self.indent >= CODE_INDENT
    }

    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.line.as_bytes().get(pos).copied()
    }

    /// Text from the first non-space character to the end of the line
    pub fn rest_from_nonspace(&self) -> &'a str {
        &self.line[self.next_nonspace..]
    }

    pub fn rest(&self) -> &'a str {
        &self.line[self.offset..]
    }

    pub fn find_next_nonspace(&mut self) {
        let bytes = self.line.as_bytes();
        let mut i = self.offset;
        let mut cols = self.column;

        while i < bytes.len() {
            match bytes[i] {
                b' ' => {
                    i += 1;
                    cols += 1;
                }
                b'\t' => {
                    i += 1;
                    cols += TAB_STOP - cols % TAB_STOP;
                }
                _ => break,
            }
        }

        self.blank = i >= bytes.len();
        self.next_nonspace = i;
        self.next_nonspace_column = cols;
        self.indent = cols - self.column;
    }

    /// Advance by `count` characters, or by `count` columns when `columns`
    /// is set (in which case a tab may be consumed only partly).
    pub fn advance_offset(&mut self, mut count: usize, columns: bool) {
        while count > 0 {
            let Some(ch) = self.line[self.offset..].chars().next() else {
                break;
            };
            if ch == '\t' {
                let chars_to_tab = TAB_STOP - self.column % TAB_STOP;
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let chars_to_advance = chars_to_tab.min(count);
                    self.column += chars_to_advance;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= chars_to_advance;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                self.offset += ch.len_utf8();
                self.column += 1;
                count -= 1;
            }
        }
    }

    pub fn advance_next_nonspace(&mut self) {
        self.offset = self.next_nonspace;
        self.column = self.next_nonspace_column;
        self.partially_consumed_tab = false;
    }

    pub fn advance_to_end(&mut self) {
        let remaining = self.line[self.offset..].chars().count();
        self.advance_offset(remaining, false);
    }

    pub fn mark(&self) -> Mark {
        Mark {
            offset: self.offset,
            column: self.column,
            partially_consumed_tab: self.partially_consumed_tab,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.offset = mark.offset;
        self.column = mark.column;
        self.partially_consumed_tab = mark.partially_consumed_tab;
    }

    /// The unconsumed part of the line, with the leftover columns of a
    /// partly consumed tab expanded to spaces.
    pub fn take_remainder(&mut self) -> String {
        let mut text = String::new();
        if self.partially_consumed_tab {
            self.offset += 1;
            self.partially_consumed_tab = false;
            let chars_to_tab = TAB_STOP - self.column % TAB_STOP;
            text.push_str(&" ".repeat(chars_to_tab));
        }
        text.push_str(&self.line[self.offset..]);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_lines_endings() {
        let lines = split_lines("a\nb\r\nc\rd");
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_trailing_newline_does_not_add_line() {
        assert_eq!(split_lines("a\n"), split_lines("a"));
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_nul_is_replaced() {
        assert_eq!(split_lines("a\0b"), vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn test_tab_indent_columns() {
        let cursor = LineCursor::new(" \tfoo");
        assert_eq!(cursor.indent, 4);
        assert_eq!(cursor.next_nonspace, 2);
        assert!(cursor.indented());
    }

    #[test]
    fn test_partial_tab_expands_to_spaces() {
        let mut cursor = LineCursor::new(">\t\tfoo");
        cursor.advance_offset(1, false);
        // The optional space after `>` eats one column of the tab
        cursor.advance_offset(1, true);
        assert!(cursor.partially_consumed_tab);
        assert_eq!(cursor.take_remainder(), "  \tfoo");
    }

    #[test]
    fn test_blank_line() {
        assert!(LineCursor::new(" \t ").blank);
        assert!(!LineCursor::new("  x").blank);
    }
}
