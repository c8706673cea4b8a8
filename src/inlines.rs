/// Inline parser: turns the text of a paragraph, heading or table cell
/// into a sequence of inline nodes.
use crate::ast::{AutolinkKind, Inline};
use crate::emphasis::{DelimiterStack, flanking};
use crate::entities::{is_escapable, parse_entity};
use crate::html::scan_raw_html;
use crate::inline_tree::{InlineTree, MAX_INLINE_NESTING};
use crate::links::{
    MAX_LABEL_CHARS, scan_link_destination, scan_link_label, scan_link_title, skip_spnl,
};
use crate::refs::LinkReferenceTable;
use std::collections::HashMap;

/// URI autolink schemes are 2 to 32 characters long
const MIN_SCHEME_LEN: usize = 2;
const MAX_SCHEME_LEN: usize = 32;
const MAX_DOMAIN_LABEL_LEN: usize = 63;

/// An unmatched `[` or `![` waiting for its `]`
#[derive(Debug)]
struct Bracket {
    node: usize,
    /// Byte position right after the opening bracket
    content_start: usize,
    image: bool,
    active: bool,
    /// Delimiters at this index and above were pushed after the bracket
    delim_bottom: usize,
    /// Another bracket was opened after this one
    bracket_after: bool,
    /// Tallest node added at the top level since the bracket opened
    inner_height: usize,
}

fn is_special(b: u8) -> bool {
    matches!(
        b,
        b'\n' | b'\\' | b'`' | b'*' | b'_' | b'~' | b'[' | b']' | b'!' | b'<' | b'&'
    )
}

/// Parse `text` into inline nodes, resolving references against `refs`.
pub fn parse_inlines(text: &str, refs: &LinkReferenceTable, strikethrough: bool) -> Vec<Inline> {
    let subject = text.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
    InlineParser::new(subject, refs, strikethrough).parse()
}

struct InlineParser<'a> {
    input: &'a str,
    pos: usize,
    refs: &'a LinkReferenceTable,
    strikethrough: bool,
    nodes: InlineTree,
    delimiters: DelimiterStack,
    brackets: Vec<Bracket>,
    /// Backtick run length -> position from which no closing run exists
    backtick_misses: HashMap<usize, usize>,
}

impl<'a> InlineParser<'a> {
    fn new(input: &'a str, refs: &'a LinkReferenceTable, strikethrough: bool) -> Self {
        InlineParser {
            input,
            pos: 0,
            refs,
            strikethrough,
            nodes: InlineTree::new(),
            delimiters: DelimiterStack::new(),
            brackets: Vec::new(),
            backtick_misses: HashMap::new(),
        }
    }

    fn parse(mut self) -> Vec<Inline> {
        while let Some(&c) = self.input.as_bytes().get(self.pos) {
            match c {
                b'\n' => self.parse_newline(),
                b'\\' => self.parse_backslash(),
                b'`' => self.parse_backticks(),
                b'*' | b'_' => self.parse_delimiter_run(c as char),
                b'~' if self.strikethrough => self.parse_delimiter_run('~'),
                b'[' => self.parse_open_bracket(),
                b'!' => self.parse_bang(),
                b']' => self.parse_close_bracket(),
                b'<' => self.parse_angle(),
                b'&' => self.parse_entity(),
                _ => self.parse_text(),
            }
        }

        self.delimiters.process_emphasis(&mut self.nodes, 0);
        self.nodes.into_inlines()
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek_at(&self, pos: usize) -> Option<u8> {
        self.bytes().get(pos).copied()
    }

    fn push_text(&mut self, text: &str) -> usize {
        self.nodes.push(Inline::Text(text.to_string()))
    }

    fn skip_line_start_spaces(&mut self) {
        while matches!(self.peek_at(self.pos), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn parse_text(&mut self) {
        let start = self.pos;
        let first_len = self.input[start..].chars().next().map_or(1, char::len_utf8);
        let mut end = start + first_len;
        while end < self.input.len() && !is_special(self.bytes()[end]) {
            end += 1;
        }
        self.nodes.push(Inline::Text(self.input[start..end].to_string()));
        self.pos = end;
    }

    /// A line ending: hard break after two or more spaces, soft otherwise
    fn parse_newline(&mut self) {
        self.pos += 1;
        let mut hard = false;
        if let Some(text) = self.nodes.last().and_then(|last| self.nodes.text_mut(last)) {
            let trimmed = text.trim_end_matches(' ').len();
            hard = text.len() - trimmed >= 2;
            text.truncate(trimmed);
        }
        self.nodes.push(if hard {
            Inline::HardBreak
        } else {
            Inline::SoftBreak
        });
        self.skip_line_start_spaces();
    }

    fn parse_backslash(&mut self) {
        self.pos += 1;
        match self.peek_at(self.pos) {
            Some(b'\n') => {
                self.pos += 1;
                self.nodes.push(Inline::HardBreak);
                self.skip_line_start_spaces();
            }
            Some(c) if is_escapable(c as char) => {
                self.pos += 1;
                self.nodes.push(Inline::Text((c as char).to_string()));
            }
            _ => {
                self.push_text("\\");
            }
        }
    }

    fn parse_backticks(&mut self) {
        let start = self.pos;
        let run = self.bytes()[start..].iter().take_while(|&&b| b == b'`').count();
        let content_start = start + run;

        match self.find_closing_backticks(content_start, run) {
            Some(close) => {
                let mut content = self.input[content_start..close].replace('\n', " ");
                if content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && content.bytes().any(|b| b != b' ')
                {
                    content = content[1..content.len() - 1].to_string();
                }
                self.nodes.push(Inline::CodeSpan(content));
                self.pos = close + run;
            }
            None => {
                self.nodes.push(Inline::Text(self.input[start..content_start].to_string()));
                self.pos = content_start;
            }
        }
    }

    /// Start of the next backtick run of exactly `run` characters
    fn find_closing_backticks(&mut self, from: usize, run: usize) -> Option<usize> {
        if self.backtick_misses.get(&run).is_some_and(|&miss| miss <= from) {
            return None;
        }
        let bytes = self.bytes();
        let mut i = from;
        while i < bytes.len() {
            if bytes[i] == b'`' {
                let len = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                if len == run {
                    return Some(i);
                }
                i += len;
            } else {
                i += 1;
            }
        }
        self.backtick_misses.insert(run, from);
        None
    }

    fn parse_delimiter_run(&mut self, ch: char) {
        let start = self.pos;
        let count = self.bytes()[start..]
            .iter()
            .take_while(|&&b| b == ch as u8)
            .count();
        let end = start + count;
        let before = self.input[..start].chars().next_back();
        let after = self.input[end..].chars().next();
        let (can_open, can_close) = flanking(ch, before, after);

        let node = self.nodes.push(Inline::Text(self.input[start..end].to_string()));
        self.pos = end;

        // Strikethrough takes runs of one or two tildes only
        if ch == '~' && count > 2 {
            return;
        }
        if can_open || can_close {
            self.delimiters.push(node, ch, count, can_open, can_close);
        }
    }

    fn push_bracket(&mut self, node: usize, image: bool) {
        if let Some(previous) = self.brackets.last_mut() {
            previous.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            content_start: self.pos,
            image,
            active: true,
            delim_bottom: self.delimiters.len(),
            bracket_after: false,
            inner_height: 0,
        });
    }

    /// Drop the innermost bracket, handing what it saw to the one below
    fn pop_bracket(&mut self) -> Option<Bracket> {
        let bracket = self.brackets.pop()?;
        self.note_height(bracket.inner_height);
        Some(bracket)
    }

    fn note_height(&mut self, height: usize) {
        if let Some(top) = self.brackets.last_mut() {
            top.inner_height = top.inner_height.max(height);
        }
    }

    fn parse_open_bracket(&mut self) {
        self.pos += 1;
        let node = self.push_text("[");
        self.push_bracket(node, false);
    }

    fn parse_bang(&mut self) {
        if self.peek_at(self.pos + 1) == Some(b'[') {
            self.pos += 2;
            let node = self.push_text("![");
            self.push_bracket(node, true);
        } else {
            self.pos += 1;
            self.push_text("!");
        }
    }

    fn parse_close_bracket(&mut self) {
        let close_pos = self.pos;
        self.pos += 1;

        let Some(opener) = self.brackets.last() else {
            self.push_text("]");
            return;
        };
        // Inactive, or too deep to hold another link or image
        if !opener.active || opener.inner_height >= MAX_INLINE_NESTING {
            self.pop_bracket();
            self.push_text("]");
            return;
        }

        let after_close = self.pos;
        let target = self.try_parse_inline_link(after_close).or_else(|| {
            self.try_parse_reference_link(
                after_close,
                &self.input[opener.content_start..close_pos],
                opener.bracket_after,
            )
        });

        let Some((destination, title, end)) = target else {
            self.pop_bracket();
            self.push_text("]");
            return;
        };
        self.pos = end;

        let Some(opener) = self.brackets.pop() else {
            return;
        };
        let emphasis_height = self
            .delimiters
            .process_emphasis(&mut self.nodes, opener.delim_bottom);
        let height = 1 + opener.inner_height.max(emphasis_height);
        let children = Vec::new();
        let value = if opener.image {
            Inline::Image {
                destination,
                title,
                children,
            }
        } else {
            // Links may not contain other links. Brackets below an inactive
            // one were already switched off by an earlier link.
            for earlier in self.brackets.iter_mut().rev().filter(|b| !b.image) {
                if !earlier.active {
                    break;
                }
                earlier.active = false;
            }
            Inline::Link {
                destination,
                title,
                children,
            }
        };
        self.nodes.adopt_rest(opener.node, value, height);
        self.note_height(height);
    }

    /// `(destination "title")` right after the closing bracket
    fn try_parse_inline_link(&self, pos: usize) -> Option<(String, Option<String>, usize)> {
        if self.peek_at(pos) != Some(b'(') {
            return None;
        }
        let dest_start = skip_spnl(self.input, pos + 1);
        let (destination, dest_end) = scan_link_destination(self.input, dest_start)?;

        let mut i = skip_spnl(self.input, dest_end);
        let mut title = None;
        if i > dest_end
            && let Some((parsed, title_end)) = scan_link_title(self.input, i)
        {
            title = Some(parsed);
            i = skip_spnl(self.input, title_end);
        }

        (self.peek_at(i) == Some(b')'))
            .then(|| (destination, title.filter(|t| !t.is_empty()), i + 1))
    }

    /// Full, collapsed or shortcut reference after the closing bracket
    fn try_parse_reference_link(
        &self,
        pos: usize,
        bracket_text: &str,
        bracket_after: bool,
    ) -> Option<(String, Option<String>, usize)> {
        let (label, end) = match scan_link_label(self.input, pos) {
            Some(label_end) if label_end - pos > 2 => (&self.input[pos + 1..label_end - 1], label_end),
            // `[]` or nothing: the bracket text is the label, unless it
            // contains a bracket itself
            Some(label_end) if !bracket_after => (bracket_text, label_end),
            None if !bracket_after => (bracket_text, pos),
            _ => return None,
        };
        if label.chars().nth(MAX_LABEL_CHARS).is_some() {
            return None;
        }

        let reference = self.refs.get(label)?;
        Some((reference.destination.clone(), reference.title.clone(), end))
    }

    fn parse_angle(&mut self) {
        let rest = &self.input[self.pos..];
        if let Some((node, len)) = try_parse_autolink(rest) {
            self.nodes.push(node);
            self.pos += len;
        } else if let Some(len) = scan_raw_html(rest.as_bytes()) {
            self.nodes.push(Inline::RawHtml(rest[..len].to_string()));
            self.pos += len;
        } else {
            self.pos += 1;
            self.push_text("<");
        }
    }

    fn parse_entity(&mut self) {
        let rest = &self.input[self.pos..];
        match parse_entity(rest) {
            Some((decoded, len)) => {
                self.nodes.push(Inline::Entity {
                    raw: rest[..len].to_string(),
                    decoded,
                });
                self.pos += len;
            }
            None => {
                self.pos += 1;
                self.push_text("&");
            }
        }
    }
}

/// `<scheme:...>` or `<user@host>` at the start of `s`
fn try_parse_autolink(s: &str) -> Option<(Inline, usize)> {
    let close = scan_uri_autolink(s)
        .map(|end| (AutolinkKind::Uri, end))
        .or_else(|| scan_email_autolink(s).map(|end| (AutolinkKind::Email, end)))?;
    let (kind, end) = close;
    Some((
        Inline::Autolink {
            kind,
            target: s[1..end].to_string(),
        },
        end + 1,
    ))
}

/// Index of the closing `>` of a URI autolink
fn scan_uri_autolink(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') || !bytes.get(1)?.is_ascii_alphabetic() {
        return None;
    }
    let scheme_len = 1 + bytes[2..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
        .count();
    if !(MIN_SCHEME_LEN..=MAX_SCHEME_LEN).contains(&scheme_len) {
        return None;
    }
    let colon = 1 + scheme_len;
    if bytes.get(colon) != Some(&b':') {
        return None;
    }
    let mut i = colon + 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'>' => return Some(i),
            b'<' => return None,
            b if b <= b' ' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Index of the closing `>` of an email autolink
fn scan_email_autolink(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let local_len = bytes[1..]
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b))
        .count();
    let at = 1 + local_len;
    if local_len == 0 || bytes.get(at) != Some(&b'@') {
        return None;
    }

    let mut i = at + 1;
    loop {
        let label_len = bytes[i..]
            .iter()
            .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'-')
            .count();
        let label = &bytes[i..i + label_len];
        let well_formed = label_len > 0
            && label_len <= MAX_DOMAIN_LABEL_LEN
            && label[0].is_ascii_alphanumeric()
            && label[label_len - 1].is_ascii_alphanumeric();
        if !well_formed {
            return None;
        }
        i += label_len;
        match bytes.get(i) {
            Some(b'>') => return Some(i),
            Some(b'.') => i += 1,
            _ => return None,
        }
    }
}
