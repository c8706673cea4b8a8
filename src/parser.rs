/// Block structure builder.
///
/// Lines are fed one at a time against the chain of open blocks. Blocks
/// live in an arena and point at their parent by index; once the last line
/// is in, the arena is turned into the owned `Block` tree and the inline
/// parser runs over every paragraph, heading and table cell.
use crate::ast::{Alignment, Block, Inline, ListKind, TableRow};
use crate::entities::unescape_string;
use crate::html::{html_block_end, html_block_start};
use crate::inlines::parse_inlines;
use crate::lines::{CODE_INDENT, LineCursor, is_space_or_tab, split_lines};
use crate::links::parse_reference;
use crate::list_item::{ListMarker, parse_list_marker};
use crate::options::Options;
use crate::refs::LinkReferenceTable;
use crate::table::{fit_row, parse_delimiter_row, split_row};

/// Arena index of the document node
const DOCUMENT: usize = 0;

#[derive(Debug, Clone)]
enum BlockKind {
    Document,
    BlockQuote,
    List {
        kind: ListKind,
        tight: bool,
    },
    Item(ListMarker),
    Paragraph,
    Heading {
        level: u8,
        setext: bool,
    },
    IndentedCode,
    FencedCode {
        fence_char: char,
        fence_length: usize,
        fence_offset: usize,
        info: String,
    },
    HtmlBlock(u8),
    ThematicBreak,
    Table {
        alignments: Vec<Alignment>,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl BlockKind {
    fn can_contain(&self, child: &BlockKind) -> bool {
        match self {
            BlockKind::Document | BlockKind::BlockQuote | BlockKind::Item(_) => {
                !matches!(child, BlockKind::Item(_))
            }
            BlockKind::List { .. } => matches!(child, BlockKind::Item(_)),
            _ => false,
        }
    }

    fn accepts_lines(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph
                | BlockKind::IndentedCode
                | BlockKind::FencedCode { .. }
                | BlockKind::HtmlBlock(_)
                | BlockKind::Table { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            BlockKind::Document => "document",
            BlockKind::BlockQuote => "block quote",
            BlockKind::List { .. } => "list",
            BlockKind::Item(_) => "list item",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading { .. } => "heading",
            BlockKind::IndentedCode => "indented code",
            BlockKind::FencedCode { .. } => "fenced code",
            BlockKind::HtmlBlock(_) => "html block",
            BlockKind::ThematicBreak => "thematic break",
            BlockKind::Table { .. } => "table",
        }
    }
}

#[derive(Debug)]
struct BlockData {
    kind: BlockKind,
    parent: Option<usize>,
    children: Vec<usize>,
    open: bool,
    /// Accumulated lines, each terminated by `\n`
    content: String,
    last_line_blank: bool,
    start_line: usize,
}

/// Outcome of matching a line against an open block
enum Continuation {
    Matched,
    NotMatched,
    /// The line closed a fenced code block and is fully consumed
    LineDone,
}

enum BlockStart {
    NoMatch,
    Container,
    Leaf,
}

#[derive(Debug, Clone, Copy)]
enum StartKind {
    BlockQuote,
    AtxHeading,
    FencedCode,
    HtmlBlock,
    SetextHeading,
    ThematicBreak,
    ListItem,
    IndentedCode,
    Table,
}

/// Block starts, tried in this order on every line
const BLOCK_STARTS: [StartKind; 9] = [
    StartKind::BlockQuote,
    StartKind::AtxHeading,
    StartKind::FencedCode,
    StartKind::HtmlBlock,
    StartKind::SetextHeading,
    StartKind::ThematicBreak,
    StartKind::ListItem,
    StartKind::IndentedCode,
    StartKind::Table,
];

/// First characters that can begin a non-indented block start
fn maybe_special(byte: Option<u8>) -> bool {
    matches!(
        byte,
        Some(
            b'#' | b'`'
                | b'~'
                | b'*'
                | b'+'
                | b'_'
                | b'='
                | b'<'
                | b'>'
                | b'-'
                | b'|'
                | b':'
                | b'0'..=b'9'
        )
    )
}

/// Remove an optional closing `#` sequence from ATX heading text
fn strip_closing_sequence(text: &str) -> &str {
    let trimmed = text.trim_end_matches([' ', '\t']);
    let without_hashes = trimmed.trim_end_matches('#');
    if without_hashes.len() == trimmed.len() {
        return text;
    }
    if without_hashes.trim_matches([' ', '\t']).is_empty() {
        ""
    } else if without_hashes.ends_with([' ', '\t']) {
        without_hashes
    } else {
        text
    }
}

fn is_closing_fence(rest: &str, fence_char: char, fence_length: usize) -> bool {
    let run = rest.chars().take_while(|&c| c == fence_char).count();
    run >= fence_length && rest[run..].bytes().all(|b| b == b' ' || b == b'\t')
}

fn is_blank_text(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n'))
}

/// Drop trailing lines that hold only spaces or tabs
fn strip_trailing_blank_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.split_terminator('\n').collect();
    while lines
        .last()
        .is_some_and(|line| line.bytes().all(|b| b == b' ' || b == b'\t'))
    {
        lines.pop();
    }
    lines
}

/// Entry point of the parsing phase
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: Options,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Parser { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Parse a whole document. Never fails: any text is some document.
    pub fn parse(&self, input: &str) -> Block {
        let lines = split_lines(input);
        log::debug!("parsing {} lines", lines.len());

        let mut builder = BlockBuilder::new(&self.options);
        for line in &lines {
            builder.incorporate_line(line);
        }
        builder.finish()
    }
}

struct BlockBuilder<'o> {
    options: &'o Options,
    arena: Vec<BlockData>,
    tip: usize,
    old_tip: usize,
    last_matched_container: usize,
    all_closed: bool,
    line_number: usize,
    refs: LinkReferenceTable,
}

impl<'o> BlockBuilder<'o> {
    fn new(options: &'o Options) -> Self {
        BlockBuilder {
            options,
            arena: vec![BlockData {
                kind: BlockKind::Document,
                parent: None,
                children: Vec::new(),
                open: true,
                content: String::new(),
                last_line_blank: false,
                start_line: 1,
            }],
            tip: DOCUMENT,
            old_tip: DOCUMENT,
            last_matched_container: DOCUMENT,
            all_closed: true,
            line_number: 0,
            refs: LinkReferenceTable::new(),
        }
    }

    fn kind(&self, idx: usize) -> &BlockKind {
        &self.arena[idx].kind
    }

    fn parent_of(&self, idx: usize) -> usize {
        self.arena[idx].parent.unwrap_or(DOCUMENT)
    }

    fn incorporate_line(&mut self, line: &str) {
        let mut cursor = LineCursor::new(line);
        self.line_number += 1;
        self.old_tip = self.tip;

        // Walk down the open blocks as far as the line continues them
        let mut container = DOCUMENT;
        while let Some(&last) = self.arena[container].children.last() {
            if !self.arena[last].open {
                break;
            }
            container = last;
            cursor.find_next_nonspace();
            match self.continue_block(container, &mut cursor) {
                Continuation::Matched => {}
                Continuation::NotMatched => {
                    container = self.parent_of(container);
                    break;
                }
                Continuation::LineDone => return,
            }
        }

        self.all_closed = container == self.old_tip;
        self.last_matched_container = container;

        let kind = self.kind(container);
        let mut matched_leaf = kind.accepts_lines()
            && !matches!(kind, BlockKind::Paragraph | BlockKind::Table { .. });

        while !matched_leaf {
            cursor.find_next_nonspace();
            if !cursor.indented() && !maybe_special(cursor.byte_at(cursor.next_nonspace)) {
                cursor.advance_next_nonspace();
                break;
            }

            let mut started = false;
            for start in BLOCK_STARTS {
                match self.try_start(start, container, &mut cursor) {
                    BlockStart::NoMatch => continue,
                    BlockStart::Container => {}
                    BlockStart::Leaf => matched_leaf = true,
                }
                container = self.tip;
                started = true;
                break;
            }
            if !started {
                cursor.advance_next_nonspace();
                break;
            }
        }

        // Lazy continuation of a paragraph whose containers did not match
        if !self.all_closed && !cursor.blank && matches!(self.kind(self.tip), BlockKind::Paragraph)
        {
            self.add_line(&mut cursor);
            return;
        }

        self.close_unmatched_blocks();
        if cursor.blank
            && let Some(&last) = self.arena[container].children.last()
        {
            self.arena[last].last_line_blank = true;
        }

        // Blank lines in block quotes, fenced code, or right after an empty
        // item's marker do not make a list loose
        let last_line_blank = cursor.blank
            && !match self.kind(container) {
                BlockKind::BlockQuote | BlockKind::FencedCode { .. } => true,
                BlockKind::Item(_) => {
                    self.arena[container].children.is_empty()
                        && self.arena[container].start_line == self.line_number
                }
                _ => false,
            };
        let mut ancestor = Some(container);
        while let Some(idx) = ancestor {
            self.arena[idx].last_line_blank = last_line_blank;
            ancestor = self.arena[idx].parent;
        }

        if self.kind(container).accepts_lines() {
            self.add_line(&mut cursor);
            if let BlockKind::HtmlBlock(block_type) = *self.kind(container)
                && html_block_end(block_type, cursor.rest())
            {
                self.finalize(container);
            }
        } else if cursor.offset < cursor.len() && !cursor.blank {
            self.add_child(BlockKind::Paragraph);
            cursor.advance_next_nonspace();
            self.add_line(&mut cursor);
        }
    }

    fn continue_block(&mut self, container: usize, cursor: &mut LineCursor<'_>) -> Continuation {
        match self.kind(container) {
            BlockKind::Document | BlockKind::List { .. } => Continuation::Matched,
            BlockKind::BlockQuote => {
                if !cursor.indented() && cursor.byte_at(cursor.next_nonspace) == Some(b'>') {
                    cursor.advance_next_nonspace();
                    cursor.advance_offset(1, false);
                    if is_space_or_tab(cursor.byte_at(cursor.offset)) {
                        cursor.advance_offset(1, true);
                    }
                    Continuation::Matched
                } else {
                    Continuation::NotMatched
                }
            }
            BlockKind::Item(marker) => {
                let content_indent = marker.content_indent();
                if cursor.blank {
                    // An item can begin with at most one blank line
                    if self.arena[container].children.is_empty() {
                        return Continuation::NotMatched;
                    }
                    cursor.advance_next_nonspace();
                    Continuation::Matched
                } else if cursor.indent >= content_indent {
                    cursor.advance_offset(content_indent, true);
                    Continuation::Matched
                } else {
                    Continuation::NotMatched
                }
            }
            BlockKind::Heading { .. } | BlockKind::ThematicBreak => Continuation::NotMatched,
            BlockKind::IndentedCode => {
                if cursor.indent >= CODE_INDENT {
                    cursor.advance_offset(CODE_INDENT, true);
                    Continuation::Matched
                } else if cursor.blank {
                    cursor.advance_next_nonspace();
                    Continuation::Matched
                } else {
                    Continuation::NotMatched
                }
            }
            BlockKind::FencedCode {
                fence_char,
                fence_length,
                fence_offset,
                ..
            } => {
                let (fence_char, fence_length, fence_offset) =
                    (*fence_char, *fence_length, *fence_offset);
                if cursor.indent < CODE_INDENT
                    && is_closing_fence(cursor.rest_from_nonspace(), fence_char, fence_length)
                {
                    self.finalize(container);
                    return Continuation::LineDone;
                }
                // Strip up to the opening fence's indentation
                let mut remaining = fence_offset;
                while remaining > 0 && is_space_or_tab(cursor.byte_at(cursor.offset)) {
                    cursor.advance_offset(1, true);
                    remaining -= 1;
                }
                Continuation::Matched
            }
            BlockKind::HtmlBlock(block_type) => {
                if cursor.blank && matches!(*block_type, 6 | 7) {
                    Continuation::NotMatched
                } else {
                    Continuation::Matched
                }
            }
            BlockKind::Paragraph | BlockKind::Table { .. } => {
                if cursor.blank {
                    Continuation::NotMatched
                } else {
                    Continuation::Matched
                }
            }
        }
    }

    fn try_start(
        &mut self,
        start: StartKind,
        container: usize,
        cursor: &mut LineCursor<'_>,
    ) -> BlockStart {
        match start {
            StartKind::BlockQuote => self.try_start_block_quote(container, cursor),
            StartKind::AtxHeading => self.try_start_atx_heading(cursor),
            StartKind::FencedCode => self.try_start_fenced_code(cursor),
            StartKind::HtmlBlock => self.try_start_html_block(container, cursor),
            StartKind::SetextHeading => self.try_start_setext_heading(container, cursor),
            StartKind::ThematicBreak => self.try_start_thematic_break(cursor),
            StartKind::ListItem => self.try_start_list_item(container, cursor),
            StartKind::IndentedCode => self.try_start_indented_code(cursor),
            StartKind::Table => self.try_start_table(container, cursor),
        }
    }

    fn try_start_block_quote(&mut self, container: usize, cursor: &mut LineCursor<'_>) -> BlockStart {
        if cursor.indented() || cursor.byte_at(cursor.next_nonspace) != Some(b'>') {
            return BlockStart::NoMatch;
        }
        if self.nesting_depth(container) + 1 > self.options.max_nesting {
            log::debug!(
                "line {}: nesting limit {} reached, block quote marker kept as text",
                self.line_number,
                self.options.max_nesting
            );
            return BlockStart::NoMatch;
        }

        cursor.advance_next_nonspace();
        cursor.advance_offset(1, false);
        if is_space_or_tab(cursor.byte_at(cursor.offset)) {
            cursor.advance_offset(1, true);
        }
        self.close_unmatched_blocks();
        self.add_child(BlockKind::BlockQuote);
        BlockStart::Container
    }

    fn try_start_atx_heading(&mut self, cursor: &mut LineCursor<'_>) -> BlockStart {
        if cursor.indented() {
            return BlockStart::NoMatch;
        }
        let rest = cursor.rest_from_nonspace().as_bytes();
        let hashes = rest.iter().take_while(|&&b| b == b'#').count();
        if hashes == 0 || hashes > 6 {
            return BlockStart::NoMatch;
        }
        if hashes < rest.len() && !is_space_or_tab(rest.get(hashes).copied()) {
            return BlockStart::NoMatch;
        }

        cursor.advance_next_nonspace();
        cursor.advance_offset(hashes, false);
        self.close_unmatched_blocks();
        let heading = self.add_child(BlockKind::Heading {
            level: hashes as u8,
            setext: false,
        });
        self.arena[heading].content = strip_closing_sequence(cursor.rest()).to_string();
        cursor.advance_to_end();
        BlockStart::Leaf
    }

    fn try_start_fenced_code(&mut self, cursor: &mut LineCursor<'_>) -> BlockStart {
        if cursor.indented() {
            return BlockStart::NoMatch;
        }
        let rest = cursor.rest_from_nonspace();
        let fence_char = match rest.as_bytes().first() {
            Some(&c @ (b'`' | b'~')) => c as char,
            _ => return BlockStart::NoMatch,
        };
        let fence_length = rest.chars().take_while(|&c| c == fence_char).count();
        if fence_length < 3 {
            return BlockStart::NoMatch;
        }
        // Backtick fences cannot have backticks in their info string
        if fence_char == '`' && rest[fence_length..].contains('`') {
            return BlockStart::NoMatch;
        }

        let fence_offset = cursor.indent;
        cursor.advance_next_nonspace();
        cursor.advance_offset(fence_length, false);
        self.close_unmatched_blocks();
        self.add_child(BlockKind::FencedCode {
            fence_char,
            fence_length,
            fence_offset,
            info: String::new(),
        });
        BlockStart::Leaf
    }

    fn try_start_html_block(&mut self, container: usize, cursor: &mut LineCursor<'_>) -> BlockStart {
        if cursor.indented() || cursor.byte_at(cursor.next_nonspace) != Some(b'<') {
            return BlockStart::NoMatch;
        }
        let interrupting_paragraph = matches!(self.kind(container), BlockKind::Paragraph)
            || (!self.all_closed
                && !cursor.blank
                && matches!(self.kind(self.tip), BlockKind::Paragraph));
        let Some(block_type) = html_block_start(cursor.rest_from_nonspace(), interrupting_paragraph)
        else {
            return BlockStart::NoMatch;
        };

        // Leading spaces stay part of the HTML block
        self.close_unmatched_blocks();
        self.add_child(BlockKind::HtmlBlock(block_type));
        BlockStart::Leaf
    }

    fn try_start_setext_heading(
        &mut self,
        container: usize,
        cursor: &mut LineCursor<'_>,
    ) -> BlockStart {
        if cursor.indented() || !matches!(self.kind(container), BlockKind::Paragraph) {
            return BlockStart::NoMatch;
        }
        let rest = cursor.rest_from_nonspace();
        let level = match rest.as_bytes().first() {
            Some(b'=') => 1,
            Some(b'-') => 2,
            _ => return BlockStart::NoMatch,
        };
        let marker = rest.as_bytes()[0];
        let run = rest.bytes().take_while(|&b| b == marker).count();
        if !rest[run..].bytes().all(|b| b == b' ' || b == b'\t') {
            return BlockStart::NoMatch;
        }

        self.close_unmatched_blocks();
        // Reference definitions never become heading text
        self.extract_references(container);
        if self.arena[container].content.is_empty() {
            return BlockStart::NoMatch;
        }
        self.arena[container].kind = BlockKind::Heading {
            level,
            setext: true,
        };
        cursor.advance_to_end();
        BlockStart::Leaf
    }

    fn try_start_thematic_break(&mut self, cursor: &mut LineCursor<'_>) -> BlockStart {
        if cursor.indented() {
            return BlockStart::NoMatch;
        }
        let rest = cursor.rest_from_nonspace();
        let marker = match rest.as_bytes().first() {
            Some(&c @ (b'*' | b'_' | b'-')) => c,
            _ => return BlockStart::NoMatch,
        };
        let mut count = 0;
        for b in rest.bytes() {
            if b == marker {
                count += 1;
            } else if b != b' ' && b != b'\t' {
                return BlockStart::NoMatch;
            }
        }
        if count < 3 {
            return BlockStart::NoMatch;
        }

        self.close_unmatched_blocks();
        self.add_child(BlockKind::ThematicBreak);
        cursor.advance_to_end();
        BlockStart::Leaf
    }

    fn try_start_list_item(&mut self, container: usize, cursor: &mut LineCursor<'_>) -> BlockStart {
        let mark = cursor.mark();
        let interrupts_paragraph = matches!(self.kind(container), BlockKind::Paragraph);
        let Some(marker) = parse_list_marker(cursor, interrupts_paragraph) else {
            return BlockStart::NoMatch;
        };

        let joins_list = matches!(
            self.kind(container),
            BlockKind::List { kind, .. } if kind.same_type(&marker.kind)
        );
        let depth = self.nesting_depth(container) + usize::from(!joins_list);
        if depth > self.options.max_nesting {
            log::debug!(
                "line {}: nesting limit {} reached, list marker kept as text",
                self.line_number,
                self.options.max_nesting
            );
            cursor.reset(mark);
            return BlockStart::NoMatch;
        }

        self.close_unmatched_blocks();
        let tip_matches = matches!(
            self.kind(self.tip),
            BlockKind::List { kind, .. } if kind.same_type(&marker.kind)
        );
        if !tip_matches {
            self.add_child(BlockKind::List {
                kind: marker.kind,
                tight: true,
            });
        }
        self.add_child(BlockKind::Item(marker));
        BlockStart::Container
    }

    fn try_start_indented_code(&mut self, cursor: &mut LineCursor<'_>) -> BlockStart {
        if !cursor.indented()
            || cursor.blank
            || matches!(self.kind(self.tip), BlockKind::Paragraph)
        {
            return BlockStart::NoMatch;
        }
        cursor.advance_offset(CODE_INDENT, true);
        self.close_unmatched_blocks();
        self.add_child(BlockKind::IndentedCode);
        BlockStart::Leaf
    }

    /// A delimiter row under a paragraph turns the paragraph's last line
    /// into a table header.
    fn try_start_table(&mut self, container: usize, cursor: &mut LineCursor<'_>) -> BlockStart {
        if !self.options.tables
            || cursor.indented()
            || !matches!(self.kind(container), BlockKind::Paragraph)
        {
            return BlockStart::NoMatch;
        }
        let delimiter_row = cursor.rest_from_nonspace();
        let Some(alignments) = parse_delimiter_row(delimiter_row) else {
            return BlockStart::NoMatch;
        };

        let content = &self.arena[container].content;
        let body = content.strip_suffix('\n').unwrap_or(content);
        let (before, header_line) = match body.rfind('\n') {
            Some(i) => (&body[..=i], &body[i + 1..]),
            None => ("", body),
        };
        let header = split_row(header_line);
        if header.len() != alignments.len()
            || !(delimiter_row.contains('|') || header_line.contains('|'))
        {
            return BlockStart::NoMatch;
        }
        let before = before.to_string();

        self.close_unmatched_blocks();
        self.arena[container].content = before;
        self.finalize(container);
        log::trace!(
            "line {}: table with {} columns",
            self.line_number,
            alignments.len()
        );
        self.add_child(BlockKind::Table {
            alignments,
            header,
            rows: Vec::new(),
        });
        cursor.advance_to_end();
        BlockStart::Leaf
    }

    /// Block quotes and lists enclosing `idx`, itself included
    fn nesting_depth(&self, idx: usize) -> usize {
        let mut depth = 0;
        let mut current = Some(idx);
        while let Some(i) = current {
            if matches!(
                self.arena[i].kind,
                BlockKind::BlockQuote | BlockKind::List { .. }
            ) {
                depth += 1;
            }
            current = self.arena[i].parent;
        }
        depth
    }

    fn add_line(&mut self, cursor: &mut LineCursor<'_>) {
        let text = cursor.take_remainder();
        let content = &mut self.arena[self.tip].content;
        content.push_str(&text);
        content.push('\n');
    }

    /// Append a new block under the tip, closing blocks that cannot hold it
    fn add_child(&mut self, kind: BlockKind) -> usize {
        while !self.kind(self.tip).can_contain(&kind) && self.tip != DOCUMENT {
            self.finalize(self.tip);
        }

        log::trace!("line {}: open {}", self.line_number, kind.name());
        let idx = self.arena.len();
        self.arena.push(BlockData {
            kind,
            parent: Some(self.tip),
            children: Vec::new(),
            open: true,
            content: String::new(),
            last_line_blank: false,
            start_line: self.line_number,
        });
        self.arena[self.tip].children.push(idx);
        self.tip = idx;
        idx
    }

    fn close_unmatched_blocks(&mut self) {
        if self.all_closed {
            return;
        }
        while self.old_tip != self.last_matched_container {
            let parent = self.parent_of(self.old_tip);
            self.finalize(self.old_tip);
            self.old_tip = parent;
        }
        self.all_closed = true;
    }

    /// Pull link reference definitions off the front of a paragraph
    fn extract_references(&mut self, idx: usize) {
        let content = &mut self.arena[idx].content;
        while content.starts_with('[') {
            let Some((label, reference, consumed)) = parse_reference(content) else {
                break;
            };
            self.refs.insert(&label, reference);
            content.drain(..consumed);
        }
    }

    fn finalize(&mut self, idx: usize) {
        self.arena[idx].open = false;
        log::trace!(
            "line {}: close {}",
            self.line_number,
            self.arena[idx].kind.name()
        );

        match self.arena[idx].kind {
            BlockKind::Paragraph => {
                self.extract_references(idx);
                if is_blank_text(&self.arena[idx].content) {
                    let parent = self.parent_of(idx);
                    self.arena[parent].children.retain(|&child| child != idx);
                }
            }
            BlockKind::IndentedCode => {
                let data = &mut self.arena[idx];
                let mut literal = strip_trailing_blank_lines(&data.content).join("\n");
                literal.push('\n');
                data.content = literal;
            }
            BlockKind::HtmlBlock(_) => {
                let data = &mut self.arena[idx];
                data.content = strip_trailing_blank_lines(&data.content).join("\n");
            }
            BlockKind::FencedCode { .. } => {
                let data = &mut self.arena[idx];
                let content = std::mem::take(&mut data.content);
                let (first_line, literal) = content.split_once('\n').unwrap_or((content.as_str(), ""));
                if let BlockKind::FencedCode { info, .. } = &mut data.kind {
                    *info = unescape_string(first_line.trim());
                }
                data.content = literal.to_string();
            }
            BlockKind::List { .. } => {
                let loose = self.list_is_loose(idx);
                if let BlockKind::List { tight, .. } = &mut self.arena[idx].kind {
                    *tight = !loose;
                }
            }
            BlockKind::Table { .. } => {
                let data = &mut self.arena[idx];
                let content = std::mem::take(&mut data.content);
                if let BlockKind::Table {
                    alignments, rows, ..
                } = &mut data.kind
                {
                    *rows = content
                        .lines()
                        .filter(|line| !is_blank_text(line))
                        .map(|line| fit_row(split_row(line), alignments.len()))
                        .collect();
                }
            }
            _ => {}
        }

        self.tip = self.parent_of(idx);
    }

    fn ends_with_blank_line(&self, mut idx: usize) -> bool {
        loop {
            let data = &self.arena[idx];
            if data.last_line_blank {
                return true;
            }
            match (&data.kind, data.children.last()) {
                (BlockKind::List { .. } | BlockKind::Item(_), Some(&last)) => idx = last,
                _ => return false,
            }
        }
    }

    /// A list is loose if a blank line separates two items, or two blocks
    /// directly inside one item.
    fn list_is_loose(&self, list: usize) -> bool {
        let items = &self.arena[list].children;
        for (i, &item) in items.iter().enumerate() {
            let has_next_item = i + 1 < items.len();
            if has_next_item && self.ends_with_blank_line(item) {
                return true;
            }
            let blocks = &self.arena[item].children;
            for (j, &block) in blocks.iter().enumerate() {
                if (has_next_item || j + 1 < blocks.len()) && self.ends_with_blank_line(block) {
                    return true;
                }
            }
        }
        false
    }

    fn finish(mut self) -> Block {
        while self.tip != DOCUMENT {
            self.finalize(self.tip);
        }
        self.finalize(DOCUMENT);
        log::debug!(
            "block structure done: {} blocks, {} link reference definitions",
            self.arena.len(),
            self.refs.len()
        );
        self.build(DOCUMENT)
    }

    fn inlines(&self, text: &str) -> Vec<Inline> {
        parse_inlines(text, &self.refs, self.options.strikethrough)
    }

    fn table_row(&self, cells: &[String]) -> TableRow {
        TableRow {
            cells: cells.iter().map(|cell| self.inlines(cell)).collect(),
        }
    }

    fn build_children(&self, idx: usize) -> Vec<Block> {
        self.arena[idx]
            .children
            .iter()
            .map(|&child| self.build(child))
            .collect()
    }

    fn build(&self, idx: usize) -> Block {
        let data = &self.arena[idx];
        match &data.kind {
            BlockKind::Document => Block::Document(self.build_children(idx)),
            BlockKind::BlockQuote => Block::BlockQuote(self.build_children(idx)),
            BlockKind::List { kind, tight } => Block::List {
                kind: *kind,
                tight: *tight,
                children: self.build_children(idx),
            },
            BlockKind::Item(_) => Block::ListItem(self.build_children(idx)),
            BlockKind::Paragraph => Block::Paragraph(self.inlines(&data.content)),
            BlockKind::Heading {
                level,
                setext: false,
            } => Block::AtxHeading {
                level: *level,
                children: self.inlines(&data.content),
            },
            BlockKind::Heading {
                level,
                setext: true,
            } => Block::SetextHeading {
                level: *level,
                children: self.inlines(&data.content),
            },
            BlockKind::IndentedCode => Block::IndentedCode(data.content.clone()),
            BlockKind::FencedCode {
                fence_char,
                fence_length,
                info,
                ..
            } => Block::FencedCode {
                info: info.clone(),
                fence_char: *fence_char,
                fence_length: *fence_length,
                literal: data.content.clone(),
            },
            BlockKind::HtmlBlock(block_type) => Block::HtmlBlock {
                block_type: *block_type,
                literal: data.content.clone(),
            },
            BlockKind::ThematicBreak => Block::ThematicBreak,
            BlockKind::Table {
                alignments,
                header,
                rows,
            } => Block::Table {
                alignments: alignments.clone(),
                header: self.table_row(header),
                rows: rows.iter().map(|row| self.table_row(row)).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Vec<Block> {
        match Parser::new().parse(input) {
            Block::Document(children) => children,
            other => panic!("expected a document, got {:?}", other),
        }
    }

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Vec::<Block>::new());
        assert_eq!(parse("\n\n  \n"), Vec::<Block>::new());
    }

    #[test]
    fn test_atx_heading_closing_sequence() {
        assert_eq!(
            parse("## foo ##\n# #\n### foo \\###"),
            vec![
                Block::AtxHeading {
                    level: 2,
                    children: vec![text("foo")]
                },
                Block::AtxHeading {
                    level: 1,
                    children: vec![]
                },
                Block::AtxHeading {
                    level: 3,
                    children: vec![text("foo ###")]
                },
            ]
        );
    }

    #[test]
    fn test_setext_heading_spans_lines() {
        assert_eq!(
            parse("Foo\nbar\n---"),
            vec![Block::SetextHeading {
                level: 2,
                children: vec![text("Foo"), Inline::SoftBreak, text("bar")]
            }]
        );
    }

    #[test]
    fn test_lazy_continuation_in_block_quote() {
        assert_eq!(
            parse("> foo\nbar"),
            vec![Block::BlockQuote(vec![Block::Paragraph(vec![
                text("foo"),
                Inline::SoftBreak,
                text("bar")
            ])])]
        );
    }

    #[test]
    fn test_list_tightness() {
        let tight_of = |input: &str| match &parse(input)[0] {
            Block::List { tight, .. } => *tight,
            other => panic!("expected a list, got {:?}", other),
        };
        assert!(tight_of("- a\n- b\n- c"));
        assert!(!tight_of("- a\n- b\n\n- c"));
        assert!(!tight_of("- a\n\n  b"));
        // Only the inner list is loose here
        assert!(tight_of("- a\n  - b\n\n    c\n- d"));
        assert!(tight_of("- a\n- b\n\n"));
    }

    #[test]
    fn test_list_type_change_starts_new_list() {
        let blocks = parse("- a\n+ b\n1. c\n2) d");
        assert_eq!(blocks.len(), 4);
        assert!(matches!(
            blocks[2],
            Block::List {
                kind: ListKind::Ordered {
                    start: 1,
                    delimiter: '.'
                },
                ..
            }
        ));
    }

    #[test]
    fn test_ordered_list_interrupting_paragraph_must_start_at_one() {
        let blocks = parse("The number of windows in my house is\n14.  The number of doors is 6.");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_fenced_code_info_and_unclosed_fence() {
        assert_eq!(
            parse("``` ruby startline=3\ndef foo\n```"),
            vec![Block::FencedCode {
                info: "ruby startline=3".into(),
                fence_char: '`',
                fence_length: 3,
                literal: "def foo\n".into()
            }]
        );
        assert_eq!(
            parse("~~~~\naaa\n~~~\n"),
            vec![Block::FencedCode {
                info: String::new(),
                fence_char: '~',
                fence_length: 4,
                literal: "aaa\n~~~\n".into()
            }]
        );
    }

    #[test]
    fn test_indented_code_drops_trailing_blank_lines() {
        assert_eq!(
            parse("    a\n\n    b\n    \n\n"),
            vec![Block::IndentedCode("a\n\nb\n".into())]
        );
    }

    #[test]
    fn test_html_block_types() {
        assert_eq!(
            parse("<div>\n*hi*\n\n*p*"),
            vec![
                Block::HtmlBlock {
                    block_type: 6,
                    literal: "<div>\n*hi*".into()
                },
                Block::Paragraph(vec![Inline::Emphasis {
                    depth: 1,
                    children: vec![text("p")]
                }]),
            ]
        );
        assert_eq!(
            parse("<!-- a\n\nb --> tail\nafter"),
            vec![
                Block::HtmlBlock {
                    block_type: 2,
                    literal: "<!-- a\n\nb --> tail".into()
                },
                Block::Paragraph(vec![text("after")]),
            ]
        );
    }

    #[test]
    fn test_reference_definitions_are_removed() {
        assert_eq!(
            parse("[foo]: /url \"title\"\n\n[foo]"),
            vec![Block::Paragraph(vec![Inline::Link {
                destination: "/url".into(),
                title: Some("title".into()),
                children: vec![text("foo")]
            }])]
        );
    }

    #[test]
    fn test_table_splits_off_preceding_paragraph() {
        let blocks = parse("intro\n| a | b |\n| :- | -: |\n| 1 | 2 | 3 |\n| 4 |\n\nafter");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::Paragraph(vec![text("intro")]));
        match &blocks[1] {
            Block::Table {
                alignments,
                header,
                rows,
            } => {
                assert_eq!(alignments, &vec![Alignment::Left, Alignment::Right]);
                assert_eq!(header.cells, vec![vec![text("a")], vec![text("b")]]);
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].cells.len(), 2);
                assert_eq!(rows[1].cells[1], Vec::<Inline>::new());
            }
            other => panic!("expected a table, got {:?}", other),
        }
    }

    #[test]
    fn test_table_needs_matching_cell_count() {
        let blocks = parse("| a | b |\n| --- |");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_tables_can_be_disabled() {
        let options = Options {
            tables: false,
            ..Options::default()
        };
        let doc = Parser::with_options(options).parse("a | b\n--|--");
        assert!(matches!(doc.children()[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_nesting_limit_stops_opening_containers() {
        let options = Options {
            max_nesting: 2,
            ..Options::default()
        };
        let doc = Parser::with_options(options).parse("> > > deep");
        let inner = &doc.children()[0].children()[0];
        assert_eq!(
            inner.children(),
            &[Block::Paragraph(vec![text("> deep")])]
        );
    }

    #[test]
    fn test_tab_after_block_quote_marker() {
        assert_eq!(
            parse(">\t\tfoo"),
            vec![Block::BlockQuote(vec![Block::IndentedCode("  foo\n".into())])]
        );
    }
}
