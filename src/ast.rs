/// Document tree produced by the parser
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// Root of every parsed tree; the only node without a parent
    Document(Vec<Block>),
    // Container blocks
    BlockQuote(Vec<Block>),
    List {
        kind: ListKind,
        tight: bool,         // Tight lists render item paragraphs without <p>
        children: Vec<Block>, // Contains ListItem nodes
    },
    ListItem(Vec<Block>),
    // Leaf blocks
    Paragraph(Vec<Inline>),
    AtxHeading {
        level: u8, // 1-6
        children: Vec<Inline>,
    },
    SetextHeading {
        level: u8, // 1 for `=`, 2 for `-`
        children: Vec<Inline>,
    },
    IndentedCode(String),
    FencedCode {
        info: String,
        fence_char: char,
        fence_length: usize,
        literal: String,
    },
    HtmlBlock {
        block_type: u8, // Start condition 1-7
        literal: String,
    },
    ThematicBreak,
    // GFM extension
    Table {
        alignments: Vec<Alignment>,
        header: TableRow,
        rows: Vec<TableRow>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Bullet(char), // `-`, `+` or `*`
    Ordered { start: u32, delimiter: char }, // `.` or `)`
}

impl ListKind {
    /// Two markers belong to the same list iff they share a bullet character
    /// or an ordered delimiter.
    pub fn same_type(&self, other: &ListKind) -> bool {
        match (self, other) {
            (ListKind::Bullet(a), ListKind::Bullet(b)) => a == b,
            (
                ListKind::Ordered { delimiter: a, .. },
                ListKind::Ordered { delimiter: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    None,
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<Vec<Inline>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    SoftBreak,
    HardBreak,
    CodeSpan(String),
    RawHtml(String),
    Autolink {
        kind: AutolinkKind,
        target: String, // As written between the angle brackets
    },
    /// A decoded entity or numeric character reference
    Entity {
        raw: String,
        decoded: String,
    },
    Emphasis {
        depth: u8, // 1 renders <em>, 2 renders <strong>
        children: Vec<Inline>,
    },
    Strikethrough(Vec<Inline>),
    Link {
        destination: String,
        title: Option<String>,
        children: Vec<Inline>,
    },
    Image {
        destination: String,
        title: Option<String>,
        children: Vec<Inline>, // Rendered as plain-text alt
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutolinkKind {
    Uri,
    Email,
}

impl Block {
    /// Child blocks of a container, empty for leaves.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Document(children)
            | Block::BlockQuote(children)
            | Block::ListItem(children)
            | Block::List { children, .. } => children,
            _ => &[],
        }
    }
}
