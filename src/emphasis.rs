/// Delimiter runs and the emphasis/strikethrough resolution pass
use crate::ast::Inline;
use crate::inline_tree::{InlineTree, MAX_INLINE_NESTING};
use std::collections::HashMap;
use unicode_categories::UnicodeCategories;

/// A run of `*`, `_` or `~` that may open or close emphasis
#[derive(Debug, Clone)]
pub struct Delimiter {
    /// Id of the run's text node in the inline tree
    pub node: usize,
    pub ch: char,
    /// Characters still unused in the run
    pub count: usize,
    /// Length of the run as written, for the rule of three
    pub original_count: usize,
    pub can_open: bool,
    pub can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Delimiters in source order. Indices never move; removed entries are
/// unlinked so later scans skip them.
#[derive(Debug, Default)]
pub struct DelimiterStack {
    items: Vec<Delimiter>,
    top: Option<usize>,
}

/// Unicode whitespace: the Zs category plus tab, LF, FF and CR
pub fn is_unicode_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0c' | '\r') || c.is_separator_space()
}

/// ASCII punctuation or anything in the Unicode P categories
pub fn is_unicode_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || c.is_punctuation()
}

/// Work out whether a run of `ch` can open and close emphasis from the
/// characters around it. Line boundaries count as whitespace.
pub fn flanking(ch: char, before: Option<char>, after: Option<char>) -> (bool, bool) {
    let before = before.unwrap_or('\n');
    let after = after.unwrap_or('\n');

    let before_ws = is_unicode_whitespace(before);
    let before_punct = is_unicode_punctuation(before);
    let after_ws = is_unicode_whitespace(after);
    let after_punct = is_unicode_punctuation(after);

    let left = !after_ws && (!after_punct || before_ws || before_punct);
    let right = !before_ws && (!before_punct || after_ws || after_punct);

    if ch == '_' {
        (left && (!right || before_punct), right && (!left || after_punct))
    } else {
        (left, right)
    }
}

impl DelimiterStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delimiters ever pushed and not yet resolved away
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, node: usize, ch: char, count: usize, can_open: bool, can_close: bool) {
        let index = self.items.len();
        self.items.push(Delimiter {
            node,
            ch,
            count,
            original_count: count,
            can_open,
            can_close,
            prev: self.top,
            next: None,
        });
        if let Some(top) = self.top {
            self.items[top].next = Some(index);
        }
        self.top = Some(index);
    }

    fn remove(&mut self, index: usize) {
        let (prev, next) = (self.items[index].prev, self.items[index].next);
        if let Some(prev) = prev {
            self.items[prev].next = next;
        }
        if let Some(next) = next {
            self.items[next].prev = prev;
        }
        if self.top == Some(index) {
            self.top = prev;
        }
    }

    /// Resolve emphasis among the delimiters at index `bottom` and above,
    /// regrouping `tree` as pairs match. All of those delimiters are gone
    /// afterwards. Returns the height of the tallest node created.
    pub fn process_emphasis(&mut self, tree: &mut InlineTree, bottom: usize) -> usize {
        debug_assert!(bottom <= self.items.len());
        // Lowest opener index still worth trying, per closer kind
        let mut openers_bottom: HashMap<(char, bool, usize), usize> = HashMap::new();
        let mut tallest = 0;

        let mut closer = None;
        let mut cursor = self.top;
        while let Some(index) = cursor.filter(|&index| index >= bottom) {
            closer = Some(index);
            cursor = self.items[index].prev;
        }

        while let Some(c) = closer {
            let current = &self.items[c];
            if !current.can_close {
                closer = current.next;
                continue;
            }

            let key = (
                current.ch,
                current.can_open,
                if current.ch == '~' {
                    current.original_count
                } else {
                    current.original_count % 3
                },
            );
            let floor = openers_bottom.get(&key).copied().unwrap_or(bottom).max(bottom);

            let mut found = None;
            let mut candidate = current.prev;
            while let Some(o) = candidate.filter(|&o| o >= floor) {
                let opener = &self.items[o];
                candidate = opener.prev;
                if opener.ch != current.ch || !opener.can_open {
                    continue;
                }
                let matches = if current.ch == '~' {
                    opener.count == current.count
                } else {
                    let odd_match = (current.can_open || opener.can_close)
                        && current.original_count % 3 != 0
                        && (opener.original_count + current.original_count) % 3 == 0;
                    !odd_match
                };
                if matches {
                    found = Some(o);
                    break;
                }
            }

            // Any opener further down would enclose at least as much, so a
            // pair too deep to nest ends the search like a miss does
            let pair = found.and_then(|o| {
                let height = 1 + tree.max_height_between(self.items[o].node, self.items[c].node);
                (height <= MAX_INLINE_NESTING).then_some((o, height))
            });
            let Some((opener, height)) = pair else {
                openers_bottom.insert(key, c);
                let next = self.items[c].next;
                if !self.items[c].can_open {
                    self.remove(c);
                }
                closer = next;
                continue;
            };

            let ch = self.items[c].ch;
            let used = if ch == '~' {
                self.items[c].count
            } else if self.items[c].count >= 2 && self.items[opener].count >= 2 {
                2
            } else {
                1
            };

            let opener_node = self.items[opener].node;
            let closer_node = self.items[c].node;
            self.items[opener].count -= used;
            self.items[c].count -= used;
            shrink_text(tree, opener_node, used);
            shrink_text(tree, closer_node, used);

            let wrapper = if ch == '~' {
                Inline::Strikethrough(Vec::new())
            } else {
                Inline::Emphasis {
                    depth: used as u8,
                    children: Vec::new(),
                }
            };
            tree.wrap_between(opener_node, closer_node, wrapper, height);
            tallest = tallest.max(height);

            // Everything between the pair is now inside the wrapper
            let mut between = self.items[opener].next;
            while let Some(b) = between.filter(|&b| b != c) {
                between = self.items[b].next;
                self.remove(b);
            }

            if self.items[opener].count == 0 {
                self.remove(opener);
            }
            if self.items[c].count == 0 {
                closer = self.items[c].next;
                self.remove(c);
            }
        }

        let mut cursor = self.top;
        while let Some(index) = cursor.filter(|&index| index >= bottom) {
            cursor = self.items[index].prev;
            self.remove(index);
        }
        self.items.truncate(bottom);
        tallest
    }
}

fn shrink_text(tree: &mut InlineTree, node: usize, by: usize) {
    if let Some(text) = tree.text_mut(node) {
        let keep = text.len().saturating_sub(by);
        text.truncate(keep);
    }
}
