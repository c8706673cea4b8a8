/// Inline nodes under construction. Siblings are linked through an arena so
/// emphasis and links can regroup a run of them without moving anything.
use crate::ast::Inline;

/// Deepest nesting of emphasis, links and images the inline parser builds.
/// Delimiters and brackets that would go deeper stay literal text.
pub const MAX_INLINE_NESTING: usize = 100;

#[derive(Debug)]
struct InlineNode {
    value: Inline,
    prev: Option<usize>,
    next: Option<usize>,
    first_child: Option<usize>,
    /// Number of container levels in this subtree, zero for leaves
    height: usize,
}

#[derive(Debug, Default)]
pub struct InlineTree {
    nodes: Vec<InlineNode>,
    first: Option<usize>,
    last: Option<usize>,
}

impl InlineTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node at the top level and return its id
    pub fn push(&mut self, value: Inline) -> usize {
        let id = self.nodes.len();
        self.nodes.push(InlineNode {
            value,
            prev: self.last,
            next: None,
            first_child: None,
            height: 0,
        });
        match self.last {
            Some(last) => self.nodes[last].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        id
    }

    /// Last node at the top level
    pub fn last(&self) -> Option<usize> {
        self.last
    }

    pub fn text_mut(&mut self, id: usize) -> Option<&mut String> {
        match &mut self.nodes[id].value {
            Inline::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Tallest sibling strictly between `start` and `end`
    pub fn max_height_between(&self, start: usize, end: usize) -> usize {
        let mut tallest = 0;
        let mut cursor = self.nodes[start].next;
        while let Some(id) = cursor {
            if id == end {
                break;
            }
            tallest = tallest.max(self.nodes[id].height);
            cursor = self.nodes[id].next;
        }
        tallest
    }

    /// Move the siblings strictly between `start` and `end` under a new
    /// `value` node placed between them.
    pub fn wrap_between(
        &mut self,
        start: usize,
        end: usize,
        value: Inline,
        height: usize,
    ) -> usize {
        let first = self.nodes[start].next.filter(|&id| id != end);
        let last = self.nodes[end].prev.filter(|&id| id != start);
        let id = self.nodes.len();
        self.nodes.push(InlineNode {
            value,
            prev: Some(start),
            next: Some(end),
            first_child: first,
            height,
        });
        if let Some(first) = first {
            self.nodes[first].prev = None;
        }
        if let Some(last) = last {
            self.nodes[last].next = None;
        }
        self.nodes[start].next = Some(id);
        self.nodes[end].prev = Some(id);
        id
    }

    /// Replace top-level node `id` with `value` and move every top-level
    /// node after it underneath.
    pub fn adopt_rest(&mut self, id: usize, value: Inline, height: usize) {
        let first = self.nodes[id].next;
        if let Some(first) = first {
            self.nodes[first].prev = None;
        }
        let node = &mut self.nodes[id];
        node.value = value;
        node.next = None;
        node.first_child = first;
        node.height = height;
        self.last = Some(id);
    }

    /// The finished inline list, with emptied text dropped and neighbouring
    /// text joined.
    pub fn into_inlines(mut self) -> Vec<Inline> {
        let first = self.first;
        self.collect(first)
    }

    fn collect(&mut self, mut cursor: Option<usize>) -> Vec<Inline> {
        let mut out: Vec<Inline> = Vec::new();
        while let Some(id) = cursor {
            cursor = self.nodes[id].next;
            let first_child = self.nodes[id].first_child;
            let mut value = std::mem::replace(&mut self.nodes[id].value, Inline::SoftBreak);
            match &mut value {
                Inline::Text(text) if text.is_empty() => continue,
                Inline::Emphasis { children, .. }
                | Inline::Strikethrough(children)
                | Inline::Link { children, .. }
                | Inline::Image { children, .. } => *children = self.collect(first_child),
                _ => {}
            }
            if let Inline::Text(text) = &value
                && let Some(Inline::Text(prev)) = out.last_mut()
            {
                prev.push_str(text);
            } else {
                out.push(value);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_merges_text_and_drops_empty() {
        let mut tree = InlineTree::new();
        tree.push(text("a"));
        tree.push(text(""));
        tree.push(text("b"));
        tree.push(Inline::SoftBreak);
        assert_eq!(tree.into_inlines(), vec![text("ab"), Inline::SoftBreak]);
    }

    #[test]
    fn test_wrap_between_moves_siblings() {
        let mut tree = InlineTree::new();
        let open = tree.push(text("*"));
        tree.push(text("x"));
        tree.push(text("y"));
        let close = tree.push(text("*"));
        tree.push(text("z"));

        let wrapper = Inline::Emphasis {
            depth: 1,
            children: Vec::new(),
        };
        tree.wrap_between(open, close, wrapper, 1);
        assert_eq!(tree.max_height_between(open, close), 1);
        assert_eq!(
            tree.into_inlines(),
            vec![
                text("*"),
                Inline::Emphasis {
                    depth: 1,
                    children: vec![text("xy")]
                },
                text("*z"),
            ]
        );
    }

    #[test]
    fn test_wrap_between_adjacent_nodes() {
        let mut tree = InlineTree::new();
        let open = tree.push(text("a"));
        let close = tree.push(text("b"));
        tree.wrap_between(open, close, Inline::Strikethrough(Vec::new()), 1);
        assert_eq!(
            tree.into_inlines(),
            vec![text("a"), Inline::Strikethrough(Vec::new()), text("b")]
        );
    }

    #[test]
    fn test_adopt_rest() {
        let mut tree = InlineTree::new();
        tree.push(text("before "));
        let bracket = tree.push(text("["));
        tree.push(text("label"));
        let link = Inline::Link {
            destination: "/u".into(),
            title: None,
            children: Vec::new(),
        };
        tree.adopt_rest(bracket, link, 1);
        assert_eq!(tree.last(), Some(bracket));
        tree.push(text(" after"));
        assert_eq!(
            tree.into_inlines(),
            vec![
                text("before "),
                Inline::Link {
                    destination: "/u".into(),
                    title: None,
                    children: vec![text("label")]
                },
                text(" after"),
            ]
        );
    }
}
