//! Rendering context threaded through every template call.
//!
//! There is no ambient state: a template sees the block it renders as a
//! [`Node`] (block, siblings, ancestors) and a mutable [`RenderContext`]
//! (options, current document, open stacks, counters).

use super::figure::{ContentFigureRecognizer, FigureKind, FigureTypeRecognizer};
use super::inline;
use super::template::{TemplateRegistry, TEMPLATE_PARAMETER};
use crate::export::ExportOptions;
use crate::model::{BlockKind, ContentBlock, EntityReference};

/// A block together with its position in the tree.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    /// The block
    pub block: &'a ContentBlock,

    /// The block and its siblings
    pub siblings: &'a [ContentBlock],

    /// Index of the block in `siblings`
    pub index: usize,

    /// Enclosing node
    pub parent: Option<&'a Node<'a>>,
}

impl<'a> Node<'a> {
    /// A top-level node.
    pub fn root(siblings: &'a [ContentBlock], index: usize) -> Option<Self> {
        siblings.get(index).map(|block| Self {
            block,
            siblings,
            index,
            parent: None,
        })
    }

    /// The next sibling, if any.
    pub fn next_sibling(&self) -> Option<&'a ContentBlock> {
        self.siblings.get(self.index + 1)
    }

    /// The previous sibling, if any.
    pub fn previous_sibling(&self) -> Option<&'a ContentBlock> {
        self.index.checked_sub(1).and_then(|i| self.siblings.get(i))
    }

    /// Nearest ancestor whose block matches `predicate`.
    pub fn ancestor(&self, predicate: impl Fn(&ContentBlock) -> bool) -> Option<&'a Node<'a>> {
        let mut current = self.parent;
        while let Some(node) = current {
            if predicate(node.block) {
                return Some(node);
            }
            current = node.parent;
        }
        None
    }

    /// Number of enclosing blocks matching `predicate`.
    pub fn count_ancestors(&self, predicate: impl Fn(&ContentBlock) -> bool) -> usize {
        let mut count = 0;
        let mut current = self.parent;
        while let Some(node) = current {
            if predicate(node.block) {
                count += 1;
            }
            current = node.parent;
        }
        count
    }
}

/// Mutable state of one document rendering.
pub struct RenderContext<'a> {
    registry: &'a TemplateRegistry,
    options: &'a ExportOptions,
    document: Option<&'a EntityReference>,
    recognizer: &'a dyn FigureTypeRecognizer,
    figures: Vec<FigureKind>,
    failed_blocks: u32,
}

impl<'a> RenderContext<'a> {
    /// Create a new context.
    pub fn new(registry: &'a TemplateRegistry, options: &'a ExportOptions) -> Self {
        Self {
            registry,
            options,
            document: None,
            recognizer: &ContentFigureRecognizer,
            figures: Vec::new(),
            failed_blocks: 0,
        }
    }

    /// Set the document being rendered.
    pub fn with_document(mut self, document: &'a EntityReference) -> Self {
        self.document = Some(document);
        self
    }

    /// Use another figure type recognizer.
    pub fn with_recognizer(mut self, recognizer: &'a dyn FigureTypeRecognizer) -> Self {
        self.recognizer = recognizer;
        self
    }

    /// Export options.
    pub fn options(&self) -> &'a ExportOptions {
        self.options
    }

    /// The document being rendered.
    pub fn document(&self) -> Option<&'a EntityReference> {
        self.document
    }

    /// Recognizer classifying figures without an explicit type.
    pub fn recognizer(&self) -> &'a dyn FigureTypeRecognizer {
        self.recognizer
    }

    /// Blocks whose template failed so far.
    pub fn failed_blocks(&self) -> u32 {
        self.failed_blocks
    }

    /// Open a figure float.
    pub fn push_figure(&mut self, kind: FigureKind) {
        self.figures.push(kind);
    }

    /// Close the innermost figure float.
    pub fn pop_figure(&mut self) -> Option<FigureKind> {
        self.figures.pop()
    }

    /// Kind of the innermost open figure float.
    pub fn current_figure(&self) -> Option<FigureKind> {
        self.figures.last().copied()
    }

    /// Render a sequence of top-level blocks.
    pub fn render(&mut self, blocks: &[ContentBlock]) -> String {
        self.render_sequence(blocks, None)
    }

    /// Render the children of a node.
    pub fn render_children(&mut self, node: &Node<'_>) -> String {
        self.render_sequence(&node.block.children, Some(node))
    }

    /// Render the children of a node as inline content.
    ///
    /// Standalone descendants are flattened away (see [`inline::flatten`]),
    /// so the result fits in a command argument.
    pub fn render_inline(&mut self, node: &Node<'_>) -> String {
        let tokens = inline::flatten(&node.block.children);
        self.render_sequence(&tokens, Some(node))
    }

    /// Render one node: the `template` parameter selects a template
    /// first, the block tag second; without a template the children are
    /// rendered instead.
    pub fn render_node(&mut self, node: &Node<'_>) -> String {
        let registry = self.registry;
        let block = node.block;
        let key = match block.parameters.get(TEMPLATE_PARAMETER) {
            Some(key) if registry.contains(key) => key,
            Some(key) => {
                log::debug!("Unknown template '{}', using '{}'", key, block.tag());
                block.tag()
            }
            None => block.tag(),
        };

        let Some(template) = registry.get(key) else {
            return self.render_children(node);
        };

        match template.render(node, self) {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "Failed to render [{}] block with template '{}': {}",
                    block.tag(),
                    key,
                    e.root_cause()
                );
                self.failed_blocks += 1;
                String::new()
            }
        }
    }

    fn render_sequence(&mut self, blocks: &[ContentBlock], parent: Option<&Node<'_>>) -> String {
        let mut out = String::new();
        for (index, block) in blocks.iter().enumerate() {
            let node = Node {
                block,
                siblings: blocks,
                index,
                parent,
            };
            out.push_str(&self.render_node(&node));
        }
        out
    }
}

/// Whether a block is a metadata wrapper.
pub(crate) fn is_metadata(block: &ContentBlock) -> bool {
    matches!(block.kind, BlockKind::Metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_navigation() {
        let blocks = vec![
            ContentBlock::paragraph("a"),
            ContentBlock::paragraph("b"),
            ContentBlock::paragraph("c"),
        ];
        let middle = Node::root(&blocks, 1).unwrap();
        assert_eq!(middle.previous_sibling().map(|b| b.plain_text()), Some("a".into()));
        assert_eq!(middle.next_sibling().map(|b| b.plain_text()), Some("c".into()));
        assert!(Node::root(&blocks, 2).unwrap().next_sibling().is_none());
        assert!(Node::root(&blocks, 3).is_none());
    }

    #[test]
    fn test_ancestors() {
        let list = ContentBlock::with_children(
            BlockKind::BulletedList,
            vec![ContentBlock::with_children(
                BlockKind::ListItem,
                vec![ContentBlock::word("x")],
            )],
        );
        let blocks = vec![list];
        let root = Node::root(&blocks, 0).unwrap();
        let item = Node {
            block: &blocks[0].children[0],
            siblings: &blocks[0].children,
            index: 0,
            parent: Some(&root),
        };
        let word = Node {
            block: &blocks[0].children[0].children[0],
            siblings: &blocks[0].children[0].children,
            index: 0,
            parent: Some(&item),
        };
        assert!(word
            .ancestor(|b| matches!(b.kind, BlockKind::BulletedList))
            .is_some());
        assert_eq!(word.count_ancestors(|b| b.tag().ends_with("list")), 1);
    }

    #[test]
    fn test_fall_through_to_children() {
        let mut registry = TemplateRegistry::new();
        registry.register(
            "word",
            |node: &Node<'_>, _: &mut RenderContext<'_>| -> crate::error::Result<String> {
                Ok(node.block.plain_text().to_uppercase())
            },
        );
        let options = ExportOptions::default();
        let mut ctx = RenderContext::new(&registry, &options);

        // No paragraph template: its words render on their own
        let blocks = vec![ContentBlock::paragraph("some text")];
        assert_eq!(ctx.render(&blocks), "SOMETEXT");
    }
}
