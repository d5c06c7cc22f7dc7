//! The event protocol an export consumes.
//!
//! A wiki is visited as `BeginWiki → BeginSpace… → BeginDocument →
//! content events → EndDocument → EndSpace… → EndWiki`. Both producers
//! here are lazy iterators so a large tree is never flattened into one
//! event list.
//!
//! # Example
//!
//! ```
//! use wikitex::export::{DocumentSelection, DocumentWalker, ExportEvent};
//! use wikitex::model::{ContentBlock, Space, WikiDocument, WikiTree};
//!
//! let mut doc = WikiDocument::new("WebHome");
//! doc.add_block(ContentBlock::paragraph("Hello"));
//! let mut space = Space::new("Main");
//! space.add_document(doc);
//! let mut tree = WikiTree::new("xwiki");
//! tree.add_space(space);
//!
//! let names: Vec<_> = DocumentWalker::new(&tree, &DocumentSelection::All)
//!     .map(|e| e.name())
//!     .collect();
//! assert_eq!(names.first(), Some(&"BeginWiki"));
//! assert_eq!(names.last(), Some(&"EndWiki"));
//! ```

use super::options::DocumentSelection;
use crate::model::{BlockKind, ContentBlock, EntityReference, Parameters, Space, WikiDocument, WikiTree};
use std::collections::VecDeque;

/// Events of one export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    /// A wiki starts.
    BeginWiki {
        /// Wiki name
        name: String,
    },

    /// A space starts.
    BeginSpace {
        /// Space name
        name: String,
    },

    /// A document starts; content events follow.
    BeginDocument {
        /// Full document reference
        reference: EntityReference,
        /// Display title
        title: Option<String>,
    },

    /// Document content.
    Content(ContentEvent),

    /// The current document ends.
    EndDocument,

    /// The current space ends.
    EndSpace,

    /// The wiki ends.
    EndWiki,
}

impl ExportEvent {
    /// Event name, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ExportEvent::BeginWiki { .. } => "BeginWiki",
            ExportEvent::BeginSpace { .. } => "BeginSpace",
            ExportEvent::BeginDocument { .. } => "BeginDocument",
            ExportEvent::Content(_) => "Content",
            ExportEvent::EndDocument => "EndDocument",
            ExportEvent::EndSpace => "EndSpace",
            ExportEvent::EndWiki => "EndWiki",
        }
    }
}

/// Content of a document as a flat event sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    /// A block with children starts.
    Begin {
        /// Block kind
        kind: BlockKind,
        /// Block parameters
        parameters: Parameters,
    },

    /// The innermost open block ends.
    End,

    /// A block without children.
    Leaf(ContentBlock),
}

/// Iterator turning a block forest into content events.
pub struct ContentEvents<'a> {
    stack: Vec<(&'a [ContentBlock], usize)>,
}

impl<'a> ContentEvents<'a> {
    /// Create a new event stream over `blocks`.
    pub fn new(blocks: &'a [ContentBlock]) -> Self {
        Self {
            stack: vec![(blocks, 0)],
        }
    }

    /// Nesting depth of the block currently open.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }
}

impl<'a> Iterator for ContentEvents<'a> {
    type Item = ContentEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.stack.last_mut()?;
        let blocks: &'a [ContentBlock] = frame.0;

        if let Some(block) = blocks.get(frame.1) {
            frame.1 += 1;
            if block.children.is_empty() {
                return Some(ContentEvent::Leaf(block.clone()));
            }
            self.stack.push((&block.children, 0));
            return Some(ContentEvent::Begin {
                kind: block.kind.clone(),
                parameters: block.parameters.clone(),
            });
        }

        self.stack.pop();
        if self.stack.is_empty() {
            None
        } else {
            Some(ContentEvent::End)
        }
    }
}

/// Structural steps, computed up front; content is streamed.
#[derive(Debug)]
enum Step<'a> {
    BeginWiki,
    BeginSpace(&'a str),
    Document(EntityReference, &'a WikiDocument),
    EndSpace,
    EndWiki,
}

/// Iterator emitting the full event protocol for a [`WikiTree`].
///
/// Only selected documents are visited; spaces without any selected
/// document are skipped.
pub struct DocumentWalker<'a> {
    wiki: &'a str,
    steps: VecDeque<Step<'a>>,
    content: Option<ContentEvents<'a>>,
    document_count: usize,
}

impl<'a> DocumentWalker<'a> {
    /// Create a new walker.
    pub fn new(tree: &'a WikiTree, selection: &DocumentSelection) -> Self {
        let mut steps = VecDeque::new();
        steps.push_back(Step::BeginWiki);
        let mut path = Vec::new();
        for space in &tree.spaces {
            plan_space(&tree.name, space, selection, &mut path, &mut steps);
        }
        steps.push_back(Step::EndWiki);

        let document_count = steps
            .iter()
            .filter(|s| matches!(s, Step::Document(..)))
            .count();

        Self {
            wiki: &tree.name,
            steps,
            content: None,
            document_count,
        }
    }

    /// Number of documents this walker visits.
    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

fn plan_space<'a>(
    wiki: &str,
    space: &'a Space,
    selection: &DocumentSelection,
    path: &mut Vec<&'a str>,
    steps: &mut VecDeque<Step<'a>>,
) {
    path.push(&space.name);
    let begin = steps.len();
    steps.push_back(Step::BeginSpace(&space.name));

    let mut selected = false;
    for doc in &space.documents {
        let reference = EntityReference::document(wiki, &path[..], &doc.name);
        if selection.includes(&reference) {
            steps.push_back(Step::Document(reference, doc));
            selected = true;
        }
    }
    for child in &space.spaces {
        let before = steps.len();
        plan_space(wiki, child, selection, path, steps);
        selected |= steps.len() > before;
    }

    if selected {
        steps.push_back(Step::EndSpace);
    } else {
        steps.truncate(begin);
    }
    path.pop();
}

impl<'a> Iterator for DocumentWalker<'a> {
    type Item = ExportEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(ref mut content) = self.content {
            if let Some(event) = content.next() {
                return Some(ExportEvent::Content(event));
            }
            self.content = None;
            return Some(ExportEvent::EndDocument);
        }

        let event = match self.steps.pop_front()? {
            Step::BeginWiki => ExportEvent::BeginWiki {
                name: self.wiki.to_string(),
            },
            Step::BeginSpace(name) => ExportEvent::BeginSpace {
                name: name.to_string(),
            },
            Step::Document(reference, doc) => {
                self.content = Some(ContentEvents::new(&doc.content));
                ExportEvent::BeginDocument {
                    reference,
                    title: doc.title.clone(),
                }
            }
            Step::EndSpace => ExportEvent::EndSpace,
            Step::EndWiki => ExportEvent::EndWiki,
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> WikiTree {
        let mut tree = WikiTree::new("xwiki");

        let mut main = Space::new("Main");
        let mut home = WikiDocument::new("WebHome");
        home.add_block(ContentBlock::paragraph("Hi"));
        main.add_document(home);
        let mut sub = Space::new("Sub");
        sub.add_document(WikiDocument::new("Page"));
        main.add_space(sub);
        tree.add_space(main);

        let mut blog = Space::new("Blog");
        blog.add_document(WikiDocument::new("Post"));
        tree.add_space(blog);
        tree
    }

    #[test]
    fn test_content_events() {
        let blocks = vec![ContentBlock::paragraph("a b"), ContentBlock::space()];
        let events: Vec<_> = ContentEvents::new(&blocks).collect();

        assert!(matches!(
            events[0],
            ContentEvent::Begin {
                kind: BlockKind::Paragraph,
                ..
            }
        ));
        assert!(matches!(events[1], ContentEvent::Leaf(_)));
        assert_eq!(events[4], ContentEvent::End);
        assert_eq!(events[5], ContentEvent::Leaf(ContentBlock::space()));
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_walker_protocol() {
        let tree = tree();
        let names: Vec<_> = DocumentWalker::new(&tree, &DocumentSelection::All)
            .filter(|e| !matches!(e, ExportEvent::Content(_)))
            .map(|e| e.name())
            .collect();

        assert_eq!(
            names,
            vec![
                "BeginWiki",
                "BeginSpace",
                "BeginDocument",
                "EndDocument",
                "BeginSpace",
                "BeginDocument",
                "EndDocument",
                "EndSpace",
                "EndSpace",
                "BeginSpace",
                "BeginDocument",
                "EndDocument",
                "EndSpace",
                "EndWiki",
            ]
        );
    }

    #[test]
    fn test_walker_selection_skips_empty_spaces() {
        let tree = tree();
        let selection = DocumentSelection::parse("Blog.Post").unwrap();
        let walker = DocumentWalker::new(&tree, &selection);
        assert_eq!(walker.document_count(), 1);

        let events: Vec<_> = walker.collect();
        let documents: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ExportEvent::BeginDocument { reference, .. } => Some(reference.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(documents, vec!["xwiki:Blog.Post"]);
        assert_eq!(events.len(), 6);
    }
}
