//! Figure classification and caption placement.

use super::context::{is_metadata, Node};
use crate::model::{BlockKind, ContentBlock};

/// Figure parameter forcing the float type (`figure` or `table`).
pub const FIGURE_TYPE_PARAMETER: &str = "figure-type";

/// LaTeX float a figure renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    /// `figure` float
    Figure,
    /// `table` float
    Table,
}

impl FigureKind {
    /// Environment name.
    pub fn environment(self) -> &'static str {
        match self {
            FigureKind::Figure => "figure",
            FigureKind::Table => "table",
        }
    }
}

/// Decides whether a figure without an explicit type holds a table.
pub trait FigureTypeRecognizer: Send + Sync {
    /// Check if the figure's content is a table.
    fn is_table(&self, figure: &ContentBlock) -> bool;
}

/// Recognizes a figure as a table when its only content (besides the
/// caption) is a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentFigureRecognizer;

impl FigureTypeRecognizer for ContentFigureRecognizer {
    fn is_table(&self, figure: &ContentBlock) -> bool {
        let mut content = Vec::new();
        significant_children(&figure.children, &mut content);
        matches!(content.as_slice(), [only] if matches!(only.kind, BlockKind::Table))
    }
}

/// Children that are neither captions nor whitespace, looking through
/// transparent wrappers and paragraphs holding a single block.
fn significant_children<'a>(blocks: &'a [ContentBlock], out: &mut Vec<&'a ContentBlock>) {
    for block in blocks {
        match block.kind {
            BlockKind::FigureCaption | BlockKind::Space | BlockKind::NewLine => {}
            BlockKind::Metadata | BlockKind::Composite | BlockKind::Paragraph => {
                significant_children(&block.children, out)
            }
            _ => out.push(block),
        }
    }
}

/// Classify a figure: the explicit type parameter wins, the recognizer
/// decides otherwise.
pub fn figure_kind(figure: &ContentBlock, recognizer: &dyn FigureTypeRecognizer) -> FigureKind {
    match figure.parameters.get(FIGURE_TYPE_PARAMETER) {
        Some("table") => FigureKind::Table,
        Some("figure") => FigureKind::Figure,
        _ if recognizer.is_table(figure) => FigureKind::Table,
        _ => FigureKind::Figure,
    }
}

/// Whether a caption is the last content of its figure.
///
/// The caption may sit directly in the figure or in one metadata wrapper
/// (`figure > caption` or `figure > metadata > caption`); both shapes
/// are treated the same.
pub fn is_caption_last(caption: &Node<'_>) -> bool {
    if caption.next_sibling().is_some() {
        return false;
    }
    match caption.parent {
        Some(parent) if is_metadata(parent.block) => parent.next_sibling().is_none(),
        _ => true,
    }
}

/// The figure enclosing a caption, through at most one metadata wrapper.
pub fn enclosing_figure<'a>(caption: &Node<'a>) -> Option<&'a ContentBlock> {
    let parent = caption.parent?;
    let figure = if is_metadata(parent.block) {
        parent.parent?
    } else {
        parent
    };
    matches!(figure.block.kind, BlockKind::Figure).then_some(figure.block)
}
