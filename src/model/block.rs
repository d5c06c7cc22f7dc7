//! Content blocks: the n-ary tree a wiki document is made of.

use super::{Parameters, ResourceReference};
use serde::{Deserialize, Serialize};

/// Discriminant of a content block.
///
/// The set is closed; templates are looked up by [`BlockKind::tag`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    /// Root of a document tree
    Document,
    /// Paragraph
    Paragraph,
    /// Unordered list
    BulletedList,
    /// Ordered list
    NumberedList,
    /// Item of an ordered or unordered list
    ListItem,
    /// Definition list
    DefinitionList,
    /// Term of a definition list
    DefinitionTerm,
    /// Description of a definition list
    DefinitionDescription,
    /// Table
    Table,
    /// Table row
    TableRow,
    /// Table data cell
    TableCell,
    /// Table header cell
    TableHeadCell,
    /// Figure (image or table with a caption)
    Figure,
    /// Caption of a figure
    FigureCaption,
    /// Section heading
    Header {
        /// Heading level (1-6)
        level: u8,
        /// Anchor identifier
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Hyperlink; children are the label
    Link {
        /// Link target
        reference: ResourceReference,
        /// Whether the link is a bare URL without label
        #[serde(default)]
        freestanding: bool,
    },
    /// Image
    Image {
        /// Image source
        reference: ResourceReference,
        /// Whether the image was written as a bare URL
        #[serde(default)]
        freestanding: bool,
    },
    /// A single word
    Word {
        /// Word text
        text: String,
    },
    /// A single space
    Space,
    /// Punctuation or other symbol
    SpecialSymbol {
        /// The symbol
        symbol: char,
    },
    /// Text formatting (a span when the format is `none`)
    Format {
        /// Applied format
        format: Format,
    },
    /// Content in a target syntax, passed through untouched when it matches
    Raw {
        /// Syntax identifier, e.g. `latex/1.0`
        syntax: String,
        /// Raw content
        content: String,
    },
    /// Marks the output of a macro; children are the generated content
    MacroMarker {
        /// Macro name
        name: String,
        /// Macro source content
        #[serde(default)]
        content: String,
        /// Whether the macro was called inline
        #[serde(default)]
        inline: bool,
    },
    /// Anchor target
    IdAnchor {
        /// Anchor name
        name: String,
    },
    /// Wrapper carrying metadata in its parameters (e.g. `source`)
    Metadata,
    /// Horizontal rule
    HorizontalRule,
    /// Forced line break
    NewLine,
    /// Preformatted text
    Verbatim {
        /// Verbatim content
        content: String,
        /// Whether the verbatim text is inline
        #[serde(default)]
        inline: bool,
    },
    /// Grouping of blocks (embedded document)
    Group,
    /// Structural container without semantics
    Composite,
}

impl BlockKind {
    /// Template lookup key of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Document => "document",
            BlockKind::Paragraph => "paragraph",
            BlockKind::BulletedList => "bulleted-list",
            BlockKind::NumberedList => "numbered-list",
            BlockKind::ListItem => "list-item",
            BlockKind::DefinitionList => "definition-list",
            BlockKind::DefinitionTerm => "definition-term",
            BlockKind::DefinitionDescription => "definition-description",
            BlockKind::Table => "table",
            BlockKind::TableRow => "table-row",
            BlockKind::TableCell => "table-cell",
            BlockKind::TableHeadCell => "table-head-cell",
            BlockKind::Figure => "figure",
            BlockKind::FigureCaption => "figure-caption",
            BlockKind::Header { .. } => "header",
            BlockKind::Link { .. } => "link",
            BlockKind::Image { .. } => "image",
            BlockKind::Word { .. } => "word",
            BlockKind::Space => "space",
            BlockKind::SpecialSymbol { .. } => "special-symbol",
            BlockKind::Format { .. } => "format",
            BlockKind::Raw { .. } => "raw",
            BlockKind::MacroMarker { .. } => "macro-marker",
            BlockKind::IdAnchor { .. } => "id-anchor",
            BlockKind::Metadata => "metadata",
            BlockKind::HorizontalRule => "horizontal-rule",
            BlockKind::NewLine => "new-line",
            BlockKind::Verbatim { .. } => "verbatim",
            BlockKind::Group => "group",
            BlockKind::Composite => "composite",
        }
    }

    /// Whether blocks of this kind stand on their own rather than flow
    /// inside a paragraph.
    ///
    /// This is a fixed table; macro markers and verbatim blocks carry
    /// their own flag.
    pub fn is_standalone(&self) -> bool {
        match self {
            BlockKind::Document
            | BlockKind::Paragraph
            | BlockKind::BulletedList
            | BlockKind::NumberedList
            | BlockKind::ListItem
            | BlockKind::DefinitionList
            | BlockKind::DefinitionTerm
            | BlockKind::DefinitionDescription
            | BlockKind::Table
            | BlockKind::TableRow
            | BlockKind::TableCell
            | BlockKind::TableHeadCell
            | BlockKind::Figure
            | BlockKind::FigureCaption
            | BlockKind::Header { .. }
            | BlockKind::HorizontalRule
            | BlockKind::Group => true,
            BlockKind::MacroMarker { inline, .. } | BlockKind::Verbatim { inline, .. } => !inline,
            BlockKind::Link { .. }
            | BlockKind::Image { .. }
            | BlockKind::Word { .. }
            | BlockKind::Space
            | BlockKind::SpecialSymbol { .. }
            | BlockKind::Format { .. }
            | BlockKind::Raw { .. }
            | BlockKind::IdAnchor { .. }
            | BlockKind::Metadata
            | BlockKind::NewLine
            | BlockKind::Composite => false,
        }
    }

    /// Whether the kind is transparent: it only groups its children.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            BlockKind::Document | BlockKind::Metadata | BlockKind::Composite
        )
    }
}

/// Text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Plain span (used with a `class` parameter)
    None,
    /// Bold
    Bold,
    /// Italic
    Italic,
    /// Underlined
    Underlined,
    /// Struck out
    Strikedout,
    /// Superscript
    Superscript,
    /// Subscript
    Subscript,
    /// Monospace
    Monospace,
}

/// A node of the content tree.
///
/// Children are owned by their parent; siblings are positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block kind and its payload
    #[serde(flatten)]
    pub kind: BlockKind,

    /// Ordered parameters (class, template override, ...)
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,

    /// Child blocks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentBlock>,
}

impl ContentBlock {
    /// Create a block without parameters or children.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            parameters: Parameters::new(),
            children: Vec::new(),
        }
    }

    /// Create a block with children.
    pub fn with_children(kind: BlockKind, children: Vec<ContentBlock>) -> Self {
        Self {
            kind,
            parameters: Parameters::new(),
            children,
        }
    }

    /// Builder-style parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    /// Add a child block.
    pub fn add_child(&mut self, child: ContentBlock) {
        self.children.push(child);
    }

    /// A word block.
    pub fn word(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Word { text: text.into() })
    }

    /// A space block.
    pub fn space() -> Self {
        Self::new(BlockKind::Space)
    }

    /// A special symbol block.
    pub fn symbol(symbol: char) -> Self {
        Self::new(BlockKind::SpecialSymbol { symbol })
    }

    /// Split text into word, space and symbol blocks.
    pub fn text(text: &str) -> Vec<ContentBlock> {
        let mut blocks = Vec::new();
        let mut word = String::new();
        for c in text.chars() {
            if c.is_alphanumeric() {
                word.push(c);
                continue;
            }
            if !word.is_empty() {
                blocks.push(Self::word(std::mem::take(&mut word)));
            }
            if c.is_whitespace() {
                if !matches!(blocks.last().map(|b| &b.kind), Some(BlockKind::Space)) {
                    blocks.push(Self::space());
                }
            } else {
                blocks.push(Self::symbol(c));
            }
        }
        if !word.is_empty() {
            blocks.push(Self::word(word));
        }
        blocks
    }

    /// A paragraph holding the given text.
    pub fn paragraph(text: &str) -> Self {
        Self::with_children(BlockKind::Paragraph, Self::text(text))
    }

    /// A heading holding the given text.
    pub fn header(level: u8, text: &str) -> Self {
        Self::with_children(
            BlockKind::Header {
                level: level.clamp(1, 6),
                id: None,
            },
            Self::text(text),
        )
    }

    /// Template lookup key of this block's kind.
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    /// Whether this block is a space.
    pub fn is_space(&self) -> bool {
        matches!(self.kind, BlockKind::Space)
    }

    /// Check if a class is set in the `class` parameter.
    pub fn has_class(&self, class: &str) -> bool {
        self.parameters.classes().any(|c| c == class)
    }

    /// Plain text of this block and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            BlockKind::Word { text } => out.push_str(text),
            BlockKind::Space => out.push(' '),
            BlockKind::SpecialSymbol { symbol } => out.push(*symbol),
            BlockKind::Verbatim { content, .. } => out.push_str(content),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_splitting() {
        let blocks = ContentBlock::text("Hello, big  world");
        let tags: Vec<_> = blocks.iter().map(|b| b.tag()).collect();
        assert_eq!(
            tags,
            vec!["word", "special-symbol", "space", "word", "space", "word"]
        );
    }

    #[test]
    fn test_plain_text() {
        let p = ContentBlock::paragraph("Hello, world!");
        assert_eq!(p.plain_text(), "Hello, world!");
    }

    #[test]
    fn test_standalone_table() {
        assert!(BlockKind::Paragraph.is_standalone());
        assert!(!BlockKind::Space.is_standalone());
        assert!(BlockKind::MacroMarker {
            name: "toc".into(),
            content: String::new(),
            inline: false
        }
        .is_standalone());
        assert!(!BlockKind::MacroMarker {
            name: "info".into(),
            content: String::new(),
            inline: true
        }
        .is_standalone());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "type": "paragraph",
            "parameters": {"class": "lead"},
            "children": [
                {"type": "word", "text": "Hi"},
                {"type": "special-symbol", "symbol": "!"},
                {"type": "image", "reference": {"type": "attach", "reference": "a.png"}}
            ]
        }"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.kind, BlockKind::Paragraph);
        assert!(block.has_class("lead"));
        assert_eq!(block.children.len(), 3);
        assert_eq!(block.plain_text(), "Hi!");
    }
}
