//! Flattening block trees into inline content.
//!
//! Captions, headings and table cells become LaTeX command arguments, so
//! their content must not contain standalone blocks. [`flatten`] removes
//! them, keeps their inline content and separates what used to be
//! separate blocks with a single space.

use crate::model::{BlockKind, ContentBlock};

/// Span classes marking generated numbers (LaTeX numbers on its own).
pub const NUMBERING_CLASSES: &[&str] = &["figure-number", "table-number", "heading-number"];

/// Transient flatten output: content or a removed-block boundary.
#[derive(Debug)]
enum Token {
    Block(ContentBlock),
    Boundary,
}

/// Flatten a sequence of blocks into inline blocks.
///
/// A space is inserted where a standalone block was removed, unless the
/// content on either side already is a space. The result never starts or
/// ends with an inserted space.
pub fn flatten(blocks: &[ContentBlock]) -> Vec<ContentBlock> {
    let mut tokens = Vec::new();
    collect(blocks, &mut tokens);
    resolve(tokens)
}

/// Flatten and reduce to plain text.
pub fn plain_text(blocks: &[ContentBlock]) -> String {
    flatten(blocks)
        .iter()
        .map(ContentBlock::plain_text)
        .collect()
}

/// Whether a block is a generated-number span.
pub fn is_numbering(block: &ContentBlock) -> bool {
    matches!(block.kind, BlockKind::Format { .. })
        && NUMBERING_CLASSES.iter().any(|class| block.has_class(class))
}

/// Whether a block carries raw content in the LaTeX syntax.
pub fn is_raw_latex(block: &ContentBlock) -> bool {
    matches!(&block.kind, BlockKind::Raw { syntax, .. } if syntax.starts_with("latex"))
}

/// Whether a macro's output is LaTeX only and can stay inline.
fn is_latex_macro(block: &ContentBlock) -> bool {
    !block.children.is_empty() && block.children.iter().all(is_raw_latex)
}

fn collect(blocks: &[ContentBlock], out: &mut Vec<Token>) {
    for block in blocks {
        if is_numbering(block) {
            continue;
        }
        match &block.kind {
            BlockKind::MacroMarker { inline: true, .. } => collect(&block.children, out),
            BlockKind::MacroMarker { .. } if is_latex_macro(block) => {
                collect(&block.children, out)
            }
            BlockKind::MacroMarker { .. } => out.push(Token::Boundary),
            kind if kind.is_container() => collect(&block.children, out),
            kind if kind.is_standalone() => {
                out.push(Token::Boundary);
                collect(&block.children, out);
                out.push(Token::Boundary);
            }
            _ if block.children.is_empty() => out.push(Token::Block(block.clone())),
            _ => {
                // Inline wrappers (format, link) keep their shape
                let mut inline = ContentBlock::new(block.kind.clone());
                inline.parameters = block.parameters.clone();
                inline.children = flatten(&block.children);
                out.push(Token::Block(inline));
            }
        }
    }
}

fn resolve(tokens: Vec<Token>) -> Vec<ContentBlock> {
    let mut out: Vec<ContentBlock> = Vec::with_capacity(tokens.len());
    let mut pending_boundary = false;

    for token in tokens {
        match token {
            Token::Boundary => pending_boundary = true,
            Token::Block(block) => {
                if pending_boundary {
                    let previous_is_space = out.last().map(ends_with_space);
                    // Nothing before means a leading boundary
                    if previous_is_space == Some(false) && !starts_with_space(&block) {
                        out.push(ContentBlock::space());
                    }
                    pending_boundary = false;
                }
                out.push(block);
            }
        }
    }
    out
}

/// Whether the first leaf of a block is a space.
fn starts_with_space(block: &ContentBlock) -> bool {
    match block.children.first() {
        Some(first) => starts_with_space(first),
        None => block.is_space(),
    }
}

/// Whether the last leaf of a block is a space.
fn ends_with_space(block: &ContentBlock) -> bool {
    match block.children.last() {
        Some(last) => ends_with_space(last),
        None => block.is_space(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(blocks: &[ContentBlock]) -> String {
        blocks.iter().map(ContentBlock::plain_text).collect()
    }

    #[test]
    fn test_inline_input_is_unchanged() {
        let blocks = ContentBlock::text("already inline text");
        assert_eq!(flatten(&blocks), blocks);
    }

    #[test]
    fn test_adjacent_paragraphs_get_one_space() {
        let blocks = vec![
            ContentBlock::paragraph("first paragraph"),
            ContentBlock::paragraph("second paragraph"),
        ];
        let flat = flatten(&blocks);
        assert_eq!(words(&flat), "first paragraph second paragraph");
        assert!(!flat.first().unwrap().is_space());
        assert!(!flat.last().unwrap().is_space());
    }

    #[test]
    fn test_explicit_space_is_not_doubled() {
        let mut first = ContentBlock::paragraph("first");
        first.add_child(ContentBlock::space());
        let blocks = vec![first, ContentBlock::paragraph("second")];
        let flat = flatten(&blocks);
        assert_eq!(words(&flat), "first second");

        let blocks = vec![
            ContentBlock::paragraph("first"),
            ContentBlock::space(),
            ContentBlock::paragraph("second"),
        ];
        assert_eq!(words(&flatten(&blocks)), "first second");
    }

    #[test]
    fn test_space_inside_neighbouring_wrapper_is_not_doubled() {
        let bold = |children: Vec<ContentBlock>| {
            ContentBlock::with_children(
                BlockKind::Format {
                    format: crate::model::Format::Bold,
                },
                children,
            )
        };

        let blocks = vec![
            ContentBlock::paragraph("first"),
            bold(vec![ContentBlock::space(), ContentBlock::word("second")]),
        ];
        assert_eq!(plain_text(&blocks), "first second");

        let blocks = vec![
            bold(vec![ContentBlock::word("first"), ContentBlock::space()]),
            ContentBlock::paragraph("second"),
        ];
        assert_eq!(plain_text(&blocks), "first second");

        let blocks = vec![
            ContentBlock::paragraph("first"),
            bold(vec![ContentBlock::word("second")]),
        ];
        assert_eq!(plain_text(&blocks), "first second");
    }

    #[test]
    fn test_numbering_spans_are_stripped() {
        let number = ContentBlock::with_children(
            BlockKind::Format {
                format: crate::model::Format::None,
            },
            vec![ContentBlock::word("Figure"), ContentBlock::space(), ContentBlock::word("1")],
        )
        .with_parameter("class", "figure-number");
        let mut caption = vec![number, ContentBlock::symbol(':')];
        caption.push(ContentBlock::space());
        caption.push(ContentBlock::word("Overview"));

        assert_eq!(plain_text(&caption), ": Overview");
    }

    #[test]
    fn test_latex_macro_stays_inline() {
        let raw = ContentBlock::new(BlockKind::Raw {
            syntax: "latex/1.0".into(),
            content: "$x^2$".into(),
        });
        let latex_macro = ContentBlock::with_children(
            BlockKind::MacroMarker {
                name: "formula".into(),
                content: String::new(),
                inline: false,
            },
            vec![raw.clone()],
        );
        let other_macro = ContentBlock::with_children(
            BlockKind::MacroMarker {
                name: "toc".into(),
                content: String::new(),
                inline: false,
            },
            ContentBlock::text("Contents listing"),
        );

        let blocks = vec![
            ContentBlock::word("Area"),
            ContentBlock::space(),
            latex_macro,
            other_macro,
            ContentBlock::word("end"),
        ];
        let flat = flatten(&blocks);
        assert!(flat.contains(&raw));
        assert!(!words(&flat).contains("Contents"));
        assert_eq!(flat.last(), Some(&ContentBlock::word("end")));
        assert!(flat[flat.len() - 2].is_space());
    }

    #[test]
    fn test_inline_macro_keeps_its_content() {
        let inline_macro = ContentBlock::with_children(
            BlockKind::MacroMarker {
                name: "version".into(),
                content: String::new(),
                inline: true,
            },
            vec![ContentBlock::word("2.1")],
        );
        let blocks = vec![
            ContentBlock::word("Release"),
            ContentBlock::space(),
            inline_macro,
            ContentBlock::word("!"),
        ];
        let flat = flatten(&blocks);
        assert_eq!(words(&flat), "Release 2.1!");
        assert_eq!(flat.len(), 4);
        assert!(!flat
            .iter()
            .any(|b| matches!(b.kind, BlockKind::MacroMarker { .. })));
    }

    #[test]
    fn test_nested_format_is_flattened_in_place() {
        let bold = ContentBlock::with_children(
            BlockKind::Format {
                format: crate::model::Format::Bold,
            },
            vec![ContentBlock::paragraph("a"), ContentBlock::paragraph("b")],
        );
        let flat = flatten(&[bold]);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].plain_text(), "a b");
    }
}
