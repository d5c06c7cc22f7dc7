//! Default LaTeX templates and escaping helpers.

use super::context::{Node, RenderContext};
use super::figure::{enclosing_figure, figure_kind, is_caption_last};
use super::inline::{is_numbering, is_raw_latex};
use super::template::TemplateRegistry;
use crate::error::{Error, Result};
use crate::model::{BlockKind, ContentBlock, Format, ResourceReference, ResourceType};

/// Escape text for use in LaTeX body text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '#' | '$' | '%' | '&' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a URL for `\url` and `\href`.
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if matches!(c, '%' | '#' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Turn an identifier into a safe `\label` key.
pub fn label(id: &str) -> String {
    let key: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '.'))
        .collect();
    if key.is_empty() {
        "label".to_string()
    } else {
        key
    }
}

/// Register the default templates.
pub fn register_defaults(registry: &mut TemplateRegistry) {
    registry.register("paragraph", paragraph);
    registry.register("header", header);
    registry.register("bulleted-list", bulleted_list);
    registry.register("numbered-list", numbered_list);
    registry.register("list-item", list_item);
    registry.register("definition-list", definition_list);
    registry.register("definition-term", definition_term);
    registry.register("definition-description", definition_description);
    registry.register("table", table);
    registry.register("table-row", table_row);
    registry.register("table-cell", table_cell);
    registry.register("table-head-cell", table_head_cell);
    registry.register("figure", figure);
    registry.register("figure-caption", figure_caption);
    registry.register("link", link);
    registry.register("image", image);
    registry.register("word", word);
    registry.register("space", space);
    registry.register("special-symbol", special_symbol);
    registry.register("format", format);
    registry.register("raw", raw);
    registry.register("id-anchor", id_anchor);
    registry.register("horizontal-rule", horizontal_rule);
    registry.register("new-line", new_line);
    registry.register("verbatim", verbatim);
}

fn unexpected(template: &str, block: &ContentBlock) -> Error {
    Error::template(template, format!("cannot render a {} block", block.tag()))
}

fn environment(name: &str, body: &str) -> String {
    format!("\\begin{{{name}}}\n{}\n\\end{{{name}}}\n\n", body.trim_end())
}

fn paragraph(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let body = ctx.render_children(node);
    if body.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}\n\n", body.trim()))
}

fn header(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let BlockKind::Header { level, ref id } = node.block.kind else {
        return Err(unexpected("header", node.block));
    };

    const ARTICLE: [&str; 6] = [
        "section",
        "subsection",
        "subsubsection",
        "paragraph",
        "subparagraph",
        "subparagraph",
    ];
    const BOOK: [&str; 6] = [
        "chapter",
        "section",
        "subsection",
        "subsubsection",
        "paragraph",
        "subparagraph",
    ];
    let commands = match ctx.options().document_class.as_str() {
        "book" | "report" => &BOOK,
        _ => &ARTICLE,
    };
    let command = commands[usize::from(level.clamp(1, 6)) - 1];

    let mut out = format!("\\{}{{{}}}\n", command, ctx.render_inline(node).trim());
    if let Some(id) = id {
        out.push_str(&format!("\\label{{{}}}\n", label(id)));
    }
    out.push('\n');
    Ok(out)
}

fn list(node: &Node<'_>, ctx: &mut RenderContext<'_>, env: &str) -> Result<String> {
    if node.block.children.is_empty() {
        return Ok(String::new());
    }
    Ok(environment(env, &ctx.render_children(node)))
}

fn bulleted_list(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    list(node, ctx, "itemize")
}

fn numbered_list(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    list(node, ctx, "enumerate")
}

fn definition_list(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    list(node, ctx, "description")
}

fn list_item(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    Ok(format!("\\item {}\n", ctx.render_children(node).trim()))
}

fn definition_term(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    Ok(format!("\\item[{{{}}}] ", ctx.render_inline(node).trim()))
}

fn definition_description(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let after_term = matches!(
        node.previous_sibling().map(|b| &b.kind),
        Some(BlockKind::DefinitionTerm)
    );
    let prefix = if after_term { "" } else { "\\item[] " };
    Ok(format!("{}{}\n", prefix, ctx.render_children(node).trim()))
}

fn column_count(table: &ContentBlock) -> usize {
    table
        .children
        .iter()
        .filter(|row| matches!(row.kind, BlockKind::TableRow))
        .map(|row| row.children.len())
        .max()
        .unwrap_or(0)
}

fn table(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let columns = column_count(node.block);
    if columns == 0 {
        return Ok(String::new());
    }
    let spec = format!("|{}", "l|".repeat(columns));
    Ok(format!(
        "\\begin{{tabular}}{{{}}}\n\\hline\n{}\\end{{tabular}}\n\n",
        spec,
        ctx.render_children(node)
    ))
}

fn table_row(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let columns = node
        .parent
        .map(|table| column_count(table.block))
        .unwrap_or(node.block.children.len());

    let mut cells = Vec::with_capacity(columns);
    for (index, block) in node.block.children.iter().enumerate() {
        let cell = Node {
            block,
            siblings: &node.block.children,
            index,
            parent: Some(node),
        };
        cells.push(ctx.render_node(&cell));
    }
    cells.resize(columns.max(cells.len()), String::new());
    Ok(format!("{} \\\\\n\\hline\n", cells.join(" & ")))
}

fn table_cell(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    Ok(ctx.render_inline(node).trim().to_string())
}

fn table_head_cell(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let text = ctx.render_inline(node);
    let text = text.trim();
    if text.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("\\textbf{{{}}}", text))
}

fn figure(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let kind = figure_kind(node.block, ctx.recognizer());
    ctx.push_figure(kind);
    let body = ctx.render_children(node);
    ctx.pop_figure();

    let env = kind.environment();
    Ok(format!(
        "\\begin{{{env}}}[htbp]\n\\centering\n{}\n\\end{{{env}}}\n\n",
        body.trim()
    ))
}

fn figure_caption(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let text = ctx.render_inline(node);
    let text = text.trim();

    // Outside a float a caption is plain text
    if ctx.current_figure().is_none() {
        return Ok(format!("{}\n\n", text));
    }

    let mut out = format!("\\caption{{{}}}\n", text);
    if let Some(id) = enclosing_figure(node).and_then(|f| f.parameters.get("id")) {
        out.push_str(&format!("\\label{{{}}}\n", label(id)));
    }
    if !is_caption_last(node) {
        out.push_str("\\medskip\n");
    }
    Ok(out)
}

/// Link target as a URL, with the anchor appended.
fn link_url(reference: &ResourceReference) -> String {
    match reference.anchor() {
        Some(anchor) if !reference.reference.contains('#') => {
            format!("{}#{}", reference.reference, anchor)
        }
        _ => reference.reference.clone(),
    }
}

fn link(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let BlockKind::Link {
        ref reference,
        freestanding,
    } = node.block.kind
    else {
        return Err(unexpected("link", node.block));
    };

    let text = ctx.render_inline(node);
    let text = text.trim();
    let has_label = !text.is_empty() && !freestanding;
    let fallback = || escape(&reference.reference);

    let out = match reference.resource_type {
        ResourceType::Url if has_label => {
            format!("\\href{{{}}}{{{}}}", escape_url(&link_url(reference)), text)
        }
        ResourceType::Url => format!("\\url{{{}}}", escape_url(&link_url(reference))),
        ResourceType::Path if has_label => {
            format!("\\href{{run:{}}}{{{}}}", escape_url(&reference.reference), text)
        }
        ResourceType::Path => format!("\\url{{run:{}}}", escape_url(&reference.reference)),
        ResourceType::Mailto => {
            let label = if has_label { text.to_string() } else { fallback() };
            format!(
                "\\href{{mailto:{}}}{{{}}}",
                escape_url(&reference.reference),
                label
            )
        }
        ResourceType::Document if reference.is_self_reference() => match reference.anchor() {
            Some(anchor) => format!("\\hyperref[{}]{{{}}}", label(anchor), text),
            None => text.to_string(),
        },
        ResourceType::Document | ResourceType::Attachment | ResourceType::Data => {
            if has_label {
                text.to_string()
            } else {
                fallback()
            }
        }
    };
    Ok(out)
}

fn image(node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    let BlockKind::Image { ref reference, .. } = node.block.kind else {
        return Err(unexpected("image", node.block));
    };

    let out = match reference.resource_type {
        ResourceType::Path => format!(
            "\\includegraphics[width=\\linewidth,keepaspectratio]{{{}}}",
            reference.reference
        ),
        ResourceType::Url => format!("\\url{{{}}}", escape_url(&reference.reference)),
        ResourceType::Data => String::new(),
        _ => {
            let alt = node.block.parameters.get("alt").unwrap_or(&reference.reference);
            format!("\\texttt{{{}}}", escape(alt))
        }
    };
    Ok(out)
}

fn word(node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    match node.block.kind {
        BlockKind::Word { ref text } => Ok(escape(text)),
        _ => Err(unexpected("word", node.block)),
    }
}

fn space(_node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    Ok(" ".to_string())
}

fn special_symbol(node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    match node.block.kind {
        BlockKind::SpecialSymbol { symbol } => Ok(escape(symbol.encode_utf8(&mut [0; 4]))),
        _ => Err(unexpected("special-symbol", node.block)),
    }
}

fn format(node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
    let BlockKind::Format { format } = node.block.kind else {
        return Err(unexpected("format", node.block));
    };
    // LaTeX numbers floats and sections itself
    if is_numbering(node.block) {
        return Ok(String::new());
    }

    let inner = ctx.render_children(node);
    let command = match format {
        Format::None => return Ok(inner),
        Format::Bold => "textbf",
        Format::Italic => "textit",
        Format::Underlined => "uline",
        Format::Strikedout => "sout",
        Format::Superscript => "textsuperscript",
        Format::Subscript => "textsubscript",
        Format::Monospace => "texttt",
    };
    Ok(format!("\\{}{{{}}}", command, inner))
}

fn raw(node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    match node.block.kind {
        BlockKind::Raw { ref content, .. } if is_raw_latex(node.block) => Ok(content.clone()),
        BlockKind::Raw { ref syntax, .. } => {
            log::debug!("Skipping raw content in syntax {}", syntax);
            Ok(String::new())
        }
        _ => Err(unexpected("raw", node.block)),
    }
}

fn id_anchor(node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    match node.block.kind {
        BlockKind::IdAnchor { ref name } => {
            Ok(format!("\\phantomsection\\label{{{}}}", label(name)))
        }
        _ => Err(unexpected("id-anchor", node.block)),
    }
}

fn horizontal_rule(_node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    Ok("\\noindent\\rule{\\linewidth}{0.4pt}\n\n".to_string())
}

fn new_line(_node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    Ok("\\newline\n".to_string())
}

fn verbatim(node: &Node<'_>, _ctx: &mut RenderContext<'_>) -> Result<String> {
    let BlockKind::Verbatim {
        ref content,
        inline,
    } = node.block.kind
    else {
        return Err(unexpected("verbatim", node.block));
    };

    if !inline {
        return Ok(environment("verbatim", content));
    }

    let content = content.replace(['\n', '\r'], " ");
    let delimiter = ['|', '!', '+', '=', '@', '/']
        .into_iter()
        .find(|d| !content.contains(*d))
        .ok_or_else(|| Error::template("verbatim", "no free \\verb delimiter"))?;
    Ok(format!("\\verb{}{}{}", delimiter, content, delimiter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportOptions;

    fn render(blocks: &[ContentBlock]) -> String {
        render_with(blocks, ExportOptions::default())
    }

    fn render_with(blocks: &[ContentBlock], options: ExportOptions) -> String {
        let registry = TemplateRegistry::with_defaults();
        let mut ctx = RenderContext::new(&registry, &options);
        ctx.render(blocks)
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("50% of $x_1 & {y}"), "50\\% of \\$x\\_1 \\& \\{y\\}");
        assert_eq!(escape("a~b^c\\d"), "a\\textasciitilde{}b\\textasciicircum{}c\\textbackslash{}d");
        assert_eq!(escape_url("http://x/a%20b#top"), "http://x/a\\%20b\\#top");
        assert_eq!(label("Hello World!"), "HelloWorld");
        assert_eq!(label("***"), "label");
    }

    #[test]
    fn test_headers() {
        let mut header = ContentBlock::header(2, "Install & run");
        header.kind = BlockKind::Header {
            level: 2,
            id: Some("Hinstall".into()),
        };
        assert_eq!(
            render(&[header.clone()]),
            "\\subsection{Install \\& run}\n\\label{Hinstall}\n\n"
        );
        assert!(render_with(&[header], ExportOptions::new().with_document_class("report"))
            .starts_with("\\section{"));
        assert!(render(&[ContentBlock::header(6, "Deep")]).starts_with("\\subparagraph{Deep}"));
    }

    #[test]
    fn test_lists() {
        let list = ContentBlock::with_children(
            BlockKind::NumberedList,
            vec![
                ContentBlock::with_children(BlockKind::ListItem, ContentBlock::text("one")),
                ContentBlock::with_children(BlockKind::ListItem, ContentBlock::text("two")),
            ],
        );
        assert_eq!(
            render(&[list]),
            "\\begin{enumerate}\n\\item one\n\\item two\n\\end{enumerate}\n\n"
        );
    }

    #[test]
    fn test_table() {
        let row = |cells: Vec<ContentBlock>| ContentBlock::with_children(BlockKind::TableRow, cells);
        let table = ContentBlock::with_children(
            BlockKind::Table,
            vec![
                row(vec![
                    ContentBlock::with_children(BlockKind::TableHeadCell, ContentBlock::text("Name")),
                    ContentBlock::with_children(BlockKind::TableHeadCell, ContentBlock::text("Value")),
                ]),
                row(vec![ContentBlock::with_children(
                    BlockKind::TableCell,
                    vec![ContentBlock::paragraph("a"), ContentBlock::paragraph("b")],
                )]),
            ],
        );
        assert_eq!(
            render(&[table]),
            "\\begin{tabular}{|l|l|}\n\\hline\n\\textbf{Name} & \\textbf{Value} \\\\\n\\hline\na b &  \\\\\n\\hline\n\\end{tabular}\n\n"
        );
    }

    #[test]
    fn test_figure_with_caption() {
        let image = ContentBlock::new(BlockKind::Image {
            reference: ResourceReference::path("files/attachments/w/s/p/a1.png"),
            freestanding: false,
        });
        let caption = ContentBlock::with_children(
            BlockKind::FigureCaption,
            vec![ContentBlock::paragraph("The logo")],
        );
        let figure = ContentBlock::with_children(BlockKind::Figure, vec![image, caption])
            .with_parameter("id", "fig-logo");

        let out = render(&[figure]);
        assert!(out.starts_with("\\begin{figure}[htbp]\n\\centering\n"));
        assert!(out.contains("\\includegraphics[width=\\linewidth,keepaspectratio]{files/attachments/w/s/p/a1.png}"));
        assert!(out.contains("\\caption{The logo}\n\\label{fig-logo}"));
        assert!(!out.contains("\\medskip"));
        assert!(out.ends_with("\\end{figure}\n\n"));
    }

    #[test]
    fn test_links() {
        let link = |reference: ResourceReference, text: &str| {
            ContentBlock::with_children(
                BlockKind::Link {
                    reference,
                    freestanding: false,
                },
                ContentBlock::text(text),
            )
        };

        assert_eq!(
            render(&[link(ResourceReference::url("https://x.org/a_b"), "site")]),
            "\\href{https://x.org/a_b}{site}"
        );
        assert_eq!(
            render(&[link(ResourceReference::document("").with_anchor("Hintro"), "intro")]),
            "\\hyperref[Hintro]{intro}"
        );
        assert_eq!(
            render(&[link(ResourceReference::document(""), "here")]),
            "here"
        );
        assert_eq!(
            render(&[ContentBlock::new(BlockKind::Link {
                reference: ResourceReference::url("https://x.org"),
                freestanding: true,
            })]),
            "\\url{https://x.org}"
        );
    }

    #[test]
    fn test_formats_and_raw() {
        let bold = ContentBlock::with_children(
            BlockKind::Format {
                format: Format::Bold,
            },
            ContentBlock::text("big"),
        );
        assert_eq!(render(&[bold]), "\\textbf{big}");

        let latex = ContentBlock::new(BlockKind::Raw {
            syntax: "latex/1.0".into(),
            content: "\\LaTeX{}".into(),
        });
        let html = ContentBlock::new(BlockKind::Raw {
            syntax: "html/5.0".into(),
            content: "<b>x</b>".into(),
        });
        assert_eq!(render(&[latex, html]), "\\LaTeX{}");
    }

    #[test]
    fn test_verbatim() {
        let inline = ContentBlock::new(BlockKind::Verbatim {
            content: "a|b".into(),
            inline: true,
        });
        assert_eq!(render(&[inline]), "\\verb!a|b!");

        let block = ContentBlock::new(BlockKind::Verbatim {
            content: "fn main() {}".into(),
            inline: false,
        });
        assert_eq!(
            render(&[block]),
            "\\begin{verbatim}\nfn main() {}\n\\end{verbatim}\n\n"
        );
    }
}
