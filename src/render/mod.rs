//! LaTeX rendering of content blocks.
//!
//! Each block is rendered by the template registered under its tag (or
//! under the key in its `template` parameter). Blocks without a template
//! render their children, so structural kinds need no template at all.

mod context;
pub mod figure;
pub mod inline;
mod latex;
mod template;

pub use context::{Node, RenderContext};
pub use figure::{ContentFigureRecognizer, FigureKind, FigureTypeRecognizer};
pub use latex::{escape, escape_url, label};
pub use template::{
    BlockTemplate, RenderedDocument, TemplateProcessor, TemplateRegistry, TEMPLATE_PARAMETER,
};

use crate::export::ExportOptions;
use crate::model::ContentBlock;

/// Render blocks to LaTeX with the default templates.
pub fn to_latex(blocks: &[ContentBlock], options: &ExportOptions) -> String {
    TemplateProcessor::default()
        .render(blocks, None, options)
        .latex
}
