//! Block templates and their registry.

use super::context::{Node, RenderContext};
use super::figure::{ContentFigureRecognizer, FigureTypeRecognizer};
use crate::error::Result;
use crate::export::ExportOptions;
use crate::model::{ContentBlock, EntityReference};
use std::collections::HashMap;
use std::fmt;

/// Block parameter selecting a template by key, overriding the block tag.
pub const TEMPLATE_PARAMETER: &str = "template";

/// Produces the text of one block.
///
/// Closures with the matching signature are templates too.
///
/// # Example
///
/// ```
/// use wikitex::render::{Node, RenderContext, TemplateRegistry};
///
/// let mut registry = TemplateRegistry::with_defaults();
/// let rule = |_: &Node<'_>, _: &mut RenderContext<'_>| -> wikitex::Result<String> {
///     Ok("\\bigskip\n\n".to_string())
/// };
/// registry.register("horizontal-rule", rule);
/// assert!(registry.contains("horizontal-rule"));
/// ```
pub trait BlockTemplate: Send + Sync {
    /// Render `node`; `ctx` renders descendants.
    fn render(&self, node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String>;
}

impl<F> BlockTemplate for F
where
    F: Fn(&Node<'_>, &mut RenderContext<'_>) -> Result<String> + Send + Sync,
{
    fn render(&self, node: &Node<'_>, ctx: &mut RenderContext<'_>) -> Result<String> {
        self(node, ctx)
    }
}

/// Templates keyed by block tag or override key.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Box<dyn BlockTemplate>>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the default LaTeX templates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        super::latex::register_defaults(&mut registry);
        registry
    }

    /// Register a template, replacing any previous one under `key`.
    pub fn register(&mut self, key: impl Into<String>, template: impl BlockTemplate + 'static) {
        self.templates.insert(key.into(), Box::new(template));
    }

    /// Remove a template.
    pub fn unregister(&mut self, key: &str) -> bool {
        self.templates.remove(key).is_some()
    }

    /// Look up a template.
    pub fn get(&self, key: &str) -> Option<&dyn BlockTemplate> {
        self.templates.get(key).map(|t| t.as_ref())
    }

    /// Check if a template is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.templates.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Output of rendering one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    /// LaTeX text
    pub latex: String,
    /// Blocks whose template failed and produced nothing
    pub failed_blocks: u32,
}

/// Renders whole documents with a template registry.
pub struct TemplateProcessor {
    registry: TemplateRegistry,
    recognizer: Box<dyn FigureTypeRecognizer>,
}

impl TemplateProcessor {
    /// Create a new processor.
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            recognizer: Box::new(ContentFigureRecognizer),
        }
    }

    /// Use another figure type recognizer.
    pub fn with_recognizer(mut self, recognizer: impl FigureTypeRecognizer + 'static) -> Self {
        self.recognizer = Box::new(recognizer);
        self
    }

    /// The template registry.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Mutable access to the template registry.
    pub fn registry_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.registry
    }

    /// Render the blocks of `document`.
    pub fn render(
        &self,
        blocks: &[ContentBlock],
        document: Option<&EntityReference>,
        options: &ExportOptions,
    ) -> RenderedDocument {
        let mut ctx =
            RenderContext::new(&self.registry, options).with_recognizer(self.recognizer.as_ref());
        if let Some(document) = document {
            ctx = ctx.with_document(document);
        }
        let latex = ctx.render(blocks);
        RenderedDocument {
            latex,
            failed_blocks: ctx.failed_blocks(),
        }
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new(TemplateRegistry::with_defaults())
    }
}

impl fmt::Debug for TemplateProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateProcessor")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
