//! # wikitex
//!
//! Export of wiki document trees to LaTeX packages, with optional PDF
//! compilation.
//!
//! A wiki tree (spaces, documents made of content blocks, attachments)
//! is walked document by document. References to attachments, other
//! documents and remote resources are rewritten to package-relative
//! paths or external URLs, every block is rendered through a LaTeX
//! template, and the results are written into a zip archive together
//! with an `index.tex` master file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wikitex::{export_file, pdf};
//!
//! fn main() -> wikitex::Result<()> {
//!     // Export a tree to a LaTeX package
//!     let stats = export_file("wiki.json", "export.zip")?;
//!     println!("{} documents", stats.document_count);
//!
//!     // Compile it
//!     let config = pdf::PdfBackendConfig::default();
//!     let result = wikitex::to_pdf("export.zip", "build", &config)?;
//!     println!("PDF: {:?}", result.pdf);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Streaming export**: documents are rendered and written one at a time
//! - **Reference rewriting**: attachments are packaged once, remote images
//!   downloaded, links to other documents turned into view URLs
//! - **Template overrides**: any block type, or any block carrying a
//!   `template` parameter, can be rendered by a custom template
//! - **PDF backends**: throwaway container or local processes

pub mod error;
pub mod export;
pub mod fetch;
pub mod model;
pub mod pdf;
pub mod render;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use export::{DocumentSelection, ExportOptions, ExportStats};
pub use fetch::{OfflineFetcher, UrlFetcher};
pub use model::{
    Attachment, BlockKind, ContentBlock, EntityReference, EntityType, Format, Parameters,
    ResourceReference, ResourceType, Space, WikiDocument, WikiTree,
};
pub use pdf::{ConversionResult, PdfBackend, PdfBackendConfig, PdfConverter};
pub use render::{BlockTemplate, TemplateProcessor, TemplateRegistry};
pub use store::{DocumentStore, MemoryStore};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;

use render::FigureTypeRecognizer;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

/// Export a wiki tree JSON file to a package archive with default options.
///
/// # Example
///
/// ```no_run
/// use wikitex::export_file;
///
/// let stats = export_file("wiki.json", "export.zip").unwrap();
/// assert!(!stats.has_warnings());
/// ```
pub fn export_file<P: AsRef<Path>, Q: AsRef<Path>>(tree: P, output: Q) -> Result<ExportStats> {
    Exporter::new().export_file(tree, output)
}

/// Export an in-memory tree to any seekable writer.
pub fn export_tree<W: Write + Seek>(
    tree: &WikiTree,
    writer: W,
    options: &ExportOptions,
) -> Result<(W, ExportStats)> {
    Exporter::new()
        .with_options(options.clone())
        .export(tree, writer)
}

/// Unpack a package archive into `dir` and compile it.
///
/// # Example
///
/// ```no_run
/// use wikitex::{to_pdf, PdfBackend, PdfBackendConfig};
///
/// let config = PdfBackendConfig::new().with_backend(PdfBackend::Process);
/// let result = to_pdf("export.zip", "build", &config).unwrap();
/// for line in result.diagnostics() {
///     eprintln!("{}", line);
/// }
/// ```
pub fn to_pdf<P: AsRef<Path>, Q: AsRef<Path>>(
    archive: P,
    dir: Q,
    config: &PdfBackendConfig,
) -> Result<ConversionResult> {
    let dir = dir.as_ref();
    pdf::unpack_package(archive.as_ref(), dir)?;
    config.build().convert(dir)
}

/// Builder for exporting wiki trees.
///
/// # Example
///
/// ```no_run
/// use wikitex::{DocumentSelection, Exporter};
///
/// let stats = Exporter::new()
///     .with_title("Handbook")
///     .with_table_of_contents(true)
///     .with_scope(DocumentSelection::parse("Handbook.*")?)
///     .offline()
///     .export_file("wiki.json", "handbook.zip")?;
/// println!("{} attachments", stats.attachment_count);
/// # Ok::<(), wikitex::Error>(())
/// ```
pub struct Exporter {
    options: ExportOptions,
    fetcher: Box<dyn UrlFetcher>,
    processor: TemplateProcessor,
}

impl Exporter {
    /// Create a new exporter.
    pub fn new() -> Self {
        Self {
            options: ExportOptions::default(),
            fetcher: fetch::default_fetcher(),
            processor: TemplateProcessor::default(),
        }
    }

    /// Replace all export options.
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the package title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.options = self.options.with_title(title);
        self
    }

    /// Set the package author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.options = self.options.with_author(author);
        self
    }

    /// Enable the cover page.
    pub fn with_cover_page(mut self, enabled: bool) -> Self {
        self.options = self.options.with_cover_page(enabled);
        self
    }

    /// Enable the table of contents.
    pub fn with_table_of_contents(mut self, enabled: bool) -> Self {
        self.options = self.options.with_table_of_contents(enabled);
        self
    }

    /// Restrict the exported documents.
    pub fn with_scope(mut self, scope: DocumentSelection) -> Self {
        self.options = self.options.with_scope(scope);
        self
    }

    /// Never download remote resources.
    pub fn offline(mut self) -> Self {
        self.fetcher = Box::new(OfflineFetcher);
        self
    }

    /// Use a custom fetcher for forced downloads.
    pub fn with_fetcher(mut self, fetcher: impl UrlFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Register a template under a block tag or override key.
    pub fn with_template(
        mut self,
        key: impl Into<String>,
        template: impl BlockTemplate + 'static,
    ) -> Self {
        self.processor.registry_mut().register(key, template);
        self
    }

    /// Use another figure type recognizer.
    pub fn with_recognizer(mut self, recognizer: impl FigureTypeRecognizer + 'static) -> Self {
        self.processor = self.processor.with_recognizer(recognizer);
        self
    }

    /// The export options.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export a tree, serving its attachments from memory.
    pub fn export<W: Write + Seek>(&self, tree: &WikiTree, writer: W) -> Result<(W, ExportStats)> {
        self.export_with_progress(tree, writer, |_| {})
    }

    /// Export a tree, calling `on_document` after each written document.
    pub fn export_with_progress<W, F>(
        &self,
        tree: &WikiTree,
        writer: W,
        on_document: F,
    ) -> Result<(W, ExportStats)>
    where
        W: Write + Seek,
        F: FnMut(&EntityReference),
    {
        let store = MemoryStore::from_tree(tree);
        self.export_from_store(tree, &store, writer, on_document)
    }

    /// Export a tree whose attachments live in another store.
    pub fn export_from_store<W, F>(
        &self,
        tree: &WikiTree,
        store: &dyn DocumentStore,
        writer: W,
        on_document: F,
    ) -> Result<(W, ExportStats)>
    where
        W: Write + Seek,
        F: FnMut(&EntityReference),
    {
        let walker = export::DocumentWalker::new(tree, &self.options.scope);
        log::info!(
            "Exporting {} of {} documents from wiki {}",
            walker.document_count(),
            tree.document_count(),
            tree.name
        );
        export::export_events(
            walker,
            writer,
            store,
            self.fetcher.as_ref(),
            &self.processor,
            &self.options,
            on_document,
        )
    }

    /// Load a tree JSON file and export it to `output`.
    pub fn export_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        tree: P,
        output: Q,
    ) -> Result<ExportStats> {
        let tree = WikiTree::from_path(tree)?;
        let file = File::create(output.as_ref())?;
        let (writer, stats) = self.export(&tree, BufWriter::new(file))?;
        writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        Ok(stats)
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}
