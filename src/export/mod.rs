//! Export of wiki documents into a LaTeX package.
//!
//! A [`DocumentWalker`] produces the event protocol for a tree, the
//! [`ConverterListener`] converts references and renders each document,
//! and the [`ExportPackage`] collects everything into a zip archive with
//! an `index.tex` master file.

mod builder;
mod events;
mod listener;
mod options;
mod package;
pub mod path;
mod resource;
mod stats;

pub use builder::TreeBuilder;
pub use events::{ContentEvent, ContentEvents, DocumentWalker, ExportEvent};
pub use listener::{ConverterListener, SOURCE_PARAMETER};
pub use options::{DocumentSelection, ExportOptions};
pub use package::{ExportPackage, PackageSink};
pub use resource::{ConversionCounts, ConversionOutcome, ResourceConverter};
pub use stats::ExportStats;

use crate::error::Result;
use crate::fetch::UrlFetcher;
use crate::model::{EntityReference, WikiTree};
use crate::render::TemplateProcessor;
use crate::store::DocumentStore;
use std::io::{Seek, Write};

/// Feed an event stream through a listener and finish the package.
///
/// `on_document` is called after each document is written.
pub fn export_events<W, I, F>(
    events: I,
    writer: W,
    store: &dyn DocumentStore,
    fetcher: &dyn UrlFetcher,
    processor: &TemplateProcessor,
    options: &ExportOptions,
    mut on_document: F,
) -> Result<(W, ExportStats)>
where
    W: Write + Seek,
    I: IntoIterator<Item = ExportEvent>,
    F: FnMut(&EntityReference),
{
    let mut listener = ConverterListener::new(writer, store, fetcher, processor, options);
    let mut current = None;
    for event in events {
        match event {
            ExportEvent::BeginDocument { ref reference, .. } => current = Some(reference.clone()),
            ExportEvent::EndDocument => {
                listener.on_event(event)?;
                if let Some(reference) = current.take() {
                    on_document(&reference);
                }
                continue;
            }
            _ => {}
        }
        listener.on_event(event)?;
    }
    listener.finish()
}

/// Export the documents of a tree selected by `options.scope`.
pub fn export_tree<W: Write + Seek>(
    tree: &WikiTree,
    writer: W,
    store: &dyn DocumentStore,
    fetcher: &dyn UrlFetcher,
    processor: &TemplateProcessor,
    options: &ExportOptions,
) -> Result<(W, ExportStats)> {
    let walker = DocumentWalker::new(tree, &options.scope);
    log::info!(
        "Exporting {} of {} documents from wiki {}",
        walker.document_count(),
        tree.document_count(),
        tree.name
    );
    export_events(walker, writer, store, fetcher, processor, options, |_| {})
}
